//! Pre-session input drainer
//!
//! Controllers print a banner on connect (and 3D printers often keep
//! reporting temperatures). Anything already queued when the session starts
//! must be thrown away, or the first `ok` read would belong to nobody.

use crate::communication::MachineLink;
use gcodestream_core::constants::DRAIN_CHUNK_LEN;
use std::io::{self, ErrorKind, Write};
use std::time::Duration;

/// Discard device output until the link stays quiet for `window`.
///
/// Each chunk read is reported on `diag` as `DISCARD: <payload>`. Returns the
/// number of bytes discarded. End of stream also ends the drain.
pub fn discard_pending_input<L>(
    link: &mut L,
    window: Duration,
    diag: &mut dyn Write,
) -> io::Result<usize>
where
    L: MachineLink + ?Sized,
{
    let mut total = 0;
    let mut buf = [0u8; DRAIN_CHUNK_LEN];

    while link.await_read_ready(window)?.is_ready() {
        let n = match link.read(&mut buf) {
            Ok(n) => n,
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => {
                tracing::debug!(
                    "Reading pending input from {} failed: {}",
                    link.describe(),
                    e
                );
                return Err(e);
            }
        };

        if n == 0 {
            tracing::debug!("{} closed while draining", link.describe());
            break;
        }

        total += n;
        writeln!(diag, "DISCARD: {}", String::from_utf8_lossy(&buf[..n]))?;
    }

    tracing::debug!("Discarded {} stale bytes from {}", total, link.describe());
    Ok(total)
}
