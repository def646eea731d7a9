//! Read-readiness polling for raw file descriptors

use super::Readiness;
use std::io;
use std::os::unix::io::RawFd;
use std::time::{Duration, Instant};

/// Wait until `fd` is readable or `timeout` expires.
///
/// Hang-ups and errors on the descriptor count as readable so that the
/// following read surfaces them.
pub(crate) fn poll_readable(fd: RawFd, timeout: Duration) -> io::Result<Readiness> {
    let started = Instant::now();
    let timeout_ms = libc::c_int::try_from(timeout.as_millis()).unwrap_or(libc::c_int::MAX);

    let mut pollfd = libc::pollfd {
        fd,
        events: libc::POLLIN,
        revents: 0,
    };

    let rc = unsafe { libc::poll(&mut pollfd, 1, timeout_ms) };
    if rc < 0 {
        return Err(io::Error::last_os_error());
    }
    if rc == 0 {
        return Ok(Readiness::TimedOut);
    }

    Ok(Readiness::Ready {
        remaining: timeout.saturating_sub(started.elapsed()),
    })
}
