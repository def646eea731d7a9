//! Response line reader
//!
//! Reads one byte at a time so that nothing past the first line terminator
//! is consumed: whatever follows belongs to the next classification.

use std::io::{self, ErrorKind, Read, Write};

/// Read one `\n`- or `\r`-terminated line into `buf`.
///
/// One slot of `buf` is reserved for a terminator, so at most
/// `buf.len() - 1` payload bytes are collected; once that many have
/// accumulated the call returns without reading further. The terminator is
/// consumed but not stored. Returns the payload length.
///
/// Every byte read is mirrored to `echo` before the stop test. End of stream
/// and read errors are reported as errors, as is a `buf` shorter than two
/// bytes, which could never hold a payload.
pub fn read_line<R>(
    source: &mut R,
    buf: &mut [u8],
    mut echo: Option<&mut dyn Write>,
) -> io::Result<usize>
where
    R: Read + ?Sized,
{
    if buf.len() < 2 {
        return Err(io::Error::new(
            ErrorKind::InvalidInput,
            "response buffer must hold at least two bytes",
        ));
    }
    let limit = buf.len() - 1;
    let mut count = 0;
    let mut byte = [0u8; 1];

    while count < limit {
        match source.read(&mut byte) {
            Ok(0) => {
                return Err(io::Error::new(
                    ErrorKind::UnexpectedEof,
                    "connection closed while reading a response",
                ))
            }
            Ok(_) => {}
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }

        if let Some(sink) = echo.as_deref_mut() {
            sink.write_all(&byte)?;
            sink.flush()?;
        }

        if byte[0] == b'\n' || byte[0] == b'\r' {
            break;
        }
        buf[count] = byte[0];
        count += 1;
    }

    Ok(count)
}
