//! Reliable writer

use std::io::{self, ErrorKind, Write};

/// Write all of `data`, resuming after short writes.
///
/// Interrupted writes are retried. A write that accepts zero bytes, or any
/// other error, is unrecoverable and returned to the caller.
pub fn reliable_write<W>(sink: &mut W, mut data: &[u8]) -> io::Result<()>
where
    W: Write + ?Sized,
{
    while !data.is_empty() {
        match sink.write(data) {
            Ok(0) => {
                return Err(io::Error::new(
                    ErrorKind::WriteZero,
                    "transport accepted no bytes",
                ))
            }
            Ok(written) => data = &data[written..],
            Err(e) if e.kind() == ErrorKind::Interrupted => {}
            Err(e) => return Err(e),
        }
    }
    sink.flush()
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Accepts at most `limit` bytes per call and records each chunk
    struct Trickle {
        limit: usize,
        chunks: Vec<Vec<u8>>,
        interrupt_first: bool,
    }

    impl Write for Trickle {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            if self.interrupt_first {
                self.interrupt_first = false;
                return Err(io::Error::new(ErrorKind::Interrupted, "signal"));
            }
            let n = buf.len().min(self.limit);
            self.chunks.push(buf[..n].to_vec());
            Ok(n)
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_resumes_partial_writes() {
        let mut sink = Trickle {
            limit: 3,
            chunks: Vec::new(),
            interrupt_first: true,
        };
        reliable_write(&mut sink, b"G1 X10\n").unwrap();
        assert_eq!(sink.chunks.len(), 3);
        assert_eq!(sink.chunks.concat(), b"G1 X10\n");
    }

    #[test]
    fn test_zero_write_is_fatal() {
        let mut sink = Trickle {
            limit: 0,
            chunks: Vec::new(),
            interrupt_first: false,
        };
        let err = reliable_write(&mut sink, b"M114\n").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::WriteZero);
    }
}
