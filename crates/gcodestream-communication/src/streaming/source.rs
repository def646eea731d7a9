//! G-code line source and per-line preprocessing

use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::Path;

/// Buffer size for reading program files (256 KB)
const READ_BUFFER_SIZE: usize = 256 * 1024;

/// A producer of program lines
///
/// Besides the lines themselves a source reports how far into the program
/// it is, in bytes, so progress can be shown without a second pass.
pub trait LineSource {
    /// Replace `line` with the next line, without its `\n`.
    ///
    /// Returns `false` at end of input.
    fn next_line(&mut self, line: &mut Vec<u8>) -> io::Result<bool>;

    /// Bytes consumed so far, including line terminators
    fn position(&self) -> u64;

    /// Total program length in bytes
    fn total_bytes(&self) -> u64;
}

/// Line source over any buffered reader
pub struct GcodeSource<R> {
    reader: R,
    offset: u64,
    total_bytes: u64,
}

impl GcodeSource<BufReader<File>> {
    /// Open a program file
    ///
    /// # Errors
    /// Returns error if the file cannot be opened or its length read
    pub fn open(path: impl AsRef<Path>) -> io::Result<Self> {
        let file = File::open(path.as_ref())?;
        let total_bytes = file.metadata()?.len();
        Ok(Self::new(
            BufReader::with_capacity(READ_BUFFER_SIZE, file),
            total_bytes,
        ))
    }
}

impl<R: BufRead> GcodeSource<R> {
    /// Wrap a reader whose total length is already known
    pub fn new(reader: R, total_bytes: u64) -> Self {
        Self {
            reader,
            offset: 0,
            total_bytes,
        }
    }
}

impl GcodeSource<io::Cursor<Vec<u8>>> {
    /// In-memory program
    pub fn from_bytes(program: impl Into<Vec<u8>>) -> Self {
        let program = program.into();
        let total_bytes = program.len() as u64;
        Self::new(io::Cursor::new(program), total_bytes)
    }
}

impl<R: BufRead> LineSource for GcodeSource<R> {
    fn next_line(&mut self, line: &mut Vec<u8>) -> io::Result<bool> {
        line.clear();
        let read = self.reader.read_until(b'\n', line)?;
        if read == 0 {
            return Ok(false);
        }
        self.offset += read as u64;
        if line.last() == Some(&b'\n') {
            line.pop();
        }
        Ok(true)
    }

    fn position(&self) -> u64 {
        self.offset
    }

    fn total_bytes(&self) -> u64 {
        self.total_bytes
    }
}

/// Strip a `;` comment and trailing whitespace from a source line.
///
/// The result is what gets transmitted; an empty result means the line is
/// skipped. A `;` inside an `M117`/`M118` message is cut as well.
pub fn preprocess_line(line: &[u8]) -> &[u8] {
    let code = match line.iter().position(|&b| b == b';') {
        Some(comment_start) => &line[..comment_start],
        None => line,
    };

    let end = code
        .iter()
        .rposition(|&b| !is_space(b))
        .map_or(0, |last| last + 1);
    &code[..end]
}

/// C `isspace` in the default locale
fn is_space(b: u8) -> bool {
    matches!(b, b' ' | b'\t' | b'\n' | b'\r' | 0x0b | 0x0c)
}
