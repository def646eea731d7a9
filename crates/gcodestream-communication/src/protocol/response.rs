//! Acknowledgement classifier
//!
//! Every command sent to the controller is answered, eventually, by a line
//! starting with `ok`. Before that the firmware may print any amount of
//! informational chatter (temperatures, echo lines, busy notices), which is
//! ignored. A handful of prefixes signal that the command was not accepted.

use super::line_reader::read_line;
use gcodestream_core::ProtocolError;
use std::fmt;
use std::io::{Read, Write};

/// Error signals a controller may answer with
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorSignal {
    /// `rs`: Repetier-style resend request
    ResendRequest,
    /// `!!`: hard fault (Marlin kill, Smoothie halt)
    HardFault,
    /// `error`
    Error,
    /// `fatal`
    Fatal,
    /// `resend`
    Resend,
}

impl ErrorSignal {
    /// Prefixes checked in order, matched case-insensitively
    const PREFIXES: [(&'static [u8], ErrorSignal); 5] = [
        (b"rs", ErrorSignal::ResendRequest),
        (b"!!", ErrorSignal::HardFault),
        (b"error", ErrorSignal::Error),
        (b"fatal", ErrorSignal::Fatal),
        (b"resend", ErrorSignal::Resend),
    ];
}

impl fmt::Display for ErrorSignal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ResendRequest => write!(f, "resend request"),
            Self::HardFault => write!(f, "hard fault"),
            Self::Error => write!(f, "error"),
            Self::Fatal => write!(f, "fatal error"),
            Self::Resend => write!(f, "resend"),
        }
    }
}

/// Classification of one response line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseClass {
    /// The command was accepted
    Ack,
    /// The command was rejected
    Error(ErrorSignal),
    /// Informational output, keep reading
    Ignorable,
}

fn starts_with_ignore_case(line: &[u8], prefix: &[u8]) -> bool {
    line.len() >= prefix.len() && line[..prefix.len()].eq_ignore_ascii_case(prefix)
}

/// Classify a single response line (terminator already removed)
pub fn classify_response(line: &[u8]) -> ResponseClass {
    if starts_with_ignore_case(line, b"ok") {
        return ResponseClass::Ack;
    }

    ErrorSignal::PREFIXES
        .iter()
        .find(|(prefix, _)| starts_with_ignore_case(line, prefix))
        .map(|(_, signal)| ResponseClass::Error(*signal))
        .unwrap_or(ResponseClass::Ignorable)
}

/// Read responses until the last command is acknowledged or rejected.
///
/// Ignorable lines are skipped. An error response is written verbatim to
/// `diag` and returned as [`ProtocolError::ErrorResponse`]; a failed read
/// writes `--> RESPONSE ERROR <--` and returns
/// [`ProtocolError::ResponseRead`]. There is no timeout: the device is
/// expected to answer eventually.
pub fn wait_for_ok_ack<R>(
    link: &mut R,
    buf: &mut [u8],
    diag: &mut dyn Write,
    mut echo: Option<&mut dyn Write>,
) -> Result<(), ProtocolError>
where
    R: Read + ?Sized,
{
    loop {
        let sink = echo.as_mut().map(|w| &mut **w as &mut dyn Write);
        let len = match read_line(link, buf, sink) {
            Ok(len) => len,
            Err(e) => {
                let _ = writeln!(diag, "\n--> RESPONSE ERROR <--");
                tracing::debug!("Reading response failed: {}", e);
                return Err(ProtocolError::ResponseRead {
                    reason: e.to_string(),
                });
            }
        };
        let line = &buf[..len];

        match classify_response(line) {
            ResponseClass::Ack => {
                tracing::trace!("ack: {}", String::from_utf8_lossy(line));
                return Ok(());
            }
            ResponseClass::Error(signal) => {
                let text = String::from_utf8_lossy(line).into_owned();
                let _ = writeln!(diag, "{}", text);
                tracing::debug!("Device reported {}: {}", signal, text);
                return Err(ProtocolError::ErrorResponse {
                    kind: signal.to_string(),
                    line: text,
                });
            }
            ResponseClass::Ignorable => {
                tracing::trace!("ignored: {}", String::from_utf8_lossy(line));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn test_ok_variants() {
        assert_eq!(classify_response(b"ok"), ResponseClass::Ack);
        assert_eq!(classify_response(b"OK"), ResponseClass::Ack);
        assert_eq!(classify_response(b"Ok T:200"), ResponseClass::Ack);
        assert_eq!(classify_response(b"ok 12"), ResponseClass::Ack);
        assert_eq!(classify_response(b"OK done"), ResponseClass::Ack);
    }

    #[test]
    fn test_error_prefixes() {
        assert_eq!(
            classify_response(b"rs 42"),
            ResponseClass::Error(ErrorSignal::ResendRequest)
        );
        assert_eq!(
            classify_response(b"!! kill"),
            ResponseClass::Error(ErrorSignal::HardFault)
        );
        assert_eq!(
            classify_response(b"!!fatal"),
            ResponseClass::Error(ErrorSignal::HardFault)
        );
        assert_eq!(
            classify_response(b"error:20"),
            ResponseClass::Error(ErrorSignal::Error)
        );
        assert_eq!(
            classify_response(b"ERROR: Printer halted"),
            ResponseClass::Error(ErrorSignal::Error)
        );
        assert_eq!(
            classify_response(b"Fatal: heater"),
            ResponseClass::Error(ErrorSignal::Fatal)
        );
        assert_eq!(
            classify_response(b"Resend: 42"),
            ResponseClass::Error(ErrorSignal::Resend)
        );
    }

    #[test]
    fn test_short_lines_are_ignorable() {
        assert_eq!(classify_response(b""), ResponseClass::Ignorable);
        assert_eq!(classify_response(b"o"), ResponseClass::Ignorable);
        assert_eq!(classify_response(b"r"), ResponseClass::Ignorable);
        assert_eq!(classify_response(b"err"), ResponseClass::Ignorable);
        assert_eq!(classify_response(b"fata"), ResponseClass::Ignorable);
    }

    #[test]
    fn test_chatter_is_ignorable() {
        assert_eq!(classify_response(b"T:200 /200"), ResponseClass::Ignorable);
        assert_eq!(classify_response(b"echo: busy"), ResponseClass::Ignorable);
        assert_eq!(classify_response(b"wait"), ResponseClass::Ignorable);
        assert_eq!(classify_response(b"<Idle|MPos:0,0,0>"), ResponseClass::Ignorable);
    }

    #[test]
    fn test_echo_sink_survives_ignored_lines() {
        let mut link = Cursor::new(b"echo:busy\nT:21\nok\n".to_vec());
        let mut buf = [0u8; 64];
        let mut diag = Vec::new();
        let mut echoed = Vec::new();

        wait_for_ok_ack(&mut link, &mut buf, &mut diag, Some(&mut echoed)).unwrap();
        assert_eq!(echoed, b"echo:busy\nT:21\nok\n");
        assert!(diag.is_empty());
    }

    #[test]
    fn test_undersized_buffer_is_rejected() {
        let mut link = Cursor::new(b"ok\n".to_vec());
        let mut buf = [0u8; 1];
        let mut diag = Vec::new();

        let err = wait_for_ok_ack(&mut link, &mut buf, &mut diag, None).unwrap_err();
        assert!(matches!(err, ProtocolError::ResponseRead { .. }));
        assert_eq!(diag, b"\n--> RESPONSE ERROR <--\n");
    }
}
