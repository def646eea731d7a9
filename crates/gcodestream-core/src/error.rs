//! Error handling for GCodeStream
//!
//! Provides error types for the two layers of a streaming session:
//! - Connection errors (descriptor parsing, TTY setup, TCP resolution/connect)
//! - Protocol errors (device error responses, response reads, sends, policy aborts)
//!
//! All error types use `thiserror` for ergonomic error handling.

use thiserror::Error;

/// Connection error type
///
/// Represents errors raised while turning a connection descriptor into
/// a ready-to-use machine link.
#[derive(Error, Debug, Clone)]
pub enum ConnectionError {
    /// The descriptor could not be parsed
    #[error("Invalid connection descriptor '{descriptor}': {reason}")]
    InvalidDescriptor {
        /// The offending descriptor.
        descriptor: String,
        /// Why it was rejected.
        reason: String,
    },

    /// Baud rate not in the supported set
    #[error(
        "Invalid speed '{value}'; valid speeds are [9600, 19200, 38400, 57600, 115200, 230400, 460800]"
    )]
    UnsupportedBaudRate {
        /// The rejected speed text, without any `b` prefix.
        value: String,
    },

    /// Failed to open a device path
    #[error("Failed to open port {port}: {reason}")]
    FailedToOpen {
        /// The device path.
        port: String,
        /// The reason the open failed.
        reason: String,
    },

    /// The device path opened but could not be configured as a TTY
    #[error("Serial port error on {port}: {reason}")]
    SerialError {
        /// The device path.
        port: String,
        /// The reason for the serial port error.
        reason: String,
    },

    /// Failed to resolve hostname
    #[error("Resolving '{hostname}' (port {port}): {reason}")]
    HostnameResolution {
        /// The hostname that failed to resolve.
        hostname: String,
        /// The requested port.
        port: String,
        /// The resolver's explanation.
        reason: String,
    },

    /// TCP connection error
    #[error("TCP connect to {address} failed: {reason}")]
    TcpError {
        /// The address a connect was attempted to.
        address: String,
        /// The reason for the TCP error.
        reason: String,
    },
}

impl ConnectionError {
    /// Whether a bare descriptor may still be tried as a TCP address after this failure.
    ///
    /// Only failures to open or configure the path fall through; an explicit
    /// bad baud rate is fatal.
    pub fn falls_through_to_tcp(&self) -> bool {
        matches!(
            self,
            ConnectionError::FailedToOpen { .. } | ConnectionError::SerialError { .. }
        )
    }
}

/// Protocol error type
///
/// Represents failures of the line-paced send/acknowledge exchange.
#[derive(Error, Debug, Clone)]
pub enum ProtocolError {
    /// The device answered with an error signal (`rs`, `!!`, `error`, `fatal`, `resend`)
    #[error("Device reported {kind}: {line}")]
    ErrorResponse {
        /// Which error signal matched.
        kind: String,
        /// The verbatim response line.
        line: String,
    },

    /// Reading a response line failed
    #[error("Response read failed: {reason}")]
    ResponseRead {
        /// The reason the read failed.
        reason: String,
    },

    /// Writing a line to the device failed
    #[error("Send failed at line {line_number}: {reason}")]
    SendFailed {
        /// The source line number being sent.
        line_number: u64,
        /// The reason the write failed.
        reason: String,
    },

    /// The session was stopped by the abort error policy
    #[error("Session aborted at line {line_number}: {reason}")]
    Aborted {
        /// The source line number whose response triggered the abort.
        line_number: u64,
        /// The failure that triggered the abort.
        reason: String,
    },
}

/// Main error type for GCodeStream
///
/// A unified error type that can represent any error from all layers.
/// This is the primary error type used in public APIs.
#[derive(Error, Debug)]
pub enum Error {
    /// Connection error
    #[error(transparent)]
    Connection(#[from] ConnectionError),

    /// Protocol error
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// Standard I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Generic error
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Create an error from a string message
    pub fn other(msg: impl Into<String>) -> Self {
        Error::Other(msg.into())
    }

    /// Check if this is a connection error
    pub fn is_connection_error(&self) -> bool {
        matches!(self, Error::Connection(_))
    }

    /// Check if this is a protocol error
    pub fn is_protocol_error(&self) -> bool {
        matches!(self, Error::Protocol(_))
    }

    /// Check if this error ended the session with an unrecoverable send failure
    pub fn is_send_failure(&self) -> bool {
        matches!(self, Error::Protocol(ProtocolError::SendFailed { .. }))
    }
}

/// Result type using Error
pub type Result<T> = std::result::Result<T, Error>;
