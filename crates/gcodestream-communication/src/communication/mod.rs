//! Machine links
//!
//! A machine link is the bidirectional byte channel a session streams over:
//! a raw-mode serial TTY or a TCP socket. [`open_machine_connection`] turns a
//! connection descriptor into one, trying the device path first and falling
//! back to TCP for bare descriptors.

pub mod descriptor;
pub mod serial;
pub mod tcp;

mod readiness;

pub use descriptor::{BaudRate, ConnectionDescriptor, TcpSpec, TtySpec};
pub use serial::{list_ports, SerialPortInfo, TtyLink};
pub use tcp::TcpLink;

use gcodestream_core::Result;
use std::io::{self, Read, Write};
use std::time::Duration;

/// Outcome of waiting for a link to become readable
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Readiness {
    /// Data (or end of stream) can be read; `remaining` is what is left of the deadline
    Ready {
        /// Time left before the deadline would have expired
        remaining: Duration,
    },
    /// Nothing became readable before the deadline
    TimedOut,
}

impl Readiness {
    /// Whether the link became readable
    pub fn is_ready(&self) -> bool {
        matches!(self, Readiness::Ready { .. })
    }
}

/// A bidirectional byte channel to a motion controller
///
/// Reads block until at least one byte arrives. Only the input drainer uses
/// [`MachineLink::await_read_ready`]; the send loop reads unconditionally.
pub trait MachineLink: Read + Write + Send {
    /// Block until the link is readable or `timeout` expires
    fn await_read_ready(&mut self, timeout: Duration) -> io::Result<Readiness>;

    /// Human readable name for logs (device path or peer address)
    fn describe(&self) -> String;
}

impl<L: MachineLink + ?Sized> MachineLink for Box<L> {
    fn await_read_ready(&mut self, timeout: Duration) -> io::Result<Readiness> {
        (**self).await_read_ready(timeout)
    }

    fn describe(&self) -> String {
        (**self).describe()
    }
}

/// Open the link named by a connection descriptor
///
/// Bare descriptors are opened as a TTY when the path (up to the first `,`)
/// can be opened and configured; otherwise the whole string is treated as
/// `host[:port]`. An unsupported baud rate on a path that opened is fatal.
pub fn open_machine_connection(descriptor: &str) -> Result<Box<dyn MachineLink>> {
    match ConnectionDescriptor::parse(descriptor)? {
        ConnectionDescriptor::Tty(spec) => Ok(Box::new(TtyLink::open(&spec)?)),
        ConnectionDescriptor::Tcp(spec) => Ok(Box::new(TcpLink::connect(&spec)?)),
        ConnectionDescriptor::Auto(raw) => {
            match TtyLink::open(&TtySpec::parse(&raw)) {
                Ok(link) => return Ok(Box::new(link)),
                Err(e) if e.falls_through_to_tcp() => {
                    tracing::debug!("'{}' is not a usable TTY ({}), trying TCP", raw, e);
                }
                Err(e) => return Err(e.into()),
            }

            let spec = TcpSpec::parse(&raw)?;
            Ok(Box::new(TcpLink::connect(&spec)?))
        }
    }
}
