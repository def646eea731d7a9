//! # GCodeStream
//!
//! Streams a G-code program to a motion controller (GRBL, Marlin,
//! Smoothieware, BeagleG and friends) over a serial TTY or a TCP socket.
//! Each line is stripped of comments, sent, and acknowledged with `ok`
//! before the next one goes out.
//!
//! ## Architecture
//!
//! GCodeStream is organized as a workspace with multiple crates:
//!
//! 1. **gcodestream-core** - Session state, statistics, error policy, errors, constants
//! 2. **gcodestream-communication** - TTY and TCP links, the ok-ack protocol, the send loop
//! 3. **gcodestream-settings** - Configuration file handling
//! 4. **gcodestream** - The command line tool that wires them together

pub mod cli;

pub use gcodestream_communication::{
    list_ports, open_machine_connection, GcodeSource, GcodeStreamer, MachineLink, SerialPortInfo,
    StreamerConfig,
};
pub use gcodestream_core::{
    ConnectionError, Error, ErrorPolicy, ProtocolError, Result, SendState, SessionStats,
};
pub use gcodestream_settings::Config;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Build date (set at compile time)
pub const BUILD_DATE: &str = env!("BUILD_DATE");

/// Log level for a `-v` count: warn, info, debug, then trace
pub fn log_level(verbosity: u8) -> tracing::Level {
    match verbosity {
        0 => tracing::Level::WARN,
        1 => tracing::Level::INFO,
        2 => tracing::Level::DEBUG,
        _ => tracing::Level::TRACE,
    }
}

/// Initialize logging
///
/// Sets up structured logging with:
/// - Output on stderr, leaving stdout to progress lines
/// - RUST_LOG environment variable support
/// - A minimum level taken from the `-v` count
pub fn init_logging(verbosity: u8) -> anyhow::Result<()> {
    use tracing_subscriber::fmt;
    use tracing_subscriber::prelude::*;
    use tracing_subscriber::EnvFilter;

    let env_filter = EnvFilter::from_default_env().add_directive(log_level(verbosity).into());

    let fmt_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(verbosity > 1)
        .with_level(true)
        .with_line_number(verbosity > 2);

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .try_init()?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_level_steps() {
        assert_eq!(log_level(0), tracing::Level::WARN);
        assert_eq!(log_level(1), tracing::Level::INFO);
        assert_eq!(log_level(2), tracing::Level::DEBUG);
        assert_eq!(log_level(3), tracing::Level::TRACE);
        assert_eq!(log_level(9), tracing::Level::TRACE);
    }

    #[test]
    fn test_build_date_is_stamped() {
        assert!(!BUILD_DATE.is_empty());
        assert!(!VERSION.is_empty());
    }
}
