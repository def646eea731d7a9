//! Connection descriptor parsing
//!
//! A descriptor is a single string naming the machine link:
//!
//! ```text
//! descriptor := tty-spec | tcp-spec | 'tty:' tty-spec | 'tcp:' tcp-spec
//! tty-spec   := path [',' ['b'|'B'] baud]
//! tcp-spec   := host [':' port]
//! ```
//!
//! Bare descriptors are tried as a device path first and as a TCP address
//! second. The `tty:` and `tcp:` prefixes pin the link type, except when
//! all that follows is a port number: `tcp:4444` is the host `tcp` on port
//! 4444.

use gcodestream_core::constants::DEFAULT_TCP_PORT;
use gcodestream_core::ConnectionError;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// Serial speeds accepted in a TTY descriptor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum BaudRate {
    B9600,
    B19200,
    B38400,
    B57600,
    #[default]
    B115200,
    B230400,
    B460800,
}

impl BaudRate {
    /// Every supported speed, slowest first
    pub const ALL: [BaudRate; 7] = [
        BaudRate::B9600,
        BaudRate::B19200,
        BaudRate::B38400,
        BaudRate::B57600,
        BaudRate::B115200,
        BaudRate::B230400,
        BaudRate::B460800,
    ];

    /// Bits per second
    pub fn as_u32(&self) -> u32 {
        match self {
            Self::B9600 => 9600,
            Self::B19200 => 19200,
            Self::B38400 => 38400,
            Self::B57600 => 57600,
            Self::B115200 => 115_200,
            Self::B230400 => 230_400,
            Self::B460800 => 460_800,
        }
    }

    /// Map a numeric speed onto the supported set
    pub fn from_u32(value: u32) -> Option<Self> {
        BaudRate::ALL.into_iter().find(|rate| rate.as_u32() == value)
    }

    /// Parse the part of a TTY descriptor after the comma.
    ///
    /// An empty suffix (or a lone `b`) selects the default speed. A leading
    /// `b`/`B` is optional. Anything outside the supported set is rejected.
    pub fn from_suffix(suffix: &str) -> Result<Self, ConnectionError> {
        let digits = suffix
            .strip_prefix('b')
            .or_else(|| suffix.strip_prefix('B'))
            .unwrap_or(suffix);

        if digits.is_empty() {
            return Ok(BaudRate::default());
        }

        digits
            .parse::<u32>()
            .ok()
            .and_then(BaudRate::from_u32)
            .ok_or_else(|| ConnectionError::UnsupportedBaudRate {
                value: digits.to_string(),
            })
    }
}

impl fmt::Display for BaudRate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_u32())
    }
}

/// A device path plus its (unparsed) parameter suffix
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TtySpec {
    /// Device path, everything before the first `,`
    pub path: PathBuf,
    /// Everything after the first `,`, possibly empty
    pub params: String,
}

impl TtySpec {
    /// Split a descriptor at its first comma
    pub fn parse(descriptor: &str) -> Self {
        let (path, params) = descriptor.split_once(',').unwrap_or((descriptor, ""));
        Self {
            path: PathBuf::from(path),
            params: params.to_string(),
        }
    }

    /// Device path
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Requested speed, defaulting to 115200
    pub fn baud_rate(&self) -> Result<BaudRate, ConnectionError> {
        BaudRate::from_suffix(&self.params)
    }
}

/// A host plus port
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TcpSpec {
    /// Hostname or IPv4 address
    pub host: String,
    /// TCP port, 8888 unless given
    pub port: u16,
}

impl TcpSpec {
    /// Split a descriptor at its first colon, defaulting the port to 8888
    pub fn parse(descriptor: &str) -> Result<Self, ConnectionError> {
        let (host, port) = match descriptor.split_once(':') {
            Some((host, port)) => {
                let port = port.parse::<u16>().map_err(|_| {
                    ConnectionError::HostnameResolution {
                        hostname: host.to_string(),
                        port: port.to_string(),
                        reason: "port is not a number in 0-65535".to_string(),
                    }
                })?;
                (host, port)
            }
            None => (descriptor, DEFAULT_TCP_PORT),
        };

        if host.is_empty() {
            return Err(ConnectionError::InvalidDescriptor {
                descriptor: descriptor.to_string(),
                reason: "missing host".to_string(),
            });
        }

        Ok(Self {
            host: host.to_string(),
            port,
        })
    }
}

impl fmt::Display for TcpSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.host, self.port)
    }
}

/// A parsed connection descriptor
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectionDescriptor {
    /// Bare form: try the device path, then fall back to TCP
    Auto(String),
    /// `tty:` prefix: device path only
    Tty(TtySpec),
    /// `tcp:` prefix: TCP only
    Tcp(TcpSpec),
}

impl ConnectionDescriptor {
    /// Parse a descriptor string
    pub fn parse(descriptor: &str) -> Result<Self, ConnectionError> {
        if descriptor.is_empty() {
            return Err(ConnectionError::InvalidDescriptor {
                descriptor: String::new(),
                reason: "empty connection string".to_string(),
            });
        }

        if let Some((scheme, port)) = descriptor.split_once(':') {
            if matches!(scheme, "tty" | "tcp") && is_port_number(port) {
                return Ok(ConnectionDescriptor::Auto(descriptor.to_string()));
            }
        }

        if let Some(rest) = descriptor.strip_prefix("tty:") {
            let spec = TtySpec::parse(rest);
            // pinned TTY descriptors are validated before anything is opened
            spec.baud_rate()?;
            return Ok(ConnectionDescriptor::Tty(spec));
        }

        if let Some(rest) = descriptor.strip_prefix("tcp:") {
            return Ok(ConnectionDescriptor::Tcp(TcpSpec::parse(rest)?));
        }

        Ok(ConnectionDescriptor::Auto(descriptor.to_string()))
    }
}

fn is_port_number(text: &str) -> bool {
    !text.is_empty() && text.bytes().all(|b| b.is_ascii_digit())
}

impl FromStr for ConnectionDescriptor {
    type Err = ConnectionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for ConnectionDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Auto(raw) => f.write_str(raw),
            Self::Tty(spec) if spec.params.is_empty() => {
                write!(f, "tty:{}", spec.path.display())
            }
            Self::Tty(spec) => write!(f, "tty:{},{}", spec.path.display(), spec.params),
            Self::Tcp(spec) => write!(f, "tcp:{}", spec),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gcodestream_core::constants::{DEFAULT_BAUD_RATE, SUPPORTED_BAUD_RATES};

    #[test]
    fn test_whitelist_matches_constants() {
        assert_eq!(BaudRate::ALL.map(|rate| rate.as_u32()), SUPPORTED_BAUD_RATES);
        assert_eq!(BaudRate::default().as_u32(), DEFAULT_BAUD_RATE);
    }

    #[test]
    fn test_tty_split() {
        let spec = TtySpec::parse("/dev/ttyACM0,b57600");
        assert_eq!(spec.path, PathBuf::from("/dev/ttyACM0"));
        assert_eq!(spec.params, "b57600");

        let spec = TtySpec::parse("/dev/ttyACM0");
        assert_eq!(spec.params, "");
        assert_eq!(spec.baud_rate().unwrap(), BaudRate::B115200);
    }

    #[test]
    fn test_lone_prefix_is_default() {
        assert_eq!(BaudRate::from_suffix("b").unwrap(), BaudRate::B115200);
        assert_eq!(BaudRate::from_suffix("B").unwrap(), BaudRate::B115200);
    }

    #[test]
    fn test_suffix_rejects_garbage() {
        assert!(BaudRate::from_suffix("fast").is_err());
        assert!(BaudRate::from_suffix("bb9600").is_err());
        assert!(BaudRate::from_suffix("-9600").is_err());
    }

    #[test]
    fn test_tcp_defaults() {
        let spec = TcpSpec::parse("printer.local").unwrap();
        assert_eq!(spec.host, "printer.local");
        assert_eq!(spec.port, 8888);
        assert_eq!(spec.to_string(), "printer.local:8888");
    }

    #[test]
    fn test_tcp_rejects_bad_port() {
        assert!(TcpSpec::parse("localhost:http").is_err());
        assert!(TcpSpec::parse("localhost:").is_err());
        assert!(TcpSpec::parse(":4444").is_err());
    }

    #[test]
    fn test_scheme_prefixes() {
        assert_eq!(
            ConnectionDescriptor::parse("tcp:localhost:4444").unwrap(),
            ConnectionDescriptor::Tcp(TcpSpec {
                host: "localhost".to_string(),
                port: 4444
            })
        );
        assert!(matches!(
            ConnectionDescriptor::parse("tty:/dev/ttyUSB1,230400").unwrap(),
            ConnectionDescriptor::Tty(_)
        ));
        assert!(matches!(
            ConnectionDescriptor::parse("localhost:4444").unwrap(),
            ConnectionDescriptor::Auto(_)
        ));
        assert!(ConnectionDescriptor::parse("tty:/dev/ttyUSB1,b12345").is_err());
        assert!(ConnectionDescriptor::parse("").is_err());
    }

    #[test]
    fn test_hosts_named_like_prefixes() {
        for raw in ["tcp:4444", "tty:23"] {
            assert_eq!(
                ConnectionDescriptor::parse(raw).unwrap(),
                ConnectionDescriptor::Auto(raw.to_string())
            );
        }
        let spec = TcpSpec::parse("tcp:4444").unwrap();
        assert_eq!(spec.host, "tcp");
        assert_eq!(spec.port, 4444);

        assert!(matches!(
            ConnectionDescriptor::parse("tcp:4444:23").unwrap(),
            ConnectionDescriptor::Tcp(TcpSpec { port: 23, .. })
        ));
    }

    #[test]
    fn test_display_round_trip() {
        for raw in ["tty:/dev/ttyUSB0,b9600", "tcp:host:23", "/dev/ttyUSB0"] {
            let parsed = ConnectionDescriptor::parse(raw).unwrap();
            assert_eq!(parsed.to_string(), raw);
        }
    }
}
