//! TCP communication implementation
//!
//! Connects to controllers that accept G-code over a plain TCP stream
//! (e.g. BeagleG, ESP3D, ser2net bridges). Addresses are resolved as IPv4.

use super::descriptor::TcpSpec;
use super::readiness::poll_readable;
use super::{MachineLink, Readiness};
use gcodestream_core::ConnectionError;
use std::io::{self, Read, Write};
use std::net::{SocketAddr, TcpStream, ToSocketAddrs};
use std::os::unix::io::AsRawFd;
use std::time::Duration;

/// A connected TCP stream
pub struct TcpLink {
    stream: TcpStream,
    peer: SocketAddr,
}

impl TcpLink {
    /// Resolve `spec` as IPv4 and connect
    ///
    /// Every IPv4 address the host resolves to is tried in turn; the last
    /// connect error is reported if none accepts.
    pub fn connect(spec: &TcpSpec) -> Result<Self, ConnectionError> {
        let addresses: Vec<SocketAddr> = (spec.host.as_str(), spec.port)
            .to_socket_addrs()
            .map_err(|e| ConnectionError::HostnameResolution {
                hostname: spec.host.clone(),
                port: spec.port.to_string(),
                reason: e.to_string(),
            })?
            .filter(SocketAddr::is_ipv4)
            .collect();

        if addresses.is_empty() {
            return Err(ConnectionError::HostnameResolution {
                hostname: spec.host.clone(),
                port: spec.port.to_string(),
                reason: "no IPv4 address".to_string(),
            });
        }

        let mut last_error = None;
        for address in addresses {
            match TcpStream::connect(address) {
                Ok(stream) => {
                    tracing::info!("Connected to {} ({})", spec, address);
                    return Self::from_stream(stream);
                }
                Err(e) => {
                    tracing::warn!("TCP connect to {} failed: {}", address, e);
                    last_error = Some(ConnectionError::TcpError {
                        address: address.to_string(),
                        reason: e.to_string(),
                    });
                }
            }
        }

        Err(last_error.unwrap_or_else(|| ConnectionError::TcpError {
            address: spec.to_string(),
            reason: "no address accepted the connection".to_string(),
        }))
    }

    /// Wrap an already connected stream
    pub fn from_stream(stream: TcpStream) -> Result<Self, ConnectionError> {
        let peer = stream.peer_addr().map_err(|e| ConnectionError::TcpError {
            address: "unknown peer".to_string(),
            reason: e.to_string(),
        })?;
        // one short command per write; do not let Nagle hold it back
        if let Err(e) = stream.set_nodelay(true) {
            tracing::debug!("TCP_NODELAY not set on {}: {}", peer, e);
        }
        Ok(Self { stream, peer })
    }

    /// Remote address
    pub fn peer_addr(&self) -> SocketAddr {
        self.peer
    }
}

impl Read for TcpLink {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.stream.read(buf)
    }
}

impl Write for TcpLink {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.stream.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.stream.flush()
    }
}

impl MachineLink for TcpLink {
    fn await_read_ready(&mut self, timeout: Duration) -> io::Result<Readiness> {
        poll_readable(self.stream.as_raw_fd(), timeout)
    }

    fn describe(&self) -> String {
        self.peer.to_string()
    }
}
