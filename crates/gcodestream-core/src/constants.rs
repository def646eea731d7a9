//! Protocol and transport constants

/// Connection descriptor used when none is given on the command line
pub const DEFAULT_DESCRIPTOR: &str = "/dev/ttyUSB0,b115200";

/// TCP port used when a `host` descriptor carries no `:port`
pub const DEFAULT_TCP_PORT: u16 = 8888;

/// Serial speed used when a TTY descriptor carries no baud suffix
pub const DEFAULT_BAUD_RATE: u32 = 115_200;

/// Baud rates accepted in a TTY descriptor
pub const SUPPORTED_BAUD_RATES: [u32; 7] = [9600, 19200, 38400, 57600, 115_200, 230_400, 460_800];

/// Quiet window used when draining stale device output (milliseconds)
pub const DRAIN_WINDOW_MS: u64 = 1000;

/// Maximum bytes taken per read while draining
pub const DRAIN_CHUNK_LEN: usize = 127;

/// Response line buffer length, one slot of which is reserved for the terminator
pub const RESPONSE_BUFFER_LEN: usize = 512;

/// Retransmissions allowed per line under the retry policy
pub const DEFAULT_RETRY_LIMIT: u32 = 3;
