//! Program streaming
//!
//! Reads a G-code program line by line, strips comments and trailing
//! whitespace, and streams the remaining lines over a [`MachineLink`] with
//! the ok-ack handshake.
//!
//! [`MachineLink`]: crate::communication::MachineLink

pub mod progress;
pub mod source;
pub mod streamer;

pub use progress::{group_thousands, ProgressMeter};
pub use source::{preprocess_line, GcodeSource, LineSource};
pub use streamer::{GcodeStreamer, OperatorGate, StdinGate, StreamerConfig, PAUSE_BANNER};
