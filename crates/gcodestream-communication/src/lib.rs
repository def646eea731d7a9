//! # GCodeStream Communication
//!
//! Machine links and the line-paced streaming protocol for GCodeStream.
//! Supports raw serial TTYs and TCP sockets, drains stale device output,
//! and streams G-code one acknowledged line at a time.

pub mod communication;
pub mod protocol;
pub mod streaming;

pub use communication::{
    list_ports, open_machine_connection, BaudRate, ConnectionDescriptor, MachineLink, Readiness,
    SerialPortInfo, TcpLink, TcpSpec, TtyLink, TtySpec,
};

pub use protocol::{
    classify_response, discard_pending_input, read_line, reliable_write, wait_for_ok_ack,
    ErrorSignal, ResponseClass,
};

pub use streaming::{
    group_thousands, preprocess_line, GcodeSource, GcodeStreamer, LineSource, OperatorGate,
    ProgressMeter, StdinGate, StreamerConfig, PAUSE_BANNER,
};
