//! The line-paced ok-acknowledgement protocol
//!
//! Building blocks of the send/acknowledge handshake: reading response
//! lines, classifying them, draining stale input and writing whole lines.

pub mod drain;
pub mod line_reader;
pub mod response;
pub mod writer;

pub use drain::discard_pending_input;
pub use line_reader::read_line;
pub use response::{classify_response, wait_for_ok_ack, ErrorSignal, ResponseClass};
pub use writer::reliable_write;
