//! # GCodeStream Core
//!
//! Core types, errors, and constants shared by the GCodeStream crates.
//! Provides the session state machine, session statistics, the error
//! policy applied to device error responses, and the unified error type.

pub mod constants;
pub mod data;
pub mod error;

pub use data::{ErrorPolicy, SendState, SessionStats};

pub use error::{ConnectionError, Error, ProtocolError, Result};
