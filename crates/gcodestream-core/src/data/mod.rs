//! Data models for a streaming session
//!
//! This module provides:
//! - The send loop state machine
//! - Session counters reported when a program finishes
//! - The policy applied when the device answers with an error

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// State of the send loop
///
/// Exactly one line may be outstanding on the transport: a session cycles
/// `Ready -> Writing -> AwaitingAck` and back to `Ready`, detouring through
/// `Paused` when the device reports an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendState {
    /// Waiting for the next source line
    Ready,
    /// Writing a preprocessed line to the transport
    Writing,
    /// Line written, reading responses until classified
    AwaitingAck,
    /// Error response received, waiting for the operator
    Paused,
    /// End of input or unrecoverable failure
    Terminated,
}

impl SendState {
    /// Check if a transition from this state to `target` is valid.
    ///
    /// - Ready → Writing, Terminated
    /// - Writing → AwaitingAck, Terminated
    /// - AwaitingAck → Ready, Paused, Writing (retransmit), Terminated
    /// - Paused → Ready, Terminated
    /// - Terminated is final
    pub fn can_transition_to(&self, target: SendState) -> bool {
        use SendState::*;
        match (self, target) {
            (Terminated, _) => false,
            (_, Terminated) => true,
            (Ready, Writing) => true,
            (Writing, AwaitingAck) => true,
            (AwaitingAck, Ready | Paused | Writing) => true,
            (Paused, Ready) => true,
            _ => false,
        }
    }
}

impl fmt::Display for SendState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ready => write!(f, "READY"),
            Self::Writing => write!(f, "WRITING"),
            Self::AwaitingAck => write!(f, "AWAITING_ACK"),
            Self::Paused => write!(f, "PAUSED"),
            Self::Terminated => write!(f, "TERMINATED"),
        }
    }
}

/// Counters for one streaming session
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SessionStats {
    /// Source lines read, including comments and blanks
    pub line_count: u64,
    /// Non-empty lines transmitted (retransmissions not included)
    pub lines_sent: u64,
    /// Lines answered with an error signal or an unreadable response
    pub error_responses: u64,
    /// Extra transmissions made by the retry policy
    pub retransmissions: u64,
}

impl fmt::Display for SessionStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Sent {} non-empty lines out of {} total",
            self.lines_sent, self.line_count
        )
    }
}

/// What the send loop does when a line is not acknowledged
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ErrorPolicy {
    /// Print a banner and block until the operator presses a key
    #[default]
    Pause,
    /// Log the failure and carry on with the next line
    Continue,
    /// Stop the session
    Abort,
    /// Retransmit the failing line, falling back to `Pause` once retries run out
    Retry,
}

impl ErrorPolicy {
    /// All policies, in the order they are documented
    pub const ALL: [ErrorPolicy; 4] = [
        ErrorPolicy::Pause,
        ErrorPolicy::Continue,
        ErrorPolicy::Abort,
        ErrorPolicy::Retry,
    ];

    /// Lowercase name used in configuration files and on the command line
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pause => "pause",
            Self::Continue => "continue",
            Self::Abort => "abort",
            Self::Retry => "retry",
        }
    }
}

impl fmt::Display for ErrorPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ErrorPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ErrorPolicy::ALL
            .into_iter()
            .find(|policy| policy.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| {
                format!(
                    "unknown error policy '{}' (expected pause, continue, abort or retry)",
                    s
                )
            })
    }
}
