//! Structured error types for hermes
//!
//! Using thiserror for automatic Display implementation and error chaining.

use super::types::{CoreId, FuncCallId};
use thiserror::Error;

/// A raw frame that could not be turned into a trace entry
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DecodeError {
    #[error("Unknown trace type {0}")]
    UnknownTraceType(u32),

    #[error("Truncated frame: trace type {trace_type:?} needs {needed} bytes, got {got}")]
    Truncated { trace_type: Option<u32>, needed: usize, got: usize },
}

/// Call-tree protocol violations
///
/// None of these are fatal: the reconstructor reports them, repairs its state
/// and keeps going.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ReconstructError {
    /// An exit arrived for a call that is not on top of the call stack
    #[error("Call stack mismatch on {core}: exit for {exiting}, stack top is {top:?}")]
    StackMismatch {
        core: CoreId,
        exiting: FuncCallId,
        top: Option<FuncCallId>,
        /// In-flight calls discarded to resynchronize the stack
        orphans: Vec<FuncCallId>,
    },

    /// An enter arrived for a call id that is still open
    #[error("Call {call} re-entered on {core} while still open, discarded {} calls", orphans.len())]
    ReenteredOpenCall {
        core: CoreId,
        call: FuncCallId,
        /// The stale call and everything opened above it
        orphans: Vec<FuncCallId>,
    },
}

/// Failures of the frame transports
#[derive(Error, Debug)]
pub enum TransportError {
    #[error("Frame terminator mismatch: expected \\r\\n, got {0:02x?}")]
    BadTerminator([u8; 2]),

    #[error("Datagram of {0} bytes is not a frame")]
    BadDatagramSize(usize),

    #[error("Replay file ends with a partial frame of {0} bytes")]
    PartialFrame(usize),

    #[error("Inbound queue closed")]
    QueueClosed,

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_error_display() {
        let err = DecodeError::UnknownTraceType(9);
        assert_eq!(err.to_string(), "Unknown trace type 9");
    }

    #[test]
    fn test_stack_mismatch_display() {
        let err = ReconstructError::StackMismatch {
            core: CoreId(0),
            exiting: FuncCallId(2),
            top: Some(FuncCallId(1)),
            orphans: Vec::new(),
        };
        assert!(err.to_string().contains("Call#2"));
        assert!(err.to_string().contains("Core#0"));
    }

    #[test]
    fn test_reentered_call_display() {
        let err = ReconstructError::ReenteredOpenCall {
            core: CoreId(1),
            call: FuncCallId(7),
            orphans: vec![FuncCallId(7), FuncCallId(8)],
        };
        assert_eq!(err.to_string(), "Call Call#7 re-entered on Core#1 while still open, discarded 2 calls");
    }
}
