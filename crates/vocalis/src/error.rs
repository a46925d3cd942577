//! Error types for the synthesis-control runtime

use crate::event::FailureReason;
use crate::voice::{ParamRange, ParameterField};
use thiserror::Error;

/// Engine error types
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EngineError {
    /// Voice parameter write outside the voice's declared range
    #[error("invalid value {value} for {field}: valid range is {range}")]
    InvalidParameterValue {
        field: ParameterField,
        value: i32,
        range: ParamRange,
    },

    /// Synthesis was triggered with nothing queued
    #[error("text queue is empty")]
    EmptyQueue,

    /// Operation is not legal in the engine's current lifecycle state
    #[error("engine is busy: operation not legal in the current state")]
    EngineBusy,

    /// Engine was stopped and must be reset before reuse
    #[error("engine is stopped; call reset() before reuse")]
    EngineStopped,

    /// No predefined voice at the given index
    #[error("no voice at index {0}")]
    VoiceNotFound(usize),

    /// Listener code faulted while handling an event
    #[error("listener fault: {0}")]
    ListenerFault(String),

    /// Opaque failure surfaced from the synthesis backend
    #[error("backend failure: {0}")]
    BackendFailure(String),

    /// Pass was cancelled by stop() or a listener's consumed signal
    #[error("synthesis cancelled")]
    Cancelled,
}

/// Result type for engine operations
pub type EngineResult<T> = Result<T, EngineError>;

impl From<FailureReason> for EngineError {
    fn from(reason: FailureReason) -> Self {
        match reason {
            FailureReason::Cancelled => EngineError::Cancelled,
            FailureReason::Backend(message) => EngineError::BackendFailure(message),
            FailureReason::ListenerFault(message) => EngineError::ListenerFault(message),
        }
    }
}
