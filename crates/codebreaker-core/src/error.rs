use thiserror::Error;

use crate::types::SessionId;

/// Top-level error type for the CodeBreaker domain.
#[derive(Error, Debug)]
pub enum CodebreakerError {
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("Invalid {field}: {value}")]
    InvalidValue { field: &'static str, value: String },

    #[error("Step {index} out of range for session {session_id} ({len} steps)")]
    StepOutOfRange {
        session_id: SessionId,
        index: usize,
        len: usize,
    },

    #[error("Session {session_id} violates invariant: {reason}")]
    Invariant { session_id: SessionId, reason: String },
}
