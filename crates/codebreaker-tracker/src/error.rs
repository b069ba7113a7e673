//! Error types for the codebreaker-tracker crate.

use codebreaker_core::{CodebreakerError, SessionId};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum TrackerError {
    #[error("Session not found: {0}")]
    SessionNotFound(SessionId),

    #[error("Session {0} is already marked successful")]
    SessionFinished(SessionId),

    #[error(transparent)]
    Domain(#[from] CodebreakerError),
}

pub type Result<T> = std::result::Result<T, TrackerError>;
