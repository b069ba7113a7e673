//! codebreaker-core: Shared types, configuration, and error handling for CodeBreaker.
//!
//! This crate provides the foundational types used across all CodeBreaker components:
//! - Rescue sessions and their action steps
//! - User preferences (theme, default prompt style)
//! - Layered configuration loading
//! - Common error types

pub mod config;
pub mod error;
pub mod types;

pub use error::CodebreakerError;
pub use types::{PromptStyle, ProblemType, Session, SessionId, Step, Theme, UserPreferences};
