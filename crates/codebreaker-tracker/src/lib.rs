//! codebreaker-tracker: Rescue session tracking for CodeBreaker.
//!
//! Ties the session store and the step stopwatches together: a session is
//! created and persisted, each step is timed, and completed steps and the
//! final outcome are merged back into the stored record.

pub mod config;
pub mod error;
pub mod ids;
pub mod ticker;
pub mod tracker;

pub use error::TrackerError;
pub use tracker::{SessionTracker, StepKey};
