//! Builder for new rescue sessions.
//!
//! ```
//! # use codebreaker_core::{ProblemType, SessionId};
//! # use codebreaker_store::session::RescueSession;
//! let session = RescueSession::new(SessionId(1), ProblemType::Bug, "rubber_duck")
//!     .step("Explain the code line by line")
//!     .step("Write down the expected behaviour")
//!     .build();
//! assert_eq!(session.action_steps.len(), 2);
//! assert_eq!(session.steps_completed, 0);
//! assert!(!session.success);
//! ```

use chrono::{DateTime, Utc};
use codebreaker_core::{ProblemType, Session, SessionId, Step};

/// Assembles the initial record for a rescue session.
pub struct RescueSession {
    session: Session,
}

impl RescueSession {
    /// Start a session record stamped with the current time.
    pub fn new(id: SessionId, problem_type: ProblemType, strategy: &str) -> Self {
        Self {
            session: Session {
                id,
                problem_type,
                selected_strategy: strategy.to_string(),
                start_time: Utc::now(),
                completed_at: None,
                success: false,
                action_steps: Vec::new(),
                steps_completed: 0,
                total_time_spent: 0,
            },
        }
    }

    /// Override the start time (the tracker stamps it from its clock).
    pub fn started_at(mut self, at: DateTime<Utc>) -> Self {
        self.session.start_time = at;
        self
    }

    /// Append one action step.
    pub fn step(mut self, label: impl Into<String>) -> Self {
        self.session.action_steps.push(Step::new(label));
        self
    }

    /// Append several action steps in order.
    pub fn steps<I, S>(mut self, labels: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.session
            .action_steps
            .extend(labels.into_iter().map(Step::new));
        self
    }

    pub fn build(self) -> Session {
        self.session
    }
}
