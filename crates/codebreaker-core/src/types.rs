//! Core domain types for CodeBreaker rescue sessions.
//!
//! Field names serialize in camelCase so stored records and export
//! snapshots keep the layout the web client writes.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::CodebreakerError;

// ── Session ───────────────────────────────────────────────────────

/// Unique identifier for a rescue session.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(transparent)]
pub struct SessionId(pub u64);

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

impl FromStr for SessionId {
    type Err = CodebreakerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim()
            .parse::<u64>()
            .map(SessionId)
            .map_err(|_| CodebreakerError::InvalidValue {
                field: "session id",
                value: s.to_string(),
            })
    }
}

/// The kind of problem a rescue session is about.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ProblemType {
    Bug,
    Error,
    Concept,
    Design,
    Performance,
    Other,
}

impl ProblemType {
    pub const ALL: [ProblemType; 6] = [
        Self::Bug,
        Self::Error,
        Self::Concept,
        Self::Design,
        Self::Performance,
        Self::Other,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Bug => "bug",
            Self::Error => "error",
            Self::Concept => "concept",
            Self::Design => "design",
            Self::Performance => "performance",
            Self::Other => "other",
        }
    }
}

impl fmt::Display for ProblemType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

impl FromStr for ProblemType {
    type Err = CodebreakerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let needle = s.trim().to_lowercase();
        Self::ALL
            .into_iter()
            .find(|p| p.as_str() == needle)
            .ok_or_else(|| CodebreakerError::InvalidValue {
                field: "problem type",
                value: s.to_string(),
            })
    }
}

/// One action item within a session's plan.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Step {
    /// What the user should do.
    pub label: String,
    /// Whether the step has been completed.
    #[serde(default)]
    pub completed: bool,
    /// Seconds spent on this step so far.
    #[serde(default)]
    pub time_spent: u64,
    /// When the step's timer was last started.
    #[serde(default)]
    pub start_time: Option<DateTime<Utc>>,
}

impl Step {
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            completed: false,
            time_spent: 0,
            start_time: None,
        }
    }
}

/// One recorded attempt to resolve a coding problem.
///
/// Mutations go through the methods below so that the completion
/// invariants hold; persistence overwrites the whole record.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    pub id: SessionId,
    pub problem_type: ProblemType,
    pub selected_strategy: String,
    pub start_time: DateTime<Utc>,
    #[serde(default)]
    pub completed_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub success: bool,
    pub action_steps: Vec<Step>,
    #[serde(default)]
    pub steps_completed: usize,
    #[serde(default)]
    pub total_time_spent: u64,
}

impl Session {
    /// Borrow a step, failing if the index is outside the plan.
    pub fn step(&self, index: usize) -> Result<&Step, CodebreakerError> {
        let len = self.action_steps.len();
        self.action_steps
            .get(index)
            .ok_or(CodebreakerError::StepOutOfRange {
                session_id: self.id,
                index,
                len,
            })
    }

    fn step_mut(&mut self, index: usize) -> Result<&mut Step, CodebreakerError> {
        let (session_id, len) = (self.id, self.action_steps.len());
        self.action_steps
            .get_mut(index)
            .ok_or(CodebreakerError::StepOutOfRange {
                session_id,
                index,
                len,
            })
    }

    /// Record the instant a step's timer started.
    pub fn set_step_start(
        &mut self,
        index: usize,
        at: DateTime<Utc>,
    ) -> Result<(), CodebreakerError> {
        self.step_mut(index)?.start_time = Some(at);
        Ok(())
    }

    /// Add elapsed seconds to a step and to the session total.
    pub fn add_step_time(&mut self, index: usize, secs: u64) -> Result<(), CodebreakerError> {
        let step = self.step_mut(index)?;
        step.time_spent = step.time_spent.saturating_add(secs);
        self.total_time_spent = self.total_time_spent.saturating_add(secs);
        Ok(())
    }

    /// Mark a step completed. Returns `false` if it already was.
    pub fn complete_step(&mut self, index: usize) -> Result<bool, CodebreakerError> {
        let step = self.step_mut(index)?;
        if step.completed {
            return Ok(false);
        }
        step.completed = true;
        self.steps_completed = (self.steps_completed + 1).min(self.action_steps.len());
        Ok(true)
    }

    /// Mark the session successful. `completed_at` is set only the first
    /// time and never precedes `start_time`. Returns `false` if the session
    /// was already successful.
    pub fn mark_success(&mut self, at: DateTime<Utc>) -> bool {
        if self.success {
            return false;
        }
        self.success = true;
        self.completed_at = Some(at.max(self.start_time));
        true
    }

    /// Check the record-level invariants.
    pub fn validate(&self) -> Result<(), CodebreakerError> {
        let violation = |reason: &str| CodebreakerError::Invariant {
            session_id: self.id,
            reason: reason.to_string(),
        };

        if self.success != self.completed_at.is_some() {
            return Err(violation("completedAt must be set exactly when success is true"));
        }
        if self.steps_completed > self.action_steps.len() {
            return Err(violation("stepsCompleted exceeds the number of action steps"));
        }
        if let Some(done) = self.completed_at {
            if done < self.start_time {
                return Err(violation("completedAt precedes startTime"));
            }
        }
        Ok(())
    }
}

// ── Preferences ───────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    #[default]
    Dark,
    Light,
    System,
}

impl FromStr for Theme {
    type Err = CodebreakerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "dark" => Ok(Self::Dark),
            "light" => Ok(Self::Light),
            "system" => Ok(Self::System),
            _ => Err(CodebreakerError::InvalidValue {
                field: "theme",
                value: s.to_string(),
            }),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum PromptStyle {
    #[default]
    Direct,
    Socratic,
    Guided,
}

impl FromStr for PromptStyle {
    type Err = CodebreakerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "direct" => Ok(Self::Direct),
            "socratic" => Ok(Self::Socratic),
            "guided" => Ok(Self::Guided),
            _ => Err(CodebreakerError::InvalidValue {
                field: "prompt style",
                value: s.to_string(),
            }),
        }
    }
}

/// The singleton user preferences record.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct UserPreferences {
    pub theme: Theme,
    pub default_prompt_style: PromptStyle,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeDelta;

    fn sample_session() -> Session {
        Session {
            id: SessionId(1_700_000_000_000),
            problem_type: ProblemType::Bug,
            selected_strategy: "rubber_duck".to_string(),
            start_time: Utc::now(),
            completed_at: None,
            success: false,
            action_steps: vec![Step::new("Explain the bug"), Step::new("Add a log line")],
            steps_completed: 0,
            total_time_spent: 0,
        }
    }

    #[test]
    fn session_serializes_camel_case() {
        let json = serde_json::to_value(sample_session()).unwrap();
        assert_eq!(json["id"], 1_700_000_000_000u64);
        assert_eq!(json["problemType"], "bug");
        assert_eq!(json["selectedStrategy"], "rubber_duck");
        assert_eq!(json["stepsCompleted"], 0);
        assert!(json["completedAt"].is_null());
        assert_eq!(json["actionSteps"][0]["timeSpent"], 0);
    }

    #[test]
    fn session_tolerates_missing_optional_fields() {
        let json = r#"{
            "id": 42,
            "problemType": "concept",
            "selectedStrategy": "docs",
            "startTime": "2024-05-01T10:00:00Z",
            "actionSteps": [{"label": "Read the docs"}]
        }"#;
        let session: Session = serde_json::from_str(json).unwrap();
        assert_eq!(session.id, SessionId(42));
        assert!(!session.success);
        assert_eq!(session.steps_completed, 0);
        assert_eq!(session.action_steps[0].start_time, None);
    }

    #[test]
    fn complete_step_counts_once() {
        let mut session = sample_session();
        assert!(session.complete_step(0).unwrap());
        assert!(!session.complete_step(0).unwrap());
        assert!(session.complete_step(1).unwrap());
        assert_eq!(session.steps_completed, 2);
    }

    #[test]
    fn complete_step_out_of_range() {
        let mut session = sample_session();
        let err = session.complete_step(5).unwrap_err();
        assert!(matches!(
            err,
            CodebreakerError::StepOutOfRange { index: 5, len: 2, .. }
        ));
    }

    #[test]
    fn add_step_time_accumulates_total() {
        let mut session = sample_session();
        session.add_step_time(0, 5).unwrap();
        session.add_step_time(1, 7).unwrap();
        session.add_step_time(0, 3).unwrap();
        assert_eq!(session.action_steps[0].time_spent, 8);
        assert_eq!(session.total_time_spent, 15);
    }

    #[test]
    fn mark_success_sets_completed_at_once() {
        let mut session = sample_session();
        let first = session.start_time + TimeDelta::seconds(10);
        assert!(session.mark_success(first));
        assert!(!session.mark_success(first + TimeDelta::seconds(60)));
        assert_eq!(session.completed_at, Some(first));
        assert!(session.validate().is_ok());
    }

    #[test]
    fn mark_success_never_precedes_start() {
        let mut session = sample_session();
        session.mark_success(session.start_time - TimeDelta::seconds(30));
        assert_eq!(session.completed_at, Some(session.start_time));
    }

    #[test]
    fn validate_rejects_inconsistent_records() {
        let mut session = sample_session();
        session.success = true;
        assert!(matches!(
            session.validate(),
            Err(CodebreakerError::Invariant { .. })
        ));

        let mut session = sample_session();
        session.steps_completed = 3;
        assert!(session.validate().is_err());
    }

    #[test]
    fn default_preferences() {
        let prefs = UserPreferences::default();
        assert_eq!(prefs.theme, Theme::Dark);
        assert_eq!(prefs.default_prompt_style, PromptStyle::Direct);

        let json = serde_json::to_string(&prefs).unwrap();
        assert_eq!(json, r#"{"theme":"dark","defaultPromptStyle":"direct"}"#);
    }

    #[test]
    fn parse_enums_case_insensitively() {
        assert_eq!("BUG".parse::<ProblemType>().unwrap(), ProblemType::Bug);
        assert_eq!("Light".parse::<Theme>().unwrap(), Theme::Light);
        assert_eq!(" socratic ".parse::<PromptStyle>().unwrap(), PromptStyle::Socratic);
        assert!("neon".parse::<Theme>().is_err());
        assert!("12x".parse::<SessionId>().is_err());
    }

    #[test]
    fn display_honours_width() {
        assert_eq!(format!("{:>6}|", SessionId(42)), "    42|");
        assert_eq!(format!("{:<8}|", ProblemType::Bug), "bug     |");
    }
}
