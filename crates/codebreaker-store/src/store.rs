//! Session storage over a key-value medium.
//!
//! The whole session collection lives under one key and is rewritten on
//! every change; preferences live under a second key. The public
//! operations never fail: errors are logged and the operation degrades to
//! an empty collection, default preferences, or a skipped write. The
//! `try_` variants expose the underlying errors.

use chrono::Utc;
use codebreaker_core::{CodebreakerError, Session, SessionId, UserPreferences};

use crate::kv::{KeyValueStore, KvError};
use crate::snapshot::Snapshot;

/// Key holding the JSON array of sessions.
pub const SESSIONS_KEY: &str = "codebreaker_sessions";

/// Key holding the JSON preferences object.
pub const PREFERENCES_KEY: &str = "codebreaker_preferences";

/// Errors that can occur during session storage operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Storage error: {0}")]
    Kv(#[from] KvError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Snapshot checksum mismatch: expected {expected}, computed {actual}")]
    ChecksumMismatch { expected: String, actual: String },

    #[error("Invalid session in snapshot: {0}")]
    InvalidSession(#[from] CodebreakerError),

    #[error("Snapshot contains session {0} more than once")]
    DuplicateSession(SessionId),
}

/// What an import replaced.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ImportSummary {
    /// Number of sessions written, if the snapshot carried sessions.
    pub sessions: Option<usize>,
    /// Whether preferences were written.
    pub preferences: bool,
}

/// CRUD over rescue sessions and the preferences singleton.
///
/// The store is an explicit handle: callers own it and pass it where it
/// is needed, so tests can swap in [`crate::kv::MemoryKv`].
#[derive(Debug)]
pub struct SessionStore<K> {
    kv: K,
}

impl<K: KeyValueStore> SessionStore<K> {
    pub fn new(kv: K) -> Self {
        Self { kv }
    }

    pub fn kv(&self) -> &K {
        &self.kv
    }

    pub fn into_inner(self) -> K {
        self.kv
    }

    // ── Sessions ──────────────────────────────────────────────────

    /// Read the stored collection, in storage order.
    pub fn try_list_sessions(&self) -> Result<Vec<Session>, StoreError> {
        match self.kv.get(SESSIONS_KEY)? {
            Some(json) => Ok(serde_json::from_str(&json)?),
            None => Ok(Vec::new()),
        }
    }

    /// All stored sessions; empty if the collection is missing or unreadable.
    pub fn list_sessions(&self) -> Vec<Session> {
        self.try_list_sessions().unwrap_or_else(|e| {
            tracing::warn!(error = %e, "Failed to load sessions");
            Vec::new()
        })
    }

    /// Insert or fully replace a session by id.
    ///
    /// An unreadable collection is treated as empty and overwritten.
    pub fn try_save_session(&mut self, session: &Session) -> Result<(), StoreError> {
        let mut sessions = self.list_sessions();
        match sessions.iter_mut().find(|s| s.id == session.id) {
            Some(existing) => *existing = session.clone(),
            None => sessions.push(session.clone()),
        }
        self.write_sessions(&sessions)?;

        tracing::debug!(
            session_id = %session.id,
            steps_completed = session.steps_completed,
            success = session.success,
            "Session saved"
        );
        Ok(())
    }

    pub fn save_session(&mut self, session: &Session) {
        if let Err(e) = self.try_save_session(session) {
            tracing::warn!(session_id = %session.id, error = %e, "Failed to save session");
        }
    }

    pub fn get_session(&self, id: SessionId) -> Option<Session> {
        self.list_sessions().into_iter().find(|s| s.id == id)
    }

    /// Remove a session. Returns whether anything was removed.
    pub fn try_delete_session(&mut self, id: SessionId) -> Result<bool, StoreError> {
        let mut sessions = self.list_sessions();
        let before = sessions.len();
        sessions.retain(|s| s.id != id);
        if sessions.len() == before {
            return Ok(false);
        }
        self.write_sessions(&sessions)?;
        tracing::debug!(session_id = %id, "Session deleted");
        Ok(true)
    }

    pub fn delete_session(&mut self, id: SessionId) {
        if let Err(e) = self.try_delete_session(id) {
            tracing::warn!(session_id = %id, error = %e, "Failed to delete session");
        }
    }

    fn write_sessions(&mut self, sessions: &[Session]) -> Result<(), StoreError> {
        let json = serde_json::to_string(sessions)?;
        self.kv.set(SESSIONS_KEY, &json)?;
        Ok(())
    }

    // ── Preferences ───────────────────────────────────────────────

    pub fn try_get_preferences(&self) -> Result<Option<UserPreferences>, StoreError> {
        match self.kv.get(PREFERENCES_KEY)? {
            Some(json) => Ok(Some(serde_json::from_str(&json)?)),
            None => Ok(None),
        }
    }

    /// Stored preferences, or the defaults (dark theme, direct prompts).
    pub fn get_preferences(&self) -> UserPreferences {
        match self.try_get_preferences() {
            Ok(prefs) => prefs.unwrap_or_default(),
            Err(e) => {
                tracing::warn!(error = %e, "Failed to load preferences");
                UserPreferences::default()
            }
        }
    }

    pub fn try_save_preferences(&mut self, prefs: &UserPreferences) -> Result<(), StoreError> {
        let json = serde_json::to_string(prefs)?;
        self.kv.set(PREFERENCES_KEY, &json)?;
        Ok(())
    }

    pub fn save_preferences(&mut self, prefs: &UserPreferences) {
        if let Err(e) = self.try_save_preferences(prefs) {
            tracing::warn!(error = %e, "Failed to save preferences");
        }
    }

    // ── Bulk ──────────────────────────────────────────────────────

    pub fn try_clear_all(&mut self) -> Result<(), StoreError> {
        self.kv.remove(SESSIONS_KEY)?;
        self.kv.remove(PREFERENCES_KEY)?;
        tracing::info!("Cleared all sessions and preferences");
        Ok(())
    }

    pub fn clear_all(&mut self) {
        if let Err(e) = self.try_clear_all() {
            tracing::warn!(error = %e, "Failed to clear storage");
        }
    }

    /// Serialize every session and the preferences into one snapshot.
    pub fn export_data(&self) -> Result<String, StoreError> {
        let snapshot = Snapshot::seal(self.list_sessions(), self.get_preferences(), Utc::now())?;
        Ok(serde_json::to_string_pretty(&snapshot)?)
    }

    /// Replace stored state with the fields present in a snapshot.
    ///
    /// Nothing is written unless the whole snapshot parses and checks out.
    /// If a write fails partway, the previous raw values are put back.
    pub fn try_import_data(&mut self, text: &str) -> Result<ImportSummary, StoreError> {
        let snapshot = Snapshot::parse(text)?;

        let previous_sessions = self.kv.get(SESSIONS_KEY)?;
        let previous_prefs = self.kv.get(PREFERENCES_KEY)?;

        let result = self.apply_snapshot(&snapshot);
        if result.is_err() {
            self.restore_raw(SESSIONS_KEY, previous_sessions.as_deref());
            self.restore_raw(PREFERENCES_KEY, previous_prefs.as_deref());
        }
        result
    }

    /// Import a snapshot, reporting only whether it was applied.
    pub fn import_data(&mut self, text: &str) -> bool {
        match self.try_import_data(text) {
            Ok(summary) => {
                tracing::info!(
                    sessions = ?summary.sessions,
                    preferences = summary.preferences,
                    "Snapshot imported"
                );
                true
            }
            Err(e) => {
                tracing::warn!(error = %e, "Failed to import snapshot");
                false
            }
        }
    }

    fn apply_snapshot(&mut self, snapshot: &Snapshot) -> Result<ImportSummary, StoreError> {
        let mut summary = ImportSummary::default();
        if let Some(sessions) = &snapshot.sessions {
            self.write_sessions(sessions)?;
            summary.sessions = Some(sessions.len());
        }
        if let Some(prefs) = &snapshot.preferences {
            self.try_save_preferences(prefs)?;
            summary.preferences = true;
        }
        Ok(summary)
    }

    fn restore_raw(&mut self, key: &str, value: Option<&str>) {
        let restored = match value {
            Some(v) => self.kv.set(key, v),
            None => self.kv.remove(key),
        };
        if let Err(e) = restored {
            tracing::error!(key, error = %e, "Failed to restore value after aborted import");
        }
    }
}
