//! Export/import snapshots with BLAKE3 checksums.
//!
//! A snapshot carries the full session collection and the preferences
//! record. The checksum covers only those two fields, so `exportedAt` can
//! be edited freely and a snapshot written by hand (no checksum) still
//! imports.

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use codebreaker_core::{Session, UserPreferences};
use serde::{Deserialize, Serialize};

use crate::store::StoreError;

/// Serialized backup of the whole store.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Snapshot {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sessions: Option<Vec<Session>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub preferences: Option<UserPreferences>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exported_at: Option<DateTime<Utc>>,
    /// Hex BLAKE3 hash of `sessions` and `preferences`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub checksum: Option<String>,
}

/// Hashable representation of a snapshot (excludes timestamp and checksum).
#[derive(Serialize)]
struct HashableSnapshot<'a> {
    sessions: &'a Option<Vec<Session>>,
    preferences: &'a Option<UserPreferences>,
}

/// Compute the BLAKE3 hash of a snapshot's content.
pub fn compute_snapshot_hash(snapshot: &Snapshot) -> Result<String, serde_json::Error> {
    let hashable = HashableSnapshot {
        sessions: &snapshot.sessions,
        preferences: &snapshot.preferences,
    };
    let json = serde_json::to_vec(&hashable)?;
    Ok(blake3::hash(&json).to_hex().to_string())
}

impl Snapshot {
    /// Build a complete snapshot and stamp its checksum.
    pub fn seal(
        sessions: Vec<Session>,
        preferences: UserPreferences,
        exported_at: DateTime<Utc>,
    ) -> Result<Self, serde_json::Error> {
        let mut snapshot = Self {
            sessions: Some(sessions),
            preferences: Some(preferences),
            exported_at: Some(exported_at),
            checksum: None,
        };
        snapshot.checksum = Some(compute_snapshot_hash(&snapshot)?);
        Ok(snapshot)
    }

    /// Parse snapshot text and check it before anything is written.
    ///
    /// Fails on malformed JSON, on a checksum that does not match the
    /// content, on sessions that break record invariants, and on a session
    /// id that appears twice.
    pub fn parse(text: &str) -> Result<Self, StoreError> {
        let snapshot: Snapshot = serde_json::from_str(text)?;

        if let Some(expected) = &snapshot.checksum {
            let actual = compute_snapshot_hash(&snapshot)?;
            if &actual != expected {
                return Err(StoreError::ChecksumMismatch {
                    expected: expected.clone(),
                    actual,
                });
            }
        }

        if let Some(sessions) = &snapshot.sessions {
            let mut seen = HashSet::with_capacity(sessions.len());
            for session in sessions {
                session.validate()?;
                if !seen.insert(session.id) {
                    return Err(StoreError::DuplicateSession(session.id));
                }
            }
        }

        Ok(snapshot)
    }
}
