//! Session id generation.

use chrono::{DateTime, Utc};
use codebreaker_core::SessionId;

/// Hands out millisecond-timestamp ids that never repeat.
///
/// Two sessions created in the same millisecond get consecutive ids
/// instead of colliding.
#[derive(Debug, Default)]
pub struct IdGenerator {
    last: u64,
}

impl IdGenerator {
    /// Start above every id already in use.
    pub fn seeded<I>(existing: I) -> Self
    where
        I: IntoIterator<Item = SessionId>,
    {
        let last = existing.into_iter().map(|id| id.0).max().unwrap_or(0);
        Self { last }
    }

    /// Never hand out `id` or anything below it.
    pub fn observe(&mut self, id: SessionId) {
        self.last = self.last.max(id.0);
    }

    pub fn next(&mut self, now: DateTime<Utc>) -> SessionId {
        let millis = u64::try_from(now.timestamp_millis()).unwrap_or(0);
        let id = millis.max(self.last.saturating_add(1));
        self.last = id;
        SessionId(id)
    }
}
