//! Session tracking service.
//!
//! Every operation loads the session from the store, applies the change,
//! and writes the full record back. Store writes fail soft, so the worst
//! case is losing the latest change (logged by the store).

use chrono::{DateTime, Utc};
use tokio::sync::watch;
use tokio::time::Duration;

use codebreaker_core::{ProblemType, Session, SessionId};
use codebreaker_store::{KeyValueStore, RescueSession, SessionStore};
use codebreaker_timer::{Clock, SystemClock, TimerRegistry};

use crate::error::{Result, TrackerError};
use crate::ids::IdGenerator;
use crate::ticker::RefreshTicker;

/// Identifies one step's stopwatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct StepKey {
    pub session_id: SessionId,
    pub index: usize,
}

impl StepKey {
    pub fn new(session_id: SessionId, index: usize) -> Self {
        Self { session_id, index }
    }
}

/// Creates rescue sessions, times their steps, and records the outcome.
pub struct SessionTracker<K, C = SystemClock> {
    store: SessionStore<K>,
    timers: TimerRegistry<StepKey, C>,
    ids: IdGenerator,
    ticker: Option<RefreshTicker>,
}

impl<K: KeyValueStore> SessionTracker<K, SystemClock> {
    pub fn new(store: SessionStore<K>) -> Self {
        Self::with_clock(store, SystemClock)
    }
}

impl<K: KeyValueStore, C: Clock> SessionTracker<K, C> {
    pub fn with_clock(store: SessionStore<K>, clock: C) -> Self {
        let ids = IdGenerator::seeded(store.list_sessions().iter().map(|s| s.id));
        Self {
            store,
            timers: TimerRegistry::with_clock(clock),
            ids,
            ticker: None,
        }
    }

    /// Notify display subscribers every `period` while a step is timed.
    pub fn with_refresh_ticker(mut self, period: Duration) -> Self {
        self.ticker = Some(RefreshTicker::new(period));
        self
    }

    pub fn subscribe_refresh(&self) -> Option<watch::Receiver<u64>> {
        self.ticker.as_ref().map(RefreshTicker::subscribe)
    }

    pub fn store(&self) -> &SessionStore<K> {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut SessionStore<K> {
        &mut self.store
    }

    pub fn timers(&self) -> &TimerRegistry<StepKey, C> {
        &self.timers
    }

    fn now(&self) -> DateTime<Utc> {
        self.timers.clock().now()
    }

    fn load(&self, id: SessionId) -> Result<Session> {
        self.store
            .get_session(id)
            .ok_or(TrackerError::SessionNotFound(id))
    }

    /// Create and persist a new session with the given plan.
    ///
    /// Sessions written through [`Self::store_mut`] (imports included) are
    /// taken into account, so the new id never replaces a stored record.
    pub fn create_session<I, S>(
        &mut self,
        problem_type: ProblemType,
        strategy: &str,
        steps: I,
    ) -> Session
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let now = self.now();
        if let Some(max) = self.store.list_sessions().iter().map(|s| s.id).max() {
            self.ids.observe(max);
        }
        let id = self.ids.next(now);
        let session = RescueSession::new(id, problem_type, strategy)
            .started_at(now)
            .steps(steps)
            .build();
        self.store.save_session(&session);

        tracing::info!(
            session_id = %id,
            problem_type = %problem_type,
            strategy,
            step_count = session.action_steps.len(),
            "Rescue session created"
        );
        session
    }

    /// Start timing a step. Restarting a running step resets its stopwatch.
    pub fn start_step(&mut self, id: SessionId, index: usize) -> Result<DateTime<Utc>> {
        let mut session = self.load(id)?;
        if session.success {
            return Err(TrackerError::SessionFinished(id));
        }
        session.step(index)?;

        let started = self.timers.start(StepKey::new(id, index));
        session.set_step_start(index, started)?;
        self.store.save_session(&session);

        if let Some(ticker) = self.ticker.as_mut() {
            ticker.start();
        }
        tracing::debug!(session_id = %id, step = index, "Step timer started");
        Ok(started)
    }

    /// Stop a step's stopwatch, record the time, and mark it completed.
    /// Returns the seconds added by this call.
    ///
    /// A successful session is closed: its steps can no longer be completed.
    pub fn complete_step(&mut self, id: SessionId, index: usize) -> Result<u64> {
        let mut session = self.load(id)?;
        if session.success {
            return Err(TrackerError::SessionFinished(id));
        }
        session.step(index)?;

        let elapsed = self.timers.stop(&StepKey::new(id, index));
        session.add_step_time(index, elapsed)?;
        session.complete_step(index)?;
        self.store.save_session(&session);
        self.settle_ticker();

        tracing::debug!(
            session_id = %id,
            step = index,
            elapsed_secs = elapsed,
            steps_completed = session.steps_completed,
            "Step completed"
        );
        Ok(elapsed)
    }

    pub fn step_elapsed(&self, id: SessionId, index: usize) -> u64 {
        self.timers.elapsed(&StepKey::new(id, index))
    }

    pub fn is_step_running(&self, id: SessionId, index: usize) -> bool {
        self.timers.is_running(&StepKey::new(id, index))
    }

    /// Mark the session successful, folding in any still-running steps.
    /// Calling it again keeps the original completion time.
    pub fn mark_success(&mut self, id: SessionId) -> Result<Session> {
        let mut session = self.load(id)?;
        self.merge_running(&mut session)?;
        if !session.mark_success(self.now()) {
            tracing::debug!(session_id = %id, "Session already marked successful");
        }
        self.store.save_session(&session);
        self.settle_ticker();

        tracing::info!(
            session_id = %id,
            total_time_secs = session.total_time_spent,
            steps_completed = session.steps_completed,
            "Rescue session succeeded"
        );
        Ok(session)
    }

    /// Stop the session's running steps and keep it unsuccessful.
    pub fn abandon(&mut self, id: SessionId) -> Result<Session> {
        let mut session = self.load(id)?;
        self.merge_running(&mut session)?;
        self.store.save_session(&session);
        self.settle_ticker();

        tracing::info!(
            session_id = %id,
            total_time_secs = session.total_time_spent,
            "Rescue session abandoned"
        );
        Ok(session)
    }

    /// Delete a session, discarding any of its running stopwatches.
    pub fn delete_session(&mut self, id: SessionId) {
        self.timers.stop_where(|key| key.session_id == id);
        self.settle_ticker();
        self.store.delete_session(id);
    }

    fn merge_running(&mut self, session: &mut Session) -> Result<()> {
        let id = session.id;
        for (key, secs) in self.timers.stop_where(|key| key.session_id == id) {
            session.add_step_time(key.index, secs)?;
        }
        Ok(())
    }

    fn settle_ticker(&mut self) {
        if self.timers.is_idle() {
            if let Some(ticker) = self.ticker.as_mut() {
                ticker.stop();
            }
        }
    }
}
