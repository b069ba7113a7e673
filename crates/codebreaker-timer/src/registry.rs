//! Registry of running stopwatches.

use std::collections::HashMap;
use std::hash::Hash;

use chrono::{DateTime, Utc};

use crate::clock::{Clock, SystemClock};

/// Independent stopwatches keyed by a caller-chosen id.
///
/// Any number may run at once. Stopping or querying an id that is not
/// running is not an error and reads as zero seconds.
#[derive(Debug)]
pub struct TimerRegistry<K, C = SystemClock> {
    clock: C,
    running: HashMap<K, DateTime<Utc>>,
}

impl<K: Eq + Hash + Clone> TimerRegistry<K, SystemClock> {
    pub fn new() -> Self {
        Self::with_clock(SystemClock)
    }
}

impl<K: Eq + Hash + Clone> Default for TimerRegistry<K, SystemClock> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: Eq + Hash + Clone, C: Clock> TimerRegistry<K, C> {
    pub fn with_clock(clock: C) -> Self {
        Self {
            clock,
            running: HashMap::new(),
        }
    }

    pub fn clock(&self) -> &C {
        &self.clock
    }

    /// Start (or restart) the stopwatch for `id`. Returns the start instant.
    pub fn start(&mut self, id: K) -> DateTime<Utc> {
        let now = self.clock.now();
        if self.running.insert(id, now).is_some() {
            tracing::trace!("Stopwatch restarted");
        }
        now
    }

    /// Stop the stopwatch for `id` and return whole elapsed seconds.
    /// Returns 0 if it was not running.
    pub fn stop(&mut self, id: &K) -> u64 {
        match self.running.remove(id) {
            Some(started) => whole_seconds(started, self.clock.now()),
            None => 0,
        }
    }

    /// Elapsed seconds for a running stopwatch without stopping it.
    pub fn elapsed(&self, id: &K) -> u64 {
        self.running
            .get(id)
            .map(|started| whole_seconds(*started, self.clock.now()))
            .unwrap_or(0)
    }

    pub fn is_running(&self, id: &K) -> bool {
        self.running.contains_key(id)
    }

    /// When the stopwatch for `id` started, if it is running.
    pub fn started_at(&self, id: &K) -> Option<DateTime<Utc>> {
        self.running.get(id).copied()
    }

    /// Stop every stopwatch, returning each id's elapsed seconds.
    pub fn stop_all(&mut self) -> HashMap<K, u64> {
        self.stop_where(|_| true)
    }

    /// Stop the stopwatches whose id matches `pred`.
    pub fn stop_where<F>(&mut self, mut pred: F) -> HashMap<K, u64>
    where
        F: FnMut(&K) -> bool,
    {
        let now = self.clock.now();
        let ids: Vec<K> = self.running.keys().filter(|k| pred(k)).cloned().collect();
        ids.into_iter()
            .filter_map(|id| {
                let started = self.running.remove(&id)?;
                Some((id, whole_seconds(started, now)))
            })
            .collect()
    }

    pub fn running_ids(&self) -> impl Iterator<Item = &K> {
        self.running.keys()
    }

    pub fn running_count(&self) -> usize {
        self.running.len()
    }

    /// True when no stopwatch is running.
    pub fn is_idle(&self) -> bool {
        self.running.is_empty()
    }
}

/// Whole seconds from `start` to `now`; a clock that went backwards reads 0.
fn whole_seconds(start: DateTime<Utc>, now: DateTime<Utc>) -> u64 {
    u64::try_from((now - start).num_seconds()).unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;

    fn registry() -> (TimerRegistry<usize, ManualClock>, ManualClock) {
        let clock = ManualClock::default();
        (TimerRegistry::with_clock(clock.clone()), clock)
    }

    #[test]
    fn stop_returns_elapsed_and_removes() {
        let (mut timers, clock) = registry();
        timers.start(0);
        clock.advance_secs(1);

        assert!(timers.stop(&0) >= 1);
        assert!(!timers.is_running(&0));
        assert_eq!(timers.stop(&0), 0);
    }

    #[test]
    fn elapsed_is_floored() {
        let (mut timers, clock) = registry();
        timers.start(3);
        clock.advance(chrono::TimeDelta::milliseconds(2_999));
        assert_eq!(timers.elapsed(&3), 2);
        clock.advance(chrono::TimeDelta::milliseconds(1));
        assert_eq!(timers.stop(&3), 3);
    }

    #[test]
    fn running_strictly_between_start_and_stop() {
        let (mut timers, clock) = registry();
        assert!(!timers.is_running(&1));

        let started = timers.start(1);
        assert!(timers.is_running(&1));
        assert_eq!(timers.started_at(&1), Some(started));
        clock.advance_secs(4);
        assert!(timers.is_running(&1));
        assert_eq!(timers.elapsed(&1), 4);

        timers.stop(&1);
        assert!(!timers.is_running(&1));
        assert_eq!(timers.elapsed(&1), 0);
    }

    #[test]
    fn restart_resets_start_instant() {
        let (mut timers, clock) = registry();
        timers.start(0);
        clock.advance_secs(10);
        timers.start(0);
        clock.advance_secs(2);
        assert_eq!(timers.stop(&0), 2);
    }

    #[test]
    fn stop_all_returns_every_stopwatch() {
        let (mut timers, clock) = registry();
        timers.start(0);
        clock.advance_secs(3);
        timers.start(1);
        clock.advance_secs(2);

        let stopped = timers.stop_all();
        assert_eq!(stopped.len(), 2);
        assert_eq!(stopped[&0], 5);
        assert_eq!(stopped[&1], 2);
        assert!(timers.is_idle());
        assert_eq!(timers.running_count(), 0);
    }

    #[test]
    fn stop_where_leaves_others_running() {
        let (mut timers, clock) = registry();
        for id in 0..4 {
            timers.start(id);
        }
        clock.advance_secs(1);

        let stopped = timers.stop_where(|id| id % 2 == 0);
        assert_eq!(stopped.len(), 2);
        let mut left: Vec<usize> = timers.running_ids().copied().collect();
        left.sort_unstable();
        assert_eq!(left, vec![1, 3]);
    }

    #[test]
    fn clock_going_backwards_reads_zero() {
        let (mut timers, clock) = registry();
        timers.start(0);
        clock.advance_secs(-30);
        assert_eq!(timers.elapsed(&0), 0);
        assert_eq!(timers.stop(&0), 0);
    }

    #[test]
    fn system_clock_registry_starts_idle() {
        let mut timers: TimerRegistry<&str> = TimerRegistry::new();
        assert!(timers.is_idle());
        timers.start("step-a");
        assert_eq!(timers.elapsed(&"step-a"), 0);
        assert_eq!(timers.stop_all().len(), 1);
    }
}
