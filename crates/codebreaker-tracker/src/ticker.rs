//! Display refresh ticker.
//!
//! While any step is being timed, a tokio task bumps a `watch` counter
//! once per period so the display can re-read elapsed times. It carries
//! no state of its own: elapsed seconds always come from the stopwatches.

use std::sync::Arc;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{interval, Duration, MissedTickBehavior};

pub struct RefreshTicker {
    period: Duration,
    tx: Arc<watch::Sender<u64>>,
    task: Option<JoinHandle<()>>,
}

impl RefreshTicker {
    pub fn new(period: Duration) -> Self {
        let (tx, _rx) = watch::channel(0);
        Self {
            period,
            tx: Arc::new(tx),
            task: None,
        }
    }

    /// Receiver that changes on every tick.
    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.tx.subscribe()
    }

    pub fn is_active(&self) -> bool {
        self.task.is_some()
    }

    /// Start ticking if not already. Outside a tokio runtime this is a no-op.
    pub fn start(&mut self) {
        if self.task.is_some() {
            return;
        }
        let Ok(handle) = tokio::runtime::Handle::try_current() else {
            tracing::debug!("No tokio runtime, display refresh disabled");
            return;
        };

        let tx = self.tx.clone();
        let period = self.period;
        self.task = Some(handle.spawn(async move {
            let mut ticker = interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            // The first tick completes immediately.
            ticker.tick().await;
            loop {
                ticker.tick().await;
                tx.send_modify(|n| *n = n.wrapping_add(1));
            }
        }));
        tracing::trace!(period_ms = period.as_millis() as u64, "Refresh ticker started");
    }

    pub fn stop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
            tracing::trace!("Refresh ticker stopped");
        }
    }
}

impl Drop for RefreshTicker {
    fn drop(&mut self) {
        self.stop();
    }
}
