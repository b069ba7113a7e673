//! CodeBreaker Timer: stopwatches keyed by step.
//!
//! Elapsed time is always the wall-clock delta since the stopwatch
//! started; nothing ticks in the background. Display code that wants a
//! periodic refresh polls [`TimerRegistry::elapsed`].

pub mod clock;
pub mod registry;

pub use clock::{Clock, ManualClock, SystemClock};
pub use registry::TimerRegistry;
