//! Configuration for the codebreaker tracker and CLI.

use serde::Deserialize;

/// Top-level tracker configuration.
///
/// Loaded from the `codebreaker.toml` `[tracker]` section or
/// `CODEBREAKER_TRACKER__` environment variables.
#[derive(Debug, Clone, Deserialize)]
pub struct TrackerConfig {
    /// Directory holding the stored sessions, preferences, and entitlement.
    #[serde(default = "default_data_dir")]
    pub data_dir: String,

    /// Largest value the store may write, in bytes. Unlimited if unset.
    #[serde(default)]
    pub quota_bytes: Option<usize>,

    /// Display refresh period while a step is being timed.
    #[serde(default = "default_refresh_interval_ms")]
    pub refresh_interval_ms: u64,

    /// Length of the free trial.
    #[serde(default = "default_trial_days")]
    pub trial_days: u32,

    /// Emit logs as JSON lines.
    #[serde(default)]
    pub log_json: bool,
}

fn default_data_dir() -> String {
    "./codebreaker-data".to_string()
}

fn default_refresh_interval_ms() -> u64 {
    1000
}

fn default_trial_days() -> u32 {
    7
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            quota_bytes: None,
            refresh_interval_ms: default_refresh_interval_ms(),
            trial_days: default_trial_days(),
            log_json: false,
        }
    }
}
