//! Configuration management for CodeBreaker components.
//!
//! Configuration is loaded from (in priority order):
//! 1. Environment variables (`CODEBREAKER_<SECTION>__<KEY>`)
//! 2. Config file (`codebreaker.toml` by default)
//! 3. Defaults

use serde::de::DeserializeOwned;

use crate::error::CodebreakerError;

/// Default config file prefix.
pub const DEFAULT_FILE_PREFIX: &str = "codebreaker";

/// Environment variable prefix.
pub const ENV_PREFIX: &str = "CODEBREAKER";

/// Load one section of the layered configuration.
///
/// A missing file or a missing section yields `T::default()`. A section
/// that is present but malformed is an error.
pub fn load_section<T>(file_prefix: &str, section: &str) -> Result<T, CodebreakerError>
where
    T: DeserializeOwned + Default,
{
    let cfg = config::Config::builder()
        .add_source(config::File::with_name(file_prefix).required(false))
        .add_source(
            config::Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        )
        .build()?;

    match cfg.get::<T>(section) {
        Ok(c) => Ok(c),
        Err(config::ConfigError::NotFound(key)) => {
            tracing::debug!(%key, "Config section not found, using defaults");
            Ok(T::default())
        }
        Err(e) => Err(e.into()),
    }
}
