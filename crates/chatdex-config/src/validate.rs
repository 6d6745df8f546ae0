//! Configuration validation.
//!
//! Rejects merged settings the index cannot operate with.

use crate::{Config, ConfigError};

/// Checks the merged settings, returning the first invalid one.
pub fn validate_config(config: &Config) -> Result<(), ConfigError> {
    if config.index.writer_heap_bytes == 0 {
        return Err(ConfigError::invalid(
            "index.writer_heap_bytes",
            "writer heap must be greater than zero",
        ));
    }
    if config.registry.max_entries == 0 {
        return Err(ConfigError::invalid(
            "registry.max_entries",
            "the registry must hold at least one tenant",
        ));
    }
    if config.snippet.length == 0 {
        return Err(ConfigError::invalid(
            "snippet.length",
            "snippet length must be greater than zero",
        ));
    }
    Ok(())
}
