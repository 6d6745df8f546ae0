//! Configuration system for chatdex.
//!
//! chatdex uses TOML configuration files named `.chatdex.toml`. Configuration is resolved by
//! walking up the directory tree from the current working directory, collecting any
//! `.chatdex.toml` files found, then loading `~/.chatdex.toml` as the global config with
//! lowest precedence.

#![warn(missing_docs)]

mod discovery;
mod error;
mod merge;
mod parse;
mod resolve;
mod templates;
#[cfg(test)]
mod test_support;
mod validate;

use std::{
    path::{Path, PathBuf},
    time::Duration,
};

pub use discovery::{CONFIG_FILENAME, discover_config_files, global_config_path, is_global_config};
pub use error::ConfigError;
pub use merge::{ParsedConfig, merge_configs};
pub use parse::{
    RawConfig, RawIndexSettings, RawRegistrySettings, RawSearchSettings, RawSnippetSettings,
    parse_config_file, parse_config_str,
};
pub use resolve::resolve_index_root;
use serde::Serialize;
pub use templates::{global_template, local_template};
use validate::validate_config;

/// Index directory used when no config names one, relative to the config or working directory.
pub const DEFAULT_INDEX_DIR: &str = ".chatdex/index";

/// Top-level merged configuration for chatdex.
///
/// This represents the fully resolved configuration after merging all discovered
/// `.chatdex.toml` files according to precedence rules.
#[derive(Debug, Clone, Default)]
pub struct Config {
    /// Index storage settings.
    pub index: IndexSettings,
    /// Extension-field registry settings.
    pub registry: RegistrySettings,
    /// Search defaults.
    pub search: SearchSettings,
    /// Snippet defaults.
    pub snippet: SnippetSettings,
    /// Directory containing the most specific config file.
    pub config_root: Option<PathBuf>,
}

impl Config {
    /// Loads configuration by discovering and merging all relevant `.chatdex.toml` files.
    ///
    /// Without any config file the defaults apply and the index lives under `cwd`.
    pub fn load(cwd: &Path) -> Result<Self, ConfigError> {
        let config_files = discover_config_files(cwd);
        let mut config = Self::load_from_files(&config_files)?;
        if config.index.root.is_relative() {
            config.index.root = cwd.join(&config.index.root);
        }
        Ok(config)
    }

    /// Loads configuration from a specific list of config file paths.
    ///
    /// Files should be provided in precedence order: highest precedence first.
    pub fn load_from_files(files: &[PathBuf]) -> Result<Self, ConfigError> {
        let parsed: Vec<ParsedConfig> = files
            .iter()
            .map(|path| {
                let config = parse_config_file(path)?;
                Ok(ParsedConfig {
                    path: path.clone(),
                    config,
                })
            })
            .collect::<Result<Vec<_>, ConfigError>>()?;

        let config = merge_configs(&parsed)?;
        validate_config(&config)?;
        Ok(config)
    }

    /// Serializes the effective settings to TOML format.
    ///
    /// The output uses the same layout as a `.chatdex.toml` file, with the index root
    /// already resolved.
    pub fn settings_to_toml(&self) -> String {
        let serializable = SerializableSettings {
            index: SerializableIndexSettings {
                root: self.index.root.display().to_string(),
                writer_heap_bytes: self.index.writer_heap_bytes,
            },
            registry: self.registry.clone(),
            search: self.search.clone(),
            snippet: self.snippet.clone(),
        };
        // Plain structs of strings and integers always serialize.
        toml::to_string_pretty(&serializable).unwrap_or_default()
    }
}

/// Index storage settings.
#[derive(Debug, Clone)]
pub struct IndexSettings {
    /// Directory holding one sub-directory per tenant.
    pub root: PathBuf,
    /// Memory budget handed to each index writer, in bytes.
    pub writer_heap_bytes: usize,
}

impl Default for IndexSettings {
    fn default() -> Self {
        Self {
            root: PathBuf::from(DEFAULT_INDEX_DIR),
            writer_heap_bytes: 50_000_000,
        }
    }
}

/// Extension-field registry settings.
#[derive(Debug, Clone, Serialize)]
pub struct RegistrySettings {
    /// Seconds a cached field-name list stays fresh.
    pub ttl_secs: u64,
    /// Maximum number of tenants cached at once.
    pub max_entries: usize,
}

impl RegistrySettings {
    /// Cache lifetime as a duration.
    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_secs)
    }
}

impl Default for RegistrySettings {
    fn default() -> Self {
        Self {
            ttl_secs: 3600,
            max_entries: 100,
        }
    }
}

/// Search defaults.
#[derive(Debug, Clone, Serialize)]
pub struct SearchSettings {
    /// Page size used when the caller does not give one.
    pub default_take: usize,
}

impl Default for SearchSettings {
    fn default() -> Self {
        Self { default_take: 20 }
    }
}

/// Snippet defaults.
#[derive(Debug, Clone, Serialize)]
pub struct SnippetSettings {
    /// Snippet window in characters.
    pub length: usize,
}

impl Default for SnippetSettings {
    fn default() -> Self {
        Self { length: 40 }
    }
}

/// Internal struct for TOML serialization of settings.
#[derive(Serialize)]
struct SerializableSettings {
    /// Index settings with a printable root.
    index: SerializableIndexSettings,
    /// Registry settings.
    registry: RegistrySettings,
    /// Search settings.
    search: SearchSettings,
    /// Snippet settings.
    snippet: SnippetSettings,
}

/// Index settings with the root rendered as a string.
#[derive(Serialize)]
struct SerializableIndexSettings {
    /// Resolved index root.
    root: String,
    /// Writer memory budget.
    writer_heap_bytes: usize,
}
