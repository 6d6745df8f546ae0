//! Configuration file parsing.
//!
//! Parses individual `.chatdex.toml` files into intermediate `RawConfig` structures
//! that preserve the optional nature of all fields before merging.

use std::{fs, path::Path};

use serde::Deserialize;
#[cfg(test)]
use toml::de::Error as TomlError;

use crate::ConfigError;

/// Raw configuration as parsed directly from a TOML file.
///
/// All fields are optional to support partial configs that will be merged.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RawConfig {
    /// When true, stop discovery here and ignore parent and global configs.
    pub root: Option<bool>,
    /// Index storage section.
    pub index: Option<RawIndexSettings>,
    /// Extension-field registry section.
    pub registry: Option<RawRegistrySettings>,
    /// Search defaults section.
    pub search: Option<RawSearchSettings>,
    /// Snippet extraction section.
    pub snippet: Option<RawSnippetSettings>,
}

/// Raw index storage settings.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RawIndexSettings {
    /// Directory holding one sub-directory per tenant, as written in the file.
    pub root: Option<String>,
    /// Memory budget handed to each index writer.
    pub writer_heap_bytes: Option<usize>,
}

/// Raw registry settings.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RawRegistrySettings {
    /// Seconds a cached field-name list stays fresh.
    pub ttl_secs: Option<u64>,
    /// Maximum number of tenants cached at once.
    pub max_entries: Option<usize>,
}

/// Raw search settings.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RawSearchSettings {
    /// Page size used when the caller does not give one.
    pub default_take: Option<usize>,
}

/// Raw snippet settings.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RawSnippetSettings {
    /// Default snippet window in characters.
    pub length: Option<usize>,
}

/// Parses a configuration file from disk.
pub fn parse_config_file(path: &Path) -> Result<RawConfig, ConfigError> {
    let contents = fs::read_to_string(path).map_err(|source| ConfigError::ReadFile {
        path: path.to_path_buf(),
        source,
    })?;

    parse_config_str(&contents, path)
}

/// Parses configuration from a TOML string.
///
/// The `path` parameter is used for error reporting.
pub fn parse_config_str(contents: &str, path: &Path) -> Result<RawConfig, ConfigError> {
    toml::from_str(contents).map_err(|source| ConfigError::ParseToml {
        path: path.to_path_buf(),
        source,
    })
}

/// Parses configuration from a TOML string without path context.
#[cfg(test)]
pub fn parse_config(contents: &str) -> Result<RawConfig, TomlError> {
    toml::from_str(contents)
}

/// Checks if a config file has `root = true` set.
///
/// Returns false if the file cannot be read or parsed.
pub fn is_root_config(path: &Path) -> bool {
    let Ok(contents) = fs::read_to_string(path) else {
        return false;
    };
    let Ok(config) = toml::from_str::<RawConfig>(&contents) else {
        return false;
    };
    config.root == Some(true)
}
