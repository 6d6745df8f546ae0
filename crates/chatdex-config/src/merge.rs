//! Configuration merging.
//!
//! Merges multiple `RawConfig` files into a single resolved `Config`, applying precedence
//! rules and resolving the index root.

use std::path::{Path, PathBuf};

use crate::{
    Config, ConfigError, DEFAULT_INDEX_DIR, IndexSettings, RegistrySettings, SearchSettings,
    SnippetSettings,
    parse::{RawConfig, RawIndexSettings, RawRegistrySettings},
    resolve::resolve_index_root,
};

/// A parsed config file with its source path.
pub struct ParsedConfig {
    /// Path to the config file.
    pub path: PathBuf,
    /// Parsed raw configuration.
    pub config: RawConfig,
}

impl ParsedConfig {
    /// Directory containing the config file.
    fn dir(&self) -> &Path {
        self.path.parent().unwrap_or_else(|| Path::new("."))
    }
}

/// Merges multiple configuration files into a single resolved `Config`.
///
/// Configs should be provided in precedence order: highest precedence first (closest to
/// the working directory), lowest precedence last (global config). For every scalar the
/// first file that defines it wins.
pub fn merge_configs(configs: &[ParsedConfig]) -> Result<Config, ConfigError> {
    let Some(closest) = configs.first() else {
        return Ok(Config::default());
    };
    let config_root = closest.dir().to_path_buf();

    let index = merge_index_settings(configs, &config_root)?;
    let registry = merge_registry_settings(configs);

    let mut search = SearchSettings::default();
    let mut snippet = SnippetSettings::default();
    // Reverse order so higher precedence overwrites
    for parsed in configs.iter().rev() {
        if let Some(v) = parsed.config.search.as_ref().and_then(|s| s.default_take) {
            search.default_take = v;
        }
        if let Some(v) = parsed.config.snippet.as_ref().and_then(|s| s.length) {
            snippet.length = v;
        }
    }

    Ok(Config {
        index,
        registry,
        search,
        snippet,
        config_root: Some(config_root),
    })
}

/// Merges index settings.
///
/// The root comes from the closest file that names one, resolved against that file's
/// directory. Without one, the index lives under the closest config's directory.
fn merge_index_settings(
    configs: &[ParsedConfig],
    config_root: &Path,
) -> Result<IndexSettings, ConfigError> {
    let mut result = IndexSettings {
        root: config_root.join(DEFAULT_INDEX_DIR),
        ..IndexSettings::default()
    };

    for parsed in configs.iter().rev() {
        let Some(RawIndexSettings {
            root,
            writer_heap_bytes,
        }) = &parsed.config.index
        else {
            continue;
        };
        if let Some(root) = root {
            result.root = resolve_index_root(root, parsed.dir())?;
        }
        if let Some(v) = writer_heap_bytes {
            result.writer_heap_bytes = *v;
        }
    }

    Ok(result)
}

/// Merges registry settings.
fn merge_registry_settings(configs: &[ParsedConfig]) -> RegistrySettings {
    let mut result = RegistrySettings::default();

    for parsed in configs.iter().rev() {
        if let Some(RawRegistrySettings {
            ttl_secs,
            max_entries,
        }) = &parsed.config.registry
        {
            if let Some(v) = ttl_secs {
                result.ttl_secs = *v;
            }
            if let Some(v) = max_entries {
                result.max_entries = *v;
            }
        }
    }

    result
}
