//! Integration tests for chatdex-config.
//!
//! Tests the full configuration loading pipeline: discovery -> parse -> merge -> validate.

// Integration tests live outside cfg(test) by design
#![allow(clippy::tests_outside_test_module)]

use std::{
    fs,
    path::{Path, PathBuf},
};

use chatdex_config::{Config, ConfigError, local_template};

/// Test helper to create a temporary directory structure for tests.
struct TestEnv {
    root: tempfile::TempDir,
}

impl TestEnv {
    fn new() -> Self {
        Self {
            root: tempfile::tempdir().unwrap(),
        }
    }

    fn path(&self) -> &Path {
        self.root.path()
    }

    /// Creates a directory and returns its path.
    fn create_dir(&self, rel_path: &str) -> PathBuf {
        let path = self.root.path().join(rel_path);
        fs::create_dir_all(&path).unwrap();
        path
    }

    /// Creates a file with content and returns its path.
    fn create_file(&self, rel_path: &str, content: &str) -> PathBuf {
        let path = self.root.path().join(rel_path);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(&path, content).unwrap();
        path
    }
}

#[test]
fn test_load_from_no_files_returns_default() {
    let config = Config::load_from_files(&[]).unwrap();

    assert!(config.config_root.is_none());
    assert_eq!(config.index.root, PathBuf::from(".chatdex/index"));
    assert_eq!(config.search.default_take, 20);
}

#[test]
fn test_load_single_root_config() {
    let env = TestEnv::new();
    env.create_file(
        ".chatdex.toml",
        r#"
root = true

[search]
default_take = 7

[snippet]
length = 64
"#,
    );

    let config = Config::load(env.path()).unwrap();

    assert_eq!(config.search.default_take, 7);
    assert_eq!(config.snippet.length, 64);
    assert_eq!(config.config_root.as_deref(), Some(env.path()));
    assert_eq!(config.index.root, env.path().join(".chatdex/index"));
}

#[test]
fn test_nested_configs_merge_closest_first() {
    let env = TestEnv::new();
    env.create_file(
        ".chatdex.toml",
        r#"
root = true

[index]
root = "shared-index"
writer_heap_bytes = 20000000

[registry]
ttl_secs = 30
"#,
    );
    env.create_file(
        "service/.chatdex.toml",
        r#"
[registry]
max_entries = 4
"#,
    );
    let cwd = env.create_dir("service/bin");

    let config = Config::load(&cwd).unwrap();

    assert_eq!(config.config_root, Some(env.path().join("service")));
    assert_eq!(config.index.root, env.path().join("shared-index"));
    assert_eq!(config.index.writer_heap_bytes, 20_000_000);
    assert_eq!(config.registry.ttl_secs, 30);
    assert_eq!(config.registry.max_entries, 4);
}

#[test]
fn test_child_index_root_overrides_parent() {
    let env = TestEnv::new();
    env.create_file(".chatdex.toml", "root = true\n[index]\nroot = \"parent\"\n");
    env.create_file("child/.chatdex.toml", "[index]\nroot = \"mine\"\n");

    let config = Config::load(&env.path().join("child")).unwrap();
    assert_eq!(config.index.root, env.path().join("child/mine"));
}

#[test]
fn test_invalid_toml_is_reported() {
    let env = TestEnv::new();
    let path = env.create_file(".chatdex.toml", "root = true\n[search\n");

    let err = Config::load(env.path()).unwrap_err();
    match err {
        ConfigError::ParseToml { path: reported, .. } => assert_eq!(reported, path),
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn test_zero_values_fail_validation() {
    let env = TestEnv::new();
    env.create_file(".chatdex.toml", "root = true\n[snippet]\nlength = 0\n");

    let err = Config::load(env.path()).unwrap_err();
    assert!(matches!(err, ConfigError::Invalid { ref key, .. } if key == "snippet.length"));
}

#[test]
fn test_commented_template_loads_as_defaults() {
    let env = TestEnv::new();
    let mut template = String::from("root = true\n");
    template.push_str(&local_template());
    env.create_file(".chatdex.toml", &template);

    let config = Config::load(env.path()).unwrap();
    assert_eq!(config.search.default_take, 20);
    assert_eq!(config.registry.max_entries, 100);
}

#[test]
fn test_effective_settings_round_trip_through_toml() {
    let env = TestEnv::new();
    env.create_file(
        ".chatdex.toml",
        "root = true\n[search]\ndefault_take = 11\n[registry]\nttl_secs = 0\n",
    );

    let config = Config::load(env.path()).unwrap();
    let rendered = config.settings_to_toml();
    let reparsed = env.create_file("effective/.chatdex.toml", &rendered);
    let again = Config::load_from_files(&[reparsed]).unwrap();

    assert_eq!(again.search.default_take, 11);
    assert_eq!(again.registry.ttl_secs, 0);
    assert_eq!(again.index.root, config.index.root);
}
