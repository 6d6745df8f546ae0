//! Directory fixtures for chatdex-config unit tests.

use std::{
    fs,
    path::{Path, PathBuf},
};

use tempfile::TempDir;

use crate::discovery::CONFIG_FILENAME;

/// A throwaway directory tree that config files are written into.
pub struct TestDir {
    /// Removed on drop.
    root: TempDir,
}

impl TestDir {
    /// Creates an empty tree.
    pub fn new() -> Self {
        Self {
            root: tempfile::tempdir().unwrap(),
        }
    }

    /// Root of the tree.
    pub fn path(&self) -> &Path {
        self.root.path()
    }

    /// Creates `rel` (and its parents) and returns its absolute path.
    pub fn dir(&self, rel: &str) -> PathBuf {
        let path = self.root.path().join(rel);
        fs::create_dir_all(&path).unwrap();
        path
    }

    /// Writes `contents` to `rel/.chatdex.toml`. An empty `rel` means the tree root.
    pub fn config(&self, rel: &str, contents: &str) -> PathBuf {
        let path = self.dir(rel).join(CONFIG_FILENAME);
        fs::write(&path, contents).unwrap();
        path
    }

    /// Writes a config that only sets a search default.
    pub fn plain_config(&self, rel: &str) -> PathBuf {
        self.config(rel, "[search]\ndefault_take = 10\n")
    }

    /// Writes a config that stops discovery.
    pub fn root_config(&self, rel: &str) -> PathBuf {
        self.config(rel, "root = true\n")
    }
}
