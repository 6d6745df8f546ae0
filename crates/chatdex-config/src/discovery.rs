//! Configuration file discovery.
//!
//! Discovers `.chatdex.toml` files by walking up the directory tree from a starting point,
//! then appending the global `~/.chatdex.toml` if present.

use std::path::{Path, PathBuf};

use directories::BaseDirs;

use crate::parse::is_root_config;

/// The configuration filename.
pub const CONFIG_FILENAME: &str = ".chatdex.toml";

/// Discovers all configuration files relevant to the given directory.
///
/// Returns paths in precedence order: closest to `cwd` first, global (`~/.chatdex.toml`)
/// last. A file with `root = true` ends the walk and suppresses the global file.
///
/// Returns an empty vector if no configuration files are found.
pub fn discover_config_files(cwd: &Path) -> Vec<PathBuf> {
    let mut configs = Vec::new();
    let mut found_root = false;

    let mut current = Some(cwd);
    while let Some(dir) = current {
        let config_path = dir.join(CONFIG_FILENAME);
        if config_path.is_file() {
            let is_root = is_root_config(&config_path);
            configs.push(config_path);
            if is_root {
                found_root = true;
                break;
            }
        }
        current = dir.parent();
    }

    if !found_root
        && let Some(global_path) = global_config_path()
        && global_path.is_file()
        && !configs.contains(&global_path)
    {
        configs.push(global_path);
    }

    configs
}

/// Returns the path to the global configuration file (`~/.chatdex.toml`).
///
/// Returns `None` if the home directory cannot be determined.
pub fn global_config_path() -> Option<PathBuf> {
    BaseDirs::new().map(|dirs| dirs.home_dir().join(CONFIG_FILENAME))
}

/// Checks if a path is the global configuration file.
pub fn is_global_config(path: &Path) -> bool {
    global_config_path().is_some_and(|global| path == global)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::TestDir;

    /// Drops the global config, which depends on the machine running the tests.
    fn local(configs: &[PathBuf]) -> Vec<&PathBuf> {
        configs.iter().filter(|p| !is_global_config(p)).collect()
    }

    #[test]
    fn nothing_found_without_files() {
        let tree = TestDir::new();
        let cwd = tree.dir("groups/100/exports");

        assert!(local(&discover_config_files(&cwd)).is_empty());
    }

    #[test]
    fn closest_file_comes_first() {
        let tree = TestDir::new();
        let top = tree.plain_config("");
        let middle = tree.plain_config("srv");
        let nearest = tree.plain_config("srv/chat/search");
        let cwd = tree.dir("srv/chat/search/logs");

        assert_eq!(
            local(&discover_config_files(&cwd)),
            vec![&nearest, &middle, &top]
        );
    }

    #[test]
    fn file_in_cwd_is_found() {
        let tree = TestDir::new();
        let config = tree.plain_config("");

        assert_eq!(local(&discover_config_files(tree.path())), vec![&config]);
    }

    #[test]
    fn directory_named_like_config_is_ignored() {
        let tree = TestDir::new();
        tree.dir(CONFIG_FILENAME);
        let cwd = tree.dir("data");

        assert!(local(&discover_config_files(&cwd)).is_empty());
    }

    #[test]
    fn root_file_ends_the_walk() {
        let tree = TestDir::new();
        tree.plain_config("");
        let root = tree.root_config("deploy");
        let cwd = tree.dir("deploy/index");

        // Neither the parent nor the global file is consulted.
        assert_eq!(discover_config_files(&cwd), vec![root]);
    }

    #[test]
    fn files_below_root_still_apply() {
        let tree = TestDir::new();
        tree.plain_config("");
        let root = tree.root_config("deploy");
        let child = tree.plain_config("deploy/staging");
        let cwd = tree.dir("deploy/staging/run");

        assert_eq!(discover_config_files(&cwd), vec![child, root]);
    }

    #[test]
    fn root_false_keeps_walking() {
        let tree = TestDir::new();
        let top = tree.plain_config("");
        let middle = tree.config("deploy", "root = false\n");
        let cwd = tree.dir("deploy/run");

        assert_eq!(local(&discover_config_files(&cwd)), vec![&middle, &top]);
    }

    #[test]
    fn global_path_is_recognized() {
        let path = global_config_path().unwrap();
        assert!(path.ends_with(CONFIG_FILENAME));
        assert!(is_global_config(&path));
        assert!(!is_global_config(Path::new("/elsewhere/.chatdex.toml")));
    }
}
