use crate::error::{CheckError, Result};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

/// Location of the main tree when nothing else is configured.
pub const DEFAULT_MAIN_TREE: &str = "/var/db/repos/gentoo";

/// Tree locations the locator works from.
///
/// Built from, in increasing priority: the built-in default, an optional
/// TOML file, then the `PORTDIR` / `PORTDIR_OVERLAY` environment variables.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Root of the main tree.
    pub main_tree: PathBuf,
    /// Roots of every configured overlay, in configuration order.
    pub overlays: Vec<PathBuf>,
}

/// On-disk shape of the config file. Every key is optional.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct ConfigFile {
    main_tree: Option<PathBuf>,
    overlays: Option<Vec<PathBuf>>,
}

/// Which trees a run scans.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TreeSelection {
    /// The configured main tree.
    Main,
    /// Every configured overlay instead of the main tree.
    Overlays,
    /// Only the tree at the given directory.
    Directory(PathBuf),
}

impl Default for Config {
    fn default() -> Self {
        Self {
            main_tree: PathBuf::from(DEFAULT_MAIN_TREE),
            overlays: Vec::new(),
        }
    }
}

impl Config {
    /// Loads the configuration, reading `file` if given and the process environment.
    pub fn load(file: Option<&Path>) -> Result<Self> {
        let mut config = Self::default();
        if let Some(path) = file {
            config.merge_file(path)?;
        }
        config.merge_env(
            std::env::var("PORTDIR").ok().as_deref(),
            std::env::var("PORTDIR_OVERLAY").ok().as_deref(),
        );
        Ok(config)
    }

    /// Overlays values found in a TOML config file.
    pub fn merge_file(&mut self, path: &Path) -> Result<()> {
        let text = fs::read_to_string(path).map_err(|e| CheckError::Config {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        self.merge_toml(&text).map_err(|message| CheckError::Config {
            path: path.to_path_buf(),
            message,
        })
    }

    fn merge_toml(&mut self, text: &str) -> std::result::Result<(), String> {
        let file: ConfigFile = toml::from_str(text).map_err(|e| e.message().to_string())?;
        if let Some(main_tree) = file.main_tree {
            self.main_tree = main_tree;
        }
        if let Some(overlays) = file.overlays {
            self.overlays = overlays;
        }
        Ok(())
    }

    /// Overlays values taken from `PORTDIR` and the whitespace-separated
    /// `PORTDIR_OVERLAY`. Empty values are ignored.
    pub fn merge_env(&mut self, portdir: Option<&str>, portdir_overlay: Option<&str>) {
        if let Some(portdir) = portdir.map(str::trim).filter(|s| !s.is_empty()) {
            self.main_tree = PathBuf::from(portdir);
        }
        if let Some(overlay) = portdir_overlay {
            let overlays: Vec<PathBuf> = overlay.split_whitespace().map(PathBuf::from).collect();
            if !overlays.is_empty() {
                self.overlays = overlays;
            }
        }
    }

    /// Returns the tree roots to scan for `selection`.
    pub fn tree_roots(&self, selection: &TreeSelection) -> Result<Vec<PathBuf>> {
        match selection {
            TreeSelection::Main => Ok(vec![self.main_tree.clone()]),
            TreeSelection::Overlays if self.overlays.is_empty() => Err(CheckError::NoTrees),
            TreeSelection::Overlays => Ok(self.overlays.clone()),
            TreeSelection::Directory(dir) => Ok(vec![dir.clone()]),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_points_at_main_tree() {
        let config = Config::default();
        assert_eq!(config.main_tree, PathBuf::from(DEFAULT_MAIN_TREE));
        assert!(config.overlays.is_empty());
    }

    #[test]
    fn test_merge_toml() {
        let mut config = Config::default();
        config
            .merge_toml("main_tree = \"/srv/gentoo\"\noverlays = [\"/srv/a\", \"/srv/b\"]\n")
            .unwrap();
        assert_eq!(config.main_tree, PathBuf::from("/srv/gentoo"));
        assert_eq!(
            config.overlays,
            vec![PathBuf::from("/srv/a"), PathBuf::from("/srv/b")]
        );
    }

    #[test]
    fn test_merge_toml_rejects_unknown_keys() {
        let mut config = Config::default();
        assert!(config.merge_toml("portdir = \"/x\"").is_err());
    }

    #[test]
    fn test_env_overrides_file() {
        let mut config = Config::default();
        config.merge_toml("main_tree = \"/srv/gentoo\"").unwrap();
        config.merge_env(Some("/usr/portage"), Some("  /ov/one   /ov/two "));
        assert_eq!(config.main_tree, PathBuf::from("/usr/portage"));
        assert_eq!(
            config.overlays,
            vec![PathBuf::from("/ov/one"), PathBuf::from("/ov/two")]
        );
    }

    #[test]
    fn test_empty_env_is_ignored() {
        let mut config = Config::default();
        config.merge_env(Some(""), Some("   "));
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_tree_roots() {
        let mut config = Config::default();
        assert!(matches!(
            config.tree_roots(&TreeSelection::Overlays),
            Err(CheckError::NoTrees)
        ));

        config.overlays = vec![PathBuf::from("/ov")];
        assert_eq!(
            config.tree_roots(&TreeSelection::Overlays).unwrap(),
            vec![PathBuf::from("/ov")]
        );
        assert_eq!(
            config.tree_roots(&TreeSelection::Main).unwrap(),
            vec![PathBuf::from(DEFAULT_MAIN_TREE)]
        );
        assert_eq!(
            config
                .tree_roots(&TreeSelection::Directory(PathBuf::from("/t")))
                .unwrap(),
            vec![PathBuf::from("/t")]
        );
    }
}
