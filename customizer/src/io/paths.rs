//! Canonical locations of tool-owned files within a project root.

use std::path::{Path, PathBuf};

use super::backup::DEFAULT_BACKUP_DIR;
use super::run_log::DEFAULT_LOG_FILE;

pub const DEFAULT_CONFIG_FILE: &str = "customize-config.json";

#[derive(Debug, Clone)]
pub struct ProjectPaths {
    pub root: PathBuf,
    pub backup_dir: PathBuf,
    pub log_path: PathBuf,
}

impl ProjectPaths {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        Self {
            backup_dir: root.join(DEFAULT_BACKUP_DIR),
            log_path: root.join(DEFAULT_LOG_FILE),
            root,
        }
    }

    /// Resolve a config path given on the command line against the root.
    pub fn resolve_config(&self, config: &Path) -> PathBuf {
        if config.is_absolute() {
            config.to_path_buf()
        } else {
            self.root.join(config)
        }
    }
}
