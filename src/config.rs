//! Configuration management for taskchain.
//!
//! This module handles the `taskchain.yaml` file which stores where the
//! task database lives and the default page size for listings.

use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Config file name, relative to a base directory.
pub const CONFIG_FILE_PATH: &str = "taskchain.yaml";

/// Page size used when a caller does not specify one.
const DEFAULT_PAGE_SIZE: i64 = 10;

/// Tracker configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TrackerConfig {
    /// Path to the SQLite database. `None` uses the platform data dir.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub database_path: Option<PathBuf>,

    /// Rows per page when a caller does not specify a page size.
    #[serde(default = "default_page_size")]
    pub default_page_size: i64,
}

const fn default_page_size() -> i64 {
    DEFAULT_PAGE_SIZE
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self { database_path: None, default_page_size: DEFAULT_PAGE_SIZE }
    }
}

impl TrackerConfig {
    /// Load config from a base directory, returning None if not found.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be parsed.
    pub fn load_from(base_dir: &Path) -> Result<Option<Self>> {
        let config_path = base_dir.join(CONFIG_FILE_PATH);
        if !config_path.exists() {
            return Ok(None);
        }

        let content = std::fs::read_to_string(&config_path)?;
        let config: Self = serde_yaml::from_str(&content)?;
        Ok(Some(config))
    }

    /// Save config to a base directory.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be written.
    pub fn save_to(&self, base_dir: &Path) -> Result<()> {
        let config_path = base_dir.join(CONFIG_FILE_PATH);
        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = serde_yaml::to_string(self)?;
        std::fs::write(&config_path, content)?;
        Ok(())
    }

    /// The database path to use, falling back to `taskchain/tasks.sqlite3`
    /// under the platform data directory.
    #[must_use]
    pub fn database_path(&self) -> PathBuf {
        self.database_path.clone().unwrap_or_else(|| {
            dirs::data_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join("taskchain")
                .join("tasks.sqlite3")
        })
    }
}
