//! Repository configuration stored at `.gitlet/config.json`.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::Result;

/// Tunables for a repository
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    /// Branch created by `init`.
    #[serde(default = "default_branch")]
    pub default_branch: String,
    /// zstd level used for object store writes.
    #[serde(default = "default_compression_level")]
    pub compression_level: i32,
    /// Number of resolved commits kept in memory.
    #[serde(default = "default_commit_cache_capacity")]
    pub commit_cache_capacity: usize,
}

fn default_branch() -> String {
    "master".to_string()
}

fn default_compression_level() -> i32 {
    3
}

fn default_commit_cache_capacity() -> usize {
    64
}

impl Default for Config {
    fn default() -> Self {
        Self {
            default_branch: default_branch(),
            compression_level: default_compression_level(),
            commit_cache_capacity: default_commit_cache_capacity(),
        }
    }
}

impl Config {
    /// Load config from a `.gitlet` directory, falling back to defaults.
    pub fn load(gitlet_dir: &Path) -> Result<Self> {
        let config_path = Self::config_path(gitlet_dir);
        if !config_path.exists() {
            return Ok(Self::default());
        }
        let data = fs::read_to_string(&config_path)?;
        Ok(serde_json::from_str(&data)?)
    }

    /// Save config to a `.gitlet` directory.
    pub fn save(&self, gitlet_dir: &Path) -> Result<()> {
        let config_path = Self::config_path(gitlet_dir);
        let tmp_path = config_path.with_extension("tmp");
        let data = serde_json::to_string_pretty(self)?;
        fs::write(&tmp_path, &data)?;
        fs::rename(&tmp_path, &config_path)?;
        Ok(())
    }

    fn config_path(gitlet_dir: &Path) -> PathBuf {
        gitlet_dir.join("config.json")
    }
}
