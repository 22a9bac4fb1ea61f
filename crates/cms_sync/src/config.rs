//! Configuration for sync runs

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::{Result, SyncError};

pub const DEFAULT_CATALOG_URL: &str =
    "https://data.cms.gov/provider-data/api/1/metastore/schemas/dataset/items";

/// Settings for one sync run. Every field has a default, so a config file only
/// needs the keys it changes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncConfig {
    /// Metastore endpoint listing every dataset
    #[serde(default = "default_catalog_url")]
    pub catalog_url: String,

    /// Theme a dataset must carry to be synced
    #[serde(default = "default_category")]
    pub category: String,

    /// Distribution media type to download
    #[serde(default = "default_media_type")]
    pub media_type: String,

    /// Where normalized CSV files are written
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,

    /// Where run records and the watermark pointer live
    #[serde(default = "default_checkpoint_dir")]
    pub checkpoint_dir: PathBuf,

    /// Upper bound on downloads in flight at once
    #[serde(default = "default_max_concurrent_downloads")]
    pub max_concurrent_downloads: usize,

    #[serde(default = "default_catalog_timeout_secs")]
    pub catalog_timeout_secs: u64,

    #[serde(default = "default_download_timeout_secs")]
    pub download_timeout_secs: u64,
}

fn default_catalog_url() -> String {
    DEFAULT_CATALOG_URL.to_string()
}

fn default_category() -> String {
    "Hospitals".to_string()
}

fn default_media_type() -> String {
    "text/csv".to_string()
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("cleaned_files")
}

fn default_checkpoint_dir() -> PathBuf {
    PathBuf::from("_checkpoints")
}

fn default_max_concurrent_downloads() -> usize {
    16
}

fn default_catalog_timeout_secs() -> u64 {
    10
}

fn default_download_timeout_secs() -> u64 {
    30
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            catalog_url: default_catalog_url(),
            category: default_category(),
            media_type: default_media_type(),
            output_dir: default_output_dir(),
            checkpoint_dir: default_checkpoint_dir(),
            max_concurrent_downloads: default_max_concurrent_downloads(),
            catalog_timeout_secs: default_catalog_timeout_secs(),
            download_timeout_secs: default_download_timeout_secs(),
        }
    }
}

impl SyncConfig {
    /// Load configuration from a TOML file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| SyncError::io(path, e))?;
        let config: SyncConfig = toml::from_str(&content)
            .map_err(|e| SyncError::Config(format!("{}: {}", path.display(), e)))?;
        Ok(config)
    }

    /// Save configuration to a TOML file
    pub fn save(&self, path: &Path) -> Result<()> {
        let content =
            toml::to_string_pretty(self).map_err(|e| SyncError::Config(e.to_string()))?;
        std::fs::write(path, content).map_err(|e| SyncError::io(path, e))?;
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if self.catalog_url.trim().is_empty() {
            return Err(SyncError::Config("catalog_url must not be empty".to_string()));
        }
        url::Url::parse(&self.catalog_url).map_err(|e| {
            SyncError::Config(format!("invalid catalog_url '{}': {}", self.catalog_url, e))
        })?;
        if self.category.trim().is_empty() {
            return Err(SyncError::Config("category must not be empty".to_string()));
        }
        if self.media_type.trim().is_empty() {
            return Err(SyncError::Config("media_type must not be empty".to_string()));
        }
        if self.max_concurrent_downloads == 0 {
            return Err(SyncError::Config(
                "max_concurrent_downloads must be at least 1".to_string(),
            ));
        }
        if self.catalog_timeout_secs == 0 {
            return Err(SyncError::Config(
                "catalog_timeout_secs must be at least 1".to_string(),
            ));
        }
        if self.download_timeout_secs == 0 {
            return Err(SyncError::Config(
                "download_timeout_secs must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    pub fn catalog_timeout(&self) -> Duration {
        Duration::from_secs(self.catalog_timeout_secs)
    }

    pub fn download_timeout(&self) -> Duration {
        Duration::from_secs(self.download_timeout_secs)
    }
}
