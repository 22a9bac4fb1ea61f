//! CLI command implementations

pub mod datasets;
pub mod run;
pub mod status;

use anyhow::{Context, Result};
use clap::Args;
use cms_sync::SyncConfig;
use comfy_table::{presets::UTF8_FULL_CONDENSED, Cell, Color, ContentArrangement, Table};
use std::path::{Path, PathBuf};

/// How a command finished when it did not error outright.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandStatus {
    Success,
    /// The sync run completed but was recorded as FAILED.
    RunFailed,
}

/// Per-invocation overrides layered on top of the config file.
#[derive(Args, Debug, Default, Clone)]
pub struct ConfigOverrides {
    /// Metastore endpoint listing the datasets
    #[arg(long, global = true, env = "CMS_SYNC_CATALOG_URL")]
    pub catalog_url: Option<String>,

    /// Dataset theme to sync (e.g. "Hospitals")
    #[arg(long, global = true, env = "CMS_SYNC_CATEGORY")]
    pub category: Option<String>,

    /// Directory for normalized CSV files
    #[arg(long, global = true, env = "CMS_SYNC_OUTPUT_DIR")]
    pub output_dir: Option<PathBuf>,

    /// Directory for run records and the watermark
    #[arg(long, global = true, env = "CMS_SYNC_CHECKPOINT_DIR")]
    pub checkpoint_dir: Option<PathBuf>,

    /// Maximum downloads in flight
    #[arg(long, global = true, env = "CMS_SYNC_MAX_CONCURRENT")]
    pub max_concurrent: Option<usize>,
}

impl ConfigOverrides {
    fn apply(&self, config: &mut SyncConfig) {
        if let Some(url) = &self.catalog_url {
            config.catalog_url = url.clone();
        }
        if let Some(category) = &self.category {
            config.category = category.clone();
        }
        if let Some(dir) = &self.output_dir {
            config.output_dir = dir.clone();
        }
        if let Some(dir) = &self.checkpoint_dir {
            config.checkpoint_dir = dir.clone();
        }
        if let Some(max) = self.max_concurrent {
            config.max_concurrent_downloads = max;
        }
    }
}

/// Defaults, then the config file, then flags and environment.
pub fn resolve_config(explicit: Option<&Path>, overrides: &ConfigOverrides) -> Result<SyncConfig> {
    let mut config = match explicit {
        Some(path) => SyncConfig::load(path)
            .with_context(|| format!("Failed to load config file {}", path.display()))?,
        None => match default_config_path().filter(|p| p.is_file()) {
            Some(path) => {
                tracing::debug!("Using config file {}", path.display());
                SyncConfig::load(&path)
                    .with_context(|| format!("Failed to load config file {}", path.display()))?
            }
            None => SyncConfig::default(),
        },
    };
    overrides.apply(&mut config);
    config.validate().context("Invalid configuration")?;
    Ok(config)
}

fn default_config_path() -> Option<PathBuf> {
    cms_sync_logging::cms_sync_home()
        .ok()
        .map(|home| home.join("config.toml"))
}

/// Print a table with headers and rows
pub fn print_table(headers: &[&str], rows: Vec<Vec<String>>) {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL_CONDENSED)
        .set_content_arrangement(ContentArrangement::Dynamic);

    let header_cells: Vec<Cell> = headers
        .iter()
        .map(|h| Cell::new(h).fg(Color::Cyan))
        .collect();
    table.set_header(header_cells);

    for row in rows {
        table.add_row(row);
    }

    println!("{}", table);
}
