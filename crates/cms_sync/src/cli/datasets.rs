//! `cms-sync datasets`

use anyhow::{Context, Result};
use chrono::NaiveDate;
use cms_sync::fetcher::output_file_name;
use cms_sync::{CatalogClient, CheckpointStore, FsCheckpointStore, ReqwestTransport, SyncConfig};
use std::sync::Arc;

use super::{print_table, CommandStatus};

/// Show what the next run would download, without downloading it.
pub async fn run(config: &SyncConfig, after: Option<NaiveDate>, json: bool) -> Result<CommandStatus> {
    let after = match after {
        Some(date) => date,
        None => FsCheckpointStore::new(config.checkpoint_dir.clone())
            .read_last_successful_watermark()
            .context("Failed to read watermark")?,
    };

    let client = CatalogClient::new(
        Arc::new(ReqwestTransport::new()),
        config.catalog_url.clone(),
        config.media_type.clone(),
        config.catalog_timeout(),
    );
    let datasets = client
        .list_changed(&config.category, after)
        .await
        .with_context(|| format!("Failed to query catalog {}", client.endpoint()))?;

    if json {
        println!("{}", serde_json::to_string_pretty(&datasets)?);
        return Ok(CommandStatus::Success);
    }

    println!(
        "{} {} dataset(s) modified after {}",
        datasets.len(),
        config.category,
        after
    );
    if datasets.is_empty() {
        return Ok(CommandStatus::Success);
    }

    let rows = datasets
        .iter()
        .map(|dataset| {
            vec![
                dataset.label.clone(),
                output_file_name(&dataset.download_url).unwrap_or_else(|_| "-".to_string()),
                dataset.download_url.clone(),
            ]
        })
        .collect();
    print_table(&["Dataset", "File", "Download URL"], rows);
    Ok(CommandStatus::Success)
}
