//! `cms-sync status`

use anyhow::{Context, Result};
use cms_sync::{CheckpointStore, FsCheckpointStore, SyncConfig};

use super::{print_table, CommandStatus};

pub fn run(config: &SyncConfig, json: bool) -> Result<CommandStatus> {
    let store = FsCheckpointStore::new(config.checkpoint_dir.clone());
    let watermark = store
        .read_last_successful_watermark()
        .context("Failed to read watermark")?;
    let last_successful = store
        .last_successful()
        .context("Failed to read last successful run")?;
    let history = store.history().context("Failed to read run history")?;

    if json {
        let value = serde_json::json!({
            "checkpoint_dir": config.checkpoint_dir,
            "watermark": watermark,
            "last_successful": last_successful,
            "runs": history,
        });
        println!("{}", serde_json::to_string_pretty(&value)?);
        return Ok(CommandStatus::Success);
    }

    match &last_successful {
        Some(record) => println!(
            "Watermark: {} ({} dataset(s) in that run)",
            watermark, record.files_attempted
        ),
        None => println!("Watermark: none (next run syncs every eligible dataset)"),
    }

    if history.is_empty() {
        println!("No runs recorded in {}", config.checkpoint_dir.display());
        return Ok(CommandStatus::Success);
    }

    let rows = history
        .iter()
        .rev()
        .map(|record| {
            vec![
                record.run_date.to_string(),
                record.status.as_str().to_string(),
                record.files_attempted.to_string(),
                record.failure_details.len().to_string(),
                record.error_message.clone().unwrap_or_default(),
            ]
        })
        .collect();
    print_table(&["Run date", "Status", "Attempted", "Failed", "Error"], rows);
    Ok(CommandStatus::Success)
}
