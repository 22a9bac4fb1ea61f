//! `cms-sync run`

use anyhow::{Context, Result};
use cms_sync::{ReqwestTransport, RunRecord, SyncConfig, SyncOrchestrator};
use std::sync::Arc;

use super::CommandStatus;

/// Perform one sync run and report it.
pub async fn run(config: &SyncConfig) -> Result<CommandStatus> {
    let transport = Arc::new(ReqwestTransport::new());
    let orchestrator = SyncOrchestrator::from_config(config, transport);

    let record = orchestrator.run().await.with_context(|| {
        format!(
            "Failed to read or write checkpoints in {}",
            config.checkpoint_dir.display()
        )
    })?;

    print_summary(config, &record);
    Ok(if record.is_success() {
        CommandStatus::Success
    } else {
        CommandStatus::RunFailed
    })
}

fn print_summary(config: &SyncConfig, record: &RunRecord) {
    if record.is_success() {
        println!(
            "SUCCESS: {} dataset(s) synced to {} (watermark now {})",
            record.files_attempted,
            config.output_dir.display(),
            record.run_date
        );
        return;
    }

    eprintln!(
        "FAILED: {} dataset(s) attempted on {}",
        record.files_attempted, record.run_date
    );
    if let Some(message) = &record.error_message {
        eprintln!("  {}", message);
    }
    for detail in &record.failure_details {
        eprintln!("  - {}", detail);
    }
    eprintln!(
        "Run record written to {}",
        config.checkpoint_dir.display()
    );
}
