//! One incremental sync run
//!
//! ```text
//! START ──▶ read watermark ──▶ list_changed ──▶ fetch × N (bounded) ──▶ aggregate ──▶ checkpoint ──▶ END
//!                                  │
//!                                  └─ failure: FAILED record, 0 attempted
//! ```
//!
//! Nothing is written to the checkpoint store until every download has
//! finished. The watermark only moves when the whole run succeeds, so a failed
//! run is retried in full next time.

use chrono::NaiveDate;
use futures_util::stream::{FuturesUnordered, StreamExt};
use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tracing::{debug, error, info, warn};

use crate::catalog::{CatalogClient, ResolvedDataset};
use crate::checkpoint::{CheckpointStore, FsCheckpointStore, RunRecord};
use crate::config::SyncConfig;
use crate::error::{Result, SyncError};
use crate::fetcher::{output_file_name, DatasetFetcher, FetchOutcome, FetchedFile};
use crate::http::HttpTransport;

/// Per-run knobs that are not owned by the collaborators.
#[derive(Debug, Clone)]
pub struct RunSettings {
    pub category: String,
    pub output_dir: PathBuf,
    pub max_concurrent_downloads: usize,
}

impl From<&SyncConfig> for RunSettings {
    fn from(config: &SyncConfig) -> Self {
        Self {
            category: config.category.clone(),
            output_dir: config.output_dir.clone(),
            max_concurrent_downloads: config.max_concurrent_downloads,
        }
    }
}

#[derive(Debug)]
pub enum TaskState {
    Pending,
    Succeeded(FetchedFile),
    Failed(SyncError),
}

/// One dataset download within a run.
#[derive(Debug)]
pub struct DownloadTask {
    pub url: String,
    pub label: String,
    pub state: TaskState,
}

impl DownloadTask {
    fn pending(dataset: ResolvedDataset) -> Self {
        Self {
            url: dataset.download_url,
            label: dataset.label,
            state: TaskState::Pending,
        }
    }

    fn failure_message(&self) -> Option<String> {
        match &self.state {
            TaskState::Succeeded(_) => None,
            TaskState::Failed(err) => Some(format!("{}: {}", self.url, err)),
            TaskState::Pending => Some(format!("{}: download did not complete", self.url)),
        }
    }
}

/// Build one task per dataset. A dataset whose output file name was already
/// claimed earlier in the run fails up front instead of overwriting it.
pub fn plan_tasks(datasets: Vec<ResolvedDataset>) -> Vec<DownloadTask> {
    let mut claimed = HashSet::new();
    datasets
        .into_iter()
        .map(|dataset| {
            let mut task = DownloadTask::pending(dataset);
            match output_file_name(&task.url) {
                Ok(name) if !claimed.insert(name.clone()) => {
                    task.state = TaskState::Failed(SyncError::DataIntegrity(format!(
                        "output file name '{}' already used by another dataset in this run",
                        name
                    )));
                }
                Ok(_) => {}
                Err(err) => task.state = TaskState::Failed(err),
            }
            task
        })
        .collect()
}

/// Fold finished tasks into the run's record.
pub fn summarize(run_date: NaiveDate, tasks: &[DownloadTask]) -> RunRecord {
    let attempted = tasks.len();
    let failures: Vec<String> = tasks.iter().filter_map(DownloadTask::failure_message).collect();
    if failures.is_empty() {
        RunRecord::success(run_date, attempted)
    } else {
        RunRecord::failed(
            run_date,
            attempted,
            format!(
                "{} of {} downloads failed; see download_exceptions for details",
                failures.len(),
                attempted
            ),
            failures,
        )
    }
}

pub struct SyncOrchestrator {
    catalog: CatalogClient,
    fetcher: DatasetFetcher,
    store: Arc<dyn CheckpointStore>,
    settings: RunSettings,
}

impl SyncOrchestrator {
    pub fn new(
        catalog: CatalogClient,
        fetcher: DatasetFetcher,
        store: Arc<dyn CheckpointStore>,
        settings: RunSettings,
    ) -> Self {
        Self {
            catalog,
            fetcher,
            store,
            settings,
        }
    }

    /// Wire up the default collaborators: `transport` for HTTP and a
    /// filesystem checkpoint store at `config.checkpoint_dir`.
    pub fn from_config(config: &SyncConfig, transport: Arc<dyn HttpTransport>) -> Self {
        let catalog = CatalogClient::new(
            Arc::clone(&transport),
            config.catalog_url.clone(),
            config.media_type.clone(),
            config.catalog_timeout(),
        );
        let fetcher = DatasetFetcher::new(transport, config.download_timeout());
        let store = Arc::new(FsCheckpointStore::new(config.checkpoint_dir.clone()));
        Self::new(catalog, fetcher, store, RunSettings::from(config))
    }

    /// Run with today's local date as the run date.
    pub async fn run(&self) -> Result<RunRecord> {
        self.run_on(chrono::Local::now().date_naive()).await
    }

    /// Execute one run and record it.
    ///
    /// Catalog and download failures come back as a FAILED record. `Err` means
    /// the checkpoint store itself could not be read or written.
    pub async fn run_on(&self, run_date: NaiveDate) -> Result<RunRecord> {
        let watermark = self.store.read_last_successful_watermark()?;
        info!(%run_date, %watermark, category = %self.settings.category, "Starting sync run");

        let record = self.execute(run_date, watermark).await;

        self.store.append_run_record(&record)?;
        if record.is_success() {
            self.store.overwrite_last_successful(&record)?;
            info!(
                files = record.files_attempted,
                "Sync run succeeded; watermark advanced to {}", run_date
            );
        } else {
            warn!(
                files = record.files_attempted,
                failures = record.failure_details.len(),
                "Sync run failed; watermark stays at {}", watermark
            );
        }
        Ok(record)
    }

    async fn execute(&self, run_date: NaiveDate, watermark: NaiveDate) -> RunRecord {
        let datasets = match self
            .catalog
            .list_changed(&self.settings.category, watermark)
            .await
        {
            Ok(datasets) => datasets,
            Err(err) => {
                error!("Catalog query failed: {}", err);
                return RunRecord::failed(
                    run_date,
                    0,
                    format!("catalog query failed: {}", err),
                    Vec::new(),
                );
            }
        };

        let output_dir = &self.settings.output_dir;
        if let Err(err) = tokio::fs::create_dir_all(output_dir).await {
            let err = SyncError::io(output_dir, err);
            error!("Cannot prepare output directory: {}", err);
            return RunRecord::failed(run_date, 0, err.to_string(), Vec::new());
        }

        let mut tasks = plan_tasks(datasets);
        self.download_all(&mut tasks).await;
        summarize(run_date, &tasks)
    }

    /// Fetch every pending task, at most `max_concurrent_downloads` at a time.
    /// A failed fetch never stops the others.
    async fn download_all(&self, tasks: &mut [DownloadTask]) {
        let limit = self.settings.max_concurrent_downloads.max(1);
        let semaphore = Arc::new(Semaphore::new(limit));
        let output_dir = self.settings.output_dir.as_path();
        let mut in_flight = FuturesUnordered::new();

        for (idx, task) in tasks.iter().enumerate() {
            if !matches!(task.state, TaskState::Pending) {
                continue;
            }
            let semaphore = Arc::clone(&semaphore);
            let url = task.url.clone();
            let fetcher = &self.fetcher;
            in_flight.push(async move {
                let outcome = match semaphore.acquire().await {
                    Ok(_permit) => fetcher.fetch(&url, output_dir).await,
                    Err(_) => FetchOutcome::Failed(SyncError::network(
                        url.as_str(),
                        "download scheduler closed",
                    )),
                };
                (idx, outcome)
            });
        }
        debug!(queued = in_flight.len(), limit, "Dispatched downloads");

        let mut results = Vec::with_capacity(in_flight.len());
        while let Some(result) = in_flight.next().await {
            results.push(result);
        }
        drop(in_flight);

        for (idx, outcome) in results {
            let task = &mut tasks[idx];
            task.state = match outcome {
                FetchOutcome::Succeeded(file) => {
                    debug!(url = %task.url, bytes = file.bytes_written, "Download finished");
                    TaskState::Succeeded(file)
                }
                FetchOutcome::Failed(err) => {
                    warn!(url = %task.url, dataset = %task.label, "Download failed: {}", err);
                    TaskState::Failed(err)
                }
            };
        }
    }
}
