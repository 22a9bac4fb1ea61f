//! CMS Sync - incremental dataset mirroring
//!
//! Keeps a local directory of CSV files in step with a remote metastore
//! catalog. Each run picks up the datasets modified since the last successful
//! run, downloads them with a normalized header row, and records the outcome.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────┐     ┌───────────────┐     ┌────────────────┐     ┌──────────────┐
//! │ CheckpointStore  │────▶│ CatalogClient │────▶│ DatasetFetcher │────▶│ output dir   │
//! │ (watermark)      │     │ (eligible     │     │ × N, bounded   │     │ (clean CSVs) │
//! └──────────────────┘     │  datasets)    │     └────────────────┘     └──────────────┘
//!          ▲               └───────────────┘             │
//!          └──────────── RunRecord (SyncOrchestrator) ◀───┘
//! ```
//!
//! # Core Concepts
//!
//! - **Watermark**: date of the last successful run; only datasets modified
//!   after it are fetched
//! - **RunRecord**: outcome of one run, appended to history; a SUCCESS record
//!   also becomes the new watermark
//! - **Header normalization**: every header cell becomes a snake_case name

pub mod catalog;
pub mod checkpoint;
pub mod config;
pub mod error;
pub mod fetcher;
pub mod http;
pub mod normalize;
pub mod orchestrator;

// Re-exports for convenience
pub use catalog::{CatalogClient, CatalogEntry, Distribution, ResolvedDataset};
pub use checkpoint::{epoch_floor, CheckpointStore, FsCheckpointStore, RunRecord, RunStatus};
pub use config::SyncConfig;
pub use error::{Result, SyncError};
pub use fetcher::{DatasetFetcher, FetchOutcome, FetchedFile};
pub use http::{HttpResponse, HttpTransport, ReqwestTransport};
#[cfg(any(test, feature = "test-utils"))]
pub use http::MemoryTransport;
pub use normalize::{normalize, normalize_header_line};
pub use orchestrator::{DownloadTask, RunSettings, SyncOrchestrator, TaskState};
