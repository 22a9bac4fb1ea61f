//! CMS Sync Test Utilities
//!
//! Test doubles for driving `SyncOrchestrator` without the network or a
//! well-behaved filesystem.
//!
//! # Usage
//!
//! ```rust,ignore
//! use cms_sync_test_utils::{FailingCheckpointStore, MemoryTransport, StoreFailure};
//!
//! let store = FailingCheckpointStore::new(dir, StoreFailure::AppendRunRecord);
//! let orchestrator = SyncOrchestrator::new(catalog, fetcher, Arc::new(store), settings);
//! assert!(orchestrator.run_on(date).await.is_err());
//! ```

pub mod store;
pub mod transport;

// Re-exports for convenience
pub use cms_sync::{HttpResponse, MemoryTransport};
pub use store::{FailingCheckpointStore, StoreFailure};
pub use transport::DelayedTransport;
