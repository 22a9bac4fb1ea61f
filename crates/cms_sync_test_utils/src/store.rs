//! Checkpoint store that fails on a chosen write

use chrono::NaiveDate;
use cms_sync::{CheckpointStore, FsCheckpointStore, Result, RunRecord, SyncError};
use std::io;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Which store operation fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreFailure {
    AppendRunRecord,
    OverwriteLastSuccessful,
}

/// A [`FsCheckpointStore`] whose `failure` operation returns an `Io` error.
///
/// Reads and the other write go through to the real store, so tests can
/// check what did land on disk.
#[derive(Debug)]
pub struct FailingCheckpointStore {
    inner: FsCheckpointStore,
    failure: StoreFailure,
    writes: AtomicUsize,
}

impl FailingCheckpointStore {
    pub fn new(dir: impl Into<PathBuf>, failure: StoreFailure) -> Self {
        Self {
            inner: FsCheckpointStore::new(dir),
            failure,
            writes: AtomicUsize::new(0),
        }
    }

    pub fn inner(&self) -> &FsCheckpointStore {
        &self.inner
    }

    /// Write attempts seen so far, failed ones included.
    pub fn write_attempts(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    fn injected_error(&self) -> SyncError {
        SyncError::io(
            self.inner.dir(),
            io::Error::new(io::ErrorKind::Other, "disk full"),
        )
    }
}

impl CheckpointStore for FailingCheckpointStore {
    fn read_last_successful_watermark(&self) -> Result<NaiveDate> {
        self.inner.read_last_successful_watermark()
    }

    fn append_run_record(&self, record: &RunRecord) -> Result<()> {
        self.writes.fetch_add(1, Ordering::SeqCst);
        if self.failure == StoreFailure::AppendRunRecord {
            return Err(self.injected_error());
        }
        self.inner.append_run_record(record)
    }

    fn overwrite_last_successful(&self, record: &RunRecord) -> Result<()> {
        self.writes.fetch_add(1, Ordering::SeqCst);
        if self.failure == StoreFailure::OverwriteLastSuccessful {
            return Err(self.injected_error());
        }
        self.inner.overwrite_last_successful(record)
    }
}
