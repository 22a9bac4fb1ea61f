//! Checkpoint persistence
//!
//! Layout of the checkpoint directory:
//!
//! ```text
//! _checkpoints/
//!   last_successful.json     pointer to the newest SUCCESS run (the watermark)
//!   2024-06-01_run.json      one record per run date, SUCCESS or FAILED
//!   2024-06-02_run.json
//! ```

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use crate::error::{Result, SyncError};

const LAST_SUCCESSFUL_FILE: &str = "last_successful.json";
/// Pointer name written by earlier releases; read when the current one is absent.
const LEGACY_LAST_SUCCESSFUL_FILE: &str = "last_succesfull.json";
const RUN_FILE_SUFFIX: &str = "_run.json";

/// Watermark used before any run has succeeded.
pub fn epoch_floor() -> NaiveDate {
    NaiveDate::from_ymd_opt(1, 1, 1).unwrap_or(NaiveDate::MIN)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RunStatus {
    Success,
    Failed,
}

impl RunStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RunStatus::Success => "SUCCESS",
            RunStatus::Failed => "FAILED",
        }
    }
}

/// Outcome of one sync run. Written once, never updated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunRecord {
    #[serde(rename = "last_run")]
    pub run_date: NaiveDate,
    pub files_attempted: usize,
    pub status: RunStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    #[serde(
        rename = "download_exceptions",
        default,
        skip_serializing_if = "Vec::is_empty"
    )]
    pub failure_details: Vec<String>,
}

impl RunRecord {
    pub fn success(run_date: NaiveDate, files_attempted: usize) -> Self {
        Self {
            run_date,
            files_attempted,
            status: RunStatus::Success,
            error_message: None,
            failure_details: Vec::new(),
        }
    }

    pub fn failed(
        run_date: NaiveDate,
        files_attempted: usize,
        error_message: impl Into<String>,
        failure_details: Vec<String>,
    ) -> Self {
        Self {
            run_date,
            files_attempted,
            status: RunStatus::Failed,
            error_message: Some(error_message.into()),
            failure_details,
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == RunStatus::Success
    }
}

/// Durable watermark and run history.
pub trait CheckpointStore: Send + Sync {
    /// Run date of the last SUCCESS run, or [`epoch_floor`] if there is none.
    fn read_last_successful_watermark(&self) -> Result<NaiveDate>;

    /// Add `record` to the run history. Same-date records replace each other.
    fn append_run_record(&self, record: &RunRecord) -> Result<()>;

    /// Point the watermark at `record`.
    fn overwrite_last_successful(&self, record: &RunRecord) -> Result<()>;
}

/// JSON files in a single directory.
#[derive(Debug, Clone)]
pub struct FsCheckpointStore {
    dir: PathBuf,
}

impl FsCheckpointStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn last_successful_path(&self) -> PathBuf {
        self.dir.join(LAST_SUCCESSFUL_FILE)
    }

    pub fn run_path(&self, run_date: NaiveDate) -> PathBuf {
        self.dir
            .join(format!("{}{}", run_date.format("%Y-%m-%d"), RUN_FILE_SUFFIX))
    }

    /// The record the watermark currently points at.
    pub fn last_successful(&self) -> Result<Option<RunRecord>> {
        let current = self.last_successful_path();
        if let Some(record) = read_record(&current)? {
            return Ok(Some(record));
        }
        let legacy = self.dir.join(LEGACY_LAST_SUCCESSFUL_FILE);
        let record = read_record(&legacy)?;
        if record.is_some() {
            debug!(path = %legacy.display(), "Using legacy last-successful pointer");
        }
        Ok(record)
    }

    /// Every run record in the directory, oldest first.
    pub fn history(&self) -> Result<Vec<RunRecord>> {
        let entries = match fs::read_dir(&self.dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(SyncError::io(&self.dir, e)),
        };

        let mut records = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| SyncError::io(&self.dir, e))?;
            let name = entry.file_name();
            let Some(name) = name.to_str() else {
                continue;
            };
            if !name.ends_with(RUN_FILE_SUFFIX) {
                continue;
            }
            match read_record(&entry.path()) {
                Ok(Some(record)) => records.push(record),
                Ok(None) => {}
                Err(err) => warn!("Skipping unreadable run record {}: {}", name, err),
            }
        }
        records.sort_by_key(|r| r.run_date);
        Ok(records)
    }

    fn write_record(&self, path: &Path, record: &RunRecord) -> Result<()> {
        fs::create_dir_all(&self.dir).map_err(|e| SyncError::io(&self.dir, e))?;
        let json = serde_json::to_string_pretty(record)
            .map_err(|e| SyncError::Parse(format!("cannot serialize run record: {}", e)))?;

        // Write beside the target, then rename over it.
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, json).map_err(|e| SyncError::io(&tmp, e))?;
        fs::rename(&tmp, path).map_err(|e| SyncError::io(path, e))?;
        debug!(path = %path.display(), status = record.status.as_str(), "Wrote checkpoint");
        Ok(())
    }
}

impl CheckpointStore for FsCheckpointStore {
    fn read_last_successful_watermark(&self) -> Result<NaiveDate> {
        Ok(self
            .last_successful()?
            .map(|record| record.run_date)
            .unwrap_or_else(epoch_floor))
    }

    fn append_run_record(&self, record: &RunRecord) -> Result<()> {
        self.write_record(&self.run_path(record.run_date), record)
    }

    fn overwrite_last_successful(&self, record: &RunRecord) -> Result<()> {
        self.write_record(&self.last_successful_path(), record)
    }
}

fn read_record(path: &Path) -> Result<Option<RunRecord>> {
    let content = match fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(SyncError::io(path, e)),
    };
    serde_json::from_str(&content).map(Some).map_err(|e| {
        SyncError::Parse(format!("invalid checkpoint {}: {}", path.display(), e))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    #[test]
    fn test_watermark_defaults_to_epoch_floor() {
        let tmp = tempfile::tempdir().unwrap();
        let store = FsCheckpointStore::new(tmp.path().join("missing"));
        assert_eq!(store.read_last_successful_watermark().unwrap(), epoch_floor());
        assert_eq!(epoch_floor(), date("0001-01-01"));
        assert!(store.history().unwrap().is_empty());
    }

    #[test]
    fn test_success_record_json_shape() {
        let record = RunRecord::success(date("2024-06-01"), 3);
        let value = serde_json::to_value(&record).unwrap();
        assert_eq!(
            value,
            serde_json::json!({
                "last_run": "2024-06-01",
                "files_attempted": 3,
                "status": "SUCCESS"
            })
        );
    }

    #[test]
    fn test_failed_record_json_shape() {
        let record = RunRecord::failed(
            date("2024-06-02"),
            2,
            "1 of 2 downloads failed",
            vec!["Network error for https://x.test/a.csv: HTTP status 500".to_string()],
        );
        let value = serde_json::to_value(&record).unwrap();
        assert_eq!(value["status"], "FAILED");
        assert_eq!(value["error_message"], "1 of 2 downloads failed");
        assert_eq!(value["download_exceptions"].as_array().unwrap().len(), 1);
    }

    #[test]
    fn test_overwrite_moves_watermark() {
        let tmp = tempfile::tempdir().unwrap();
        let store = FsCheckpointStore::new(tmp.path());

        store
            .overwrite_last_successful(&RunRecord::success(date("2024-06-01"), 1))
            .unwrap();
        assert_eq!(store.read_last_successful_watermark().unwrap(), date("2024-06-01"));

        store
            .overwrite_last_successful(&RunRecord::success(date("2024-06-05"), 0))
            .unwrap();
        assert_eq!(store.read_last_successful_watermark().unwrap(), date("2024-06-05"));
        assert!(!tmp.path().join("last_successful.json.tmp").exists());
    }

    #[test]
    fn test_pretty_printed_with_two_space_indent() {
        let tmp = tempfile::tempdir().unwrap();
        let store = FsCheckpointStore::new(tmp.path());
        let record = RunRecord::success(date("2024-06-01"), 1);
        store.append_run_record(&record).unwrap();

        let content = fs::read_to_string(tmp.path().join("2024-06-01_run.json")).unwrap();
        assert!(content.starts_with("{\n  \"last_run\": \"2024-06-01\""));
    }

    #[test]
    fn test_history_is_sorted_and_same_date_overwrites() {
        let tmp = tempfile::tempdir().unwrap();
        let store = FsCheckpointStore::new(tmp.path());

        store
            .append_run_record(&RunRecord::failed(date("2024-06-03"), 4, "boom", vec![]))
            .unwrap();
        store
            .append_run_record(&RunRecord::success(date("2024-06-01"), 2))
            .unwrap();
        store
            .append_run_record(&RunRecord::success(date("2024-06-03"), 5))
            .unwrap();
        fs::write(tmp.path().join("notes.txt"), "ignored").unwrap();

        let history = store.history().unwrap();
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].run_date, date("2024-06-01"));
        assert_eq!(history[1], RunRecord::success(date("2024-06-03"), 5));
    }

    #[test]
    fn test_appending_history_does_not_move_watermark() {
        let tmp = tempfile::tempdir().unwrap();
        let store = FsCheckpointStore::new(tmp.path());
        store
            .append_run_record(&RunRecord::success(date("2024-06-03"), 5))
            .unwrap();
        assert_eq!(store.read_last_successful_watermark().unwrap(), epoch_floor());
    }

    #[test]
    fn test_reads_legacy_pointer() {
        let tmp = tempfile::tempdir().unwrap();
        fs::write(
            tmp.path().join("last_succesfull.json"),
            r#"{"last_run": "2023-11-20", "files_attempted": 7, "status": "SUCCESS"}"#,
        )
        .unwrap();
        let store = FsCheckpointStore::new(tmp.path());
        assert_eq!(store.read_last_successful_watermark().unwrap(), date("2023-11-20"));

        store
            .overwrite_last_successful(&RunRecord::success(date("2024-01-02"), 1))
            .unwrap();
        assert_eq!(store.read_last_successful_watermark().unwrap(), date("2024-01-02"));
    }

    #[test]
    fn test_corrupt_pointer_is_parse_error() {
        let tmp = tempfile::tempdir().unwrap();
        fs::write(tmp.path().join("last_successful.json"), "{oops").unwrap();
        let store = FsCheckpointStore::new(tmp.path());
        assert!(matches!(
            store.read_last_successful_watermark(),
            Err(SyncError::Parse(_))
        ));
    }

    #[test]
    fn test_write_failure_is_io_error() {
        let tmp = tempfile::tempdir().unwrap();
        let blocker = tmp.path().join("not_a_dir");
        fs::write(&blocker, "file").unwrap();
        let store = FsCheckpointStore::new(&blocker);
        let err = store
            .append_run_record(&RunRecord::success(date("2024-06-01"), 0))
            .unwrap_err();
        assert!(matches!(err, SyncError::Io { .. }));
    }
}
