//! Error types for the sync pipeline

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Sync error type
#[derive(Error, Debug)]
pub enum SyncError {
    /// Transport failure, timeout, or non-success HTTP status.
    #[error("Network error for {url}: {message}")]
    Network { url: String, message: String },

    /// Malformed catalog response or checkpoint file.
    #[error("Parse error: {0}")]
    Parse(String),

    /// The remote data broke an expectation (missing CSV distribution, empty body, ...).
    #[error("Data integrity error: {0}")]
    DataIntegrity(String),

    #[error("IO error at {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Config error: {0}")]
    Config(String),
}

impl SyncError {
    pub fn network(url: impl Into<String>, message: impl ToString) -> Self {
        Self::Network {
            url: url.into(),
            message: message.to_string(),
        }
    }

    pub fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Short machine-friendly name of the error class.
    pub fn kind(&self) -> &'static str {
        match self {
            SyncError::Network { .. } => "network",
            SyncError::Parse(_) => "parse",
            SyncError::DataIntegrity(_) => "data_integrity",
            SyncError::Io { .. } => "io",
            SyncError::Config(_) => "config",
        }
    }
}

/// Result type alias
pub type Result<T> = std::result::Result<T, SyncError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_includes_context() {
        let err = SyncError::network("https://example.test/a.csv", "HTTP 503");
        assert_eq!(
            err.to_string(),
            "Network error for https://example.test/a.csv: HTTP 503"
        );
        assert_eq!(err.kind(), "network");

        let err = SyncError::io(
            "/data/out.csv",
            io::Error::new(io::ErrorKind::PermissionDenied, "denied"),
        );
        assert!(err.to_string().contains("/data/out.csv"));
        assert_eq!(err.kind(), "io");
    }
}
