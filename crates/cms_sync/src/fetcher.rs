//! Dataset download and header cleanup

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;
use url::Url;

use crate::error::{Result, SyncError};
use crate::http::HttpTransport;
use crate::normalize::normalize_header_line;

/// A dataset written to the output directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchedFile {
    pub url: String,
    pub path: PathBuf,
    pub bytes_written: u64,
}

/// Result of one fetch. Failures are values so the caller can aggregate them.
#[derive(Debug)]
pub enum FetchOutcome {
    Succeeded(FetchedFile),
    Failed(SyncError),
}

impl FetchOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, FetchOutcome::Succeeded(_))
    }
}

impl From<Result<FetchedFile>> for FetchOutcome {
    fn from(result: Result<FetchedFile>) -> Self {
        match result {
            Ok(file) => FetchOutcome::Succeeded(file),
            Err(err) => FetchOutcome::Failed(err),
        }
    }
}

/// Output file name for `url`: its last non-empty path segment.
pub fn output_file_name(url: &str) -> Result<String> {
    let parsed = Url::parse(url)
        .map_err(|e| SyncError::DataIntegrity(format!("invalid download URL '{}': {}", url, e)))?;
    parsed
        .path_segments()
        .and_then(|segments| segments.filter(|s| !s.is_empty()).last())
        .filter(|name| *name != "." && *name != "..")
        .map(str::to_string)
        .ok_or_else(|| {
            SyncError::DataIntegrity(format!("download URL '{}' has no file name", url))
        })
}

/// Replace the header line of `body` with its normalized form.
///
/// Everything after the first line terminator is kept byte-for-byte, whatever
/// its encoding. Only the header is decoded; normalization drops non-ASCII
/// characters, so invalid UTF-8 there is replaced rather than rejected. An
/// empty body has no header and is rejected.
pub fn normalize_csv_body(body: &[u8]) -> Result<Vec<u8>> {
    if body.is_empty() {
        return Err(SyncError::DataIntegrity(
            "downloaded file is empty (no header row)".to_string(),
        ));
    }

    let (first_line, rest) = match body.iter().position(|&b| b == b'\n') {
        Some(idx) => body.split_at(idx),
        None => (body, &[][..]),
    };
    let (header, carriage_return) = match first_line.strip_suffix(b"\r") {
        Some(header) => (header, &b"\r"[..]),
        None => (first_line, &b""[..]),
    };

    let normalized = normalize_header_line(&String::from_utf8_lossy(header));
    let mut out = Vec::with_capacity(body.len());
    out.extend_from_slice(normalized.as_bytes());
    out.extend_from_slice(carriage_return);
    out.extend_from_slice(rest);
    Ok(out)
}

/// Downloads one dataset and writes it with a normalized header.
#[derive(Clone)]
pub struct DatasetFetcher {
    transport: Arc<dyn HttpTransport>,
    timeout: Duration,
}

impl DatasetFetcher {
    pub fn new(transport: Arc<dyn HttpTransport>, timeout: Duration) -> Self {
        Self { transport, timeout }
    }

    /// Download `url` into `destination_dir`, replacing any existing file of
    /// the same name.
    pub async fn fetch(&self, url: &str, destination_dir: &Path) -> FetchOutcome {
        self.try_fetch(url, destination_dir).await.into()
    }

    async fn try_fetch(&self, url: &str, destination_dir: &Path) -> Result<FetchedFile> {
        let path = destination_dir.join(output_file_name(url)?);

        let response = self
            .transport
            .get(url, self.timeout)
            .await?
            .error_for_status(url)?;

        let content = normalize_csv_body(&response.body).map_err(|e| match e {
            SyncError::DataIntegrity(message) => {
                SyncError::DataIntegrity(format!("{}: {}", message, url))
            }
            other => other,
        })?;

        tokio::fs::write(&path, &content)
            .await
            .map_err(|e| SyncError::io(&path, e))?;

        debug!(%url, path = %path.display(), bytes = content.len(), "Saved dataset");
        Ok(FetchedFile {
            url: url.to_string(),
            path,
            bytes_written: content.len() as u64,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::{HttpResponse, MemoryTransport};

    fn fetcher(transport: Arc<MemoryTransport>) -> DatasetFetcher {
        DatasetFetcher::new(transport, Duration::from_secs(30))
    }

    #[test]
    fn test_output_file_name() {
        assert_eq!(
            output_file_name("https://data.cms.gov/provider-data/sites/default/files/resources/abc/Hospital_General_Information.csv").unwrap(),
            "Hospital_General_Information.csv"
        );
        assert_eq!(
            output_file_name("https://data.test/files/x.csv?version=2#top").unwrap(),
            "x.csv"
        );
        assert_eq!(output_file_name("https://data.test/files/x.csv/").unwrap(), "x.csv");
        assert!(output_file_name("https://data.test/").is_err());
        assert!(output_file_name("not a url").is_err());
    }

    #[test]
    fn test_header_normalized_rows_untouched() {
        let out = normalize_csv_body(b"A,B Name,cID\n1,2,3").unwrap();
        assert_eq!(out, b"a,b_name,c_id\n1,2,3");

        let body = "Facility Name,ZIP Code\nSt. Mary's,  01234 \n\"A, Inc\",99999\n";
        let out = String::from_utf8(normalize_csv_body(body.as_bytes()).unwrap()).unwrap();
        let (head, rest) = out.split_once('\n').unwrap();
        assert_eq!(head, "facility_name,zip_code");
        assert_eq!(rest, body.split_once('\n').unwrap().1);
    }

    #[test]
    fn test_crlf_preserved() {
        let out = normalize_csv_body(b"Provider ID,State\r\n010001,AL\r\n").unwrap();
        assert_eq!(out, b"provider_id,state\r\n010001,AL\r\n");
    }

    #[test]
    fn test_non_utf8_rows_kept_verbatim() {
        // Latin-1 "Caf\xe9" in a data row, and in the header.
        let out = normalize_csv_body(b"Facility Name\nCaf\xe9 Hospital\n").unwrap();
        assert_eq!(out, b"facility_name\nCaf\xe9 Hospital\n");

        let out = normalize_csv_body(b"Caf\xe9 Name,City\r\nA,B\r\n").unwrap();
        assert_eq!(out, b"caf_name,city\r\nA,B\r\n");
    }

    #[test]
    fn test_header_only_body() {
        assert_eq!(normalize_csv_body(b"Measure ID").unwrap(), b"measure_id");
    }

    #[test]
    fn test_empty_body_rejected() {
        assert!(matches!(
            normalize_csv_body(b""),
            Err(SyncError::DataIntegrity(_))
        ));
    }

    #[tokio::test]
    async fn test_fetch_writes_normalized_file() {
        let tmp = tempfile::tempdir().unwrap();
        let url = "https://data.test/files/general.csv";
        let transport = Arc::new(MemoryTransport::new());
        transport.respond(url, HttpResponse::ok("Facility Name,City\nGood Hope,Ames"));

        let outcome = fetcher(transport).fetch(url, tmp.path()).await;
        let file = match outcome {
            FetchOutcome::Succeeded(file) => file,
            FetchOutcome::Failed(err) => panic!("expected success, got {}", err),
        };
        assert_eq!(file.path, tmp.path().join("general.csv"));
        let written = std::fs::read_to_string(&file.path).unwrap();
        assert_eq!(written, "facility_name,city\nGood Hope,Ames");
        assert_eq!(file.bytes_written, written.len() as u64);
    }

    #[tokio::test]
    async fn test_fetch_overwrites_existing_file() {
        let tmp = tempfile::tempdir().unwrap();
        std::fs::write(tmp.path().join("general.csv"), "stale content that is longer").unwrap();
        let url = "https://data.test/files/general.csv";
        let transport = Arc::new(MemoryTransport::new());
        transport.respond(url, HttpResponse::ok("X\n1"));

        assert!(fetcher(transport).fetch(url, tmp.path()).await.is_success());
        assert_eq!(
            std::fs::read_to_string(tmp.path().join("general.csv")).unwrap(),
            "x\n1"
        );
    }

    #[tokio::test]
    async fn test_fetch_writes_non_utf8_rows_unchanged() {
        let tmp = tempfile::tempdir().unwrap();
        let url = "https://data.test/files/latin1.csv";
        let transport = Arc::new(MemoryTransport::new());
        transport.respond(url, HttpResponse::ok(&b"Facility Name\nCaf\xe9 Hospital\n"[..]));

        assert!(fetcher(transport).fetch(url, tmp.path()).await.is_success());
        assert_eq!(
            std::fs::read(tmp.path().join("latin1.csv")).unwrap(),
            b"facility_name\nCaf\xe9 Hospital\n"
        );
    }

    #[tokio::test]
    async fn test_fetch_failures_are_typed() {
        let tmp = tempfile::tempdir().unwrap();
        let transport = Arc::new(MemoryTransport::new());
        transport
            .respond("https://data.test/gone.csv", HttpResponse::with_status(404, ""))
            .respond("https://data.test/empty.csv", HttpResponse::ok(""))
            .fail("https://data.test/down.csv", "connection reset");
        let fetcher = fetcher(transport);

        let gone = fetcher.fetch("https://data.test/gone.csv", tmp.path()).await;
        assert!(matches!(gone, FetchOutcome::Failed(SyncError::Network { .. })));

        let down = fetcher.fetch("https://data.test/down.csv", tmp.path()).await;
        assert!(matches!(down, FetchOutcome::Failed(SyncError::Network { .. })));

        let empty = fetcher.fetch("https://data.test/empty.csv", tmp.path()).await;
        match empty {
            FetchOutcome::Failed(SyncError::DataIntegrity(message)) => {
                assert!(message.contains("empty.csv"))
            }
            other => panic!("expected data integrity failure, got {:?}", other),
        }
        assert!(!tmp.path().join("empty.csv").exists());
    }

    #[tokio::test]
    async fn test_fetch_into_missing_directory_is_io_error() {
        let tmp = tempfile::tempdir().unwrap();
        let url = "https://data.test/a.csv";
        let transport = Arc::new(MemoryTransport::new());
        transport.respond(url, HttpResponse::ok("A\n1"));

        let outcome = fetcher(transport)
            .fetch(url, &tmp.path().join("does/not/exist"))
            .await;
        assert!(matches!(outcome, FetchOutcome::Failed(SyncError::Io { .. })));
    }
}
