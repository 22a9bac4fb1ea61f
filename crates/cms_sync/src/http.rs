//! HTTP transport seam
//!
//! The catalog client and the dataset fetcher only ever issue plain GETs and
//! take the body as raw bytes. They go through [`HttpTransport`] so the
//! pipeline can run against an in-memory transport in tests (enabled by the
//! `test-utils` feature).

use async_trait::async_trait;
use std::time::Duration;

use crate::error::{Result, SyncError};

#[cfg(any(test, feature = "test-utils"))]
mod memory;
#[cfg(any(test, feature = "test-utils"))]
pub use memory::MemoryTransport;

/// A completed HTTP exchange. Non-2xx statuses are returned, not raised.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub body: Vec<u8>,
}

impl HttpResponse {
    pub fn ok(body: impl Into<Vec<u8>>) -> Self {
        Self {
            status: 200,
            body: body.into(),
        }
    }

    pub fn with_status(status: u16, body: impl Into<Vec<u8>>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Turn a non-2xx response into a `Network` error for `url`.
    pub fn error_for_status(self, url: &str) -> Result<Self> {
        if self.is_success() {
            Ok(self)
        } else {
            Err(SyncError::network(url, format!("HTTP status {}", self.status)))
        }
    }
}

#[async_trait]
pub trait HttpTransport: Send + Sync {
    /// GET `url`, failing with `Network` on transport errors or timeout.
    async fn get(&self, url: &str, timeout: Duration) -> Result<HttpResponse>;
}

/// Production transport backed by a shared `reqwest::Client`.
#[derive(Debug, Clone, Default)]
pub struct ReqwestTransport {
    client: reqwest::Client,
}

impl ReqwestTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl HttpTransport for ReqwestTransport {
    async fn get(&self, url: &str, timeout: Duration) -> Result<HttpResponse> {
        let response = self
            .client
            .get(url)
            .timeout(timeout)
            .send()
            .await
            .map_err(|e| SyncError::network(url, e))?;

        let status = response.status().as_u16();
        // Raw bytes: data rows are written back unchanged, whatever their encoding.
        let body = response
            .bytes()
            .await
            .map_err(|e| SyncError::network(url, e))?;

        Ok(HttpResponse {
            status,
            body: body.to_vec(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_for_status() {
        assert!(HttpResponse::ok("x").error_for_status("u").is_ok());
        assert!(HttpResponse::with_status(204, "").error_for_status("u").is_ok());

        let err = HttpResponse::with_status(500, "boom")
            .error_for_status("https://example.test/x")
            .unwrap_err();
        assert!(matches!(err, SyncError::Network { .. }));
        assert!(err.to_string().contains("500"));
    }

    #[tokio::test]
    async fn test_memory_transport_routes() {
        let transport = MemoryTransport::new();
        transport
            .respond("https://example.test/a", HttpResponse::ok("hello"))
            .fail("https://example.test/b", "connection refused");

        let timeout = Duration::from_secs(1);
        let a = transport.get("https://example.test/a", timeout).await.unwrap();
        assert_eq!(a.body, b"hello");

        let b = transport.get("https://example.test/b", timeout).await;
        assert!(matches!(b, Err(SyncError::Network { .. })));

        let c = transport.get("https://example.test/c", timeout).await.unwrap();
        assert_eq!(c.status, 404);

        assert_eq!(
            transport.requests(),
            vec![
                "https://example.test/a",
                "https://example.test/b",
                "https://example.test/c"
            ]
        );
    }
}
