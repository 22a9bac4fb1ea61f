//! Transport that holds every download open for a while

use async_trait::async_trait;
use cms_sync::{HttpResponse, HttpTransport, Result};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

/// Serves `catalog` at `catalog_url` immediately and `csv` for every other
/// URL after `delay`, tracking how many downloads overlap.
#[derive(Debug)]
pub struct DelayedTransport {
    catalog_url: String,
    catalog: String,
    csv: String,
    delay: Duration,
    in_flight: AtomicUsize,
    peak: AtomicUsize,
}

impl DelayedTransport {
    pub fn new(
        catalog_url: impl Into<String>,
        catalog: impl Into<String>,
        csv: impl Into<String>,
        delay: Duration,
    ) -> Self {
        Self {
            catalog_url: catalog_url.into(),
            catalog: catalog.into(),
            csv: csv.into(),
            delay,
            in_flight: AtomicUsize::new(0),
            peak: AtomicUsize::new(0),
        }
    }

    /// Most downloads ever in flight at once.
    pub fn peak_in_flight(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl HttpTransport for DelayedTransport {
    async fn get(&self, url: &str, _timeout: Duration) -> Result<HttpResponse> {
        if url == self.catalog_url {
            return Ok(HttpResponse::ok(self.catalog.clone()));
        }
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
        tokio::time::sleep(self.delay).await;
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        Ok(HttpResponse::ok(self.csv.clone()))
    }
}
