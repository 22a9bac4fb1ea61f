//! Catalog discovery
//!
//! The catalog is a metastore endpoint returning every dataset record in one
//! JSON array. A record is eligible when it carries the target theme and was
//! modified strictly after the watermark; each eligible record must resolve to
//! exactly one CSV download URL.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

use crate::checkpoint::epoch_floor;
use crate::error::{Result, SyncError};
use crate::http::HttpTransport;

/// One dataset record as served by the metastore.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CatalogEntry {
    #[serde(default)]
    pub identifier: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub theme: Vec<String>,
    /// ISO-8601 date; records without one sort before every watermark.
    #[serde(default)]
    pub modified: Option<String>,
    #[serde(default)]
    pub distribution: Vec<Distribution>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Distribution {
    #[serde(rename = "mediaType", default)]
    pub media_type: Option<String>,
    #[serde(rename = "downloadURL", default)]
    pub download_url: Option<String>,
}

/// An eligible catalog record resolved to its CSV download.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct ResolvedDataset {
    pub download_url: String,
    /// Identifier or title of the source record, for reporting.
    pub label: String,
}

impl CatalogEntry {
    /// Human-readable name used in error messages.
    pub fn label(&self) -> String {
        self.identifier
            .clone()
            .or_else(|| self.title.clone())
            .unwrap_or_else(|| "<unnamed dataset>".to_string())
    }

    pub fn modified_date(&self) -> Result<NaiveDate> {
        match self.modified.as_deref() {
            None => Ok(epoch_floor()),
            Some(raw) => parse_catalog_date(raw).ok_or_else(|| {
                SyncError::Parse(format!(
                    "dataset {} has invalid modified date '{}'",
                    self.label(),
                    raw
                ))
            }),
        }
    }

    pub fn has_theme(&self, category: &str) -> bool {
        self.theme.iter().any(|t| t == category)
    }

    /// The single distribution of `media_type`.
    ///
    /// Zero or several matches are data errors, as is a match without a URL.
    pub fn tabular_distribution(&self, media_type: &str) -> Result<&str> {
        let mut matches = self
            .distribution
            .iter()
            .filter(|d| d.media_type.as_deref() == Some(media_type));

        let found = matches.next().ok_or_else(|| {
            SyncError::DataIntegrity(format!(
                "no {} distribution found for dataset {}",
                media_type,
                self.label()
            ))
        })?;
        if matches.next().is_some() {
            return Err(SyncError::DataIntegrity(format!(
                "multiple {} distributions found for dataset {}",
                media_type,
                self.label()
            )));
        }

        found
            .download_url
            .as_deref()
            .filter(|url| !url.trim().is_empty())
            .ok_or_else(|| {
                SyncError::DataIntegrity(format!(
                    "{} distribution of dataset {} has no downloadURL",
                    media_type,
                    self.label()
                ))
            })
    }
}

/// Accepts `YYYY-MM-DD`, or a full timestamp whose date part is used.
fn parse_catalog_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    if let Ok(date) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        return Some(date);
    }
    chrono::DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.date_naive())
        .ok()
}

/// Parse a metastore response body.
pub fn parse_catalog(body: &str) -> Result<Vec<CatalogEntry>> {
    serde_json::from_str(body)
        .map_err(|e| SyncError::Parse(format!("malformed catalog response: {}", e)))
}

/// Filter `entries` to those in `category` modified after `after`, resolving
/// each to its `media_type` download. Output order follows catalog order.
pub fn select_eligible(
    entries: &[CatalogEntry],
    category: &str,
    media_type: &str,
    after: NaiveDate,
) -> Result<Vec<ResolvedDataset>> {
    let mut resolved = Vec::new();
    for entry in entries {
        if !entry.has_theme(category) {
            continue;
        }
        if entry.modified_date()? <= after {
            continue;
        }
        let url = entry.tabular_distribution(media_type)?;
        resolved.push(ResolvedDataset {
            download_url: url.to_string(),
            label: entry.label(),
        });
    }
    Ok(resolved)
}

/// Client for the remote dataset catalog.
#[derive(Clone)]
pub struct CatalogClient {
    transport: Arc<dyn HttpTransport>,
    endpoint: String,
    media_type: String,
    timeout: Duration,
}

impl CatalogClient {
    pub fn new(
        transport: Arc<dyn HttpTransport>,
        endpoint: impl Into<String>,
        media_type: impl Into<String>,
        timeout: Duration,
    ) -> Self {
        Self {
            transport,
            endpoint: endpoint.into(),
            media_type: media_type.into(),
            timeout,
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Fetch the full catalog. One request, no pagination, no retries.
    pub async fn fetch_entries(&self) -> Result<Vec<CatalogEntry>> {
        debug!(endpoint = %self.endpoint, "Querying catalog");
        let response = self
            .transport
            .get(&self.endpoint, self.timeout)
            .await?
            .error_for_status(&self.endpoint)?;
        let body = std::str::from_utf8(&response.body)
            .map_err(|e| SyncError::Parse(format!("catalog response is not UTF-8: {}", e)))?;
        parse_catalog(body)
    }

    /// Datasets in `category` modified strictly after `after`.
    pub async fn list_changed(
        &self,
        category: &str,
        after: NaiveDate,
    ) -> Result<Vec<ResolvedDataset>> {
        let entries = self.fetch_entries().await?;
        let resolved = select_eligible(&entries, category, &self.media_type, after)?;
        info!(
            catalog_size = entries.len(),
            eligible = resolved.len(),
            %category,
            %after,
            "Found {} {} datasets modified after {}",
            resolved.len(),
            category,
            after
        );
        Ok(resolved)
    }
}
