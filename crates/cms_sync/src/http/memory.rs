//! Canned-response transport for tests

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

use super::{HttpResponse, HttpTransport};
use crate::error::{Result, SyncError};

/// In-memory transport serving canned responses by exact URL.
///
/// Unknown URLs answer 404. Every request is recorded.
#[derive(Debug, Default)]
pub struct MemoryTransport {
    routes: Mutex<HashMap<String, MemoryRoute>>,
    requests: Mutex<Vec<String>>,
}

#[derive(Debug, Clone)]
enum MemoryRoute {
    Respond(HttpResponse),
    Fail(String),
}

impl MemoryTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn respond(&self, url: impl Into<String>, response: HttpResponse) -> &Self {
        if let Ok(mut routes) = self.routes.lock() {
            routes.insert(url.into(), MemoryRoute::Respond(response));
        }
        self
    }

    /// Make `url` fail at the transport level (connection refused, timeout).
    pub fn fail(&self, url: impl Into<String>, message: impl Into<String>) -> &Self {
        if let Ok(mut routes) = self.routes.lock() {
            routes.insert(url.into(), MemoryRoute::Fail(message.into()));
        }
        self
    }

    /// URLs requested so far, in request order.
    pub fn requests(&self) -> Vec<String> {
        self.requests
            .lock()
            .map(|requests| requests.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl HttpTransport for MemoryTransport {
    async fn get(&self, url: &str, _timeout: Duration) -> Result<HttpResponse> {
        if let Ok(mut requests) = self.requests.lock() {
            requests.push(url.to_string());
        }
        let route = self
            .routes
            .lock()
            .map_err(|_| SyncError::network(url, "memory transport lock poisoned"))?
            .get(url)
            .cloned();
        match route {
            Some(MemoryRoute::Respond(response)) => Ok(response),
            Some(MemoryRoute::Fail(message)) => Err(SyncError::network(url, message)),
            None => Ok(HttpResponse::with_status(404, "not found")),
        }
    }
}
