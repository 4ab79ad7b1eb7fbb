//! In-memory fakes for the fetch and notification seams.
//!
//! Useful for exercising the crawler without touching the network. Built
//! for this crate's own tests and behind the `testing` feature otherwise.

use crate::error::{DeliveryError, FetchError};
use crate::notify::Notifier;
use crate::scrapers::Fetcher;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

// A panicking test thread must not hide what was recorded before it
fn locked<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Serves canned pages by exact URL; anything else is a 404
#[derive(Default, Clone)]
pub struct StaticFetcher {
    pages: Arc<Mutex<HashMap<String, String>>>,
    requests: Arc<Mutex<Vec<String>>>,
}

impl StaticFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Serve `body` for `url`
    pub fn with_page(self, url: impl Into<String>, body: impl Into<String>) -> Self {
        self.insert_page(url, body);
        self
    }

    pub fn insert_page(&self, url: impl Into<String>, body: impl Into<String>) {
        locked(&self.pages).insert(url.into(), body.into());
    }

    /// Every URL requested so far, in order
    pub fn requests(&self) -> Vec<String> {
        locked(&self.requests).clone()
    }
}

#[async_trait]
impl Fetcher for StaticFetcher {
    async fn fetch(&self, url: &str) -> Result<String, FetchError> {
        locked(&self.requests).push(url.to_string());
        locked(&self.pages)
            .get(url)
            .cloned()
            .ok_or_else(|| FetchError::Status {
                url: url.to_string(),
                status: reqwest::StatusCode::NOT_FOUND,
            })
    }

    fn backend_name(&self) -> &'static str {
        "static"
    }
}

/// Records every delivered message; messages containing `fail_on` are rejected
#[derive(Default, Clone)]
pub struct RecordingNotifier {
    sent: Arc<Mutex<Vec<(String, String)>>>,
    fail_on: Option<String>,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing_on(mut self, needle: impl Into<String>) -> Self {
        self.fail_on = Some(needle.into());
        self
    }

    /// Delivered (message, recipient) pairs, in order
    pub fn sent(&self) -> Vec<(String, String)> {
        locked(&self.sent).clone()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn send(&self, message: &str, recipient: &str) -> Result<(), DeliveryError> {
        if let Some(needle) = &self.fail_on {
            if message.contains(needle.as_str()) {
                return Err(DeliveryError::Rejected(format!("refused message for {}", recipient)));
            }
        }
        locked(&self.sent).push((message.to_string(), recipient.to_string()));
        Ok(())
    }
}
