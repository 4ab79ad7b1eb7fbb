//! Typed errors for the scout library.
//!
//! The binary glues these together with `anyhow`; inside the library each
//! failure keeps its own type so the crawler can decide how far it spreads.

use crate::models::ListingId;
use std::path::PathBuf;
use thiserror::Error;

/// A document could not be retrieved.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("request to {url} failed: {source}")]
    Request {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("{url} returned status {status}")]
    Status {
        url: String,
        status: reqwest::StatusCode,
    },

    #[error("browser failed to load {url}: {message}")]
    Browser { url: String, message: String },
}

/// A mandatory field of a listing could not be extracted.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ExtractionError {
    #[error("missing {0} in search result")]
    MissingField(&'static str),

    #[error("unparseable price {0:?}")]
    InvalidPrice(String),

    #[error("no listing identifier in url {0}")]
    MissingIdentifier(String),
}

/// The seen-set backing store could not be read or written.
#[derive(Debug, Error)]
pub enum PersistenceError {
    #[error("seen-set store {} does not exist", .0.display())]
    NotFound(PathBuf),

    #[error("I/O error on {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("seen-set store {} is corrupt: {source}", .path.display())]
    Format {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("listing {0} has a non-finite amount and cannot be stored")]
    NonFinite(ListingId),
}

/// A notification could not be delivered.
#[derive(Debug, Error)]
pub enum DeliveryError {
    #[error("notification request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("notification endpoint returned status {0}")]
    Status(reqwest::StatusCode),

    #[error("notification rejected: {0}")]
    Rejected(String),
}

/// Errors that abort a crawl run.
#[derive(Debug, Error)]
pub enum CrawlError {
    #[error("failed to record seen listings: {0}")]
    Persistence(#[from] PersistenceError),
}
