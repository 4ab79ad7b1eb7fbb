//! Rental listing scout.
//!
//! Searches a listing site across zones, property kinds and search terms,
//! remembers every listing it has processed, and reports the new ones that
//! pass the configured filters.

pub mod config;
pub mod crawler;
pub mod error;
pub mod filter;
pub mod models;
pub mod notify;
pub mod scrapers;
pub mod seen;
#[cfg(any(test, feature = "testing"))]
pub mod testing;

pub use crawler::{Crawler, DelayPolicy, NoDelay, RandomDelay};
pub use error::{CrawlError, DeliveryError, ExtractionError, FetchError, PersistenceError};
pub use filter::{passes, FilterConfig, Rejection};
pub use models::{Listing, ListingId};
pub use seen::{SeenSet, SeenStore};
