use crate::error::FetchError;
use async_trait::async_trait;

/// Retrieves documents from the listing site.
///
/// Search pages and listing detail pages both go through this trait, which
/// lets the crawler run against plain HTTP, a headless browser, or canned
/// pages in tests.
#[async_trait]
pub trait Fetcher: Send + Sync {
    /// Fetch the body of `url`
    async fn fetch(&self, url: &str) -> Result<String, FetchError>;

    /// Name of the fetch backend, for logs
    fn backend_name(&self) -> &'static str;
}
