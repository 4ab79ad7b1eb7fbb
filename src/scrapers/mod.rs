pub mod browser;
pub mod extractor;
pub mod http;
pub mod search;
pub mod traits;
pub mod types;

pub use browser::BrowserFetcher;
pub use extractor::extract;
pub use http::HttpFetcher;
pub use search::{parse_search_results, RawListingHandle};
pub use traits::Fetcher;
pub use types::SearchConfig;
