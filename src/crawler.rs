//! Crawl orchestration: search every (kind, zone, term) combination, skip
//! listings already seen, extract and filter the rest, record everything
//! observed, and hand back the listings worth notifying about.

use crate::error::CrawlError;
use crate::filter::{passes, FilterConfig};
use crate::models::{Listing, ListingId};
use crate::scrapers::{extract, parse_search_results, Fetcher, RawListingHandle, SearchConfig};
use crate::seen::{SeenSet, SeenStore};
use rand::Rng;
use std::collections::BTreeMap;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Pause inserted after every search query
pub trait DelayPolicy: Send + Sync {
    fn next_delay(&self) -> Duration;
}

/// Uniformly random delay in `[min, max]`
#[derive(Debug, Clone, Copy)]
pub struct RandomDelay {
    min: Duration,
    max: Duration,
}

impl RandomDelay {
    /// Bounds are swapped if given in the wrong order
    pub fn new(min: Duration, max: Duration) -> Self {
        if min <= max {
            Self { min, max }
        } else {
            Self { min: max, max: min }
        }
    }
}

impl DelayPolicy for RandomDelay {
    fn next_delay(&self) -> Duration {
        if self.min == self.max {
            return self.min;
        }
        rand::thread_rng().gen_range(self.min..=self.max)
    }
}

/// No pause at all
#[derive(Debug, Clone, Copy, Default)]
pub struct NoDelay;

impl DelayPolicy for NoDelay {
    fn next_delay(&self) -> Duration {
        Duration::ZERO
    }
}

/// Drives one crawl run over the configured search space
pub struct Crawler {
    fetcher: Box<dyn Fetcher>,
    delay: Box<dyn DelayPolicy>,
    store: SeenStore,
    search: SearchConfig,
    filter: FilterConfig,
}

impl Crawler {
    pub fn new(
        fetcher: Box<dyn Fetcher>,
        delay: Box<dyn DelayPolicy>,
        store: SeenStore,
        search: SearchConfig,
        filter: FilterConfig,
    ) -> Self {
        Self {
            fetcher,
            delay,
            store,
            search,
            filter,
        }
    }

    /// Run one crawl against `seen` and return the newly matching listings.
    ///
    /// Every listing extracted in this run, matching or not, is merged into
    /// the store before returning. If that write fails the run fails and no
    /// matches are returned.
    pub async fn run(&self, seen: SeenSet) -> Result<BTreeMap<ListingId, Listing>, CrawlError> {
        let pool = self.collect_results().await;
        info!("Collected {} search results", pool.len());

        let mut observed: BTreeMap<ListingId, Listing> = BTreeMap::new();
        let mut matches = BTreeMap::new();

        for handle in &pool {
            let Some(id) = handle.listing_id() else {
                warn!("Skipping search result without listing id (link: {:?})", handle.href());
                continue;
            };
            if seen.contains(&id) {
                debug!("Already seen {}", id);
                continue;
            }
            if observed.contains_key(&id) {
                debug!("{} appeared in more than one query", id);
                continue;
            }

            let listing = match extract(handle, self.fetcher.as_ref()).await {
                Ok(listing) => listing,
                Err(e) => {
                    warn!("Failed to extract {}: {}", id, e);
                    Listing::failed(id.clone(), handle.href().unwrap_or_default(), e)
                }
            };

            match passes(&listing, &self.filter) {
                Ok(()) => {
                    info!("MATCH: {} ({})", id, listing.url);
                    matches.insert(id.clone(), listing.clone());
                }
                Err(rejection) => info!("REJECTED {}: {}", id, rejection),
            }
            observed.insert(id, listing);
        }

        info!(
            "Processed {} new listings, {} matching filters",
            observed.len(),
            matches.len()
        );
        self.store.merge_and_persist(seen, observed).await?;

        Ok(matches)
    }

    /// Issue every search query in order and pool the result cards
    async fn collect_results(&self) -> Vec<RawListingHandle> {
        let mut pool = Vec::new();

        for (kind, zone, term) in self.search.combinations() {
            let url = self.search.query_url(
                kind,
                zone,
                term,
                self.filter.min_total_price,
                self.filter.max_total_price,
            );
            info!("Query URL: {}", url);

            match self.fetcher.fetch(&url).await {
                Ok(body) => {
                    let handles = parse_search_results(&body);
                    debug!("{} results for {}/{}/{}", handles.len(), kind, zone, term);
                    pool.extend(handles);
                }
                Err(e) => warn!("Search query failed via {}: {}", self.fetcher.backend_name(), e),
            }

            let pause = self.delay.next_delay();
            if !pause.is_zero() {
                debug!("Sleeping {:?} before next query", pause);
                tokio::time::sleep(pause).await;
            }
        }

        pool
    }
}
