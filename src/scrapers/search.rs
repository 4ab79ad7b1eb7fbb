use crate::models::ListingId;
use scraper::{Html, Selector};
use std::sync::LazyLock;

static RESULT_CARD: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("div.ui-search-result__wrapper").expect("result card selector"));
pub(crate) static TITLE_LINK: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("a.poly-component__title").expect("title link selector"));

/// One search result card, detached from its results page.
///
/// The card keeps its own markup so it can be queried after the page that
/// produced it is gone.
#[derive(Debug, Clone)]
pub struct RawListingHandle {
    html: String,
    href: Option<String>,
}

impl RawListingHandle {
    pub fn from_html(html: impl Into<String>) -> Self {
        let html = html.into();
        let href = {
            let fragment = Html::parse_fragment(&html);
            fragment
                .select(&TITLE_LINK)
                .next()
                .and_then(|link| link.value().attr("href"))
                .map(str::to_string)
        };
        Self { html, href }
    }

    /// Link to the listing's own page, if the card has one
    pub fn href(&self) -> Option<&str> {
        self.href.as_deref()
    }

    /// Identifier taken straight from the card link, without fetching anything
    pub fn listing_id(&self) -> Option<ListingId> {
        self.href().and_then(ListingId::from_url)
    }

    pub fn fragment(&self) -> Html {
        Html::parse_fragment(&self.html)
    }
}

/// Split a search results page into listing cards, in page order
pub fn parse_search_results(html: &str) -> Vec<RawListingHandle> {
    let document = Html::parse_document(html);
    document
        .select(&RESULT_CARD)
        .map(|card| RawListingHandle::from_html(card.html()))
        .collect()
}
