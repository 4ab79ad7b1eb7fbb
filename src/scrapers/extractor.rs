//! Turns a search result card plus the listing's own page into a [`Listing`].
//!
//! The card supplies price, inline descriptors, link and address. The
//! listing page adds a detail table whose rows override the inline
//! descriptors. Room, bathroom and covered-area counts come from the table
//! when it has them, otherwise from the first inline descriptor mentioning
//! the matching keyword, otherwise zero.

use crate::error::ExtractionError;
use crate::models::{Listing, ListingId};
use crate::scrapers::search::{RawListingHandle, TITLE_LINK};
use crate::scrapers::traits::Fetcher;
use chrono::Utc;
use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use std::collections::BTreeMap;
use std::sync::LazyLock;
use thiserror::Error;
use tracing::{debug, warn};

static PRICE: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("span.andes-money-amount__fraction").expect("price selector"));
static ATTRIBUTE: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("li.poly-attributes-list__item").expect("attribute selector"));
static LOCATION: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("span.poly-component__location").expect("location selector"));
static DETAIL_ROW: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("tr.andes-table__row").expect("detail row selector"));
static DETAIL_HEADER: LazyLock<Selector> = LazyLock::new(|| Selector::parse("th").expect("th selector"));
static DETAIL_VALUE: LazyLock<Selector> = LazyLock::new(|| Selector::parse("td").expect("td selector"));

static DIGITS: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\d+").expect("digit pattern"));
static AMOUNT: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[\d.]+").expect("amount pattern"));

/// A count field extracted from the detail table or the inline descriptors
struct CountField {
    name: &'static str,
    table_key: &'static str,
    keyword: &'static str,
}

const ROOMS: CountField = CountField {
    name: "rooms",
    table_key: "Ambientes",
    keyword: "amb",
};
const BATHROOMS: CountField = CountField {
    name: "bathrooms",
    table_key: "Baños",
    keyword: "baño",
};
const COVERED_AREA: CountField = CountField {
    name: "covered_area",
    table_key: "Superficie cubierta",
    keyword: "cubiert",
};
const FEE_KEY: &str = "Expensas";

/// An optional field whose text could not be turned into a number
#[derive(Debug, Error, PartialEq)]
enum FieldError {
    #[error("no digits in {0:?}")]
    NoDigits(String),

    #[error("number out of range in {0:?}")]
    OutOfRange(String),
}

/// Fields read from the search result card
#[derive(Debug)]
struct CardFields {
    id: ListingId,
    url: String,
    price: i64,
    attrs: Vec<String>,
    address: Option<String>,
}

/// Extract a listing from its search result card, fetching its detail page.
///
/// A failed detail fetch is not an error: the listing is built from the
/// card alone and the failure is noted in `warnings`.
pub async fn extract(
    handle: &RawListingHandle,
    fetcher: &dyn Fetcher,
) -> Result<Listing, ExtractionError> {
    let card = parse_card(handle)?;
    let mut warnings = Vec::new();

    let details = match fetcher.fetch(&card.url).await {
        Ok(body) => parse_detail_table(&body),
        Err(e) => {
            warn!("Detail page for {} unavailable: {}", card.id, e);
            warnings.push(format!("detail page unavailable: {}", e));
            BTreeMap::new()
        }
    };

    Ok(build_listing(card, details, warnings))
}

fn parse_card(handle: &RawListingHandle) -> Result<CardFields, ExtractionError> {
    let fragment = handle.fragment();

    let price_text = fragment
        .select(&PRICE)
        .next()
        .map(element_text)
        .ok_or(ExtractionError::MissingField("price"))?;
    let price = parse_price(&price_text)?;

    let attrs = fragment.select(&ATTRIBUTE).map(element_text).collect();

    let url = fragment
        .select(&TITLE_LINK)
        .next()
        .and_then(|link| link.value().attr("href"))
        .map(str::to_string)
        .ok_or(ExtractionError::MissingField("url"))?;
    let id = ListingId::from_url(&url).ok_or_else(|| ExtractionError::MissingIdentifier(url.clone()))?;

    let address = fragment
        .select(&LOCATION)
        .next()
        .map(element_text)
        .filter(|a| !a.is_empty());

    Ok(CardFields {
        id,
        url,
        price,
        attrs,
        address,
    })
}

/// Key/value rows of the listing page's detail table
pub fn parse_detail_table(html: &str) -> BTreeMap<String, String> {
    let document = Html::parse_document(html);
    let mut rows = BTreeMap::new();

    for row in document.select(&DETAIL_ROW) {
        let header = row.select(&DETAIL_HEADER).next().map(element_text);
        let value = row.select(&DETAIL_VALUE).next().map(element_text);
        match (header, value) {
            (Some(header), Some(value)) if !header.is_empty() => {
                rows.insert(header, value);
            }
            _ => debug!("Skipping malformed detail row"),
        }
    }

    rows
}

fn build_listing(
    card: CardFields,
    mut details: BTreeMap<String, String>,
    mut warnings: Vec<String>,
) -> Listing {
    let rooms = resolve_count(&ROOMS, &mut details, &card.attrs, &mut warnings);
    let bathrooms = resolve_count(&BATHROOMS, &mut details, &card.attrs, &mut warnings);
    let covered_area = resolve_count(&COVERED_AREA, &mut details, &card.attrs, &mut warnings);

    let recurring_fee = match take_detail(&mut details, FEE_KEY) {
        Some(raw) if !raw.trim().is_empty() => parse_fee(&raw).unwrap_or_else(|e| {
            warnings.push(format!("recurring_fee: {}", e));
            0.0
        }),
        _ => 0.0,
    };

    Listing {
        total_price: card.price as f64 + recurring_fee,
        id: card.id,
        url: card.url,
        address: card.address,
        price: card.price,
        attrs: card.attrs,
        rooms,
        bathrooms,
        covered_area,
        recurring_fee,
        details,
        warnings,
        error: None,
        scraped_at: Utc::now(),
    }
}

/// Detail table first, then the first inline descriptor containing the
/// keyword, then zero.
fn resolve_count(
    field: &CountField,
    details: &mut BTreeMap<String, String>,
    attrs: &[String],
    warnings: &mut Vec<String>,
) -> u32 {
    if let Some(raw) = take_detail(details, field.table_key) {
        match first_number(&raw) {
            Ok(n) => return n,
            Err(e) => warnings.push(format!("{}: {}", field.name, e)),
        }
    }

    if let Some(attr) = attrs.iter().find(|a| a.to_lowercase().contains(field.keyword)) {
        match first_number(attr) {
            Ok(n) => return n,
            Err(e) => warnings.push(format!("{}: {}", field.name, e)),
        }
    }

    0
}

/// Remove a detail row by header, ignoring case
fn take_detail(details: &mut BTreeMap<String, String>, key: &str) -> Option<String> {
    let wanted = key.to_lowercase();
    let found = details.keys().find(|k| k.trim().to_lowercase() == wanted)?.clone();
    details.remove(&found)
}

fn element_text(element: ElementRef<'_>) -> String {
    element
        .text()
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Prices use `.` as thousands separator: "1.250.000"
fn parse_price(text: &str) -> Result<i64, ExtractionError> {
    let cleaned: String = text.chars().filter(|c| *c != '.' && !c.is_whitespace()).collect();
    // Unsigned parse: a minus sign is invalid
    cleaned
        .parse::<u64>()
        .ok()
        .and_then(|price| i64::try_from(price).ok())
        .ok_or_else(|| ExtractionError::InvalidPrice(text.to_string()))
}

fn first_number(text: &str) -> Result<u32, FieldError> {
    let digits = DIGITS
        .find(text)
        .ok_or_else(|| FieldError::NoDigits(text.to_string()))?;
    digits
        .as_str()
        .parse()
        .map_err(|_| FieldError::OutOfRange(text.to_string()))
}

fn parse_fee(text: &str) -> Result<f64, FieldError> {
    let stripped = text.replace('.', "");
    let amount = AMOUNT
        .find(&stripped)
        .ok_or_else(|| FieldError::NoDigits(text.to_string()))?;
    let fee: f64 = amount
        .as_str()
        .parse()
        .map_err(|_| FieldError::OutOfRange(text.to_string()))?;
    if !fee.is_finite() {
        return Err(FieldError::OutOfRange(text.to_string()));
    }
    Ok(fee)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::StaticFetcher;

    const LISTING_URL: &str = "https://casa.mercadolibre.com.ar/MLA-900-ph-palermo-_JM#position=2";

    fn card(price: &str, attrs: &[&str]) -> RawListingHandle {
        let items: String = attrs
            .iter()
            .map(|a| format!(r#"<li class="poly-attributes-list__item">{}</li>"#, a))
            .collect();
        RawListingHandle::from_html(format!(
            r#"<div class="ui-search-result__wrapper">
                 <span class="andes-money-amount__fraction">{}</span>
                 <ul>{}</ul>
                 <a class="poly-component__title" href="{}">PH en Palermo</a>
                 <span class="poly-component__location">Honduras 5000, Palermo</span>
               </div>"#,
            price, items, LISTING_URL
        ))
    }

    fn detail_page(rows: &[(&str, &str)]) -> String {
        let rows: String = rows
            .iter()
            .map(|(k, v)| {
                format!(
                    r#"<tr class="andes-table__row"><th>{}</th><td><span>{}</span></td></tr>"#,
                    k, v
                )
            })
            .collect();
        format!("<html><body><table><tbody>{}</tbody></table></body></html>", rows)
    }

    #[tokio::test]
    async fn test_detail_table_wins_over_inline() {
        let fetcher = StaticFetcher::new().with_page(LISTING_URL, detail_page(&[("Ambientes", "4 ambientes")]));
        let listing = extract(&card("1.000.000", &["3 amb.", "2 baños"]), &fetcher)
            .await
            .unwrap();
        assert_eq!(listing.rooms, 4);
        assert_eq!(listing.bathrooms, 2);
    }

    #[tokio::test]
    async fn test_inline_fallback_is_case_insensitive() {
        let fetcher = StaticFetcher::new().with_page(LISTING_URL, detail_page(&[]));
        let listing = extract(&card("850.000", &["3 Amb.", "1 Baño", "70 m² cubiertos"]), &fetcher)
            .await
            .unwrap();
        assert_eq!(listing.rooms, 3);
        assert_eq!(listing.bathrooms, 1);
        assert_eq!(listing.covered_area, 70);
    }

    #[tokio::test]
    async fn test_counts_default_to_zero() {
        let fetcher = StaticFetcher::new().with_page(LISTING_URL, detail_page(&[]));
        let listing = extract(&card("850.000", &["Cochera"]), &fetcher).await.unwrap();
        assert_eq!(listing.rooms, 0);
        assert_eq!(listing.bathrooms, 0);
        assert_eq!(listing.covered_area, 0);
        assert!(listing.warnings.is_empty());
    }

    #[tokio::test]
    async fn test_first_matching_descriptor_only() {
        let fetcher = StaticFetcher::new().with_page(LISTING_URL, detail_page(&[]));
        let listing = extract(&card("850.000", &["Ambientes amplios", "4 amb."]), &fetcher)
            .await
            .unwrap();
        assert_eq!(listing.rooms, 0);
        assert_eq!(listing.warnings.len(), 1);
    }

    #[tokio::test]
    async fn test_unparseable_table_value_falls_back_to_inline() {
        let fetcher = StaticFetcher::new().with_page(LISTING_URL, detail_page(&[("Baños", "consultar")]));
        let listing = extract(&card("850.000", &["2 baños"]), &fetcher).await.unwrap();
        assert_eq!(listing.bathrooms, 2);
        assert!(listing.warnings[0].starts_with("bathrooms"));
    }

    #[tokio::test]
    async fn test_fee_added_to_total_price() {
        let fetcher = StaticFetcher::new().with_page(
            LISTING_URL,
            detail_page(&[("Expensas", "45.000 ARS"), ("Superficie cubierta", "72 m²")]),
        );
        let listing = extract(&card("1.000.000", &[]), &fetcher).await.unwrap();
        assert_eq!(listing.price, 1_000_000);
        assert_eq!(listing.recurring_fee, 45_000.0);
        assert_eq!(listing.total_price, 1_045_000.0);
        assert_eq!(listing.covered_area, 72);
        assert!(listing.details.is_empty());
    }

    #[tokio::test]
    async fn test_unconsumed_rows_are_kept() {
        let fetcher = StaticFetcher::new().with_page(
            LISTING_URL,
            detail_page(&[("Ambientes", "3"), ("Antigüedad", "40 años")]),
        );
        let listing = extract(&card("900.000", &[]), &fetcher).await.unwrap();
        assert_eq!(listing.details.len(), 1);
        assert_eq!(listing.details["Antigüedad"], "40 años");
    }

    #[tokio::test]
    async fn test_detail_fetch_failure_keeps_card_fields() {
        let fetcher = StaticFetcher::new();
        let listing = extract(&card("900.000", &["3 amb."]), &fetcher).await.unwrap();
        assert_eq!(listing.id.as_str(), "MLA-900-ph-palermo-_JM");
        assert_eq!(listing.address.as_deref(), Some("Honduras 5000, Palermo"));
        assert_eq!(listing.rooms, 3);
        assert_eq!(listing.recurring_fee, 0.0);
        assert_eq!(listing.total_price, 900_000.0);
        assert!(listing.warnings[0].starts_with("detail page unavailable"));
    }

    #[tokio::test]
    async fn test_missing_price_is_an_error() {
        let handle = RawListingHandle::from_html(format!(
            r#"<div><a class="poly-component__title" href="{}">x</a></div>"#,
            LISTING_URL
        ));
        let err = extract(&handle, &StaticFetcher::new()).await.unwrap_err();
        assert_eq!(err, ExtractionError::MissingField("price"));
    }

    #[tokio::test]
    async fn test_url_without_identifier_is_an_error() {
        let handle = RawListingHandle::from_html(
            r#"<div><span class="andes-money-amount__fraction">1.000</span>
               <a class="poly-component__title" href="https://example.com/p/1">x</a></div>"#,
        );
        let err = extract(&handle, &StaticFetcher::new()).await.unwrap_err();
        assert!(matches!(err, ExtractionError::MissingIdentifier(_)));
    }

    #[test]
    fn test_parse_price() {
        assert_eq!(parse_price("1.250.000").unwrap(), 1_250_000);
        assert!(parse_price("consultar").is_err());
    }

    #[test]
    fn test_negative_price_rejected() {
        assert_eq!(
            parse_price("-1.000"),
            Err(ExtractionError::InvalidPrice("-1.000".to_string()))
        );
        assert!(parse_price("99999999999999999999").is_err());
    }

    #[tokio::test]
    async fn test_negative_card_price_is_an_error() {
        let fetcher = StaticFetcher::new().with_page(LISTING_URL, detail_page(&[]));
        let err = extract(&card("-1.000", &["3 amb."]), &fetcher).await.unwrap_err();
        assert!(matches!(err, ExtractionError::InvalidPrice(_)));
    }

    #[tokio::test]
    async fn test_oversized_fee_falls_back_to_zero() {
        let huge = "9".repeat(400);
        let fetcher = StaticFetcher::new().with_page(LISTING_URL, detail_page(&[("Expensas", huge.as_str())]));
        let listing = extract(&card("1.000.000", &[]), &fetcher).await.unwrap();
        assert_eq!(listing.recurring_fee, 0.0);
        assert_eq!(listing.total_price, 1_000_000.0);
        assert!(listing.warnings[0].starts_with("recurring_fee"));
    }

    #[test]
    fn test_parse_fee() {
        assert_eq!(parse_fee("$ 120.500").unwrap(), 120_500.0);
        assert!(matches!(parse_fee(&"9".repeat(400)), Err(FieldError::OutOfRange(_))));
        assert_eq!(parse_fee("sin datos"), Err(FieldError::NoDigits("sin datos".to_string())));
    }

    #[test]
    fn test_first_number_overflow() {
        assert!(matches!(first_number("99999999999 m²"), Err(FieldError::OutOfRange(_))));
    }
}
