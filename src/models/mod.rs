use chrono::{DateTime, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::LazyLock;

static LISTING_ID: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"MLA[^#?]+").expect("listing id pattern"));

/// Stable identifier of a listing, taken from its canonical URL
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ListingId(String);

impl ListingId {
    /// Derive the identifier from a listing URL.
    ///
    /// The site embeds ids as `MLA...` path segments; query strings and
    /// fragments are tracking noise and are dropped.
    pub fn from_url(url: &str) -> Option<Self> {
        LISTING_ID.find(url).map(|m| Self(m.as_str().to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ListingId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ListingId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

/// Normalized rental listing
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Listing {
    pub id: ListingId,
    pub url: String,
    pub address: Option<String>,
    /// Monthly rent as shown on the search result
    pub price: i64,
    /// Short descriptors shown inline on the search result ("3 amb.", "70 m² cubiertos")
    pub attrs: Vec<String>,
    pub rooms: u32,
    pub bathrooms: u32,
    /// Covered area in square meters
    pub covered_area: u32,
    /// Monthly building fee (expensas)
    pub recurring_fee: f64,
    pub total_price: f64,
    /// Raw rows from the listing's own detail table
    #[serde(default)]
    pub details: BTreeMap<String, String>,
    /// Fields that could not be parsed and fell back to a default
    #[serde(default)]
    pub warnings: Vec<String>,
    /// Set when a mandatory field could not be extracted
    #[serde(default)]
    pub error: Option<String>,
    pub scraped_at: DateTime<Utc>,
}

impl Listing {
    /// Placeholder record for a listing whose extraction failed.
    ///
    /// It is still stored in the seen set so the listing is not retried.
    pub fn failed(id: ListingId, url: impl Into<String>, error: impl fmt::Display) -> Self {
        Self {
            id,
            url: url.into(),
            address: None,
            price: 0,
            attrs: Vec::new(),
            rooms: 0,
            bathrooms: 0,
            covered_area: 0,
            recurring_fee: 0.0,
            total_price: 0.0,
            details: BTreeMap::new(),
            warnings: Vec::new(),
            error: Some(format!("Error extracting details: {}", error)),
            scraped_at: Utc::now(),
        }
    }

    /// Field name / rendered value pairs, in display order.
    ///
    /// `id` and `url` are left out; callers render the link themselves.
    pub fn fields(&self) -> Vec<(String, String)> {
        let mut fields = vec![
            ("price".to_string(), self.price.to_string()),
            ("recurring_fee".to_string(), format_amount(self.recurring_fee)),
            ("total_price".to_string(), format_amount(self.total_price)),
        ];
        if let Some(address) = &self.address {
            fields.push(("address".to_string(), address.clone()));
        }
        fields.push(("rooms".to_string(), self.rooms.to_string()));
        fields.push(("bathrooms".to_string(), self.bathrooms.to_string()));
        fields.push(("covered_area".to_string(), self.covered_area.to_string()));
        if !self.attrs.is_empty() {
            fields.push(("attrs".to_string(), self.attrs.join(", ")));
        }
        for (key, value) in &self.details {
            fields.push((key.clone(), value.clone()));
        }
        if let Some(error) = &self.error {
            fields.push(("error".to_string(), error.clone()));
        }
        fields
    }
}

fn format_amount(value: f64) -> String {
    if value.fract() == 0.0 {
        format!("{:.0}", value)
    } else {
        format!("{:.2}", value)
    }
}
