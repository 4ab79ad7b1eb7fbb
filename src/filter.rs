//! Decides whether an extracted listing is worth a notification.

use crate::models::Listing;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Thresholds a listing must meet
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FilterConfig {
    pub min_total_price: i64,
    pub max_total_price: i64,
    pub min_rooms: u32,
    pub min_bathrooms: u32,
    /// Square meters
    pub min_covered_area: u32,
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            min_total_price: 700_000,
            max_total_price: 1_400_000,
            min_rooms: 3,
            min_bathrooms: 2,
            min_covered_area: 60,
        }
    }
}

/// Why a listing was turned down
#[derive(Debug, Clone, PartialEq)]
pub enum Rejection {
    ExtractionError(String),
    PriceOutOfRange(f64),
    InsufficientRooms(u32),
    InsufficientBathrooms(u32),
    InsufficientCoveredArea(u32),
}

impl Rejection {
    pub fn reason(&self) -> &'static str {
        match self {
            Rejection::ExtractionError(_) => "extraction error",
            Rejection::PriceOutOfRange(_) => "price out of range",
            Rejection::InsufficientRooms(_) => "insufficient rooms",
            Rejection::InsufficientBathrooms(_) => "insufficient bathrooms",
            Rejection::InsufficientCoveredArea(_) => "insufficient covered area",
        }
    }
}

impl fmt::Display for Rejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Rejection::ExtractionError(e) => write!(f, "{} ({})", self.reason(), e),
            Rejection::PriceOutOfRange(total) => write!(f, "{} ({})", self.reason(), total),
            Rejection::InsufficientRooms(n)
            | Rejection::InsufficientBathrooms(n)
            | Rejection::InsufficientCoveredArea(n) => write!(f, "{} ({})", self.reason(), n),
        }
    }
}

/// Check `listing` against `config`, stopping at the first failed rule.
///
/// Rules run in a fixed order: extraction error, total price range, rooms,
/// bathrooms, covered area.
pub fn passes(listing: &Listing, config: &FilterConfig) -> Result<(), Rejection> {
    if let Some(error) = &listing.error {
        return Err(Rejection::ExtractionError(error.clone()));
    }
    if listing.total_price > config.max_total_price as f64
        || listing.total_price < config.min_total_price as f64
    {
        return Err(Rejection::PriceOutOfRange(listing.total_price));
    }
    if listing.rooms < config.min_rooms {
        return Err(Rejection::InsufficientRooms(listing.rooms));
    }
    if listing.bathrooms < config.min_bathrooms {
        return Err(Rejection::InsufficientBathrooms(listing.bathrooms));
    }
    if listing.covered_area < config.min_covered_area {
        return Err(Rejection::InsufficientCoveredArea(listing.covered_area));
    }
    Ok(())
}
