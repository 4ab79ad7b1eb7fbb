//! Outgoing notifications: the delivery seam and the message texts.

pub mod telegram;

use crate::error::DeliveryError;
use crate::filter::FilterConfig;
use crate::models::Listing;
use crate::scrapers::SearchConfig;
use async_trait::async_trait;
use std::path::Path;
use tracing::{error, info};

pub use telegram::TelegramNotifier;

pub const STARTUP_PING: &str = "Cron: *Running*";

/// Delivers a text message to a recipient
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send(&self, message: &str, recipient: &str) -> Result<(), DeliveryError>;
}

/// Writes messages to the log instead of delivering them
#[derive(Debug, Default, Clone, Copy)]
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn send(&self, message: &str, recipient: &str) -> Result<(), DeliveryError> {
        info!("[dry run] message for {}:\n{}", recipient, message);
        Ok(())
    }
}

/// Markdown message for one listing.
///
/// One `*Label:* value` line per field, labels title-cased, with the link
/// to the listing last.
pub fn render_listing(listing: &Listing) -> String {
    let mut message = String::new();
    for (key, value) in listing.fields() {
        message.push_str(&format!("*{}:* {} \n", title_label(&key), value.replace('_', " ")));
    }
    message.push_str(&format!("[inline URL]({})\n", listing.url));
    message
}

/// "total_price" -> "Total Price"
fn title_label(key: &str) -> String {
    key.replace('_', " ")
        .split(' ')
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<String>>()
        .join(" ")
}

/// Summary of the search parameters, sent once on the first run
pub fn render_search_summary(search: &SearchConfig, filter: &FilterConfig) -> String {
    format!(
        "*🚀 Búsqueda inicial iniciada*\n\n\
         - *Zonas:* {}\n\
         - *Tipos de propiedades:* {}\n\
         - *Términos de búsqueda:* {}\n\
         - *Precio mínimo:* {}\n\
         - *Precio máximo:* {}\n\
         - *Ambientes mínimos:* {}\n\
         - *Baños mínimos:* {}\n\
         - *Superficie cubierta mínima:* {} m²\n",
        search.zones.join(", "),
        search.kinds.join(", "),
        search.terms.join(", "),
        filter.min_total_price,
        filter.max_total_price,
        filter.min_rooms,
        filter.min_bathrooms,
        filter.min_covered_area,
    )
}

/// Send the search summary unless `flag_path` already exists, then create it.
///
/// Returns whether this was the first run. Delivery failures are logged and
/// do not keep the flag from being written.
pub async fn announce_first_run(
    notifier: &dyn Notifier,
    recipient: Option<&str>,
    flag_path: &Path,
    search: &SearchConfig,
    filter: &FilterConfig,
) -> std::io::Result<bool> {
    if tokio::fs::try_exists(flag_path).await? {
        return Ok(false);
    }

    if let Some(recipient) = recipient {
        info!("First run, announcing search parameters");
        let summary = render_search_summary(search, filter);
        if let Err(e) = notifier.send(&summary, recipient).await {
            error!("Failed to send first-run announcement: {}", e);
        }
    }

    tokio::fs::write(flag_path, "First run completed").await?;
    Ok(true)
}

/// Send one message per listing; returns how many were delivered.
///
/// A failed delivery is logged and the remaining listings are still sent.
pub async fn deliver_all<'a, I>(notifier: &dyn Notifier, recipient: &str, listings: I) -> usize
where
    I: IntoIterator<Item = &'a Listing>,
{
    let mut delivered = 0;
    for listing in listings {
        let message = render_listing(listing);
        match notifier.send(&message, recipient).await {
            Ok(()) => delivered += 1,
            Err(e) => error!("Failed to notify {}: {}", listing.id, e),
        }
    }
    delivered
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ListingId;
    use crate::testing::RecordingNotifier;
    use tempfile::TempDir;

    fn listing(id: &str) -> Listing {
        let mut listing = Listing::failed(ListingId::from(id), format!("https://x.com/{}", id), "");
        listing.error = None;
        listing.price = 1_000_000;
        listing.total_price = 1_000_000.0;
        listing.rooms = 3;
        listing.address = Some("Av. Santa_Fe 3000".to_string());
        listing
    }

    #[test]
    fn test_title_label() {
        assert_eq!(title_label("total_price"), "Total Price");
        assert_eq!(title_label("covered_area"), "Covered Area");
        assert_eq!(title_label("Superficie total"), "Superficie Total");
    }

    #[test]
    fn test_render_listing() {
        let message = render_listing(&listing("MLA42"));
        assert!(message.starts_with("*Price:* 1000000 \n"));
        assert!(message.contains("*Total Price:* 1000000 \n"));
        assert!(message.contains("*Address:* Av. Santa Fe 3000 \n"));
        assert!(message.ends_with("[inline URL](https://x.com/MLA42)\n"));
        assert!(!message.contains("*Id:*"));
        assert!(!message.contains("*Url:*"));
    }

    #[test]
    fn test_search_summary_lists_parameters() {
        let summary = render_search_summary(&SearchConfig::default(), &FilterConfig::default());
        assert!(summary.contains("- *Tipos de propiedades:* casas, ph\n"));
        assert!(summary.contains("- *Precio máximo:* 1400000\n"));
        assert!(summary.contains("- *Superficie cubierta mínima:* 60 m²\n"));
    }

    #[tokio::test]
    async fn test_first_run_announced_once() {
        let dir = TempDir::new().unwrap();
        let flag = dir.path().join("first_run_flag.txt");
        let notifier = RecordingNotifier::new();
        let search = SearchConfig::default();
        let filter = FilterConfig::default();

        assert!(announce_first_run(&notifier, Some("chat"), &flag, &search, &filter).await.unwrap());
        assert!(!announce_first_run(&notifier, Some("chat"), &flag, &search, &filter).await.unwrap());
        assert_eq!(notifier.sent().len(), 1);
        assert!(flag.exists());
    }

    #[tokio::test]
    async fn test_first_run_without_recipient_still_writes_flag() {
        let dir = TempDir::new().unwrap();
        let flag = dir.path().join("flag");
        let notifier = RecordingNotifier::new();

        let first = announce_first_run(&notifier, None, &flag, &SearchConfig::default(), &FilterConfig::default())
            .await
            .unwrap();
        assert!(first);
        assert!(notifier.sent().is_empty());
        assert!(flag.exists());
    }

    #[tokio::test]
    async fn test_failed_delivery_does_not_stop_the_rest() {
        let notifier = RecordingNotifier::new().failing_on("MLA2");
        let listings = vec![listing("MLA1"), listing("MLA2"), listing("MLA3")];

        let delivered = deliver_all(&notifier, "chat", &listings).await;
        assert_eq!(delivered, 2);
        let sent = notifier.sent();
        assert!(sent[0].0.contains("MLA1"));
        assert!(sent[1].0.contains("MLA3"));
        assert_eq!(sent[1].1, "chat");
    }
}
