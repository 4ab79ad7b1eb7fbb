use anyhow::{Context, Result};
use clap::Parser;
use rent_scout::config::Cli;
use rent_scout::notify::{self, LogNotifier, Notifier, TelegramNotifier, STARTUP_PING};
use rent_scout::scrapers::{BrowserFetcher, Fetcher, HttpFetcher};
use rent_scout::{Crawler, RandomDelay, SeenStore};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();
    let search = cli.search_config();
    let filter = cli.filter_config();
    let settings = cli.crawl_settings();
    let notify_config = cli.notify_config();

    info!("🏠 Rent Scout");
    info!(
        "{} kinds x {} zones x {} terms, total price {}-{}",
        search.kinds.len(),
        search.zones.len(),
        search.terms.len(),
        filter.min_total_price,
        filter.max_total_price
    );

    let notifier: Box<dyn Notifier> = match (&notify_config.token, notify_config.dry_run) {
        (Some(token), false) => Box::new(TelegramNotifier::new(token.clone(), settings.timeout)?),
        (None, false) => {
            warn!("NOTIFY_TOKEN not set, messages will only be logged");
            Box::new(LogNotifier)
        }
        (_, true) => Box::new(LogNotifier),
    };
    let chat_id = notify_config
        .chat_id
        .as_deref()
        .or(notify_config.dry_run.then_some("dry-run"));

    notify::announce_first_run(
        notifier.as_ref(),
        chat_id,
        &settings.first_run_file,
        &search,
        &filter,
    )
    .await
    .with_context(|| format!("Failed to write {}", settings.first_run_file.display()))?;

    if notify_config.startup_ping {
        match chat_id {
            Some(chat_id) => {
                if let Err(e) = notifier.send(STARTUP_PING, chat_id).await {
                    error!("Startup ping failed: {}", e);
                }
            }
            None => warn!("SEND_STARTUP_PING set but NOTIFY_CHAT_ID is missing"),
        }
    }

    let fetcher: Box<dyn Fetcher> = match settings.browser_settle {
        Some(settle) => Box::new(BrowserFetcher::new(settle)?),
        None => Box::new(HttpFetcher::new(settings.timeout)?),
    };
    info!("Fetching pages via {}", fetcher.backend_name());

    let store = SeenStore::new(&settings.seen_file);
    let seen = store
        .load_or_empty()
        .await
        .context("Failed to load seen listings")?;
    info!("{} listings already seen", seen.len());

    let crawler = Crawler::new(
        fetcher,
        Box::new(RandomDelay::new(settings.min_delay, settings.max_delay)),
        store,
        search,
        filter,
    );
    let matches = crawler.run(seen).await.context("Crawl aborted")?;
    info!("Total new items: {}", matches.len());

    if let Some(output) = &settings.output {
        let json = serde_json::to_string_pretty(&matches)?;
        tokio::fs::write(output, json)
            .await
            .with_context(|| format!("Failed to write {}", output.display()))?;
        info!("💾 Saved matches to {}", output.display());
    }

    match chat_id {
        Some(chat_id) => {
            info!("Sending notifications");
            let delivered = notify::deliver_all(notifier.as_ref(), chat_id, matches.values()).await;
            info!("Delivered {}/{} notifications", delivered, matches.len());
        }
        None if !matches.is_empty() => warn!("NOTIFY_CHAT_ID not set, {} matches not sent", matches.len()),
        None => {}
    }

    Ok(())
}
