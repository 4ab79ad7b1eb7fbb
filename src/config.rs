//! Command line and environment configuration.
//!
//! Everything here is resolved once in `main` into plain values that the
//! crawler receives explicitly.

use crate::filter::FilterConfig;
use crate::scrapers::types::{SearchConfig, DEFAULT_BASE_URL};
use clap::Parser;
use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, Parser)]
#[command(version, about = "Watches rental listings and notifies about new matches")]
pub struct Cli {
    /// Neighborhoods to search (comma separated)
    #[arg(long, value_delimiter = ',', default_value = "belgrano-r,chacarita,coghlan,colegiales,nunez,palermo,palermo-chico,palermo-hollywood,palermo-soho,paternal,saavedra,villa-crespo,villa-ortuzar,villa-urquiza")]
    pub zones: Vec<String>,

    /// Property kinds to search (comma separated)
    #[arg(long, value_delimiter = ',', default_value = "casas,ph")]
    pub kinds: Vec<String>,

    /// Search terms (comma separated)
    #[arg(long, value_delimiter = ',', default_value = "parrilla")]
    pub terms: Vec<String>,

    #[arg(long, default_value = DEFAULT_BASE_URL)]
    pub base_url: String,

    #[arg(long, default_value_t = 700_000)]
    pub min_total_price: i64,

    #[arg(long, default_value_t = 1_400_000)]
    pub max_total_price: i64,

    #[arg(long, default_value_t = 3)]
    pub min_rooms: u32,

    #[arg(long, default_value_t = 2)]
    pub min_bathrooms: u32,

    /// Minimum covered area in square meters
    #[arg(long, default_value_t = 60)]
    pub min_covered_area: u32,

    /// Where seen listings are recorded between runs
    #[arg(long, default_value = "./seen_ids.json")]
    pub seen_file: PathBuf,

    /// Marker written after the first-run announcement
    #[arg(long, default_value = "./first_run_flag.txt")]
    pub first_run_file: PathBuf,

    /// Shortest pause between search queries, in seconds
    #[arg(long, default_value_t = 1.0)]
    pub min_delay_secs: f64,

    /// Longest pause between search queries, in seconds
    #[arg(long, default_value_t = 10.0)]
    pub max_delay_secs: f64,

    /// Per-request timeout, in seconds
    #[arg(long, default_value_t = 30)]
    pub timeout_secs: u64,

    /// Render pages with headless Chrome instead of plain HTTP
    #[arg(long)]
    pub browser: bool,

    /// Seconds a rendered page gets to settle (with --browser)
    #[arg(long, default_value_t = 8)]
    pub browser_settle_secs: u64,

    /// Also write the matching listings to this JSON file
    #[arg(long)]
    pub output: Option<PathBuf>,

    /// Log messages instead of sending them
    #[arg(long)]
    pub dry_run: bool,

    /// Bot token for the notification channel
    #[arg(long, env = "NOTIFY_TOKEN", hide_env_values = true)]
    pub notify_token: Option<String>,

    /// Chat that receives the notifications
    #[arg(long, env = "NOTIFY_CHAT_ID")]
    pub notify_chat_id: Option<String>,

    /// Send a short ping before crawling
    #[arg(long, env = "SEND_STARTUP_PING", default_value_t = false, action = clap::ArgAction::Set,
          value_parser = clap::builder::BoolishValueParser::new())]
    pub send_startup_ping: bool,
}

/// Run-level knobs that are neither search space nor filters
#[derive(Debug, Clone)]
pub struct CrawlSettings {
    pub seen_file: PathBuf,
    pub first_run_file: PathBuf,
    pub min_delay: Duration,
    pub max_delay: Duration,
    pub timeout: Duration,
    pub browser_settle: Option<Duration>,
    pub output: Option<PathBuf>,
}

/// Where notifications go, if anywhere
#[derive(Debug, Clone)]
pub struct NotifyConfig {
    pub token: Option<String>,
    pub chat_id: Option<String>,
    pub startup_ping: bool,
    pub dry_run: bool,
}

impl Cli {
    pub fn search_config(&self) -> SearchConfig {
        SearchConfig {
            base_url: self.base_url.clone(),
            zones: non_empty(&self.zones),
            kinds: non_empty(&self.kinds),
            terms: non_empty(&self.terms),
        }
    }

    pub fn filter_config(&self) -> FilterConfig {
        FilterConfig {
            min_total_price: self.min_total_price,
            max_total_price: self.max_total_price,
            min_rooms: self.min_rooms,
            min_bathrooms: self.min_bathrooms,
            min_covered_area: self.min_covered_area,
        }
    }

    pub fn crawl_settings(&self) -> CrawlSettings {
        CrawlSettings {
            seen_file: self.seen_file.clone(),
            first_run_file: self.first_run_file.clone(),
            min_delay: seconds(self.min_delay_secs),
            max_delay: seconds(self.max_delay_secs),
            timeout: Duration::from_secs(self.timeout_secs),
            browser_settle: self
                .browser
                .then(|| Duration::from_secs(self.browser_settle_secs)),
            output: self.output.clone(),
        }
    }

    pub fn notify_config(&self) -> NotifyConfig {
        NotifyConfig {
            token: self.notify_token.clone().filter(|t| !t.is_empty()),
            chat_id: self.notify_chat_id.clone().filter(|c| !c.is_empty()),
            startup_ping: self.send_startup_ping,
            dry_run: self.dry_run,
        }
    }
}

fn non_empty(values: &[String]) -> Vec<String> {
    values
        .iter()
        .map(|v| v.trim())
        .filter(|v| !v.is_empty())
        .map(str::to_string)
        .collect()
}

fn seconds(value: f64) -> Duration {
    Duration::try_from_secs_f64(value).unwrap_or(Duration::ZERO)
}
