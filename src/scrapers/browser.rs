use crate::error::FetchError;
use crate::scrapers::traits::Fetcher;
use anyhow::{Context, Result};
use async_trait::async_trait;
use headless_chrome::{Browser, LaunchOptions};
use std::thread;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Fetcher that renders pages in headless Chrome.
///
/// Used when the site serves search results that only appear after
/// client-side rendering.
pub struct BrowserFetcher {
    browser: Browser,
    settle: Duration,
}

impl BrowserFetcher {
    /// Launch headless Chrome; `settle` is how long each page gets to render
    pub fn new(settle: Duration) -> Result<Self> {
        info!("Launching headless Chrome...");

        let options = LaunchOptions::default_builder()
            .headless(true)
            .build()
            .context("Failed to build launch options")?;

        let browser = Browser::new(options).context("Failed to launch Chrome browser")?;

        Ok(Self { browser, settle })
    }
}

fn render(browser: &Browser, url: &str, settle: Duration) -> Result<String> {
    let tab = browser.new_tab()?;

    closing_after(
        url,
        || {
            tab.navigate_to(url)?;
            tab.wait_until_navigated()?;

            thread::sleep(settle);

            let html_result = tab.evaluate("document.documentElement.outerHTML", false)?;
            html_result
                .value
                .and_then(|value| value.as_str().map(str::to_string))
                .context("Page returned no HTML")
        },
        || tab.close(true),
    )
}

/// Run `load`, then `close` on every exit path
fn closing_after<T>(
    url: &str,
    load: impl FnOnce() -> Result<T>,
    close: impl FnOnce() -> Result<bool>,
) -> Result<T> {
    let loaded = load();
    if let Err(e) = close() {
        warn!("Failed to close tab for {}: {:#}", url, e);
    }
    loaded
}

#[async_trait]
impl Fetcher for BrowserFetcher {
    async fn fetch(&self, url: &str) -> Result<String, FetchError> {
        debug!("Rendering URL: {}", url);

        let browser = self.browser.clone();
        let settle = self.settle;
        let target = url.to_string();

        let rendered = tokio::task::spawn_blocking(move || render(&browser, &target, settle))
            .await
            .map_err(|e| FetchError::Browser {
                url: url.to_string(),
                message: e.to_string(),
            })?;

        let html = rendered.map_err(|e| FetchError::Browser {
            url: url.to_string(),
            message: format!("{:#}", e),
        })?;

        debug!("Rendered {} bytes of HTML", html.len());
        Ok(html)
    }

    fn backend_name(&self) -> &'static str {
        "headless-chrome"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    #[test]
    fn test_tab_closed_when_load_fails() {
        let closed = Cell::new(0);
        let result: Result<String> = closing_after(
            "https://x/MLA1",
            || anyhow::bail!("navigation timed out"),
            || {
                closed.set(closed.get() + 1);
                Ok(true)
            },
        );
        assert!(result.is_err());
        assert_eq!(closed.get(), 1);
    }

    #[test]
    fn test_close_failure_keeps_loaded_page() {
        let result = closing_after(
            "https://x/MLA1",
            || Ok("<html></html>".to_string()),
            || anyhow::bail!("tab already gone"),
        );
        assert_eq!(result.unwrap(), "<html></html>");
    }
}
