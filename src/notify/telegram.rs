use crate::error::DeliveryError;
use crate::notify::Notifier;
use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;
use std::time::Duration;
use tracing::debug;

pub const TELEGRAM_API: &str = "https://api.telegram.org";

#[derive(Debug, Deserialize)]
struct ApiResponse {
    ok: bool,
    #[serde(default)]
    description: Option<String>,
}

/// Sends Markdown messages through the Telegram Bot API
pub struct TelegramNotifier {
    client: Client,
    api_base: String,
    token: String,
}

impl TelegramNotifier {
    pub fn new(token: impl Into<String>, timeout: Duration) -> Result<Self> {
        Self::with_api_base(TELEGRAM_API, token, timeout)
    }

    /// Point the notifier at a different API host
    pub fn with_api_base(
        api_base: impl Into<String>,
        token: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            client,
            api_base: api_base.into(),
            token: token.into(),
        })
    }
}

#[async_trait]
impl Notifier for TelegramNotifier {
    async fn send(&self, message: &str, recipient: &str) -> Result<(), DeliveryError> {
        let url = format!(
            "{}/bot{}/sendMessage",
            self.api_base.trim_end_matches('/'),
            self.token
        );
        debug!("Sending {} byte message to chat {}", message.len(), recipient);

        let response = self
            .client
            .post(&url)
            .json(&json!({
                "chat_id": recipient,
                "text": message,
                "parse_mode": "Markdown",
            }))
            .send()
            .await?;

        let status = response.status();
        let body: Option<ApiResponse> = response.json().await.ok();

        match body {
            Some(ApiResponse { ok: true, .. }) if status.is_success() => Ok(()),
            Some(ApiResponse {
                description: Some(description),
                ..
            }) => Err(DeliveryError::Rejected(description)),
            _ if !status.is_success() => Err(DeliveryError::Status(status)),
            _ => Err(DeliveryError::Rejected("unexpected response".to_string())),
        }
    }
}
