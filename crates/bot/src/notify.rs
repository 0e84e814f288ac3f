//! Message delivery to Telegram

use anyhow::Result;
use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use std::time::Duration;
use tracing::{info, warn};

const DEFAULT_BASE_URL: &str = "https://api.telegram.org";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);
const MAX_ATTEMPTS: u32 = 3;

/// Delivery channel for formatted messages. Owns its own retry policy.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send(&self, text: &str) -> Result<()>;
}

#[derive(Serialize)]
struct SendMessage<'a> {
    chat_id: &'a str,
    text: &'a str,
}

/// Telegram Bot API client
#[derive(Clone)]
pub struct TelegramNotifier {
    client: Client,
    base_url: String,
    token: String,
    chat_id: String,
}

impl TelegramNotifier {
    pub fn new(token: impl Into<String>, chat_id: impl Into<String>) -> Result<Self> {
        Ok(Self {
            client: Client::builder().timeout(REQUEST_TIMEOUT).build()?,
            base_url: DEFAULT_BASE_URL.to_string(),
            token: token.into(),
            chat_id: chat_id.into(),
        })
    }
}

#[async_trait]
impl Notifier for TelegramNotifier {
    /// Up to three attempts on transport errors, waiting 1 s then 2 s.
    /// An API error response is final.
    async fn send(&self, text: &str) -> Result<()> {
        let url = format!("{}/bot{}/sendMessage", self.base_url, self.token);
        let payload = SendMessage {
            chat_id: &self.chat_id,
            text,
        };

        let mut attempt = 1;
        loop {
            match self.client.post(&url).json(&payload).send().await {
                Ok(response) => {
                    if !response.status().is_success() {
                        let status = response.status();
                        let body = response.text().await.unwrap_or_default();
                        anyhow::bail!("Telegram API error {}: {}", status, body);
                    }
                    info!("Telegram message sent");
                    return Ok(());
                }
                Err(e) if attempt < MAX_ATTEMPTS => {
                    warn!(attempt, max = MAX_ATTEMPTS, error = %e, "Telegram request failed");
                    tokio::time::sleep(Duration::from_secs(attempt as u64)).await;
                    attempt += 1;
                }
                Err(e) => {
                    anyhow::bail!("Telegram failed after {} attempts: {}", MAX_ATTEMPTS, e);
                }
            }
        }
    }
}

/// Logs messages instead of delivering them (`--dry-run`)
#[derive(Debug, Default, Clone)]
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn send(&self, text: &str) -> Result<()> {
        info!("[dry-run] would send:\n{}", text);
        Ok(())
    }
}
