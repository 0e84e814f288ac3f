//! Spot price retrieval from the Twelve Data REST API

use anyhow::Result;
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;

const DEFAULT_BASE_URL: &str = "https://api.twelvedata.com";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Source of the latest price for the tracked symbol
#[async_trait]
pub trait PriceFeed: Send + Sync {
    async fn latest_price(&self) -> Result<f64>;

    /// Short name for logs
    fn name(&self) -> &'static str;
}

/// `/price` response. Errors come back as `status`/`code`/`message` with no price.
#[derive(Debug, Deserialize)]
struct PriceResponse {
    #[serde(default)]
    price: Option<String>,
    #[serde(default)]
    code: Option<i64>,
    #[serde(default)]
    message: Option<String>,
}

/// Twelve Data spot price client
#[derive(Clone)]
pub struct TwelveDataClient {
    client: Client,
    base_url: String,
    api_key: String,
    symbol: String,
}

impl TwelveDataClient {
    pub fn new(api_key: impl Into<String>, symbol: impl Into<String>) -> Result<Self> {
        Ok(Self {
            client: Client::builder().timeout(REQUEST_TIMEOUT).build()?,
            base_url: DEFAULT_BASE_URL.to_string(),
            api_key: api_key.into(),
            symbol: symbol.into(),
        })
    }

    pub fn symbol(&self) -> &str {
        &self.symbol
    }
}

fn parse_price(body: &str) -> Result<f64> {
    let data: PriceResponse = serde_json::from_str(body)?;

    let Some(raw) = data.price.filter(|p| !p.trim().is_empty()) else {
        anyhow::bail!(
            "Twelve Data returned no price (code {}): {}",
            data.code.unwrap_or_default(),
            data.message.unwrap_or_default()
        );
    };

    let price: f64 = raw.trim().parse()?;
    if !price.is_finite() || price <= 0.0 {
        anyhow::bail!("Twelve Data returned invalid price {}", raw);
    }
    Ok(price)
}

#[async_trait]
impl PriceFeed for TwelveDataClient {
    async fn latest_price(&self) -> Result<f64> {
        let url = format!("{}/price", self.base_url);

        debug!(symbol = %self.symbol, "Fetching price from Twelve Data");

        let response = self
            .client
            .get(&url)
            .query(&[("symbol", self.symbol.as_str()), ("apikey", self.api_key.as_str())])
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("Twelve Data API error {}: {}", status, body);
        }

        let body = response.text().await?;
        let price = parse_price(&body)?;

        debug!(symbol = %self.symbol, price, "Fetched price");
        Ok(price)
    }

    fn name(&self) -> &'static str {
        "twelvedata"
    }
}
