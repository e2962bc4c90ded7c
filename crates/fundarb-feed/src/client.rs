//! HTTP fetchers for the venues' public funding endpoints.

use chrono::{DateTime, Utc};
use fundarb_core::{BoxFuture, Symbol, Venue};
use reqwest::{Client, Response};
use serde::Serialize;
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, info};

use crate::batch::QuoteBatch;
use crate::error::{FeedError, FeedResult};
use crate::parser::{next_top_of_hour, parse_binance, parse_hyperliquid};
use crate::settlement::SettlementSource;

/// Default timeout for API requests.
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

pub const BINANCE_DEFAULT_URL: &str = "https://fapi.binance.com";
pub const HYPERLIQUID_DEFAULT_INFO_URL: &str = "https://api.hyperliquid.xyz/info";

/// A venue funding feed: one quote batch per call.
pub trait FundingFeed: SettlementSource {
    fn fetch_quotes(&self, now: DateTime<Utc>) -> BoxFuture<'_, FeedResult<QuoteBatch>>;
}

fn build_client() -> FeedResult<Client> {
    Client::builder()
        .timeout(DEFAULT_TIMEOUT)
        .build()
        .map_err(|e| FeedError::HttpClient(format!("Failed to create HTTP client: {e}")))
}

async fn read_json(response: Response) -> FeedResult<Value> {
    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(FeedError::HttpClient(format!("HTTP {status}: {body}")));
    }
    response
        .json()
        .await
        .map_err(|e| FeedError::HttpClient(format!("Failed to parse response: {e}")))
}

/// Binance USDⓈ-M futures public REST feed.
pub struct BinanceFeed {
    client: Client,
    base_url: String,
}

impl BinanceFeed {
    /// Create a feed against `base_url` (e.g. "https://fapi.binance.com").
    pub fn new(base_url: impl Into<String>) -> FeedResult<Self> {
        Ok(Self {
            client: build_client()?,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    async fn get(&self, path: &str, query: &[(&str, &str)]) -> FeedResult<Value> {
        let url = format!("{}{}", self.base_url, path);
        debug!(%url, "GET");
        let response = self
            .client
            .get(&url)
            .query(query)
            .send()
            .await
            .map_err(|e| FeedError::HttpClient(format!("HTTP request failed: {e}")))?;
        read_json(response).await
    }

    pub async fn fetch_exchange_info(&self) -> FeedResult<Value> {
        self.get("/fapi/v1/exchangeInfo", &[]).await
    }

    pub async fn fetch_premium_index(&self) -> FeedResult<Value> {
        self.get("/fapi/v1/premiumIndex", &[]).await
    }

    async fn quotes(&self, now: DateTime<Utc>) -> FeedResult<QuoteBatch> {
        info!(url = %self.base_url, "Fetching Binance funding rates");
        let (info, premium) = tokio::try_join!(self.fetch_exchange_info(), self.fetch_premium_index())?;
        parse_binance(&info, &premium, now)
    }

    async fn live_settlement(&self, symbol: &Symbol) -> FeedResult<Option<DateTime<Utc>>> {
        let instrument = Venue::Binance.instrument(symbol);
        let body = self
            .get("/fapi/v1/premiumIndex", &[("symbol", instrument.as_str())])
            .await?;
        Ok(body
            .get("nextFundingTime")
            .and_then(Value::as_i64)
            .filter(|ms| *ms > 0)
            .and_then(DateTime::from_timestamp_millis))
    }
}

impl SettlementSource for BinanceFeed {
    fn venue(&self) -> Venue {
        Venue::Binance
    }

    fn refetch_settlement<'a>(
        &'a self,
        symbol: &'a Symbol,
    ) -> BoxFuture<'a, FeedResult<Option<DateTime<Utc>>>> {
        Box::pin(self.live_settlement(symbol))
    }
}

impl FundingFeed for BinanceFeed {
    fn fetch_quotes(&self, now: DateTime<Utc>) -> BoxFuture<'_, FeedResult<QuoteBatch>> {
        Box::pin(self.quotes(now))
    }
}

/// Request body for the Hyperliquid info endpoint.
#[derive(Debug, Serialize)]
struct InfoRequest {
    #[serde(rename = "type")]
    request_type: &'static str,
}

/// Hyperliquid public info feed.
pub struct HyperliquidFeed {
    client: Client,
    info_url: String,
}

impl HyperliquidFeed {
    /// Create a feed against the info endpoint
    /// (e.g. "https://api.hyperliquid.xyz/info").
    pub fn new(info_url: impl Into<String>) -> FeedResult<Self> {
        Ok(Self {
            client: build_client()?,
            info_url: info_url.into(),
        })
    }

    async fn info(&self, request_type: &'static str) -> FeedResult<Value> {
        debug!(url = %self.info_url, request_type, "POST info");
        let response = self
            .client
            .post(&self.info_url)
            .json(&InfoRequest { request_type })
            .send()
            .await
            .map_err(|e| FeedError::HttpClient(format!("HTTP request failed: {e}")))?;
        read_json(response).await
    }

    pub async fn fetch_meta(&self) -> FeedResult<Value> {
        self.info("meta").await
    }

    pub async fn fetch_predicted_fundings(&self) -> FeedResult<Value> {
        self.info("predictedFundings").await
    }

    async fn quotes(&self, now: DateTime<Utc>) -> FeedResult<QuoteBatch> {
        info!(url = %self.info_url, "Fetching Hyperliquid predicted funding");
        let (meta, predicted) = tokio::try_join!(self.fetch_meta(), self.fetch_predicted_fundings())?;
        parse_hyperliquid(&meta, &predicted, now)
    }
}

impl SettlementSource for HyperliquidFeed {
    fn venue(&self) -> Venue {
        Venue::Hyperliquid
    }

    /// Hyperliquid settles hourly; the live value is the clock's next hour.
    fn refetch_settlement<'a>(
        &'a self,
        _symbol: &'a Symbol,
    ) -> BoxFuture<'a, FeedResult<Option<DateTime<Utc>>>> {
        Box::pin(async move { Ok(Some(next_top_of_hour(Utc::now()))) })
    }
}

impl FundingFeed for HyperliquidFeed {
    fn fetch_quotes(&self, now: DateTime<Utc>) -> BoxFuture<'_, FeedResult<QuoteBatch>> {
        Box::pin(self.quotes(now))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_binance_feed_trims_trailing_slash() {
        let feed = BinanceFeed::new("https://fapi.binance.com/").unwrap();
        assert_eq!(feed.base_url, "https://fapi.binance.com");
        assert_eq!(feed.venue(), Venue::Binance);
    }

    #[test]
    fn test_info_request_shape() {
        let body = serde_json::to_value(InfoRequest {
            request_type: "predictedFundings",
        })
        .unwrap();
        assert_eq!(body, serde_json::json!({"type": "predictedFundings"}));
    }

    #[tokio::test]
    async fn test_hyperliquid_refetch_is_next_hour() {
        let feed = HyperliquidFeed::new(HYPERLIQUID_DEFAULT_INFO_URL).unwrap();
        let at = feed
            .refetch_settlement(&Symbol::from_base("BTC"))
            .await
            .unwrap()
            .unwrap();
        assert!(at > Utc::now());
        assert_eq!(at.timestamp() % 3600, 0);
    }
}
