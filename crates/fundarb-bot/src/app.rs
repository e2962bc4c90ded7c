//! Application facade.
//!
//! Owns the two funding feeds, the detector and, in trading mode, one
//! order executor per venue. Operations return tagged results so an
//! outer layer can forward them unchanged.

use crate::config::AppConfig;
use crate::error::{AppError, AppResult};
use chrono::Utc;
use fundarb_core::{Position, Symbol, Venue};
use fundarb_detector::{
    contract_counts, market_overview, ArbitrageDetector, ArbitrageOpportunity, ContractCounts,
    MarketRow,
};
use fundarb_executor::{
    BulkCloseReport, OperationResult, OrderExecutor, OrderResult, RawOrderRequest, VenueClient,
};
use fundarb_feed::{
    fetch_snapshot, BinanceFeed, FundingFeed, HyperliquidFeed, MarketSnapshot, RateChange,
};
use rust_decimal::Decimal;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Merged market table plus per-venue contract counts.
#[derive(Debug, Clone, Serialize)]
pub struct MarketOverview {
    pub counts: ContractCounts,
    pub rows: Vec<MarketRow>,
}

/// Result of one watch-loop tick.
#[derive(Debug, Clone, Serialize)]
pub struct WatchReport {
    pub opportunities: Vec<ArbitrageOpportunity>,
    pub changes_a: Vec<RateChange>,
    pub changes_b: Vec<RateChange>,
}

/// Main application.
pub struct Application {
    config: AppConfig,
    feed_a: Arc<dyn FundingFeed>,
    feed_b: Arc<dyn FundingFeed>,
    detector: ArbitrageDetector,
    executors: HashMap<Venue, OrderExecutor<dyn VenueClient>>,
}

impl Application {
    /// Create an application reading the live public feeds.
    pub fn new(config: AppConfig) -> AppResult<Self> {
        let feed_a = Arc::new(BinanceFeed::new(config.binance.base_url.clone())?);
        let feed_b = Arc::new(HyperliquidFeed::new(config.hyperliquid.info_url.clone())?);
        Self::with_feeds(config, feed_a, feed_b)
    }

    /// Create an application over arbitrary feeds. `feed_a` must be the
    /// Binance feed and `feed_b` the Hyperliquid one.
    pub fn with_feeds(
        config: AppConfig,
        feed_a: Arc<dyn FundingFeed>,
        feed_b: Arc<dyn FundingFeed>,
    ) -> AppResult<Self> {
        config.validate()?;
        if feed_a.venue() != Venue::Binance || feed_b.venue() != Venue::Hyperliquid {
            return Err(AppError::Configuration(format!(
                "feeds must be (binance, hyperliquid), got ({}, {})",
                feed_a.venue(),
                feed_b.venue()
            )));
        }
        let detector = ArbitrageDetector::new(config.detector.clone())?;

        info!(mode = ?config.mode, min_diff = %config.detector.min_diff, "Application created");
        Ok(Self {
            config,
            feed_a,
            feed_b,
            detector,
            executors: HashMap::new(),
        })
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// Attach a trading client for its venue.
    ///
    /// Refused outside trading mode or when the venue's credentials are
    /// missing.
    pub fn connect_trading(&mut self, client: Arc<dyn VenueClient>) -> AppResult<()> {
        let venue = client.venue();
        if !self.config.is_trading_mode() {
            return Err(AppError::Configuration(format!(
                "cannot connect {venue} trading in observation mode"
            )));
        }
        let missing = self.config.missing_credentials(venue);
        if !missing.is_empty() {
            return Err(AppError::Configuration(format!(
                "{venue} credentials missing: {}",
                missing.join(", ")
            )));
        }
        let executor = OrderExecutor::new(client, self.config.executor.clone());
        self.executors.insert(venue, executor);
        info!(%venue, "Trading client connected");
        Ok(())
    }

    /// Fetch and resolve both feeds.
    pub async fn snapshot(&self) -> AppResult<MarketSnapshot> {
        let snapshot = fetch_snapshot(
            self.feed_a.as_ref(),
            self.feed_b.as_ref(),
            Utc::now(),
            &self.config.feed,
        )
        .await?;
        Ok(snapshot)
    }

    /// One detection pass over fresh quotes. `min_diff` overrides the
    /// configured threshold.
    pub async fn detect_opportunities(
        &self,
        min_diff: Option<Decimal>,
    ) -> OperationResult<Vec<ArbitrageOpportunity>> {
        if let Some(d) = min_diff.filter(|d| d.is_sign_negative()) {
            return OperationResult::error("validation", format!("min_diff ({d}) must be non-negative"));
        }
        match self.snapshot().await {
            Ok(snapshot) => OperationResult::success(self.detector.detect(&snapshot, min_diff)),
            Err(e) => failure(e),
        }
    }

    /// Every symbol quoted on either venue, ungated.
    pub async fn market_overview(&self) -> OperationResult<MarketOverview> {
        match self.snapshot().await {
            Ok(s) => OperationResult::success(MarketOverview {
                counts: contract_counts(&s.venue_a, &s.venue_b),
                rows: market_overview(&s.venue_a, &s.venue_b),
            }),
            Err(e) => failure(e),
        }
    }

    /// Detect on a fresh snapshot and diff it against the previous one.
    /// Returns the report and the snapshot to pass to the next tick.
    pub async fn watch_tick(
        &self,
        previous: Option<&MarketSnapshot>,
    ) -> AppResult<(WatchReport, MarketSnapshot)> {
        let snapshot = self.snapshot().await?;
        let mut opportunities = self.detector.detect(&snapshot, None);
        opportunities.truncate(self.config.watch.top_n);

        let threshold = self.config.watch.change_threshold;
        let (changes_a, changes_b) = match previous {
            Some(prev) => (
                snapshot.venue_a.changed_since(&prev.venue_a, threshold),
                snapshot.venue_b.changed_since(&prev.venue_b, threshold),
            ),
            None => (Vec::new(), Vec::new()),
        };

        let report = WatchReport {
            opportunities,
            changes_a,
            changes_b,
        };
        Ok((report, snapshot))
    }

    /// Poll until Ctrl-C, logging opportunities and rate changes.
    pub async fn watch(&self) -> AppResult<()> {
        let mut ticker = tokio::time::interval(self.config.watch.interval());
        let mut previous: Option<MarketSnapshot> = None;
        info!(interval_secs = self.config.watch.interval_secs, "Watching funding rates");

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    match self.watch_tick(previous.as_ref()).await {
                        Ok((report, snapshot)) => {
                            log_report(&report);
                            previous = Some(snapshot);
                        }
                        // Keep the last good snapshot and try again next tick.
                        Err(e) => warn!(error = %e, "Watch tick failed"),
                    }
                }
                _ = tokio::signal::ctrl_c() => {
                    info!("Shutdown requested");
                    return Ok(());
                }
            }
        }
    }

    /// Validate and place an order on `venue`.
    pub async fn place_order(
        &self,
        venue: Venue,
        request: &RawOrderRequest,
    ) -> OperationResult<OrderResult> {
        let executor = match self.executor(venue) {
            Ok(e) => e,
            Err(e) => return failure(e),
        };
        match request.validate() {
            Ok(req) => executor.place_order(&req).await.into(),
            Err(e) => e.into(),
        }
    }

    /// Close the whole position in `symbol` on `venue`.
    pub async fn close_position(&self, venue: Venue, symbol: &str) -> OperationResult<OrderResult> {
        let executor = match self.executor(venue) {
            Ok(e) => e,
            Err(e) => return failure(e),
        };
        match Symbol::parse(symbol) {
            Ok(symbol) => executor.close_position(&symbol).await.into(),
            Err(e) => OperationResult::error("validation", e.to_string()),
        }
    }

    /// Close every open position on `venue`, one symbol at a time.
    pub async fn close_all_positions(&self, venue: Venue) -> OperationResult<BulkCloseReport> {
        match self.executor(venue) {
            Ok(executor) => executor.close_all_positions().await.into(),
            Err(e) => failure(e),
        }
    }

    pub async fn open_positions(&self, venue: Venue) -> OperationResult<Vec<Position>> {
        match self.executor(venue) {
            Ok(executor) => executor.open_positions().await.into(),
            Err(e) => failure(e),
        }
    }

    fn executor(&self, venue: Venue) -> AppResult<&OrderExecutor<dyn VenueClient>> {
        self.executors.get(&venue).ok_or_else(|| {
            AppError::Configuration(format!("trading is not enabled for {venue}"))
        })
    }
}

fn failure<T>(e: AppError) -> OperationResult<T> {
    match e {
        AppError::Execution(e) => e.into(),
        other => {
            debug!(kind = other.kind(), error = %other, "Operation failed");
            OperationResult::error(other.kind(), other.to_string())
        }
    }
}

fn log_report(report: &WatchReport) {
    for opp in &report.opportunities {
        info!(
            symbol = %opp.symbol,
            rate_a = %opp.quote_a.rate_percent,
            rate_b = %opp.quote_b.rate_percent,
            difference = %opp.difference,
            settles_first = %opp.settles_first,
            strategy = %opp.strategy_text(),
            "Opportunity"
        );
    }
    for change in report.changes_a.iter().chain(&report.changes_b) {
        debug!(
            symbol = %change.symbol,
            previous = ?change.previous,
            current = %change.current,
            "Rate changed"
        );
    }
    info!(
        opportunities = report.opportunities.len(),
        changes_a = report.changes_a.len(),
        changes_b = report.changes_b.len(),
        "Watch tick"
    );
}
