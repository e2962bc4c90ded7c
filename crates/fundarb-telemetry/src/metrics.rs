//! Prometheus metrics for the arbitrage engine.
//!
//! # Panics
//!
//! Metric registration uses `unwrap()`. A failure means duplicate metric
//! names, which is a startup bug; it only happens during static
//! initialization.

use fundarb_core::Venue;
use once_cell::sync::Lazy;
use prometheus::{
    register_counter_vec, register_int_gauge, CounterVec, Encoder, IntGauge, TextEncoder,
};

use crate::error::TelemetryResult;

/// Quotes normalized per venue.
pub static QUOTES_NORMALIZED_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "fundarb_quotes_normalized_total",
        "Funding quotes normalized from venue feeds",
        &["venue"]
    )
    .unwrap()
});

/// Symbols dropped during normalization.
/// Labels: venue, reason
pub static QUOTES_SKIPPED_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "fundarb_quotes_skipped_total",
        "Symbols skipped during quote normalization",
        &["venue", "reason"]
    )
    .unwrap()
});

/// Settlement resolutions.
/// Labels: venue, outcome (fresh/refetched/unavailable)
pub static SETTLEMENT_RESOLUTION_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "fundarb_settlement_resolution_total",
        "Settlement timestamp resolutions by outcome",
        &["venue", "outcome"]
    )
    .unwrap()
});

/// Opportunities in the latest detection pass.
pub static OPPORTUNITIES_CURRENT: Lazy<IntGauge> = Lazy::new(|| {
    register_int_gauge!(
        "fundarb_opportunities_current",
        "Opportunities emitted by the latest detection pass"
    )
    .unwrap()
});

/// Opportunities emitted, split by whether a strategy was assigned.
pub static OPPORTUNITIES_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "fundarb_opportunities_total",
        "Opportunities emitted by detection",
        &["strategy"]
    )
    .unwrap()
});

/// Orders submitted.
/// Labels: venue, action (open/close), outcome (submitted/rejected/error)
pub static ORDERS_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "fundarb_orders_total",
        "Orders submitted to venues",
        &["venue", "action", "outcome"]
    )
    .unwrap()
});

/// Mark price lookups that needed a retry.
pub static PRICE_RETRY_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "fundarb_price_retry_total",
        "Mark price lookup retries",
        &["venue"]
    )
    .unwrap()
});

/// Leverage updates that failed and were skipped.
pub static LEVERAGE_FAILURES_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "fundarb_leverage_failures_total",
        "Leverage updates that failed non-fatally",
        &["venue"]
    )
    .unwrap()
});

/// Per-symbol outcomes of bulk close.
pub static BULK_CLOSE_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "fundarb_bulk_close_total",
        "Per-symbol outcomes of bulk position close",
        &["venue", "status"]
    )
    .unwrap()
});

/// Metrics facade.
pub struct Metrics;

impl Metrics {
    pub fn quotes_normalized(venue: Venue, count: usize) {
        QUOTES_NORMALIZED_TOTAL
            .with_label_values(&[&venue.to_string()])
            .inc_by(count as f64);
    }

    pub fn quote_skipped(venue: Venue, reason: &str) {
        QUOTES_SKIPPED_TOTAL
            .with_label_values(&[&venue.to_string(), reason])
            .inc();
    }

    pub fn settlement_resolved(venue: Venue, outcome: &str) {
        SETTLEMENT_RESOLUTION_TOTAL
            .with_label_values(&[&venue.to_string(), outcome])
            .inc();
    }

    /// Record one detection pass.
    pub fn detection_pass(with_strategy: usize, without_strategy: usize) {
        OPPORTUNITIES_CURRENT.set((with_strategy + without_strategy) as i64);
        OPPORTUNITIES_TOTAL
            .with_label_values(&["assigned"])
            .inc_by(with_strategy as f64);
        OPPORTUNITIES_TOTAL
            .with_label_values(&["none"])
            .inc_by(without_strategy as f64);
    }

    pub fn order(venue: Venue, action: &str, outcome: &str) {
        ORDERS_TOTAL
            .with_label_values(&[&venue.to_string(), action, outcome])
            .inc();
    }

    pub fn price_retry(venue: Venue) {
        PRICE_RETRY_TOTAL
            .with_label_values(&[&venue.to_string()])
            .inc();
    }

    pub fn leverage_failed(venue: Venue) {
        LEVERAGE_FAILURES_TOTAL
            .with_label_values(&[&venue.to_string()])
            .inc();
    }

    pub fn bulk_close(venue: Venue, status: &str) {
        BULK_CLOSE_TOTAL
            .with_label_values(&[&venue.to_string(), status])
            .inc();
    }

    /// Render every registered metric in the Prometheus text format.
    pub fn render() -> TelemetryResult<String> {
        let mut buf = Vec::new();
        TextEncoder::new().encode(&prometheus::gather(), &mut buf)?;
        Ok(String::from_utf8_lossy(&buf).into_owned())
    }
}
