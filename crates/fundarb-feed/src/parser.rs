//! Normalization of raw venue payloads into canonical quotes.
//!
//! Pure functions: no I/O, and the clock is passed in. A malformed
//! top-level payload is an error; a malformed entry only drops that
//! symbol.

use chrono::{DateTime, Duration, DurationRound, TimeZone, Utc};
use fundarb_core::{FundingQuote, Settlement, Symbol, Venue};
use fundarb_telemetry::Metrics;
use rust_decimal::Decimal;
use serde_json::Value;
use std::collections::HashSet;
use std::str::FromStr;
use tracing::debug;

use crate::batch::{QuoteBatch, QuoteOutcome, SkipReason, SkippedSymbol};
use crate::error::{FeedError, FeedResult};

const BINANCE_QUOTE_ASSET: &str = "USDT";
const BINANCE_TRADING_STATUS: &str = "TRADING";
/// Venue entry name for Hyperliquid's own perp in `predictedFundings`.
const HL_PERP_VENUE: &str = "HlPerp";

static NULL: Value = Value::Null;

/// Next top-of-hour strictly after `now`.
pub fn next_top_of_hour(now: DateTime<Utc>) -> DateTime<Utc> {
    let hour = Duration::hours(1);
    now.duration_trunc(hour).unwrap_or(now) + hour
}

enum FieldError {
    Missing,
    Invalid,
}

fn parse_decimal(s: &str) -> Option<Decimal> {
    Decimal::from_str(s)
        .ok()
        .or_else(|| Decimal::from_scientific(s).ok())
}

fn decimal_field(entry: &Value, key: &str) -> Result<Decimal, FieldError> {
    match entry.get(key) {
        None | Some(Value::Null) => Err(FieldError::Missing),
        Some(Value::String(s)) => parse_decimal(s.trim()).ok_or(FieldError::Invalid),
        Some(Value::Number(n)) => parse_decimal(&n.to_string()).ok_or(FieldError::Invalid),
        Some(_) => Err(FieldError::Invalid),
    }
}

fn rate_percent(entry: &Value, key: &str) -> Result<Decimal, SkipReason> {
    let raw = decimal_field(entry, key).map_err(|e| match e {
        FieldError::Missing => SkipReason::MissingRate,
        FieldError::Invalid => SkipReason::InvalidRate,
    })?;
    raw.checked_mul(Decimal::ONE_HUNDRED)
        .ok_or(SkipReason::InvalidRate)
}

fn millis_field(entry: &Value, key: &str) -> Result<DateTime<Utc>, SkipReason> {
    let ms = match entry.get(key) {
        None | Some(Value::Null) => return Err(SkipReason::MissingSettlement),
        Some(Value::Number(n)) => n.as_i64(),
        Some(Value::String(s)) => s.trim().parse::<i64>().ok(),
        Some(_) => None,
    };
    ms.filter(|ms| *ms > 0)
        .and_then(|ms| Utc.timestamp_millis_opt(ms).single())
        .ok_or(SkipReason::InvalidSettlement)
}

fn record(batch: &QuoteBatch) {
    Metrics::quotes_normalized(batch.venue(), batch.len());
    for skip in batch.skipped() {
        debug!(venue = %batch.venue(), symbol = %skip.symbol, reason = %skip.reason, "Symbol skipped");
        Metrics::quote_skipped(batch.venue(), skip.reason.as_str());
    }
}

/// Normalize Binance `exchangeInfo` + `premiumIndex` payloads.
///
/// Rates arrive as decimal fractions and are scaled to percent.
/// `nextFundingTime` is a millisecond epoch taken as-is; stale values are
/// handled by the settlement resolver.
pub fn parse_binance(
    exchange_info: &Value,
    premium_index: &Value,
    fetched_at: DateTime<Utc>,
) -> FeedResult<QuoteBatch> {
    let symbols = exchange_info
        .get("symbols")
        .and_then(Value::as_array)
        .ok_or_else(|| FeedError::Payload("exchangeInfo has no symbols array".to_string()))?;
    let trading: HashSet<&str> = symbols
        .iter()
        .filter(|s| s.get("status").and_then(Value::as_str) == Some(BINANCE_TRADING_STATUS))
        .filter_map(|s| s.get("symbol").and_then(Value::as_str))
        .collect();

    let entries = premium_index
        .as_array()
        .ok_or_else(|| FeedError::Payload("premiumIndex is not an array".to_string()))?;

    let outcomes = entries.iter().filter_map(|entry| {
        let instrument = entry.get("symbol").and_then(Value::as_str)?;
        Some(binance_entry(instrument, entry, &trading))
    });
    let batch = QuoteBatch::collect(Venue::Binance, fetched_at, outcomes);
    record(&batch);
    Ok(batch)
}

fn binance_entry(instrument: &str, entry: &Value, trading: &HashSet<&str>) -> QuoteOutcome {
    let skip = |reason| SkippedSymbol::new(instrument, reason);
    let base = match instrument.strip_suffix(BINANCE_QUOTE_ASSET) {
        Some(base) if !base.is_empty() => base,
        _ => return Err(skip(SkipReason::UnsupportedQuote)),
    };
    if !trading.contains(instrument) {
        return Err(skip(SkipReason::Inactive));
    }
    let rate = rate_percent(entry, "lastFundingRate").map_err(skip)?;
    let at = millis_field(entry, "nextFundingTime").map_err(skip)?;
    Ok(FundingQuote::new(
        Venue::Binance,
        Symbol::from_base(base),
        rate,
        Settlement::At(at),
    ))
}

/// Normalize Hyperliquid `meta` + `predictedFundings` payloads.
///
/// Only the `HlPerp` prediction is used. Rates arrive as decimal fractions
/// and are scaled to percent. Settlement is the next top-of-hour after
/// `now`. Listed coins with no prediction are reported as missing.
pub fn parse_hyperliquid(
    meta: &Value,
    predicted: &Value,
    now: DateTime<Utc>,
) -> FeedResult<QuoteBatch> {
    let universe = meta
        .get("universe")
        .and_then(Value::as_array)
        .ok_or_else(|| FeedError::Payload("meta has no universe array".to_string()))?;
    let listed: Vec<&str> = universe
        .iter()
        .filter(|u| !u.get("isDelisted").and_then(Value::as_bool).unwrap_or(false))
        .filter_map(|u| u.get("name").and_then(Value::as_str))
        .collect();
    let listed_set: HashSet<&str> = listed.iter().copied().collect();

    let entries = predicted
        .as_array()
        .ok_or_else(|| FeedError::Payload("predictedFundings is not an array".to_string()))?;

    let settlement = Settlement::At(next_top_of_hour(now));
    let mut seen: HashSet<&str> = HashSet::new();
    let mut outcomes: Vec<QuoteOutcome> = Vec::with_capacity(entries.len());
    for entry in entries {
        let Some(coin) = entry.get(0).and_then(Value::as_str) else {
            continue;
        };
        seen.insert(coin);
        if !listed_set.contains(coin) {
            outcomes.push(Err(SkippedSymbol::new(coin, SkipReason::Inactive)));
            continue;
        }
        outcomes.push(hyperliquid_entry(coin, entry.get(1), settlement));
    }
    outcomes.extend(
        listed
            .iter()
            .filter(|coin| !seen.contains(*coin))
            .map(|coin| Err(SkippedSymbol::new(*coin, SkipReason::MissingRate))),
    );

    let batch = QuoteBatch::collect(Venue::Hyperliquid, now, outcomes);
    record(&batch);
    Ok(batch)
}

fn hyperliquid_entry(coin: &str, venues: Option<&Value>, settlement: Settlement) -> QuoteOutcome {
    let skip = |reason| SkippedSymbol::new(coin, reason);
    let data = venues
        .and_then(Value::as_array)
        .and_then(|vs| {
            vs.iter()
                .find(|v| v.get(0).and_then(Value::as_str) == Some(HL_PERP_VENUE))
        })
        .map(|v| v.get(1).unwrap_or(&NULL))
        .ok_or_else(|| skip(SkipReason::MissingVenueEntry))?;
    let rate = rate_percent(data, "fundingRate").map_err(skip)?;
    Ok(FundingQuote::new(
        Venue::Hyperliquid,
        Symbol::from_base(coin),
        rate,
        settlement,
    ))
}
