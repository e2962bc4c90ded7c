//! Merged per-symbol view of both venues, without gating.

use fundarb_core::{round_rate, Settlement, Symbol};
use fundarb_feed::QuoteBatch;
use rust_decimal::Decimal;
use serde::Serialize;
use std::collections::HashSet;

/// Number of quoted contracts per venue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ContractCounts {
    pub venue_a: usize,
    pub venue_b: usize,
}

pub fn contract_counts(quotes_a: &QuoteBatch, quotes_b: &QuoteBatch) -> ContractCounts {
    ContractCounts {
        venue_a: quotes_a.len(),
        venue_b: quotes_b.len(),
    }
}

/// One symbol listed on either venue.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MarketRow {
    pub symbol: Symbol,
    pub rate_a: Option<Decimal>,
    pub rate_b: Option<Decimal>,
    pub settlement_a: Option<Settlement>,
    pub settlement_b: Option<Settlement>,
    /// `rate_a - rate_b` rounded to four decimals, when both are quoted.
    pub difference: Option<Decimal>,
}

/// Every symbol quoted on either venue: venue A's symbols in feed order,
/// then the ones only venue B quotes.
pub fn market_overview(quotes_a: &QuoteBatch, quotes_b: &QuoteBatch) -> Vec<MarketRow> {
    let mut rows: Vec<MarketRow> = quotes_a
        .quotes()
        .iter()
        .map(|qa| {
            let qb = quotes_b.get(&qa.symbol);
            MarketRow {
                symbol: qa.symbol.clone(),
                rate_a: Some(qa.rate_percent),
                rate_b: qb.map(|q| q.rate_percent),
                settlement_a: Some(qa.next_settlement),
                settlement_b: qb.map(|q| q.next_settlement),
                difference: qb.map(|q| round_rate(qa.rate_percent - q.rate_percent)),
            }
        })
        .collect();

    let seen: HashSet<&Symbol> = quotes_a.quotes().iter().map(|q| &q.symbol).collect();
    rows.extend(
        quotes_b
            .quotes()
            .iter()
            .filter(|qb| !seen.contains(&qb.symbol))
            .map(|qb| MarketRow {
                symbol: qb.symbol.clone(),
                rate_a: None,
                rate_b: Some(qb.rate_percent),
                settlement_a: None,
                settlement_b: Some(qb.next_settlement),
                difference: None,
            }),
    );
    rows
}
