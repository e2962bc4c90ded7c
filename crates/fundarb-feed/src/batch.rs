//! Immutable per-poll quote snapshot.
//!
//! A `QuoteBatch` is produced once per polling cycle and never mutated;
//! the next poll supersedes it. Callers that want change detection diff
//! two batches with [`QuoteBatch::changed_since`].

use chrono::{DateTime, Utc};
use fundarb_core::{FundingQuote, Symbol, Venue};
use rust_decimal::Decimal;
use serde::Serialize;
use std::collections::HashMap;
use std::fmt;

/// Why a symbol was dropped from a batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    /// Contract not trading or delisted.
    Inactive,
    /// Instrument not quoted in the expected stable asset.
    UnsupportedQuote,
    MissingRate,
    InvalidRate,
    MissingSettlement,
    InvalidSettlement,
    /// Venue prediction list has no entry for this venue.
    MissingVenueEntry,
    Duplicate,
}

impl SkipReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Inactive => "inactive",
            Self::UnsupportedQuote => "unsupported_quote",
            Self::MissingRate => "missing_rate",
            Self::InvalidRate => "invalid_rate",
            Self::MissingSettlement => "missing_settlement",
            Self::InvalidSettlement => "invalid_settlement",
            Self::MissingVenueEntry => "missing_venue_entry",
            Self::Duplicate => "duplicate",
        }
    }
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A symbol dropped from a batch, with the raw venue name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SkippedSymbol {
    pub symbol: String,
    pub reason: SkipReason,
}

impl SkippedSymbol {
    pub fn new(symbol: impl Into<String>, reason: SkipReason) -> Self {
        Self {
            symbol: symbol.into(),
            reason,
        }
    }
}

/// Per-symbol normalization result.
pub type QuoteOutcome = Result<FundingQuote, SkippedSymbol>;

/// A symbol whose rate moved between two batches.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RateChange {
    pub symbol: Symbol,
    /// `None` when the symbol is new in the current batch.
    pub previous: Option<Decimal>,
    pub current: Decimal,
}

/// Quotes from one venue for one polling cycle, in feed order.
#[derive(Debug, Clone, Serialize)]
pub struct QuoteBatch {
    venue: Venue,
    fetched_at: DateTime<Utc>,
    quotes: Vec<FundingQuote>,
    skipped: Vec<SkippedSymbol>,
    #[serde(skip)]
    index: HashMap<Symbol, usize>,
}

impl QuoteBatch {
    /// Collect per-symbol outcomes. Later duplicates of a symbol are
    /// skipped; the first occurrence wins.
    pub fn collect(
        venue: Venue,
        fetched_at: DateTime<Utc>,
        outcomes: impl IntoIterator<Item = QuoteOutcome>,
    ) -> Self {
        let mut batch = Self {
            venue,
            fetched_at,
            quotes: Vec::new(),
            skipped: Vec::new(),
            index: HashMap::new(),
        };
        for outcome in outcomes {
            match outcome {
                Ok(quote) => batch.insert(quote),
                Err(skip) => batch.skipped.push(skip),
            }
        }
        batch
    }

    fn insert(&mut self, quote: FundingQuote) {
        if self.index.contains_key(&quote.symbol) {
            self.skipped
                .push(SkippedSymbol::new(quote.symbol.as_str(), SkipReason::Duplicate));
            return;
        }
        self.index.insert(quote.symbol.clone(), self.quotes.len());
        self.quotes.push(quote);
    }

    /// Same batch with quotes replaced one-for-one, e.g. after settlement
    /// resolution. Skips are carried over.
    pub(crate) fn with_quotes(self, quotes: Vec<FundingQuote>) -> Self {
        let skipped = self.skipped;
        let mut batch = Self::collect(self.venue, self.fetched_at, quotes.into_iter().map(Ok));
        batch.skipped.splice(0..0, skipped);
        batch
    }

    pub fn venue(&self) -> Venue {
        self.venue
    }

    pub fn fetched_at(&self) -> DateTime<Utc> {
        self.fetched_at
    }

    pub fn get(&self, symbol: &Symbol) -> Option<&FundingQuote> {
        self.index.get(symbol).map(|&i| &self.quotes[i])
    }

    pub fn quotes(&self) -> &[FundingQuote] {
        &self.quotes
    }

    pub fn skipped(&self) -> &[SkippedSymbol] {
        &self.skipped
    }

    pub fn len(&self) -> usize {
        self.quotes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.quotes.is_empty()
    }

    /// Quotes ordered by absolute rate, largest first.
    pub fn top_by_abs_rate(&self, limit: usize) -> Vec<&FundingQuote> {
        let mut ranked: Vec<&FundingQuote> = self.quotes.iter().collect();
        ranked.sort_by(|a, b| b.rate_percent.abs().cmp(&a.rate_percent.abs()));
        ranked.truncate(limit);
        ranked
    }

    /// Symbols that are new, or whose rate moved by more than `threshold`
    /// percentage points, relative to `previous`.
    pub fn changed_since(&self, previous: &QuoteBatch, threshold: Decimal) -> Vec<RateChange> {
        self.quotes
            .iter()
            .filter_map(|q| match previous.get(&q.symbol) {
                None => Some(RateChange {
                    symbol: q.symbol.clone(),
                    previous: None,
                    current: q.rate_percent,
                }),
                Some(prev) if (q.rate_percent - prev.rate_percent).abs() > threshold => {
                    Some(RateChange {
                        symbol: q.symbol.clone(),
                        previous: Some(prev.rate_percent),
                        current: q.rate_percent,
                    })
                }
                Some(_) => None,
            })
            .collect()
    }
}
