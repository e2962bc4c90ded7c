//! In-memory feed for tests and offline runs.

use chrono::{DateTime, Utc};
use fundarb_core::{BoxFuture, FundingQuote, Settlement, Symbol, Venue};
use parking_lot::Mutex;
use rust_decimal::Decimal;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::batch::{QuoteBatch, QuoteOutcome, SkipReason, SkippedSymbol};
use crate::client::FundingFeed;
use crate::error::{FeedError, FeedResult};
use crate::settlement::SettlementSource;

/// Feed that serves a fixed set of quotes.
///
/// Settlement refetches return whatever was scripted with
/// [`StaticFeed::set_refetch`]; unscripted symbols fail with a transport
/// error.
pub struct StaticFeed {
    venue: Venue,
    outcomes: Vec<QuoteOutcome>,
    fetch_error: Option<String>,
    refetch: Mutex<HashMap<Symbol, Option<DateTime<Utc>>>>,
    refetch_calls: Mutex<Vec<Symbol>>,
    in_flight: AtomicUsize,
    peak_in_flight: AtomicUsize,
}

impl StaticFeed {
    pub fn new(venue: Venue) -> Self {
        Self {
            venue,
            outcomes: Vec::new(),
            fetch_error: None,
            refetch: Mutex::new(HashMap::new()),
            refetch_calls: Mutex::new(Vec::new()),
            in_flight: AtomicUsize::new(0),
            peak_in_flight: AtomicUsize::new(0),
        }
    }

    pub fn with_quote(mut self, symbol: &str, rate_percent: Decimal, settlement: Settlement) -> Self {
        self.outcomes.push(Ok(FundingQuote::new(
            self.venue,
            Symbol::from_base(symbol),
            rate_percent,
            settlement,
        )));
        self
    }

    pub fn with_skip(mut self, symbol: &str, reason: SkipReason) -> Self {
        self.outcomes.push(Err(SkippedSymbol::new(symbol, reason)));
        self
    }

    /// Make every `fetch_quotes` call fail.
    pub fn failing(mut self, message: &str) -> Self {
        self.fetch_error = Some(message.to_string());
        self
    }

    pub fn set_refetch(&self, symbol: Symbol, at: Option<DateTime<Utc>>) {
        self.refetch.lock().insert(symbol, at);
    }

    pub fn refetch_count(&self) -> usize {
        self.refetch_calls.lock().len()
    }

    /// Most refetches that were ever pending at the same time.
    pub fn peak_refetches_in_flight(&self) -> usize {
        self.peak_in_flight.load(Ordering::SeqCst)
    }

    /// Build the batch this feed would serve at `now`.
    pub fn batch(&self, now: DateTime<Utc>) -> QuoteBatch {
        QuoteBatch::collect(self.venue, now, self.outcomes.clone())
    }
}

impl SettlementSource for StaticFeed {
    fn venue(&self) -> Venue {
        self.venue
    }

    fn refetch_settlement<'a>(
        &'a self,
        symbol: &'a Symbol,
    ) -> BoxFuture<'a, FeedResult<Option<DateTime<Utc>>>> {
        Box::pin(async move {
            self.refetch_calls.lock().push(symbol.clone());
            let pending = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak_in_flight.fetch_max(pending, Ordering::SeqCst);
            tokio::task::yield_now().await;
            self.in_flight.fetch_sub(1, Ordering::SeqCst);

            self.refetch
                .lock()
                .get(symbol)
                .copied()
                .ok_or_else(|| FeedError::HttpClient(format!("no live settlement for {symbol}")))
        })
    }
}

impl FundingFeed for StaticFeed {
    fn fetch_quotes(&self, now: DateTime<Utc>) -> BoxFuture<'_, FeedResult<QuoteBatch>> {
        Box::pin(async move {
            match &self.fetch_error {
                Some(message) => Err(FeedError::HttpClient(message.clone())),
                None => Ok(self.batch(now)),
            }
        })
    }
}
