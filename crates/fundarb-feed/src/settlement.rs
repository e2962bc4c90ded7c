//! Settlement resolution with a single bounded refetch.
//!
//! Feeds sometimes report a settlement instant that has already passed
//! because the source has not rolled over yet. Such a quote gets exactly
//! one refetch of the venue's live value; if that is still stale or
//! missing the settlement becomes [`Settlement::Unavailable`].

use chrono::{DateTime, Utc};
use futures_util::stream::{self, StreamExt};
use fundarb_core::{BoxFuture, FundingQuote, Settlement, Symbol, Venue};
use fundarb_telemetry::Metrics;
use tracing::{debug, warn};

use crate::batch::QuoteBatch;
use crate::config::DEFAULT_REFETCH_CONCURRENCY;
use crate::error::FeedResult;

/// Live source of a venue's next settlement for one symbol.
pub trait SettlementSource: Send + Sync {
    fn venue(&self) -> Venue;

    /// Re-read the next settlement for `symbol`. `Ok(None)` means the
    /// venue did not report one.
    fn refetch_settlement<'a>(
        &'a self,
        symbol: &'a Symbol,
    ) -> BoxFuture<'a, FeedResult<Option<DateTime<Utc>>>>;
}

/// How a settlement was resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    /// Reported value was already in the future.
    Fresh,
    /// Reported value was stale; the refetch produced a future instant.
    Refetched,
    /// Stale even after one refetch, or the refetch failed.
    Unavailable,
}

impl Resolution {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Fresh => "fresh",
            Self::Refetched => "refetched",
            Self::Unavailable => "unavailable",
        }
    }
}

/// Resolves stale settlements against a [`SettlementSource`].
pub struct SettlementResolver<'a, S: ?Sized> {
    source: &'a S,
    concurrency: usize,
}

impl<'a, S: SettlementSource + ?Sized> SettlementResolver<'a, S> {
    pub fn new(source: &'a S) -> Self {
        Self {
            source,
            concurrency: DEFAULT_REFETCH_CONCURRENCY,
        }
    }

    /// Cap on refetches in flight during [`Self::resolve_batch`]. Zero is
    /// treated as one.
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    /// Resolve one settlement. Never refetches more than once.
    pub async fn resolve(
        &self,
        symbol: &Symbol,
        settlement: Settlement,
        now: DateTime<Utc>,
    ) -> (Settlement, Resolution) {
        if let Settlement::At(at) = settlement {
            if at >= now {
                return (settlement, Resolution::Fresh);
            }
        }

        let venue = self.source.venue();
        let resolved = match self.source.refetch_settlement(symbol).await {
            Ok(Some(at)) if at >= now => (Settlement::At(at), Resolution::Refetched),
            Ok(stale) => {
                debug!(%venue, %symbol, refetched = ?stale, "Settlement still stale after refetch");
                (Settlement::Unavailable, Resolution::Unavailable)
            }
            Err(e) => {
                warn!(%venue, %symbol, error = %e, "Settlement refetch failed");
                (Settlement::Unavailable, Resolution::Unavailable)
            }
        };
        Metrics::settlement_resolved(venue, resolved.1.as_str());
        resolved
    }

    /// Resolve every quote in a batch, returning a new batch.
    pub async fn resolve_batch(&self, batch: QuoteBatch, now: DateTime<Utc>) -> QuoteBatch {
        let quotes: Vec<FundingQuote> = stream::iter(batch.quotes().to_vec())
            .map(|quote| async move {
                let (next_settlement, _) = self
                    .resolve(&quote.symbol, quote.next_settlement, now)
                    .await;
                FundingQuote {
                    next_settlement,
                    ..quote
                }
            })
            .buffered(self.concurrency)
            .collect()
            .await;
        batch.with_quotes(quotes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::StaticFeed;
    use chrono::{Duration, TimeZone};
    use rust_decimal_macros::dec;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 1, 8, 0, 5).unwrap()
    }

    fn btc() -> Symbol {
        Symbol::from_base("BTC")
    }

    #[tokio::test]
    async fn test_future_settlement_is_not_refetched() {
        let feed = StaticFeed::new(Venue::Binance);
        let at = now() + Duration::hours(8);
        let (s, r) = SettlementResolver::new(&feed)
            .resolve(&btc(), Settlement::At(at), now())
            .await;
        assert_eq!(s, Settlement::At(at));
        assert_eq!(r, Resolution::Fresh);
        assert_eq!(feed.refetch_count(), 0);
    }

    #[tokio::test]
    async fn test_stale_settlement_refetched_once() {
        let feed = StaticFeed::new(Venue::Binance);
        let rolled = now() + Duration::hours(8) - Duration::seconds(5);
        feed.set_refetch(btc(), Some(rolled));

        let stale = now() - Duration::seconds(5);
        let (s, r) = SettlementResolver::new(&feed)
            .resolve(&btc(), Settlement::At(stale), now())
            .await;
        assert_eq!(s, Settlement::At(rolled));
        assert_eq!(r, Resolution::Refetched);
        assert_eq!(feed.refetch_count(), 1);
    }

    #[tokio::test]
    async fn test_still_stale_after_refetch_is_unavailable() {
        let feed = StaticFeed::new(Venue::Binance);
        let stale = now() - Duration::seconds(5);
        feed.set_refetch(btc(), Some(stale));

        let (s, r) = SettlementResolver::new(&feed)
            .resolve(&btc(), Settlement::At(stale), now())
            .await;
        assert_eq!(s, Settlement::Unavailable);
        assert_eq!(r, Resolution::Unavailable);
        assert_eq!(feed.refetch_count(), 1);
    }

    #[tokio::test]
    async fn test_refetch_error_is_unavailable() {
        let feed = StaticFeed::new(Venue::Binance);
        // no scripted refetch: the mock reports a transport error
        let (s, _) = SettlementResolver::new(&feed)
            .resolve(&btc(), Settlement::At(now() - Duration::hours(1)), now())
            .await;
        assert_eq!(s, Settlement::Unavailable);
    }

    #[tokio::test]
    async fn test_resolve_batch_preserves_order_and_skips() {
        let fresh = now() + Duration::hours(2);
        let stale = now() - Duration::minutes(1);
        let feed = StaticFeed::new(Venue::Binance)
            .with_quote("ETH", dec!(0.01), Settlement::At(stale))
            .with_quote("BTC", dec!(0.02), Settlement::At(fresh))
            .with_skip("XRP", crate::batch::SkipReason::MissingRate);
        feed.set_refetch(Symbol::from_base("ETH"), None);

        let batch = feed.batch(now());
        let resolved = SettlementResolver::new(&feed).resolve_batch(batch, now()).await;

        assert_eq!(resolved.quotes()[0].symbol.as_str(), "ETH");
        assert_eq!(resolved.quotes()[0].next_settlement, Settlement::Unavailable);
        assert_eq!(resolved.quotes()[1].next_settlement, Settlement::At(fresh));
        assert_eq!(resolved.skipped().len(), 1);
    }

    fn stale_feed(count: usize) -> StaticFeed {
        let stale = Settlement::At(now() - Duration::minutes(1));
        let rolled = now() + Duration::hours(8);
        let mut feed = StaticFeed::new(Venue::Binance);
        for i in 0..count {
            feed = feed.with_quote(&format!("C{i}"), dec!(0.01), stale);
        }
        for i in 0..count {
            feed.set_refetch(Symbol::from_base(&format!("C{i}")), Some(rolled));
        }
        feed
    }

    #[tokio::test]
    async fn test_resolve_batch_bounds_refetches_in_flight() {
        let feed = stale_feed(5);
        let resolved = SettlementResolver::new(&feed)
            .with_concurrency(2)
            .resolve_batch(feed.batch(now()), now())
            .await;

        assert_eq!(feed.refetch_count(), 5);
        assert_eq!(feed.peak_refetches_in_flight(), 2);
        let symbols: Vec<_> = resolved.quotes().iter().map(|q| q.symbol.as_str()).collect();
        assert_eq!(symbols, vec!["C0", "C1", "C2", "C3", "C4"]);
        assert!(resolved
            .quotes()
            .iter()
            .all(|q| q.next_settlement == Settlement::At(now() + Duration::hours(8))));
    }

    #[tokio::test]
    async fn test_default_concurrency_runs_small_batch_at_once() {
        let feed = stale_feed(5);
        SettlementResolver::new(&feed)
            .resolve_batch(feed.batch(now()), now())
            .await;
        assert_eq!(feed.peak_refetches_in_flight(), 5);
    }
}
