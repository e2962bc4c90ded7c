//! Scatter/gather fetch of both venues.
//!
//! The two feeds are fetched concurrently with no shared state, then each
//! batch goes through settlement resolution. The snapshot is complete
//! before any detection runs.

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::info;

use crate::batch::QuoteBatch;
use crate::client::FundingFeed;
use crate::config::FeedConfig;
use crate::error::{FeedError, FeedResult};
use crate::settlement::SettlementResolver;

/// Resolved quotes from both venues for one polling cycle.
#[derive(Debug, Clone, Serialize)]
pub struct MarketSnapshot {
    pub venue_a: QuoteBatch,
    pub venue_b: QuoteBatch,
    pub taken_at: DateTime<Utc>,
}

/// Fetch and resolve both feeds concurrently.
pub async fn fetch_snapshot<A, B>(
    feed_a: &A,
    feed_b: &B,
    now: DateTime<Utc>,
    config: &FeedConfig,
) -> FeedResult<MarketSnapshot>
where
    A: FundingFeed + ?Sized,
    B: FundingFeed + ?Sized,
{
    let (raw_a, raw_b) = tokio::try_join!(feed_a.fetch_quotes(now), feed_b.fetch_quotes(now))?;
    let resolver_a = SettlementResolver::new(feed_a).with_concurrency(config.refetch_concurrency);
    let resolver_b = SettlementResolver::new(feed_b).with_concurrency(config.refetch_concurrency);
    let (venue_a, venue_b) = tokio::join!(
        resolver_a.resolve_batch(raw_a, now),
        resolver_b.resolve_batch(raw_b, now),
    );
    info!(
        venue_a = %venue_a.venue(),
        quotes_a = venue_a.len(),
        venue_b = %venue_b.venue(),
        quotes_b = venue_b.len(),
        "Snapshot fetched"
    );
    Ok(MarketSnapshot {
        venue_a,
        venue_b,
        taken_at: now,
    })
}

/// Blocking adapter over [`fetch_snapshot`] for synchronous callers.
///
/// Must not be called from inside an async runtime.
pub fn fetch_snapshot_blocking<A, B>(
    feed_a: &A,
    feed_b: &B,
    now: DateTime<Utc>,
    config: &FeedConfig,
) -> FeedResult<MarketSnapshot>
where
    A: FundingFeed + ?Sized,
    B: FundingFeed + ?Sized,
{
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(|e| FeedError::Runtime(e.to_string()))?;
    runtime.block_on(fetch_snapshot(feed_a, feed_b, now, config))
}
