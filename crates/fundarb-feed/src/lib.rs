//! Funding-rate feeds for the two venues.
//!
//! - `parser`: pure normalization of raw venue payloads into `QuoteBatch`
//! - `settlement`: bounded single-refetch resolution of stale settlements
//! - `client`: HTTP fetchers for Binance and Hyperliquid public endpoints
//! - `snapshot`: concurrent fetch of both venues with a blocking adapter

pub mod batch;
pub mod client;
pub mod config;
pub mod error;
pub mod mock;
pub mod parser;
pub mod settlement;
pub mod snapshot;

pub use batch::{QuoteBatch, QuoteOutcome, RateChange, SkipReason, SkippedSymbol};
pub use client::{BinanceFeed, FundingFeed, HyperliquidFeed};
pub use config::FeedConfig;
pub use error::{FeedError, FeedResult};
pub use mock::StaticFeed;
pub use parser::{next_top_of_hour, parse_binance, parse_hyperliquid};
pub use settlement::{Resolution, SettlementResolver, SettlementSource};
pub use snapshot::{fetch_snapshot, fetch_snapshot_blocking, MarketSnapshot};
