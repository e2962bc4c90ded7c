//! Cross-venue funding-rate arbitrage detection.
//!
//! Pairs quotes from two venues by base symbol, gates them on the rate
//! differential and assigns a directional long/short strategy when the
//! settlement race favors one.

pub mod config;
pub mod detector;
pub mod error;
pub mod opportunity;
pub mod overview;
pub mod strategy;

pub use config::DetectorConfig;
pub use detector::{detect, ArbitrageDetector};
pub use error::{DetectorError, DetectorResult};
pub use opportunity::ArbitrageOpportunity;
pub use overview::{contract_counts, market_overview, ContractCounts, MarketRow};
pub use strategy::{classify, Leg, Strategy, VenueRate, NO_OPPORTUNITY};
