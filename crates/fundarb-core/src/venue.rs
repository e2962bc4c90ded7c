//! Venue and symbol identity.
//!
//! A `Symbol` is always the venue-agnostic base asset (`BTC`, `ETH`).
//! Venue-specific instrument names are derived from it on demand.

use chrono::Duration;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::{CoreError, Result};

/// Quote-asset suffixes stripped from venue instrument names.
const QUOTE_SUFFIXES: [&str; 2] = ["USDT", "USDC"];

/// The two perpetual-futures venues.
///
/// `Binance` is venue A (8-hour funding, decimal rates, millisecond
/// settlement timestamps). `Hyperliquid` is venue B (hourly predicted
/// funding, settlement derived from the clock).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Venue {
    Binance,
    Hyperliquid,
}

impl Venue {
    pub const ALL: [Venue; 2] = [Venue::Binance, Venue::Hyperliquid];

    /// Nominal interval between funding settlements.
    pub fn funding_interval(&self) -> Duration {
        match self {
            Self::Binance => Duration::hours(8),
            Self::Hyperliquid => Duration::hours(1),
        }
    }

    /// Whether the venue accepts true market orders.
    pub fn supports_market_orders(&self) -> bool {
        matches!(self, Self::Binance)
    }

    /// Venue instrument name for a base asset.
    pub fn instrument(&self, symbol: &Symbol) -> String {
        match self {
            Self::Binance => format!("{}USDT", symbol.as_str()),
            Self::Hyperliquid => symbol.as_str().to_string(),
        }
    }
}

impl fmt::Display for Venue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Binance => write!(f, "binance"),
            Self::Hyperliquid => write!(f, "hyperliquid"),
        }
    }
}

impl FromStr for Venue {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "binance" | "a" => Ok(Self::Binance),
            "hyperliquid" | "hl" | "b" => Ok(Self::Hyperliquid),
            _ => Err(CoreError::UnknownVenue(s.to_string())),
        }
    }
}

/// Venue-agnostic base asset.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Symbol(String);

impl Symbol {
    /// Wrap a base asset name exactly as the venue reports it.
    pub fn from_base(base: impl Into<String>) -> Self {
        Self(base.into())
    }

    /// Normalize caller input into a base asset.
    ///
    /// `BTCUSDT`, `BTC/USDC:USDC` and `btc` all become `BTC`.
    pub fn parse(raw: &str) -> Result<Self> {
        let upper = raw.trim().to_ascii_uppercase();
        let head = upper
            .split(['/', ':'])
            .next()
            .unwrap_or_default()
            .to_string();
        if head.is_empty() {
            return Err(CoreError::InvalidSymbol(raw.to_string()));
        }
        Ok(Self(strip_quote_suffix(&head).to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

fn strip_quote_suffix(s: &str) -> &str {
    for suffix in QUOTE_SUFFIXES {
        if let Some(base) = s.strip_suffix(suffix) {
            if !base.is_empty() {
                return base;
            }
        }
    }
    s
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for Symbol {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}
