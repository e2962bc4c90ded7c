//! Canonical funding snapshot types.

use chrono::{DateTime, Duration, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::venue::{Symbol, Venue};

/// Next funding settlement for a quote.
///
/// `Unavailable` marks a settlement that could not be resolved to a
/// future instant; the detector never pairs such quotes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "state", content = "at", rename_all = "snake_case")]
pub enum Settlement {
    At(DateTime<Utc>),
    Unavailable,
}

impl Settlement {
    pub fn instant(&self) -> Option<DateTime<Utc>> {
        match self {
            Self::At(at) => Some(*at),
            Self::Unavailable => None,
        }
    }

    pub fn is_available(&self) -> bool {
        matches!(self, Self::At(_))
    }
}

/// One venue's funding rate for one base asset.
///
/// `rate_percent` is always percentage-scaled, whatever the venue's
/// wire convention.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FundingQuote {
    pub venue: Venue,
    pub symbol: Symbol,
    pub rate_percent: Decimal,
    pub next_settlement: Settlement,
}

impl FundingQuote {
    pub fn new(venue: Venue, symbol: Symbol, rate_percent: Decimal, next_settlement: Settlement) -> Self {
        Self {
            venue,
            symbol,
            rate_percent,
            next_settlement,
        }
    }

    /// Time left until settlement, or `None` if already settled or unknown.
    pub fn time_to_settlement(&self, now: DateTime<Utc>) -> Option<Duration> {
        let at = self.next_settlement.instant()?;
        let left = at - now;
        (left > Duration::zero()).then_some(left)
    }
}

/// `HH:MM:SS` rendering of a countdown; hours are not wrapped at 24.
pub fn format_duration(d: Duration) -> String {
    let secs = d.num_seconds().max(0);
    format!("{:02}:{:02}:{:02}", secs / 3600, (secs % 3600) / 60, secs % 60)
}
