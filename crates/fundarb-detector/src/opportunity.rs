//! Arbitrage opportunity record.

use fundarb_core::{FundingQuote, Symbol, Venue};
use rust_decimal::Decimal;
use serde::Serialize;

use crate::strategy::{Strategy, NO_OPPORTUNITY};

/// One symbol that passed the differential gate in a detection pass.
///
/// `quote_a` carries venue A's rate as reported; `quote_b` carries venue
/// B's rate rounded to four decimals. `difference` is `rate_a - rate_b`
/// rounded to four decimals. Recomputed every pass, never persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ArbitrageOpportunity {
    pub symbol: Symbol,
    pub quote_a: FundingQuote,
    pub quote_b: FundingQuote,
    pub difference: Decimal,
    /// Venue with the larger absolute rate (venue A on ties).
    pub favored_venue: Venue,
    /// Venue whose settlement comes first (venue A on ties).
    pub settles_first: Venue,
    /// `None` when the pair passed the gate but no directional case applies.
    pub strategy: Option<Strategy>,
}

impl ArbitrageOpportunity {
    pub fn has_strategy(&self) -> bool {
        self.strategy.is_some()
    }

    /// Strategy description, or the no-opportunity marker.
    pub fn strategy_text(&self) -> String {
        self.strategy
            .map(|s| s.to_string())
            .unwrap_or_else(|| NO_OPPORTUNITY.to_string())
    }
}
