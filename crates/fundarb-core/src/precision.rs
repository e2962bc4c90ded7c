//! Venue quantity rules for a symbol.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Quantity and price rules read from venue metadata.
///
/// Immutable once fetched; cached per symbol for the process lifetime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SymbolPrecision {
    pub step_size: Decimal,
    pub quantity_precision: u32,
    pub min_qty: Decimal,
    pub max_qty: Decimal,
    /// Decimal digits accepted on limit prices.
    pub price_precision: u32,
}

impl SymbolPrecision {
    /// Rules for a venue that only publishes size decimals (step = 10^-dp).
    pub fn from_size_decimals(sz_decimals: u32, price_precision: u32) -> Self {
        let step_size = Decimal::new(1, sz_decimals);
        Self {
            step_size,
            quantity_precision: sz_decimals,
            min_qty: step_size,
            max_qty: Decimal::MAX,
            price_precision,
        }
    }
}
