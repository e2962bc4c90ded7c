//! Venue position as read from the account.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::decimal::{Price, Size};
use crate::order::OrderSide;
use crate::venue::{Symbol, Venue};

/// Direction of an open position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PositionSide {
    Long,
    Short,
}

impl PositionSide {
    /// Side of a signed venue quantity; `None` for flat.
    pub fn from_signed(qty: Decimal) -> Option<Self> {
        if qty > Decimal::ZERO {
            Some(Self::Long)
        } else if qty < Decimal::ZERO {
            Some(Self::Short)
        } else {
            None
        }
    }

    /// Order side that reduces this position.
    pub fn closing_side(&self) -> OrderSide {
        match self {
            Self::Long => OrderSide::Sell,
            Self::Short => OrderSide::Buy,
        }
    }
}

impl fmt::Display for PositionSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Long => write!(f, "long"),
            Self::Short => write!(f, "short"),
        }
    }
}

/// Open position snapshot. Owned by the venue; never cached beyond one
/// operation.
///
/// `quantity` is the absolute base-asset size; direction lives in `side`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Position {
    pub symbol: Symbol,
    pub venue: Venue,
    pub side: PositionSide,
    pub quantity: Size,
    pub entry_price: Price,
    pub mark_price: Price,
    pub leverage: u32,
    pub unrealized_pnl: Decimal,
    pub notional: Decimal,
}

impl Position {
    pub fn is_open(&self) -> bool {
        self.quantity.is_positive()
    }
}
