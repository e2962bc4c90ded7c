//! Execution error types.

use rust_decimal::Decimal;
use serde::Serialize;
use std::fmt;
use thiserror::Error;

/// Errors reported by a venue client.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum VenueError {
    /// Network or transport failure; the request may be retried.
    #[error("Transport error: {0}")]
    Transport(String),

    /// Request reached the venue and was refused.
    #[error("Rejected by venue: {0}")]
    Rejected(String),

    #[error("Unknown symbol: {0}")]
    NotFound(String),
}

pub type VenueResult<T> = Result<T, VenueError>;

/// Business-rule category of a venue rejection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RejectionCategory {
    InsufficientBalance,
    PriceTooLow,
    PriceTooHigh,
    LotSize,
    MaxPositionExceeded,
    Other,
}

impl RejectionCategory {
    /// Categorize a venue error message.
    pub fn from_message(message: &str) -> Self {
        let lower = message.to_ascii_lowercase();
        if lower.contains("insufficient") && (lower.contains("balance") || lower.contains("margin")) {
            Self::InsufficientBalance
        } else if lower.contains("price less than") {
            Self::PriceTooLow
        } else if lower.contains("price more than") || lower.contains("price greater than") {
            Self::PriceTooHigh
        } else if lower.contains("lot size") || lower.contains("lot_size") {
            Self::LotSize
        } else if lower.contains("maximum allowable position") {
            Self::MaxPositionExceeded
        } else {
            Self::Other
        }
    }

    pub fn describe(&self) -> &'static str {
        match self {
            Self::InsufficientBalance => "insufficient balance",
            Self::PriceTooLow => "price too low",
            Self::PriceTooHigh => "price too high",
            Self::LotSize => "quantity does not match lot size",
            Self::MaxPositionExceeded => "maximum position exceeded at current leverage",
            Self::Other => "order rejected",
        }
    }
}

impl fmt::Display for RejectionCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.describe())
    }
}

/// Execution failures surfaced to callers.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ExecutionError {
    #[error("Invalid order: {0}")]
    Validation(String),

    #[error("Quantity {quantity} outside allowed range [{min}, {max}]")]
    OutOfRange {
        quantity: Decimal,
        min: Decimal,
        max: Decimal,
    },

    #[error("Order value {notional} below minimum {minimum}")]
    BelowMinimumNotional { notional: Decimal, minimum: Decimal },

    #[error("Precision error: {0}")]
    Precision(String),

    #[error("No open position for {0}")]
    NoPosition(String),

    #[error("Network error: {0}")]
    TransientNetwork(String),

    #[error("Venue rejected order ({category}): {message}")]
    VenueRejection {
        category: RejectionCategory,
        message: String,
    },
}

impl ExecutionError {
    /// Stable machine-readable kind.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Validation(_) => "validation",
            Self::OutOfRange { .. } => "out_of_range",
            Self::BelowMinimumNotional { .. } => "below_minimum_notional",
            Self::Precision(_) => "precision",
            Self::NoPosition(_) => "no_position",
            Self::TransientNetwork(_) => "transient_network",
            Self::VenueRejection { .. } => "venue_rejection",
        }
    }

    /// Outcomes callers should treat as "nothing to do" rather than a fault.
    pub fn is_benign(&self) -> bool {
        matches!(self, Self::NoPosition(_))
    }
}

impl From<VenueError> for ExecutionError {
    fn from(e: VenueError) -> Self {
        match e {
            VenueError::Transport(msg) => Self::TransientNetwork(msg),
            VenueError::Rejected(message) => Self::VenueRejection {
                category: RejectionCategory::from_message(&message),
                message,
            },
            VenueError::NotFound(symbol) => Self::Validation(format!("unknown symbol {symbol}")),
        }
    }
}

pub type ExecutionResult<T> = Result<T, ExecutionError>;
