//! Core domain types for the funding-rate arbitrage engine.
//!
//! This crate provides the vocabulary shared by every other crate:
//! - `Venue`, `Symbol`: which exchange, which base asset
//! - `Price`, `Size`: precision-safe numeric types
//! - `FundingQuote`, `Settlement`: canonical funding snapshot per symbol
//! - `SymbolPrecision`: venue quantity rules
//! - `Position`, `OrderSide`, `OrderType`: trading state and enums

pub mod decimal;
pub mod error;
pub mod future;
pub mod order;
pub mod position;
pub mod precision;
pub mod quote;
pub mod venue;

pub use decimal::{round_rate, Price, Size, RATE_DECIMALS};
pub use error::{CoreError, Result};
pub use future::BoxFuture;
pub use order::{ClientOrderId, OrderSide, OrderType, TimeInForce};
pub use position::{Position, PositionSide};
pub use precision::SymbolPrecision;
pub use quote::{format_duration, FundingQuote, Settlement};
pub use venue::{Symbol, Venue};
