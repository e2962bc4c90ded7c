//! Funding-rate arbitrage across Binance and Hyperliquid perpetuals.
//!
//! Wires the feeds, detector and per-venue executors behind one
//! [`Application`] facade. Every caller-facing operation returns an
//! [`OperationResult`](fundarb_executor::OperationResult).

pub mod app;
pub mod config;
pub mod error;

pub use app::{Application, MarketOverview, WatchReport};
pub use config::{AppConfig, OperatingMode};
pub use error::{AppError, AppResult};
