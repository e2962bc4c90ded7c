//! Prometheus metrics and structured logging for the arbitrage engine.
//!
//! - Prometheus counters for feed normalization, settlement resolution,
//!   detection and order execution
//! - Structured logging with tracing (JSON in production)

pub mod error;
pub mod logging;
pub mod metrics;

pub use error::{TelemetryError, TelemetryResult};
pub use logging::init_logging;
pub use metrics::Metrics;
