//! Guard-railed order execution for the two perpetual venues.
//!
//! - `quantity`: USD notional to venue-legal quantity
//! - `executor`: open/close orders with leverage, slippage and
//!   minimum-notional guards
//! - `reconcile`: close every open position, isolating failures
//! - `client`: the `VenueClient` seam the executor drives
//!
//! Execution calls are not idempotent and not internally locked: callers
//! must serialize operations per (venue, symbol).

pub mod cache;
pub mod client;
pub mod config;
pub mod error;
pub mod executor;
pub mod mock;
pub mod order;
pub mod quantity;
pub mod reconcile;
pub mod result;

pub use cache::PrecisionCache;
pub use client::{OrderAck, OrderTicket, VenueClient};
pub use config::ExecutorConfig;
pub use error::{ExecutionError, ExecutionResult, RejectionCategory, VenueError, VenueResult};
pub use executor::OrderExecutor;
pub use mock::MockVenueClient;
pub use order::{OrderAmount, OrderRequest, RawOrderRequest};
pub use quantity::{normalize_quantity, to_quantity};
pub use reconcile::{BulkCloseReport, CloseOutcome};
pub use result::{OperationResult, OrderResult};
