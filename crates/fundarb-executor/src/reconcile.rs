//! Bulk position close.

use fundarb_core::{Position, Symbol, Venue};
use fundarb_telemetry::Metrics;
use serde::Serialize;
use tracing::{info, warn};

use crate::client::VenueClient;
use crate::error::ExecutionResult;
use crate::executor::OrderExecutor;
use crate::result::{OperationResult, OrderResult};

/// Outcome of closing one position.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CloseOutcome {
    pub symbol: Symbol,
    #[serde(flatten)]
    pub outcome: OperationResult<OrderResult>,
}

impl CloseOutcome {
    pub fn is_success(&self) -> bool {
        self.outcome.is_success()
    }
}

/// Per-position results of a bulk close, in the order positions were read.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BulkCloseReport {
    pub venue: Venue,
    pub outcomes: Vec<CloseOutcome>,
}

impl BulkCloseReport {
    pub fn succeeded(&self) -> usize {
        self.outcomes.iter().filter(|o| o.is_success()).count()
    }

    pub fn failed(&self) -> usize {
        self.outcomes.len() - self.succeeded()
    }
}

impl<C: VenueClient + ?Sized> OrderExecutor<C> {
    /// Close every open position on the venue.
    ///
    /// Fails only if the position list itself cannot be read.
    pub async fn close_all_positions(&self) -> ExecutionResult<BulkCloseReport> {
        let positions = self.open_positions().await?;
        Ok(self.close_all(&positions).await)
    }

    /// Close `positions` one after another. A failure on one symbol is
    /// recorded and the loop moves on.
    pub async fn close_all(&self, positions: &[Position]) -> BulkCloseReport {
        let venue = self.venue();
        let mut outcomes = Vec::with_capacity(positions.len());

        for position in positions.iter().filter(|p| p.is_open()) {
            let symbol = position.symbol.clone();
            let result = self.close_position(&symbol).await;
            match &result {
                Ok(order) => {
                    info!(%venue, %symbol, order_id = %order.ack.order_id, "Position closed");
                    Metrics::bulk_close(venue, "success");
                }
                Err(e) => {
                    warn!(%venue, %symbol, error = %e, "Failed to close position, continuing");
                    Metrics::bulk_close(venue, "error");
                }
            }
            outcomes.push(CloseOutcome {
                symbol,
                outcome: result.into(),
            });
        }

        let report = BulkCloseReport { venue, outcomes };
        info!(
            %venue,
            succeeded = report.succeeded(),
            failed = report.failed(),
            "Bulk close finished"
        );
        report
    }
}
