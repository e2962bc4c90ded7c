//! Tagged results handed back to callers.

use fundarb_core::{OrderSide, OrderType, Price, Size, Symbol, Venue};
use serde::Serialize;

use crate::client::OrderAck;
use crate::error::{ExecutionError, ExecutionResult};

/// A submitted order and what the executor did to it on the way.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OrderResult {
    pub venue: Venue,
    pub symbol: Symbol,
    pub client_order_id: String,
    pub side: OrderSide,
    /// Order type as submitted; a synthesized market order is a limit.
    pub order_type: OrderType,
    pub quantity: Size,
    pub price: Option<Price>,
    pub reduce_only: bool,
    /// Original quantity when a reduce-only order was upsized.
    pub upsized_from: Option<Size>,
    /// Present when the leverage update failed and the venue's existing
    /// leverage was used.
    pub leverage_warning: Option<String>,
    pub ack: OrderAck,
}

/// Success/error envelope returned by every caller-facing operation.
///
/// Serializes as `{"status": "success", "data": ...}` or
/// `{"status": "error", "kind": ..., "message": ..., "benign": ...}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum OperationResult<T> {
    Success {
        data: T,
    },
    Error {
        kind: String,
        message: String,
        benign: bool,
    },
}

impl<T> OperationResult<T> {
    pub fn success(data: T) -> Self {
        Self::Success { data }
    }

    pub fn error(kind: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Error {
            kind: kind.into(),
            message: message.into(),
            benign: false,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success { .. })
    }

    pub fn data(&self) -> Option<&T> {
        match self {
            Self::Success { data } => Some(data),
            Self::Error { .. } => None,
        }
    }
}

impl<T> From<ExecutionError> for OperationResult<T> {
    fn from(e: ExecutionError) -> Self {
        Self::Error {
            kind: e.kind().to_string(),
            message: e.to_string(),
            benign: e.is_benign(),
        }
    }
}

impl<T> From<ExecutionResult<T>> for OperationResult<T> {
    fn from(r: ExecutionResult<T>) -> Self {
        match r {
            Ok(data) => Self::success(data),
            Err(e) => e.into(),
        }
    }
}
