//! Venue trading client seam.
//!
//! The executor only ever talks to a venue through [`VenueClient`], which
//! keeps signing and session handling outside this crate and lets tests
//! drive it with [`crate::MockVenueClient`].

use fundarb_core::{
    BoxFuture, ClientOrderId, OrderSide, OrderType, Position, Price, Size, Symbol,
    SymbolPrecision, TimeInForce, Venue,
};
use serde::{Deserialize, Serialize};

use crate::error::VenueResult;

/// Fully resolved order handed to a venue.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OrderTicket {
    pub client_order_id: ClientOrderId,
    pub symbol: Symbol,
    /// Venue instrument name (e.g. `BTCUSDT`, `BTC`).
    pub instrument: String,
    pub side: OrderSide,
    pub order_type: OrderType,
    pub quantity: Size,
    /// Set for limit orders, including synthesized market orders.
    pub price: Option<Price>,
    /// `None` for native market orders.
    pub time_in_force: Option<TimeInForce>,
    pub reduce_only: bool,
}

/// Venue acknowledgement of a submitted order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderAck {
    pub order_id: String,
    pub status: String,
    pub filled_quantity: Size,
    pub average_price: Option<Price>,
}

/// Trading operations on one venue account.
pub trait VenueClient: Send + Sync {
    fn venue(&self) -> Venue;

    /// Current mark price. Sampled per call, never cached.
    fn fetch_mark_price<'a>(&'a self, symbol: &'a Symbol) -> BoxFuture<'a, VenueResult<Price>>;

    fn fetch_symbol_precision<'a>(
        &'a self,
        symbol: &'a Symbol,
    ) -> BoxFuture<'a, VenueResult<SymbolPrecision>>;

    /// All positions on the account, including flat ones if the venue
    /// reports them.
    fn fetch_positions(&self) -> BoxFuture<'_, VenueResult<Vec<Position>>>;

    /// Position for one symbol, if any.
    fn fetch_position<'a>(
        &'a self,
        symbol: &'a Symbol,
    ) -> BoxFuture<'a, VenueResult<Option<Position>>> {
        Box::pin(async move {
            Ok(self
                .fetch_positions()
                .await?
                .into_iter()
                .find(|p| &p.symbol == symbol))
        })
    }

    fn set_leverage<'a>(&'a self, symbol: &'a Symbol, leverage: u32) -> BoxFuture<'a, VenueResult<()>>;

    fn submit_order(&self, ticket: OrderTicket) -> BoxFuture<'_, VenueResult<OrderAck>>;
}
