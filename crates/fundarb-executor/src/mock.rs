//! In-memory venue for tests and dry runs.

use fundarb_core::{
    BoxFuture, OrderSide, Position, PositionSide, Price, Size, Symbol, SymbolPrecision, Venue,
};
use parking_lot::Mutex;
use rust_decimal::Decimal;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::client::{OrderAck, OrderTicket, VenueClient};
use crate::error::{VenueError, VenueResult};

/// Venue simulator that fills every accepted order in full.
///
/// Reduce-only fills shrink (and at zero remove) the matching position;
/// other fills open or extend one. Failures can be scripted per symbol.
#[derive(Debug)]
pub struct MockVenueClient {
    venue: Venue,
    prices: Mutex<HashMap<Symbol, Price>>,
    precisions: Mutex<HashMap<Symbol, SymbolPrecision>>,
    positions: Mutex<Vec<Position>>,
    /// Remaining transient failures per symbol for mark price lookups.
    price_failures: Mutex<HashMap<Symbol, u32>>,
    order_failures: Mutex<HashMap<Symbol, VenueError>>,
    leverage_failure: Mutex<Option<VenueError>>,
    leverage_calls: Mutex<Vec<(Symbol, u32)>>,
    tickets: Mutex<Vec<OrderTicket>>,
    price_calls: AtomicUsize,
    precision_calls: AtomicUsize,
}

impl MockVenueClient {
    pub fn new(venue: Venue) -> Self {
        Self {
            venue,
            prices: Mutex::new(HashMap::new()),
            precisions: Mutex::new(HashMap::new()),
            positions: Mutex::new(Vec::new()),
            price_failures: Mutex::new(HashMap::new()),
            order_failures: Mutex::new(HashMap::new()),
            leverage_failure: Mutex::new(None),
            leverage_calls: Mutex::new(Vec::new()),
            tickets: Mutex::new(Vec::new()),
            price_calls: AtomicUsize::new(0),
            precision_calls: AtomicUsize::new(0),
        }
    }

    /// List a market with a mark price and precision rules.
    pub fn with_market(self, symbol: &str, mark: Decimal, precision: SymbolPrecision) -> Self {
        let symbol = Symbol::from_base(symbol);
        self.prices.lock().insert(symbol.clone(), Price::new(mark));
        self.precisions.lock().insert(symbol, precision);
        self
    }

    /// Seed an open position at the market's mark price.
    pub fn with_position(self, symbol: &str, side: PositionSide, quantity: Decimal) -> Self {
        let symbol = Symbol::from_base(symbol);
        let mark = self
            .prices
            .lock()
            .get(&symbol)
            .copied()
            .unwrap_or(Price::ZERO);
        let position = Position {
            symbol,
            venue: self.venue,
            side,
            quantity: Size::new(quantity),
            entry_price: mark,
            mark_price: mark,
            leverage: 1,
            unrealized_pnl: Decimal::ZERO,
            notional: quantity * mark.inner(),
        };
        self.positions.lock().push(position);
        self
    }

    /// Fail the next `count` mark price lookups for `symbol` with a
    /// transport error.
    pub fn fail_price_lookups(&self, symbol: &str, count: u32) {
        self.price_failures
            .lock()
            .insert(Symbol::from_base(symbol), count);
    }

    /// Fail every order for `symbol` with `error`.
    pub fn fail_orders(&self, symbol: &str, error: VenueError) {
        self.order_failures
            .lock()
            .insert(Symbol::from_base(symbol), error);
    }

    pub fn fail_leverage(&self, error: VenueError) {
        *self.leverage_failure.lock() = Some(error);
    }

    pub fn set_mark_price(&self, symbol: &str, mark: Decimal) {
        self.prices
            .lock()
            .insert(Symbol::from_base(symbol), Price::new(mark));
    }

    /// Recorded order tickets.
    pub fn tickets(&self) -> Vec<OrderTicket> {
        self.tickets.lock().clone()
    }

    pub fn leverage_calls(&self) -> Vec<(Symbol, u32)> {
        self.leverage_calls.lock().clone()
    }

    pub fn positions(&self) -> Vec<Position> {
        self.positions.lock().clone()
    }

    pub fn price_calls(&self) -> usize {
        self.price_calls.load(Ordering::SeqCst)
    }

    pub fn precision_calls(&self) -> usize {
        self.precision_calls.load(Ordering::SeqCst)
    }

    fn apply_fill(&self, ticket: &OrderTicket, fill_price: Price) {
        let mut positions = self.positions.lock();
        let existing = positions.iter().position(|p| p.symbol == ticket.symbol);
        let buy = ticket.side == OrderSide::Buy;

        match existing {
            Some(i) => {
                let p = &mut positions[i];
                let extends = (p.side == PositionSide::Long) == buy;
                if extends && !ticket.reduce_only {
                    p.quantity = p.quantity + ticket.quantity;
                } else if !extends {
                    let remaining = p.quantity.inner() - ticket.quantity.inner();
                    p.quantity = Size::new(remaining.max(Decimal::ZERO));
                }
                p.notional = p.quantity.notional(p.mark_price).unwrap_or(Decimal::MAX);
                if p.quantity.is_zero() {
                    positions.remove(i);
                }
            }
            None if !ticket.reduce_only => positions.push(Position {
                symbol: ticket.symbol.clone(),
                venue: self.venue,
                side: if buy { PositionSide::Long } else { PositionSide::Short },
                quantity: ticket.quantity,
                entry_price: fill_price,
                mark_price: fill_price,
                leverage: 1,
                unrealized_pnl: Decimal::ZERO,
                notional: ticket.quantity.notional(fill_price).unwrap_or(Decimal::MAX),
            }),
            None => {}
        }
    }
}

impl VenueClient for MockVenueClient {
    fn venue(&self) -> Venue {
        self.venue
    }

    fn fetch_mark_price<'a>(&'a self, symbol: &'a Symbol) -> BoxFuture<'a, VenueResult<Price>> {
        Box::pin(async move {
            self.price_calls.fetch_add(1, Ordering::SeqCst);
            {
                let mut failures = self.price_failures.lock();
                if let Some(remaining) = failures.get_mut(symbol) {
                    if *remaining > 0 {
                        *remaining -= 1;
                        return Err(VenueError::Transport(format!(
                            "timed out fetching price for {symbol}"
                        )));
                    }
                }
            }
            self.prices
                .lock()
                .get(symbol)
                .copied()
                .ok_or_else(|| VenueError::NotFound(symbol.to_string()))
        })
    }

    fn fetch_symbol_precision<'a>(
        &'a self,
        symbol: &'a Symbol,
    ) -> BoxFuture<'a, VenueResult<SymbolPrecision>> {
        Box::pin(async move {
            self.precision_calls.fetch_add(1, Ordering::SeqCst);
            self.precisions
                .lock()
                .get(symbol)
                .copied()
                .ok_or_else(|| VenueError::NotFound(symbol.to_string()))
        })
    }

    fn fetch_positions(&self) -> BoxFuture<'_, VenueResult<Vec<Position>>> {
        Box::pin(async move { Ok(self.positions.lock().clone()) })
    }

    fn set_leverage<'a>(&'a self, symbol: &'a Symbol, leverage: u32) -> BoxFuture<'a, VenueResult<()>> {
        Box::pin(async move {
            self.leverage_calls.lock().push((symbol.clone(), leverage));
            match self.leverage_failure.lock().clone() {
                Some(e) => Err(e),
                None => Ok(()),
            }
        })
    }

    fn submit_order(&self, ticket: OrderTicket) -> BoxFuture<'_, VenueResult<OrderAck>> {
        Box::pin(async move {
            if let Some(e) = self.order_failures.lock().get(&ticket.symbol).cloned() {
                return Err(e);
            }
            let fill_price = match ticket.price {
                Some(p) => p,
                None => self
                    .prices
                    .lock()
                    .get(&ticket.symbol)
                    .copied()
                    .unwrap_or(Price::ZERO),
            };
            self.apply_fill(&ticket, fill_price);
            let ack = OrderAck {
                order_id: format!("mock-{}", self.tickets.lock().len() + 1),
                status: "filled".to_string(),
                filled_quantity: ticket.quantity,
                average_price: Some(fill_price),
            };
            self.tickets.lock().push(ticket);
            Ok(ack)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn venue() -> MockVenueClient {
        MockVenueClient::new(Venue::Binance)
            .with_market("BTC", dec!(50000), SymbolPrecision::from_size_decimals(3, 1))
            .with_position("BTC", PositionSide::Long, dec!(0.01))
    }

    fn ticket(side: OrderSide, quantity: Decimal, reduce_only: bool) -> OrderTicket {
        OrderTicket {
            client_order_id: fundarb_core::ClientOrderId::new(),
            symbol: Symbol::from_base("BTC"),
            instrument: "BTCUSDT".to_string(),
            side,
            order_type: fundarb_core::OrderType::Market,
            quantity: Size::new(quantity),
            price: None,
            time_in_force: None,
            reduce_only,
        }
    }

    #[test]
    fn test_scripted_price_failures() {
        let client = venue();
        let btc = Symbol::from_base("BTC");
        client.fail_price_lookups("BTC", 1);

        let first = tokio_test::block_on(client.fetch_mark_price(&btc));
        assert!(matches!(first, Err(VenueError::Transport(_))));
        let second = tokio_test::block_on(client.fetch_mark_price(&btc)).unwrap();
        assert_eq!(second, Price::new(dec!(50000)));
        assert_eq!(client.price_calls(), 2);
    }

    #[test]
    fn test_fills_update_positions() {
        let client = venue();

        tokio_test::block_on(client.submit_order(ticket(OrderSide::Buy, dec!(0.02), false))).unwrap();
        assert_eq!(client.positions()[0].quantity, Size::new(dec!(0.03)));

        // Reduce-only in the same direction as the position does nothing.
        tokio_test::block_on(client.submit_order(ticket(OrderSide::Buy, dec!(0.01), true))).unwrap();
        assert_eq!(client.positions()[0].quantity, Size::new(dec!(0.03)));

        let ack = tokio_test::block_on(client.submit_order(ticket(OrderSide::Sell, dec!(0.05), true))).unwrap();
        assert_eq!(ack.order_id, "mock-3");
        assert!(client.positions().is_empty());
    }
}
