//! Open and close orders with guard rails.
//!
//! Every order passes through the same pipeline: live mark price (with a
//! bounded retry), precision rules, quantity resolution, the minimum
//! notional floor, optional leverage update, then a single submission.
//! Submission is never retried.

use fundarb_core::{
    ClientOrderId, OrderSide, OrderType, Position, Price, Size, Symbol, SymbolPrecision,
    TimeInForce, Venue,
};
use fundarb_telemetry::Metrics;
use rust_decimal::Decimal;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

use crate::cache::PrecisionCache;
use crate::client::{OrderTicket, VenueClient};
use crate::config::ExecutorConfig;
use crate::error::{ExecutionError, ExecutionResult, VenueError};
use crate::order::{OrderAmount, OrderRequest};
use crate::quantity::{normalize_quantity, to_quantity};
use crate::result::OrderResult;

/// An order after quantity resolution, ready for the shared pipeline.
struct Plan {
    symbol: Symbol,
    side: OrderSide,
    order_type: OrderType,
    quantity: Size,
    limit_price: Option<Price>,
    leverage: u32,
    reduce_only: bool,
    action: &'static str,
}

/// Order executor for one venue.
///
/// Not safe to run concurrently for the same symbol: position and
/// leverage are read then acted on without locking. Callers serialize
/// per symbol. A caller that gives up on a call mid-flight must re-read
/// positions to learn the outcome.
pub struct OrderExecutor<C: ?Sized> {
    client: Arc<C>,
    config: ExecutorConfig,
    precision: PrecisionCache,
}

impl<C: VenueClient + ?Sized> OrderExecutor<C> {
    pub fn new(client: Arc<C>, config: ExecutorConfig) -> Self {
        Self {
            client,
            config,
            precision: PrecisionCache::new(),
        }
    }

    pub fn venue(&self) -> Venue {
        self.client.venue()
    }

    pub fn config(&self) -> &ExecutorConfig {
        &self.config
    }

    pub fn client(&self) -> &Arc<C> {
        &self.client
    }

    /// Place a validated order.
    pub async fn place_order(&self, req: &OrderRequest) -> ExecutionResult<OrderResult> {
        let venue = self.venue();
        info!(
            %venue,
            symbol = %req.symbol,
            side = %req.side,
            order_type = %req.order_type,
            amount = ?req.amount,
            leverage = req.leverage,
            reduce_only = req.reduce_only,
            "Placing order"
        );

        let precision = self.precision_for(&req.symbol).await?;
        let mark = self.mark_price(&req.symbol).await?;
        let quantity = match req.amount {
            OrderAmount::Quantity(q) => normalize_quantity(q.inner(), &precision)?,
            OrderAmount::Notional(n) => to_quantity(&req.symbol, n, mark, &precision)?,
        };

        let plan = Plan {
            symbol: req.symbol.clone(),
            side: req.side,
            order_type: req.order_type,
            quantity,
            limit_price: req.price,
            leverage: req.leverage,
            reduce_only: req.reduce_only,
            action: if req.reduce_only { "close" } else { "open" },
        };
        self.execute(plan, mark, &precision).await
    }

    /// Close the whole position in `symbol` with a reduce-only order.
    ///
    /// Side and quantity come from the venue's position, never from the
    /// caller. A second call after a successful close fails with
    /// [`ExecutionError::NoPosition`].
    pub async fn close_position(&self, symbol: &Symbol) -> ExecutionResult<OrderResult> {
        let venue = self.venue();
        let position = self
            .client
            .fetch_position(symbol)
            .await?
            .filter(|p| p.is_open())
            .ok_or_else(|| ExecutionError::NoPosition(symbol.to_string()))?;

        info!(
            %venue,
            %symbol,
            side = %position.side,
            quantity = %position.quantity,
            "Closing position"
        );

        let precision = self.precision_for(symbol).await?;
        let mark = self.mark_price(symbol).await?;
        let plan = Plan {
            symbol: symbol.clone(),
            side: position.side.closing_side(),
            order_type: OrderType::Market,
            quantity: position.quantity.abs(),
            limit_price: None,
            leverage: 1,
            reduce_only: true,
            action: "close",
        };
        self.execute(plan, mark, &precision).await
    }

    /// Positions with a nonzero quantity.
    pub async fn open_positions(&self) -> ExecutionResult<Vec<Position>> {
        let positions = self.client.fetch_positions().await?;
        Ok(positions.into_iter().filter(|p| p.is_open()).collect())
    }

    async fn precision_for(&self, symbol: &Symbol) -> ExecutionResult<SymbolPrecision> {
        if let Some(p) = self.precision.get(symbol) {
            return Ok(p);
        }
        let p = self.client.fetch_symbol_precision(symbol).await?;
        self.precision.insert(symbol.clone(), p);
        Ok(p)
    }

    /// Mark price with up to `price_retry_attempts` tries on transport
    /// errors, at a fixed backoff. Other errors fail immediately, as does
    /// a non-positive mark.
    async fn mark_price(&self, symbol: &Symbol) -> ExecutionResult<Price> {
        let venue = self.venue();
        let attempts = self.config.price_retry_attempts.max(1);
        let mut attempt = 1;
        loop {
            match self.client.fetch_mark_price(symbol).await {
                Ok(price) if !price.is_positive() => {
                    return Err(ExecutionError::Precision(format!(
                        "mark price {price} for {symbol} must be positive"
                    )));
                }
                Ok(price) => return Ok(price),
                Err(VenueError::Transport(msg)) if attempt < attempts => {
                    warn!(%venue, %symbol, attempt, error = %msg, "Mark price lookup failed, retrying");
                    Metrics::price_retry(venue);
                    tokio::time::sleep(self.config.price_retry_backoff()).await;
                    attempt += 1;
                }
                Err(e) => return Err(e.into()),
            }
        }
    }

    async fn execute(
        &self,
        plan: Plan,
        mark: Price,
        precision: &SymbolPrecision,
    ) -> ExecutionResult<OrderResult> {
        let venue = self.venue();
        let action = plan.action;
        let result = self.execute_inner(plan, mark, precision).await;
        match &result {
            Ok(_) => Metrics::order(venue, action, "submitted"),
            Err(e @ ExecutionError::VenueRejection { .. }) => {
                error!(%venue, action, error = %e, "Order rejected by venue");
                Metrics::order(venue, action, "rejected");
            }
            Err(e) => {
                debug!(%venue, action, error = %e, "Order not submitted");
                Metrics::order(venue, action, "error");
            }
        }
        result
    }

    async fn execute_inner(
        &self,
        plan: Plan,
        mark: Price,
        precision: &SymbolPrecision,
    ) -> ExecutionResult<OrderResult> {
        let venue = self.venue();
        let reference = match (plan.order_type, plan.limit_price) {
            (OrderType::Limit, Some(p)) => p,
            _ => mark,
        };

        let mut quantity = plan.quantity;
        let mut upsized_from = None;
        let notional = quantity.notional(reference).ok_or_else(|| {
            ExecutionError::Precision(format!("notional of {quantity} at {reference} overflows"))
        })?;
        let minimum = self.config.min_order_notional;
        if notional < minimum {
            if !plan.reduce_only {
                return Err(ExecutionError::BelowMinimumNotional { notional, minimum });
            }
            let upsized = self.upsize(reference, precision)?;
            info!(
                %venue,
                symbol = %plan.symbol,
                action = plan.action,
                from = %quantity,
                to = %upsized,
                %notional,
                %minimum,
                "Reduce-only order below minimum notional, upsizing"
            );
            upsized_from = Some(quantity);
            quantity = upsized;
        }

        let leverage_warning = if plan.leverage > 1 {
            self.try_set_leverage(&plan.symbol, plan.leverage).await
        } else {
            None
        };

        let ticket = self.ticket(&plan, quantity, mark, precision)?;
        debug!(%venue, ?ticket, "Submitting order");
        let ack = self.client.submit_order(ticket.clone()).await?;

        info!(
            %venue,
            symbol = %ticket.symbol,
            side = %ticket.side,
            quantity = %ticket.quantity,
            price = ?ticket.price,
            order_id = %ack.order_id,
            status = %ack.status,
            "Order submitted"
        );

        Ok(OrderResult {
            venue,
            symbol: ticket.symbol,
            client_order_id: ticket.client_order_id.to_string(),
            side: ticket.side,
            order_type: ticket.order_type,
            quantity: ticket.quantity,
            price: ticket.price,
            reduce_only: ticket.reduce_only,
            upsized_from,
            leverage_warning,
            ack,
        })
    }

    /// Smallest step-aligned quantity worth at least the minimum notional
    /// plus the safety margin, and never below the venue's `min_qty`.
    fn upsize(&self, reference: Price, precision: &SymbolPrecision) -> ExecutionResult<Size> {
        let overflow = || {
            ExecutionError::Precision(format!(
                "minimum notional {} at {reference} overflows",
                self.config.min_order_notional
            ))
        };
        let target = self
            .config
            .min_order_notional
            .checked_div(reference.inner())
            .and_then(|q| q.checked_mul(Decimal::ONE + self.config.upsize_margin))
            .ok_or_else(overflow)?;
        let quantity = Size::new(target)
            .ceil_to_step(precision.step_size)
            .ok_or_else(overflow)?
            .max(Size::new(precision.min_qty));
        if quantity.inner() > precision.max_qty {
            return Err(ExecutionError::OutOfRange {
                quantity: quantity.inner(),
                min: precision.min_qty,
                max: precision.max_qty,
            });
        }
        Ok(quantity)
    }

    /// Set leverage; on failure keep the venue's current leverage and
    /// return a warning for the result.
    async fn try_set_leverage(&self, symbol: &Symbol, leverage: u32) -> Option<String> {
        let venue = self.venue();
        match self.client.set_leverage(symbol, leverage).await {
            Ok(()) => {
                debug!(%venue, %symbol, leverage, "Leverage set");
                None
            }
            Err(e) => {
                warn!(%venue, %symbol, leverage, error = %e, "Leverage update failed, using current leverage");
                Metrics::leverage_failed(venue);
                Some(format!("failed to set leverage {leverage}x: {e}"))
            }
        }
    }

    fn ticket(
        &self,
        plan: &Plan,
        quantity: Size,
        mark: Price,
        precision: &SymbolPrecision,
    ) -> ExecutionResult<OrderTicket> {
        let venue = self.venue();
        let (order_type, price, time_in_force) = match plan.order_type {
            OrderType::Limit => (
                OrderType::Limit,
                plan.limit_price,
                Some(TimeInForce::GoodTilCancelled),
            ),
            OrderType::Market if venue.supports_market_orders() => (OrderType::Market, None, None),
            OrderType::Market => (
                OrderType::Limit,
                Some(self.slippage_price(plan.side, mark, precision.price_precision)?),
                Some(TimeInForce::ImmediateOrCancel),
            ),
        };
        Ok(OrderTicket {
            client_order_id: ClientOrderId::new(),
            symbol: plan.symbol.clone(),
            instrument: venue.instrument(&plan.symbol),
            side: plan.side,
            order_type,
            quantity,
            price,
            time_in_force,
            reduce_only: plan.reduce_only,
        })
    }

    /// Limit price through the mark in the fill direction: buys above,
    /// sells below, rounded away from the mark.
    fn slippage_price(
        &self,
        side: OrderSide,
        mark: Price,
        price_precision: u32,
    ) -> ExecutionResult<Price> {
        let slippage = match side {
            OrderSide::Buy => self.config.slippage,
            OrderSide::Sell => -self.config.slippage,
        };
        let price = mark.offset(slippage).ok_or_else(|| {
            ExecutionError::Precision(format!("slippage price from mark {mark} overflows"))
        })?;
        Ok(match side {
            OrderSide::Buy => price.round_up(price_precision),
            OrderSide::Sell => price.round_down(price_precision),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::RejectionCategory;
    use crate::mock::MockVenueClient;
    use fundarb_core::PositionSide;
    use rust_decimal_macros::dec;

    fn config() -> ExecutorConfig {
        ExecutorConfig {
            price_retry_backoff_ms: 1,
            ..Default::default()
        }
    }

    fn binance() -> MockVenueClient {
        MockVenueClient::new(Venue::Binance)
            .with_market("BTC", dec!(50000), SymbolPrecision::from_size_decimals(3, 1))
            .with_market("DOGE", dec!(0.1), SymbolPrecision::from_size_decimals(0, 5))
    }

    fn hyperliquid() -> MockVenueClient {
        MockVenueClient::new(Venue::Hyperliquid)
            .with_market("ETH", dec!(2000), SymbolPrecision::from_size_decimals(4, 2))
    }

    fn executor(client: MockVenueClient) -> (Arc<MockVenueClient>, OrderExecutor<MockVenueClient>) {
        let client = Arc::new(client);
        (client.clone(), OrderExecutor::new(client, config()))
    }

    fn sym(base: &str) -> Symbol {
        Symbol::from_base(base)
    }

    #[tokio::test]
    async fn test_notional_market_order_on_binance() {
        let (client, exec) = executor(binance());
        let req = OrderRequest::market(sym("BTC"), OrderSide::Buy, OrderAmount::Notional(dec!(100)));

        let result = exec.place_order(&req).await.unwrap();
        assert_eq!(result.quantity, Size::new(dec!(0.002)));
        assert_eq!(result.order_type, OrderType::Market);
        assert!(result.upsized_from.is_none());

        let tickets = client.tickets();
        assert_eq!(tickets.len(), 1);
        assert_eq!(tickets[0].instrument, "BTCUSDT");
        assert_eq!(tickets[0].price, None);
        assert_eq!(tickets[0].time_in_force, None);
        assert!(tickets[0].client_order_id.to_string().starts_with("fra_"));
    }

    #[tokio::test]
    async fn test_market_order_synthesized_on_hyperliquid() {
        let (client, exec) = executor(hyperliquid());
        let buy = OrderRequest::market(sym("ETH"), OrderSide::Buy, OrderAmount::Notional(dec!(100)));
        let sell = OrderRequest::market(sym("ETH"), OrderSide::Sell, OrderAmount::Notional(dec!(100)));

        exec.place_order(&buy).await.unwrap();
        exec.place_order(&sell).await.unwrap();

        let tickets = client.tickets();
        assert_eq!(tickets[0].order_type, OrderType::Limit);
        assert_eq!(tickets[0].time_in_force, Some(TimeInForce::ImmediateOrCancel));
        assert_eq!(tickets[0].price, Some(Price::new(dec!(2100))));
        assert_eq!(tickets[0].quantity, Size::new(dec!(0.05)));
        assert_eq!(tickets[0].instrument, "ETH");
        assert_eq!(tickets[1].price, Some(Price::new(dec!(1900))));
    }

    #[tokio::test]
    async fn test_limit_order_is_gtc() {
        let (client, exec) = executor(binance());
        let req = OrderRequest::market(sym("BTC"), OrderSide::Sell, OrderAmount::Quantity(Size::new(dec!(0.01))))
            .with_limit_price(Price::new(dec!(51000)));

        let result = exec.place_order(&req).await.unwrap();
        assert_eq!(result.price, Some(Price::new(dec!(51000))));
        assert_eq!(client.tickets()[0].time_in_force, Some(TimeInForce::GoodTilCancelled));
    }

    #[tokio::test]
    async fn test_open_below_minimum_notional_rejected() {
        let (client, exec) = executor(binance());
        let req = OrderRequest::market(sym("DOGE"), OrderSide::Buy, OrderAmount::Notional(dec!(8)));

        let err = exec.place_order(&req).await.unwrap_err();
        assert!(matches!(err, ExecutionError::BelowMinimumNotional { .. }));
        assert!(client.tickets().is_empty());
    }

    #[tokio::test]
    async fn test_reduce_only_below_minimum_upsized() {
        let (client, exec) = executor(binance().with_position("DOGE", PositionSide::Long, dec!(500)));
        let req = OrderRequest::market(sym("DOGE"), OrderSide::Sell, OrderAmount::Notional(dec!(8)))
            .with_reduce_only();

        let result = exec.place_order(&req).await.unwrap();
        // 10 / 0.1 * 1.01 = 101
        assert_eq!(result.quantity, Size::new(dec!(101)));
        assert_eq!(result.upsized_from, Some(Size::new(dec!(80))));
        assert!(result.reduce_only);
        assert_eq!(client.positions()[0].quantity, Size::new(dec!(399)));
    }

    #[tokio::test]
    async fn test_leverage_failure_is_warning() {
        let (client, exec) = executor(binance());
        client.fail_leverage(VenueError::Rejected("leverage not changed".into()));
        let req = OrderRequest::market(sym("BTC"), OrderSide::Buy, OrderAmount::Notional(dec!(100)))
            .with_leverage(5);

        let result = exec.place_order(&req).await.unwrap();
        assert!(result.leverage_warning.unwrap().contains("5x"));
        assert_eq!(client.leverage_calls(), vec![(sym("BTC"), 5)]);
        assert_eq!(client.tickets().len(), 1);
    }

    #[tokio::test]
    async fn test_leverage_one_not_set() {
        let (client, exec) = executor(binance());
        let req = OrderRequest::market(sym("BTC"), OrderSide::Buy, OrderAmount::Notional(dec!(100)));

        let result = exec.place_order(&req).await.unwrap();
        assert!(result.leverage_warning.is_none());
        assert!(client.leverage_calls().is_empty());
    }

    #[tokio::test]
    async fn test_price_retry_recovers() {
        let (client, exec) = executor(binance());
        client.fail_price_lookups("BTC", 2);
        let req = OrderRequest::market(sym("BTC"), OrderSide::Buy, OrderAmount::Notional(dec!(100)));

        assert!(exec.place_order(&req).await.is_ok());
        assert_eq!(client.price_calls(), 3);
    }

    #[tokio::test]
    async fn test_price_retry_exhausted() {
        let (client, exec) = executor(binance());
        client.fail_price_lookups("BTC", 3);
        let req = OrderRequest::market(sym("BTC"), OrderSide::Buy, OrderAmount::Notional(dec!(100)));

        let err = exec.place_order(&req).await.unwrap_err();
        assert_eq!(err.kind(), "transient_network");
        assert_eq!(client.price_calls(), 3);
        assert!(client.tickets().is_empty());
    }

    #[tokio::test]
    async fn test_unknown_symbol() {
        let (client, exec) = executor(binance());
        let req = OrderRequest::market(sym("XYZ"), OrderSide::Buy, OrderAmount::Notional(dec!(100)));

        let err = exec.place_order(&req).await.unwrap_err();
        assert!(matches!(err, ExecutionError::Validation(_)));
        assert_eq!(client.price_calls(), 0);
    }

    #[tokio::test]
    async fn test_venue_rejection_categorized() {
        let (client, exec) = executor(binance());
        client.fail_orders("BTC", VenueError::Rejected("Margin is insufficient for balance".into()));
        let req = OrderRequest::market(sym("BTC"), OrderSide::Buy, OrderAmount::Notional(dec!(100)));

        match exec.place_order(&req).await.unwrap_err() {
            ExecutionError::VenueRejection { category, .. } => {
                assert_eq!(category, RejectionCategory::InsufficientBalance)
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_precision_cached() {
        let (client, exec) = executor(binance());
        let req = OrderRequest::market(sym("BTC"), OrderSide::Buy, OrderAmount::Notional(dec!(100)));

        exec.place_order(&req).await.unwrap();
        exec.place_order(&req).await.unwrap();
        assert_eq!(client.precision_calls(), 1);
        assert_eq!(client.price_calls(), 2);
    }

    #[tokio::test]
    async fn test_upsize_respects_min_qty() {
        let precision = SymbolPrecision {
            min_qty: dec!(150),
            ..SymbolPrecision::from_size_decimals(0, 5)
        };
        let (client, exec) = executor(
            MockVenueClient::new(Venue::Binance)
                .with_market("DOGE", dec!(0.1), precision)
                .with_position("DOGE", PositionSide::Long, dec!(80)),
        );

        // 10 / 0.1 * 1.01 = 101, lifted to the venue minimum of 150
        let result = exec.close_position(&sym("DOGE")).await.unwrap();
        assert_eq!(result.quantity, Size::new(dec!(150)));
        assert_eq!(result.upsized_from, Some(Size::new(dec!(80))));
        assert!(client.positions().is_empty());
    }

    #[tokio::test]
    async fn test_upsize_above_max_qty_rejected() {
        let precision = SymbolPrecision {
            max_qty: dec!(100),
            ..SymbolPrecision::from_size_decimals(0, 5)
        };
        let (client, exec) = executor(
            MockVenueClient::new(Venue::Binance)
                .with_market("DOGE", dec!(0.1), precision)
                .with_position("DOGE", PositionSide::Long, dec!(50)),
        );

        let err = exec.close_position(&sym("DOGE")).await.unwrap_err();
        assert_eq!(
            err,
            ExecutionError::OutOfRange {
                quantity: dec!(101),
                min: dec!(1),
                max: dec!(100),
            }
        );
        assert!(client.tickets().is_empty());
    }

    #[tokio::test]
    async fn test_zero_mark_rejected() {
        let (client, exec) = executor(binance().with_position("DOGE", PositionSide::Long, dec!(500)));
        client.set_mark_price("DOGE", dec!(0));

        let err = exec.close_position(&sym("DOGE")).await.unwrap_err();
        assert!(matches!(err, ExecutionError::Precision(_)));

        let req = OrderRequest::market(sym("DOGE"), OrderSide::Sell, OrderAmount::Quantity(Size::new(dec!(50))))
            .with_reduce_only();
        let err = exec.place_order(&req).await.unwrap_err();
        assert!(matches!(err, ExecutionError::Precision(_)));
        assert!(client.tickets().is_empty());
        assert_eq!(client.positions()[0].quantity, Size::new(dec!(500)));
    }

    #[tokio::test]
    async fn test_overflowing_orders_rejected() {
        let (client, exec) = executor(binance());

        let req = OrderRequest::market(sym("DOGE"), OrderSide::Buy, OrderAmount::Notional(Decimal::MAX));
        let err = exec.place_order(&req).await.unwrap_err();
        assert!(matches!(err, ExecutionError::Precision(_)));

        let req = OrderRequest::market(sym("BTC"), OrderSide::Buy, OrderAmount::Quantity(Size::new(dec!(2))))
            .with_limit_price(Price::new(Decimal::MAX));
        let err = exec.place_order(&req).await.unwrap_err();
        assert!(matches!(err, ExecutionError::Precision(_)));
        assert!(client.tickets().is_empty());
    }

    #[tokio::test]
    async fn test_close_without_position() {
        let (_, exec) = executor(binance());
        let err = exec.close_position(&sym("BTC")).await.unwrap_err();
        assert!(matches!(err, ExecutionError::NoPosition(_)));
        assert!(err.is_benign());
    }

    #[tokio::test]
    async fn test_close_uses_position_side_and_size() {
        let (client, exec) = executor(hyperliquid().with_position("ETH", PositionSide::Short, dec!(0.05)));

        let result = exec.close_position(&sym("ETH")).await.unwrap();
        assert_eq!(result.side, OrderSide::Buy);
        assert_eq!(result.quantity, Size::new(dec!(0.05)));
        assert!(result.reduce_only);

        let ticket = &client.tickets()[0];
        assert_eq!(ticket.price, Some(Price::new(dec!(2100))));
        assert_eq!(ticket.time_in_force, Some(TimeInForce::ImmediateOrCancel));
        assert!(client.leverage_calls().is_empty());
    }

    #[tokio::test]
    async fn test_close_twice() {
        let (_, exec) = executor(binance().with_position("BTC", PositionSide::Long, dec!(0.01)));

        let first = exec.close_position(&sym("BTC")).await.unwrap();
        assert_eq!(first.side, OrderSide::Sell);

        let second = exec.close_position(&sym("BTC")).await.unwrap_err();
        assert!(matches!(second, ExecutionError::NoPosition(_)));
        assert!(exec.open_positions().await.unwrap().is_empty());
    }
}
