//! Bulk close and minimum-notional flows against the mock venue.

use fundarb_core::{OrderSide, PositionSide, Size, Symbol, SymbolPrecision, Venue};
use fundarb_executor::{
    ExecutionError, ExecutorConfig, MockVenueClient, OperationResult, OrderAmount, OrderExecutor,
    OrderRequest, VenueError,
};
use rust_decimal_macros::dec;
use std::sync::Arc;

fn config() -> ExecutorConfig {
    ExecutorConfig {
        price_retry_backoff_ms: 1,
        ..Default::default()
    }
}

fn venue_with_three_positions() -> MockVenueClient {
    MockVenueClient::new(Venue::Binance)
        .with_market("BTC", dec!(50000), SymbolPrecision::from_size_decimals(3, 1))
        .with_market("ETH", dec!(2000), SymbolPrecision::from_size_decimals(3, 2))
        .with_market("SOL", dec!(100), SymbolPrecision::from_size_decimals(2, 2))
        .with_position("BTC", PositionSide::Long, dec!(0.01))
        .with_position("ETH", PositionSide::Short, dec!(0.5))
        .with_position("SOL", PositionSide::Long, dec!(3))
}

#[tokio::test]
async fn test_bulk_close_continues_past_failure() {
    let client = Arc::new(venue_with_three_positions());
    client.fail_price_lookups("ETH", 3);
    let executor = OrderExecutor::new(client.clone(), config());

    let report = executor.close_all_positions().await.unwrap();

    let symbols: Vec<_> = report.outcomes.iter().map(|o| o.symbol.as_str()).collect();
    assert_eq!(symbols, vec!["BTC", "ETH", "SOL"]);
    assert!(report.outcomes[0].is_success());
    assert!(!report.outcomes[1].is_success());
    assert!(report.outcomes[2].is_success());
    assert_eq!(report.succeeded(), 2);
    assert_eq!(report.failed(), 1);

    match &report.outcomes[1].outcome {
        OperationResult::Error { kind, benign, .. } => {
            assert_eq!(kind, "transient_network");
            assert!(!benign);
        }
        other => panic!("expected error, got {other:?}"),
    }

    let remaining = client.positions();
    assert_eq!(remaining.len(), 1);
    assert_eq!(remaining[0].symbol, Symbol::from_base("ETH"));
}

#[tokio::test]
async fn test_bulk_close_continues_past_zero_mark() {
    let client = Arc::new(venue_with_three_positions());
    client.set_mark_price("BTC", dec!(0));
    let executor = OrderExecutor::new(client.clone(), config());

    let report = executor.close_all_positions().await.unwrap();

    assert_eq!(report.succeeded(), 2);
    assert_eq!(report.failed(), 1);
    match &report.outcomes[0].outcome {
        OperationResult::Error { kind, .. } => assert_eq!(kind, "precision"),
        other => panic!("expected error, got {other:?}"),
    }

    let remaining = client.positions();
    assert_eq!(remaining.len(), 1);
    assert_eq!(remaining[0].symbol, Symbol::from_base("BTC"));
}

#[tokio::test]
async fn test_bulk_close_report_shape() {
    let client = Arc::new(venue_with_three_positions());
    client.fail_orders("SOL", VenueError::Rejected("ReduceOnly Order is rejected".into()));
    let executor = OrderExecutor::new(client, config());

    let report = executor.close_all_positions().await.unwrap();
    let json = serde_json::to_value(&report).unwrap();

    assert_eq!(json["venue"], "binance");
    assert_eq!(json["outcomes"][0]["symbol"], "BTC");
    assert_eq!(json["outcomes"][0]["status"], "success");
    assert_eq!(json["outcomes"][2]["status"], "error");
    assert_eq!(json["outcomes"][2]["kind"], "venue_rejection");
}

#[tokio::test]
async fn test_bulk_close_with_nothing_open() {
    let client = Arc::new(MockVenueClient::new(Venue::Hyperliquid));
    let executor = OrderExecutor::new(client.clone(), config());

    let report = executor.close_all_positions().await.unwrap();
    assert!(report.outcomes.is_empty());
    assert!(client.tickets().is_empty());
}

#[tokio::test]
async fn test_small_position_round_trip() {
    let client = Arc::new(
        MockVenueClient::new(Venue::Binance)
            .with_market("DOGE", dec!(0.1), SymbolPrecision::from_size_decimals(0, 5)),
    );
    let executor = OrderExecutor::new(client.clone(), config());
    let doge = Symbol::from_base("DOGE");

    // $8 opening order is refused outright.
    let open = OrderRequest::market(doge.clone(), OrderSide::Buy, OrderAmount::Notional(dec!(8)));
    let err = executor.place_order(&open).await.unwrap_err();
    assert!(matches!(err, ExecutionError::BelowMinimumNotional { .. }));

    // $20 opens fine; the price then drops so the position is worth $8.
    let open = OrderRequest::market(doge.clone(), OrderSide::Buy, OrderAmount::Notional(dec!(20)));
    let opened = executor.place_order(&open).await.unwrap();
    assert_eq!(opened.quantity, Size::new(dec!(200)));
    client.set_mark_price("DOGE", dec!(0.04));

    // Closing is upsized past the minimum and the venue clamps it to the position.
    let closed = executor.close_position(&doge).await.unwrap();
    assert_eq!(closed.upsized_from, Some(Size::new(dec!(200))));
    assert_eq!(closed.quantity, Size::new(dec!(253)));
    assert!(client.positions().is_empty());
}
