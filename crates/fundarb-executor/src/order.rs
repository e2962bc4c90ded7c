//! Caller order input and its validated form.

use fundarb_core::{OrderSide, OrderType, Price, Size, Symbol};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::{ExecutionError, ExecutionResult};

/// Order as received from an outer layer (web form, CLI, JSON).
///
/// Nothing here is trusted; [`RawOrderRequest::validate`] checks it
/// before any network call.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RawOrderRequest {
    pub symbol: String,
    pub side: String,
    #[serde(default = "default_order_type")]
    pub order_type: String,
    #[serde(default)]
    pub quantity: Option<Decimal>,
    /// USD notional; alternative to `quantity`.
    #[serde(default, alias = "usdt_amount")]
    pub notional: Option<Decimal>,
    #[serde(default = "default_leverage")]
    pub leverage: u32,
    #[serde(default)]
    pub price: Option<Decimal>,
    #[serde(default)]
    pub reduce_only: bool,
}

fn default_order_type() -> String {
    "MARKET".to_string()
}

fn default_leverage() -> u32 {
    1
}

/// How much to trade.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderAmount {
    /// Base-asset quantity.
    Quantity(Size),
    /// USD notional, converted at the live mark price.
    Notional(Decimal),
}

/// A validated order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OrderRequest {
    pub symbol: Symbol,
    pub side: OrderSide,
    pub order_type: OrderType,
    pub amount: OrderAmount,
    pub leverage: u32,
    /// Limit price; always set for limit orders.
    pub price: Option<Price>,
    pub reduce_only: bool,
}

impl OrderRequest {
    /// Market order at the venue's current leverage.
    pub fn market(symbol: Symbol, side: OrderSide, amount: OrderAmount) -> Self {
        Self {
            symbol,
            side,
            order_type: OrderType::Market,
            amount,
            leverage: 1,
            price: None,
            reduce_only: false,
        }
    }

    pub fn with_leverage(mut self, leverage: u32) -> Self {
        self.leverage = leverage;
        self
    }

    pub fn with_reduce_only(mut self) -> Self {
        self.reduce_only = true;
        self
    }

    pub fn with_limit_price(mut self, price: Price) -> Self {
        self.order_type = OrderType::Limit;
        self.price = Some(price);
        self
    }
}

impl RawOrderRequest {
    /// Validate caller input. Fails fast, before any venue call.
    pub fn validate(&self) -> ExecutionResult<OrderRequest> {
        let invalid = |e: fundarb_core::CoreError| ExecutionError::Validation(e.to_string());

        let symbol = Symbol::parse(&self.symbol).map_err(invalid)?;
        let side: OrderSide = self.side.parse().map_err(invalid)?;
        let order_type: OrderType = self.order_type.parse().map_err(invalid)?;

        let price = match (order_type, self.price) {
            (OrderType::Limit, Some(p)) if p > Decimal::ZERO => Some(Price::new(p)),
            (OrderType::Limit, _) => {
                return Err(ExecutionError::Validation(
                    "limit orders require a positive price".to_string(),
                ))
            }
            (OrderType::Market, _) => None,
        };

        let amount = match (self.quantity, self.notional) {
            (Some(_), Some(_)) => {
                return Err(ExecutionError::Validation(
                    "specify exactly one of quantity or notional, not both".to_string(),
                ))
            }
            (None, None) => {
                return Err(ExecutionError::Validation(
                    "one of quantity or notional is required".to_string(),
                ))
            }
            (Some(q), None) if q > Decimal::ZERO => OrderAmount::Quantity(Size::new(q)),
            (None, Some(n)) if n > Decimal::ZERO => OrderAmount::Notional(n),
            _ => {
                return Err(ExecutionError::Validation(
                    "quantity or notional must be positive".to_string(),
                ))
            }
        };

        if self.leverage == 0 {
            return Err(ExecutionError::Validation(
                "leverage must be at least 1".to_string(),
            ));
        }

        Ok(OrderRequest {
            symbol,
            side,
            order_type,
            amount,
            leverage: self.leverage,
            price,
            reduce_only: self.reduce_only,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn raw() -> RawOrderRequest {
        RawOrderRequest {
            symbol: "BTCUSDT".to_string(),
            side: "BUY".to_string(),
            order_type: "MARKET".to_string(),
            notional: Some(dec!(100)),
            leverage: 1,
            ..Default::default()
        }
    }

    fn validation_message(r: RawOrderRequest) -> String {
        match r.validate() {
            Err(ExecutionError::Validation(msg)) => msg,
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    #[test]
    fn test_valid_market_notional() {
        let req = raw().validate().unwrap();
        assert_eq!(req.symbol.as_str(), "BTC");
        assert_eq!(req.side, OrderSide::Buy);
        assert_eq!(req.amount, OrderAmount::Notional(dec!(100)));
        assert_eq!(req.price, None);
    }

    #[test]
    fn test_empty_symbol_rejected() {
        validation_message(RawOrderRequest {
            symbol: "".into(),
            ..raw()
        });
    }

    #[test]
    fn test_bad_side_and_type_rejected() {
        validation_message(RawOrderRequest {
            side: "HOLD".into(),
            ..raw()
        });
        validation_message(RawOrderRequest {
            order_type: "STOP".into(),
            ..raw()
        });
    }

    #[test]
    fn test_limit_requires_positive_price() {
        let msg = validation_message(RawOrderRequest {
            order_type: "LIMIT".into(),
            ..raw()
        });
        assert!(msg.contains("positive price"));
        validation_message(RawOrderRequest {
            order_type: "LIMIT".into(),
            price: Some(dec!(0)),
            ..raw()
        });
        let ok = RawOrderRequest {
            order_type: "limit".into(),
            price: Some(dec!(65000)),
            ..raw()
        }
        .validate()
        .unwrap();
        assert_eq!(ok.price, Some(Price::new(dec!(65000))));
    }

    #[test]
    fn test_exactly_one_amount() {
        let msg = validation_message(RawOrderRequest {
            quantity: Some(dec!(1)),
            ..raw()
        });
        assert!(msg.contains("not both"));
        validation_message(RawOrderRequest {
            notional: None,
            ..raw()
        });
    }

    #[test]
    fn test_non_positive_notional_rejected() {
        validation_message(RawOrderRequest {
            notional: Some(dec!(-5)),
            ..raw()
        });
    }

    #[test]
    fn test_deserialize_with_alias_and_defaults() {
        let json = r#"{"symbol": "ETH", "side": "short", "usdt_amount": "50"}"#;
        let req: RawOrderRequest = serde_json::from_str(json).unwrap();
        assert_eq!(req.order_type, "MARKET");
        assert_eq!(req.leverage, 1);
        let valid = req.validate().unwrap();
        assert_eq!(valid.side, OrderSide::Sell);
        assert_eq!(valid.amount, OrderAmount::Notional(dec!(50)));
    }
}
