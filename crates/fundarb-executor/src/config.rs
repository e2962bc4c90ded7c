//! Executor configuration.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Guard rails applied to every order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutorConfig {
    /// Minimum order value in USD. Opening orders below it are rejected;
    /// reduce-only orders are upsized to clear it.
    #[serde(default = "default_min_order_notional")]
    pub min_order_notional: Decimal,
    /// Price offset for synthesized market orders, as a fraction.
    #[serde(default = "default_slippage")]
    pub slippage: Decimal,
    /// Extra fraction added when upsizing a reduce-only order.
    #[serde(default = "default_upsize_margin")]
    pub upsize_margin: Decimal,
    /// Mark price lookup attempts, including the first.
    #[serde(default = "default_price_retry_attempts")]
    pub price_retry_attempts: u32,
    /// Fixed delay between mark price attempts.
    #[serde(default = "default_price_retry_backoff_ms")]
    pub price_retry_backoff_ms: u64,
}

fn default_min_order_notional() -> Decimal {
    Decimal::from(10)
}

fn default_slippage() -> Decimal {
    Decimal::new(5, 2) // 5%
}

fn default_upsize_margin() -> Decimal {
    Decimal::new(1, 2) // 1%
}

fn default_price_retry_attempts() -> u32 {
    3
}

fn default_price_retry_backoff_ms() -> u64 {
    1000
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            min_order_notional: default_min_order_notional(),
            slippage: default_slippage(),
            upsize_margin: default_upsize_margin(),
            price_retry_attempts: default_price_retry_attempts(),
            price_retry_backoff_ms: default_price_retry_backoff_ms(),
        }
    }
}

impl ExecutorConfig {
    pub fn price_retry_backoff(&self) -> Duration {
        Duration::from_millis(self.price_retry_backoff_ms)
    }

    /// Validate configuration values.
    pub fn validate(&self) -> Result<(), String> {
        if self.min_order_notional.is_sign_negative() {
            return Err(format!(
                "min_order_notional ({}) must be non-negative",
                self.min_order_notional
            ));
        }
        if self.slippage <= Decimal::ZERO || self.slippage >= Decimal::ONE {
            return Err(format!("slippage ({}) must be in (0, 1)", self.slippage));
        }
        if self.upsize_margin.is_sign_negative() {
            return Err(format!(
                "upsize_margin ({}) must be non-negative",
                self.upsize_margin
            ));
        }
        if self.price_retry_attempts == 0 || self.price_retry_attempts > 3 {
            return Err(format!(
                "price_retry_attempts ({}) must be between 1 and 3",
                self.price_retry_attempts
            ));
        }
        Ok(())
    }
}
