//! USD notional to venue-legal order quantity.

use fundarb_core::{Price, Size, Symbol, SymbolPrecision};
use rust_decimal::Decimal;
use tracing::debug;

use crate::error::{ExecutionError, ExecutionResult};

/// Bring a raw quantity onto the venue grid.
///
/// Rejects quantities outside `[min_qty, max_qty]` before any flooring,
/// then truncates to a multiple of `step_size` and to
/// `quantity_precision` digits. Never rounds up.
pub fn normalize_quantity(raw: Decimal, precision: &SymbolPrecision) -> ExecutionResult<Size> {
    if precision.step_size <= Decimal::ZERO {
        return Err(ExecutionError::Precision(format!(
            "step size {} must be positive",
            precision.step_size
        )));
    }
    if raw < precision.min_qty || raw > precision.max_qty {
        return Err(ExecutionError::OutOfRange {
            quantity: raw,
            min: precision.min_qty,
            max: precision.max_qty,
        });
    }

    let quantity = Size::new(raw)
        .floor_to_step(precision.step_size)
        .ok_or_else(|| {
            ExecutionError::Precision(format!(
                "quantity {raw} overflows at step size {}",
                precision.step_size
            ))
        })?
        .truncate_dp(precision.quantity_precision);

    if !quantity.is_positive() || quantity.inner() < precision.min_qty {
        return Err(ExecutionError::Precision(format!(
            "quantity {raw} truncates to {quantity}, below minimum {}",
            precision.min_qty
        )));
    }
    Ok(quantity)
}

/// Convert `usd_notional` at `mark_price` into a legal quantity.
///
/// Deterministic: the same inputs always give the same quantity, and
/// re-expressing the result as notional at the same price yields it again.
pub fn to_quantity(
    symbol: &Symbol,
    usd_notional: Decimal,
    mark_price: Price,
    precision: &SymbolPrecision,
) -> ExecutionResult<Size> {
    if !mark_price.is_positive() {
        return Err(ExecutionError::Precision(format!(
            "mark price {mark_price} for {symbol} must be positive"
        )));
    }
    let raw = usd_notional.checked_div(mark_price.inner()).ok_or_else(|| {
        ExecutionError::Precision(format!(
            "notional {usd_notional} at mark price {mark_price} for {symbol} overflows"
        ))
    })?;
    let quantity = normalize_quantity(raw, precision)?;
    debug!(%symbol, %usd_notional, %mark_price, %raw, %quantity, "Notional converted");
    Ok(quantity)
}
