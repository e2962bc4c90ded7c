//! Per-symbol precision cache.

use dashmap::DashMap;
use fundarb_core::{Symbol, SymbolPrecision};

/// Symbol precision rules, fetched once per symbol and kept for the
/// process lifetime.
#[derive(Debug, Default)]
pub struct PrecisionCache {
    rules: DashMap<Symbol, SymbolPrecision>,
}

impl PrecisionCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, symbol: &Symbol) -> Option<SymbolPrecision> {
        self.rules.get(symbol).map(|r| *r)
    }

    pub fn insert(&self, symbol: Symbol, precision: SymbolPrecision) {
        self.rules.insert(symbol, precision);
    }

    /// Drop every cached rule, e.g. after a metadata refresh.
    pub fn clear(&self) {
        self.rules.clear();
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}
