//! Detector configuration.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Configuration for arbitrage detection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DetectorConfig {
    /// Minimum absolute rate differential, in percentage points.
    #[serde(default = "default_min_diff")]
    pub min_diff: Decimal,
}

fn default_min_diff() -> Decimal {
    Decimal::new(25, 2) // 0.25 percentage points
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            min_diff: default_min_diff(),
        }
    }
}

impl DetectorConfig {
    /// Validate configuration values.
    pub fn validate(&self) -> Result<(), String> {
        if self.min_diff.is_sign_negative() {
            return Err(format!("min_diff ({}) must be non-negative", self.min_diff));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_default_min_diff() {
        assert_eq!(DetectorConfig::default().min_diff, dec!(0.25));
    }

    #[test]
    fn test_negative_min_diff_rejected() {
        let config = DetectorConfig { min_diff: dec!(-0.1) };
        assert!(config.validate().is_err());
    }
}
