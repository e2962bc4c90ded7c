//! Feed configuration.

use serde::{Deserialize, Serialize};

/// Settlement refetches allowed in flight per venue batch.
pub const DEFAULT_REFETCH_CONCURRENCY: usize = 8;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedConfig {
    /// Concurrent settlement refetches per batch.
    #[serde(default = "default_refetch_concurrency")]
    pub refetch_concurrency: usize,
}

fn default_refetch_concurrency() -> usize {
    DEFAULT_REFETCH_CONCURRENCY
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            refetch_concurrency: default_refetch_concurrency(),
        }
    }
}

impl FeedConfig {
    /// Validate configuration values.
    pub fn validate(&self) -> Result<(), String> {
        if self.refetch_concurrency == 0 {
            return Err("refetch_concurrency must be positive".to_string());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_refetch_concurrency() {
        assert_eq!(FeedConfig::default().refetch_concurrency, 8);
        assert!(FeedConfig::default().validate().is_ok());
    }

    #[test]
    fn test_zero_concurrency_rejected() {
        let config = FeedConfig {
            refetch_concurrency: 0,
        };
        assert!(config.validate().is_err());
    }
}
