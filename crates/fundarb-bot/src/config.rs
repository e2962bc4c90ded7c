//! Application configuration.
//!
//! Loaded from a TOML file, then overlaid with `FUNDARB__SECTION__KEY`
//! environment variables. Venue credentials may also come from the plain
//! `BINANCE_*` / `HYPERLIQUID_*` variables.

use crate::error::{AppError, AppResult};
use config::{Config, Environment, File, FileFormat};
use fundarb_core::Venue;
use fundarb_detector::DetectorConfig;
use fundarb_executor::ExecutorConfig;
use fundarb_feed::client::{BINANCE_DEFAULT_URL, HYPERLIQUID_DEFAULT_INFO_URL};
use fundarb_feed::FeedConfig;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Prefix for layered environment overrides.
pub const ENV_PREFIX: &str = "FUNDARB";

pub const BINANCE_API_KEY_ENV: &str = "BINANCE_API_KEY";
pub const BINANCE_API_SECRET_ENV: &str = "BINANCE_API_SECRET";
pub const HYPERLIQUID_PRIVATE_KEY_ENV: &str = "HYPERLIQUID_PRIVATE_KEY";
pub const HYPERLIQUID_WALLET_ADDRESS_ENV: &str = "HYPERLIQUID_WALLET_ADDRESS";

/// Operating mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OperatingMode {
    /// Scan only; order operations are refused.
    #[default]
    Observation,
    /// Order operations enabled. Requires credentials for both venues.
    Trading,
}

/// Binance USDⓈ-M futures endpoints and API credentials.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BinanceConfig {
    #[serde(default = "default_binance_url")]
    pub base_url: String,
    #[serde(default, skip_serializing)]
    pub api_key: Option<String>,
    #[serde(default, skip_serializing)]
    pub api_secret: Option<String>,
}

fn default_binance_url() -> String {
    BINANCE_DEFAULT_URL.to_string()
}

impl Default for BinanceConfig {
    fn default() -> Self {
        Self {
            base_url: default_binance_url(),
            api_key: None,
            api_secret: None,
        }
    }
}

/// Hyperliquid info endpoint and signing credentials.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HyperliquidConfig {
    #[serde(default = "default_info_url")]
    pub info_url: String,
    /// Hex private key of the signing wallet.
    #[serde(default, skip_serializing)]
    pub private_key: Option<String>,
    /// Account address ("0x...").
    #[serde(default)]
    pub wallet_address: Option<String>,
}

fn default_info_url() -> String {
    HYPERLIQUID_DEFAULT_INFO_URL.to_string()
}

impl Default for HyperliquidConfig {
    fn default() -> Self {
        Self {
            info_url: default_info_url(),
            private_key: None,
            wallet_address: None,
        }
    }
}

/// Polling loop settings for `fundarb watch`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WatchConfig {
    #[serde(default = "default_interval_secs")]
    pub interval_secs: u64,
    /// Opportunities logged per tick.
    #[serde(default = "default_top_n")]
    pub top_n: usize,
    /// Rate move, in percentage points, reported as a change.
    #[serde(default = "default_change_threshold")]
    pub change_threshold: Decimal,
}

fn default_interval_secs() -> u64 {
    3
}

fn default_top_n() -> usize {
    20
}

fn default_change_threshold() -> Decimal {
    Decimal::new(1, 2) // 0.01 percentage points
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self {
            interval_secs: default_interval_secs(),
            top_n: default_top_n(),
            change_threshold: default_change_threshold(),
        }
    }
}

impl WatchConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }
}

/// Main application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub mode: OperatingMode,
    #[serde(default)]
    pub binance: BinanceConfig,
    #[serde(default)]
    pub hyperliquid: HyperliquidConfig,
    #[serde(default)]
    pub feed: FeedConfig,
    #[serde(default)]
    pub detector: DetectorConfig,
    #[serde(default)]
    pub executor: ExecutorConfig,
    #[serde(default)]
    pub watch: WatchConfig,
}

impl AppConfig {
    /// Load from a TOML file with environment overrides, then validate.
    pub fn load(path: &str) -> AppResult<Self> {
        let builder = Config::builder().add_source(File::new(path, FileFormat::Toml));
        let mut config = Self::build(builder)?;
        config.apply_credentials(|name| std::env::var(name).ok());
        config.validate()?;
        Ok(config)
    }

    /// Parse TOML text with environment overrides. Does not validate.
    pub fn from_toml_str(content: &str) -> AppResult<Self> {
        Self::build(Config::builder().add_source(File::from_str(content, FileFormat::Toml)))
    }

    fn build(builder: config::ConfigBuilder<config::builder::DefaultState>) -> AppResult<Self> {
        builder
            .add_source(Environment::with_prefix(ENV_PREFIX).separator("__"))
            .build()
            .and_then(|c| c.try_deserialize())
            .map_err(|e| AppError::Configuration(format!("Failed to load config: {e}")))
    }

    /// Fill credentials from the plain venue variables. Values already set
    /// in the file or through `FUNDARB__` variables win.
    pub fn apply_credentials<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let read = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());
        fill(&mut self.binance.api_key, read(BINANCE_API_KEY_ENV));
        fill(&mut self.binance.api_secret, read(BINANCE_API_SECRET_ENV));
        fill(&mut self.hyperliquid.private_key, read(HYPERLIQUID_PRIVATE_KEY_ENV));
        fill(&mut self.hyperliquid.wallet_address, read(HYPERLIQUID_WALLET_ADDRESS_ENV));
    }

    /// Names of the credential variables still missing for `venue`.
    pub fn missing_credentials(&self, venue: Venue) -> Vec<&'static str> {
        let checks: [(&Option<String>, &'static str); 2] = match venue {
            Venue::Binance => [
                (&self.binance.api_key, BINANCE_API_KEY_ENV),
                (&self.binance.api_secret, BINANCE_API_SECRET_ENV),
            ],
            Venue::Hyperliquid => [
                (&self.hyperliquid.private_key, HYPERLIQUID_PRIVATE_KEY_ENV),
                (&self.hyperliquid.wallet_address, HYPERLIQUID_WALLET_ADDRESS_ENV),
            ],
        };
        checks
            .into_iter()
            .filter(|(value, _)| value.as_deref().map_or(true, |v| v.trim().is_empty()))
            .map(|(_, name)| name)
            .collect()
    }

    pub fn is_trading_mode(&self) -> bool {
        self.mode == OperatingMode::Trading
    }

    /// Validate every section. Trading mode also requires credentials for
    /// both venues.
    pub fn validate(&self) -> AppResult<()> {
        self.feed
            .validate()
            .map_err(|e| AppError::Configuration(format!("feed: {e}")))?;
        self.detector
            .validate()
            .map_err(|e| AppError::Configuration(format!("detector: {e}")))?;
        self.executor
            .validate()
            .map_err(|e| AppError::Configuration(format!("executor: {e}")))?;
        if self.watch.interval_secs == 0 {
            return Err(AppError::Configuration(
                "watch: interval_secs must be positive".to_string(),
            ));
        }

        if self.is_trading_mode() {
            let missing: Vec<&str> = Venue::ALL
                .iter()
                .flat_map(|v| self.missing_credentials(*v))
                .collect();
            if !missing.is_empty() {
                return Err(AppError::Configuration(format!(
                    "trading mode requires credentials: {} not set",
                    missing.join(", ")
                )));
            }
        }
        Ok(())
    }
}

fn fill(slot: &mut Option<String>, value: Option<String>) {
    if slot.is_none() {
        *slot = value;
    }
}
