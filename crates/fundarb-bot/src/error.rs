//! Application error types.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    /// Bad or incomplete configuration, including missing credentials.
    /// Fatal at startup.
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Feed error: {0}")]
    Feed(#[from] fundarb_feed::FeedError),

    #[error("Detector error: {0}")]
    Detector(#[from] fundarb_detector::DetectorError),

    #[error("Execution error: {0}")]
    Execution(#[from] fundarb_executor::ExecutionError),

    #[error("Telemetry error: {0}")]
    Telemetry(#[from] fundarb_telemetry::TelemetryError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl AppError {
    /// Stable machine-readable kind for tagged results.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Configuration(_) => "configuration",
            Self::Feed(_) => "feed",
            Self::Detector(_) => "detector",
            Self::Execution(e) => e.kind(),
            Self::Telemetry(_) => "telemetry",
            Self::Io(_) => "io",
        }
    }
}

pub type AppResult<T> = Result<T, AppError>;
