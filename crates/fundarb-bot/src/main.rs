//! Funding-rate arbitrage scanner entry point.

use anyhow::Result;
use clap::{Parser, Subcommand};
use fundarb_executor::OperationResult;
use rust_decimal::Decimal;
use tracing::info;

/// Cross-venue funding-rate arbitrage scanner (Binance / Hyperliquid).
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// Configuration file path (can also be set via FUNDARB_CONFIG env var)
    #[arg(short, long)]
    config: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run one detection pass and print the opportunities.
    Scan {
        /// Minimum rate differential in percentage points
        #[arg(long)]
        min_diff: Option<Decimal>,
        /// Print the tagged JSON result instead of a table
        #[arg(long)]
        json: bool,
    },
    /// Poll both venues on an interval until interrupted.
    Watch,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    fundarb_telemetry::init_logging()?;
    info!("Starting fundarb v{}", env!("CARGO_PKG_VERSION"));

    // CLI arg > FUNDARB_CONFIG > default
    let config_path = args
        .config
        .or_else(|| std::env::var("FUNDARB_CONFIG").ok())
        .unwrap_or_else(|| "config/default.toml".to_string());
    info!(config_path = %config_path, "Loading configuration");

    let config = fundarb_bot::AppConfig::load(&config_path)?;
    info!(mode = ?config.mode, "Configuration loaded");

    let app = fundarb_bot::Application::new(config)?;

    match args.command {
        Command::Scan { min_diff, json } => {
            let result = app.detect_opportunities(min_diff).await;
            if json {
                println!("{}", serde_json::to_string_pretty(&result)?);
                return Ok(());
            }
            match result {
                OperationResult::Success { data } if data.is_empty() => {
                    println!("No opportunities above threshold");
                }
                OperationResult::Success { data } => {
                    println!(
                        "{:<10} {:>10} {:>10} {:>10}  {:<12} STRATEGY",
                        "SYMBOL", "BINANCE", "HL", "DIFF", "FIRST"
                    );
                    for opp in data {
                        println!(
                            "{:<10} {:>10} {:>10} {:>10}  {:<12} {}",
                            opp.symbol.as_str(),
                            opp.quote_a.rate_percent,
                            opp.quote_b.rate_percent,
                            opp.difference,
                            opp.settles_first.to_string(),
                            opp.strategy_text()
                        );
                    }
                }
                OperationResult::Error { kind, message, .. } => {
                    anyhow::bail!("{kind}: {message}");
                }
            }
        }
        Command::Watch => app.watch().await?,
    }

    Ok(())
}
