//! XAU Signal, gold trading signals over Telegram
//!
//! Usage:
//!   xau-signal run --mode scalping --interval 15     Poll prices and notify
//!   xau-signal run --dry-run                         Log messages instead of sending
//!   xau-signal evaluate --file prices.txt --hour 13  Score a saved price history

mod feed;
mod message;
mod notify;
mod runner;

use anyhow::Context;
use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand};
use engine::{EngineConfig, PriceSeries, SignalEngine};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, warn};

use crate::feed::TwelveDataClient;
use crate::notify::{LogNotifier, Notifier, TelegramNotifier};
use crate::runner::Runner;

const APP_VERSION: &str = concat!(env!("CARGO_PKG_VERSION"), "-", env!("GIT_HASH"));
const DEFAULT_SYMBOL: &str = "XAU/USD";

#[derive(Parser)]
#[command(name = "xau-signal")]
#[command(about = "XAUUSD signal bot with session-aware confirmations", long_about = None)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Strategy mode: scalping (aggressive) or long (conservative)
    #[arg(long, global = true, default_value = "scalping")]
    mode: String,

    /// Session policy: auto, london_ny, asia, all
    #[arg(long, global = true, default_value = "auto")]
    session: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Poll the price feed and send signals
    Run {
        /// Polling interval in seconds
        #[arg(long, default_value_t = 15)]
        interval: u64,
        /// Log messages instead of sending them to Telegram
        #[arg(long)]
        dry_run: bool,
    },
    /// Evaluate a saved price history and print the record as JSON
    Evaluate {
        /// One price per line, or a JSON array of prices
        #[arg(long)]
        file: PathBuf,
        /// UTC hour to evaluate at (defaults to now)
        #[arg(long, value_parser = clap::value_parser!(u32).range(..24))]
        hour: Option<u32>,
    },
}

fn init_logging(verbose: bool) {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    let filter = if verbose {
        EnvFilter::new("debug,engine=debug,xau_signal=debug")
    } else {
        EnvFilter::new("info,engine=info,xau_signal=info")
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(false).compact())
        .with(filter)
        .init();
}

fn require_env(key: &str) -> anyhow::Result<String> {
    std::env::var(key)
        .ok()
        .filter(|v| !v.trim().is_empty())
        .ok_or_else(|| anyhow::anyhow!("{} is not set", key))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);
    dotenvy::dotenv().ok();

    match cli.command {
        Commands::Run { interval, dry_run } => {
            let config = EngineConfig::parse(&cli.mode, &cli.session, interval)?;
            cmd_run(config, dry_run).await?;
        }
        Commands::Evaluate { file, hour } => {
            let config = EngineConfig::parse(&cli.mode, &cli.session, 1)?;
            cmd_evaluate(config, &file, hour)?;
        }
    }

    Ok(())
}

// ============================================================================
// Run command
// ============================================================================

async fn cmd_run(config: EngineConfig, dry_run: bool) -> anyhow::Result<()> {
    let symbol = std::env::var("XAU_SIGNAL_SYMBOL").unwrap_or_else(|_| DEFAULT_SYMBOL.to_string());
    let feed = TwelveDataClient::new(require_env("TWELVEDATA_API_KEY")?, symbol.clone())?;

    let notifier: Arc<dyn Notifier> = if dry_run {
        warn!("Dry run: messages are logged, not sent");
        Arc::new(LogNotifier)
    } else {
        Arc::new(TelegramNotifier::new(
            require_env("TELEGRAM_BOT_TOKEN")?,
            require_env("TELEGRAM_CHAT_ID")?,
        )?)
    };

    info!("XAU Signal v{} starting...", APP_VERSION);
    info!(
        symbol = feed.symbol(),
        mode = %config.mode,
        polling_secs = config.polling_interval.as_secs(),
        session = %config.session_policy,
        buffer = config.buffer_capacity(),
        "Engine configured"
    );

    let mut runner = Runner::new(config, Box::new(feed), notifier, symbol);
    runner.announce(Utc::now());
    runner.run(shutdown_signal()).await;

    Ok(())
}

/// Resolves on Ctrl+C or SIGTERM
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "Ctrl+C handler unavailable");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "SIGTERM handler unavailable");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
}

// ============================================================================
// Evaluate command
// ============================================================================

fn cmd_evaluate(config: EngineConfig, file: &Path, hour: Option<u32>) -> anyhow::Result<()> {
    let text = std::fs::read_to_string(file)
        .with_context(|| format!("Failed to read {}", file.display()))?;
    let prices = parse_prices(&text)?;
    let now = evaluation_time(Utc::now(), hour)?;

    let series = PriceSeries::from_prices(&prices, config.buffer_capacity());
    info!(
        loaded = prices.len(),
        kept = series.len(),
        at = %now.format("%H:%M UTC"),
        "Evaluating price history"
    );

    let record = SignalEngine::new(config).evaluate(&series, now);
    println!("{}", serde_json::to_string_pretty(&record)?);
    Ok(())
}

/// `now` moved to the top of `hour` on the same UTC day
fn evaluation_time(now: DateTime<Utc>, hour: Option<u32>) -> anyhow::Result<DateTime<Utc>> {
    let Some(hour) = hour else {
        return Ok(now);
    };
    now.date_naive()
        .and_hms_opt(hour, 0, 0)
        .map(|t| t.and_utc())
        .ok_or_else(|| anyhow::anyhow!("Invalid hour {}", hour))
}

/// A JSON array, or one price per line with blank and `#` lines ignored
fn parse_prices(text: &str) -> anyhow::Result<Vec<f64>> {
    let trimmed = text.trim();
    if trimmed.starts_with('[') {
        return serde_json::from_str(trimmed).context("Invalid JSON price array");
    }

    trimmed
        .lines()
        .enumerate()
        .map(|(i, line)| (i, line.trim()))
        .filter(|(_, line)| !line.is_empty() && !line.starts_with('#'))
        .map(|(i, line)| {
            line.parse::<f64>()
                .with_context(|| format!("Invalid price on line {}: {}", i + 1, line))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Timelike};

    #[test]
    fn test_parse_prices_lines() {
        let prices = parse_prices("# XAUUSD\n4600.1\n\n 4601.5 \n4602\n").unwrap();
        assert_eq!(prices, vec![4600.1, 4601.5, 4602.0]);
    }

    #[test]
    fn test_parse_prices_json() {
        assert_eq!(parse_prices("[4600.5, 4601]").unwrap(), vec![4600.5, 4601.0]);
    }

    #[test]
    fn test_parse_prices_reports_line() {
        let err = parse_prices("4600\nabc\n").unwrap_err();
        assert!(err.to_string().contains("line 2"));
    }

    #[test]
    fn test_evaluation_time() {
        let now = Utc.with_ymd_and_hms(2026, 3, 10, 17, 42, 5).unwrap();
        assert_eq!(evaluation_time(now, None).unwrap(), now);
        let at = evaluation_time(now, Some(13)).unwrap();
        assert_eq!(at.hour(), 13);
        assert_eq!(at.minute(), 0);
        assert_eq!(at.date_naive(), now.date_naive());
    }

    #[test]
    fn test_cli_rejects_unknown_mode() {
        let cli = Cli::parse_from(["xau-signal", "--mode", "swing", "run"]);
        assert!(EngineConfig::parse(&cli.mode, &cli.session, 15).is_err());
    }
}
