//! CLI definitions.

pub mod commands;
pub mod context;

use clap::{Parser, Subcommand, ValueEnum};
use rust_decimal::Decimal;
use std::path::PathBuf;
use trading_core::types::Side;

#[derive(Parser)]
#[command(name = "watchtrader")]
#[command(author, version, about = "Signal scanning, watchlist monitoring and order execution")]
pub struct Cli {
    /// Configuration file path
    #[arg(short, long, env = "WATCHTRADER_CONFIG")]
    pub config: Option<PathBuf>,

    /// Log level, overrides the configured one
    #[arg(short, long)]
    pub log_level: Option<LogLevel>,

    /// Enable JSON log format
    #[arg(long)]
    pub json_logs: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Clone, Copy, ValueEnum)]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

impl LogLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Trace => "trace",
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
pub enum SideArg {
    Buy,
    Sell,
}

impl From<SideArg> for Side {
    fn from(side: SideArg) -> Self {
        match side {
            SideArg::Buy => Side::Buy,
            SideArg::Sell => Side::Sell,
        }
    }
}

#[derive(Subcommand)]
pub enum Commands {
    /// Scan symbols with a strategy and rank the candidates
    Scan(ScanArgs),
    /// Run the watchlist monitor until Ctrl-C
    Watch(WatchArgs),
    /// Probe every configured data source
    Health,
    /// List registered indicator types
    Indicators,
    /// Validate configuration
    ValidateConfig,
}

#[derive(clap::Args)]
pub struct ScanArgs {
    /// Strategy to scan with
    #[arg(short, long)]
    pub strategy: String,

    /// Symbols to scan (comma-separated)
    #[arg(short = 'S', long, value_delimiter = ',', required = true)]
    pub symbols: Vec<String>,

    /// Calendar days of history, defaults to the configured lookback
    #[arg(long)]
    pub days: Option<i64>,

    /// Bar timeframe, defaults to the configured one
    #[arg(short, long)]
    pub timeframe: Option<String>,

    /// Side to rank by
    #[arg(long, value_enum, default_value = "buy")]
    pub side: SideArg,

    /// Output format (text, json)
    #[arg(long, default_value = "text")]
    pub output: String,
}

#[derive(clap::Args)]
pub struct WatchArgs {
    /// Strategy used to nominate buy candidates
    #[arg(short, long, requires = "symbols")]
    pub strategy: Option<String>,

    /// Symbols to scan for candidates (comma-separated)
    #[arg(short = 'S', long, value_delimiter = ',')]
    pub symbols: Vec<String>,

    /// Minimum composite score for a candidate
    #[arg(long, default_value = "0.5")]
    pub min_score: f64,

    /// Shares per candidate
    #[arg(short, long, default_value = "1")]
    pub quantity: Decimal,

    /// Scan interval in seconds, defaults to the configured one
    #[arg(long)]
    pub interval: Option<u64>,
}
