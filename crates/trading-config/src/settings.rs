//! Configuration structures.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::PathBuf;
use std::time::Duration;
use trading_core::types::Timeframe;
use trading_data::PolygonConfig;
use trading_engine::EngineSettings;
use trading_indicators::IndicatorRegistry;
use trading_scanner::{Strategy, MAX_LOOKBACK_DAYS};
use trading_watchlist::WatchlistItem;

use crate::error::ConfigError;

/// Main application configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub app: AppSettings,
    #[serde(default)]
    pub logging: LoggingConfig,
    /// Sources in registration order
    #[serde(default)]
    pub data_sources: Vec<DataSourceConfig>,
    /// Primary source name; the first listed source when unset
    #[serde(default)]
    pub primary_source: Option<String>,
    #[serde(default)]
    pub engine: EngineSettings,
    #[serde(default)]
    pub scanner: ScannerSettings,
    #[serde(default)]
    pub strategies: Vec<Strategy>,
    #[serde(default)]
    pub watchlist: WatchlistSettings,
}

/// General app settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppSettings {
    pub name: String,
    pub environment: String,
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            name: "watchtrader".to_string(),
            environment: "development".to_string(),
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default filter when `RUST_LOG` is unset
    pub level: String,
    /// Emit JSON lines instead of pretty output
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
        }
    }
}

/// Kind of market data source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    Polygon,
    Csv,
}

fn default_true() -> bool {
    true
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_retry_attempts() -> u32 {
    3
}

fn default_retry_delay_secs() -> u64 {
    5
}

/// One market data source.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DataSourceConfig {
    pub name: String,
    pub kind: SourceKind,
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Inline API key
    #[serde(default)]
    pub api_key: Option<String>,
    /// Environment variable holding the API key
    #[serde(default)]
    pub api_key_env: Option<String>,
    #[serde(default)]
    pub base_url: Option<String>,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_retry_attempts")]
    pub retry_attempts: u32,
    #[serde(default = "default_retry_delay_secs")]
    pub retry_delay_secs: u64,
    /// Directory of CSV files
    #[serde(default)]
    pub path: Option<PathBuf>,
}

impl DataSourceConfig {
    /// The inline key, else the value of `api_key_env`.
    pub fn resolve_api_key(&self) -> Option<String> {
        self.api_key
            .clone()
            .filter(|key| !key.trim().is_empty())
            .or_else(|| {
                let var = self.api_key_env.as_deref()?;
                std::env::var(var).ok().filter(|key| !key.trim().is_empty())
            })
    }

    /// Polygon client settings for this source.
    pub fn polygon_config(&self) -> Result<PolygonConfig, ConfigError> {
        let api_key = match self.resolve_api_key() {
            Some(key) => key,
            None if !self.enabled => String::new(),
            None => return Err(ConfigError::MissingApiKey(self.name.clone())),
        };

        let mut config = PolygonConfig::new(api_key);
        config.name = self.name.clone();
        config.enabled = self.enabled;
        if let Some(base_url) = &self.base_url {
            config.base_url = base_url.clone();
        }
        config.timeout = Duration::from_secs(self.timeout_secs);
        config.retry_attempts = self.retry_attempts;
        config.retry_delay = Duration::from_secs(self.retry_delay_secs);
        Ok(config)
    }
}

/// Scanner settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScannerSettings {
    pub default_timeframe: Timeframe,
    /// Calendar days of bars fetched per scan
    pub lookback_days: i64,
}

impl Default for ScannerSettings {
    fn default() -> Self {
        Self {
            default_timeframe: Timeframe::Daily,
            lookback_days: 120,
        }
    }
}

/// Watchlist settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WatchlistSettings {
    pub scan_interval_secs: u64,
    /// Items loaded at startup
    pub items: Vec<WatchlistItem>,
}

impl Default for WatchlistSettings {
    fn default() -> Self {
        Self {
            scan_interval_secs: 60,
            items: Vec::new(),
        }
    }
}

impl WatchlistSettings {
    pub fn scan_interval(&self) -> Duration {
        Duration::from_secs(self.scan_interval_secs)
    }
}

impl AppConfig {
    /// Look up a strategy by name.
    pub fn strategy(&self, name: &str) -> Option<&Strategy> {
        self.strategies.iter().find(|s| s.name == name)
    }

    /// Check cross-field constraints the types cannot express.
    pub fn validate(&self, registry: &IndicatorRegistry) -> Result<(), ConfigError> {
        let mut names = HashSet::new();
        for source in &self.data_sources {
            if source.name.trim().is_empty() {
                return Err(ConfigError::invalid("data_sources", "source name must not be empty"));
            }
            if !names.insert(source.name.as_str()) {
                return Err(ConfigError::invalid(
                    "data_sources",
                    format!("duplicate source {}", source.name),
                ));
            }
            match source.kind {
                SourceKind::Polygon => {
                    source.polygon_config()?;
                }
                SourceKind::Csv if source.path.is_none() => {
                    return Err(ConfigError::invalid(
                        "data_sources",
                        format!("csv source {} needs a path", source.name),
                    ));
                }
                SourceKind::Csv => {}
            }
        }
        if let Some(primary) = &self.primary_source {
            if !names.contains(primary.as_str()) {
                return Err(ConfigError::invalid(
                    "primary_source",
                    format!("{} is not a configured source", primary),
                ));
            }
        }

        if self.engine.initial_cash <= Decimal::ZERO {
            return Err(ConfigError::invalid("engine", "initial_cash must be positive"));
        }
        if self.engine.limits.max_positions == 0 {
            return Err(ConfigError::invalid("engine", "max_positions must be at least 1"));
        }
        if !(1..=MAX_LOOKBACK_DAYS).contains(&self.scanner.lookback_days) {
            return Err(ConfigError::invalid(
                "scanner",
                format!("lookback_days must be between 1 and {}", MAX_LOOKBACK_DAYS),
            ));
        }

        let mut strategies = HashSet::new();
        for strategy in &self.strategies {
            if !strategies.insert(strategy.name.as_str()) {
                return Err(ConfigError::invalid(
                    "strategies",
                    format!("duplicate strategy {}", strategy.name),
                ));
            }
            strategy.validate(registry)?;
        }

        if self.watchlist.scan_interval_secs == 0 {
            return Err(ConfigError::invalid("watchlist", "scan_interval_secs must be positive"));
        }
        for item in &self.watchlist.items {
            if item.symbol.trim().is_empty() || item.quantity <= Decimal::ZERO {
                return Err(ConfigError::invalid(
                    "watchlist",
                    format!("item {:?} needs a symbol and a positive quantity", item.symbol),
                ));
            }
        }

        Ok(())
    }
}
