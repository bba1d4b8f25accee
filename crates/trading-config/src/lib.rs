//! Configuration management.

mod error;
mod settings;

pub use error::ConfigError;
pub use settings::{
    AppConfig, AppSettings, DataSourceConfig, LoggingConfig, ScannerSettings, SourceKind,
    WatchlistSettings,
};

use config::{Config, Environment, File, FileFormat};
use std::path::Path;

fn environment() -> Environment {
    Environment::with_prefix("TRADING")
        .separator("__")
        .try_parsing(true)
}

/// Load configuration from an optional file and the environment.
///
/// Variables such as `TRADING__LOGGING__LEVEL=debug` override the file.
pub fn load_config(path: Option<&Path>) -> Result<AppConfig, ConfigError> {
    let mut builder = Config::builder();
    if let Some(path) = path {
        builder = builder.add_source(File::from(path).required(true));
    }
    let config = builder.add_source(environment()).build()?;

    Ok(config.try_deserialize()?)
}

/// Parse configuration from TOML text, without environment overrides.
pub fn parse_config(toml: &str) -> Result<AppConfig, ConfigError> {
    let config = Config::builder()
        .add_source(File::from_str(toml, FileFormat::Toml))
        .build()?;

    Ok(config.try_deserialize()?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use trading_core::types::{Condition, Side, Timeframe};
    use trading_indicators::IndicatorRegistry;

    const SAMPLE: &str = r#"
        primary_source = "offline"

        [logging]
        level = "debug"

        [[data_sources]]
        name = "polygon"
        kind = "polygon"
        api_key = "test-key"
        retry_attempts = 5

        [[data_sources]]
        name = "offline"
        kind = "csv"
        path = "data"

        [engine]
        initial_cash = 50000

        [engine.limits]
        max_positions = 5
        stop_loss_percent = 2.5

        [scanner]
        default_timeframe = "day"
        lookback_days = 90

        [[strategies]]
        name = "oversold"

        [[strategies.indicators]]
        type = "RSI"
        parameters = { period = 14 }
        buy_condition = "below_threshold"
        buy_threshold = 30.0
        weight = 1.0

        [watchlist]
        scan_interval_secs = 15

        [[watchlist.items]]
        symbol = "AAPL"
        side = "buy"
        quantity = 10
        target_price = 180.5
    "#;

    #[test]
    fn test_defaults() {
        let config = AppConfig::default();
        assert_eq!(config.logging.level, "info");
        assert!(config.engine.enabled);
        assert_eq!(config.engine.initial_cash, dec!(100000));
        assert_eq!(config.engine.limits.max_positions, 10);
        assert_eq!(config.scanner.lookback_days, 120);
        assert_eq!(config.watchlist.scan_interval_secs, 60);
        assert!(config.validate(&IndicatorRegistry::with_defaults()).is_ok());
    }

    #[test]
    fn test_parse_sample() {
        let config = parse_config(SAMPLE).unwrap();

        assert_eq!(config.logging.level, "debug");
        assert_eq!(config.primary_source.as_deref(), Some("offline"));
        assert_eq!(config.data_sources.len(), 2);
        assert_eq!(config.data_sources[0].kind, SourceKind::Polygon);
        assert_eq!(config.data_sources[0].timeout_secs, 30);
        assert!(config.data_sources[1].enabled);

        let polygon = config.data_sources[0].polygon_config().unwrap();
        assert_eq!(polygon.api_key, "test-key");
        assert_eq!(polygon.retry_attempts, 5);

        assert_eq!(config.engine.initial_cash, dec!(50000));
        assert_eq!(config.engine.limits.max_positions, 5);
        assert_eq!(config.engine.limits.stop_loss_percent, dec!(2.5));
        assert_eq!(config.engine.limits.max_position_size_percent, dec!(25));
        assert_eq!(config.scanner.default_timeframe, Timeframe::Daily);

        let strategy = config.strategy("oversold").unwrap();
        assert_eq!(strategy.indicators[0].buy_condition, Some(Condition::BelowThreshold));

        let item = &config.watchlist.items[0];
        assert_eq!(item.side, Side::Buy);
        assert_eq!(item.target_price, Some(dec!(180.5)));

        assert!(config.validate(&IndicatorRegistry::with_defaults()).is_ok());
    }

    #[test]
    fn test_validate_rejects() {
        let registry = IndicatorRegistry::with_defaults();

        let missing_key = parse_config(
            r#"
            [[data_sources]]
            name = "polygon"
            kind = "polygon"
            api_key_env = "WATCHTRADER_TEST_UNSET_KEY"
            "#,
        )
        .unwrap();
        assert!(matches!(
            missing_key.validate(&registry),
            Err(ConfigError::MissingApiKey(_))
        ));

        let bad_primary = parse_config(r#"primary_source = "nowhere""#).unwrap();
        assert!(matches!(
            bad_primary.validate(&registry),
            Err(ConfigError::Invalid { section: "primary_source", .. })
        ));

        let long_lookback = parse_config(
            r#"
            [scanner]
            lookback_days = 1000000000
            "#,
        )
        .unwrap();
        assert!(matches!(
            long_lookback.validate(&registry),
            Err(ConfigError::Invalid { section: "scanner", .. })
        ));

        let unknown_indicator = parse_config(
            r#"
            [[strategies]]
            name = "s"
            [[strategies.indicators]]
            type = "ADX"
            buy_condition = "increasing"
            "#,
        )
        .unwrap();
        assert!(matches!(
            unknown_indicator.validate(&registry),
            Err(ConfigError::Strategy(_))
        ));
    }

    #[test]
    fn test_unknown_source_kind_fails_to_load() {
        let result = parse_config(
            r#"
            [[data_sources]]
            name = "x"
            kind = "bloomberg"
            "#,
        );
        assert!(matches!(result, Err(ConfigError::Load(_))));
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("watchtrader.toml");
        std::fs::write(&path, SAMPLE).unwrap();

        let config = load_config(Some(&path)).unwrap();
        assert_eq!(config.strategies.len(), 1);
        assert!(load_config(Some(&dir.path().join("missing.toml"))).is_err());
    }
}
