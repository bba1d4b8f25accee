//! Wiring from configuration to live components.

use anyhow::{bail, Context, Result};
use std::sync::Arc;
use tracing::info;
use trading_config::{AppConfig, SourceKind};
use trading_core::traits::DataSource;
use trading_core::{CancelToken, EventSink};
use trading_data::{CsvDataSource, DataSourceManager, PolygonDataSource};
use trading_indicators::IndicatorRegistry;
use trading_scanner::Scanner;

/// Validate `config` and register every configured data source.
pub async fn build_data_manager(
    config: &AppConfig,
    events: Arc<dyn EventSink>,
    shutdown: &CancelToken,
) -> Result<Arc<DataSourceManager>> {
    config
        .validate(&IndicatorRegistry::with_defaults())
        .context("Invalid configuration")?;
    if config.data_sources.is_empty() {
        bail!("No data sources configured; add a [[data_sources]] entry");
    }

    let manager = DataSourceManager::with_events(events);
    for source_config in &config.data_sources {
        let source: Arc<dyn DataSource> = match source_config.kind {
            SourceKind::Polygon => Arc::new(PolygonDataSource::new(
                source_config.polygon_config()?,
                shutdown.clone(),
            )?),
            SourceKind::Csv => {
                let path = source_config
                    .path
                    .clone()
                    .with_context(|| format!("csv source {} has no path", source_config.name))?;
                Arc::new(
                    CsvDataSource::new(source_config.name.clone(), path)?
                        .with_enabled(source_config.enabled),
                )
            }
        };
        manager.add(source).await?;
    }

    if let Some(primary) = &config.primary_source {
        manager.set_primary(primary).await?;
    }
    info!(
        sources = config.data_sources.len(),
        primary = ?manager.primary_name().await,
        "Data sources ready"
    );

    Ok(Arc::new(manager))
}

/// Build a scanner loaded with every configured strategy.
pub async fn build_scanner(
    config: &AppConfig,
    registry: Arc<IndicatorRegistry>,
    data: Arc<DataSourceManager>,
) -> Result<Scanner> {
    let scanner =
        Scanner::new(registry, data).with_default_timeframe(config.scanner.default_timeframe);
    for strategy in &config.strategies {
        scanner
            .add_strategy(strategy.clone())
            .await
            .with_context(|| format!("Failed to load strategy {}", strategy.name))?;
    }
    Ok(scanner)
}

#[cfg(test)]
mod tests {
    use super::*;
    use trading_config::{parse_config, ConfigError};
    use trading_core::NullSink;

    async fn build(toml: &str) -> Result<Arc<DataSourceManager>> {
        let config = parse_config(toml).unwrap();
        build_data_manager(&config, Arc::new(NullSink), &CancelToken::new()).await
    }

    fn config_error(err: &anyhow::Error) -> Option<&ConfigError> {
        err.chain().find_map(|cause| cause.downcast_ref::<ConfigError>())
    }

    #[tokio::test]
    async fn test_rejects_invalid_config_before_building() {
        let err = build(
            r#"
            primary_source = "nowhere"

            [[data_sources]]
            name = "offline"
            kind = "csv"
            path = "/definitely/not/here"
            "#,
        )
        .await
        .err().unwrap();
        assert!(matches!(
            config_error(&err),
            Some(ConfigError::Invalid { section: "primary_source", .. })
        ));

        let err = build(
            r#"
            [[data_sources]]
            name = "offline"
            kind = "csv"
            path = "a"

            [[data_sources]]
            name = "offline"
            kind = "csv"
            path = "b"
            "#,
        )
        .await
        .err().unwrap();
        assert!(matches!(
            config_error(&err),
            Some(ConfigError::Invalid { section: "data_sources", .. })
        ));
    }

    #[tokio::test]
    async fn test_builds_csv_source_as_primary() {
        let dir = tempfile::tempdir().unwrap();
        let toml = format!(
            r#"
            [[data_sources]]
            name = "offline"
            kind = "csv"
            path = "{}"
            "#,
            dir.path().display()
        );

        let manager = build(&toml).await.unwrap();
        assert_eq!(manager.primary_name().await.as_deref(), Some("offline"));
    }
}
