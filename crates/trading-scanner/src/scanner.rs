//! Strategy evaluation against live market data.

use chrono::{DateTime, Utc};
use futures::stream::{self, StreamExt};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};
use trading_core::error::ScanError;
use trading_core::types::{Condition, Side, Timeframe};
use trading_data::DataSourceManager;
use trading_indicators::IndicatorRegistry;

use crate::strategy::{ScanWindow, Strategy};

/// Worker budget for [`Scanner::scan_many`].
pub const MAX_CONCURRENT_SCANS: usize = 10;

/// One condition that fired for a symbol at the latest bar.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScanResult {
    pub symbol: String,
    /// Timestamp of the latest bar
    pub timestamp: DateTime<Utc>,
    /// Indicator display name
    pub indicator_name: String,
    pub condition: Condition,
    /// Latest close
    pub value: f64,
    pub threshold: f64,
    pub side: Side,
    /// Normalized strategy weight of the indicator
    pub score: f64,
}

/// Sum of the scores of one side's signals.
pub fn composite_score(results: &[ScanResult], side: Side) -> f64 {
    results
        .iter()
        .filter(|r| r.side == side)
        .map(|r| r.score)
        .sum()
}

/// Outcome of a multi-symbol scan.
///
/// Symbols without any signal are absent from `results`. Every symbol that
/// failed is listed in `errors`.
#[derive(Debug, Default)]
pub struct BatchScan {
    pub results: HashMap<String, Vec<ScanResult>>,
    pub errors: Vec<(String, ScanError)>,
}

impl BatchScan {
    /// Whether any symbol failed.
    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    /// Symbols with a non-zero composite score for `side`, best first.
    pub fn rank(&self, side: Side) -> Vec<(String, f64)> {
        let mut ranked: Vec<(String, f64)> = self
            .results
            .iter()
            .map(|(symbol, results)| (symbol.clone(), composite_score(results, side)))
            .filter(|(_, score)| *score > 0.0)
            .collect();
        ranked.sort_by(|a, b| b.1.total_cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        ranked
    }
}

/// Evaluates strategies over bars from the data source manager.
pub struct Scanner {
    registry: Arc<IndicatorRegistry>,
    data: Arc<DataSourceManager>,
    strategies: RwLock<BTreeMap<String, Strategy>>,
    default_timeframe: Timeframe,
}

impl Scanner {
    /// Create a scanner with no strategies and daily bars by default.
    pub fn new(registry: Arc<IndicatorRegistry>, data: Arc<DataSourceManager>) -> Self {
        Self {
            registry,
            data,
            strategies: RwLock::new(BTreeMap::new()),
            default_timeframe: Timeframe::Daily,
        }
    }

    /// Set the timeframe used when a scan names none.
    pub fn with_default_timeframe(mut self, timeframe: Timeframe) -> Self {
        self.default_timeframe = timeframe;
        self
    }

    /// Timeframe used when a scan names none.
    pub fn default_timeframe(&self) -> Timeframe {
        self.default_timeframe
    }

    /// Indicator registry used to build strategy indicators.
    pub fn registry(&self) -> &IndicatorRegistry {
        &self.registry
    }

    /// Validate and register a strategy.
    pub async fn add_strategy(&self, strategy: Strategy) -> Result<(), ScanError> {
        strategy.validate(&self.registry)?;
        let mut strategies = self.strategies.write().await;
        if strategies.contains_key(&strategy.name) {
            return Err(ScanError::DuplicateStrategy(strategy.name));
        }
        info!(strategy = %strategy.name, indicators = strategy.indicators.len(), "Strategy added");
        strategies.insert(strategy.name.clone(), strategy);
        Ok(())
    }

    /// Remove a strategy.
    pub async fn remove_strategy(&self, name: &str) -> Result<Strategy, ScanError> {
        self.strategies
            .write()
            .await
            .remove(name)
            .ok_or_else(|| ScanError::StrategyNotFound(name.to_string()))
    }

    /// Look up a strategy.
    pub async fn get_strategy(&self, name: &str) -> Result<Strategy, ScanError> {
        self.strategies
            .read()
            .await
            .get(name)
            .cloned()
            .ok_or_else(|| ScanError::StrategyNotFound(name.to_string()))
    }

    /// All strategies in name order.
    pub async fn strategies(&self) -> Vec<Strategy> {
        self.strategies.read().await.values().cloned().collect()
    }

    /// Scan one symbol with a strategy.
    ///
    /// # Arguments
    /// * `symbol` - Symbol to fetch and evaluate
    /// * `strategy_name` - Registered, enabled strategy
    /// * `window` - Bar range to fetch
    /// * `timeframe` - Bar timeframe, or the scanner default
    ///
    /// # Returns
    /// One result per buy or sell condition that evaluated true
    pub async fn scan_symbol(
        &self,
        symbol: &str,
        strategy_name: &str,
        window: ScanWindow,
        timeframe: Option<Timeframe>,
    ) -> Result<Vec<ScanResult>, ScanError> {
        let strategy = self.get_strategy(strategy_name).await?;
        if !strategy.enabled {
            return Err(ScanError::StrategyDisabled(strategy.name));
        }

        let timeframe = timeframe.unwrap_or(self.default_timeframe);
        let data = self
            .data
            .fetch_bars(symbol, timeframe, window.from, window.to)
            .await?;
        let latest = data
            .last()
            .ok_or_else(|| ScanError::NoData(symbol.to_string()))?;

        let mut results = Vec::new();
        for config in &strategy.indicators {
            let indicator = self
                .registry
                .create(&config.indicator_type, &config.parameters)?;
            let calculated = indicator.calculate(&data)?;
            let score = strategy.score_of(config);

            let sides = [
                (Side::Buy, config.buy_condition, config.buy_threshold),
                (Side::Sell, config.sell_condition, config.sell_threshold),
            ];
            for (side, condition, threshold) in sides {
                let Some(condition) = condition else {
                    continue;
                };
                if indicator.evaluate_condition(&calculated, condition, threshold)? {
                    results.push(ScanResult {
                        symbol: symbol.to_string(),
                        timestamp: latest.timestamp,
                        indicator_name: config.display_name().to_string(),
                        condition,
                        value: latest.close,
                        threshold,
                        side,
                        score,
                    });
                }
            }
        }

        debug!(symbol, strategy = strategy_name, signals = results.len(), "Symbol scanned");
        Ok(results)
    }

    /// Scan many symbols with at most [`MAX_CONCURRENT_SCANS`] in flight.
    ///
    /// A failing symbol does not stop the others.
    pub async fn scan_many(
        &self,
        symbols: &[String],
        strategy_name: &str,
        window: ScanWindow,
        timeframe: Option<Timeframe>,
    ) -> BatchScan {
        let outcomes: Vec<(String, Result<Vec<ScanResult>, ScanError>)> = stream::iter(symbols)
            .map(|symbol| async move {
                let outcome = self.scan_symbol(symbol, strategy_name, window, timeframe).await;
                (symbol.clone(), outcome)
            })
            .buffer_unordered(MAX_CONCURRENT_SCANS)
            .collect()
            .await;

        let mut batch = BatchScan::default();
        for (symbol, outcome) in outcomes {
            match outcome {
                Ok(results) if results.is_empty() => {}
                Ok(results) => {
                    batch.results.insert(symbol, results);
                }
                Err(err) => {
                    warn!(symbol = %symbol, error = %err, "Symbol scan failed");
                    batch.errors.push((symbol, err));
                }
            }
        }

        info!(
            strategy = strategy_name,
            symbols = symbols.len(),
            with_signals = batch.results.len(),
            failed = batch.errors.len(),
            "Batch scan complete"
        );
        batch
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::strategy::IndicatorConfig;
    use chrono::Duration;
    use trading_core::types::StockData;
    use trading_data::MemoryDataSource;

    fn bars(symbol: &str, closes: &[f64]) -> Vec<StockData> {
        let start = Utc::now() - Duration::days(closes.len() as i64);
        closes
            .iter()
            .enumerate()
            .map(|(i, &c)| StockData::new(symbol, start + Duration::days(i as i64), c, c, c, c, 1_000))
            .collect()
    }

    fn rising(n: usize) -> Vec<f64> {
        (0..n).map(|i| 100.0 + i as f64).collect()
    }

    fn falling(n: usize) -> Vec<f64> {
        (0..n).map(|i| 200.0 - i as f64).collect()
    }

    fn trend_strategy() -> Strategy {
        Strategy::new("trend")
            .with_indicator(
                IndicatorConfig::new("SMA")
                    .param("period", 5)
                    .buy_when(Condition::Increasing, 0.0)
                    .sell_when(Condition::Decreasing, 0.0)
                    .weight(3.0),
            )
            .with_indicator(
                IndicatorConfig::new("RSI")
                    .param("period", 5)
                    .buy_when(Condition::AboveThreshold, 60.0)
                    .sell_when(Condition::BelowThreshold, 40.0)
                    .weight(1.0),
            )
    }

    async fn scanner_with(source: MemoryDataSource) -> Scanner {
        let manager = DataSourceManager::new();
        manager.add(Arc::new(source)).await.unwrap();
        let scanner = Scanner::new(Arc::new(IndicatorRegistry::with_defaults()), Arc::new(manager));
        scanner.add_strategy(trend_strategy()).await.unwrap();
        scanner
    }

    #[tokio::test]
    async fn test_scan_symbol_scores_buy_signals() {
        let source = MemoryDataSource::new("mem").with_bars("AAPL", bars("AAPL", &rising(30)));
        let scanner = scanner_with(source).await;

        let results = scanner
            .scan_symbol("AAPL", "trend", ScanWindow::lookback(60).unwrap(), None)
            .await
            .unwrap();

        assert_eq!(results.len(), 2);
        assert!(results.iter().all(|r| r.side == Side::Buy));
        assert_eq!(results[0].indicator_name, "SMA");
        assert_eq!(results[0].score, 0.75);
        assert_eq!(results[1].condition, Condition::AboveThreshold);
        assert_eq!(results[1].score, 0.25);
        assert_eq!(results[1].value, 129.0);
        assert_eq!(composite_score(&results, Side::Buy), 1.0);
        assert_eq!(composite_score(&results, Side::Sell), 0.0);
    }

    #[tokio::test]
    async fn test_zero_weights_split_equally() {
        let source = MemoryDataSource::new("mem").with_bars("MSFT", bars("MSFT", &falling(30)));
        let scanner = scanner_with(source).await;

        let mut equal = trend_strategy();
        equal.name = "equal".to_string();
        for indicator in &mut equal.indicators {
            indicator.weight = 0.0;
        }
        scanner.add_strategy(equal).await.unwrap();

        let results = scanner
            .scan_symbol(
                "MSFT",
                "equal",
                ScanWindow::lookback(60).unwrap(),
                Some(Timeframe::Daily),
            )
            .await
            .unwrap();
        assert_eq!(results.len(), 2);
        assert!(results.iter().all(|r| r.side == Side::Sell && r.score == 0.5));
    }

    #[tokio::test]
    async fn test_scan_symbol_errors() {
        let source = MemoryDataSource::new("mem")
            .with_bars("AAPL", bars("AAPL", &rising(30)))
            .with_bars("SHORT", bars("SHORT", &rising(3)));
        let scanner = scanner_with(source).await;
        let window = ScanWindow::lookback(60).unwrap();

        assert!(matches!(
            scanner.scan_symbol("AAPL", "missing", window, None).await,
            Err(ScanError::StrategyNotFound(_))
        ));

        let mut off = trend_strategy();
        off.name = "off".to_string();
        off.enabled = false;
        scanner.add_strategy(off).await.unwrap();
        assert!(matches!(
            scanner.scan_symbol("AAPL", "off", window, None).await,
            Err(ScanError::StrategyDisabled(_))
        ));

        let stale = ScanWindow::new(Utc::now() - Duration::days(900), Utc::now() - Duration::days(800));
        assert!(matches!(
            scanner.scan_symbol("AAPL", "trend", stale, None).await,
            Err(ScanError::NoData(_))
        ));

        assert!(matches!(
            scanner.scan_symbol("SHORT", "trend", window, None).await,
            Err(ScanError::Indicator(_))
        ));
        assert!(matches!(
            scanner.scan_symbol("TSLA", "trend", window, None).await,
            Err(ScanError::Data(_))
        ));
    }

    #[tokio::test]
    async fn test_strategy_management() {
        let scanner = scanner_with(MemoryDataSource::new("mem")).await;

        assert!(matches!(
            scanner.add_strategy(trend_strategy()).await,
            Err(ScanError::DuplicateStrategy(_))
        ));
        assert_eq!(scanner.strategies().await.len(), 1);
        assert_eq!(scanner.remove_strategy("trend").await.unwrap().name, "trend");
        assert!(scanner.get_strategy("trend").await.is_err());
        assert!(scanner.remove_strategy("trend").await.is_err());
    }

    #[tokio::test]
    async fn test_scan_many_isolates_failures() {
        let mut source = MemoryDataSource::new("mem");
        let mut symbols = Vec::new();
        for i in 0..15 {
            let symbol = format!("UP{}", i);
            source = source.with_bars(symbol.clone(), bars(&symbol, &rising(30)));
            symbols.push(symbol);
        }
        source = source.with_bars("FLAT", bars("FLAT", &[50.0; 30]));
        symbols.push("FLAT".to_string());
        symbols.push("GONE".to_string());
        let scanner = scanner_with(source).await;

        let batch = scanner
            .scan_many(&symbols, "trend", ScanWindow::lookback(60).unwrap(), None)
            .await;

        // A flat series has no losses, so only RSI fires.
        assert_eq!(batch.results.len(), 16);
        assert_eq!(batch.results["FLAT"].len(), 1);
        assert!(batch.has_errors());
        assert_eq!(batch.errors.len(), 1);
        assert_eq!(batch.errors[0].0, "GONE");

        let ranked = batch.rank(Side::Buy);
        assert_eq!(ranked.len(), 16);
        assert_eq!(ranked[0], ("UP0".to_string(), 1.0));
        assert_eq!(ranked[15], ("FLAT".to_string(), 0.25));
        assert!(batch.rank(Side::Sell).is_empty());
    }
}
