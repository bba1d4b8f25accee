//! Market data source trait definition.

use crate::error::DataError;
use crate::types::{Quote, Stock, StockData, Timeframe};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;

/// A single market data provider.
///
/// Implementations are expected to retry transient failures internally and
/// to report every failure as a [`DataError`] tagged with [`DataSource::name`].
#[async_trait]
pub trait DataSource: Send + Sync {
    /// Get the data source name.
    fn name(&self) -> &str;

    /// Whether the source is enabled by configuration.
    fn is_enabled(&self) -> bool;

    /// Probe the provider.
    async fn health_check(&self) -> Result<(), DataError>;

    /// Fetch historical bars.
    ///
    /// # Arguments
    /// * `symbol` - The symbol to fetch
    /// * `timeframe` - The bar timeframe
    /// * `start` - Start of the date range
    /// * `end` - End of the date range
    ///
    /// # Returns
    /// A vector of bars ordered from oldest to newest
    async fn get_stock_data(
        &self,
        symbol: &str,
        timeframe: Timeframe,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<StockData>, DataError>;

    /// Fetch bars for several symbols.
    ///
    /// The default implementation fetches each symbol in turn and stops at
    /// the first failure.
    async fn get_multiple_stock_data(
        &self,
        symbols: &[String],
        timeframe: Timeframe,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<HashMap<String, Vec<StockData>>, DataError> {
        let mut result = HashMap::with_capacity(symbols.len());
        for symbol in symbols {
            let bars = self.get_stock_data(symbol, timeframe, start, end).await?;
            result.insert(symbol.clone(), bars);
        }
        Ok(result)
    }

    /// Get the latest quote for a symbol.
    async fn get_real_time_quote(&self, symbol: &str) -> Result<Quote, DataError>;

    /// List the tradable symbol universe.
    async fn get_all_stocks(&self) -> Result<Vec<Stock>, DataError>;

    /// Release provider resources.
    async fn close(&self) -> Result<(), DataError> {
        Ok(())
    }
}
