//! OHLCV bar data.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One OHLCV bar for a symbol at a timestamp.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StockData {
    /// Symbol
    pub symbol: String,
    /// Bar open time
    pub timestamp: DateTime<Utc>,
    /// Opening price
    pub open: f64,
    /// Highest price
    pub high: f64,
    /// Lowest price
    pub low: f64,
    /// Closing price
    pub close: f64,
    /// Traded volume
    pub volume: u64,
    /// Volume-weighted average price (optional)
    pub vwap: Option<f64>,
    /// Source-tagged transaction id
    pub transaction_id: Option<String>,
}

impl StockData {
    /// Create a new bar.
    pub fn new(
        symbol: impl Into<String>,
        timestamp: DateTime<Utc>,
        open: f64,
        high: f64,
        low: f64,
        close: f64,
        volume: u64,
    ) -> Self {
        Self {
            symbol: symbol.into(),
            timestamp,
            open,
            high,
            low,
            close,
            volume,
            vwap: None,
            transaction_id: None,
        }
    }

    /// Set the VWAP.
    pub fn with_vwap(mut self, vwap: f64) -> Self {
        self.vwap = Some(vwap);
        self
    }

    /// Tag the bar with a transaction id.
    pub fn with_transaction_id(mut self, id: impl Into<String>) -> Self {
        self.transaction_id = Some(id.into());
        self
    }

    /// Calculate the typical price (HLC average).
    #[inline]
    pub fn typical_price(&self) -> f64 {
        (self.high + self.low + self.close) / 3.0
    }
}

/// Extract the close series of a bar slice.
pub fn close_prices(data: &[StockData]) -> Vec<f64> {
    data.iter().map(|bar| bar.close).collect()
}
