//! CSV data source.
//!
//! Serves bars from a directory of `{SYMBOL}.csv` OHLCV files. Useful for
//! offline scans and as a failover behind a network source.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use csv::ReaderBuilder;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::debug;
use trading_core::error::{DataError, SourceError, SourceErrorCode};
use trading_core::traits::DataSource;
use trading_core::types::{Quote, Stock, StockData, Timeframe};

/// CSV record format.
#[derive(Debug, Deserialize)]
struct CsvRecord {
    #[serde(alias = "Date", alias = "date", alias = "timestamp", alias = "Timestamp")]
    date: String,
    #[serde(alias = "Open", alias = "open")]
    open: f64,
    #[serde(alias = "High", alias = "high")]
    high: f64,
    #[serde(alias = "Low", alias = "low")]
    low: f64,
    #[serde(alias = "Close", alias = "close", alias = "Adj Close")]
    close: f64,
    #[serde(alias = "Volume", alias = "volume", default)]
    volume: f64,
}

/// CSV data source for historical data.
pub struct CsvDataSource {
    name: String,
    dir: PathBuf,
    enabled: bool,
}

impl CsvDataSource {
    /// Create a new CSV data source over `dir`.
    pub fn new(name: impl Into<String>, dir: impl Into<PathBuf>) -> Result<Self, DataError> {
        let dir = dir.into();
        if !dir.is_dir() {
            return Err(DataError::NoDataAvailable(dir.display().to_string()));
        }
        Ok(Self {
            name: name.into(),
            dir,
            enabled: true,
        })
    }

    /// Set whether the source takes part in fetches.
    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    /// Directory the source reads from.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Locate the file holding `symbol` directly inside the data directory.
    fn find_file(&self, symbol: &str) -> Option<PathBuf> {
        let plain = !symbol.is_empty()
            && !symbol.contains("..")
            && !symbol.contains(|c: char| c == '/' || c == '\\' || c == '\0');
        if !plain {
            return None;
        }
        let candidates = [
            format!("{}.csv", symbol),
            format!("{}.csv", symbol.to_uppercase()),
            format!("{}.csv", symbol.to_lowercase()),
            format!("{}_daily.csv", symbol.to_uppercase()),
            format!("{}_daily.csv", symbol.to_lowercase()),
        ];
        candidates
            .iter()
            .map(|file| self.dir.join(file))
            .find(|path| path.is_file())
    }

    /// Load every bar for `symbol`, oldest first.
    fn load_symbol(&self, symbol: &str) -> Result<Vec<StockData>, DataError> {
        let path = self
            .find_file(symbol)
            .ok_or_else(|| DataError::SymbolNotFound(symbol.to_string()))?;
        self.load_from_path(&path, symbol)
    }

    /// Load bars from a specific path.
    fn load_from_path(&self, path: &Path, symbol: &str) -> Result<Vec<StockData>, DataError> {
        let mut reader = ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .from_path(path)
            .map_err(|e| self.parse_error(format!("{}: {}", path.display(), e)))?;

        let mut bars = Vec::new();

        for result in reader.deserialize() {
            let record: CsvRecord = result.map_err(|e| self.parse_error(e.to_string()))?;
            let timestamp = parse_timestamp(&record.date)?;

            bars.push(
                StockData::new(
                    symbol,
                    timestamp,
                    record.open,
                    record.high,
                    record.low,
                    record.close,
                    record.volume.max(0.0) as u64,
                )
                .with_transaction_id(format!("{}_{}_{}", self.name, symbol, timestamp.timestamp_millis())),
            );
        }

        // Sort by timestamp
        bars.sort_by_key(|b| b.timestamp);

        Ok(bars)
    }

    fn parse_error(&self, message: String) -> DataError {
        SourceError::new(self.name.clone(), SourceErrorCode::ResponseParse, message).into()
    }
}

/// Parse various timestamp formats.
fn parse_timestamp(date_str: &str) -> Result<DateTime<Utc>, DataError> {
    let formats = [
        "%Y-%m-%d",
        "%Y-%m-%d %H:%M:%S",
        "%Y-%m-%dT%H:%M:%S",
        "%Y/%m/%d",
        "%m/%d/%Y",
        "%d-%m-%Y",
    ];

    for format in formats {
        if let Ok(dt) = NaiveDateTime::parse_from_str(date_str, format) {
            return Ok(dt.and_utc());
        }
        if let Ok(d) = NaiveDate::parse_from_str(date_str, format) {
            if let Some(dt) = d.and_hms_opt(0, 0, 0) {
                return Ok(dt.and_utc());
            }
        }
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(date_str) {
        return Ok(dt.with_timezone(&Utc));
    }

    // Unix timestamp, milliseconds if more than 10 digits
    if let Ok(ts) = date_str.parse::<i64>() {
        let parsed = if ts > 10_000_000_000 {
            DateTime::from_timestamp_millis(ts)
        } else {
            DateTime::from_timestamp(ts, 0)
        };
        if let Some(dt) = parsed {
            return Ok(dt);
        }
    }

    Err(DataError::ParseError(format!(
        "Could not parse date: {}",
        date_str
    )))
}

#[async_trait]
impl DataSource for CsvDataSource {
    fn name(&self) -> &str {
        &self.name
    }

    fn is_enabled(&self) -> bool {
        self.enabled
    }

    async fn health_check(&self) -> Result<(), DataError> {
        if self.dir.is_dir() {
            Ok(())
        } else {
            Err(SourceError::new(
                self.name.clone(),
                SourceErrorCode::Connection,
                format!("Directory not found: {}", self.dir.display()),
            )
            .into())
        }
    }

    async fn get_stock_data(
        &self,
        symbol: &str,
        timeframe: Timeframe,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<StockData>, DataError> {
        let mut bars = self.load_symbol(symbol)?;
        bars.retain(|bar| bar.timestamp >= start && bar.timestamp <= end);
        debug!(source = %self.name, symbol, %timeframe, bars = bars.len(), "Loaded CSV bars");
        Ok(bars)
    }

    async fn get_real_time_quote(&self, symbol: &str) -> Result<Quote, DataError> {
        let bars = self.load_symbol(symbol)?;
        let last = bars
            .last()
            .ok_or_else(|| DataError::NoDataAvailable(symbol.to_string()))?;

        Ok(Quote {
            symbol: symbol.to_string(),
            timestamp: last.timestamp,
            bid_price: last.close,
            bid_size: 0,
            ask_price: last.close,
            ask_size: 0,
            last_price: last.close,
            last_size: 0,
            transaction_id: last.transaction_id.clone(),
        })
    }

    async fn get_all_stocks(&self) -> Result<Vec<Stock>, DataError> {
        let entries = std::fs::read_dir(&self.dir).map_err(|e| {
            SourceError::new(
                self.name.clone(),
                SourceErrorCode::Connection,
                format!("Failed to list {}: {}", self.dir.display(), e),
            )
        })?;

        let mut symbols: Vec<String> = entries
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.path())
            .filter(|path| path.extension().is_some_and(|ext| ext == "csv"))
            .filter_map(|path| {
                let stem = path.file_stem()?.to_str()?;
                Some(stem.trim_end_matches("_daily").to_uppercase())
            })
            .collect();
        symbols.sort();
        symbols.dedup();

        Ok(symbols
            .into_iter()
            .map(|symbol| Stock {
                name: symbol.clone(),
                symbol,
                exchange: String::new(),
                security_type: "CS".to_string(),
                currency: "USD".to_string(),
                is_active: true,
                description: None,
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use std::fs;

    fn write_fixture(dir: &Path) {
        fs::write(
            dir.join("AAPL.csv"),
            "Date,Open,High,Low,Close,Volume\n\
             2024-01-04,12,13,11,12.5,300\n\
             2024-01-02,10,11,9,10.5,100\n\
             2024-01-03,11,12,10,11.5,200\n",
        )
        .unwrap();
        fs::write(dir.join("msft_daily.csv"), "date,open,high,low,close\n2024-01-02,1,1,1,1\n").unwrap();
        fs::write(dir.join("notes.txt"), "ignored").unwrap();
    }

    #[tokio::test]
    async fn test_symbol_cannot_leave_directory() {
        let root = tempfile::tempdir().unwrap();
        let data = root.path().join("data");
        fs::create_dir(&data).unwrap();
        write_fixture(&data);
        fs::write(root.path().join("secret.csv"), "date,close\n2024-01-02,1\n").unwrap();
        let source = CsvDataSource::new("csv", &data).unwrap();

        for symbol in ["../secret", "..", "sub/AAPL", "sub\\AAPL", ""] {
            assert!(
                matches!(
                    source.get_real_time_quote(symbol).await,
                    Err(DataError::SymbolNotFound(_))
                ),
                "{:?} escaped the data directory",
                symbol
            );
        }
        assert!(source.get_real_time_quote("AAPL").await.is_ok());
    }

    #[test]
    fn test_parse_timestamp() {
        let day = Utc.with_ymd_and_hms(2024, 1, 15, 0, 0, 0).unwrap();

        assert_eq!(parse_timestamp("2024-01-15").unwrap(), day);
        assert_eq!(parse_timestamp("01/15/2024").unwrap(), day);
        assert!(parse_timestamp("2024-01-15 10:30:00").is_ok());
        assert!(parse_timestamp("2024-01-15T10:30:00Z").is_ok());
        assert_eq!(parse_timestamp("1705276800000").unwrap(), day); // Unix ms
        assert_eq!(parse_timestamp("1705276800").unwrap(), day); // Unix sec
        assert!(parse_timestamp("yesterday").is_err());
    }

    #[test]
    fn test_missing_directory() {
        assert!(CsvDataSource::new("csv", "/definitely/not/here").is_err());
    }

    #[tokio::test]
    async fn test_loads_sorted_bars_in_range() {
        let dir = tempfile::tempdir().unwrap();
        write_fixture(dir.path());
        let source = CsvDataSource::new("csv", dir.path()).unwrap();

        let start = Utc.with_ymd_and_hms(2024, 1, 3, 0, 0, 0).unwrap();
        let end = Utc.with_ymd_and_hms(2024, 1, 31, 0, 0, 0).unwrap();
        let bars = source.get_stock_data("AAPL", Timeframe::Daily, start, end).await.unwrap();

        let closes: Vec<f64> = bars.iter().map(|b| b.close).collect();
        assert_eq!(closes, vec![11.5, 12.5]);
        assert_eq!(bars[0].volume, 200);
        assert_eq!(bars[0].symbol, "AAPL");
    }

    #[tokio::test]
    async fn test_quote_from_last_bar() {
        let dir = tempfile::tempdir().unwrap();
        write_fixture(dir.path());
        let source = CsvDataSource::new("csv", dir.path()).unwrap();

        let quote = source.get_real_time_quote("AAPL").await.unwrap();
        assert_eq!(quote.last_price, 12.5);
        assert_eq!(quote.trade_price(), Some(12.5));

        let quote = source.get_real_time_quote("MSFT").await.unwrap();
        assert_eq!(quote.last_price, 1.0);

        assert!(matches!(
            source.get_real_time_quote("TSLA").await,
            Err(DataError::SymbolNotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_lists_symbols() {
        let dir = tempfile::tempdir().unwrap();
        write_fixture(dir.path());
        let source = CsvDataSource::new("csv", dir.path()).unwrap();

        let stocks = source.get_all_stocks().await.unwrap();
        let symbols: Vec<&str> = stocks.iter().map(|s| s.symbol.as_str()).collect();
        assert_eq!(symbols, vec!["AAPL", "MSFT"]);
        assert!(source.health_check().await.is_ok());
    }

    #[tokio::test]
    async fn test_malformed_rows_are_parse_errors() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("BAD.csv"), "Date,Open,High,Low,Close\n2024-01-02,x,1,1,1\n").unwrap();
        let source = CsvDataSource::new("csv", dir.path()).unwrap();

        let err = source
            .get_stock_data("BAD", Timeframe::Daily, Utc::now(), Utc::now())
            .await
            .unwrap_err();
        assert_eq!(err.source_error().unwrap().code, SourceErrorCode::ResponseParse);
    }
}
