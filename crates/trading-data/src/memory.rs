//! In-memory data source.
//!
//! Holds preloaded bars and quotes. Serves replays and stands in for a
//! network provider in tests, including simulated outages.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::Duration;
use trading_core::error::{DataError, SourceError, SourceErrorCode};
use trading_core::traits::DataSource;
use trading_core::types::{Quote, Stock, StockData, Timeframe};

#[derive(Debug, Default)]
struct Store {
    bars: HashMap<String, Vec<StockData>>,
    quotes: HashMap<String, Quote>,
}

/// Data source backed by in-memory maps.
#[derive(Debug)]
pub struct MemoryDataSource {
    name: String,
    enabled: AtomicBool,
    failing: AtomicBool,
    latency: Duration,
    calls: AtomicUsize,
    store: RwLock<Store>,
}

impl MemoryDataSource {
    /// Create an empty, enabled source.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            enabled: AtomicBool::new(true),
            failing: AtomicBool::new(false),
            latency: Duration::ZERO,
            calls: AtomicUsize::new(0),
            store: RwLock::new(Store::default()),
        }
    }

    /// Preload bars for a symbol.
    pub fn with_bars(self, symbol: impl Into<String>, bars: Vec<StockData>) -> Self {
        self.set_bars(symbol, bars);
        self
    }

    /// Preload a last-trade quote for a symbol.
    pub fn with_quote(self, symbol: &str, last_price: f64) -> Self {
        self.set_quote(symbol, last_price);
        self
    }

    /// Delay every call by `latency`.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    /// Replace the bars for a symbol.
    pub fn set_bars(&self, symbol: impl Into<String>, mut bars: Vec<StockData>) {
        bars.sort_by_key(|b| b.timestamp);
        self.write().bars.insert(symbol.into(), bars);
    }

    /// Replace the quote for a symbol with a last-trade price.
    pub fn set_quote(&self, symbol: &str, last_price: f64) {
        self.set_full_quote(Quote {
            symbol: symbol.to_string(),
            timestamp: Utc::now(),
            bid_price: last_price,
            bid_size: 100,
            ask_price: last_price,
            ask_size: 100,
            last_price,
            last_size: 100,
            transaction_id: Some(format!("{}_{}", self.name, symbol)),
        });
    }

    /// Replace the quote for a symbol.
    pub fn set_full_quote(&self, quote: Quote) {
        self.write().quotes.insert(quote.symbol.clone(), quote);
    }

    /// Make every call fail with a connection error.
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// Enable or disable the source.
    pub fn set_enabled(&self, enabled: bool) {
        self.enabled.store(enabled, Ordering::SeqCst);
    }

    /// Number of calls served so far, failed ones included.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn read(&self) -> RwLockReadGuard<'_, Store> {
        match self.store.read() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    fn write(&self) -> RwLockWriteGuard<'_, Store> {
        match self.store.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    async fn enter(&self) -> Result<(), DataError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
        if self.failing.load(Ordering::SeqCst) {
            return Err(SourceError::new(
                self.name.clone(),
                SourceErrorCode::Connection,
                "simulated outage",
            )
            .into());
        }
        Ok(())
    }
}

#[async_trait]
impl DataSource for MemoryDataSource {
    fn name(&self) -> &str {
        &self.name
    }

    fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::SeqCst)
    }

    async fn health_check(&self) -> Result<(), DataError> {
        self.enter().await
    }

    async fn get_stock_data(
        &self,
        symbol: &str,
        _timeframe: Timeframe,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<StockData>, DataError> {
        self.enter().await?;
        let store = self.read();
        let bars = store
            .bars
            .get(symbol)
            .ok_or_else(|| DataError::SymbolNotFound(symbol.to_string()))?;
        Ok(bars
            .iter()
            .filter(|bar| bar.timestamp >= start && bar.timestamp <= end)
            .cloned()
            .collect())
    }

    async fn get_real_time_quote(&self, symbol: &str) -> Result<Quote, DataError> {
        self.enter().await?;
        self.read()
            .quotes
            .get(symbol)
            .cloned()
            .ok_or_else(|| DataError::SymbolNotFound(symbol.to_string()))
    }

    async fn get_all_stocks(&self) -> Result<Vec<Stock>, DataError> {
        self.enter().await?;
        let store = self.read();
        let mut symbols: Vec<&String> = store.bars.keys().chain(store.quotes.keys()).collect();
        symbols.sort();
        symbols.dedup();

        Ok(symbols
            .into_iter()
            .map(|symbol| Stock {
                symbol: symbol.clone(),
                name: symbol.clone(),
                exchange: String::new(),
                security_type: "CS".to_string(),
                currency: "USD".to_string(),
                is_active: true,
                description: None,
            })
            .collect())
    }
}
