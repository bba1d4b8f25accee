//! Data source manager with primary selection and failover.

use chrono::{DateTime, Utc};
use futures::stream::{FuturesUnordered, StreamExt};
use std::collections::BTreeMap;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};
use trading_core::error::{DataError, SourceError, SourceErrorCode};
use trading_core::traits::DataSource;
use trading_core::types::{Quote, Stock, StockData, Timeframe};
use trading_core::{CancelToken, EventSink, NullSink, TradeEvent};

/// Per-source bound on a health probe.
pub const HEALTH_CHECK_TIMEOUT: Duration = Duration::from_secs(10);

/// Outcome of one health probe per source name.
pub type HealthReport = BTreeMap<String, Result<(), DataError>>;

#[derive(Default)]
struct Registry {
    sources: BTreeMap<String, Arc<dyn DataSource>>,
    primary: Option<String>,
}

/// Owns the registered data sources and routes fetches through them.
///
/// Fetches try the primary source first, then every other enabled source
/// in name order, returning the first success.
pub struct DataSourceManager {
    registry: RwLock<Registry>,
    events: Arc<dyn EventSink>,
    health_timeout: Duration,
}

impl DataSourceManager {
    /// Create an empty manager that discards events.
    pub fn new() -> Self {
        Self::with_events(Arc::new(NullSink))
    }

    /// Create an empty manager reporting health failures to `events`.
    pub fn with_events(events: Arc<dyn EventSink>) -> Self {
        Self {
            registry: RwLock::new(Registry::default()),
            events,
            health_timeout: HEALTH_CHECK_TIMEOUT,
        }
    }

    /// Override the per-source health probe timeout.
    pub fn with_health_timeout(mut self, timeout: Duration) -> Self {
        self.health_timeout = timeout;
        self
    }

    /// Register a source. The first source added becomes primary.
    pub async fn add(&self, source: Arc<dyn DataSource>) -> Result<(), DataError> {
        let name = source.name().to_string();
        let mut registry = self.registry.write().await;
        if registry.sources.contains_key(&name) {
            return Err(DataError::DuplicateSource(name));
        }
        if registry.sources.is_empty() {
            registry.primary = Some(name.clone());
        }
        registry.sources.insert(name.clone(), source);
        info!(source = %name, "Data source registered");
        Ok(())
    }

    /// Unregister and close a source.
    ///
    /// Removing the primary promotes the first remaining source by name.
    pub async fn remove(&self, name: &str) -> Result<(), DataError> {
        let source = {
            let mut registry = self.registry.write().await;
            let source = registry
                .sources
                .remove(name)
                .ok_or_else(|| DataError::SourceNotFound(name.to_string()))?;
            if registry.primary.as_deref() == Some(name) {
                registry.primary = registry.sources.keys().next().cloned();
                if let Some(primary) = &registry.primary {
                    info!(source = %primary, "Primary data source reassigned");
                }
            }
            source
        };
        source.close().await
    }

    /// Look up a source by name.
    pub async fn get(&self, name: &str) -> Result<Arc<dyn DataSource>, DataError> {
        self.registry
            .read()
            .await
            .sources
            .get(name)
            .cloned()
            .ok_or_else(|| DataError::SourceNotFound(name.to_string()))
    }

    /// The primary source.
    pub async fn primary(&self) -> Result<Arc<dyn DataSource>, DataError> {
        let registry = self.registry.read().await;
        registry
            .primary
            .as_ref()
            .and_then(|name| registry.sources.get(name))
            .cloned()
            .ok_or(DataError::NoSourcesAvailable)
    }

    /// Name of the primary source.
    pub async fn primary_name(&self) -> Option<String> {
        self.registry.read().await.primary.clone()
    }

    /// Make a registered source primary.
    pub async fn set_primary(&self, name: &str) -> Result<(), DataError> {
        let mut registry = self.registry.write().await;
        if !registry.sources.contains_key(name) {
            return Err(DataError::SourceNotFound(name.to_string()));
        }
        registry.primary = Some(name.to_string());
        Ok(())
    }

    /// Snapshot of every registered source in name order.
    pub async fn sources(&self) -> Vec<Arc<dyn DataSource>> {
        self.registry.read().await.sources.values().cloned().collect()
    }

    /// Enabled sources in failover order: primary first, then by name.
    async fn candidates(&self) -> Vec<Arc<dyn DataSource>> {
        let registry = self.registry.read().await;
        let primary = registry
            .primary
            .as_ref()
            .and_then(|name| registry.sources.get(name))
            .filter(|source| source.is_enabled())
            .cloned();
        let rest = registry
            .sources
            .iter()
            .filter(|(name, source)| Some(name.as_str()) != registry.primary.as_deref() && source.is_enabled())
            .map(|(_, source)| source.clone());
        primary.into_iter().chain(rest).collect()
    }

    /// Run `call` against each candidate until one succeeds.
    async fn failover<T, F, Fut>(&self, operation: &str, mut call: F) -> Result<T, DataError>
    where
        F: FnMut(Arc<dyn DataSource>) -> Fut,
        Fut: Future<Output = Result<T, DataError>>,
    {
        let candidates = self.candidates().await;
        if candidates.is_empty() {
            return Err(DataError::NoSourcesAvailable);
        }

        let mut last_error = None;
        for source in candidates {
            let name = source.name().to_string();
            match call(source).await {
                Ok(value) => {
                    debug!(source = %name, operation, "Data source call succeeded");
                    return Ok(value);
                }
                Err(err) => {
                    warn!(source = %name, operation, error = %err, "Data source call failed, trying next source");
                    last_error = Some(err);
                }
            }
        }

        Err(DataError::AllSourcesFailed(Box::new(
            last_error.unwrap_or(DataError::NoSourcesAvailable),
        )))
    }

    /// Fetch historical bars with failover.
    pub async fn fetch_bars(
        &self,
        symbol: &str,
        timeframe: Timeframe,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<StockData>, DataError> {
        self.failover("fetch_bars", |source| async move {
            source.get_stock_data(symbol, timeframe, start, end).await
        })
        .await
    }

    /// Fetch a live quote with failover.
    pub async fn fetch_quote(&self, symbol: &str) -> Result<Quote, DataError> {
        self.failover("fetch_quote", |source| async move {
            source.get_real_time_quote(symbol).await
        })
        .await
    }

    /// Fetch the tradable symbol universe with failover.
    pub async fn fetch_stocks(&self) -> Result<Vec<Stock>, DataError> {
        self.failover("fetch_stocks", |source| async move { source.get_all_stocks().await })
            .await
    }

    /// Probe every source concurrently.
    ///
    /// Disabled sources report a `DISABLED` error without a probe. Probes
    /// still running when `cancel` fires report `CONTEXT_CANCELLED`.
    pub async fn health_check_all(&self, cancel: &CancelToken) -> HealthReport {
        let sources = self.sources().await;
        let mut report = HealthReport::new();
        let mut pending = FuturesUnordered::new();

        for source in sources {
            let name = source.name().to_string();
            if !source.is_enabled() {
                let err = SourceError::new(name.clone(), SourceErrorCode::Disabled, "data source is disabled");
                report.insert(name, Err(err.into()));
                continue;
            }

            let limit = self.health_timeout;
            report.insert(
                name.clone(),
                Err(SourceError::new(name.clone(), SourceErrorCode::Cancelled, "health check cancelled").into()),
            );
            pending.push(async move {
                let outcome = match tokio::time::timeout(limit, source.health_check()).await {
                    Ok(outcome) => outcome,
                    Err(_) => Err(SourceError::new(
                        name.clone(),
                        SourceErrorCode::Timeout,
                        format!("health check timed out after {:?}", limit),
                    )
                    .into()),
                };
                (name, outcome)
            });
        }

        loop {
            tokio::select! {
                next = pending.next() => match next {
                    Some((name, outcome)) => {
                        report.insert(name, outcome);
                    }
                    None => break,
                },
                _ = cancel.cancelled() => {
                    warn!(remaining = pending.len(), "Health checks cancelled");
                    break;
                }
            }
        }

        for (name, outcome) in &report {
            if let Err(err) = outcome {
                warn!(source = %name, error = %err, "Health check failed");
                self.events.emit(TradeEvent::HealthCheckFailed {
                    source_name: name.clone(),
                    code: err.source_error().map(|e| e.code),
                    message: err.to_string(),
                    at: Utc::now(),
                });
            }
        }

        report
    }

    /// Close every source, attempting all of them.
    ///
    /// Returns the last close error, if any.
    pub async fn close_all(&self) -> Result<(), DataError> {
        let mut result = Ok(());
        for source in self.sources().await {
            if let Err(err) = source.close().await {
                warn!(source = %source.name(), error = %err, "Failed to close data source");
                result = Err(err);
            }
        }
        result
    }
}

impl Default for DataSourceManager {
    fn default() -> Self {
        Self::new()
    }
}
