//! Watchlist store, scan and execution.

use chrono::Utc;
use rust_decimal::Decimal;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info, warn};
use trading_core::error::WatchlistError;
use trading_core::events::{EventSink, NullSink, TradeEvent};
use trading_core::traits::Broker;
use trading_core::types::OrderRequest;
use trading_core::CancelToken;
use trading_data::DataSourceManager;
use uuid::Uuid;

use crate::item::{ItemStatus, WatchlistItem};

/// Price-triggered watchlist.
///
/// Quotes come from the data source manager and orders go to the broker.
/// The item lock is never held across either call.
pub struct Watchlist {
    items: RwLock<HashMap<String, WatchlistItem>>,
    broker: Arc<dyn Broker>,
    data: Arc<DataSourceManager>,
    events: Arc<dyn EventSink>,
}

impl Watchlist {
    pub fn new(broker: Arc<dyn Broker>, data: Arc<DataSourceManager>) -> Self {
        Self {
            items: RwLock::new(HashMap::new()),
            broker,
            data,
            events: Arc::new(NullSink),
        }
    }

    /// Send trigger events to `events`.
    pub fn with_events(mut self, events: Arc<dyn EventSink>) -> Self {
        self.events = events;
        self
    }

    fn validate(item: &WatchlistItem) -> Result<(), WatchlistError> {
        if item.symbol.trim().is_empty() {
            return Err(WatchlistError::InvalidSymbol(item.symbol.clone()));
        }
        if item.quantity <= Decimal::ZERO {
            return Err(WatchlistError::InvalidQuantity(item.quantity));
        }
        Ok(())
    }

    /// Insert an item, generating its id when empty. Returns the id.
    ///
    /// An item with the same id is replaced.
    pub async fn add_item(&self, mut item: WatchlistItem) -> Result<String, WatchlistError> {
        Self::validate(&item)?;
        if item.id.is_empty() {
            item.id = format!("watch-{}-{}", item.symbol, Uuid::new_v4().simple());
        }
        item.updated_at = Utc::now();

        let id = item.id.clone();
        info!(item_id = %id, symbol = %item.symbol, side = %item.side, "Watchlist item added");
        self.items.write().await.insert(id.clone(), item);
        Ok(id)
    }

    /// Replace an item, keeping its id and `added_at`.
    pub async fn update_item(&self, id: &str, mut item: WatchlistItem) -> Result<(), WatchlistError> {
        Self::validate(&item)?;
        let mut items = self.items.write().await;
        let existing = items
            .get(id)
            .ok_or_else(|| WatchlistError::ItemNotFound(id.to_string()))?;
        item.id = existing.id.clone();
        item.added_at = existing.added_at;
        item.updated_at = Utc::now();
        items.insert(id.to_string(), item);
        Ok(())
    }

    pub async fn remove_item(&self, id: &str) -> Result<WatchlistItem, WatchlistError> {
        self.items
            .write()
            .await
            .remove(id)
            .ok_or_else(|| WatchlistError::ItemNotFound(id.to_string()))
    }

    pub async fn get_item(&self, id: &str) -> Result<WatchlistItem, WatchlistError> {
        self.items
            .read()
            .await
            .get(id)
            .cloned()
            .ok_or_else(|| WatchlistError::ItemNotFound(id.to_string()))
    }

    /// Oldest item for `symbol`, optionally only among active items.
    pub async fn get_item_by_symbol(
        &self,
        symbol: &str,
        active_only: bool,
    ) -> Result<WatchlistItem, WatchlistError> {
        self.items
            .read()
            .await
            .values()
            .filter(|item| item.symbol == symbol && (!active_only || item.is_active()))
            .min_by(|a, b| a.added_at.cmp(&b.added_at).then_with(|| a.id.cmp(&b.id)))
            .cloned()
            .ok_or_else(|| WatchlistError::ItemNotFound(symbol.to_string()))
    }

    /// Active items, oldest first.
    pub async fn list_active(&self) -> Vec<WatchlistItem> {
        let mut items: Vec<_> = self
            .items
            .read()
            .await
            .values()
            .filter(|item| item.is_active())
            .cloned()
            .collect();
        sort_items(&mut items);
        items
    }

    /// Every item, oldest first.
    pub async fn list_all(&self) -> Vec<WatchlistItem> {
        let mut items: Vec<_> = self.items.read().await.values().cloned().collect();
        sort_items(&mut items);
        items
    }

    /// Move an item from `active` to `status`; no-op if it changed meanwhile.
    async fn transition(&self, id: &str, status: ItemStatus) -> Option<WatchlistItem> {
        let mut items = self.items.write().await;
        let item = items.get_mut(id).filter(|item| item.is_active())?;
        let now = Utc::now();
        item.status = status;
        item.updated_at = now;
        if status == ItemStatus::Triggered {
            item.triggered_at = Some(now);
        }
        Some(item.clone())
    }

    /// Check every active item against its latest quote.
    ///
    /// Expired items are marked `expired` and never fire. An item whose
    /// quote cannot be fetched stays active for the next scan.
    ///
    /// # Returns
    /// The items that fired during this scan
    pub async fn scan(&self) -> Vec<WatchlistItem> {
        let mut triggered = Vec::new();

        for item in self.list_active().await {
            if item.is_expired(Utc::now()) {
                if self.transition(&item.id, ItemStatus::Expired).await.is_some() {
                    info!(item_id = %item.id, symbol = %item.symbol, "Watchlist item expired");
                }
                continue;
            }

            let quote = match self.data.fetch_quote(&item.symbol).await {
                Ok(quote) => quote,
                Err(err) => {
                    warn!(item_id = %item.id, symbol = %item.symbol, error = %err, "Quote unavailable, skipping item");
                    continue;
                }
            };
            let Some(last_price) = quote.trade_price_decimal() else {
                debug!(item_id = %item.id, symbol = %item.symbol, "Quote has no usable price");
                continue;
            };
            if !item.should_trigger(last_price) {
                continue;
            }

            if let Some(fired) = self.transition(&item.id, ItemStatus::Triggered).await {
                let triggered_at = fired.triggered_at.unwrap_or_else(Utc::now);
                info!(
                    item_id = %fired.id,
                    symbol = %fired.symbol,
                    side = %fired.side,
                    last_price = %last_price,
                    "Watchlist item triggered"
                );
                self.events.emit(TradeEvent::WatchlistTriggered {
                    item_id: fired.id.clone(),
                    symbol: fired.symbol.clone(),
                    side: fired.side,
                    last_price,
                    triggered_at,
                });
                triggered.push(fired);
            }
        }

        triggered
    }

    /// Submit a market order for each triggered item.
    ///
    /// # Returns
    /// One error per item whose order could not be submitted
    pub async fn execute(&self, triggered: &[WatchlistItem]) -> Vec<WatchlistError> {
        let mut errors = Vec::new();

        for item in triggered {
            let request = OrderRequest::market(item.symbol.clone(), item.side, item.quantity)
                .with_client_order_id(item.id.clone());
            match self.broker.submit_order(request).await {
                Ok(order) => {
                    info!(
                        item_id = %item.id,
                        order_id = %order.id,
                        status = %order.status,
                        "Watchlist order submitted"
                    );
                    if let Some(stored) = self.items.write().await.get_mut(&item.id) {
                        stored.order_id = Some(order.id);
                        stored.updated_at = Utc::now();
                    }
                }
                Err(source) => errors.push(WatchlistError::Execution {
                    item_id: item.id.clone(),
                    symbol: item.symbol.clone(),
                    source,
                }),
            }
        }

        errors
    }

    /// Scan and execute every `interval` until `cancel` fires.
    ///
    /// The first cycle runs immediately. Failures are logged and the loop
    /// carries on.
    ///
    /// # Returns
    /// Number of completed cycles
    pub async fn run_monitor(&self, interval: Duration, cancel: &CancelToken) -> usize {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut cycles = 0;

        info!(interval_ms = interval.as_millis() as u64, "Watchlist monitor started");
        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = ticker.tick() => {}
            }

            let triggered = self.scan().await;
            if !triggered.is_empty() {
                for err in self.execute(&triggered).await {
                    error!(error = %err, "Watchlist execution failed");
                }
            }
            cycles += 1;
        }

        info!(cycles, "Watchlist monitor stopped");
        cycles
    }
}

fn sort_items(items: &mut [WatchlistItem]) {
    items.sort_by(|a, b| a.added_at.cmp(&b.added_at).then_with(|| a.id.cmp(&b.id)));
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration as ChronoDuration;
    use rust_decimal_macros::dec;
    use trading_core::events::MemorySink;
    use trading_core::types::{OrderStatus, Side};
    use trading_data::MemoryDataSource;
    use trading_engine::{EngineSettings, TradingEngine};

    struct Harness {
        source: Arc<MemoryDataSource>,
        engine: Arc<TradingEngine>,
        sink: Arc<MemorySink>,
        watchlist: Watchlist,
    }

    async fn harness() -> Harness {
        let source = Arc::new(MemoryDataSource::new("mem").with_quote("AAPL", 100.01));
        let manager = DataSourceManager::new();
        manager.add(source.clone()).await.unwrap();
        let data = Arc::new(manager);
        let engine = Arc::new(TradingEngine::new(data.clone(), EngineSettings::default()));
        let sink = Arc::new(MemorySink::new());
        let watchlist = Watchlist::new(engine.clone(), data).with_events(sink.clone());
        Harness {
            source,
            engine,
            sink,
            watchlist,
        }
    }

    #[tokio::test]
    async fn test_add_validates_and_assigns_id() {
        let h = harness().await;

        assert!(matches!(
            h.watchlist.add_item(WatchlistItem::buy(" ", dec!(1), dec!(1))).await,
            Err(WatchlistError::InvalidSymbol(_))
        ));
        assert!(matches!(
            h.watchlist.add_item(WatchlistItem::buy("AAPL", dec!(0), dec!(1))).await,
            Err(WatchlistError::InvalidQuantity(_))
        ));

        let id = h
            .watchlist
            .add_item(WatchlistItem::buy("AAPL", dec!(10), dec!(100)))
            .await
            .unwrap();
        assert!(id.starts_with("watch-AAPL-"));
        let item = h.watchlist.get_item(&id).await.unwrap();
        assert_eq!(item.status, ItemStatus::Active);
        assert_eq!(h.watchlist.list_active().await.len(), 1);
    }

    #[tokio::test]
    async fn test_buy_item_triggers_at_target() {
        let h = harness().await;
        let id = h
            .watchlist
            .add_item(WatchlistItem::buy("AAPL", dec!(10), dec!(100.00)))
            .await
            .unwrap();

        assert!(h.watchlist.scan().await.is_empty());
        assert!(h.watchlist.get_item(&id).await.unwrap().is_active());

        h.source.set_quote("AAPL", 100.0);
        let triggered = h.watchlist.scan().await;
        assert_eq!(triggered.len(), 1);
        assert_eq!(triggered[0].status, ItemStatus::Triggered);
        assert!(triggered[0].triggered_at.is_some());

        let events = h.sink.events_of("watchlist_triggered");
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].symbol(), Some("AAPL"));

        // Triggered items are no longer scanned.
        assert!(h.watchlist.scan().await.is_empty());
        assert!(h.watchlist.list_active().await.is_empty());
    }

    #[tokio::test]
    async fn test_expired_item_never_fires() {
        let h = harness().await;
        h.source.set_quote("AAPL", 50.0);
        let id = h
            .watchlist
            .add_item(
                WatchlistItem::buy("AAPL", dec!(10), dec!(100))
                    .with_expiry(Utc::now() - ChronoDuration::minutes(5)),
            )
            .await
            .unwrap();

        assert!(h.watchlist.scan().await.is_empty());
        assert_eq!(h.watchlist.get_item(&id).await.unwrap().status, ItemStatus::Expired);
        assert_eq!(h.watchlist.list_all().await.len(), 1);
        assert!(h.sink.events().is_empty());
    }

    #[tokio::test]
    async fn test_quote_failure_keeps_item_active() {
        let h = harness().await;
        let id = h
            .watchlist
            .add_item(WatchlistItem::buy("NVDA", dec!(1), dec!(1000)))
            .await
            .unwrap();

        assert!(h.watchlist.scan().await.is_empty());
        assert!(h.watchlist.get_item(&id).await.unwrap().is_active());

        h.source.set_quote("NVDA", 900.0);
        assert_eq!(h.watchlist.scan().await.len(), 1);
    }

    #[tokio::test]
    async fn test_sell_item_triggers_on_take_profit() {
        let h = harness().await;
        h.watchlist
            .add_item(WatchlistItem::sell("AAPL", dec!(10), Some(dec!(95)), Some(dec!(110))))
            .await
            .unwrap();

        assert!(h.watchlist.scan().await.is_empty());
        h.source.set_quote("AAPL", 111.0);
        let triggered = h.watchlist.scan().await;
        assert_eq!(triggered.len(), 1);
        assert_eq!(triggered[0].side, Side::Sell);
    }

    #[tokio::test]
    async fn test_execute_collects_errors() {
        let h = harness().await;
        h.source.set_quote("AAPL", 100.0);
        h.source.set_quote("MSFT", 90.0);

        let buy_id = h
            .watchlist
            .add_item(WatchlistItem::buy("AAPL", dec!(10), dec!(100)))
            .await
            .unwrap();
        h.watchlist
            .add_item(WatchlistItem::sell("MSFT", dec!(5), Some(dec!(95)), None))
            .await
            .unwrap();

        let triggered = h.watchlist.scan().await;
        assert_eq!(triggered.len(), 2);

        let errors = h.watchlist.execute(&triggered).await;
        assert_eq!(errors.len(), 1);
        assert!(matches!(
            &errors[0],
            WatchlistError::Execution { symbol, .. } if symbol == "MSFT"
        ));

        let item = h.watchlist.get_item(&buy_id).await.unwrap();
        let order_id = item.order_id.unwrap();
        let order = h.engine.get_order(order_id).await.unwrap();
        assert_eq!(order.status, OrderStatus::Filled);
        assert_eq!(order.client_order_id.as_deref(), Some(buy_id.as_str()));
        assert_eq!(h.engine.get_position("AAPL").await.unwrap().quantity, dec!(10));
    }

    #[tokio::test]
    async fn test_lookup_update_remove() {
        let h = harness().await;
        let first = h
            .watchlist
            .add_item(WatchlistItem::buy("AAPL", dec!(10), dec!(90)))
            .await
            .unwrap();

        let mut replacement = WatchlistItem::buy("AAPL", dec!(20), dec!(95)).with_notes("raised");
        replacement.id = "ignored".to_string();
        h.watchlist.update_item(&first, replacement).await.unwrap();

        let item = h.watchlist.get_item_by_symbol("AAPL", true).await.unwrap();
        assert_eq!(item.id, first);
        assert_eq!(item.quantity, dec!(20));
        assert_eq!(item.notes.as_deref(), Some("raised"));

        let mut retired = item.clone();
        retired.status = ItemStatus::Invalid;
        h.watchlist.update_item(&first, retired).await.unwrap();
        assert!(h.watchlist.get_item_by_symbol("AAPL", true).await.is_err());
        assert!(h.watchlist.get_item_by_symbol("AAPL", false).await.is_ok());

        assert!(matches!(
            h.watchlist.update_item("missing", WatchlistItem::buy("AAPL", dec!(1), dec!(1))).await,
            Err(WatchlistError::ItemNotFound(_))
        ));
        h.watchlist.remove_item(&first).await.unwrap();
        assert!(h.watchlist.remove_item(&first).await.is_err());
        assert!(h.watchlist.list_all().await.is_empty());
    }

    #[tokio::test]
    async fn test_monitor_executes_until_cancelled() {
        let h = harness().await;
        h.source.set_quote("AAPL", 99.0);
        let id = h
            .watchlist
            .add_item(WatchlistItem::buy("AAPL", dec!(10), dec!(100)))
            .await
            .unwrap();

        let cancel = CancelToken::new();
        let stopper = cancel.clone();
        let (cycles, _) = tokio::join!(
            h.watchlist.run_monitor(Duration::from_millis(10), &cancel),
            async move {
                tokio::time::sleep(Duration::from_millis(80)).await;
                stopper.cancel();
            }
        );

        assert!(cycles >= 1);
        assert!(h.watchlist.get_item(&id).await.unwrap().order_id.is_some());
        assert_eq!(h.engine.get_positions().await.unwrap().len(), 1);
    }
}
