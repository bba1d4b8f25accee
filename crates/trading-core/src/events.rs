//! Structured events handed to logging and persistence collaborators.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use std::sync::Mutex;

use crate::error::SourceErrorCode;
use crate::types::{Order, Side, Trade};

/// One meaningful event emitted by the trading core.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum TradeEvent {
    /// An order was filled.
    OrderFilled { order: Order },
    /// A position was fully closed.
    PositionClosed { trade: Trade },
    /// A watchlist item's price condition fired.
    WatchlistTriggered {
        item_id: String,
        symbol: String,
        side: Side,
        last_price: Decimal,
        triggered_at: DateTime<Utc>,
    },
    /// A data source failed its health probe.
    HealthCheckFailed {
        source_name: String,
        code: Option<SourceErrorCode>,
        message: String,
        at: DateTime<Utc>,
    },
}

impl TradeEvent {
    /// Short event name.
    pub fn kind(&self) -> &'static str {
        match self {
            TradeEvent::OrderFilled { .. } => "order_filled",
            TradeEvent::PositionClosed { .. } => "position_closed",
            TradeEvent::WatchlistTriggered { .. } => "watchlist_triggered",
            TradeEvent::HealthCheckFailed { .. } => "health_check_failed",
        }
    }

    /// Symbol the event concerns, if any.
    pub fn symbol(&self) -> Option<&str> {
        match self {
            TradeEvent::OrderFilled { order } => Some(&order.symbol),
            TradeEvent::PositionClosed { trade } => Some(&trade.symbol),
            TradeEvent::WatchlistTriggered { symbol, .. } => Some(symbol),
            TradeEvent::HealthCheckFailed { .. } => None,
        }
    }

    /// Serialize the event as a JSON object.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

/// Receiver of [`TradeEvent`]s, injected into each component.
pub trait EventSink: Send + Sync {
    /// Hand over one event.
    fn emit(&self, event: TradeEvent);
}

/// Sink that discards every event.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSink;

impl EventSink for NullSink {
    fn emit(&self, _event: TradeEvent) {}
}

/// Sink that keeps every event in memory.
#[derive(Debug, Default)]
pub struct MemorySink {
    events: Mutex<Vec<TradeEvent>>,
}

impl MemorySink {
    /// Create an empty sink.
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of the events received so far.
    pub fn events(&self) -> Vec<TradeEvent> {
        match self.events.lock() {
            Ok(events) => events.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    /// Events of one kind.
    pub fn events_of(&self, kind: &str) -> Vec<TradeEvent> {
        self.events().into_iter().filter(|e| e.kind() == kind).collect()
    }
}

impl EventSink for MemorySink {
    fn emit(&self, event: TradeEvent) {
        match self.events.lock() {
            Ok(mut events) => events.push(event),
            Err(poisoned) => poisoned.into_inner().push(event),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::OrderRequest;
    use rust_decimal_macros::dec;

    #[test]
    fn test_memory_sink_collects_events() {
        let sink = MemorySink::new();
        let mut order = Order::from_request(&OrderRequest::market("AAPL", Side::Buy, dec!(10)));
        order.fill(dec!(100));

        sink.emit(TradeEvent::OrderFilled { order });
        sink.emit(TradeEvent::HealthCheckFailed {
            source_name: "polygon".to_string(),
            code: Some(SourceErrorCode::Timeout),
            message: "timed out".to_string(),
            at: Utc::now(),
        });

        assert_eq!(sink.events().len(), 2);
        assert_eq!(sink.events_of("order_filled").len(), 1);
        assert_eq!(sink.events()[0].symbol(), Some("AAPL"));
        assert_eq!(sink.events()[1].symbol(), None);
    }

    #[test]
    fn test_event_json_is_tagged() {
        let event = TradeEvent::WatchlistTriggered {
            item_id: "w-1".to_string(),
            symbol: "MSFT".to_string(),
            side: Side::Buy,
            last_price: dec!(99.5),
            triggered_at: Utc::now(),
        };
        let json: serde_json::Value = serde_json::from_str(&event.to_json().unwrap()).unwrap();

        assert_eq!(json["event"], "watchlist_triggered");
        assert_eq!(json["symbol"], "MSFT");
        assert_eq!(json["side"], "buy");
    }
}
