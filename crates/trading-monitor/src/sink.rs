//! Event sink rendering trade events as tracing records.

use tracing::{info, warn};
use trading_core::events::{EventSink, TradeEvent};

use crate::logging::EVENT_TARGET;

/// Writes every [`TradeEvent`] as one structured record on the
/// `trade_events` target, with the JSON payload in the `payload` field.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingEventSink;

impl TracingEventSink {
    pub fn new() -> Self {
        Self
    }
}

impl EventSink for TracingEventSink {
    fn emit(&self, event: TradeEvent) {
        let kind = event.kind();
        let symbol = event.symbol().unwrap_or("");
        let payload = match event.to_json() {
            Ok(json) => json,
            Err(err) => {
                warn!(target: EVENT_TARGET, kind, error = %err, "Failed to serialize trade event");
                return;
            }
        };

        match &event {
            TradeEvent::HealthCheckFailed { source_name, .. } => {
                warn!(target: EVENT_TARGET, kind, source = %source_name, payload = %payload, "Trade event");
            }
            _ => {
                info!(target: EVENT_TARGET, kind, symbol, payload = %payload, "Trade event");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use rust_decimal_macros::dec;
    use std::io;
    use std::sync::{Arc, Mutex};
    use trading_core::types::Side;

    #[derive(Clone, Default)]
    struct Buffer(Arc<Mutex<Vec<u8>>>);

    impl io::Write for Buffer {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_events_are_logged_with_payload() {
        let buffer = Buffer::default();
        let writer = buffer.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_writer(move || writer.clone())
            .with_ansi(false)
            .finish();

        tracing::subscriber::with_default(subscriber, || {
            let sink = TracingEventSink::new();
            sink.emit(TradeEvent::WatchlistTriggered {
                item_id: "w-1".to_string(),
                symbol: "AAPL".to_string(),
                side: Side::Buy,
                last_price: dec!(99.5),
                triggered_at: Utc::now(),
            });
            sink.emit(TradeEvent::HealthCheckFailed {
                source_name: "polygon".to_string(),
                code: None,
                message: "down".to_string(),
                at: Utc::now(),
            });
        });

        let output = String::from_utf8(buffer.0.lock().unwrap().clone()).unwrap();
        assert!(output.contains("trade_events"));
        assert!(output.contains("watchlist_triggered"));
        assert!(output.contains("AAPL"));
        assert!(output.contains("WARN"));
        assert!(output.contains("polygon"));
    }
}
