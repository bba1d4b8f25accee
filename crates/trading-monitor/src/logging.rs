//! Logging setup.

use tracing_subscriber::util::TryInitError;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Target of the structured records written by [`TracingEventSink`](crate::TracingEventSink).
pub const EVENT_TARGET: &str = "trade_events";

/// Build the filter, preferring `RUST_LOG` over `level`.
///
/// Trade events stay visible at `info` unless the filter names their
/// target explicitly.
fn filter(level: &str) -> EnvFilter {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    match format!("{}=info", EVENT_TARGET).parse() {
        Ok(directive) if !filter.to_string().contains(EVENT_TARGET) => filter.add_directive(directive),
        _ => filter,
    }
}

/// Install the global subscriber.
///
/// Fails if a subscriber is already installed.
pub fn setup_logging(level: &str, json: bool) -> Result<(), TryInitError> {
    let filter = filter(level);

    if json {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json().with_current_span(false))
            .try_init()
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().with_target(true))
            .try_init()
    }
}
