//! Observability for the trading core.

mod logging;
mod sink;

pub use logging::{setup_logging, EVENT_TARGET};
pub use sink::TracingEventSink;
