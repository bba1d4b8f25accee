//! In-process trading engine.
//!
//! Market orders fill immediately against a quote from the primary data
//! source. Positions use weighted-average cost and every full close is
//! recorded as a [`Trade`](trading_core::types::Trade).

mod engine;
mod stats;

pub use engine::{EngineSettings, TradingEngine};
pub use stats::trade_stats;
