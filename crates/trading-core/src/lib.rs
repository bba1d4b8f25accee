//! Core types and traits for the trading core.
//!
//! This crate provides the foundational building blocks including:
//! - Market data types (StockData, Quote, Stock)
//! - Order, position, account and trade ledger types
//! - Indicator results and the condition vocabulary
//! - Capability traits for data sources, indicators and brokers
//! - Cooperative cancellation and the outbound event contract

pub mod cancel;
pub mod error;
pub mod events;
pub mod traits;
pub mod types;

pub use cancel::CancelToken;
pub use events::{EventSink, MemorySink, NullSink, TradeEvent};
pub use traits::*;
pub use types::*;
