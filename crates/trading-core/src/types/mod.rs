//! Core data types for the trading core.

mod account;
mod indicator;
mod ohlcv;
mod order;
mod position;
mod quote;
mod timeframe;
mod trade;

pub use account::{Account, TradingLimits};
pub use indicator::{Condition, IndicatorResult};
pub use ohlcv::{close_prices, StockData};
pub use order::{Order, OrderRequest, OrderStatus, OrderType, Side};
pub use position::Position;
pub use quote::{Quote, Stock};
pub use timeframe::{Span, Timeframe};
pub use trade::{Trade, TradeStats};
