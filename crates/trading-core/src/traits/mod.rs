//! Capability traits shared across the trading core.

mod broker;
mod data_source;
mod indicator;

pub use broker::Broker;
pub use data_source::DataSource;
pub use indicator::Indicator;
