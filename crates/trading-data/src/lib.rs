//! Market data sources and the failover manager.
//!
//! - [`PolygonDataSource`]: Polygon.io REST client with bounded retries
//! - [`CsvDataSource`]: directory of OHLCV CSV files
//! - [`MemoryDataSource`]: preloaded in-memory bars and quotes
//! - [`DataSourceManager`]: primary selection, failover and health checks

mod csv_source;
mod manager;
mod memory;
mod polygon;

pub use csv_source::CsvDataSource;
pub use manager::{DataSourceManager, HealthReport, HEALTH_CHECK_TIMEOUT};
pub use memory::MemoryDataSource;
pub use polygon::{PolygonConfig, PolygonDataSource, DEFAULT_BASE_URL};
