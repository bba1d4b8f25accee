//! Strategy scanner.
//!
//! A [`Strategy`] is a weighted list of indicator configurations with buy
//! and sell conditions. The [`Scanner`] evaluates strategies against bars
//! fetched through the data source manager and scores the signals.

mod scanner;
mod strategy;

pub use scanner::{composite_score, BatchScan, ScanResult, Scanner, MAX_CONCURRENT_SCANS};
pub use strategy::{IndicatorConfig, ScanWindow, Strategy, MAX_LOOKBACK_DAYS};
