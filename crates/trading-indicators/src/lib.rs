//! Technical indicators with SIMD optimization.
//!
//! This crate provides the indicators the scanner evaluates:
//! - Moving averages (SMA, EMA)
//! - Momentum indicators (RSI, MACD)
//! - Volatility indicators (Bollinger Bands)
//!
//! Every indicator implements [`trading_core::traits::Indicator`] and is
//! constructed by name through an [`IndicatorRegistry`].

mod crossover;
pub mod momentum;
pub mod moving_average;
pub mod params;
pub mod registry;
pub mod simd;
pub mod volatility;

pub use momentum::{Macd, Rsi};
pub use moving_average::{ema_series, Ema, Sma};
pub use params::IndicatorParams;
pub use registry::{IndicatorFactory, IndicatorRegistry};
pub use volatility::BollingerBands;
