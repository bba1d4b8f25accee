//! Moving average indicators.

use crate::crossover::{crossed_above, crossed_below};
use crate::params::IndicatorParams;
use crate::simd;
use trading_core::error::IndicatorError;
use trading_core::traits::Indicator;
use trading_core::types::{close_prices, Condition, IndicatorResult, StockData};

/// Exponential smoothing aligned with `data`.
///
/// The seed is the simple average of the first `period` points, placed at
/// index `period - 1`. Each later point blends in with factor `2/(period+1)`.
/// Earlier indices are zero.
pub fn ema_series(data: &[f64], period: usize) -> Vec<f64> {
    let mut result = vec![0.0; data.len()];
    if period == 0 || data.len() < period {
        return result;
    }

    let multiplier = 2.0 / (period as f64 + 1.0);
    let one_minus_mult = 1.0 - multiplier;

    let mut ema = simd::sum_simd(&data[..period]) / period as f64;
    result[period - 1] = ema;

    for i in period..data.len() {
        ema = data[i] * multiplier + ema * one_minus_mult;
        result[i] = ema;
    }

    result
}

/// Evaluate a condition for a single average line against the close.
fn evaluate_line(
    indicator: &dyn Indicator,
    result: &IndicatorResult,
    key: &str,
    condition: Condition,
    threshold: f64,
) -> Result<bool, IndicatorError> {
    let (prev, cur) = result.last_two(key)?;
    match condition {
        Condition::CrossAbove => {
            let (prev_close, close) = result.last_two_prices()?;
            Ok(crossed_above(prev_close, close, prev, cur))
        }
        Condition::CrossBelow => {
            let (prev_close, close) = result.last_two_prices()?;
            Ok(crossed_below(prev_close, close, prev, cur))
        }
        Condition::AboveThreshold => Ok(cur > threshold),
        Condition::BelowThreshold => Ok(cur < threshold),
        Condition::Increasing => Ok(cur > prev),
        Condition::Decreasing => Ok(cur < prev),
        other => Err(indicator.unsupported(other)),
    }
}

fn check_period(period: usize) -> Result<(), IndicatorError> {
    if period == 0 {
        return Err(IndicatorError::InvalidParameter(
            "period must be greater than 0".to_string(),
        ));
    }
    Ok(())
}

/// Simple Moving Average (SMA).
///
/// Calculates the arithmetic mean of the last N closes. Output series: `sma`.
#[derive(Debug, Clone)]
pub struct Sma {
    period: usize,
}

impl Sma {
    /// Default period.
    pub const DEFAULT_PERIOD: usize = 20;

    /// Create a new SMA with the specified period.
    pub fn new(period: usize) -> Result<Self, IndicatorError> {
        check_period(period)?;
        Ok(Self { period })
    }

    /// Build from a `period` parameter.
    pub fn from_params(params: &IndicatorParams) -> Result<Self, IndicatorError> {
        Self::new(params.get_period("period", Self::DEFAULT_PERIOD)?)
    }

    /// Averaging window.
    pub fn period(&self) -> usize {
        self.period
    }
}

impl Indicator for Sma {
    fn name(&self) -> &str {
        "SMA"
    }

    fn warmup_period(&self) -> usize {
        self.period
    }

    fn calculate(&self, data: &[StockData]) -> Result<IndicatorResult, IndicatorError> {
        self.validate_data(data)?;
        let closes = close_prices(data);
        let sma = simd::rolling_mean(&closes, self.period);
        Ok(IndicatorResult::new(self.name(), data, self.period - 1).with_series("sma", sma))
    }

    fn evaluate_condition(
        &self,
        result: &IndicatorResult,
        condition: Condition,
        threshold: f64,
    ) -> Result<bool, IndicatorError> {
        evaluate_line(self, result, "sma", condition, threshold)
    }
}

/// Exponential Moving Average (EMA).
///
/// Gives more weight to recent closes using exponential decay. Output
/// series: `ema`.
#[derive(Debug, Clone)]
pub struct Ema {
    period: usize,
}

impl Ema {
    /// Default period.
    pub const DEFAULT_PERIOD: usize = 20;

    /// Create a new EMA with the specified period.
    pub fn new(period: usize) -> Result<Self, IndicatorError> {
        check_period(period)?;
        Ok(Self { period })
    }

    /// Build from a `period` parameter.
    pub fn from_params(params: &IndicatorParams) -> Result<Self, IndicatorError> {
        Self::new(params.get_period("period", Self::DEFAULT_PERIOD)?)
    }

    /// Smoothing window.
    pub fn period(&self) -> usize {
        self.period
    }
}

impl Indicator for Ema {
    fn name(&self) -> &str {
        "EMA"
    }

    fn warmup_period(&self) -> usize {
        self.period
    }

    fn calculate(&self, data: &[StockData]) -> Result<IndicatorResult, IndicatorError> {
        self.validate_data(data)?;
        let closes = close_prices(data);
        let ema = ema_series(&closes, self.period);
        Ok(IndicatorResult::new(self.name(), data, self.period - 1).with_series("ema", ema))
    }

    fn evaluate_condition(
        &self,
        result: &IndicatorResult,
        condition: Condition,
        threshold: f64,
    ) -> Result<bool, IndicatorError> {
        evaluate_line(self, result, "ema", condition, threshold)
    }
}
