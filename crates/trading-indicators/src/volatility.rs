//! Volatility indicators.

use crate::crossover::{crossed_above, crossed_below};
use crate::params::IndicatorParams;
use crate::simd;
use trading_core::error::IndicatorError;
use trading_core::traits::Indicator;
use trading_core::types::{close_prices, Condition, IndicatorResult, StockData};

/// Bollinger Bands.
///
/// Consists of a middle band (SMA) with upper and lower bands
/// at a specified number of population standard deviations.
///
/// Output series:
/// - `middle`, `upper`, `lower`
/// - `bandwidth` (upper - lower)
/// - `b_percent` (bandwidth as a percentage of the middle band)
/// - `std_dev`
#[derive(Debug, Clone)]
pub struct BollingerBands {
    period: usize,
    std_dev_multiplier: f64,
}

impl BollingerBands {
    /// Default window.
    pub const DEFAULT_PERIOD: usize = 20;
    /// Default band width in standard deviations.
    pub const DEFAULT_STD_DEV: f64 = 2.0;

    /// Create Bollinger Bands with custom parameters.
    pub fn new(period: usize, std_dev_multiplier: f64) -> Result<Self, IndicatorError> {
        if period == 0 {
            return Err(IndicatorError::InvalidParameter(
                "period must be greater than 0".to_string(),
            ));
        }
        if !std_dev_multiplier.is_finite() || std_dev_multiplier <= 0.0 {
            return Err(IndicatorError::InvalidParameter(format!(
                "std_dev must be positive, got {}",
                std_dev_multiplier
            )));
        }
        Ok(Self {
            period,
            std_dev_multiplier,
        })
    }

    /// Build from `period` and `std_dev` parameters.
    pub fn from_params(params: &IndicatorParams) -> Result<Self, IndicatorError> {
        Self::new(
            params.get_period("period", Self::DEFAULT_PERIOD)?,
            params.get_f64("std_dev", Self::DEFAULT_STD_DEV)?,
        )
    }

    /// Averaging window.
    pub fn period(&self) -> usize {
        self.period
    }

    /// Band width in standard deviations.
    pub fn std_dev_multiplier(&self) -> f64 {
        self.std_dev_multiplier
    }
}

impl Indicator for BollingerBands {
    fn name(&self) -> &str {
        "BollingerBands"
    }

    fn warmup_period(&self) -> usize {
        self.period
    }

    fn calculate(&self, data: &[StockData]) -> Result<IndicatorResult, IndicatorError> {
        self.validate_data(data)?;
        let closes = close_prices(data);
        let n = closes.len();
        let first_valid = self.period - 1;

        let middle = simd::rolling_mean(&closes, self.period);
        let std_dev = simd::rolling_std_dev(&closes, &middle, self.period);

        let mut upper = vec![0.0; n];
        let mut lower = vec![0.0; n];
        let mut bandwidth = vec![0.0; n];
        let mut b_percent = vec![0.0; n];

        for i in first_valid..n {
            let offset = self.std_dev_multiplier * std_dev[i];
            upper[i] = middle[i] + offset;
            lower[i] = middle[i] - offset;
            bandwidth[i] = upper[i] - lower[i];
            if middle[i] != 0.0 {
                b_percent[i] = bandwidth[i] / middle[i] * 100.0;
            }
        }

        Ok(IndicatorResult::new(self.name(), data, first_valid)
            .with_series("middle", middle)
            .with_series("upper", upper)
            .with_series("lower", lower)
            .with_series("bandwidth", bandwidth)
            .with_series("b_percent", b_percent)
            .with_series("std_dev", std_dev))
    }

    fn evaluate_condition(
        &self,
        result: &IndicatorResult,
        condition: Condition,
        threshold: f64,
    ) -> Result<bool, IndicatorError> {
        let (prev_close, close) = result.last_two_prices()?;
        let (prev_upper, upper) = result.last_two("upper")?;
        let (prev_lower, lower) = result.last_two("lower")?;

        match condition {
            Condition::PriceAboveUpper => Ok(close > upper),
            Condition::PriceBelowLower => Ok(close < lower),
            Condition::PriceWithinBands => Ok(lower <= close && close <= upper),
            Condition::CrossAbove => Ok(crossed_above(prev_close, close, prev_upper, upper)),
            Condition::CrossBelow => Ok(crossed_below(prev_close, close, prev_lower, lower)),
            Condition::AboveThreshold => Ok(result.latest("b_percent")? > threshold),
            Condition::BelowThreshold => Ok(result.latest("b_percent")? < threshold),
            Condition::Increasing => {
                let (prev, cur) = result.last_two("bandwidth")?;
                Ok(cur > prev)
            }
            Condition::Decreasing => {
                let (prev, cur) = result.last_two("bandwidth")?;
                Ok(cur < prev)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::moving_average::tests::bars;

    #[test]
    fn test_bollinger_bands() {
        let bb = BollingerBands::new(8, 2.0).unwrap();
        let result = bb.calculate(&bars(&[2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0])).unwrap();

        // mean 5, population std dev 2
        assert!((result.latest("middle").unwrap() - 5.0).abs() < 1e-10);
        assert!((result.latest("std_dev").unwrap() - 2.0).abs() < 1e-10);
        assert!((result.latest("upper").unwrap() - 9.0).abs() < 1e-10);
        assert!((result.latest("lower").unwrap() - 1.0).abs() < 1e-10);
        assert!((result.latest("bandwidth").unwrap() - 8.0).abs() < 1e-10);
        assert!((result.latest("b_percent").unwrap() - 160.0).abs() < 1e-10);

        for key in ["middle", "upper", "lower", "bandwidth", "b_percent", "std_dev"] {
            let series = result.series(key).unwrap();
            assert_eq!(series.len(), 8);
            assert!(series[..7].iter().all(|&v| v == 0.0), "{} not zero-filled", key);
        }
    }

    #[test]
    fn test_parameter_validation() {
        assert!(BollingerBands::new(0, 2.0).is_err());
        assert!(BollingerBands::new(20, 0.0).is_err());
        assert!(BollingerBands::new(20, -1.0).is_err());

        let bb = BollingerBands::from_params(&IndicatorParams::new()).unwrap();
        assert_eq!(bb.period(), 20);
        assert_eq!(bb.std_dev_multiplier(), 2.0);
        assert!(bb.calculate(&bars(&[1.0; 19])).is_err());
    }

    #[test]
    fn test_price_band_conditions() {
        let bb = BollingerBands::new(3, 1.0).unwrap();

        // Breakout well above a flat range
        let result = bb.calculate(&bars(&[10.0, 10.0, 10.0, 10.0, 20.0])).unwrap();
        assert!(bb.evaluate_condition(&result, Condition::PriceAboveUpper, 0.0).unwrap());
        assert!(bb.evaluate_condition(&result, Condition::CrossAbove, 0.0).unwrap());
        assert!(!bb.evaluate_condition(&result, Condition::PriceWithinBands, 0.0).unwrap());
        assert!(bb.evaluate_condition(&result, Condition::Increasing, 0.0).unwrap());

        // Flat prices sit on a zero-width band
        let result = bb.calculate(&bars(&[10.0, 10.0, 10.0, 10.0])).unwrap();
        assert!(bb.evaluate_condition(&result, Condition::PriceWithinBands, 0.0).unwrap());
        assert!(!bb.evaluate_condition(&result, Condition::PriceBelowLower, 0.0).unwrap());
        assert!(bb.evaluate_condition(&result, Condition::BelowThreshold, 1.0).unwrap());

        // Breakdown below the range
        let result = bb.calculate(&bars(&[10.0, 10.0, 10.0, 10.0, 1.0])).unwrap();
        assert!(bb.evaluate_condition(&result, Condition::PriceBelowLower, 0.0).unwrap());
        assert!(bb.evaluate_condition(&result, Condition::CrossBelow, 0.0).unwrap());
        assert!(bb.evaluate_condition(&result, Condition::AboveThreshold, 1.0).unwrap());
    }
}
