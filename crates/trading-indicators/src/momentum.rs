//! Momentum indicators.

use crate::crossover::{crossed_above, crossed_below};
use crate::moving_average::ema_series;
use crate::params::IndicatorParams;
use crate::simd;
use trading_core::error::IndicatorError;
use trading_core::traits::Indicator;
use trading_core::types::{close_prices, Condition, IndicatorResult, StockData};

/// Relative Strength Index (RSI).
///
/// Measures the speed and magnitude of recent price changes
/// to evaluate overbought or oversold conditions. Output series: `rsi`.
#[derive(Debug, Clone)]
pub struct Rsi {
    period: usize,
}

impl Rsi {
    /// Default period.
    pub const DEFAULT_PERIOD: usize = 14;

    /// Create a new RSI indicator.
    ///
    /// Common periods are 14 (default) or 9.
    pub fn new(period: usize) -> Result<Self, IndicatorError> {
        if period == 0 {
            return Err(IndicatorError::InvalidParameter(
                "period must be greater than 0".to_string(),
            ));
        }
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

    fn rsi(avg_gain: f64, avg_loss: f64) -> f64 {
        if avg_loss == 0.0 {
            100.0
        } else {
            100.0 - (100.0 / (1.0 + avg_gain / avg_loss))
        }
    }
}

impl Indicator for Rsi {
    fn name(&self) -> &str {
        "RSI"
    }

    fn warmup_period(&self) -> usize {
        // One more bar than changes
        self.period + 1
    }

    fn calculate(&self, data: &[StockData]) -> Result<IndicatorResult, IndicatorError> {
        self.validate_data(data)?;
        let closes = close_prices(data);
        let (gains, losses) = simd::gains_losses(&closes);

        let period_f64 = self.period as f64;
        let mut values = vec![0.0; closes.len()];

        // Seed averages over the first `period` changes
        let mut avg_gain = simd::sum_simd(&gains[..self.period]) / period_f64;
        let mut avg_loss = simd::sum_simd(&losses[..self.period]) / period_f64;
        values[self.period] = Self::rsi(avg_gain, avg_loss);

        // Wilder's smoothing: avg = (prev_avg * (period-1) + value) / period
        for i in self.period..gains.len() {
            avg_gain = (avg_gain * (period_f64 - 1.0) + gains[i]) / period_f64;
            avg_loss = (avg_loss * (period_f64 - 1.0) + losses[i]) / period_f64;
            values[i + 1] = Self::rsi(avg_gain, avg_loss);
        }

        Ok(IndicatorResult::new(self.name(), data, self.period).with_series("rsi", values))
    }

    fn evaluate_condition(
        &self,
        result: &IndicatorResult,
        condition: Condition,
        threshold: f64,
    ) -> Result<bool, IndicatorError> {
        let (prev, cur) = result.last_two("rsi")?;
        match condition {
            Condition::CrossAbove => Ok(crossed_above(prev, cur, threshold, threshold)),
            Condition::CrossBelow => Ok(crossed_below(prev, cur, threshold, threshold)),
            Condition::AboveThreshold => Ok(cur > threshold),
            Condition::BelowThreshold => Ok(cur < threshold),
            Condition::Increasing => Ok(cur > prev),
            Condition::Decreasing => Ok(cur < prev),
            other => Err(self.unsupported(other)),
        }
    }
}

/// MACD indicator.
///
/// Uses two EMAs to identify trend direction and momentum. Output series:
/// `macd` (fast EMA - slow EMA), `signal` (EMA of MACD) and `histogram`
/// (MACD - signal).
///
/// The `macd` line carries values from index `slow - 1`, once the slow EMA
/// is seeded. `signal` and `histogram` start `signal - 1` bars later, at
/// `first_valid`.
#[derive(Debug, Clone)]
pub struct Macd {
    fast_period: usize,
    slow_period: usize,
    signal_period: usize,
}

impl Macd {
    /// Default periods (12, 26, 9).
    pub const DEFAULT_PERIODS: (usize, usize, usize) = (12, 26, 9);

    /// Create a MACD with custom periods.
    pub fn new(fast: usize, slow: usize, signal: usize) -> Result<Self, IndicatorError> {
        if fast == 0 || slow == 0 || signal == 0 {
            return Err(IndicatorError::InvalidParameter(
                "MACD periods must be greater than 0".to_string(),
            ));
        }
        if fast >= slow {
            return Err(IndicatorError::InvalidParameter(format!(
                "fast period ({}) must be less than slow period ({})",
                fast, slow
            )));
        }
        Ok(Self {
            fast_period: fast,
            slow_period: slow,
            signal_period: signal,
        })
    }

    /// Build from `fast_period`, `slow_period` and `signal_period` parameters.
    pub fn from_params(params: &IndicatorParams) -> Result<Self, IndicatorError> {
        let (fast, slow, signal) = Self::DEFAULT_PERIODS;
        Self::new(
            params.get_period("fast_period", fast)?,
            params.get_period("slow_period", slow)?,
            params.get_period("signal_period", signal)?,
        )
    }

    /// `(fast, slow, signal)` periods.
    pub fn periods(&self) -> (usize, usize, usize) {
        (self.fast_period, self.slow_period, self.signal_period)
    }

    fn first_valid(&self) -> usize {
        self.slow_period + self.signal_period - 2
    }
}

impl Indicator for Macd {
    fn name(&self) -> &str {
        "MACD"
    }

    fn warmup_period(&self) -> usize {
        self.slow_period + self.signal_period
    }

    fn calculate(&self, data: &[StockData]) -> Result<IndicatorResult, IndicatorError> {
        self.validate_data(data)?;
        let closes = close_prices(data);
        let n = closes.len();

        let fast = ema_series(&closes, self.fast_period);
        let slow = ema_series(&closes, self.slow_period);

        // MACD line exists once the slow EMA is seeded
        let macd_start = self.slow_period - 1;
        let mut macd = vec![0.0; n];
        for i in macd_start..n {
            macd[i] = fast[i] - slow[i];
        }

        // Signal line smooths the MACD line from where it starts
        let mut signal = vec![0.0; n];
        let smoothed = ema_series(&macd[macd_start..], self.signal_period);
        signal[macd_start..].copy_from_slice(&smoothed);

        let first_valid = self.first_valid();
        let mut histogram = vec![0.0; n];
        for i in first_valid..n {
            histogram[i] = macd[i] - signal[i];
        }

        Ok(IndicatorResult::new(self.name(), data, first_valid)
            .with_series("macd", macd)
            .with_series("signal", signal)
            .with_series("histogram", histogram))
    }

    fn evaluate_condition(
        &self,
        result: &IndicatorResult,
        condition: Condition,
        threshold: f64,
    ) -> Result<bool, IndicatorError> {
        let (prev_macd, macd) = result.last_two("macd")?;
        match condition {
            Condition::CrossAbove => {
                let (prev_signal, signal) = result.last_two("signal")?;
                Ok(crossed_above(prev_macd, macd, prev_signal, signal))
            }
            Condition::CrossBelow => {
                let (prev_signal, signal) = result.last_two("signal")?;
                Ok(crossed_below(prev_macd, macd, prev_signal, signal))
            }
            Condition::AboveThreshold => Ok(macd > threshold),
            Condition::BelowThreshold => Ok(macd < threshold),
            Condition::Increasing => Ok(macd > prev_macd),
            Condition::Decreasing => Ok(macd < prev_macd),
            other => Err(self.unsupported(other)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::moving_average::tests::bars;

    #[test]
    fn test_rsi_saturates_on_rising_prices() {
        let closes: Vec<f64> = (0..30).map(|i| 100.0 + i as f64).collect();
        let rsi = Rsi::new(14).unwrap();
        let result = rsi.calculate(&bars(&closes)).unwrap();

        assert_eq!(result.latest("rsi").unwrap(), 100.0);
    }

    #[test]
    fn test_rsi_exact_warmup() {
        let rsi = Rsi::new(3).unwrap();
        let result = rsi.calculate(&bars(&[10.0, 11.0, 10.0, 12.0])).unwrap();
        let values = result.series("rsi").unwrap();

        assert_eq!(&values[..3], &[0.0, 0.0, 0.0]);
        // avg gain = 3/3, avg loss = 1/3 -> RS = 3 -> RSI = 75
        assert!((values[3] - 75.0).abs() < 1e-10);
        assert_eq!(result.first_valid, 3);

        assert!(matches!(
            rsi.calculate(&bars(&[10.0, 11.0, 10.0])),
            Err(IndicatorError::InsufficientData { required: 4, available: 3 })
        ));
    }

    #[test]
    fn test_rsi_wilder_smoothing() {
        let rsi = Rsi::new(2).unwrap();
        // changes: +2, -2, +1
        let result = rsi.calculate(&bars(&[10.0, 12.0, 10.0, 11.0])).unwrap();
        let values = result.series("rsi").unwrap();

        // seed gain 1, loss 1 -> 50
        assert!((values[2] - 50.0).abs() < 1e-10);
        // gain (1*1 + 1)/2 = 1, loss (1*1 + 0)/2 = 0.5 -> RS 2 -> 66.67
        assert!((values[3] - 200.0 / 3.0).abs() < 1e-10);
    }

    #[test]
    fn test_rsi_conditions() {
        let rsi = Rsi::new(2).unwrap();
        let result = rsi.calculate(&bars(&[10.0, 12.0, 10.0, 11.0])).unwrap();

        assert!(rsi.evaluate_condition(&result, Condition::CrossAbove, 60.0).unwrap());
        assert!(!rsi.evaluate_condition(&result, Condition::CrossBelow, 60.0).unwrap());
        assert!(rsi.evaluate_condition(&result, Condition::AboveThreshold, 60.0).unwrap());
        assert!(rsi.evaluate_condition(&result, Condition::BelowThreshold, 70.0).unwrap());
        assert!(rsi.evaluate_condition(&result, Condition::Increasing, 0.0).unwrap());
        assert!(rsi
            .evaluate_condition(&result, Condition::PriceWithinBands, 0.0)
            .is_err());
    }

    #[test]
    fn test_macd_validation() {
        assert!(Macd::new(26, 12, 9).is_err());
        assert!(Macd::new(12, 12, 9).is_err());
        assert!(Macd::new(0, 26, 9).is_err());
        assert_eq!(
            Macd::from_params(&IndicatorParams::new()).unwrap().periods(),
            (12, 26, 9)
        );
        let params = IndicatorParams::new().with("fast_period", 30);
        assert!(Macd::from_params(&params).is_err());
    }

    #[test]
    fn test_macd_warmup_and_alignment() {
        let macd = Macd::new(3, 5, 3).unwrap();
        assert_eq!(macd.warmup_period(), 8);

        let closes: Vec<f64> = (0..8).map(|i| 100.0 + (i * i) as f64).collect();
        assert!(macd.calculate(&bars(&closes[..7])).is_err());

        let result = macd.calculate(&bars(&closes)).unwrap();
        assert_eq!(result.first_valid, 6);
        for key in ["signal", "histogram"] {
            let series = result.series(key).unwrap();
            assert_eq!(series.len(), 8);
            assert!(series[..6].iter().all(|&v| v == 0.0), "{} not zero-filled", key);
        }

        // The line starts once the slow EMA is seeded
        let line = result.series("macd").unwrap();
        assert!(line[..4].iter().all(|&v| v == 0.0));
        // Accelerating prices keep the fast EMA above the slow EMA
        assert!(line[4..].iter().all(|&v| v > 0.0));
        assert!(result.series("signal").unwrap()[7] > 0.0);
        assert!(macd.evaluate_condition(&result, Condition::AboveThreshold, 0.0).unwrap());
        assert!(macd.evaluate_condition(&result, Condition::Increasing, 0.0).unwrap());
    }

    #[test]
    fn test_macd_signal_seed() {
        let macd = Macd::new(2, 3, 2).unwrap();
        let closes = [1.0, 2.0, 4.0, 7.0, 11.0];
        let result = macd.calculate(&bars(&closes)).unwrap();

        // fast: idx1=1.5, idx2=3.1667, idx3=5.7222, idx4=9.2407
        // slow: idx2=2.3333, idx3=4.6667, idx4=7.8333
        let fast = ema_series(&closes, 2);
        let slow = ema_series(&closes, 3);
        let line: Vec<f64> = (2..5).map(|i| fast[i] - slow[i]).collect();
        let seed = (line[0] + line[1]) / 2.0;
        let next = line[2] * (2.0 / 3.0) + seed * (1.0 / 3.0);

        let signal = result.series("signal").unwrap();
        assert_eq!(result.first_valid, 3);
        assert!((signal[3] - seed).abs() < 1e-10);
        assert!((signal[4] - next).abs() < 1e-10);
        let histogram = result.series("histogram").unwrap();
        assert!((histogram[4] - (line[2] - next)).abs() < 1e-10);
    }
}
