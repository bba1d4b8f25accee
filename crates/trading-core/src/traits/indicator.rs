//! Indicator trait definition.

use crate::error::IndicatorError;
use crate::types::{Condition, IndicatorResult, StockData};

/// Trait for technical indicators.
///
/// Indicators turn a bar series into named numeric series and can evaluate
/// a [`Condition`] against the latest two points of those series.
pub trait Indicator: Send + Sync {
    /// Get the name of the indicator.
    fn name(&self) -> &str;

    /// Minimum number of bars required by [`Indicator::calculate`].
    fn warmup_period(&self) -> usize;

    /// Calculate indicator series for the given bars.
    ///
    /// # Arguments
    /// * `data` - Bars ordered from oldest to newest
    ///
    /// # Returns
    /// Series aligned index-for-index with `data`, zero before the warm-up
    fn calculate(&self, data: &[StockData]) -> Result<IndicatorResult, IndicatorError>;

    /// Evaluate a condition on a result produced by this indicator.
    fn evaluate_condition(
        &self,
        result: &IndicatorResult,
        condition: Condition,
        threshold: f64,
    ) -> Result<bool, IndicatorError>;

    /// Validate that there's enough data.
    fn validate_data(&self, data: &[StockData]) -> Result<(), IndicatorError> {
        if data.len() < self.warmup_period() {
            return Err(IndicatorError::InsufficientData {
                required: self.warmup_period(),
                available: data.len(),
            });
        }
        Ok(())
    }

    /// Error for a condition this indicator does not evaluate.
    fn unsupported(&self, condition: Condition) -> IndicatorError {
        IndicatorError::UnsupportedCondition {
            indicator: self.name().to_string(),
            condition: condition.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    struct Sum {
        period: usize,
    }

    impl Indicator for Sum {
        fn name(&self) -> &str {
            "SUM"
        }

        fn warmup_period(&self) -> usize {
            self.period
        }

        fn calculate(&self, data: &[StockData]) -> Result<IndicatorResult, IndicatorError> {
            self.validate_data(data)?;
            let mut sums = vec![0.0; data.len()];
            for i in (self.period - 1)..data.len() {
                sums[i] = data[i + 1 - self.period..=i].iter().map(|b| b.close).sum();
            }
            Ok(IndicatorResult::new(self.name(), data, self.period - 1).with_series("sum", sums))
        }

        fn evaluate_condition(
            &self,
            result: &IndicatorResult,
            condition: Condition,
            threshold: f64,
        ) -> Result<bool, IndicatorError> {
            match condition {
                Condition::AboveThreshold => Ok(result.latest("sum")? > threshold),
                other => Err(self.unsupported(other)),
            }
        }
    }

    fn bars(n: usize) -> Vec<StockData> {
        (1..=n)
            .map(|i| {
                let c = i as f64;
                StockData::new("T", Utc::now(), c, c, c, c, 1)
            })
            .collect()
    }

    #[test]
    fn test_indicator_validation() {
        let indicator = Sum { period: 5 };

        assert!(indicator.validate_data(&bars(3)).is_err());
        assert!(indicator.validate_data(&bars(5)).is_ok());
    }

    #[test]
    fn test_indicator_calculate_and_evaluate() {
        let indicator = Sum { period: 3 };
        let result = indicator.calculate(&bars(5)).unwrap();

        assert_eq!(result.series("sum").unwrap(), &[0.0, 0.0, 6.0, 9.0, 12.0]);
        assert!(indicator
            .evaluate_condition(&result, Condition::AboveThreshold, 10.0)
            .unwrap());
        assert_eq!(
            indicator.evaluate_condition(&result, Condition::Increasing, 0.0),
            Err(IndicatorError::UnsupportedCondition {
                indicator: "SUM".to_string(),
                condition: "increasing".to_string(),
            })
        );
    }
}
