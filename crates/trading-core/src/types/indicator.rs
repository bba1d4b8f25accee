//! Indicator output series and the condition vocabulary.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use super::StockData;
use crate::error::IndicatorError;

/// Boolean conditions an indicator can evaluate on its latest two points.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Condition {
    CrossAbove,
    CrossBelow,
    AboveThreshold,
    BelowThreshold,
    Increasing,
    Decreasing,
    PriceAboveUpper,
    PriceBelowLower,
    PriceWithinBands,
}

impl Condition {
    /// Configuration name of the condition.
    pub fn as_str(&self) -> &'static str {
        match self {
            Condition::CrossAbove => "cross_above",
            Condition::CrossBelow => "cross_below",
            Condition::AboveThreshold => "above_threshold",
            Condition::BelowThreshold => "below_threshold",
            Condition::Increasing => "increasing",
            Condition::Decreasing => "decreasing",
            Condition::PriceAboveUpper => "price_above_upper",
            Condition::PriceBelowLower => "price_below_lower",
            Condition::PriceWithinBands => "price_within_bands",
        }
    }

    /// All conditions.
    pub fn all() -> &'static [Condition] {
        &[
            Condition::CrossAbove,
            Condition::CrossBelow,
            Condition::AboveThreshold,
            Condition::BelowThreshold,
            Condition::Increasing,
            Condition::Decreasing,
            Condition::PriceAboveUpper,
            Condition::PriceBelowLower,
            Condition::PriceWithinBands,
        ]
    }
}

impl fmt::Display for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Condition {
    type Err = IndicatorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Condition::all()
            .iter()
            .copied()
            .find(|c| c.as_str() == s)
            .ok_or_else(|| IndicatorError::UnknownCondition(s.to_string()))
    }
}

/// Named parallel series produced by one indicator calculation.
///
/// Every series has the same length as `dates` and `prices`. Positions
/// before `first_valid` are placeholders and hold zero.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndicatorResult {
    /// Indicator name
    pub name: String,
    /// Sub-line name to values
    pub values: BTreeMap<String, Vec<f64>>,
    /// Close prices the indicator was computed from
    pub prices: Vec<f64>,
    /// Bar timestamps
    pub dates: Vec<DateTime<Utc>>,
    /// Index of the first computed (non-placeholder) point
    pub first_valid: usize,
}

impl IndicatorResult {
    /// Start a result aligned with `data`.
    pub fn new(name: impl Into<String>, data: &[StockData], first_valid: usize) -> Self {
        Self {
            name: name.into(),
            values: BTreeMap::new(),
            prices: data.iter().map(|bar| bar.close).collect(),
            dates: data.iter().map(|bar| bar.timestamp).collect(),
            first_valid,
        }
    }

    /// Attach a named series.
    pub fn with_series(mut self, key: impl Into<String>, series: Vec<f64>) -> Self {
        debug_assert_eq!(series.len(), self.dates.len(), "series length must match dates");
        self.values.insert(key.into(), series);
        self
    }

    /// Number of points in every series.
    pub fn len(&self) -> usize {
        self.dates.len()
    }

    /// Check if the result holds no points.
    pub fn is_empty(&self) -> bool {
        self.dates.is_empty()
    }

    /// Number of computed points after the warm-up.
    pub fn computed_points(&self) -> usize {
        self.len().saturating_sub(self.first_valid)
    }

    /// Look up a series by name.
    pub fn series(&self, key: &str) -> Result<&[f64], IndicatorError> {
        self.values
            .get(key)
            .map(Vec::as_slice)
            .ok_or_else(|| IndicatorError::MissingSeries(key.to_string()))
    }

    /// Latest value of a series.
    pub fn latest(&self, key: &str) -> Result<f64, IndicatorError> {
        let series = self.series(key)?;
        series
            .last()
            .copied()
            .ok_or_else(|| IndicatorError::MissingSeries(key.to_string()))
    }

    /// `(previous, current)` of a series. Needs two computed points.
    pub fn last_two(&self, key: &str) -> Result<(f64, f64), IndicatorError> {
        let series = self.series(key)?;
        self.tail_pair(series)
    }

    /// `(previous, current)` close prices. Needs two computed points.
    pub fn last_two_prices(&self) -> Result<(f64, f64), IndicatorError> {
        self.tail_pair(&self.prices)
    }

    fn tail_pair(&self, series: &[f64]) -> Result<(f64, f64), IndicatorError> {
        if self.computed_points() < 2 || series.len() < 2 {
            return Err(IndicatorError::InsufficientData {
                required: self.first_valid + 2,
                available: series.len(),
            });
        }
        let n = series.len();
        Ok((series[n - 2], series[n - 1]))
    }
}
