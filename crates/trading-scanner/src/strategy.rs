//! Strategy definitions consumed by the scanner.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use trading_core::error::ScanError;
use trading_core::types::Condition;
use trading_indicators::{IndicatorParams, IndicatorRegistry};

fn default_enabled() -> bool {
    true
}

/// One indicator with its buy/sell conditions inside a strategy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndicatorConfig {
    /// Display name, defaults to the indicator type
    #[serde(default)]
    pub name: Option<String>,
    /// Registered indicator type, e.g. `"RSI"`
    #[serde(rename = "type")]
    pub indicator_type: String,
    /// Free-form constructor parameters
    #[serde(default)]
    pub parameters: IndicatorParams,
    /// Condition producing a buy signal
    #[serde(default)]
    pub buy_condition: Option<Condition>,
    /// Threshold for the buy condition
    #[serde(default)]
    pub buy_threshold: f64,
    /// Condition producing a sell signal
    #[serde(default)]
    pub sell_condition: Option<Condition>,
    /// Threshold for the sell condition
    #[serde(default)]
    pub sell_threshold: f64,
    /// Relative weight within the strategy
    #[serde(default)]
    pub weight: f64,
}

impl IndicatorConfig {
    /// Create a config for an indicator type with default parameters.
    pub fn new(indicator_type: impl Into<String>) -> Self {
        Self {
            name: None,
            indicator_type: indicator_type.into(),
            parameters: IndicatorParams::new(),
            buy_condition: None,
            buy_threshold: 0.0,
            sell_condition: None,
            sell_threshold: 0.0,
            weight: 0.0,
        }
    }

    /// Set a constructor parameter.
    pub fn param(mut self, key: &str, value: impl Into<serde_json::Value>) -> Self {
        self.parameters = self.parameters.with(key, value);
        self
    }

    /// Set the buy condition.
    pub fn buy_when(mut self, condition: Condition, threshold: f64) -> Self {
        self.buy_condition = Some(condition);
        self.buy_threshold = threshold;
        self
    }

    /// Set the sell condition.
    pub fn sell_when(mut self, condition: Condition, threshold: f64) -> Self {
        self.sell_condition = Some(condition);
        self.sell_threshold = threshold;
        self
    }

    /// Set the weight.
    pub fn weight(mut self, weight: f64) -> Self {
        self.weight = weight;
        self
    }

    /// Name used in scan results.
    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or(&self.indicator_type)
    }
}

/// A named, weighted set of indicator conditions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Strategy {
    /// Unique strategy name
    pub name: String,
    /// Free text description
    #[serde(default)]
    pub description: Option<String>,
    /// Disabled strategies refuse to scan
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    /// Indicator configurations
    #[serde(default)]
    pub indicators: Vec<IndicatorConfig>,
}

impl Strategy {
    /// Create an enabled strategy with no indicators.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: None,
            enabled: true,
            indicators: Vec::new(),
        }
    }

    /// Append an indicator configuration.
    pub fn with_indicator(mut self, indicator: IndicatorConfig) -> Self {
        self.indicators.push(indicator);
        self
    }

    /// Sum of all indicator weights.
    pub fn total_weight(&self) -> f64 {
        self.indicators.iter().map(|i| i.weight).sum()
    }

    /// Normalized score for one indicator.
    ///
    /// Each indicator scores `weight / total`. When every weight is zero
    /// the indicators split the score equally.
    pub fn score_of(&self, indicator: &IndicatorConfig) -> f64 {
        let total = self.total_weight();
        if total == 0.0 {
            if self.indicators.is_empty() {
                0.0
            } else {
                1.0 / self.indicators.len() as f64
            }
        } else {
            indicator.weight / total
        }
    }

    /// Check the strategy against the indicator registry.
    ///
    /// Every indicator type must be registered and constructible from its
    /// parameters, and weights must be finite and non-negative.
    pub fn validate(&self, registry: &IndicatorRegistry) -> Result<(), ScanError> {
        let invalid = |reason: String| ScanError::InvalidStrategy {
            name: self.name.clone(),
            reason,
        };

        if self.name.trim().is_empty() {
            return Err(invalid("name must not be empty".to_string()));
        }
        if self.indicators.is_empty() {
            return Err(invalid("at least one indicator required".to_string()));
        }

        for indicator in &self.indicators {
            if !indicator.weight.is_finite() || indicator.weight < 0.0 {
                return Err(invalid(format!(
                    "{} has invalid weight {}",
                    indicator.display_name(),
                    indicator.weight
                )));
            }
            if indicator.buy_condition.is_none() && indicator.sell_condition.is_none() {
                return Err(invalid(format!(
                    "{} has neither a buy nor a sell condition",
                    indicator.display_name()
                )));
            }
            registry.create(&indicator.indicator_type, &indicator.parameters)?;
        }

        Ok(())
    }
}

/// Longest lookback a scan window accepts, in calendar days.
pub const MAX_LOOKBACK_DAYS: i64 = 36_500;

/// Bar range a scan fetches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanWindow {
    pub from: DateTime<Utc>,
    pub to: DateTime<Utc>,
}

impl ScanWindow {
    /// Create a window.
    pub fn new(from: DateTime<Utc>, to: DateTime<Utc>) -> Self {
        Self { from, to }
    }

    /// The last `days` calendar days up to now.
    ///
    /// `days` must lie in `1..=MAX_LOOKBACK_DAYS`.
    pub fn lookback(days: i64) -> Result<Self, ScanError> {
        if !(1..=MAX_LOOKBACK_DAYS).contains(&days) {
            return Err(ScanError::InvalidWindow(format!(
                "lookback of {} days is outside 1..={}",
                days, MAX_LOOKBACK_DAYS
            )));
        }
        let to = Utc::now();
        let from = Duration::try_days(days)
            .and_then(|span| to.checked_sub_signed(span))
            .ok_or_else(|| {
                ScanError::InvalidWindow(format!("lookback of {} days is out of range", days))
            })?;
        Ok(Self { from, to })
    }
}
