//! Free-form indicator parameters with typed accessors.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use trading_core::error::IndicatorError;

/// Parameter map taken from strategy configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct IndicatorParams(BTreeMap<String, Value>);

impl IndicatorParams {
    /// Create an empty parameter map.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a parameter.
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.0.insert(key.into(), value.into());
        self
    }

    /// Check if a parameter is present.
    pub fn contains(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    /// Integer parameter. Whole floats such as `14.0` are accepted.
    pub fn get_i64(&self, key: &str, default: i64) -> Result<i64, IndicatorError> {
        match self.0.get(key) {
            None => Ok(default),
            Some(value) => value
                .as_i64()
                .or_else(|| value.as_f64().filter(|f| f.fract() == 0.0).map(|f| f as i64))
                .ok_or_else(|| invalid(key, "an integer", value)),
        }
    }

    /// Period parameter. Must be a positive integer.
    pub fn get_period(&self, key: &str, default: usize) -> Result<usize, IndicatorError> {
        let value = self.get_i64(key, default as i64)?;
        if value <= 0 {
            return Err(IndicatorError::InvalidParameter(format!(
                "{} must be positive, got {}",
                key, value
            )));
        }
        Ok(value as usize)
    }

    /// Floating-point parameter.
    pub fn get_f64(&self, key: &str, default: f64) -> Result<f64, IndicatorError> {
        match self.0.get(key) {
            None => Ok(default),
            Some(value) => value.as_f64().ok_or_else(|| invalid(key, "a number", value)),
        }
    }

    /// String parameter.
    pub fn get_str<'a>(&'a self, key: &str, default: &'a str) -> Result<&'a str, IndicatorError> {
        match self.0.get(key) {
            None => Ok(default),
            Some(value) => value.as_str().ok_or_else(|| invalid(key, "a string", value)),
        }
    }

    /// Boolean parameter.
    pub fn get_bool(&self, key: &str, default: bool) -> Result<bool, IndicatorError> {
        match self.0.get(key) {
            None => Ok(default),
            Some(value) => value.as_bool().ok_or_else(|| invalid(key, "a boolean", value)),
        }
    }
}

fn invalid(key: &str, expected: &str, value: &Value) -> IndicatorError {
    IndicatorError::InvalidParameter(format!("{} must be {}, got {}", key, expected, value))
}
