//! Name-keyed indicator factories.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use crate::params::IndicatorParams;
use crate::{BollingerBands, Ema, Macd, Rsi, Sma};
use trading_core::error::IndicatorError;
use trading_core::traits::Indicator;

/// Constructor closure for one indicator type.
pub type IndicatorFactory =
    Arc<dyn Fn(&IndicatorParams) -> Result<Box<dyn Indicator>, IndicatorError> + Send + Sync>;

/// Registry mapping an indicator type name to its factory.
#[derive(Clone)]
pub struct IndicatorRegistry {
    factories: BTreeMap<String, IndicatorFactory>,
}

impl IndicatorRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self {
            factories: BTreeMap::new(),
        }
    }

    /// Create a registry holding the built-in indicators.
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register("SMA", |p| Ok(Box::new(Sma::from_params(p)?)));
        registry.register("EMA", |p| Ok(Box::new(Ema::from_params(p)?)));
        registry.register("MACD", |p| Ok(Box::new(Macd::from_params(p)?)));
        registry.register("RSI", |p| Ok(Box::new(Rsi::from_params(p)?)));
        registry.register("BollingerBands", |p| {
            Ok(Box::new(BollingerBands::from_params(p)?))
        });
        registry
    }

    /// Register a factory, replacing any previous one under `name`.
    pub fn register<F>(&mut self, name: impl Into<String>, factory: F)
    where
        F: Fn(&IndicatorParams) -> Result<Box<dyn Indicator>, IndicatorError>
            + Send
            + Sync
            + 'static,
    {
        self.factories.insert(name.into(), Arc::new(factory));
    }

    /// Construct an indicator by type name.
    ///
    /// # Arguments
    /// * `name` - Registered type name, e.g. `"RSI"`
    /// * `params` - Parameters validated by the indicator's constructor
    pub fn create(
        &self,
        name: &str,
        params: &IndicatorParams,
    ) -> Result<Box<dyn Indicator>, IndicatorError> {
        let factory = self
            .factories
            .get(name)
            .ok_or_else(|| IndicatorError::UnknownIndicator(name.to_string()))?;
        factory(params)
    }

    /// Check if a type name is registered.
    pub fn contains(&self, name: &str) -> bool {
        self.factories.contains_key(name)
    }

    /// Registered type names in sorted order.
    pub fn names(&self) -> Vec<&str> {
        self.factories.keys().map(String::as_str).collect()
    }
}

impl Default for IndicatorRegistry {
    fn default() -> Self {
        Self::with_defaults()
    }
}

impl fmt::Debug for IndicatorRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IndicatorRegistry")
            .field("indicators", &self.names())
            .finish()
    }
}
