//! Configuration errors.

use thiserror::Error;
use trading_core::error::ScanError;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to load configuration: {0}")]
    Load(#[from] config::ConfigError),

    #[error("Data source {0} is enabled but has no API key")]
    MissingApiKey(String),

    #[error("Invalid {section} configuration: {reason}")]
    Invalid { section: &'static str, reason: String },

    #[error(transparent)]
    Strategy(#[from] ScanError),
}

impl ConfigError {
    pub(crate) fn invalid(section: &'static str, reason: impl Into<String>) -> Self {
        ConfigError::Invalid {
            section,
            reason: reason.into(),
        }
    }
}
