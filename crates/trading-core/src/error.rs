//! Error types for the trading core.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;
use uuid::Uuid;

use crate::types::OrderStatus;

/// Machine-readable classification of a data source failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SourceErrorCode {
    /// The outgoing request could not be built
    RequestCreation,
    /// A provider URL could not be parsed
    UrlParse,
    /// The connection failed or was reset
    Connection,
    /// The request did not complete in time
    Timeout,
    /// The provider answered with a non-success status
    Api,
    /// The response body could not be decoded
    ResponseParse,
    /// The caller cancelled the operation
    Cancelled,
    /// The source is disabled by configuration
    Disabled,
}

impl SourceErrorCode {
    /// Wire name of the code.
    pub fn as_str(&self) -> &'static str {
        match self {
            SourceErrorCode::RequestCreation => "REQUEST_CREATION_ERROR",
            SourceErrorCode::UrlParse => "URL_PARSE_ERROR",
            SourceErrorCode::Connection => "CONNECTION_ERROR",
            SourceErrorCode::Timeout => "TIMEOUT",
            SourceErrorCode::Api => "API_ERROR",
            SourceErrorCode::ResponseParse => "RESPONSE_PARSE_ERROR",
            SourceErrorCode::Cancelled => "CONTEXT_CANCELLED",
            SourceErrorCode::Disabled => "DISABLED",
        }
    }
}

impl fmt::Display for SourceErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A failure raised by one named data source.
#[derive(Error, Debug, Clone)]
#[error("{source_name} [{code}]: {message}")]
pub struct SourceError {
    /// Name of the source that failed
    pub source_name: String,
    /// Failure classification
    pub code: SourceErrorCode,
    /// Human readable detail
    pub message: String,
    /// HTTP status, when the provider answered
    pub status: Option<u16>,
    /// When the failure was observed
    pub at: DateTime<Utc>,
}

impl SourceError {
    /// Create a new source error stamped with the current time.
    pub fn new(
        source_name: impl Into<String>,
        code: SourceErrorCode,
        message: impl Into<String>,
    ) -> Self {
        Self {
            source_name: source_name.into(),
            code,
            message: message.into(),
            status: None,
            at: Utc::now(),
        }
    }

    /// Attach the HTTP status that produced this error.
    pub fn with_status(mut self, status: u16) -> Self {
        self.status = Some(status);
        self
    }

    /// Whether a retry of the same request may succeed.
    ///
    /// Connection failures, timeouts, throttling (429) and server errors
    /// (5xx) are transient. Everything else is permanent.
    pub fn is_transient(&self) -> bool {
        match self.code {
            SourceErrorCode::Connection | SourceErrorCode::Timeout => true,
            SourceErrorCode::Api => matches!(self.status, Some(429) | Some(500..=599)),
            _ => false,
        }
    }
}

/// Data source and data source manager errors.
#[derive(Error, Debug, Clone)]
pub enum DataError {
    #[error(transparent)]
    Source(#[from] SourceError),

    #[error("Data source not found: {0}")]
    SourceNotFound(String),

    #[error("Data source already registered: {0}")]
    DuplicateSource(String),

    #[error("No data sources available")]
    NoSourcesAvailable,

    #[error("All data sources failed, last error: {0}")]
    AllSourcesFailed(Box<DataError>),

    #[error("Symbol not found: {0}")]
    SymbolNotFound(String),

    #[error("Invalid timeframe: {0}")]
    InvalidTimeframe(String),

    #[error("No data available for {0}")]
    NoDataAvailable(String),

    #[error("Parse error: {0}")]
    ParseError(String),
}

impl DataError {
    /// The structured source error at the root of this failure, if any.
    pub fn source_error(&self) -> Option<&SourceError> {
        match self {
            DataError::Source(e) => Some(e),
            DataError::AllSourcesFailed(last) => last.source_error(),
            _ => None,
        }
    }
}

/// Indicator construction, calculation and evaluation errors.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum IndicatorError {
    #[error("Insufficient data: need {required} points, have {available}")]
    InsufficientData { required: usize, available: usize },

    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("Calculation error: {0}")]
    CalculationError(String),

    #[error("Unknown indicator type: {0}")]
    UnknownIndicator(String),

    #[error("Unknown condition: {0}")]
    UnknownCondition(String),

    #[error("Condition {condition} is not supported by {indicator}")]
    UnsupportedCondition { indicator: String, condition: String },

    #[error("Series not found in result: {0}")]
    MissingSeries(String),
}

/// Scanner errors.
#[derive(Error, Debug, Clone)]
pub enum ScanError {
    #[error("Strategy not found: {0}")]
    StrategyNotFound(String),

    #[error("Strategy already exists: {0}")]
    DuplicateStrategy(String),

    #[error("Strategy is disabled: {0}")]
    StrategyDisabled(String),

    #[error("Invalid strategy {name}: {reason}")]
    InvalidStrategy { name: String, reason: String },

    #[error("No market data for {0}")]
    NoData(String),

    #[error("Invalid scan window: {0}")]
    InvalidWindow(String),

    #[error("Data error: {0}")]
    Data(#[from] DataError),

    #[error("Indicator error: {0}")]
    Indicator(#[from] IndicatorError),
}

/// Which configured trading limit blocked an order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LimitKind {
    MaxPositions,
    MaxDailyTrades,
    MaxPositionSize,
}

impl fmt::Display for LimitKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LimitKind::MaxPositions => write!(f, "max positions"),
            LimitKind::MaxDailyTrades => write!(f, "max daily trades"),
            LimitKind::MaxPositionSize => write!(f, "max position size"),
        }
    }
}

/// Trading engine errors.
#[derive(Error, Debug, Clone)]
pub enum EngineError {
    #[error("Trading is disabled")]
    TradingDisabled,

    #[error("Invalid symbol: {0:?}")]
    InvalidSymbol(String),

    #[error("Invalid quantity: {0}")]
    InvalidQuantity(Decimal),

    #[error("Invalid price: {0}")]
    InvalidPrice(String),

    #[error("Invalid order type: {0}")]
    InvalidOrderType(String),

    #[error("Invalid order side: {0}")]
    InvalidOrderSide(String),

    #[error("Trading limit exceeded ({limit}): {detail}")]
    LimitExceeded { limit: LimitKind, detail: String },

    #[error("Order not found: {0}")]
    OrderNotFound(Uuid),

    #[error("Order {id} cannot be canceled in status {status}")]
    OrderNotCancelable { id: Uuid, status: OrderStatus },

    #[error("Position not found: {0}")]
    PositionNotFound(String),

    #[error("No open position to sell for {0}")]
    NoPositionToSell(String),

    #[error("Data error: {0}")]
    Data(#[from] DataError),
}

/// Watchlist errors.
#[derive(Error, Debug, Clone)]
pub enum WatchlistError {
    #[error("Invalid symbol: {0:?}")]
    InvalidSymbol(String),

    #[error("Invalid quantity: {0}")]
    InvalidQuantity(Decimal),

    #[error("Watchlist item not found: {0}")]
    ItemNotFound(String),

    #[error("Failed to execute {symbol} ({item_id}): {source}")]
    Execution {
        item_id: String,
        symbol: String,
        #[source]
        source: EngineError,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transient_classification() {
        let conn = SourceError::new("polygon", SourceErrorCode::Connection, "reset");
        assert!(conn.is_transient());

        let throttled = SourceError::new("polygon", SourceErrorCode::Api, "slow down").with_status(429);
        assert!(throttled.is_transient());

        let server = SourceError::new("polygon", SourceErrorCode::Api, "oops").with_status(503);
        assert!(server.is_transient());

        let forbidden = SourceError::new("polygon", SourceErrorCode::Api, "bad key").with_status(403);
        assert!(!forbidden.is_transient());

        let parse = SourceError::new("polygon", SourceErrorCode::ResponseParse, "eof");
        assert!(!parse.is_transient());
    }

    #[test]
    fn test_source_error_display() {
        let err = SourceError::new("polygon", SourceErrorCode::Api, "401 Unauthorized");
        assert_eq!(err.to_string(), "polygon [API_ERROR]: 401 Unauthorized");

        let aggregate = DataError::AllSourcesFailed(Box::new(err.into()));
        assert_eq!(
            aggregate.to_string(),
            "All data sources failed, last error: polygon [API_ERROR]: 401 Unauthorized"
        );
        assert_eq!(
            aggregate.source_error().map(|e| e.code),
            Some(SourceErrorCode::Api)
        );
    }
}
