//! Order types and structures.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::error::EngineError;

/// Order side (buy or sell).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    Buy,
    Sell,
}

impl Side {
    /// Get the opposite side.
    pub fn opposite(&self) -> Self {
        match self {
            Side::Buy => Side::Sell,
            Side::Sell => Side::Buy,
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Side::Buy => write!(f, "BUY"),
            Side::Sell => write!(f, "SELL"),
        }
    }
}

impl FromStr for Side {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "buy" => Ok(Side::Buy),
            "sell" => Ok(Side::Sell),
            _ => Err(EngineError::InvalidOrderSide(s.to_string())),
        }
    }
}

/// Order type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderType {
    /// Market order - execute immediately at best available price
    Market,
    /// Limit order - execute at specified price or better
    Limit,
    /// Stop order - becomes market order when stop price is reached
    Stop,
}

impl fmt::Display for OrderType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OrderType::Market => write!(f, "MARKET"),
            OrderType::Limit => write!(f, "LIMIT"),
            OrderType::Stop => write!(f, "STOP"),
        }
    }
}

impl FromStr for OrderType {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "market" => Ok(OrderType::Market),
            "limit" => Ok(OrderType::Limit),
            "stop" => Ok(OrderType::Stop),
            _ => Err(EngineError::InvalidOrderType(s.to_string())),
        }
    }
}

/// Order status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    /// Order created but not yet submitted
    Pending,
    /// Order submitted to the venue
    Submitted,
    /// Order accepted and waiting for a fill
    Accepted,
    /// Order rejected
    Rejected,
    /// Order completely filled
    Filled,
    /// Order partially filled
    Partial,
    /// Order canceled
    Canceled,
    /// Order expired
    Expired,
}

impl OrderStatus {
    /// Check if the order is in a terminal state.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            OrderStatus::Filled | OrderStatus::Canceled | OrderStatus::Rejected | OrderStatus::Expired
        )
    }

    /// Check if the order is active (can still be filled).
    pub fn is_active(&self) -> bool {
        !self.is_terminal()
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            OrderStatus::Pending => "pending",
            OrderStatus::Submitted => "submitted",
            OrderStatus::Accepted => "accepted",
            OrderStatus::Rejected => "rejected",
            OrderStatus::Filled => "filled",
            OrderStatus::Partial => "partial",
            OrderStatus::Canceled => "canceled",
            OrderStatus::Expired => "expired",
        };
        f.write_str(s)
    }
}

/// Order request for submitting new orders.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderRequest {
    /// Symbol to trade
    pub symbol: String,
    /// Buy or sell
    pub side: Side,
    /// Type of order
    pub order_type: OrderType,
    /// Quantity to trade
    pub quantity: Decimal,
    /// Limit price for limit orders, trigger price for stop orders
    pub price: Option<Decimal>,
    /// Client-provided order ID
    pub client_order_id: Option<String>,
}

impl OrderRequest {
    /// Create a market order request.
    pub fn market(symbol: impl Into<String>, side: Side, quantity: Decimal) -> Self {
        Self {
            symbol: symbol.into(),
            side,
            order_type: OrderType::Market,
            quantity,
            price: None,
            client_order_id: None,
        }
    }

    /// Create a limit order request.
    pub fn limit(symbol: impl Into<String>, side: Side, quantity: Decimal, price: Decimal) -> Self {
        Self {
            order_type: OrderType::Limit,
            price: Some(price),
            ..Self::market(symbol, side, quantity)
        }
    }

    /// Create a stop order request.
    pub fn stop(symbol: impl Into<String>, side: Side, quantity: Decimal, price: Decimal) -> Self {
        Self {
            order_type: OrderType::Stop,
            price: Some(price),
            ..Self::market(symbol, side, quantity)
        }
    }

    /// Set a client order ID.
    pub fn with_client_order_id(mut self, id: impl Into<String>) -> Self {
        self.client_order_id = Some(id.into());
        self
    }
}

/// Complete order with status and fill information.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    /// Unique order ID
    pub id: Uuid,
    /// Client-provided order ID
    pub client_order_id: Option<String>,
    /// Symbol traded
    pub symbol: String,
    /// Buy or sell
    pub side: Side,
    /// Type of order
    pub order_type: OrderType,
    /// Original quantity
    pub quantity: Decimal,
    /// Limit or stop price
    pub price: Option<Decimal>,
    /// Current status
    pub status: OrderStatus,
    /// Quantity filled so far
    pub filled_quantity: Decimal,
    /// Average fill price
    pub avg_fill_price: Option<Decimal>,
    /// Commission charged
    pub commission: Decimal,
    /// Why the order was rejected
    pub reject_reason: Option<String>,
    /// When the order was created
    pub created_at: DateTime<Utc>,
    /// When the order was last updated
    pub updated_at: DateTime<Utc>,
    /// When the order was filled
    pub filled_at: Option<DateTime<Utc>>,
    /// When the order was canceled
    pub canceled_at: Option<DateTime<Utc>>,
}

impl Order {
    /// Create a new pending order from a request.
    pub fn from_request(request: &OrderRequest) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            client_order_id: request.client_order_id.clone(),
            symbol: request.symbol.clone(),
            side: request.side,
            order_type: request.order_type,
            quantity: request.quantity,
            price: request.price,
            status: OrderStatus::Pending,
            filled_quantity: Decimal::ZERO,
            avg_fill_price: None,
            commission: Decimal::ZERO,
            reject_reason: None,
            created_at: now,
            updated_at: now,
            filled_at: None,
            canceled_at: None,
        }
    }

    /// Get the remaining quantity to be filled.
    pub fn remaining_quantity(&self) -> Decimal {
        self.quantity - self.filled_quantity
    }

    /// Check if the order is completely filled.
    pub fn is_filled(&self) -> bool {
        self.status == OrderStatus::Filled
    }

    /// Calculate the total value of the filled quantity.
    pub fn value(&self) -> Option<Decimal> {
        self.avg_fill_price.map(|price| price * self.filled_quantity)
    }

    /// Move the order to a new status.
    pub fn transition(&mut self, status: OrderStatus) {
        let now = Utc::now();
        self.status = status;
        self.updated_at = now;
        if status == OrderStatus::Canceled {
            self.canceled_at = Some(now);
        }
    }

    /// Fill the whole remaining quantity at `price`.
    pub fn fill(&mut self, price: Decimal) {
        let now = Utc::now();
        self.filled_quantity = self.quantity;
        self.avg_fill_price = Some(price);
        self.status = OrderStatus::Filled;
        self.filled_at = Some(now);
        self.updated_at = now;
    }

    /// Reject the order with a reason.
    pub fn reject(&mut self, reason: impl Into<String>) {
        self.reject_reason = Some(reason.into());
        self.transition(OrderStatus::Rejected);
    }
}
