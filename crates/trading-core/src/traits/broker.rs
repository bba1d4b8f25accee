//! Broker trait definition.

use crate::error::EngineError;
use crate::types::{Account, Order, OrderRequest, Position};
use async_trait::async_trait;
use rust_decimal::Decimal;
use uuid::Uuid;

/// Order execution boundary.
///
/// The in-process trading engine implements this by filling against a
/// fetched quote. A real broker integration implements the same contract.
#[async_trait]
pub trait Broker: Send + Sync {
    /// Submit a new order.
    ///
    /// # Arguments
    /// * `request` - The order request to submit
    ///
    /// # Returns
    /// The stored order with its ID and current status
    async fn submit_order(&self, request: OrderRequest) -> Result<Order, EngineError>;

    /// Cancel an existing order.
    ///
    /// # Arguments
    /// * `order_id` - The ID of the order to cancel
    async fn cancel_order(&self, order_id: Uuid) -> Result<Order, EngineError>;

    /// Get an order by ID.
    async fn get_order(&self, order_id: Uuid) -> Result<Order, EngineError>;

    /// Get all orders that are not in a terminal state.
    async fn get_open_orders(&self) -> Result<Vec<Order>, EngineError>;

    /// Get all open positions.
    async fn get_positions(&self) -> Result<Vec<Position>, EngineError>;

    /// Get the position for a specific symbol.
    async fn get_position(&self, symbol: &str) -> Result<Position, EngineError>;

    /// Close all or part of a position with a market order.
    ///
    /// # Arguments
    /// * `symbol` - The symbol to close
    /// * `quantity` - Shares to sell; `None` or more than held closes everything
    async fn close_position(
        &self,
        symbol: &str,
        quantity: Option<Decimal>,
    ) -> Result<Order, EngineError>;

    /// Get account information.
    async fn get_account(&self) -> Result<Account, EngineError>;

    /// Get the broker name.
    fn name(&self) -> &str;
}
