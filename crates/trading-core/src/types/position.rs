//! Position types.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A long holding in a single security.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Position {
    /// Symbol
    pub symbol: String,
    /// Number of shares held
    pub quantity: Decimal,
    /// Weighted average entry price
    pub entry_price: Decimal,
    /// Current market price
    pub current_price: Decimal,
    /// Market value (quantity * current_price)
    pub market_value: Decimal,
    /// Cost basis (quantity * entry_price)
    pub cost_basis: Decimal,
    /// Unrealized profit/loss
    pub unrealized_pnl: Decimal,
    /// Unrealized P&L as a percentage of cost
    pub unrealized_pnl_percent: Decimal,
    /// Realized profit/loss from reductions so far
    pub realized_pnl: Decimal,
    /// Shares sold from the position so far
    #[serde(default)]
    pub closed_quantity: Decimal,
    /// Protective stop price
    pub stop_loss: Option<Decimal>,
    /// Profit target price
    pub take_profit: Option<Decimal>,
    /// Order that opened the position
    pub entry_order_id: Uuid,
    /// When the position was opened
    pub opened_at: DateTime<Utc>,
    /// When the position last changed
    pub updated_at: DateTime<Utc>,
}

impl Position {
    /// Open a new position from a filled buy.
    pub fn open(
        symbol: impl Into<String>,
        quantity: Decimal,
        price: Decimal,
        entry_order_id: Uuid,
    ) -> Self {
        let now = Utc::now();
        Self {
            symbol: symbol.into(),
            quantity,
            entry_price: price,
            current_price: price,
            market_value: quantity * price,
            cost_basis: quantity * price,
            unrealized_pnl: Decimal::ZERO,
            unrealized_pnl_percent: Decimal::ZERO,
            realized_pnl: Decimal::ZERO,
            closed_quantity: Decimal::ZERO,
            stop_loss: None,
            take_profit: None,
            entry_order_id,
            opened_at: now,
            updated_at: now,
        }
    }

    /// Check if the position has been fully reduced.
    pub fn is_closed(&self) -> bool {
        self.quantity <= Decimal::ZERO
    }

    /// Update the current market price and recalculate values.
    pub fn update_price(&mut self, price: Decimal) {
        self.current_price = price;
        self.market_value = self.quantity * price;
        self.unrealized_pnl = self.market_value - self.cost_basis;

        self.unrealized_pnl_percent = if self.cost_basis != Decimal::ZERO {
            (self.unrealized_pnl / self.cost_basis.abs()) * Decimal::from(100)
        } else {
            Decimal::ZERO
        };
        self.updated_at = Utc::now();
    }

    /// Add to the position at `price` using weighted-average cost.
    pub fn increase(&mut self, quantity: Decimal, price: Decimal) {
        let new_quantity = self.quantity + quantity;
        if new_quantity > Decimal::ZERO {
            self.entry_price = (self.cost_basis + quantity * price) / new_quantity;
        }
        self.quantity = new_quantity;
        self.cost_basis = self.quantity * self.entry_price;
        self.update_price(price);
    }

    /// Reduce the position at `price`, returning the realized P&L.
    pub fn reduce(&mut self, quantity: Decimal, price: Decimal) -> Decimal {
        let realized = quantity * (price - self.entry_price);
        self.realized_pnl += realized;
        self.closed_quantity += quantity;
        self.quantity -= quantity;
        self.cost_basis = self.quantity * self.entry_price;
        self.update_price(price);
        realized
    }

    /// Derive stop-loss and take-profit from the entry price.
    ///
    /// A zero percentage clears the corresponding level.
    pub fn set_protection(&mut self, stop_loss_percent: Decimal, take_profit_percent: Decimal) {
        let hundred = Decimal::from(100);
        self.stop_loss = (stop_loss_percent > Decimal::ZERO)
            .then(|| self.entry_price * (Decimal::ONE - stop_loss_percent / hundred));
        self.take_profit = (take_profit_percent > Decimal::ZERO)
            .then(|| self.entry_price * (Decimal::ONE + take_profit_percent / hundred));
    }
}
