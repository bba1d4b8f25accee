//! Closed round trips and their statistics.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::Order;

/// A closed round trip. Immutable once recorded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trade {
    /// Trade ID
    pub id: Uuid,
    /// Symbol
    pub symbol: String,
    /// Order that opened the position
    pub entry_order: Order,
    /// Order that closed the position
    pub exit_order: Option<Order>,
    /// Weighted average entry price
    pub entry_price: Decimal,
    /// Fill price of the closing order
    pub exit_price: Decimal,
    /// Total quantity sold over the life of the position
    pub quantity: Decimal,
    /// Realized P&L over the life of the position
    pub realized_pnl: Decimal,
    /// Realized P&L relative to the cost of the quantity sold, in percent
    pub pnl_percent: Decimal,
    /// When the position was opened
    pub opened_at: DateTime<Utc>,
    /// When the position was closed
    pub closed_at: DateTime<Utc>,
    /// Hold time in hours
    pub hold_time_hours: f64,
}

impl Trade {
    /// Check if the trade made money.
    pub fn is_win(&self) -> bool {
        self.realized_pnl > Decimal::ZERO
    }

    /// Check if the trade lost money.
    pub fn is_loss(&self) -> bool {
        self.realized_pnl < Decimal::ZERO
    }
}

/// Aggregate statistics over closed trades.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TradeStats {
    /// Total number of trades
    pub total_trades: usize,
    /// Number of winning trades
    pub winning_trades: usize,
    /// Number of losing trades
    pub losing_trades: usize,
    /// Winning trades over total trades (0..=1)
    pub win_rate: f64,
    /// Average profit per winning trade
    pub average_win: Decimal,
    /// Average loss magnitude per losing trade
    pub average_loss: Decimal,
    /// Best trade P&L
    pub largest_win: Decimal,
    /// Worst trade P&L (negative)
    pub largest_loss: Decimal,
    /// Sum of realized P&L
    pub total_pnl: Decimal,
    /// Gross profit over gross loss; `None` when there are no losses
    pub profit_factor: Option<Decimal>,
    /// Mean hold time in hours
    pub average_hold_time_hours: f64,
    /// Not computed: requires a return series and risk-free rate
    pub sharpe_ratio: Option<f64>,
    /// Not computed: requires an equity curve
    pub max_drawdown: Option<Decimal>,
}
