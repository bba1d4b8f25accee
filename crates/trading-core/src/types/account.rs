//! Account state and trading limits.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use super::Position;

/// Cash and P&L summary of the simulated account.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Account {
    /// Account identifier
    pub id: String,
    /// Starting cash
    pub initial_cash: Decimal,
    /// Available cash
    pub cash: Decimal,
    /// Buying power (cash times the margin multiplier)
    pub buying_power: Decimal,
    /// Multiplier applied to cash for buying power
    pub margin_multiplier: Decimal,
    /// Total equity (cash + market value of positions)
    pub equity: Decimal,
    /// Market value of open positions
    pub market_value: Decimal,
    /// Borrowed amount when cash is negative
    pub margin_used: Decimal,
    /// Realized P&L across closed and reduced positions
    pub realized_pnl: Decimal,
    /// Unrealized P&L across open positions
    pub unrealized_pnl: Decimal,
    /// Realized plus unrealized P&L
    pub total_pnl: Decimal,
    /// Positions opened and closed on the same UTC day
    pub day_trade_count: u32,
    /// When the account last changed
    pub updated_at: DateTime<Utc>,
}

impl Account {
    /// Create a fresh account.
    pub fn new(id: impl Into<String>, initial_cash: Decimal, margin_multiplier: Decimal) -> Self {
        Self {
            id: id.into(),
            initial_cash,
            cash: initial_cash,
            buying_power: initial_cash * margin_multiplier,
            margin_multiplier,
            equity: initial_cash,
            market_value: Decimal::ZERO,
            margin_used: Decimal::ZERO,
            realized_pnl: Decimal::ZERO,
            unrealized_pnl: Decimal::ZERO,
            total_pnl: Decimal::ZERO,
            day_trade_count: 0,
            updated_at: Utc::now(),
        }
    }

    /// Recompute derived fields from the open positions.
    pub fn recalculate<'a>(&mut self, positions: impl IntoIterator<Item = &'a Position>) {
        let (market_value, unrealized) = positions
            .into_iter()
            .fold((Decimal::ZERO, Decimal::ZERO), |(mv, pnl), p| {
                (mv + p.market_value, pnl + p.unrealized_pnl)
            });

        self.market_value = market_value;
        self.unrealized_pnl = unrealized;
        self.equity = self.cash + market_value;
        self.total_pnl = self.realized_pnl + unrealized;
        self.buying_power = (self.cash * self.margin_multiplier).max(Decimal::ZERO);
        self.margin_used = (-self.cash).max(Decimal::ZERO);
        self.updated_at = Utc::now();
    }

    /// Total P&L as a percentage of initial cash.
    pub fn pnl_percent(&self) -> Decimal {
        if self.initial_cash == Decimal::ZERO {
            return Decimal::ZERO;
        }
        self.total_pnl / self.initial_cash * dec!(100)
    }
}

/// Configured trading limits.
///
/// Zero disables `max_daily_trades`, `max_position_size_percent` and the
/// stop-loss / take-profit percentages.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TradingLimits {
    /// Maximum number of open positions
    pub max_positions: usize,
    /// Largest position cost as a percentage of equity
    pub max_position_size_percent: Decimal,
    /// Maximum fills per UTC day
    pub max_daily_trades: u32,
    /// Default stop-loss distance below entry, in percent
    pub stop_loss_percent: Decimal,
    /// Default take-profit distance above entry, in percent
    pub take_profit_percent: Decimal,
}

impl Default for TradingLimits {
    fn default() -> Self {
        Self {
            max_positions: 10,
            max_position_size_percent: dec!(25),
            max_daily_trades: 0,
            stop_loss_percent: Decimal::ZERO,
            take_profit_percent: Decimal::ZERO,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    #[test]
    fn test_account_recalculate() {
        let mut account = Account::new("paper", dec!(100000), dec!(2));
        assert_eq!(account.buying_power, dec!(200000));

        let mut position = Position::open("AAPL", dec!(100), dec!(150), Uuid::new_v4());
        account.cash -= dec!(15000);
        position.update_price(dec!(160));
        account.recalculate([&position]);

        assert_eq!(account.market_value, dec!(16000));
        assert_eq!(account.equity, dec!(101000));
        assert_eq!(account.unrealized_pnl, dec!(1000));
        assert_eq!(account.total_pnl, dec!(1000));
        assert_eq!(account.buying_power, dec!(170000));
        assert_eq!(account.pnl_percent(), dec!(1));
    }

    #[test]
    fn test_limits_deserialize_with_defaults() {
        let limits: TradingLimits = serde_json::from_str(r#"{"max_positions": 3}"#).unwrap();
        assert_eq!(limits.max_positions, 3);
        assert_eq!(limits.max_position_size_percent, dec!(25));
        assert_eq!(limits.max_daily_trades, 0);
    }
}
