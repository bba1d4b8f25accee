//! Aggregate statistics over closed trades.

use rust_decimal::Decimal;
use trading_core::types::{Trade, TradeStats};

/// Summarize closed trades.
///
/// Win rate and average hold time are taken over all trades, break-even
/// ones included. `profit_factor` is `None` when no trade lost money.
/// Sharpe ratio and max drawdown are left unset.
pub fn trade_stats<'a>(trades: impl IntoIterator<Item = &'a Trade>) -> TradeStats {
    let mut stats = TradeStats::default();
    let mut gross_profit = Decimal::ZERO;
    let mut gross_loss = Decimal::ZERO;
    let mut hold_hours = 0.0;

    for trade in trades {
        stats.total_trades += 1;
        stats.total_pnl += trade.realized_pnl;
        hold_hours += trade.hold_time_hours;

        if trade.is_win() {
            stats.winning_trades += 1;
            gross_profit += trade.realized_pnl;
            stats.largest_win = stats.largest_win.max(trade.realized_pnl);
        } else if trade.is_loss() {
            stats.losing_trades += 1;
            gross_loss += trade.realized_pnl.abs();
            stats.largest_loss = stats.largest_loss.min(trade.realized_pnl);
        }
    }

    if stats.total_trades == 0 {
        return stats;
    }

    stats.win_rate = stats.winning_trades as f64 / stats.total_trades as f64;
    stats.average_hold_time_hours = hold_hours / stats.total_trades as f64;
    if stats.winning_trades > 0 {
        stats.average_win = gross_profit / Decimal::from(stats.winning_trades);
    }
    if stats.losing_trades > 0 {
        stats.average_loss = gross_loss / Decimal::from(stats.losing_trades);
    }
    if gross_loss > Decimal::ZERO {
        stats.profit_factor = Some(gross_profit / gross_loss);
    }

    stats
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use rust_decimal_macros::dec;
    use trading_core::types::{Order, OrderRequest, Side};
    use uuid::Uuid;

    fn trade(pnl: Decimal, hours: f64) -> Trade {
        let entry = Order::from_request(&OrderRequest::market("AAPL", Side::Buy, dec!(10)));
        Trade {
            id: Uuid::new_v4(),
            symbol: "AAPL".to_string(),
            entry_order: entry,
            exit_order: None,
            entry_price: dec!(100),
            exit_price: dec!(100) + pnl / dec!(10),
            quantity: dec!(10),
            realized_pnl: pnl,
            pnl_percent: pnl / dec!(10),
            opened_at: Utc::now(),
            closed_at: Utc::now(),
            hold_time_hours: hours,
        }
    }

    #[test]
    fn test_no_trades() {
        let stats = trade_stats(std::iter::empty());
        assert_eq!(stats, TradeStats::default());
        assert_eq!(stats.win_rate, 0.0);
        assert_eq!(stats.profit_factor, None);
    }

    #[test]
    fn test_mixed_trades() {
        let trades = vec![
            trade(dec!(300), 2.0),
            trade(dec!(100), 4.0),
            trade(dec!(-200), 6.0),
            trade(Decimal::ZERO, 0.0),
        ];
        let stats = trade_stats(&trades);

        assert_eq!(stats.total_trades, 4);
        assert_eq!(stats.winning_trades, 2);
        assert_eq!(stats.losing_trades, 1);
        assert_eq!(stats.win_rate, 0.5);
        assert_eq!(stats.average_win, dec!(200));
        assert_eq!(stats.average_loss, dec!(200));
        assert_eq!(stats.largest_win, dec!(300));
        assert_eq!(stats.largest_loss, dec!(-200));
        assert_eq!(stats.total_pnl, dec!(200));
        assert_eq!(stats.profit_factor, Some(dec!(2)));
        assert_eq!(stats.average_hold_time_hours, 3.0);
        assert_eq!(stats.sharpe_ratio, None);
        assert_eq!(stats.max_drawdown, None);
    }

    #[test]
    fn test_only_wins_has_no_profit_factor() {
        let stats = trade_stats(&[trade(dec!(50), 1.0)]);
        assert_eq!(stats.win_rate, 1.0);
        assert_eq!(stats.profit_factor, None);
        assert_eq!(stats.largest_loss, Decimal::ZERO);
    }
}
