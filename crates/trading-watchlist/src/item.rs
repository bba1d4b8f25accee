//! Watchlist items and their trigger rules.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use trading_core::types::Side;
use trading_scanner::ScanResult;
use uuid::Uuid;

/// Lifecycle of a watchlist item.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemStatus {
    /// Waiting for its price condition
    #[default]
    Active,
    /// Price condition fired
    Triggered,
    /// Expiry passed before a trigger
    Expired,
    /// Retired by hand
    Invalid,
}

impl fmt::Display for ItemStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ItemStatus::Active => "active",
            ItemStatus::Triggered => "triggered",
            ItemStatus::Expired => "expired",
            ItemStatus::Invalid => "invalid",
        };
        f.write_str(s)
    }
}

/// A candidate trade awaiting a price trigger.
///
/// Buy-side items fire at or below `target_price`. Sell-side items fire at
/// or below `stop_loss` or at or above `take_profit`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WatchlistItem {
    /// Generated on insert when empty
    #[serde(default)]
    pub id: String,
    pub symbol: String,
    /// Buy list or sell list
    pub side: Side,
    #[serde(default)]
    pub target_price: Option<Decimal>,
    #[serde(default)]
    pub stop_loss: Option<Decimal>,
    #[serde(default)]
    pub take_profit: Option<Decimal>,
    pub quantity: Decimal,
    #[serde(default)]
    pub status: ItemStatus,
    #[serde(default = "Utc::now")]
    pub added_at: DateTime<Utc>,
    #[serde(default = "Utc::now")]
    pub updated_at: DateTime<Utc>,
    #[serde(default)]
    pub expires_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub triggered_at: Option<DateTime<Utc>>,
    /// Strategy that nominated the item
    #[serde(default)]
    pub strategy: Option<String>,
    /// Signals that nominated the item
    #[serde(default)]
    pub scan_results: Vec<ScanResult>,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    /// Order submitted for the item
    #[serde(default)]
    pub order_id: Option<Uuid>,
}

impl WatchlistItem {
    fn new(symbol: impl Into<String>, side: Side, quantity: Decimal) -> Self {
        let now = Utc::now();
        Self {
            id: String::new(),
            symbol: symbol.into(),
            side,
            target_price: None,
            stop_loss: None,
            take_profit: None,
            quantity,
            status: ItemStatus::Active,
            added_at: now,
            updated_at: now,
            expires_at: None,
            triggered_at: None,
            strategy: None,
            scan_results: Vec::new(),
            notes: None,
            tags: Vec::new(),
            order_id: None,
        }
    }

    /// Buy `quantity` once the price falls to `target_price`.
    pub fn buy(symbol: impl Into<String>, quantity: Decimal, target_price: Decimal) -> Self {
        Self {
            target_price: Some(target_price),
            ..Self::new(symbol, Side::Buy, quantity)
        }
    }

    /// Sell `quantity` at either protection level.
    pub fn sell(
        symbol: impl Into<String>,
        quantity: Decimal,
        stop_loss: Option<Decimal>,
        take_profit: Option<Decimal>,
    ) -> Self {
        Self {
            stop_loss,
            take_profit,
            ..Self::new(symbol, Side::Sell, quantity)
        }
    }

    pub fn with_expiry(mut self, expires_at: DateTime<Utc>) -> Self {
        self.expires_at = Some(expires_at);
        self
    }

    /// Record the strategy and signals behind the item.
    pub fn with_strategy(mut self, strategy: impl Into<String>, results: Vec<ScanResult>) -> Self {
        self.strategy = Some(strategy.into());
        self.scan_results = results;
        self
    }

    pub fn with_notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = Some(notes.into());
        self
    }

    pub fn is_active(&self) -> bool {
        self.status == ItemStatus::Active
    }

    /// Whether the expiry has passed at `now`.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_some_and(|at| at <= now)
    }

    /// Whether `last_price` fires the item's price condition.
    ///
    /// Unset or non-positive levels never fire.
    pub fn should_trigger(&self, last_price: Decimal) -> bool {
        let level = |price: Option<Decimal>| price.filter(|p| *p > Decimal::ZERO);
        match self.side {
            Side::Buy => level(self.target_price).is_some_and(|target| last_price <= target),
            Side::Sell => {
                level(self.stop_loss).is_some_and(|stop| last_price <= stop)
                    || level(self.take_profit).is_some_and(|take| last_price >= take)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use rust_decimal_macros::dec;

    #[test]
    fn test_buy_trigger_boundary() {
        let item = WatchlistItem::buy("AAPL", dec!(10), dec!(100.00));
        assert!(!item.should_trigger(dec!(100.01)));
        assert!(item.should_trigger(dec!(100.00)));
        assert!(item.should_trigger(dec!(99.99)));
    }

    #[test]
    fn test_sell_trigger_levels() {
        let item = WatchlistItem::sell("AAPL", dec!(10), Some(dec!(95)), Some(dec!(110)));
        assert!(!item.should_trigger(dec!(100)));
        assert!(item.should_trigger(dec!(95)));
        assert!(item.should_trigger(dec!(110)));

        let stop_only = WatchlistItem::sell("AAPL", dec!(10), Some(dec!(95)), None);
        assert!(!stop_only.should_trigger(dec!(1000)));

        let unset = WatchlistItem::sell("AAPL", dec!(10), None, Some(Decimal::ZERO));
        assert!(!unset.should_trigger(dec!(1)));
    }

    #[test]
    fn test_expiry() {
        let now = Utc::now();
        let item = WatchlistItem::buy("AAPL", dec!(1), dec!(1)).with_expiry(now - Duration::minutes(1));
        assert!(item.is_expired(now));
        assert!(!WatchlistItem::buy("AAPL", dec!(1), dec!(1)).is_expired(now));
    }

    #[test]
    fn test_deserialize_with_defaults() {
        let json = r#"{"symbol":"MSFT","side":"sell","quantity":"5","take_profit":"420.5"}"#;
        let item: WatchlistItem = serde_json::from_str(json).unwrap();
        assert_eq!(item.status, ItemStatus::Active);
        assert_eq!(item.side, Side::Sell);
        assert_eq!(item.take_profit, Some(dec!(420.5)));
        assert!(item.id.is_empty());
        assert!(item.scan_results.is_empty());
    }
}
