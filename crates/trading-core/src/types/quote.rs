//! Quotes and symbol reference data.

use chrono::{DateTime, Utc};
use num_traits::FromPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// A point-in-time bid/ask/last snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Quote {
    /// Symbol
    pub symbol: String,
    /// Quote time
    pub timestamp: DateTime<Utc>,
    /// Best bid price
    pub bid_price: f64,
    /// Bid size
    pub bid_size: u64,
    /// Best ask price
    pub ask_price: f64,
    /// Ask size
    pub ask_size: u64,
    /// Last trade price
    pub last_price: f64,
    /// Last trade size
    pub last_size: u64,
    /// Source-tagged transaction id
    pub transaction_id: Option<String>,
}

impl Quote {
    /// Get the mid price.
    pub fn mid(&self) -> f64 {
        (self.bid_price + self.ask_price) / 2.0
    }

    /// Get the spread.
    pub fn spread(&self) -> f64 {
        self.ask_price - self.bid_price
    }

    /// Get the spread as a percentage of the mid price.
    pub fn spread_percent(&self) -> f64 {
        let mid = self.mid();
        if mid == 0.0 {
            0.0
        } else {
            (self.spread() / mid) * 100.0
        }
    }

    /// Best available trade price: last trade, else the mid of a two-sided book.
    pub fn trade_price(&self) -> Option<f64> {
        if self.last_price > 0.0 {
            Some(self.last_price)
        } else if self.bid_price > 0.0 && self.ask_price > 0.0 {
            Some(self.mid())
        } else {
            None
        }
    }

    /// [`Quote::trade_price`] as a decimal.
    pub fn trade_price_decimal(&self) -> Option<Decimal> {
        self.trade_price().and_then(Decimal::from_f64)
    }
}

/// Static reference metadata for a tradable symbol.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Stock {
    pub symbol: String,
    pub name: String,
    pub exchange: String,
    #[serde(rename = "type")]
    pub security_type: String,
    pub currency: String,
    pub is_active: bool,
    pub description: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn quote(bid: f64, ask: f64, last: f64) -> Quote {
        Quote {
            symbol: "AAPL".to_string(),
            timestamp: Utc::now(),
            bid_price: bid,
            bid_size: 100,
            ask_price: ask,
            ask_size: 200,
            last_price: last,
            last_size: 10,
            transaction_id: None,
        }
    }

    #[test]
    fn test_quote_calculations() {
        let q = quote(149.95, 150.05, 150.0);

        assert!((q.mid() - 150.0).abs() < 0.001);
        assert!((q.spread() - 0.10).abs() < 0.001);
        assert!((q.spread_percent() - 0.0667).abs() < 0.01);
    }

    #[test]
    fn test_trade_price_fallbacks() {
        assert_eq!(quote(10.0, 12.0, 11.5).trade_price(), Some(11.5));
        assert_eq!(quote(10.0, 12.0, 0.0).trade_price(), Some(11.0));
        assert_eq!(quote(0.0, 12.0, 0.0).trade_price(), None);
        assert_eq!(
            quote(0.0, 0.0, 150.25).trade_price_decimal(),
            Some(Decimal::new(15025, 2))
        );
    }
}
