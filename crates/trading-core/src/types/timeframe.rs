//! Bar timeframes.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::DataError;

/// Calendar unit a timeframe is counted in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Span {
    Minute,
    Hour,
    Day,
    Week,
    Month,
}

impl Span {
    /// Unit name as used in aggregate range URLs.
    pub fn as_str(&self) -> &'static str {
        match self {
            Span::Minute => "minute",
            Span::Hour => "hour",
            Span::Day => "day",
            Span::Week => "week",
            Span::Month => "month",
        }
    }

    fn suffix(&self) -> char {
        match self {
            Span::Minute => 'm',
            Span::Hour => 'h',
            Span::Day => 'd',
            Span::Week => 'w',
            Span::Month => 'M',
        }
    }
}

/// Width of one bar.
///
/// Serialized and displayed as a compact label (`"15m"`, `"1d"`, `"1M"`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum Timeframe {
    #[serde(rename = "1m", alias = "minute")]
    Minute1,
    #[serde(rename = "5m")]
    Minute5,
    #[serde(rename = "15m")]
    Minute15,
    #[serde(rename = "30m")]
    Minute30,
    #[serde(rename = "1h", alias = "hour")]
    Hour1,
    #[serde(rename = "4h")]
    Hour4,
    #[serde(rename = "1d", alias = "day", alias = "daily")]
    #[default]
    Daily,
    #[serde(rename = "1w", alias = "week", alias = "weekly")]
    Weekly,
    #[serde(rename = "1M", alias = "month", alias = "monthly")]
    Monthly,
}

impl Timeframe {
    pub const ALL: [Timeframe; 9] = [
        Timeframe::Minute1,
        Timeframe::Minute5,
        Timeframe::Minute15,
        Timeframe::Minute30,
        Timeframe::Hour1,
        Timeframe::Hour4,
        Timeframe::Daily,
        Timeframe::Weekly,
        Timeframe::Monthly,
    ];

    /// Multiplier and unit, e.g. `(15, Span::Minute)`.
    pub fn range(&self) -> (u32, Span) {
        match self {
            Timeframe::Minute1 => (1, Span::Minute),
            Timeframe::Minute5 => (5, Span::Minute),
            Timeframe::Minute15 => (15, Span::Minute),
            Timeframe::Minute30 => (30, Span::Minute),
            Timeframe::Hour1 => (1, Span::Hour),
            Timeframe::Hour4 => (4, Span::Hour),
            Timeframe::Daily => (1, Span::Day),
            Timeframe::Weekly => (1, Span::Week),
            Timeframe::Monthly => (1, Span::Month),
        }
    }

    /// Lowercase spellings accepted besides the compact label.
    fn aliases(&self) -> &'static [&'static str] {
        match self {
            Timeframe::Minute1 => &["1min", "minute"],
            Timeframe::Minute5 => &["5min"],
            Timeframe::Minute15 => &["15min"],
            Timeframe::Minute30 => &["30min"],
            Timeframe::Hour1 => &["1hour", "hour"],
            Timeframe::Hour4 => &["4hour"],
            Timeframe::Daily => &["day", "daily"],
            Timeframe::Weekly => &["week", "weekly"],
            Timeframe::Monthly => &["month", "monthly"],
        }
    }
}

impl fmt::Display for Timeframe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (multiplier, span) = self.range();
        write!(f, "{}{}", multiplier, span.suffix())
    }
}

impl FromStr for Timeframe {
    type Err = DataError;

    /// Labels match exactly (`"1m"` is a minute, `"1M"` a month); word
    /// aliases are case-insensitive.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let lower = s.to_lowercase();
        Self::ALL
            .into_iter()
            .find(|tf| tf.to_string() == s)
            .or_else(|| {
                Self::ALL
                    .into_iter()
                    .find(|tf| tf.to_string() == lower || tf.aliases().contains(&lower.as_str()))
            })
            .ok_or_else(|| DataError::InvalidTimeframe(s.to_string()))
    }
}
