//! Watchlists of candidate trades waiting for a price trigger.

mod item;
mod watchlist;

pub use item::{ItemStatus, WatchlistItem};
pub use watchlist::Watchlist;
