//! CLI command implementations.

pub mod health;
pub mod indicators;
pub mod scan;
pub mod validate;
pub mod watch;
