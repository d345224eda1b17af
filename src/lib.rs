//! Momentum Breakout Screener
//!
//! Screens a universe of US equities for the Riser → Tread → Breakout
//! pattern: a liquidity and trend filter, a signal detector over a 63-bar
//! window, and a risk engine that sizes BUY and SETUP candidates against a
//! fixed account risk budget.

pub mod config;
pub mod data;
pub mod history;
pub mod indicators;
pub mod market;
pub mod risk;
pub mod scan;
pub mod screener;
pub mod signals;
pub mod types;

pub use config::Config;
pub use scan::{run_scan, AcceptedEntry, ScanReport};
pub use types::*;
