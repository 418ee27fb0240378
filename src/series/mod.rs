//! Bet line series module
//!
//! Reconstructs per-market price histories from raw snapshot rows and picks
//! the displayed mainline for handicap/total markets.

mod builder;
mod mainline;
mod types;

pub use builder::{build_tables, normalize_line};
pub use mainline::{select_mainline, LineQuote};
pub use types::{BetSeries, MarketTables, SeriesPoint};
