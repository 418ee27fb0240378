//! Signal detection module
//!
//! Turns bet line series into candidate drop signals and decides which
//! moves are significant enough to alert on.

mod differ;
mod interest;
mod types;

pub use differ::SnapshotDiffer;
pub use interest::{InterestConfig, InterestFilter, OddsBand, TickBand};
pub use types::{drop_pct, probability_gain, Signal};
