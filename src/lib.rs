//! odds-watch: prematch odds-drop monitor for sportsbook betting markets
//!
//! This library provides the core components for:
//! - Classifying opaque per-bet factor ids into semantic markets
//! - Rebuilding per-market price histories with mainline selection
//! - Detecting significant price drops across irregular snapshots
//! - Multi-criterion interest filtering (percentage, probability, ticks)
//! - Anti-spam alert state with pending line-move confirmation
//! - Rendering and delivering operator alerts
//! - Full observability stack

pub mod alert;
pub mod classify;
pub mod cli;
pub mod config;
pub mod ingest;
pub mod pipeline;
pub mod series;
pub mod signal;
pub mod telemetry;
