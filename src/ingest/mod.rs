//! Ingestion/storage collaborator interface
//!
//! The monitor never talks to bookmaker feeds directly; it queries a storage
//! collaborator that holds the snapshot history, the factor catalog, and a
//! live per-event detail document.

mod client;
mod types;

pub use client::{FetchError, HttpSnapshotSource, SourceConfig};
pub use types::{EventSummary, QuoteSnapshot};

use crate::classify::FactorId;
use async_trait::async_trait;
use rust_decimal::Decimal;
use serde_json::Value;
use std::collections::HashMap;

/// Read-only access to the odds store
#[async_trait]
pub trait SnapshotSource: Send + Sync {
    /// Candidate events for the lookback window. `min_pct_hint` is a
    /// server-side pre-filter so quiet events are pruned cheaply.
    async fn candidate_events(
        &self,
        hours: u32,
        min_pct_hint: Decimal,
    ) -> Result<Vec<EventSummary>, FetchError>;

    /// Ordered quote snapshots for one event.
    async fn event_snapshots(
        &self,
        event_id: i64,
        hours: u32,
    ) -> Result<Vec<QuoteSnapshot>, FetchError>;

    /// Raw catalog records keyed by factor id.
    async fn catalog_records(
        &self,
        factor_ids: &[FactorId],
    ) -> Result<HashMap<FactorId, Value>, FetchError>;

    /// Live per-event detail document (expensive; callers cache it).
    async fn event_detail(&self, event_id: i64) -> Result<Value, FetchError>;
}
