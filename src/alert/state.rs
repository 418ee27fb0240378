//! Persisted alert state
//!
//! One keyed JSON document holding, per (event, market kind, side), the last
//! alerted snapshot and wall-clock timestamps, plus pending line-move
//! records per (event, market kind). The schema is additive-only: every
//! field defaults on read so older state files keep loading.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// State store failures. Fatal for the current cycle's decisions: the
/// pipeline must not proceed on unknown state.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("state store io: {0}")]
    Io(#[from] std::io::Error),
    #[error("state store parse: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Per (event, kind, side) alert bookkeeping.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SignalState {
    #[serde(default)]
    pub last_alerted_observed_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub last_alerted_wallclock: Option<DateTime<Utc>>,
}

/// A line-change observation awaiting reconfirmation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PendingMove {
    pub from_line: Decimal,
    pub to_line: Decimal,
    /// Price on the old line when the move was first seen
    pub reference_price: Decimal,
    pub first_seen_observed_at: DateTime<Utc>,
    pub first_seen_wallclock: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

/// Per (event, kind) line-move bookkeeping.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MoveState {
    #[serde(default)]
    pub last_sent_wallclock: Option<DateTime<Utc>>,
    #[serde(default)]
    pub last_from: Option<Decimal>,
    #[serde(default)]
    pub last_to: Option<Decimal>,
    /// Pending confirmations keyed by side
    #[serde(default)]
    pub pending: BTreeMap<String, PendingMove>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct StateDoc {
    #[serde(default)]
    warmup_done: bool,
    #[serde(default)]
    signals: BTreeMap<String, SignalState>,
    #[serde(default)]
    moves: BTreeMap<String, MoveState>,
}

/// The single owner of persisted alert state. Stale keys are never deleted;
/// they are harmless and bounded by event volume.
pub struct AlertStateStore {
    path: Option<PathBuf>,
    doc: StateDoc,
}

impl AlertStateStore {
    /// Volatile store for tests and dry runs.
    pub fn in_memory() -> Self {
        Self {
            path: None,
            doc: StateDoc::default(),
        }
    }

    /// Load from disk; a missing file yields a fresh store.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path = path.as_ref().to_path_buf();
        let doc = match std::fs::read_to_string(&path) {
            Ok(content) => serde_json::from_str(&content)?,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => StateDoc::default(),
            Err(err) => return Err(err.into()),
        };
        Ok(Self {
            path: Some(path),
            doc,
        })
    }

    pub fn save(&self) -> Result<(), StoreError> {
        let Some(path) = &self.path else {
            return Ok(());
        };
        let content = serde_json::to_string_pretty(&self.doc)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    pub fn warmup_done(&self) -> bool {
        self.doc.warmup_done
    }

    pub fn set_warmup_done(&mut self) {
        self.doc.warmup_done = true;
    }

    pub fn signal(&self, key: &str) -> Option<&SignalState> {
        self.doc.signals.get(key)
    }

    pub fn signal_mut(&mut self, key: &str) -> &mut SignalState {
        self.doc.signals.entry(key.to_string()).or_default()
    }

    pub fn moves(&self, key: &str) -> Option<&MoveState> {
        self.doc.moves.get(key)
    }

    pub fn moves_mut(&mut self, key: &str) -> &mut MoveState {
        self.doc.moves.entry(key.to_string()).or_default()
    }
}
