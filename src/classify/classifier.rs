//! Layered market classification
//!
//! Resolution order per factor id, first success wins:
//! 1. catalog record (authoritative, frequently incomplete)
//! 2. live per-event detail document (authoritative, expensive, cached)
//! 3. hard-coded table of well-known factor ids
//! 4. inference from the snapshot row's own label/line
//!
//! Classification never errors: an unresolvable factor stays `Other` and is
//! excluded from market tables downstream. Cached descriptors are refreshed
//! under a TTL and upgraded in place when a stronger source resolves them.

use super::catalog::normalize_record;
use super::detail::{parse_detail, MainlineHints};
use super::keywords::{classify_half, infer_from_row};
use super::types::{DescriptorSource, FactorId, MarketDescriptor, MarketKind};
use crate::classify::BetSide;
use crate::ingest::{QuoteSnapshot, SnapshotSource};
use chrono::{DateTime, Duration, Utc};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

/// Classifier cache configuration
#[derive(Debug, Clone)]
pub struct ClassifierConfig {
    /// How long a still-unresolved factor waits before the catalog is asked again
    pub catalog_ttl: Duration,
    /// How long a fetched detail document is served from cache
    pub detail_ttl: Duration,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            catalog_ttl: Duration::minutes(10),
            detail_ttl: Duration::minutes(5),
        }
    }
}

struct CachedDescriptor {
    descriptor: MarketDescriptor,
    refreshed_at: DateTime<Utc>,
}

struct CachedDetail {
    descriptors: HashMap<FactorId, MarketDescriptor>,
    hints: MainlineHints,
    fetched_at: DateTime<Utc>,
}

/// Maps opaque factor ids to semantic market descriptors.
pub struct MarketClassifier {
    source: Arc<dyn SnapshotSource>,
    config: ClassifierConfig,
    cache: HashMap<FactorId, CachedDescriptor>,
    details: HashMap<i64, CachedDetail>,
}

/// Well-known factor ids seen across production traffic. Consulted only
/// when the catalog and the detail document both come up empty.
fn fallback_descriptor(factor_id: FactorId) -> Option<MarketDescriptor> {
    let (kind, side, label) = match factor_id {
        921 => (MarketKind::Outcome, BetSide::Home, "1"),
        922 => (MarketKind::Outcome, BetSide::Draw, "X"),
        923 => (MarketKind::Outcome, BetSide::Away, "2"),
        927 => (MarketKind::Handicap, BetSide::Home, "H1"),
        928 => (MarketKind::Handicap, BetSide::Away, "H2"),
        930 => (MarketKind::Total, BetSide::Over, "Over"),
        931 => (MarketKind::Total, BetSide::Under, "Under"),
        _ => return None,
    };
    Some(MarketDescriptor {
        kind,
        side: Some(side),
        line: None,
        half: super::types::HalfPeriod::FullTime,
        label: Some(label.to_string()),
        source: DescriptorSource::Fallback,
    })
}

impl MarketClassifier {
    pub fn new(source: Arc<dyn SnapshotSource>, config: ClassifierConfig) -> Self {
        Self {
            source,
            config,
            cache: HashMap::new(),
            details: HashMap::new(),
        }
    }

    /// Classify a single factor (batch path with one element).
    pub async fn classify(&mut self, event_id: i64, factor_id: FactorId) -> MarketDescriptor {
        let snapshot_stub: [QuoteSnapshot; 0] = [];
        let (map, _) = self
            .classify_ids(event_id, &[factor_id], &snapshot_stub)
            .await;
        map.get(&factor_id)
            .cloned()
            .unwrap_or_else(MarketDescriptor::unresolved)
    }

    /// Classify every factor appearing in an event's snapshot rows.
    ///
    /// Also returns the mainline hints from the detail document when one was
    /// fetched for this event.
    pub async fn classify_batch(
        &mut self,
        event_id: i64,
        snapshots: &[QuoteSnapshot],
    ) -> (HashMap<FactorId, MarketDescriptor>, MainlineHints) {
        let mut seen = HashSet::new();
        let ids: Vec<FactorId> = snapshots
            .iter()
            .map(|s| s.factor_id)
            .filter(|f| seen.insert(*f))
            .collect();
        self.classify_ids(event_id, &ids, snapshots).await
    }

    async fn classify_ids(
        &mut self,
        event_id: i64,
        factor_ids: &[FactorId],
        snapshots: &[QuoteSnapshot],
    ) -> (HashMap<FactorId, MarketDescriptor>, MainlineHints) {
        let now = Utc::now();

        // re-ask the catalog for anything it has not resolved itself yet, so
        // weakly-sourced descriptors get upgraded in place
        let stale: Vec<FactorId> = factor_ids
            .iter()
            .copied()
            .filter(|fid| match self.cache.get(fid) {
                Some(entry) => {
                    entry.descriptor.source.rank() < DescriptorSource::Catalog.rank()
                        && now - entry.refreshed_at >= self.config.catalog_ttl
                }
                None => true,
            })
            .collect();

        if !stale.is_empty() {
            self.resolve_from_catalog(&stale, now).await;
        }

        let unresolved: Vec<FactorId> = factor_ids
            .iter()
            .copied()
            .filter(|fid| !self.cached_resolved(fid))
            .collect();

        let hints = if unresolved.is_empty() {
            self.details
                .get(&event_id)
                .map(|d| d.hints)
                .unwrap_or_default()
        } else {
            let hints = self.resolve_from_detail(event_id, now).await;
            for fid in &unresolved {
                if self.cached_resolved(fid) {
                    continue;
                }
                if let Some(desc) = fallback_descriptor(*fid) {
                    self.upsert(*fid, desc, now);
                }
            }
            self.resolve_from_rows(snapshots, now);
            hints
        };

        let map = factor_ids
            .iter()
            .map(|fid| {
                let descriptor = self
                    .cache
                    .get(fid)
                    .map(|e| e.descriptor.clone())
                    .unwrap_or_else(MarketDescriptor::unresolved);
                (*fid, descriptor)
            })
            .collect();
        (map, hints)
    }

    fn cached_resolved(&self, fid: &FactorId) -> bool {
        self.cache
            .get(fid)
            .is_some_and(|e| e.descriptor.is_resolved())
    }

    fn upsert(&mut self, fid: FactorId, candidate: MarketDescriptor, now: DateTime<Utc>) {
        match self.cache.get_mut(&fid) {
            Some(entry) => {
                entry.descriptor.upgrade(candidate);
                entry.refreshed_at = now;
            }
            None => {
                self.cache.insert(
                    fid,
                    CachedDescriptor {
                        descriptor: candidate,
                        refreshed_at: now,
                    },
                );
            }
        }
    }

    async fn resolve_from_catalog(&mut self, factor_ids: &[FactorId], now: DateTime<Utc>) {
        let records = match self.source.catalog_records(factor_ids).await {
            Ok(records) => records,
            Err(err) => {
                tracing::warn!(error = %err, "catalog lookup failed, keeping cached descriptors");
                return;
            }
        };

        for fid in factor_ids {
            match records.get(fid).and_then(normalize_record) {
                Some(desc) => self.upsert(*fid, desc, now),
                None => {
                    // remember the attempt so the TTL throttles re-fetching
                    self.cache
                        .entry(*fid)
                        .and_modify(|e| e.refreshed_at = now)
                        .or_insert(CachedDescriptor {
                            descriptor: MarketDescriptor::unresolved(),
                            refreshed_at: now,
                        });
                }
            }
        }
    }

    async fn resolve_from_detail(&mut self, event_id: i64, now: DateTime<Utc>) -> MainlineHints {
        let needs_fetch = match self.details.get(&event_id) {
            Some(cached) => now - cached.fetched_at >= self.config.detail_ttl,
            None => true,
        };

        if needs_fetch {
            match self.source.event_detail(event_id).await {
                Ok(doc) => {
                    let (descriptors, hints) = parse_detail(&doc);
                    self.details.insert(
                        event_id,
                        CachedDetail {
                            descriptors,
                            hints,
                            fetched_at: now,
                        },
                    );
                }
                Err(err) => {
                    // stale-while-revalidate: keep serving the old document
                    tracing::warn!(event_id, error = %err, "event detail fetch failed");
                }
            }
        }

        let Some(cached) = self.details.get(&event_id) else {
            return MainlineHints::default();
        };
        let hints = cached.hints;
        let detail_descs: Vec<(FactorId, MarketDescriptor)> = cached
            .descriptors
            .iter()
            .map(|(fid, d)| (*fid, d.clone()))
            .collect();
        for (fid, desc) in detail_descs {
            self.upsert(fid, desc, now);
        }
        hints
    }

    /// Last resort: upgrade still-unresolved factors from their own rows.
    fn resolve_from_rows(&mut self, snapshots: &[QuoteSnapshot], now: DateTime<Utc>) {
        for snap in snapshots.iter().rev() {
            if self.cached_resolved(&snap.factor_id) {
                continue;
            }
            let Some(label) = snap.label.as_deref() else {
                continue;
            };
            if let Some((kind, side)) = infer_from_row(label, snap.line) {
                let desc = MarketDescriptor {
                    kind,
                    side: Some(side),
                    line: snap.line,
                    half: classify_half(label),
                    label: Some(label.to_string()),
                    source: DescriptorSource::RowInference,
                };
                self.upsert(snap.factor_id, desc, now);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classify::types::HalfPeriod;
    use crate::ingest::{EventSummary, FetchError};
    use async_trait::async_trait;
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;
    use serde_json::{json, Value};
    use std::sync::atomic::{AtomicU32, Ordering};

    struct StubSource {
        catalog: HashMap<FactorId, Value>,
        detail: Option<Value>,
        catalog_calls: AtomicU32,
        detail_calls: AtomicU32,
    }

    impl StubSource {
        fn new(catalog: HashMap<FactorId, Value>, detail: Option<Value>) -> Self {
            Self {
                catalog,
                detail,
                catalog_calls: AtomicU32::new(0),
                detail_calls: AtomicU32::new(0),
            }
        }
    }

    #[async_trait]
    impl SnapshotSource for StubSource {
        async fn candidate_events(
            &self,
            _hours: u32,
            _min_pct_hint: Decimal,
        ) -> Result<Vec<EventSummary>, FetchError> {
            Ok(vec![])
        }

        async fn event_snapshots(
            &self,
            _event_id: i64,
            _hours: u32,
        ) -> Result<Vec<QuoteSnapshot>, FetchError> {
            Ok(vec![])
        }

        async fn catalog_records(
            &self,
            factor_ids: &[FactorId],
        ) -> Result<HashMap<FactorId, Value>, FetchError> {
            self.catalog_calls.fetch_add(1, Ordering::SeqCst);
            Ok(factor_ids
                .iter()
                .filter_map(|f| self.catalog.get(f).map(|v| (*f, v.clone())))
                .collect())
        }

        async fn event_detail(&self, _event_id: i64) -> Result<Value, FetchError> {
            self.detail_calls.fetch_add(1, Ordering::SeqCst);
            self.detail.clone().ok_or(FetchError::Shape("no detail".to_string()))
        }
    }

    fn snap(factor_id: FactorId, label: Option<&str>, line: Option<Decimal>) -> QuoteSnapshot {
        QuoteSnapshot {
            factor_id,
            price: dec!(1.90),
            line,
            label: label.map(|s| s.to_string()),
            observed_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_catalog_wins_first() {
        let mut catalog = HashMap::new();
        catalog.insert(930, json!({"name": "Total Over", "p": 2.5}));
        let source = Arc::new(StubSource::new(catalog, None));
        let mut classifier = MarketClassifier::new(source, ClassifierConfig::default());

        let desc = classifier.classify(1, 930).await;
        assert_eq!(desc.kind, MarketKind::Total);
        assert_eq!(desc.source, DescriptorSource::Catalog);
    }

    #[tokio::test]
    async fn test_detail_resolves_catalog_miss() {
        let detail = json!({
            "events": [{"id": 1, "quotes": [{"factorId": 777, "name": "Handicap 1", "p": -1.5}]}]
        });
        let source = Arc::new(StubSource::new(HashMap::new(), Some(detail)));
        let mut classifier = MarketClassifier::new(source, ClassifierConfig::default());

        let desc = classifier.classify(1, 777).await;
        assert_eq!(desc.kind, MarketKind::Handicap);
        assert_eq!(desc.source, DescriptorSource::EventDetail);
    }

    #[tokio::test]
    async fn test_fallback_table() {
        let source = Arc::new(StubSource::new(HashMap::new(), None));
        let mut classifier = MarketClassifier::new(source, ClassifierConfig::default());

        let desc = classifier.classify(1, 921).await;
        assert_eq!(desc.kind, MarketKind::Outcome);
        assert_eq!(desc.side, Some(BetSide::Home));
        assert_eq!(desc.source, DescriptorSource::Fallback);
    }

    #[tokio::test]
    async fn test_row_inference_last_resort() {
        let source = Arc::new(StubSource::new(HashMap::new(), None));
        let mut classifier = MarketClassifier::new(source, ClassifierConfig::default());

        let snapshots = vec![snap(555, Some("Total Under"), Some(dec!(2.5)))];
        let (map, _) = classifier.classify_batch(1, &snapshots).await;
        let desc = &map[&555];
        assert_eq!(desc.kind, MarketKind::Total);
        assert_eq!(desc.side, Some(BetSide::Under));
        assert_eq!(desc.source, DescriptorSource::RowInference);
    }

    #[tokio::test]
    async fn test_unresolvable_stays_other() {
        let source = Arc::new(StubSource::new(HashMap::new(), None));
        let mut classifier = MarketClassifier::new(source, ClassifierConfig::default());

        let snapshots = vec![snap(999, None, None)];
        let (map, _) = classifier.classify_batch(1, &snapshots).await;
        assert_eq!(map[&999].kind, MarketKind::Other);
    }

    #[tokio::test]
    async fn test_catalog_not_refetched_within_ttl() {
        let source = Arc::new(StubSource::new(HashMap::new(), None));
        let mut classifier = MarketClassifier::new(source.clone(), ClassifierConfig::default());

        let snapshots = vec![snap(999, None, None)];
        classifier.classify_batch(1, &snapshots).await;
        classifier.classify_batch(1, &snapshots).await;
        assert_eq!(source.catalog_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_detail_cached_per_event() {
        let detail = json!({"events": []});
        let source = Arc::new(StubSource::new(HashMap::new(), Some(detail)));
        let mut classifier = MarketClassifier::new(source.clone(), ClassifierConfig::default());

        let snapshots = vec![snap(998, None, None)];
        classifier.classify_batch(7, &snapshots).await;
        // second pass inside the TTL: factor is cached-unresolved, catalog
        // TTL suppresses refetch and the detail document is served from cache
        classifier.classify_batch(7, &snapshots).await;
        assert_eq!(source.detail_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_resolved_kind_never_downgraded() {
        let mut catalog = HashMap::new();
        catalog.insert(930, json!({"name": "Total Over"}));
        let source = Arc::new(StubSource::new(catalog, None));
        let mut config = ClassifierConfig::default();
        config.catalog_ttl = Duration::seconds(0);
        let mut classifier = MarketClassifier::new(source, config);

        let first = classifier.classify(1, 930).await;
        assert_eq!(first.kind, MarketKind::Total);

        // row with an unclassifiable label must not push it back to Other
        let snapshots = vec![snap(930, Some("???"), None)];
        let (map, _) = classifier.classify_batch(1, &snapshots).await;
        assert_eq!(map[&930].kind, MarketKind::Total);
    }

    #[tokio::test]
    async fn test_first_half_factor_tagged() {
        let mut catalog = HashMap::new();
        catalog.insert(1930, json!({"name": "Total Over 1st half", "p": 1.0}));
        let source = Arc::new(StubSource::new(catalog, None));
        let mut classifier = MarketClassifier::new(source, ClassifierConfig::default());

        let desc = classifier.classify(1, 1930).await;
        assert_eq!(desc.half, HalfPeriod::FirstHalf);
    }
}
