//! Poll-cycle orchestration
//!
//! One cycle: candidate events -> snapshot tables -> classification ->
//! per-market series -> differ -> interest filter -> alert state machine ->
//! rendering and delivery. State is persisted after every state-affecting
//! decision; a persistence failure aborts the cycle, because alerting on
//! unknown state duplicates messages.

use crate::alert::{AlertGate, AlertSink, AlertStateStore, Decision, Renderer};
use crate::classify::{HalfPeriod, MarketClassifier, MarketKind};
use crate::config::Config;
use crate::ingest::{EventSummary, SnapshotSource};
use crate::series::{build_tables, MarketTables};
use crate::signal::{InterestFilter, Signal, SnapshotDiffer};
use crate::telemetry;
use chrono::Utc;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::sync::Arc;
use std::time::Instant;

/// Outcome of one poll cycle
#[derive(Debug, Default, Clone, Copy)]
pub struct CycleStats {
    pub events_seen: usize,
    pub events_processed: usize,
    pub alerts_sent: u32,
    pub fetch_failures: u32,
}

/// The monitor wires every pipeline component together and owns the cycle
/// loop state. A single monitor instance is the sole writer of the alert
/// state store.
pub struct Monitor {
    config: Config,
    source: Arc<dyn SnapshotSource>,
    classifier: MarketClassifier,
    differ: SnapshotDiffer,
    filter: InterestFilter,
    gate: AlertGate,
    renderer: Renderer,
    sink: Arc<dyn AlertSink>,
}

impl Monitor {
    pub fn new(
        config: Config,
        source: Arc<dyn SnapshotSource>,
        sink: Arc<dyn AlertSink>,
    ) -> anyhow::Result<Self> {
        let store = AlertStateStore::load(&config.alerts.state_path)?;
        Ok(Self::with_store(config, source, sink, store))
    }

    /// Wire up against an explicit store (used by tests with an in-memory one).
    pub fn with_store(
        config: Config,
        source: Arc<dyn SnapshotSource>,
        sink: Arc<dyn AlertSink>,
        store: AlertStateStore,
    ) -> Self {
        let classifier =
            MarketClassifier::new(source.clone(), config.classify.to_classifier_config());
        let differ = SnapshotDiffer::new(config.alerts.allow_crossline);
        let filter = InterestFilter::new(config.interest.clone());
        let gate = AlertGate::new(config.alerts.to_policy(), store);
        let renderer = Renderer::new(crate::alert::RenderConfig {
            title: config.delivery.title.clone(),
            public_base_url: config.delivery.public_base_url.clone(),
        });
        Self {
            config,
            source,
            classifier,
            differ,
            filter,
            gate,
            renderer,
            sink,
        }
    }

    fn keep_event(&self, event: &EventSummary) -> bool {
        if let (Some(want), Some(got)) = (self.config.events.sport_id, event.sport_id) {
            if want != got {
                return false;
            }
        }
        if self.config.events.skip_virtual && event.is_virtual_fixture() {
            return false;
        }
        if let Some(start) = event.start_time {
            let now = Utc::now();
            let horizon = now + chrono::Duration::hours(self.config.events.hours as i64);
            if start < now || start > horizon {
                return false;
            }
        }
        true
    }

    /// Run one poll cycle. Fetch failures skip the affected event; a state
    /// store failure aborts the whole cycle.
    pub async fn run_cycle(&mut self) -> anyhow::Result<CycleStats> {
        let started = Instant::now();
        let mut stats = CycleStats::default();

        // forwarded so the storage side can prune quiet events cheaply
        let min_pct_hint = self.config.interest.min_drop_pct.min(MIN_PCT_HINT_CEILING);

        let events = match self
            .source
            .candidate_events(self.config.events.hours, min_pct_hint)
            .await
        {
            Ok(events) => events,
            Err(err) => {
                tracing::warn!(error = %err, "candidate events query failed, skipping cycle");
                telemetry::count_fetch_failure();
                stats.fetch_failures += 1;
                return Ok(stats);
            }
        };
        stats.events_seen = events.len();

        let filtered: Vec<EventSummary> =
            events.into_iter().filter(|e| self.keep_event(e)).collect();
        let warmup = self.gate.warmup_pending();
        let budget = std::time::Duration::from_secs(self.config.schedule.cycle_budget_secs);

        for event in &filtered {
            if !warmup && stats.alerts_sent >= self.config.alerts.max_per_cycle {
                tracing::info!(cap = self.config.alerts.max_per_cycle, "per-cycle alert cap hit");
                break;
            }
            if started.elapsed() > budget {
                tracing::warn!(
                    elapsed_secs = started.elapsed().as_secs(),
                    "cycle time budget exceeded, deferring remaining events"
                );
                break;
            }

            match self.process_event(event, warmup, &mut stats).await {
                Ok(()) => stats.events_processed += 1,
                Err(ProcessError::Fetch) => {
                    stats.fetch_failures += 1;
                    telemetry::count_fetch_failure();
                }
                Err(ProcessError::Store(err)) => {
                    // must not keep alerting on unknown state
                    return Err(anyhow::anyhow!(err).context("state store failure, cycle aborted"));
                }
            }
        }

        if warmup {
            self.gate.finish_warmup();
            self.gate.save().map_err(anyhow::Error::from)?;
            tracing::info!(events = stats.events_processed, "warmup done, baselines stored");
        }

        telemetry::record_cycle(stats.events_seen, stats.events_processed, stats.alerts_sent);
        tracing::info!(
            seen = stats.events_seen,
            processed = stats.events_processed,
            alerts = stats.alerts_sent,
            fetch_failures = stats.fetch_failures,
            elapsed_ms = started.elapsed().as_millis(),
            "cycle complete"
        );
        Ok(stats)
    }

    async fn process_event(
        &mut self,
        event: &EventSummary,
        warmup: bool,
        stats: &mut CycleStats,
    ) -> Result<(), ProcessError> {
        let event_id = event.event_id;

        let snapshots = self
            .source
            .event_snapshots(event_id, self.config.events.hours)
            .await
            .map_err(|err| {
                tracing::warn!(event_id, error = %err, "snapshot fetch failed, event skipped");
                ProcessError::Fetch
            })?;
        if snapshots.is_empty() {
            return Ok(());
        }

        let (descriptors, hints) = self.classifier.classify_batch(event_id, &snapshots).await;
        let tables = build_tables(&snapshots, &descriptors, hints, HalfPeriod::FullTime);
        if tables.is_empty() {
            return Ok(());
        }

        if warmup {
            self.gate.observe_baseline(event_id, &tables);
            self.gate.save().map_err(ProcessError::Store)?;
            return Ok(());
        }

        let now = Utc::now();

        for kind in [MarketKind::Outcome, MarketKind::Handicap, MarketKind::Total] {
            if stats.alerts_sent >= self.config.alerts.max_per_cycle {
                break;
            }

            let mut best_drop: Option<Signal> = None;
            let mut moves: Vec<Signal> = Vec::new();

            let Some(by_side) = tables.by_kind(kind) else {
                continue;
            };
            for (side, series) in by_side {
                let Some(signal) = self.differ.diff(event_id, kind, *side, series) else {
                    continue;
                };
                if !self
                    .filter
                    .is_interesting(signal.old_price, signal.new_price, signal.drop_pct)
                {
                    continue;
                }
                if signal.is_line_change() {
                    moves.push(signal);
                } else {
                    // one message per market: keep the sharper drop
                    match &best_drop {
                        Some(best) if best.drop_pct >= signal.drop_pct => {}
                        _ => best_drop = Some(signal),
                    }
                }
            }

            if let Some(signal) = best_drop {
                match self.gate.decide_same_line(&signal, now) {
                    Decision::Emit => {
                        self.deliver(event, &signal, &tables).await;
                        self.gate.mark_alerted(&signal, now);
                        self.gate.save().map_err(ProcessError::Store)?;
                        stats.alerts_sent += 1;
                    }
                    Decision::Suppressed(reason) => {
                        tracing::debug!(key = %signal.key(), ?reason, "drop signal suppressed");
                        // cooldown updates the remembered snapshot
                        self.gate.save().map_err(ProcessError::Store)?;
                    }
                    Decision::PendingRegistered => unreachable!("same-line path never pends"),
                }
            }

            for signal in moves {
                let decision = self.gate.register_pending(&signal, now);
                tracing::debug!(key = %signal.key(), ?decision, "line move observed");
                self.gate.save().map_err(ProcessError::Store)?;
            }

            // reconfirm earlier line moves against the fresh tables
            if kind.has_line() && self.gate.has_pending(event_id, kind) {
                let confirmed =
                    self.gate
                        .confirm_pending(event_id, kind, &tables, &self.filter, now);
                self.gate.save().map_err(ProcessError::Store)?;
                for signal in confirmed {
                    if stats.alerts_sent >= self.config.alerts.max_per_cycle {
                        break;
                    }
                    self.deliver(event, &signal, &tables).await;
                    self.gate.mark_alerted(&signal, now);
                    self.gate.save().map_err(ProcessError::Store)?;
                    stats.alerts_sent += 1;
                }
            }
        }

        Ok(())
    }

    /// Hand a confirmed alert to the channel. Delivery is fire-and-forget:
    /// a failure is logged and the signal still counts as alerted, so a
    /// flaky channel cannot flood the operator on every poll.
    async fn deliver(&self, event: &EventSummary, signal: &Signal, tables: &MarketTables) {
        let message = self.renderer.build_message(event, signal, tables);
        match self.sink.deliver(&message).await {
            Ok(()) => {
                telemetry::count_alert();
                tracing::info!(
                    key = %signal.key(),
                    drop_pct = %signal.drop_pct,
                    "alert delivered"
                );
            }
            Err(err) => {
                tracing::error!(key = %signal.key(), error = %err, "alert delivery failed");
            }
        }
    }
}

enum ProcessError {
    Fetch,
    Store(crate::alert::StoreError),
}

/// Ceiling on the drop-percentage hint forwarded to the events query; the
/// real filtering always happens locally.
pub const MIN_PCT_HINT_CEILING: Decimal = dec!(3.0);
