//! Alert state machine
//!
//! Per (event, market kind, side) the machine tracks the last alerted
//! snapshot and a wall-clock cooldown. Line-changing moves are never sent
//! directly: they are registered as pending and must be reconfirmed by a
//! later snapshot on the target line before an alert goes out. A move that
//! merely reverses a very recent one is dropped without registering.

use super::state::{AlertStateStore, PendingMove, StoreError};
use crate::classify::{BetSide, MarketKind};
use crate::series::MarketTables;
use crate::signal::{drop_pct, InterestFilter, Signal};
use chrono::{DateTime, Duration, Utc};

/// Anti-spam policy knobs
#[derive(Debug, Clone)]
pub struct AlertPolicy {
    /// Minimum wall-clock gap between alerts on the same key
    pub cooldown: Duration,
    /// How long a pending line move may wait for confirmation
    pub pending_ttl: Duration,
    /// Window in which a reverse line move is dropped after a confirmed one
    pub reverse_suppress: Duration,
    /// First run only records baselines instead of alerting
    pub warmup: bool,
}

impl Default for AlertPolicy {
    fn default() -> Self {
        Self {
            cooldown: Duration::seconds(300),
            pending_ttl: Duration::seconds(300),
            reverse_suppress: Duration::seconds(1800),
            warmup: true,
        }
    }
}

/// What the machine decided about a signal
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    /// Send the alert, then call [`AlertGate::mark_alerted`]
    Emit,
    /// Registered as a pending line move awaiting confirmation
    PendingRegistered,
    /// Suppressed
    Suppressed(SuppressReason),
}

/// Why a signal was suppressed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SuppressReason {
    /// This exact snapshot was already processed
    AlreadyProcessed,
    /// Cooldown since the last alert on this key has not elapsed
    Cooldown,
    /// The move reverses a recently confirmed line move
    ReverseMove,
}

fn move_key(event_id: i64, kind: MarketKind) -> String {
    format!("{event_id}:{kind}")
}

/// Gatekeeper between detected signals and delivered alerts. Sole owner of
/// the persisted [`AlertStateStore`].
pub struct AlertGate {
    policy: AlertPolicy,
    store: AlertStateStore,
}

impl AlertGate {
    pub fn new(policy: AlertPolicy, store: AlertStateStore) -> Self {
        Self { policy, store }
    }

    pub fn warmup_pending(&self) -> bool {
        self.policy.warmup && !self.store.warmup_done()
    }

    pub fn finish_warmup(&mut self) {
        self.store.set_warmup_done();
    }

    pub fn save(&self) -> Result<(), StoreError> {
        self.store.save()
    }

    /// Warm-up: remember the latest snapshot per series so the first run
    /// does not replay the whole history as fresh alerts.
    pub fn observe_baseline(&mut self, event_id: i64, tables: &MarketTables) {
        for kind in [MarketKind::Outcome, MarketKind::Handicap, MarketKind::Total] {
            let Some(by_side) = tables.by_kind(kind) else {
                continue;
            };
            for (side, series) in by_side {
                let Some(last) = series.last() else {
                    continue;
                };
                let key = format!("{event_id}:{kind}:{side}");
                self.store.signal_mut(&key).last_alerted_observed_at = Some(last.observed_at);
            }
        }
    }

    /// Decide a same-line drop signal.
    pub fn decide_same_line(&mut self, signal: &Signal, now: DateTime<Utc>) -> Decision {
        let key = signal.key();
        let state = self.store.signal_mut(&key);

        if state.last_alerted_observed_at == Some(signal.observed_at) {
            return Decision::Suppressed(SuppressReason::AlreadyProcessed);
        }

        if let Some(last_sent) = state.last_alerted_wallclock {
            if now - last_sent < self.policy.cooldown {
                // remember the snapshot so the next poll does not loop on it
                state.last_alerted_observed_at = Some(signal.observed_at);
                return Decision::Suppressed(SuppressReason::Cooldown);
            }
        }

        Decision::Emit
    }

    /// Record a delivered (or handed-off) alert as the new baseline.
    pub fn mark_alerted(&mut self, signal: &Signal, now: DateTime<Utc>) {
        let state = self.store.signal_mut(&signal.key());
        state.last_alerted_observed_at = Some(signal.observed_at);
        state.last_alerted_wallclock = Some(now);

        if signal.is_line_change() {
            let meta = self.store.moves_mut(&move_key(signal.event_id, signal.kind));
            meta.last_sent_wallclock = Some(now);
            meta.last_from = signal.old_line;
            meta.last_to = signal.new_line;
            meta.pending.remove(&signal.side.to_string());
        }
    }

    /// Register a line-changing signal as pending confirmation.
    pub fn register_pending(&mut self, signal: &Signal, now: DateTime<Utc>) -> Decision {
        debug_assert!(signal.is_line_change());
        let (Some(from_line), Some(to_line)) = (signal.old_line, signal.new_line) else {
            return Decision::Suppressed(SuppressReason::AlreadyProcessed);
        };

        let ttl = self.policy.pending_ttl;
        let reverse_window = self.policy.reverse_suppress;
        let meta = self.store.moves_mut(&move_key(signal.event_id, signal.kind));

        // a line that bounces straight back is not worth alerting again
        if let (Some(last_sent), Some(last_from), Some(last_to)) =
            (meta.last_sent_wallclock, meta.last_from, meta.last_to)
        {
            if from_line == last_to && to_line == last_from && now - last_sent < reverse_window {
                return Decision::Suppressed(SuppressReason::ReverseMove);
            }
        }

        let side_key = signal.side.to_string();
        if let Some(existing) = meta.pending.get(&side_key) {
            if existing.from_line == from_line && existing.to_line == to_line {
                // same move already pending; reprocessing is a no-op
                return Decision::Suppressed(SuppressReason::AlreadyProcessed);
            }
        }

        meta.pending.insert(
            side_key,
            PendingMove {
                from_line,
                to_line,
                reference_price: signal.old_price,
                first_seen_observed_at: signal.observed_at,
                first_seen_wallclock: now,
                expires_at: now + ttl,
            },
        );
        Decision::PendingRegistered
    }

    /// Try to confirm pending moves for one (event, kind) against the
    /// freshly built tables. Returns the confirmed signals to deliver;
    /// expired records are dropped silently.
    pub fn confirm_pending(
        &mut self,
        event_id: i64,
        kind: MarketKind,
        tables: &MarketTables,
        filter: &InterestFilter,
        now: DateTime<Utc>,
    ) -> Vec<Signal> {
        let cooldown = self.policy.cooldown;
        let key = move_key(event_id, kind);
        let Some(meta) = self.store.moves(&key) else {
            return Vec::new();
        };

        let mut confirmed = Vec::new();
        let mut drop_sides: Vec<String> = Vec::new();
        let mut cooldown_touch: Vec<(String, DateTime<Utc>)> = Vec::new();

        for (side_key, pend) in &meta.pending {
            if now > pend.expires_at {
                drop_sides.push(side_key.clone());
                continue;
            }

            let Some(side) = parse_side(side_key) else {
                drop_sides.push(side_key.clone());
                continue;
            };
            let Some(latest) = tables.series(kind, side).and_then(|s| s.last()).copied() else {
                continue;
            };

            // confirmation needs a newer snapshot on the target line
            if latest.line != Some(pend.to_line) {
                continue;
            }
            if latest.observed_at <= pend.first_seen_observed_at {
                continue;
            }

            // the move only holds if the price is still below the reference
            if latest.price >= pend.reference_price {
                drop_sides.push(side_key.clone());
                continue;
            }

            let dp = drop_pct(pend.reference_price, latest.price);
            if !filter.is_interesting(pend.reference_price, latest.price, dp) {
                // not interesting yet; keep waiting until the TTL
                continue;
            }

            let signal_key = format!("{event_id}:{kind}:{side}");
            if let Some(state) = self.store.signal(&signal_key) {
                if state.last_alerted_observed_at == Some(latest.observed_at) {
                    drop_sides.push(side_key.clone());
                    continue;
                }
                if let Some(last_sent) = state.last_alerted_wallclock {
                    if now - last_sent < cooldown {
                        cooldown_touch.push((signal_key, latest.observed_at));
                        continue;
                    }
                }
            }

            confirmed.push(Signal::new(
                event_id,
                kind,
                side,
                pend.reference_price,
                latest.price,
                Some(pend.from_line),
                Some(pend.to_line),
                latest.observed_at,
            ));
        }

        let meta = self.store.moves_mut(&key);
        for side_key in drop_sides {
            meta.pending.remove(&side_key);
        }
        for (signal_key, observed_at) in cooldown_touch {
            self.store.signal_mut(&signal_key).last_alerted_observed_at = Some(observed_at);
        }

        confirmed
    }

    /// Whether any pending record exists for this (event, kind).
    pub fn has_pending(&self, event_id: i64, kind: MarketKind) -> bool {
        self.store
            .moves(&move_key(event_id, kind))
            .is_some_and(|m| !m.pending.is_empty())
    }
}

fn parse_side(s: &str) -> Option<BetSide> {
    match s {
        "home" => Some(BetSide::Home),
        "draw" => Some(BetSide::Draw),
        "away" => Some(BetSide::Away),
        "over" => Some(BetSide::Over),
        "under" => Some(BetSide::Under),
        _ => None,
    }
}
