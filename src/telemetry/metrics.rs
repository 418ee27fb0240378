//! Prometheus metrics

use metrics::{counter, gauge};

/// Count one delivered alert.
pub fn count_alert() {
    counter!("oddswatch_alerts_total").increment(1);
}

/// Count one failed fetch from the storage collaborator.
pub fn count_fetch_failure() {
    counter!("oddswatch_fetch_failures_total").increment(1);
}

/// Record per-cycle aggregates.
pub fn record_cycle(events_seen: usize, events_processed: usize, alerts_sent: u32) {
    counter!("oddswatch_cycles_total").increment(1);
    gauge!("oddswatch_cycle_events_seen").set(events_seen as f64);
    gauge!("oddswatch_cycle_events_processed").set(events_processed as f64);
    gauge!("oddswatch_cycle_alerts_sent").set(alerts_sent as f64);
}
