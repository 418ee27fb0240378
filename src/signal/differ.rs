//! Snapshot differ
//!
//! Computes the latest-vs-previous delta of a bet line series. A price move
//! on a stable line is a plain comparison; a move that coincides with the
//! mainline itself changing is never reported as a percentage drop across
//! two different bets. Instead the differ reaches for a like-for-like
//! comparison on the line that is now current, or for a real drop that
//! happened on the old line right before the shift.

use super::types::Signal;
use crate::classify::{BetSide, MarketKind};
use crate::series::{BetSeries, SeriesPoint};
use rust_decimal::Decimal;

/// Produces at most one candidate signal per series per invocation.
#[derive(Debug, Clone)]
pub struct SnapshotDiffer {
    /// Emit a direct cross-line delta when no same-line drop explains the
    /// shift; such signals carry differing lines and go through the pending
    /// confirmation path instead of being alerted immediately.
    allow_crossline: bool,
}

impl SnapshotDiffer {
    pub fn new(allow_crossline: bool) -> Self {
        Self { allow_crossline }
    }

    /// Diff the two most recent entries of one (event, kind, side) series.
    pub fn diff(
        &self,
        event_id: i64,
        kind: MarketKind,
        side: BetSide,
        series: &BetSeries,
    ) -> Option<Signal> {
        let points = series.points();
        if points.len() < 2 {
            return None;
        }
        let now = &points[points.len() - 1];
        let prev = &points[points.len() - 2];

        let same_bet = match (prev.line, now.line) {
            (Some(a), Some(b)) => a == b,
            // outcome markets have no line concept
            _ => true,
        };

        if same_bet {
            return drop_between(event_id, kind, side, prev, now);
        }

        let new_line = now.line.expect("line change implies lines present");
        let old_line = prev.line.expect("line change implies lines present");

        // like-for-like: the most recent earlier entry already on the line
        // that is now current
        if let Some(base) = points[..points.len() - 1]
            .iter()
            .rev()
            .find(|p| p.line == Some(new_line))
        {
            return drop_between(event_id, kind, side, base, now);
        }

        // no history on the new line: report the drop that happened on the
        // old line immediately before the shift, if there was one
        if let Some(base) = points[..points.len() - 2]
            .iter()
            .rev()
            .find(|p| p.line == Some(old_line))
        {
            if let Some(sig) = drop_between(event_id, kind, side, base, prev) {
                return Some(sig);
            }
        }

        // the pure line relocation, left to the pending-confirmation path
        if self.allow_crossline && valid_price(prev.price) && valid_price(now.price) {
            if now.price < prev.price {
                return Some(Signal::new(
                    event_id,
                    kind,
                    side,
                    prev.price,
                    now.price,
                    prev.line,
                    now.line,
                    now.observed_at,
                ));
            }
        }

        None
    }
}

fn valid_price(price: Decimal) -> bool {
    price > Decimal::ZERO
}

/// Same-bet comparison: a signal only for a genuine drop with sane prices.
fn drop_between(
    event_id: i64,
    kind: MarketKind,
    side: BetSide,
    old: &SeriesPoint,
    new: &SeriesPoint,
) -> Option<Signal> {
    if !valid_price(old.price) || !valid_price(new.price) {
        return None;
    }
    if new.price >= old.price {
        return None;
    }
    Some(Signal::new(
        event_id,
        kind,
        side,
        old.price,
        new.price,
        old.line,
        new.line,
        new.observed_at,
    ))
}
