//! Bet line series types

use crate::classify::{BetSide, HalfPeriod, MarketKind};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use std::collections::BTreeMap;

/// One entry of a bet line series: the price quoted for a side at one
/// snapshot timestamp, with the line it was quoted at (if the market has
/// a line concept).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SeriesPoint {
    pub observed_at: DateTime<Utc>,
    pub price: Decimal,
    pub line: Option<Decimal>,
}

/// Ordered price history for one (event, market kind, side).
///
/// Invariant: `observed_at` strictly increases; a push with an already-seen
/// timestamp overwrites the existing entry (last write wins within one
/// snapshot group), and out-of-order pushes are dropped.
#[derive(Debug, Clone, Default)]
pub struct BetSeries {
    points: Vec<SeriesPoint>,
}

impl BetSeries {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, point: SeriesPoint) {
        match self.points.last() {
            None => self.points.push(point),
            Some(last) if point.observed_at > last.observed_at => self.points.push(point),
            Some(last) if point.observed_at == last.observed_at => {
                *self.points.last_mut().expect("non-empty") = point;
            }
            Some(_) => {}
        }
    }

    pub fn points(&self) -> &[SeriesPoint] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn last(&self) -> Option<&SeriesPoint> {
        self.points.last()
    }
}

/// Per-market snapshot tables for one event and one half-period.
#[derive(Debug, Clone, Default)]
pub struct MarketTables {
    pub half: HalfPeriod,
    pub outcome: BTreeMap<BetSide, BetSeries>,
    pub handicap: BTreeMap<BetSide, BetSeries>,
    pub total: BTreeMap<BetSide, BetSeries>,
}

impl MarketTables {
    pub fn for_half(half: HalfPeriod) -> Self {
        Self {
            half,
            ..Default::default()
        }
    }

    pub fn by_kind(&self, kind: MarketKind) -> Option<&BTreeMap<BetSide, BetSeries>> {
        match kind {
            MarketKind::Outcome => Some(&self.outcome),
            MarketKind::Handicap => Some(&self.handicap),
            MarketKind::Total => Some(&self.total),
            MarketKind::Other => None,
        }
    }

    pub fn by_kind_mut(&mut self, kind: MarketKind) -> Option<&mut BTreeMap<BetSide, BetSeries>> {
        match kind {
            MarketKind::Outcome => Some(&mut self.outcome),
            MarketKind::Handicap => Some(&mut self.handicap),
            MarketKind::Total => Some(&mut self.total),
            MarketKind::Other => None,
        }
    }

    pub fn series(&self, kind: MarketKind, side: BetSide) -> Option<&BetSeries> {
        self.by_kind(kind).and_then(|m| m.get(&side))
    }

    pub fn is_empty(&self) -> bool {
        self.outcome.is_empty() && self.handicap.is_empty() && self.total.is_empty()
    }

    /// Latest snapshot timestamp across every series, if any.
    pub fn latest_observed_at(&self, kind: MarketKind, side: BetSide) -> Option<DateTime<Utc>> {
        self.series(kind, side).and_then(|s| s.last()).map(|p| p.observed_at)
    }
}
