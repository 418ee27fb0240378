//! Table builder: raw snapshot rows into per-market bet line series
//!
//! The store keeps only the factors that changed at each timestamp, so the
//! builder forward-fills: it carries the running price state per side (and
//! per line for handicap/total) and emits one table row per snapshot group.
//! For line markets the mainline is re-selected per group, so the emitted
//! series records mainline shifts (2.5 -> 3.0) that the differ later
//! classifies.

use super::mainline::{select_mainline, LineQuote};
use super::types::{MarketTables, SeriesPoint};
use crate::classify::{
    BetSide, FactorId, HalfPeriod, MainlineHints, MarketDescriptor, MarketKind,
};
use crate::ingest::QuoteSnapshot;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::collections::{BTreeMap, HashMap};

/// Feeds store some lines scaled by 100 (250 means 2.5). Anything with an
/// absolute value of 20 or more is descaled; real football lines never get
/// that high.
pub fn normalize_line(line: Decimal) -> Decimal {
    if line.abs() >= dec!(20) {
        line / dec!(100)
    } else {
        line
    }
}

#[derive(Default)]
struct LineState {
    prices: BTreeMap<BetSide, Decimal>,
    /// Last timestamp any side of this line was actually quoted. Forward-fill
    /// keeps stale lines around; mainline selection must not let them win
    /// over the line the feed is currently quoting.
    last_quoted: Option<DateTime<Utc>>,
}

#[derive(Default)]
struct RunningState {
    outcome: BTreeMap<BetSide, Decimal>,
    handicap: BTreeMap<Decimal, LineState>,
    total: BTreeMap<Decimal, LineState>,
}

impl RunningState {
    fn lines_mut(&mut self, kind: MarketKind) -> &mut BTreeMap<Decimal, LineState> {
        match kind {
            MarketKind::Handicap => &mut self.handicap,
            MarketKind::Total => &mut self.total,
            _ => unreachable!("outcome markets have no line partitions"),
        }
    }

    fn lines(&self, kind: MarketKind) -> &BTreeMap<Decimal, LineState> {
        match kind {
            MarketKind::Handicap => &self.handicap,
            MarketKind::Total => &self.total,
            _ => unreachable!("outcome markets have no line partitions"),
        }
    }
}

fn side_pair(kind: MarketKind) -> (BetSide, BetSide) {
    match kind {
        MarketKind::Handicap => (BetSide::Home, BetSide::Away),
        MarketKind::Total => (BetSide::Over, BetSide::Under),
        _ => unreachable!("only line markets have side pairs"),
    }
}

/// Build per-market tables for one event and one half-period.
///
/// Rows whose descriptor belongs to the other half are dropped, never
/// merged: mixing half-periods corrupts the series.
pub fn build_tables(
    snapshots: &[QuoteSnapshot],
    descriptors: &HashMap<FactorId, MarketDescriptor>,
    hints: MainlineHints,
    half: HalfPeriod,
) -> MarketTables {
    let mut tables = MarketTables::for_half(half);
    let mut state = RunningState::default();

    let mut sorted: Vec<&QuoteSnapshot> = snapshots.iter().collect();
    sorted.sort_by_key(|s| s.observed_at);

    let mut group_ts: Option<DateTime<Utc>> = None;
    for snap in sorted {
        if let Some(ts) = group_ts {
            if snap.observed_at != ts {
                emit_group(&mut tables, &state, hints, ts);
                group_ts = Some(snap.observed_at);
            }
        } else {
            group_ts = Some(snap.observed_at);
        }

        let Some(desc) = descriptors.get(&snap.factor_id) else {
            continue;
        };
        if desc.half != half || !desc.is_resolved() {
            continue;
        }
        let side = desc.side.expect("resolved descriptor has a side");

        match desc.kind {
            MarketKind::Outcome => {
                state.outcome.insert(side, snap.price);
            }
            kind @ (MarketKind::Handicap | MarketKind::Total) => {
                let Some(line) = snap.line.or(desc.line).map(normalize_line) else {
                    continue;
                };
                let entry = state.lines_mut(kind).entry(line).or_default();
                entry.prices.insert(side, snap.price);
                entry.last_quoted = Some(snap.observed_at);
            }
            MarketKind::Other => {}
        }
    }

    if let Some(ts) = group_ts {
        emit_group(&mut tables, &state, hints, ts);
    }

    tables
}

fn emit_group(
    tables: &mut MarketTables,
    state: &RunningState,
    hints: MainlineHints,
    observed_at: DateTime<Utc>,
) {
    for (&side, &price) in &state.outcome {
        tables.outcome.entry(side).or_default().push(SeriesPoint {
            observed_at,
            price,
            line: None,
        });
    }

    for kind in [MarketKind::Handicap, MarketKind::Total] {
        let (side_a, side_b) = side_pair(kind);
        let complete: Vec<(LineQuote, Option<DateTime<Utc>>)> = state
            .lines(kind)
            .iter()
            .filter_map(|(&line, ls)| {
                let a = *ls.prices.get(&side_a)?;
                let b = *ls.prices.get(&side_b)?;
                (a > Decimal::ZERO && b > Decimal::ZERO).then_some((
                    LineQuote {
                        line,
                        side_a: a,
                        side_b: b,
                    },
                    ls.last_quoted,
                ))
            })
            .collect();

        // stale forward-filled lines must not outcompete the line the feed
        // is currently quoting: only the freshest candidates reach the
        // balance-based selection
        let freshest = complete.iter().filter_map(|(_, t)| *t).max();
        let candidates: Vec<LineQuote> = complete
            .iter()
            .filter(|(_, t)| *t == freshest)
            .map(|(q, _)| *q)
            .collect();

        let explicit = match kind {
            MarketKind::Handicap => hints.handicap.map(normalize_line),
            _ => hints.total.map(normalize_line),
        };
        let all_quotes: Vec<LineQuote> = complete.iter().map(|(q, _)| *q).collect();
        let mainline = match explicit {
            // an explicit default line wins even when it was not the last
            // one requoted
            Some(line) if all_quotes.iter().any(|q| q.line == line) => Some(line),
            _ => select_mainline(None, &candidates, kind.canonical_line()),
        };
        let Some(mainline) = mainline else {
            continue;
        };

        let sides = &state.lines(kind)[&mainline].prices;
        let table = tables.by_kind_mut(kind).expect("line market kind");
        for (&side, &price) in sides {
            table.entry(side).or_default().push(SeriesPoint {
                observed_at,
                price,
                line: Some(mainline),
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classify::DescriptorSource;
    use chrono::Duration;

    fn ts(minutes: i64) -> DateTime<Utc> {
        DateTime::parse_from_rfc3339("2025-03-01T12:00:00Z")
            .unwrap()
            .with_timezone(&Utc)
            + Duration::minutes(minutes)
    }

    fn snap(fid: FactorId, price: Decimal, line: Option<Decimal>, minutes: i64) -> QuoteSnapshot {
        QuoteSnapshot {
            factor_id: fid,
            price,
            line,
            label: None,
            observed_at: ts(minutes),
        }
    }

    fn desc(kind: MarketKind, side: BetSide, half: HalfPeriod) -> MarketDescriptor {
        MarketDescriptor {
            kind,
            side: Some(side),
            line: None,
            half,
            label: None,
            source: DescriptorSource::Catalog,
        }
    }

    fn total_descriptors() -> HashMap<FactorId, MarketDescriptor> {
        let mut map = HashMap::new();
        map.insert(930, desc(MarketKind::Total, BetSide::Over, HalfPeriod::FullTime));
        map.insert(931, desc(MarketKind::Total, BetSide::Under, HalfPeriod::FullTime));
        map
    }

    #[test]
    fn test_outcome_series_built() {
        let mut descriptors = HashMap::new();
        descriptors.insert(921, desc(MarketKind::Outcome, BetSide::Home, HalfPeriod::FullTime));

        let snapshots = vec![
            snap(921, dec!(2.10), None, 0),
            snap(921, dec!(1.60), None, 15),
        ];
        let tables = build_tables(&snapshots, &descriptors, MainlineHints::default(), HalfPeriod::FullTime);
        let series = tables.series(MarketKind::Outcome, BetSide::Home).unwrap();
        assert_eq!(series.len(), 2);
        assert_eq!(series.points()[0].price, dec!(2.10));
        assert_eq!(series.points()[1].price, dec!(1.60));
    }

    #[test]
    fn test_total_mainline_series() {
        let snapshots = vec![
            snap(930, dec!(1.80), Some(dec!(2.5)), 0),
            snap(931, dec!(2.00), Some(dec!(2.5)), 0),
            snap(930, dec!(2.30), Some(dec!(2.5)), 22),
            snap(931, dec!(1.60), Some(dec!(2.5)), 22),
        ];
        let tables = build_tables(&snapshots, &total_descriptors(), MainlineHints::default(), HalfPeriod::FullTime);
        let over = tables.series(MarketKind::Total, BetSide::Over).unwrap();
        assert_eq!(over.len(), 2);
        assert_eq!(over.points()[1].price, dec!(2.30));
        assert_eq!(over.points()[1].line, Some(dec!(2.5)));
    }

    #[test]
    fn test_mainline_shift_recorded() {
        // the book moves the displayed line from 2.5 to 3.0 at t=25
        let snapshots = vec![
            snap(930, dec!(1.80), Some(dec!(2.5)), 0),
            snap(931, dec!(2.00), Some(dec!(2.5)), 0),
            snap(930, dec!(1.95), Some(dec!(3.0)), 25),
            snap(931, dec!(1.85), Some(dec!(3.0)), 25),
        ];
        let tables = build_tables(&snapshots, &total_descriptors(), MainlineHints::default(), HalfPeriod::FullTime);
        let over = tables.series(MarketKind::Total, BetSide::Over).unwrap();
        // at t=25 the stale forward-filled 2.5 still has two sides, but 3.0
        // is the line actually quoted at t=25 and wins
        assert_eq!(over.points()[1].line, Some(dec!(3.0)));
        assert_eq!(over.points()[1].price, dec!(1.95));
    }

    #[test]
    fn test_half_periods_never_mixed() {
        let mut descriptors = total_descriptors();
        descriptors.insert(1930, desc(MarketKind::Total, BetSide::Over, HalfPeriod::FirstHalf));

        let snapshots = vec![
            snap(930, dec!(1.80), Some(dec!(2.5)), 0),
            snap(931, dec!(2.00), Some(dec!(2.5)), 0),
            snap(1930, dec!(1.30), Some(dec!(1.0)), 0),
        ];
        let ft = build_tables(&snapshots, &descriptors, MainlineHints::default(), HalfPeriod::FullTime);
        let over = ft.series(MarketKind::Total, BetSide::Over).unwrap();
        assert_eq!(over.len(), 1);
        assert_eq!(over.points()[0].line, Some(dec!(2.5)));

        let h1 = build_tables(&snapshots, &descriptors, MainlineHints::default(), HalfPeriod::FirstHalf);
        // first-half table sees only the 1.0 line, and only one side is
        // quoted there, so no mainline row is emitted
        assert!(h1.series(MarketKind::Total, BetSide::Over).is_none());
    }

    #[test]
    fn test_line_scaling_normalized() {
        assert_eq!(normalize_line(dec!(250)), dec!(2.5));
        assert_eq!(normalize_line(dec!(-150)), dec!(-1.5));
        assert_eq!(normalize_line(dec!(2.5)), dec!(2.5));

        let snapshots = vec![
            snap(930, dec!(1.80), Some(dec!(250)), 0),
            snap(931, dec!(2.00), Some(dec!(2.5)), 0),
        ];
        let tables = build_tables(&snapshots, &total_descriptors(), MainlineHints::default(), HalfPeriod::FullTime);
        let over = tables.series(MarketKind::Total, BetSide::Over).unwrap();
        assert_eq!(over.points()[0].line, Some(dec!(2.5)));
    }

    #[test]
    fn test_unresolved_factors_excluded() {
        let mut descriptors = HashMap::new();
        descriptors.insert(999, MarketDescriptor::unresolved());

        let snapshots = vec![snap(999, dec!(1.50), None, 0)];
        let tables = build_tables(&snapshots, &descriptors, MainlineHints::default(), HalfPeriod::FullTime);
        assert!(tables.is_empty());
    }

    #[test]
    fn test_forward_fill_emits_unchanged_sides() {
        let mut descriptors = HashMap::new();
        descriptors.insert(921, desc(MarketKind::Outcome, BetSide::Home, HalfPeriod::FullTime));
        descriptors.insert(923, desc(MarketKind::Outcome, BetSide::Away, HalfPeriod::FullTime));

        let snapshots = vec![
            snap(921, dec!(2.10), None, 0),
            snap(923, dec!(3.40), None, 0),
            // only home changes at t=10; away row is forward-filled
            snap(921, dec!(1.90), None, 10),
        ];
        let tables = build_tables(&snapshots, &descriptors, MainlineHints::default(), HalfPeriod::FullTime);
        let away = tables.series(MarketKind::Outcome, BetSide::Away).unwrap();
        assert_eq!(away.len(), 2);
        assert_eq!(away.points()[1].price, dec!(3.40));
    }

    #[test]
    fn test_explicit_hint_overrides_balance() {
        let hints = MainlineHints {
            total: Some(dec!(2.5)),
            handicap: None,
        };
        let snapshots = vec![
            snap(930, dec!(1.50), Some(dec!(2.5)), 0),
            snap(931, dec!(2.50), Some(dec!(2.5)), 0),
            snap(930, dec!(1.95), Some(dec!(3.0)), 0),
            snap(931, dec!(1.95), Some(dec!(3.0)), 0),
        ];
        let tables = build_tables(&snapshots, &total_descriptors(), hints, HalfPeriod::FullTime);
        let over = tables.series(MarketKind::Total, BetSide::Over).unwrap();
        assert_eq!(over.points()[0].line, Some(dec!(2.5)));
    }
}
