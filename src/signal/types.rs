//! Signal types

use crate::classify::{BetSide, MarketKind};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Percentage drop from `old` to `new`, positive only for falling prices.
pub fn drop_pct(old: Decimal, new: Decimal) -> Decimal {
    if old <= Decimal::ZERO {
        return Decimal::ZERO;
    }
    (old - new) / old * dec!(100)
}

/// Implied probability gain `1/new - 1/old`, positive for a price drop.
pub fn probability_gain(old: Decimal, new: Decimal) -> Decimal {
    if old <= Decimal::ZERO || new <= Decimal::ZERO {
        return Decimal::ZERO;
    }
    Decimal::ONE / new - Decimal::ONE / old
}

/// A detected price movement on one (event, market kind, side).
///
/// Ephemeral: produced by the differ, consumed by the interest filter and
/// the alert state machine, never persisted as-is.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Signal {
    /// Unique signal identifier
    pub id: Uuid,
    pub event_id: i64,
    pub kind: MarketKind,
    pub side: BetSide,
    pub old_price: Decimal,
    pub new_price: Decimal,
    pub old_line: Option<Decimal>,
    pub new_line: Option<Decimal>,
    /// Percentage drop; computed across lines only for line-change signals
    pub drop_pct: Decimal,
    /// Timestamp of the newer snapshot in the comparison
    pub observed_at: DateTime<Utc>,
}

impl Signal {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        event_id: i64,
        kind: MarketKind,
        side: BetSide,
        old_price: Decimal,
        new_price: Decimal,
        old_line: Option<Decimal>,
        new_line: Option<Decimal>,
        observed_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            event_id,
            kind,
            side,
            old_price,
            new_price,
            old_line,
            new_line,
            drop_pct: drop_pct(old_price, new_price),
            observed_at,
        }
    }

    /// Whether this signal reports a mainline relocation rather than a
    /// price move on a stable line.
    pub fn is_line_change(&self) -> bool {
        matches!((self.old_line, self.new_line), (Some(a), Some(b)) if a != b)
    }

    pub fn probability_gain(&self) -> Decimal {
        probability_gain(self.old_price, self.new_price)
    }

    /// State-store key for this signal's market side.
    pub fn key(&self) -> String {
        format!("{}:{}:{}", self.event_id, self.kind, self.side)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_drop_pct() {
        let dp = drop_pct(dec!(2.10), dec!(1.60));
        assert!(dp > dec!(23.8) && dp < dec!(23.81));
        assert_eq!(drop_pct(dec!(0), dec!(1.60)), Decimal::ZERO);
    }

    #[test]
    fn test_probability_gain() {
        let gain = probability_gain(dec!(1.90), dec!(1.85));
        assert!(gain > dec!(0.014) && gain < dec!(0.0143));
        assert_eq!(probability_gain(dec!(0), dec!(1.85)), Decimal::ZERO);
    }

    #[test]
    fn test_is_line_change() {
        let same = Signal::new(
            1,
            MarketKind::Total,
            BetSide::Over,
            dec!(2.0),
            dec!(1.8),
            Some(dec!(2.5)),
            Some(dec!(2.5)),
            Utc::now(),
        );
        assert!(!same.is_line_change());

        let moved = Signal::new(
            1,
            MarketKind::Total,
            BetSide::Over,
            dec!(2.0),
            dec!(1.8),
            Some(dec!(2.5)),
            Some(dec!(3.0)),
            Utc::now(),
        );
        assert!(moved.is_line_change());
    }

    #[test]
    fn test_key_format() {
        let sig = Signal::new(
            42,
            MarketKind::Handicap,
            BetSide::Away,
            dec!(2.0),
            dec!(1.8),
            None,
            None,
            Utc::now(),
        );
        assert_eq!(sig.key(), "42:handicap:away");
    }
}
