//! Market descriptor types

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Opaque per-bet identifier assigned by the feed
pub type FactorId = u32;

/// Semantic market classification of a bet
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MarketKind {
    /// Match result (win/draw/lose)
    Outcome,
    /// Spread with a numeric line
    Handicap,
    /// Over/under with a numeric line
    Total,
    /// Unresolved or out-of-scope market
    Other,
}

impl MarketKind {
    /// Whether bets of this kind carry a numeric line parameter
    pub fn has_line(&self) -> bool {
        matches!(self, MarketKind::Handicap | MarketKind::Total)
    }

    /// Canonical line value used as a tie-breaker in mainline selection
    pub fn canonical_line(&self) -> Decimal {
        match self {
            MarketKind::Total => Decimal::new(25, 1), // 2.5
            _ => Decimal::ZERO,
        }
    }
}

impl std::fmt::Display for MarketKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            MarketKind::Outcome => "outcome",
            MarketKind::Handicap => "handicap",
            MarketKind::Total => "total",
            MarketKind::Other => "other",
        };
        write!(f, "{s}")
    }
}

/// Which side of a market a bet is quoting
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BetSide {
    Home,
    Draw,
    Away,
    Over,
    Under,
}

impl std::fmt::Display for BetSide {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            BetSide::Home => "home",
            BetSide::Draw => "draw",
            BetSide::Away => "away",
            BetSide::Over => "over",
            BetSide::Under => "under",
        };
        write!(f, "{s}")
    }
}

/// Match period a market belongs to. Markets from different halves are
/// never merged into the same table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum HalfPeriod {
    #[default]
    FullTime,
    FirstHalf,
}

impl std::fmt::Display for HalfPeriod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            HalfPeriod::FullTime => write!(f, "ft"),
            HalfPeriod::FirstHalf => write!(f, "1h"),
        }
    }
}

/// Which data source resolved a descriptor. Higher rank wins when a
/// factor is re-resolved later.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DescriptorSource {
    /// Live per-event detail document
    EventDetail,
    /// Factor catalog record
    Catalog,
    /// Hard-coded table of well-known factor ids
    Fallback,
    /// Inferred from a snapshot row's own label/line
    RowInference,
    /// Nothing resolved the factor yet
    Unresolved,
}

impl DescriptorSource {
    /// Rank follows the resolution order: an earlier source is stronger,
    /// so "first success wins" holds across re-resolution cycles.
    pub fn rank(&self) -> u8 {
        match self {
            DescriptorSource::Catalog => 4,
            DescriptorSource::EventDetail => 3,
            DescriptorSource::Fallback => 2,
            DescriptorSource::RowInference => 1,
            DescriptorSource::Unresolved => 0,
        }
    }
}

/// Semantic description of one quotable bet, derived from an opaque
/// factor id by the classifier.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarketDescriptor {
    pub kind: MarketKind,
    pub side: Option<BetSide>,
    pub line: Option<Decimal>,
    pub half: HalfPeriod,
    pub label: Option<String>,
    pub source: DescriptorSource,
}

impl MarketDescriptor {
    pub fn unresolved() -> Self {
        Self {
            kind: MarketKind::Other,
            side: None,
            line: None,
            half: HalfPeriod::FullTime,
            label: None,
            source: DescriptorSource::Unresolved,
        }
    }

    /// A descriptor is resolved once it names a concrete market kind and side.
    pub fn is_resolved(&self) -> bool {
        self.kind != MarketKind::Other && self.side.is_some()
    }

    /// Merge a candidate resolution into this descriptor.
    ///
    /// A concrete kind is never downgraded back to `Other`, and a weaker
    /// source never overwrites a stronger one. Fields the candidate lacks
    /// are carried over when both agree on the kind.
    pub fn upgrade(&mut self, mut candidate: MarketDescriptor) {
        if candidate.kind == MarketKind::Other {
            return;
        }
        if self.is_resolved() && candidate.source.rank() <= self.source.rank() {
            return;
        }
        if candidate.kind == self.kind {
            candidate.side = candidate.side.or(self.side);
            candidate.line = candidate.line.or(self.line);
        }
        if candidate.label.is_none() {
            candidate.label = self.label.clone();
        }
        *self = candidate;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_has_line() {
        assert!(MarketKind::Handicap.has_line());
        assert!(MarketKind::Total.has_line());
        assert!(!MarketKind::Outcome.has_line());
        assert!(!MarketKind::Other.has_line());
    }

    #[test]
    fn test_upgrade_never_downgrades_to_other() {
        let mut desc = MarketDescriptor {
            kind: MarketKind::Total,
            side: Some(BetSide::Over),
            line: None,
            half: HalfPeriod::FullTime,
            label: Some("Over".to_string()),
            source: DescriptorSource::RowInference,
        };
        desc.upgrade(MarketDescriptor::unresolved());
        assert_eq!(desc.kind, MarketKind::Total);
    }

    #[test]
    fn test_upgrade_stronger_source_wins() {
        let mut desc = MarketDescriptor {
            kind: MarketKind::Outcome,
            side: Some(BetSide::Home),
            line: None,
            half: HalfPeriod::FullTime,
            label: None,
            source: DescriptorSource::RowInference,
        };
        desc.upgrade(MarketDescriptor {
            kind: MarketKind::Handicap,
            side: Some(BetSide::Home),
            line: None,
            half: HalfPeriod::FullTime,
            label: Some("H1".to_string()),
            source: DescriptorSource::Catalog,
        });
        assert_eq!(desc.kind, MarketKind::Handicap);
        assert_eq!(desc.source, DescriptorSource::Catalog);
    }

    #[test]
    fn test_upgrade_weaker_source_ignored() {
        let mut desc = MarketDescriptor {
            kind: MarketKind::Total,
            side: Some(BetSide::Over),
            line: None,
            half: HalfPeriod::FullTime,
            label: None,
            source: DescriptorSource::Catalog,
        };
        desc.upgrade(MarketDescriptor {
            kind: MarketKind::Outcome,
            side: Some(BetSide::Home),
            line: None,
            half: HalfPeriod::FullTime,
            label: None,
            source: DescriptorSource::RowInference,
        });
        assert_eq!(desc.kind, MarketKind::Total);
    }
}
