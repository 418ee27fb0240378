//! Wire types from the ingestion/storage collaborator

use crate::classify::FactorId;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// One immutable price observation for one quotable bet.
///
/// The meaning of `factor_id` must be discovered by the classifier; rows are
/// ordered by `observed_at` within an event and never mutated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuoteSnapshot {
    pub factor_id: FactorId,
    pub price: Decimal,
    #[serde(rename = "line_param")]
    pub line: Option<Decimal>,
    pub label: Option<String>,
    pub observed_at: DateTime<Utc>,
}

/// Candidate event returned by the events query.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventSummary {
    pub event_id: i64,
    #[serde(default)]
    pub sport_id: Option<i64>,
    #[serde(default)]
    pub league: Option<String>,
    #[serde(default)]
    pub home: String,
    #[serde(default)]
    pub away: String,
    #[serde(default)]
    pub start_time: Option<DateTime<Utc>>,
}

const VIRTUAL_WORDS: &[&str] = &[
    "esports", "e-sport", "e sport", "кибер", "киберспорт", "virtual", "виртуал",
    "fifa", "efootball", "pro evolution", "pes", "nba2k", "rocket league",
];

impl EventSummary {
    pub fn fixture_name(&self) -> String {
        format!("{} — {}", self.home, self.away)
            .trim_matches(|c: char| c == ' ' || c == '—')
            .to_string()
    }

    /// Heuristic filter for e-sports and virtual fixtures.
    ///
    /// Real prematch football fixtures read "Team A — Team B"; virtual feeds
    /// carry vs-tags, player nicknames in parentheses, underscores, or mixed
    /// letter+digit tokens like "Player123".
    pub fn is_virtual_fixture(&self) -> bool {
        let name = self.fixture_name();
        if name.is_empty() {
            return true;
        }
        let lower = name.to_lowercase();

        if VIRTUAL_WORDS.iter().any(|w| lower.contains(w)) {
            return true;
        }
        if lower.split_whitespace().any(|tok| tok == "vs") {
            return true;
        }
        if name.contains('(') && name.contains(')') {
            return true;
        }
        if name.contains('_') {
            return true;
        }
        if lower.contains("home") && lower.contains("away") {
            return true;
        }
        if lower.contains("хозя") && lower.contains("гост") {
            return true;
        }
        // mixed latin letters + digits in one token, e.g. nicknames
        name.split_whitespace().any(|tok| {
            tok.chars().any(|c| c.is_ascii_alphabetic()) && tok.chars().any(|c| c.is_ascii_digit())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn event(home: &str, away: &str) -> EventSummary {
        EventSummary {
            event_id: 1,
            sport_id: Some(1),
            league: None,
            home: home.to_string(),
            away: away.to_string(),
            start_time: None,
        }
    }

    #[test]
    fn test_plain_fixture_is_not_virtual() {
        assert!(!event("Arsenal", "Chelsea").is_virtual_fixture());
    }

    #[test]
    fn test_nickname_fixture_is_virtual() {
        assert!(event("Arsenal (Kex77)", "Chelsea (m1nd)").is_virtual_fixture());
        assert!(event("Player123", "Player456").is_virtual_fixture());
    }

    #[test]
    fn test_keyword_fixture_is_virtual() {
        assert!(event("FIFA Cyber League A", "Team B").is_virtual_fixture());
        assert!(event("Home team", "Away team").is_virtual_fixture());
    }

    #[test]
    fn test_empty_fixture_is_virtual() {
        assert!(event("", "").is_virtual_fixture());
    }

    #[test]
    fn test_snapshot_deserialize() {
        let json = r#"{
            "factor_id": 930,
            "price": 1.85,
            "line_param": 2.5,
            "label": "Total Over",
            "observed_at": "2025-03-01T12:00:00Z"
        }"#;
        let snap: QuoteSnapshot = serde_json::from_str(json).unwrap();
        assert_eq!(snap.factor_id, 930);
        assert_eq!(snap.line, Some(rust_decimal_macros::dec!(2.5)));
    }
}
