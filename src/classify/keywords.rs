//! Keyword heuristics shared by every classification source
//!
//! Feeds label the same bet in wildly different ways ("Total Over", "ТБ",
//! "O(2.5)", "W1", "П1"). Catalog records, event detail documents and raw
//! snapshot rows all run their text through these functions so the rules
//! live in exactly one place.

use super::types::{BetSide, HalfPeriod, MarketKind};
use rust_decimal::Decimal;

const TOTAL_WORDS: &[&str] = &[
    "total", "totals", "over", "under", "тотал", "тб", "тм", "больше", "меньше",
];

const HANDICAP_WORDS: &[&str] = &[
    "handicap", "hcp", "asian", "фора", "форы", "fora", "азиат",
];

const OUTCOME_WORDS: &[&str] = &[
    "1x2", "1х2", "match result", "result", "исход", "исходы", "победа", "ничья", "draw", "win",
];

fn normalized(text: &str) -> String {
    let mut s = text.trim().to_lowercase();
    s = s.split_whitespace().collect::<Vec<_>>().join(" ");
    s
}

/// Classify a market kind from free text context.
pub fn classify_kind(text: &str) -> MarketKind {
    let t = normalized(text);
    if t.is_empty() {
        return MarketKind::Other;
    }

    if TOTAL_WORDS.iter().any(|w| t.contains(w)) || has_total_shorthand(&t) {
        return MarketKind::Total;
    }
    if HANDICAP_WORDS.iter().any(|w| t.contains(w)) || has_signed_line(&t) {
        return MarketKind::Handicap;
    }
    if OUTCOME_WORDS.iter().any(|w| t.contains(w)) || is_outcome_shorthand(&t) {
        return MarketKind::Outcome;
    }
    MarketKind::Other
}

/// "O(2.5)" / "U(3)" / "Б(2.5)" style shorthands
fn has_total_shorthand(t: &str) -> bool {
    for prefix in ["o(", "u(", "б(", "м("] {
        if let Some(pos) = t.find(prefix) {
            let rest = &t[pos + prefix.len()..];
            if rest.chars().next().is_some_and(|c| c.is_ascii_digit()) {
                return true;
            }
        }
    }
    false
}

/// "1 (-1.5)" / "2 (+0.5)" style handicap shorthands: a side marker
/// followed by an explicitly signed number in parentheses.
fn has_signed_line(t: &str) -> bool {
    let bytes = t.as_bytes();
    for (i, window) in bytes.windows(2).enumerate() {
        if (window[0] == b'(') && (window[1] == b'-' || window[1] == b'+') {
            if bytes.get(i + 2).is_some_and(|c| c.is_ascii_digit()) {
                return true;
            }
        }
    }
    false
}

fn is_outcome_shorthand(t: &str) -> bool {
    let squashed: String = t.chars().filter(|c| !c.is_whitespace()).collect();
    matches!(
        squashed.as_str(),
        "1" | "2" | "x" | "х" | "п1" | "п2" | "w1" | "w2" | "home" | "away" | "team1" | "team2" | "н"
    )
}

/// Detect whether text refers to the first half.
pub fn classify_half(text: &str) -> HalfPeriod {
    let t = normalized(text);
    if t.is_empty() {
        return HalfPeriod::FullTime;
    }

    let first_half_markers = [
        "1st half", "first half", "half 1", "1-й тайм", "1 тайм", "первый тайм",
    ];
    if first_half_markers.iter().any(|m| t.contains(m)) {
        return HalfPeriod::FirstHalf;
    }
    // short tokens need word boundaries to avoid matching inside other words
    if t.split(|c: char| !c.is_alphanumeric())
        .any(|tok| tok == "1h" || tok == "ht")
    {
        return HalfPeriod::FirstHalf;
    }
    HalfPeriod::FullTime
}

/// Map a bet label to the side it quotes, given the market kind.
pub fn side_from_label(kind: MarketKind, label: &str) -> Option<BetSide> {
    let t = normalized(label);
    let squashed: String = t.chars().filter(|c| !c.is_whitespace()).collect();

    match kind {
        MarketKind::Total => {
            if t.contains("over") || t.contains("тб") || t.contains("больше")
                || squashed.starts_with("o(") || squashed.starts_with("б(")
            {
                Some(BetSide::Over)
            } else if t.contains("under") || t.contains("тм") || t.contains("меньше")
                || squashed.starts_with("u(") || squashed.starts_with("м(")
            {
                Some(BetSide::Under)
            } else {
                None
            }
        }
        MarketKind::Handicap => {
            if t.contains("ф1") || t.contains("h1") || t.contains("home")
                || squashed.starts_with('1')
                || t.split_whitespace().any(|tok| tok == "1")
            {
                Some(BetSide::Home)
            } else if t.contains("ф2") || t.contains("h2") || t.contains("away")
                || squashed.starts_with('2')
                || t.split_whitespace().any(|tok| tok == "2")
            {
                Some(BetSide::Away)
            } else {
                None
            }
        }
        MarketKind::Outcome => match squashed.as_str() {
            "1" | "п1" | "w1" | "home" | "team1" => Some(BetSide::Home),
            "x" | "х" | "н" | "draw" | "ничья" => Some(BetSide::Draw),
            "2" | "п2" | "w2" | "away" | "team2" => Some(BetSide::Away),
            _ => {
                if t.contains("draw") || t.contains("нич") {
                    Some(BetSide::Draw)
                } else if t.contains("1") && !t.contains("2") {
                    Some(BetSide::Home)
                } else if t.contains("2") && !t.contains("1") {
                    Some(BetSide::Away)
                } else {
                    None
                }
            }
        },
        MarketKind::Other => None,
    }
}

/// Row-level inference: classify from a snapshot's own label and line.
///
/// Weakest source, used only to upgrade a still-unresolved factor. A bare
/// numeric label with a line param is assumed to be a handicap side.
pub fn infer_from_row(label: &str, line: Option<Decimal>) -> Option<(MarketKind, BetSide)> {
    let t = normalized(label);
    if t.is_empty() {
        return None;
    }

    let kind = classify_kind(&t);
    if kind != MarketKind::Other {
        return side_from_label(kind, &t).map(|side| (kind, side));
    }

    // sign pattern: "1"/"2" with a line param quacks like a handicap
    if line.is_some() {
        let squashed: String = t.chars().filter(|c| !c.is_whitespace()).collect();
        match squashed.as_str() {
            "1" => return Some((MarketKind::Handicap, BetSide::Home)),
            "2" => return Some((MarketKind::Handicap, BetSide::Away)),
            _ => {}
        }
    }

    side_from_label(MarketKind::Outcome, &t).map(|side| (MarketKind::Outcome, side))
}
