//! Per-event detail document parsing
//!
//! The detail document mirrors the feed's own event view: a list of event
//! nodes (the base event plus period children), each carrying quote entries
//! with a factor id, a label and an optional line parameter. Positional
//! rules apply on top of the keyword classifier: a child node marked as a
//! first-half period taints every factor under it, and mainline hints live
//! in the document metadata.

use super::context::{pick_factor_id, pick_label};
use super::keywords::{classify_half, classify_kind, side_from_label};
use super::types::{DescriptorSource, FactorId, HalfPeriod, MarketDescriptor};
use rust_decimal::Decimal;
use serde_json::Value;
use std::collections::HashMap;

/// Feed-specific node kind for first-half child events
const FIRST_HALF_NODE_KIND: i64 = 100_201;

/// Explicit "displayed line" hints from the document metadata
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct MainlineHints {
    pub total: Option<Decimal>,
    pub handicap: Option<Decimal>,
}

fn number_as_decimal(v: &Value) -> Option<Decimal> {
    match v {
        Value::Number(n) => n.as_f64().and_then(|f| Decimal::try_from(f).ok()),
        Value::String(s) => s.trim().replace(',', ".").parse().ok(),
        _ => None,
    }
}

fn node_half(node: &Value) -> HalfPeriod {
    let kind = node.get("kind").and_then(Value::as_i64).unwrap_or(0);
    if kind == FIRST_HALF_NODE_KIND {
        return HalfPeriod::FirstHalf;
    }
    let name = node.get("name").and_then(Value::as_str).unwrap_or("");
    classify_half(name)
}

/// Collect quote entries (objects carrying a factor id) under a node.
fn collect_quotes<'a>(node: &'a Value, out: &mut Vec<&'a Value>, depth: usize) {
    if depth > 6 {
        return;
    }
    match node {
        Value::Object(map) => {
            if map.contains_key("factorId") || map.contains_key("factor_id") {
                out.push(node);
                return;
            }
            for value in map.values() {
                collect_quotes(value, out, depth + 1);
            }
        }
        Value::Array(items) => {
            for item in items {
                collect_quotes(item, out, depth + 1);
            }
        }
        _ => {}
    }
}

fn quote_descriptor(quote: &Value, half: HalfPeriod) -> Option<(FactorId, MarketDescriptor)> {
    let fid = pick_factor_id(quote)?;
    let label = pick_label(quote)?;

    let kind = classify_kind(&label);
    let side = side_from_label(kind, &label);
    // `p` is the line parameter; `value` holds the odd itself and must not
    // be read as a line
    let line = quote.get("p").and_then(number_as_decimal);

    Some((
        fid,
        MarketDescriptor {
            kind,
            side,
            line,
            half,
            label: Some(label),
            source: DescriptorSource::EventDetail,
        },
    ))
}

fn find_hint(doc: &Value, keys: &[&str]) -> Option<Decimal> {
    fn walk(node: &Value, keys: &[&str], depth: usize) -> Option<Decimal> {
        if depth > 4 {
            return None;
        }
        match node {
            Value::Object(map) => {
                for key in keys {
                    if let Some(v) = map.get(*key) {
                        if let Some(d) = number_as_decimal(v) {
                            return Some(d);
                        }
                    }
                }
                map.values().find_map(|v| walk(v, keys, depth + 1))
            }
            Value::Array(items) => items.iter().find_map(|v| walk(v, keys, depth + 1)),
            _ => None,
        }
    }
    walk(doc, keys, 0)
}

/// Parse a detail document into per-factor descriptors plus mainline hints.
pub fn parse_detail(doc: &Value) -> (HashMap<FactorId, MarketDescriptor>, MainlineHints) {
    let mut descriptors: HashMap<FactorId, MarketDescriptor> = HashMap::new();

    let nodes: Vec<&Value> = match doc.get("events").and_then(Value::as_array) {
        Some(events) => events.iter().collect(),
        // flat documents: treat the root as a single full-time node
        None => vec![doc],
    };

    for node in nodes {
        let half = node_half(node);
        let mut quotes = Vec::new();
        collect_quotes(node, &mut quotes, 0);
        for quote in quotes {
            if let Some((fid, desc)) = quote_descriptor(quote, half) {
                // keep the first classification per factor; period children
                // repeat base factors and must not overwrite them
                descriptors.entry(fid).or_insert(desc);
            }
        }
    }

    let hints = MainlineHints {
        total: find_hint(doc, &["main_total", "mainTotal"]),
        handicap: find_hint(doc, &["main_handicap", "mainHandicap", "main_hcp"]),
    };

    (descriptors, hints)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classify::types::{BetSide, MarketKind};
    use rust_decimal_macros::dec;
    use serde_json::json;

    fn sample_doc() -> Value {
        json!({
            "events": [
                {
                    "id": 100,
                    "name": "Arsenal — Chelsea",
                    "quotes": [
                        {"factorId": 921, "name": "1"},
                        {"factorId": 930, "name": "Total Over", "p": 2.5, "value": 1.85},
                        {"factorId": 931, "name": "Total Under", "p": 2.5, "value": 1.95}
                    ]
                },
                {
                    "id": 101,
                    "parentId": 100,
                    "kind": 100201,
                    "quotes": [
                        {"factorId": 1930, "name": "Total Over", "p": 1.0}
                    ]
                }
            ],
            "meta": {"main_total": 2.5, "main_handicap": -1.0}
        })
    }

    #[test]
    fn test_parse_detail_descriptors() {
        let (descriptors, _) = parse_detail(&sample_doc());
        let over = &descriptors[&930];
        assert_eq!(over.kind, MarketKind::Total);
        assert_eq!(over.side, Some(BetSide::Over));
        assert_eq!(over.line, Some(dec!(2.5)));
        assert_eq!(over.half, HalfPeriod::FullTime);
    }

    #[test]
    fn test_parse_detail_first_half_child() {
        let (descriptors, _) = parse_detail(&sample_doc());
        assert_eq!(descriptors[&1930].half, HalfPeriod::FirstHalf);
    }

    #[test]
    fn test_parse_detail_value_is_not_a_line() {
        let doc = json!({
            "events": [{"id": 1, "quotes": [{"factorId": 930, "name": "Over", "value": 1.85}]}]
        });
        let (descriptors, _) = parse_detail(&doc);
        assert_eq!(descriptors[&930].line, None);
    }

    #[test]
    fn test_parse_detail_hints() {
        let (_, hints) = parse_detail(&sample_doc());
        assert_eq!(hints.total, Some(dec!(2.5)));
        assert_eq!(hints.handicap, Some(dec!(-1.0)));
    }

    #[test]
    fn test_parse_detail_flat_document() {
        let doc = json!({"quotes": [{"factorId": 927, "name": "Handicap 1", "p": -1.5}]});
        let (descriptors, _) = parse_detail(&doc);
        assert_eq!(descriptors[&927].kind, MarketKind::Handicap);
    }
}
