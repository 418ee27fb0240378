//! Catalog record normalization
//!
//! The factor catalog is authoritative but heterogeneous: records arrive as
//! arbitrary nested structures with inconsistent field names, some with a
//! structured label, some with only free text buried several levels deep.
//! Normalization is an ordered chain of extractors over the raw document,
//! never an assumption about a fixed schema.

use super::context::{context_text, pick_label};
use super::keywords::{classify_half, classify_kind, side_from_label};
use super::types::{DescriptorSource, MarketDescriptor, MarketKind};
use rust_decimal::Decimal;
use serde_json::Value;

/// Fields that may carry the line parameter in a catalog record.
///
/// `value` is deliberately absent: in detail documents it holds the odd
/// itself, not the line.
const LINE_FIELDS: &[&str] = &["p", "param", "line", "pt"];

fn pick_line(record: &Value) -> Option<Decimal> {
    let map = record.as_object()?;
    for field in LINE_FIELDS {
        match map.get(*field) {
            Some(Value::Number(n)) => {
                if let Some(f) = n.as_f64() {
                    return Decimal::try_from(f).ok();
                }
            }
            Some(Value::String(s)) => {
                if let Ok(d) = s.trim().replace(',', ".").parse::<Decimal>() {
                    return Some(d);
                }
            }
            _ => {}
        }
    }
    None
}

/// Normalize one raw catalog record into a descriptor.
///
/// Returns `None` when the record carries no classifiable context at all;
/// an unrecognized but present context yields an `Other` descriptor that
/// downstream sources may still upgrade.
pub fn normalize_record(record: &Value) -> Option<MarketDescriptor> {
    let label = pick_label(record);
    let context = context_text(record);
    if label.is_none() && context.is_empty() {
        return None;
    }

    // the label alone is usually decisive; full context is the fallback
    let mut kind = label
        .as_deref()
        .map(classify_kind)
        .unwrap_or(MarketKind::Other);
    if kind == MarketKind::Other {
        kind = classify_kind(&context);
    }

    let side = label
        .as_deref()
        .and_then(|l| side_from_label(kind, l))
        .or_else(|| side_from_label(kind, &context));

    let half = label
        .as_deref()
        .map(classify_half)
        .filter(|h| *h == super::types::HalfPeriod::FirstHalf)
        .unwrap_or_else(|| classify_half(&context));

    Some(MarketDescriptor {
        kind,
        side,
        line: pick_line(record),
        half,
        label,
        source: DescriptorSource::Catalog,
    })
}
