//! Generic tree walk over heterogeneous catalog/detail documents
//!
//! Catalog records and event detail payloads arrive as arbitrary nested JSON
//! with inconsistent field names. Rather than parse each shape separately,
//! every source funnels through the same depth-bounded string collector and
//! a fixed priority scan for a human-readable label.

use serde_json::Value;

/// Maximum recursion depth when walking a document
const MAX_DEPTH: usize = 8;

/// Arrays longer than this are sampled from the front only
const MAX_LIST_ITEMS: usize = 200;

/// Field names that commonly carry a bet label, in priority order
const LABEL_FIELDS: &[&str] = &[
    "name", "t", "title", "caption", "c", "n", "label", "s", "sname", "ru", "en",
];

/// Whether a string is worth keeping as classification context
fn keep_context_str(s: &str) -> bool {
    let s = s.trim();
    if s.is_empty() || s.len() > 160 {
        return false;
    }
    let lower = s.to_lowercase();
    if lower.starts_with("http://") || lower.starts_with("https://") {
        return false;
    }
    // strings with no letters at all are usually ids or junk
    s.chars().any(|c| c.is_alphabetic())
}

/// Keys whose own name is a useful hint (e.g. a "period" or "total" group key)
fn key_is_context(key: &str) -> bool {
    matches!(
        key.to_lowercase().as_str(),
        "name" | "title" | "caption" | "text" | "market" | "period" | "kind" | "type" | "group"
    )
}

/// Recursively collect short alphabetic strings from a document.
pub fn collect_strings(node: &Value, out: &mut Vec<String>) {
    collect_at_depth(node, out, 0);
}

fn collect_at_depth(node: &Value, out: &mut Vec<String>, depth: usize) {
    if depth > MAX_DEPTH {
        return;
    }
    match node {
        Value::Object(map) => {
            for (key, value) in map {
                match value {
                    Value::String(s) => {
                        if keep_context_str(s) {
                            out.push(s.trim().to_string());
                        }
                    }
                    Value::Object(_) | Value::Array(_) => {
                        collect_at_depth(value, out, depth + 1);
                    }
                    _ => {}
                }
                if key_is_context(key) && keep_context_str(key) {
                    out.push(key.trim().to_string());
                }
            }
        }
        Value::Array(items) => {
            for item in items.iter().take(MAX_LIST_ITEMS) {
                collect_at_depth(item, out, depth + 1);
            }
        }
        Value::String(s) => {
            if keep_context_str(s) {
                out.push(s.trim().to_string());
            }
        }
        _ => {}
    }
}

/// All collected context joined into one classification string.
pub fn context_text(node: &Value) -> String {
    let mut parts = Vec::new();
    collect_strings(node, &mut parts);
    parts.join(" | ")
}

/// Scan the priority field list for a human-readable label.
///
/// Handles the shapes seen in real catalog dumps:
/// `{"id": 921, "name": "1"}`, `{"f": 921, "t": "W1"}`, `[921, "1"]`.
pub fn pick_label(record: &Value) -> Option<String> {
    match record {
        Value::Object(map) => {
            for field in LABEL_FIELDS {
                if let Some(Value::String(s)) = map.get(*field) {
                    let s = s.trim();
                    if !s.is_empty() && !s.eq_ignore_ascii_case("none") {
                        return Some(s.to_string());
                    }
                }
            }
            None
        }
        Value::Array(items) => match items.get(1) {
            Some(Value::String(s)) if !s.trim().is_empty() => {
                let s = s.trim();
                (!s.eq_ignore_ascii_case("none")).then(|| s.to_string())
            }
            _ => None,
        },
        _ => None,
    }
}

/// Extract a factor id from a record in any of the shapes the feeds use.
pub fn pick_factor_id(record: &Value) -> Option<u32> {
    fn as_id(v: &Value) -> Option<u32> {
        match v {
            Value::Number(n) => n.as_u64().and_then(|n| u32::try_from(n).ok()),
            Value::String(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    match record {
        Value::Object(map) => ["factor_id", "factorId", "id", "f"]
            .iter()
            .find_map(|k| map.get(*k).and_then(as_id)),
        Value::Array(items) => items.first().and_then(as_id),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_pick_label_object_shapes() {
        assert_eq!(pick_label(&json!({"id": 921, "name": "1"})), Some("1".to_string()));
        assert_eq!(pick_label(&json!({"f": 921, "t": "W1"})), Some("W1".to_string()));
        assert_eq!(pick_label(&json!({"f": 921, "t": "None"})), None);
        assert_eq!(pick_label(&json!({"f": 921})), None);
    }

    #[test]
    fn test_pick_label_tuple_shape() {
        assert_eq!(pick_label(&json!([921, "1"])), Some("1".to_string()));
        assert_eq!(pick_label(&json!([921])), None);
    }

    #[test]
    fn test_pick_factor_id() {
        assert_eq!(pick_factor_id(&json!({"factorId": 930})), Some(930));
        assert_eq!(pick_factor_id(&json!({"f": "931"})), Some(931));
        assert_eq!(pick_factor_id(&json!([927, "H1"])), Some(927));
        assert_eq!(pick_factor_id(&json!({"x": 1})), None);
    }

    #[test]
    fn test_collect_strings_filters_noise() {
        let doc = json!({
            "name": "Total Over",
            "url": "https://example.com/feed",
            "digits": "123456",
            "nested": {"caption": "1st half"},
            "list": [{"t": "Handicap"}],
        });
        let mut out = Vec::new();
        collect_strings(&doc, &mut out);
        assert!(out.contains(&"Total Over".to_string()));
        assert!(out.contains(&"1st half".to_string()));
        assert!(out.contains(&"Handicap".to_string()));
        assert!(!out.iter().any(|s| s.contains("https://")));
        assert!(!out.contains(&"123456".to_string()));
    }

    #[test]
    fn test_collect_strings_depth_bounded() {
        // build a document nested deeper than the walk limit
        let mut doc = json!({"name": "deepest"});
        for _ in 0..12 {
            doc = json!({ "inner": doc });
        }
        let mut out = Vec::new();
        collect_strings(&doc, &mut out);
        assert!(out.is_empty());
    }

    #[test]
    fn test_context_text_joins() {
        let doc = json!({"name": "Total", "t": "Over"});
        let text = context_text(&doc);
        assert!(text.contains("Total"));
        assert!(text.contains("Over"));
    }
}
