//! Dotted-path lookup over a parsed JSON document.
//!
//! `choices.0.message.content` walks object field `choices`, array index `0`,
//! then fields `message` and `content`. A lookup returns `None` when any
//! segment is missing, which keeps "absent" distinct from an explicit `null`.

use serde_json::Value;

/// Resolve `path` against `doc`. An empty path resolves to the document itself.
pub fn lookup<'a>(doc: &'a Value, path: &str) -> Option<&'a Value> {
    if path.is_empty() {
        return Some(doc);
    }
    let mut segments = path.split('.');
    descend(doc, &mut segments)
}

fn descend<'a, 'p>(
    node: &'a Value,
    segments: &mut impl Iterator<Item = &'p str>,
) -> Option<&'a Value> {
    let Some(segment) = segments.next() else {
        return Some(node);
    };
    let child = match node {
        Value::Object(map) => map.get(segment)?,
        Value::Array(items) => items.get(index(segment)?)?,
        _ => return None,
    };
    descend(child, segments)
}

fn index(segment: &str) -> Option<usize> {
    if segment.is_empty() || !segment.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    segment.parse().ok()
}

/// Integer at `path`, or `None` if missing or not a non-negative integer.
pub fn lookup_u64(doc: &Value, path: &str) -> Option<u64> {
    lookup(doc, path)?.as_u64()
}

/// Render a resolved value as answer text. Strings are taken verbatim, `null`
/// is empty and anything else is serialized as JSON.
pub fn as_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}
