//! Item validation and free-text sanitization
//!
//! `validate_item` only runs against persisted data; corrupt entries are
//! dropped on load rather than reported. `sanitize` runs on every externally
//! supplied item name and user identifier before it enters the document.

use serde_json::Value;

/// Maximum item name length, in characters, after sanitization
pub const MAX_NAME_LEN: usize = 100;

/// Keys every persisted item must carry
const REQUIRED_FIELDS: [&str; 5] = ["id", "name", "status", "completed_by", "completed_at"];

/// Characters removed from free text after tag stripping
const STRIPPED_CHARS: [char; 9] = ['\\', '/', '*', '?', '<', '>', '|', '\'', '"'];

/// Check that `id` has the canonical lowercase hyphenated UUID form
/// (`xxxxxxxx-xxxx-xxxx-xxxx-xxxxxxxxxxxx`).
pub fn is_canonical_id(id: &str) -> bool {
    let bytes = id.as_bytes();
    if bytes.len() != 36 {
        return false;
    }
    bytes.iter().enumerate().all(|(i, b)| match i {
        8 | 13 | 18 | 23 => *b == b'-',
        _ => matches!(b, b'0'..=b'9' | b'a'..=b'f'),
    })
}

/// Check the shape of a persisted item
pub fn validate_item(candidate: &Value) -> bool {
    let Some(item) = candidate.as_object() else {
        return false;
    };
    if !REQUIRED_FIELDS.iter().all(|field| item.contains_key(*field)) {
        return false;
    }
    let id_ok = item.get("id").and_then(Value::as_str).is_some_and(is_canonical_id);
    let name_ok = item
        .get("name")
        .and_then(Value::as_str)
        .is_some_and(|name| name.chars().count() <= MAX_NAME_LEN);
    let status_ok = matches!(
        item.get("status").and_then(Value::as_str),
        Some("pending") | Some("completed")
    );
    id_ok && name_ok && status_ok
}

/// Sanitize a JSON value that should hold free text. Non-strings become empty.
pub fn sanitize_value(value: &Value) -> String {
    value.as_str().map(sanitize).unwrap_or_default()
}

/// Strip tag-like spans and unsafe characters, then trim whitespace
pub fn sanitize(text: &str) -> String {
    let mut untagged = String::with_capacity(text.len());
    let mut rest = text;
    while let Some(open) = rest.find('<') {
        untagged.push_str(&rest[..open]);
        let after = &rest[open..];
        match after.find('>') {
            Some(close) => rest = &after[close + 1..],
            None => {
                // Unterminated; the bracket itself goes in the character pass
                untagged.push_str(after);
                rest = "";
            }
        }
    }
    untagged.push_str(rest);

    untagged
        .chars()
        .filter(|c| !STRIPPED_CHARS.contains(c))
        .collect::<String>()
        .trim()
        .to_string()
}
