//! Merge engine
//!
//! Folds an incoming record into a stored issue's fields, one merge path at
//! a time. Merging only augments what is already there:
//!
//! - absent or falsy stored value: untouched
//! - text: the incoming text is appended on a new line unless the stored
//!   text already contains it (case-insensitive)
//! - array: becomes the union of stored and incoming elements
//! - anything else: untouched

use serde_json::Value;

use crate::field_path::FieldPath;

/// JavaScript-style truthiness of a stored value
pub fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().map_or(true, |f| f != 0.0 && !f.is_nan()),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

/// Merge `incoming` into `original` in place; returns true if it changed
pub fn merge_value(original: &mut Value, incoming: Option<&Value>) -> bool {
    if !is_truthy(original) {
        return false;
    }

    match (original, incoming) {
        (Value::String(text), Some(Value::String(addition))) => {
            if text.to_lowercase().contains(&addition.to_lowercase()) {
                return false;
            }
            text.push('\n');
            text.push_str(addition);
            true
        }
        (Value::Array(items), Some(Value::Array(additions))) => {
            let mut changed = false;
            for addition in additions {
                if !items.contains(addition) {
                    items.push(addition.clone());
                    changed = true;
                }
            }
            changed
        }
        (Value::Array(items), Some(addition)) if !addition.is_null() => {
            if items.contains(addition) {
                return false;
            }
            items.push(addition.clone());
            true
        }
        _ => false,
    }
}

/// Merge every merge path of `incoming` into `target`.
///
/// Returns how many fields changed.
pub fn merge_record(target: &mut Value, incoming: &Value, merge_paths: &[FieldPath]) -> usize {
    let mut changed = 0;
    for path in merge_paths {
        let addition = path.get(incoming);
        if let Some(original) = path.get_mut(target) {
            if merge_value(original, addition) {
                changed += 1;
            }
        }
    }
    changed
}
