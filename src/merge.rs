//! Deep merge of configuration layers.
//!
//! Maps are merged key by key; everything else is replaced by the
//! higher-priority side unless that side holds the zero value for its type.
//! Sequences are replaced entirely, never concatenated.

use serde_json::Value;

/// Deep merge two values, with `overlay` taking precedence over `base`.
///
/// - A `null` on either side yields the other side
/// - Objects are merged recursively: keys in overlay are merged into base
/// - Anything else: overlay replaces base, unless overlay is a zero value
///   (`""`, `0`, `false`, `[]`), which lets a layer pass a parameter through
///   without overriding it
///
/// # Example
/// ```
/// use serde_json::json;
/// use layerconf::merge::deep_merge;
///
/// let base = json!({"server": {"port": 8080, "host": "localhost"}, "debug": true});
/// let overlay = json!({"server": {"port": 9000}, "debug": false});
/// let result = deep_merge(base, overlay);
/// assert_eq!(result, json!({"server": {"port": 9000, "host": "localhost"}, "debug": true}));
/// ```
pub fn deep_merge(base: Value, overlay: Value) -> Value {
    match (base, overlay) {
        (Value::Null, overlay) => overlay,
        (base, Value::Null) => base,
        (Value::Object(mut base_map), Value::Object(overlay_map)) => {
            for (key, overlay_value) in overlay_map {
                let merged_value = match base_map.get_mut(&key) {
                    Some(slot) => deep_merge(slot.take(), overlay_value),
                    None => overlay_value,
                };
                base_map.insert(key, merged_value);
            }
            Value::Object(base_map)
        }
        (base, overlay) if is_zero(&overlay) => base,
        (_, overlay) => overlay,
    }
}

/// Merge multiple values in order, with later values taking precedence.
///
/// Equivalent to folding `deep_merge` over the list; an empty list yields `null`.
pub fn deep_merge_all(values: impl IntoIterator<Item = Value>) -> Value {
    values.into_iter().fold(Value::Null, deep_merge)
}

/// Whether a value is the zero value of its kind.
///
/// Maps are never zero: an empty map still replaces a non-map value.
pub fn is_zero(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Bool(b) => !b,
        Value::Number(n) => n.as_f64() == Some(0.0),
        Value::String(s) => s.is_empty(),
        Value::Array(items) => items.is_empty(),
        Value::Object(_) => false,
    }
}
