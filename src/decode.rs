//! Typed access to a processed configuration tree.

use crate::error::{ConfError, Result};
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

/// Deserialize a configuration tree into `T`.
pub fn decode<T: DeserializeOwned>(value: Value) -> Result<T> {
    serde_json::from_value(value).map_err(ConfError::decode)
}

/// Deserialize the section at a dotted `name` into `T`.
///
/// Returns `Ok(None)` when the section does not exist.
///
/// ```
/// use layerconf::decode_section;
/// use serde::Deserialize;
/// use serde_json::json;
///
/// #[derive(Deserialize)]
/// struct Db {
///     host: String,
///     port: u16,
/// }
///
/// let tree = json!({"db": {"main": {"host": "x", "port": 5432}}});
/// let db: Db = decode_section(tree.as_object().unwrap(), "db.main")
///     .unwrap()
///     .unwrap();
/// assert_eq!((db.host.as_str(), db.port), ("x", 5432));
/// ```
pub fn decode_section<T: DeserializeOwned>(
    tree: &Map<String, Value>,
    name: &str,
) -> Result<Option<T>> {
    let Some(section) = lookup(tree, name) else {
        return Ok(None);
    };
    serde_json::from_value(section.clone())
        .map(Some)
        .map_err(|e| ConfError::decode(e).with_field(name))
}

/// Find the value at a dotted `name`; numeric segments index sequences.
pub fn lookup<'a>(tree: &'a Map<String, Value>, name: &str) -> Option<&'a Value> {
    let mut segments = name.split('.');
    let mut current = tree.get(segments.next()?)?;
    for segment in segments {
        current = match current {
            Value::Object(map) => map.get(segment)?,
            Value::Array(items) => items.get(segment.parse::<usize>().ok()?)?,
            _ => return None,
        };
    }
    Some(current)
}
