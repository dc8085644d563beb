//! In-memory loader. The locator value is a key of the map:
//!
//! ```text
//! map:defaults
//! map:overrides
//! ```

use super::Loader;
use serde_json::{Map, Value};

/// Serves configuration layers out of a map.
#[derive(Debug, Clone, Default)]
pub struct MapLoader {
    layers: Map<String, Value>,
}

impl MapLoader {
    pub fn new(layers: Map<String, Value>) -> Self {
        Self { layers }
    }

    /// Build from a JSON object value; anything else yields an empty loader.
    pub fn from_value(layers: Value) -> Self {
        match layers {
            Value::Object(layers) => Self::new(layers),
            _ => Self::default(),
        }
    }
}

impl Loader for MapLoader {
    fn load(&self, value: &str) -> anyhow::Result<Vec<Value>> {
        Ok(self.layers.get(value).cloned().into_iter().collect())
    }
}
