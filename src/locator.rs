//! Configuration locators.
//!
//! A locator is a `"<loader>:<value>"` string. The loader name routes the
//! locator to a registered [`Loader`](crate::loaders::Loader); the value is
//! opaque here and interpreted by that loader (a file glob, an environment
//! variable pattern, a map key, ...).

use crate::error::{ConfError, Result};
use serde_json::Value;
use std::fmt;

/// A parsed configuration locator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Locator {
    pub loader: String,
    pub value: String,
}

impl Locator {
    /// Parse a raw `"<loader>:<value>"` string.
    ///
    /// Splits on the first `:` only, so the value may itself contain colons.
    pub fn parse(raw: &str) -> Result<Self> {
        if raw.is_empty() {
            return Err(ConfError::empty_locator());
        }

        match raw.split_once(':') {
            Some((loader, value)) if !loader.is_empty() => Ok(Self {
                loader: loader.to_string(),
                value: value.to_string(),
            }),
            _ => Err(ConfError::missing_loader_name(raw)),
        }
    }
}

impl fmt::Display for Locator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.loader, self.value)
    }
}

/// One entry of the list handed to [`Processor::load`](crate::Processor::load):
/// either a locator string or an inline layer.
#[derive(Debug, Clone, PartialEq)]
pub enum Source {
    Locator(String),
    Inline(Value),
}

impl From<&str> for Source {
    fn from(raw: &str) -> Self {
        Source::Locator(raw.to_string())
    }
}

impl From<String> for Source {
    fn from(raw: String) -> Self {
        Source::Locator(raw)
    }
}

impl From<Value> for Source {
    fn from(layer: Value) -> Self {
        Source::Inline(layer)
    }
}

impl From<serde_json::Map<String, Value>> for Source {
    fn from(layer: serde_json::Map<String, Value>) -> Self {
        Source::Inline(Value::Object(layer))
    }
}
