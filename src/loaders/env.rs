//! Environment variable loader.
//!
//! The locator value is a regular expression matched against variable names;
//! every match becomes a top-level key of a single flat layer:
//!
//! ```text
//! env:^MYAPP_
//! ```

use super::Loader;
use anyhow::Context;
use regex_lite::Regex;
use serde_json::{Map, Value};

/// Imports environment variables into a configuration layer.
#[derive(Debug, Clone, Default)]
pub struct EnvLoader {
    /// Fixed variable set; `None` reads the process environment at load time.
    vars: Option<Vec<(String, String)>>,
}

impl EnvLoader {
    pub fn new() -> Self {
        Self::default()
    }

    /// Use a fixed set of variables instead of the process environment.
    pub fn from_vars<K, V>(vars: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            vars: Some(
                vars.into_iter()
                    .map(|(k, v)| (k.into(), v.into()))
                    .collect(),
            ),
        }
    }
}

impl Loader for EnvLoader {
    fn load(&self, value: &str) -> anyhow::Result<Vec<Value>> {
        let re = Regex::new(value)
            .with_context(|| format!("env: invalid variable name pattern \"{}\"", value))?;

        let vars: Box<dyn Iterator<Item = (String, String)> + '_> = match &self.vars {
            Some(vars) => Box::new(vars.iter().cloned()),
            None => Box::new(std::env::vars_os().filter_map(|(k, v)| {
                Some((k.into_string().ok()?, v.into_string().ok()?))
            })),
        };

        let mut layer = Map::new();
        for (key, val) in vars {
            if re.is_match(&key) {
                layer.insert(key, Value::String(val));
            }
        }

        Ok(vec![Value::Object(layer)])
    }
}
