//! Configuration processor.
//!
//! Loads layers from the registered loaders, expands `$include` directives in
//! each layer, merges the layers in order and then resolves the remaining
//! directives over the merged tree:
//!
//! - `$ref` replaces a node with another section of the tree
//! - `$underlay` merges named sections beneath a node
//! - `$overlay` merges named sections above a node
//! - `${name}` inside strings interpolates a section, `$${name}` escapes it
//!
//! ```
//! use layerconf::{MapLoader, Processor, ProcessorConfig};
//! use serde_json::json;
//!
//! let loader = MapLoader::from_value(json!({
//!     "base": {"db": {"host": "localhost", "port": 5432}},
//!     "app": {"url": "postgres://${db.host}:${db.port}/app"},
//! }));
//! let processor = Processor::new(ProcessorConfig::default().with_loader("map", loader));
//!
//! let config = processor.load(["map:base", "map:app"]).unwrap().unwrap();
//! assert_eq!(config["url"], json!("postgres://localhost:5432/app"));
//! ```

mod interpolate;
mod session;

use crate::error::{ConfError, Result};
use crate::loaders::{Loader, LoaderRegistry};
use crate::locator::{Locator, Source};
use crate::merge::deep_merge_all;
use serde_json::{Map, Value};
use session::Session;
use tracing::debug;

pub const REF_KEY: &str = "$ref";
pub const INCLUDE_KEY: &str = "$include";
pub const UNDERLAY_KEY: &str = "$underlay";
pub const OVERLAY_KEY: &str = "$overlay";

/// Processor settings.
#[derive(Debug, Default)]
pub struct ProcessorConfig {
    /// Loaders addressed by the loader name of a locator.
    pub loaders: LoaderRegistry,
    /// Merge layers only; leave every directive untouched.
    pub disable_processing: bool,
}

impl ProcessorConfig {
    pub fn new(loaders: LoaderRegistry) -> Self {
        Self {
            loaders,
            disable_processing: false,
        }
    }

    pub fn with_loader(mut self, name: impl Into<String>, loader: impl Loader + 'static) -> Self {
        self.loaders.register(name, loader);
        self
    }

    pub fn disable_processing(mut self, disable: bool) -> Self {
        self.disable_processing = disable;
        self
    }
}

/// Builds configuration trees from prioritized sources.
///
/// A processor holds no per-load state and can be reused for any number of
/// sequential `load` calls.
#[derive(Debug)]
pub struct Processor {
    config: ProcessorConfig,
}

impl Processor {
    /// Create a processor.
    ///
    /// # Panics
    /// Panics if no loaders are registered.
    pub fn new(config: ProcessorConfig) -> Self {
        assert!(
            !config.loaders.is_empty(),
            "no configuration loaders specified"
        );
        Self { config }
    }

    pub fn loaders(&self) -> &LoaderRegistry {
        &self.config.loaders
    }

    /// Load, merge and process configuration sources.
    ///
    /// Sources are locator strings (`"file:app.yml"`) or inline layers;
    /// later sources take precedence. Returns `Ok(None)` when no source
    /// produced any data.
    ///
    /// # Panics
    /// Panics if `sources` is empty.
    pub fn load<I, S>(&self, sources: I) -> Result<Option<Map<String, Value>>>
    where
        I: IntoIterator<Item = S>,
        S: Into<Source>,
    {
        let sources: Vec<Source> = sources.into_iter().map(Into::into).collect();
        assert!(!sources.is_empty(), "no configuration locators specified");

        let processing = !self.config.disable_processing;
        let layers = self.load_layers(&sources, processing, &mut Vec::new(), &[])?;
        if layers.is_empty() {
            debug!("No configuration data found");
            return Ok(None);
        }

        let mut tree = deep_merge_all(layers);
        if processing {
            tree = Session::new(tree).run()?;
        }

        match tree {
            Value::Object(map) => Ok(Some(map)),
            other => Err(ConfError::invalid_root_type(&other)),
        }
    }

    /// Expand includes and resolve directives in a caller-supplied tree.
    pub fn process(&self, value: Value) -> Result<Value> {
        let value = self.expand_includes(value, &mut Vec::new(), &[])?;
        Session::new(value).run()
    }

    /// Load every source into a list of layers, expanding includes per layer
    /// when `expand` is set. `chain` holds the locators whose layers are
    /// currently being expanded.
    fn load_layers(
        &self,
        sources: &[Source],
        expand: bool,
        chain: &mut Vec<String>,
        path: &[String],
    ) -> Result<Vec<Value>> {
        let mut layers = Vec::new();

        for source in sources {
            match source {
                Source::Inline(layer) => {
                    let layer = if expand {
                        self.expand_includes(layer.clone(), chain, path)?
                    } else {
                        layer.clone()
                    };
                    if !layer.is_null() {
                        layers.push(layer);
                    }
                }
                Source::Locator(raw) => {
                    let locator = Locator::parse(raw).map_err(|e| e.with_path(path))?;
                    let loader = self
                        .config
                        .loaders
                        .get(&locator.loader)
                        .ok_or_else(|| ConfError::unknown_loader(&locator.loader).with_path(path))?;
                    if chain.contains(raw) {
                        return Err(ConfError::include_cycle(raw, chain).with_path(path));
                    }

                    let loaded = loader
                        .load(&locator.value)
                        .map_err(|e| ConfError::loader(e).with_path(path))?;
                    debug!(locator = %locator, layers = loaded.len(), "Loaded configuration layers");

                    chain.push(raw.clone());
                    for layer in loaded {
                        let layer = if expand {
                            self.expand_includes(layer, chain, path)?
                        } else {
                            layer
                        };
                        if !layer.is_null() {
                            layers.push(layer);
                        }
                    }
                    chain.pop();
                }
            }
        }

        Ok(layers)
    }

    /// Replace every map carrying `$include` with the merge of the layers its
    /// locators load.
    fn expand_includes(
        &self,
        value: Value,
        chain: &mut Vec<String>,
        path: &[String],
    ) -> Result<Value> {
        match value {
            Value::Object(map) => {
                if let Some(spec) = map.get(INCLUDE_KEY) {
                    let sources = include_sources(spec, path)?;
                    debug!(path = %path.join("."), sources = sources.len(), "Expanding $include");
                    let layers = self.load_layers(&sources, true, chain, path)?;
                    return Ok(deep_merge_all(layers));
                }

                let mut expanded = Map::with_capacity(map.len());
                for (key, child) in map {
                    let child_path = descend(path, key.as_str());
                    let child = self.expand_includes(child, chain, &child_path)?;
                    expanded.insert(key, child);
                }
                Ok(Value::Object(expanded))
            }
            Value::Array(items) => items
                .into_iter()
                .enumerate()
                .map(|(index, item)| {
                    self.expand_includes(item, chain, &descend(path, index.to_string()))
                })
                .collect::<Result<Vec<_>>>()
                .map(Value::Array),
            other => Ok(other),
        }
    }
}

/// Locators named by an `$include` value: one string or a list of strings.
fn include_sources(spec: &Value, path: &[String]) -> Result<Vec<Source>> {
    match spec {
        Value::String(raw) => Ok(vec![Source::Locator(raw.clone())]),
        Value::Array(items) => items
            .iter()
            .map(|item| match item {
                Value::String(raw) => Ok(Source::Locator(raw.clone())),
                _ => Err(ConfError::malformed_include(path, spec)),
            })
            .collect(),
        _ => Err(ConfError::malformed_include(path, spec)),
    }
}

/// Path of a child node.
fn descend(path: &[String], segment: impl Into<String>) -> Vec<String> {
    let mut child = Vec::with_capacity(path.len() + 1);
    child.extend_from_slice(path);
    child.push(segment.into());
    child
}
