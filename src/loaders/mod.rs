//! Loader collaborators.
//!
//! A loader turns the opaque value of a locator into zero or more raw
//! configuration layers. Loaders are registered by name in a
//! [`LoaderRegistry`] handed to the processor; the locator `"file:app.yml"`
//! is routed to the loader registered as `file`.

mod env;
mod file;
mod map;

pub use env::EnvLoader;
pub use file::{FileLoader, PATH_ENV_VAR};
pub use map::MapLoader;

use serde_json::Value;
use std::collections::BTreeMap;

/// Source of raw configuration layers.
pub trait Loader: Send + Sync {
    /// Load the layers addressed by `value`.
    ///
    /// Returning no layers means "nothing here" and is not an error. Errors
    /// are reported to the caller of `load` with their message unchanged.
    fn load(&self, value: &str) -> anyhow::Result<Vec<Value>>;
}

/// Named loaders available to a processor.
#[derive(Default)]
pub struct LoaderRegistry {
    loaders: BTreeMap<String, Box<dyn Loader>>,
}

impl LoaderRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a loader, replacing any loader already registered under `name`.
    pub fn register(&mut self, name: impl Into<String>, loader: impl Loader + 'static) {
        self.loaders.insert(name.into(), Box::new(loader));
    }

    /// Builder form of [`register`](Self::register).
    pub fn with_loader(mut self, name: impl Into<String>, loader: impl Loader + 'static) -> Self {
        self.register(name, loader);
        self
    }

    pub fn get(&self, name: &str) -> Option<&dyn Loader> {
        self.loaders.get(name).map(|loader| loader.as_ref())
    }

    /// Registered loader names, sorted.
    pub fn names(&self) -> Vec<&str> {
        self.loaders.keys().map(String::as_str).collect()
    }

    pub fn len(&self) -> usize {
        self.loaders.len()
    }

    pub fn is_empty(&self) -> bool {
        self.loaders.is_empty()
    }
}

impl std::fmt::Debug for LoaderRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoaderRegistry")
            .field("loaders", &self.names())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    struct Fixed(Value);

    impl Loader for Fixed {
        fn load(&self, _value: &str) -> anyhow::Result<Vec<Value>> {
            Ok(vec![self.0.clone()])
        }
    }

    #[test]
    fn test_registry_lookup() {
        let registry = LoaderRegistry::new()
            .with_loader("b", Fixed(json!({"b": 1})))
            .with_loader("a", Fixed(json!({"a": 1})));

        assert_eq!(registry.len(), 2);
        assert_eq!(registry.names(), ["a", "b"]);
        assert!(registry.get("c").is_none());

        let layers = registry.get("a").unwrap().load("").unwrap();
        assert_eq!(layers, vec![json!({"a": 1})]);
    }

    #[test]
    fn test_register_replaces() {
        let mut registry = LoaderRegistry::new();
        registry.register("x", Fixed(json!(1)));
        registry.register("x", Fixed(json!(2)));

        assert_eq!(registry.len(), 1);
        assert_eq!(registry.get("x").unwrap().load("").unwrap(), vec![json!(2)]);
    }
}
