//! Layered configuration loading.
//!
//! Configuration is assembled from prioritized sources addressed by locators
//! (`"loader:value"`), merged in order and processed for `$include`, `$ref`,
//! `$underlay`, `$overlay` and `${name}` directives. See [`processor`] for an
//! example.

pub mod cli;
pub mod decode;
pub mod error;
pub mod format;
pub mod loaders;
pub mod locator;
pub mod merge;
pub mod processor;
mod tree;

pub use decode::{decode, decode_section};
pub use error::{ConfError, ErrorCode, Result};
pub use loaders::{EnvLoader, FileLoader, Loader, LoaderRegistry, MapLoader};
pub use locator::{Locator, Source};
pub use processor::{Processor, ProcessorConfig};
