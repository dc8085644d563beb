//! File loader.
//!
//! The locator value is a glob pattern resolved against each search
//! directory in turn. Every matching file is parsed according to its
//! extension and contributes one layer:
//!
//! ```text
//! file:app.yml
//! file:conf.d/*.json
//! ```
//!
//! Supported extensions: `yml`, `yaml`, `json`, `toml`.

use super::Loader;
use anyhow::{Context, Result, bail};
use serde_json::Value;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Environment variable listing search directories, `:`-separated.
pub const PATH_ENV_VAR: &str = "LAYERCONF_PATH";

/// Loads configuration layers from YAML, JSON and TOML files.
#[derive(Debug, Clone)]
pub struct FileLoader {
    dirs: Vec<PathBuf>,
}

impl Default for FileLoader {
    fn default() -> Self {
        Self::from_env()
    }
}

impl FileLoader {
    /// Create a loader searching the given directories, in order.
    pub fn new<I, P>(dirs: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        Self {
            dirs: dirs.into_iter().map(Into::into).collect(),
        }
    }

    /// Search directories from `LAYERCONF_PATH`, or the working directory.
    pub fn from_env() -> Self {
        match std::env::var(PATH_ENV_VAR) {
            Ok(raw) if !raw.is_empty() => {
                Self::new(raw.split(':').filter(|dir| !dir.is_empty()))
            }
            _ => Self::new(["."]),
        }
    }

    pub fn dirs(&self) -> &[PathBuf] {
        &self.dirs
    }

    fn matches(&self, pattern: &str) -> Result<Vec<PathBuf>> {
        let mut paths = Vec::new();

        for dir in &self.dirs {
            let full = dir.join(pattern);
            let full = full.to_string_lossy();
            let mut found: Vec<PathBuf> = glob::glob(&full)
                .with_context(|| format!("file: invalid pattern \"{}\"", pattern))?
                .collect::<std::result::Result<Vec<_>, _>>()
                .with_context(|| format!("file: failed to read matches for \"{}\"", full))?;
            found.sort();
            paths.extend(found);
        }

        Ok(paths)
    }
}

impl Loader for FileLoader {
    fn load(&self, value: &str) -> Result<Vec<Value>> {
        let paths = self.matches(value)?;
        if paths.is_empty() {
            warn!(pattern = %value, dirs = ?self.dirs, "No configuration files matched");
        }

        let mut layers = Vec::with_capacity(paths.len());
        for path in paths {
            if path.is_dir() {
                continue;
            }
            debug!(path = %path.display(), "Parsing configuration file");
            let layer = parse_file(&path)?;
            if !layer.is_null() {
                layers.push(layer);
            }
        }

        Ok(layers)
    }
}

fn parse_file(path: &Path) -> Result<Value> {
    let Some(ext) = path.extension().and_then(|ext| ext.to_str()) else {
        bail!("file: file extension not specified: {}", path.display());
    };

    let content = std::fs::read_to_string(path)
        .with_context(|| format!("file: failed to read {}", path.display()))?;

    let value = match ext {
        "yml" | "yaml" => serde_yaml::from_str::<Option<Value>>(&content)
            .map(Option::unwrap_or_default)
            .with_context(|| format!("file: invalid YAML in {}", path.display()))?,
        "json" => serde_json::from_str::<Value>(&content)
            .with_context(|| format!("file: invalid JSON in {}", path.display()))?,
        "toml" => toml::from_str::<Value>(&content)
            .with_context(|| format!("file: invalid TOML in {}", path.display()))?,
        other => bail!("file: unknown file extension .{}: {}", other, path.display()),
    };

    Ok(value)
}
