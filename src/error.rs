//! Structured error types for configuration loading and processing.

use serde::Serialize;
use serde_json::Value;

/// Error codes for programmatic error handling.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    // Locator errors
    EmptyLocator,
    MissingLoaderName,
    UnknownLoader,

    // Directive shape errors
    MalformedInclude,
    MalformedRef,
    MalformedUnderlay,
    MalformedOverlay,

    // Reference lookup errors
    InvalidIndex,
    IndexOutOfRange,
    ReferenceCycle,
    IncludeCycle,

    // Result errors
    InvalidRootType,
    DecodeFailed,

    // Raised by a loader implementation
    LoaderFailed,
}

/// Structured error raised while loading or processing a configuration tree.
#[derive(Debug, thiserror::Error)]
#[error("{message}")]
pub struct ConfError {
    pub code: ErrorCode,
    pub message: String,
    /// Breadcrumb of the node being processed, dot-separated.
    pub path: Option<String>,
    pub field: Option<String>,
    #[source]
    source: Option<Box<dyn std::error::Error + Send + Sync + 'static>>,
}

impl ConfError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            path: None,
            field: None,
            source: None,
        }
    }

    /// Attach the breadcrumb of the node being processed. The root (an
    /// empty path) leaves `path` unset.
    pub fn with_path(mut self, path: &[String]) -> Self {
        if !path.is_empty() {
            self.path = Some(path.join("."));
        }
        self
    }

    pub fn with_field(mut self, field: impl Into<String>) -> Self {
        self.field = Some(field.into());
        self
    }

    // Convenience constructors

    pub fn empty_locator() -> Self {
        Self::new(
            ErrorCode::EmptyLocator,
            "empty configuration locator specified",
        )
    }

    pub fn missing_loader_name(raw: &str) -> Self {
        Self::new(
            ErrorCode::MissingLoaderName,
            format!("missing loader name in configuration locator \"{}\"", raw),
        )
    }

    pub fn unknown_loader(name: &str) -> Self {
        Self::new(
            ErrorCode::UnknownLoader,
            format!("unknown loader \"{}\" in configuration locator", name),
        )
    }

    pub fn malformed_include(path: &[String], found: &Value) -> Self {
        Self::new(
            ErrorCode::MalformedInclude,
            format!(
                "$include at \"{}\" must be a locator string or a list of locator strings, got {}",
                path.join("."),
                type_name(found)
            ),
        )
        .with_path(path)
    }

    pub fn include_cycle(locator: &str, chain: &[String]) -> Self {
        Self::new(
            ErrorCode::IncludeCycle,
            format!(
                "configuration locator \"{}\" includes itself: {} -> {}",
                locator,
                chain.join(" -> "),
                locator
            ),
        )
    }

    pub fn malformed_ref(path: &[String], field: &str, reason: &str) -> Self {
        Self::new(
            ErrorCode::MalformedRef,
            format!(
                "invalid $ref at \"{}\": field \"{}\" {}",
                path.join("."),
                field,
                reason
            ),
        )
        .with_path(path)
        .with_field(field)
    }

    pub fn malformed_layering(code: ErrorCode, key: &str, path: &[String], found: &str) -> Self {
        Self::new(
            code,
            format!(
                "{} at \"{}\" must be a section name or a list of section names, got {}",
                key,
                path.join("."),
                found
            ),
        )
        .with_path(path)
        .with_field(key)
    }

    pub fn invalid_index(path: &[String], name: &str, segment: &str) -> Self {
        Self::new(
            ErrorCode::InvalidIndex,
            format!(
                "invalid sequence index \"{}\" in reference \"{}\" at \"{}\"",
                segment,
                name,
                path.join(".")
            ),
        )
        .with_path(path)
    }

    pub fn index_out_of_range(path: &[String], name: &str, index: usize, len: usize) -> Self {
        Self::new(
            ErrorCode::IndexOutOfRange,
            format!(
                "sequence index {} out of range (length {}) in reference \"{}\" at \"{}\"",
                index,
                len,
                name,
                path.join(".")
            ),
        )
        .with_path(path)
    }

    pub fn reference_cycle(path: &[String]) -> Self {
        Self::new(
            ErrorCode::ReferenceCycle,
            format!("reference cycle detected at \"{}\"", path.join(".")),
        )
        .with_path(path)
    }

    pub fn invalid_root_type(found: &Value) -> Self {
        Self::new(
            ErrorCode::InvalidRootType,
            format!(
                "configuration root must be a map, got {}",
                type_name(found)
            ),
        )
    }

    pub fn decode(err: serde_json::Error) -> Self {
        Self {
            source: Some(Box::new(err)),
            ..Self::new(ErrorCode::DecodeFailed, "failed to decode configuration")
        }
    }

    /// Wraps a loader failure, keeping the loader's own message.
    pub fn loader(err: anyhow::Error) -> Self {
        Self {
            message: format!("{:#}", err),
            source: Some(err.into()),
            ..Self::new(ErrorCode::LoaderFailed, String::new())
        }
    }
}

/// Short human name of a value's kind, for error messages.
pub(crate) fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "sequence",
        Value::Object(_) => "map",
    }
}

/// Result type for configuration operations.
pub type Result<T> = std::result::Result<T, ConfError>;
