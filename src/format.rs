//! Output formatting for processed configuration trees.

use anyhow::{Context, Result};
use clap::ValueEnum;
use serde_json::Value;

/// Output format for a printed configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum OutputFormat {
    /// Pretty-printed JSON (default)
    #[default]
    Json,
    /// YAML document
    Yaml,
}

impl OutputFormat {
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "json" => Some(OutputFormat::Json),
            "yaml" | "yml" => Some(OutputFormat::Yaml),
            _ => None,
        }
    }

    /// Render a tree in this format.
    pub fn render(self, value: &Value) -> Result<String> {
        match self {
            OutputFormat::Json => {
                serde_json::to_string_pretty(value).context("failed to render JSON")
            }
            OutputFormat::Yaml => serde_yaml::to_string(value).context("failed to render YAML"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_from_str() {
        assert_eq!(OutputFormat::from_str("JSON"), Some(OutputFormat::Json));
        assert_eq!(OutputFormat::from_str("yml"), Some(OutputFormat::Yaml));
        assert_eq!(OutputFormat::from_str("xml"), None);
    }

    #[test]
    fn test_render_keeps_key_order() {
        let value = json!({"zeta": 1, "alpha": {"b": true}});

        let json_out = OutputFormat::Json.render(&value).unwrap();
        assert!(json_out.find("zeta").unwrap() < json_out.find("alpha").unwrap());

        let yaml_out = OutputFormat::Yaml.render(&value).unwrap();
        assert_eq!(yaml_out, "zeta: 1\nalpha:\n  b: true\n");
    }
}
