use crate::{templates::TemplateContext, EmailError};
use serde::{Deserialize, Serialize};
use std::{fs, path::Path};

/// Body rendering configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct MimeConfig {
    /// Template configuration
    pub templates: TemplateConfig,
    /// Plain text fallback configuration
    pub text_fallback: TextFallbackConfig,
    /// Variables available to every template; message context overrides them
    pub default_context: TemplateContext,
}

/// Template system configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TemplateConfig {
    /// Templates directory path
    pub templates_dir: String,
    /// File suffixes loaded as templates
    pub template_extensions: Vec<String>,
    /// Escape variables in `.html`, `.htm` and `.xml` templates
    pub autoescape: bool,
    /// Root for files embedded or attached by templates; defaults to `templates_dir`
    pub assets_dir: Option<String>,
}

/// HTML to plain text fallback configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TextFallbackConfig {
    /// Use the rich converter when it is compiled in
    pub prefer_rich: bool,
    /// Wrap width for the rich converter
    pub line_width: usize,
}

impl MimeConfig {
    /// Parse configuration from a JSON document
    pub fn from_json_str(json: &str) -> Result<Self, EmailError> {
        serde_json::from_str(json)
            .map_err(|e| EmailError::configuration(format!("Invalid configuration: {}", e)))
    }

    /// Load configuration from a JSON file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, EmailError> {
        let content = fs::read_to_string(path)?;
        Self::from_json_str(&content)
    }
}

impl Default for TemplateConfig {
    fn default() -> Self {
        Self {
            templates_dir: "templates/emails".to_string(),
            template_extensions: vec![".html".to_string(), ".txt".to_string()],
            autoescape: true,
            assets_dir: None,
        }
    }
}

impl Default for TextFallbackConfig {
    fn default() -> Self {
        Self {
            prefer_rich: true,
            line_width: 78,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = MimeConfig::default();
        assert_eq!(config.templates.templates_dir, "templates/emails");
        assert!(config.templates.autoescape);
        assert!(config.text_fallback.prefer_rich);
        assert_eq!(config.text_fallback.line_width, 78);
        assert!(config.default_context.is_empty());
    }

    #[test]
    fn test_partial_json_keeps_defaults() {
        let config = MimeConfig::from_json_str(
            r#"{
                "templates": { "templates_dir": "mail" },
                "default_context": { "app_name": "elif", "year": 2024 }
            }"#,
        )
        .unwrap();

        assert_eq!(config.templates.templates_dir, "mail");
        assert_eq!(config.templates.template_extensions, vec![".html", ".txt"]);
        assert_eq!(config.templates.assets_dir, None);
        assert_eq!(config.default_context["app_name"], json!("elif"));
        assert_eq!(config.default_context["year"], json!(2024));
        assert!(config.text_fallback.prefer_rich);
    }

    #[test]
    fn test_invalid_json_is_configuration_error() {
        let err = MimeConfig::from_json_str("{ not json").unwrap_err();
        assert!(matches!(err, EmailError::Configuration { .. }));
    }

    #[test]
    fn test_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{ "text_fallback": {{ "prefer_rich": false }} }}"#).unwrap();

        let config = MimeConfig::from_file(file.path()).unwrap();
        assert!(!config.text_fallback.prefer_rich);
        assert_eq!(config.text_fallback.line_width, 78);
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let err = MimeConfig::from_file("does/not/exist.json").unwrap_err();
        assert!(matches!(err, EmailError::Io { .. }));
    }
}
