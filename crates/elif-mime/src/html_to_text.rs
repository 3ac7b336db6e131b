use crate::{config::TextFallbackConfig, EmailError};
use regex::Regex;
use tracing::debug;

/// HTML to plain text conversion used when a message has no text body.
///
/// The strategy is picked once, at construction. Conversion never fails:
/// malformed markup degrades to best-effort output.
#[derive(Debug, Clone)]
pub enum HtmlToText {
    /// Markdown-like rendition through `html2text`
    #[cfg(feature = "rich-text")]
    Rich(RichConverter),
    /// Regex based tag stripping
    Basic(BasicConverter),
}

impl HtmlToText {
    /// Pick the rich converter when it is compiled in and preferred
    pub fn detect(config: &TextFallbackConfig) -> Result<Self, EmailError> {
        let basic = BasicConverter::new()?;

        if config.prefer_rich {
            if let Some(rich) = Self::rich(config, &basic) {
                debug!("Using rich HTML to text conversion");
                return Ok(rich);
            }
        }

        debug!("Using basic HTML to text conversion");
        Ok(Self::Basic(basic))
    }

    #[cfg(feature = "rich-text")]
    fn rich(config: &TextFallbackConfig, basic: &BasicConverter) -> Option<Self> {
        Some(Self::Rich(RichConverter {
            line_width: config.line_width.max(1),
            basic: basic.clone(),
        }))
    }

    #[cfg(not(feature = "rich-text"))]
    fn rich(_config: &TextFallbackConfig, _basic: &BasicConverter) -> Option<Self> {
        None
    }

    /// Always use the basic converter
    pub fn basic() -> Result<Self, EmailError> {
        Ok(Self::Basic(BasicConverter::new()?))
    }

    /// Convert HTML to plain text
    pub fn convert(&self, html: &str) -> String {
        match self {
            #[cfg(feature = "rich-text")]
            Self::Rich(rich) => rich.convert(html),
            Self::Basic(basic) => basic.convert(html),
        }
    }

    /// Name of the active strategy
    pub fn strategy(&self) -> &'static str {
        match self {
            #[cfg(feature = "rich-text")]
            Self::Rich(_) => "rich",
            Self::Basic(_) => "basic",
        }
    }
}

/// Removes `<head>`/`<style>` elements with their contents, then every tag
#[derive(Debug, Clone)]
pub struct BasicConverter {
    hidden_elements: Regex,
    comments: Regex,
    tags: Regex,
}

impl BasicConverter {
    pub fn new() -> Result<Self, EmailError> {
        let compile = |pattern: &str| {
            Regex::new(pattern).map_err(|e| {
                EmailError::configuration(format!("Invalid HTML to text regex: {}", e))
            })
        };

        Ok(Self {
            // No backreferences in `regex`, so each element gets its own branch
            hidden_elements: compile(r"(?is)<head\b.*?</head\s*>|<style\b.*?</style\s*>")?,
            comments: compile(r"(?s)<!--.*?-->")?,
            tags: compile(r"(?s)<[^>]*>")?,
        })
    }

    /// Remove hidden elements and comments, keeping the remaining markup
    fn strip_hidden(&self, html: &str) -> String {
        let html = self.hidden_elements.replace_all(html, "");
        self.comments.replace_all(&html, "").into_owned()
    }

    pub fn convert(&self, html: &str) -> String {
        let visible = self.strip_hidden(html);
        self.tags.replace_all(&visible, "").into_owned()
    }
}

/// Converts through `html2text` with hard line breaks and no markup left
#[cfg(feature = "rich-text")]
#[derive(Debug, Clone)]
pub struct RichConverter {
    line_width: usize,
    basic: BasicConverter,
}

#[cfg(feature = "rich-text")]
impl RichConverter {
    pub fn convert(&self, html: &str) -> String {
        let visible = self.basic.strip_hidden(html);
        match html2text::from_read(visible.as_bytes(), self.line_width) {
            Ok(text) => text,
            Err(e) => {
                debug!("Rich HTML to text conversion failed, stripping tags: {}", e);
                self.basic.convert(&visible)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAGE: &str = "<html><head><title>t</title></head><body>Hello <b>World</b></body></html>";

    fn assert_plain(text: &str) {
        assert!(text.contains("Hello"), "missing Hello in {:?}", text);
        assert!(text.contains("World"), "missing World in {:?}", text);
        assert!(!text.contains("title"));
        assert!(!text.contains("<b>"));
        assert!(!text.contains("<head>"));
    }

    #[test]
    fn test_basic_strips_head_and_tags() {
        let converter = HtmlToText::basic().unwrap();
        assert_eq!(converter.strategy(), "basic");
        assert_eq!(converter.convert(PAGE), "Hello World");
    }

    #[test]
    fn test_basic_removes_multiline_style_case_insensitive() {
        let converter = HtmlToText::basic().unwrap();
        let html = "<STYLE type=\"text/css\">\np { color: red; }\n</Style><p>Body</p><!-- note -->";
        assert_eq!(converter.convert(html), "Body");
    }

    #[test]
    fn test_basic_degrades_on_malformed_markup() {
        let converter = HtmlToText::basic().unwrap();
        assert_eq!(converter.convert("<p>open <b>never closed"), "open never closed");
        assert_eq!(converter.convert("plain text"), "plain text");
        assert_eq!(converter.convert(""), "");
    }

    #[test]
    fn test_detect_honours_preference() {
        let config = TextFallbackConfig {
            prefer_rich: false,
            ..TextFallbackConfig::default()
        };
        assert_eq!(HtmlToText::detect(&config).unwrap().strategy(), "basic");
    }

    #[test]
    fn test_detected_strategy_produces_plain_text() {
        let converter = HtmlToText::detect(&TextFallbackConfig::default()).unwrap();
        assert_plain(&converter.convert(PAGE));
    }

    #[cfg(feature = "rich-text")]
    #[test]
    fn test_rich_is_detected_by_default() {
        let converter = HtmlToText::detect(&TextFallbackConfig::default()).unwrap();
        assert_eq!(converter.strategy(), "rich");
    }

    #[cfg(feature = "rich-text")]
    #[test]
    fn test_rich_keeps_line_breaks_and_drops_style() {
        let converter = HtmlToText::detect(&TextFallbackConfig::default()).unwrap();
        let text = converter.convert(
            "<style>.x { color: red; }</style><p>first line<br>second line</p>",
        );

        assert!(!text.contains("color"));
        assert!(!text.contains('<'));
        let lines: Vec<&str> = text.lines().map(str::trim).collect();
        assert!(lines.contains(&"first line"), "got {:?}", text);
        assert!(lines.contains(&"second line"), "got {:?}", text);
    }
}
