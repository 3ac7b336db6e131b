//! # elif-mime
//!
//! Templated email body rendering for elif.rs.
//!
//! ## Features
//!
//! - Text and HTML bodies rendered from named templates (Tera by default)
//! - Renderer-wide default context merged with per-message context
//! - Reserved `email` template variable exposing the message being rendered
//! - Guaranteed plain-text alternative derived from the HTML body
//! - Optional rich HTML-to-text conversion (`rich-text` feature)

pub mod config;
pub mod error;
pub mod html_to_text;
pub mod message;
pub mod renderer;
pub mod templates;

pub use config::*;
pub use error::*;
pub use html_to_text::*;
pub use message::*;
pub use renderer::*;
pub use templates::*;

use std::collections::HashMap;
use std::fmt;
use std::io::Read;
use uuid::Uuid;

/// Core email message structure
#[derive(Debug)]
pub struct Email {
    /// Unique identifier for tracing
    pub id: Uuid,
    /// Sender email address
    pub from: String,
    /// Recipient email addresses
    pub to: Vec<String>,
    /// CC recipients
    pub cc: Option<Vec<String>>,
    /// BCC recipients
    pub bcc: Option<Vec<String>>,
    /// Reply-to address
    pub reply_to: Option<String>,
    /// Email subject
    pub subject: String,
    /// HTML body content
    pub html_body: Option<Body>,
    /// Plain text body content
    pub text_body: Option<Body>,
    /// Email attachments
    pub attachments: Vec<Attachment>,
    /// Email headers
    pub headers: HashMap<String, String>,
}

/// Body content, either materialized or still to be read
pub enum Body {
    /// Materialized string content
    Text(String),
    /// Readable source, drained on first use
    Stream(Box<dyn Read + Send>),
}

impl Body {
    /// Create a body backed by a reader
    pub fn stream(reader: impl Read + Send + 'static) -> Self {
        Self::Stream(Box::new(reader))
    }

    /// Borrow the content if it is already materialized
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Text(text) => Some(text),
            Self::Stream(_) => None,
        }
    }

    /// Only an empty string counts as empty; a stream is assumed to have content.
    pub fn is_empty(&self) -> bool {
        matches!(self, Self::Text(text) if text.is_empty())
    }

    /// Read a stream body fully and keep the result in place of the stream.
    ///
    /// Invalid UTF-8 is replaced rather than rejected. When reading fails the
    /// bytes read so far are kept and the error is returned.
    pub fn materialize(&mut self) -> Result<&str, EmailError> {
        if let Self::Stream(reader) = self {
            let mut buf = Vec::new();
            let read = reader.read_to_end(&mut buf);
            *self = Self::Text(String::from_utf8_lossy(&buf).into_owned());
            read?;
        }

        Ok(self.as_str().unwrap_or_default())
    }
}

impl fmt::Debug for Body {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Text(text) => f.debug_tuple("Text").field(text).finish(),
            Self::Stream(_) => f.debug_tuple("Stream").field(&"..").finish(),
        }
    }
}

impl From<String> for Body {
    fn from(text: String) -> Self {
        Self::Text(text)
    }
}

impl From<&str> for Body {
    fn from(text: &str) -> Self {
        Self::Text(text.to_string())
    }
}

/// Email attachment
#[derive(Debug, Clone)]
pub struct Attachment {
    /// Filename
    pub filename: String,
    /// MIME content type
    pub content_type: String,
    /// Binary content
    pub content: Vec<u8>,
    /// Inline attachment ID for embedding in HTML
    pub content_id: Option<String>,
    /// Attachment disposition (attachment or inline)
    pub disposition: AttachmentDisposition,
}

/// Attachment disposition type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AttachmentDisposition {
    /// Regular file attachment
    #[default]
    Attachment,
    /// Inline attachment (e.g., embedded image)
    Inline,
}

impl Email {
    /// Create a new email
    pub fn new() -> Self {
        Self {
            id: Uuid::new_v4(),
            from: String::new(),
            to: Vec::new(),
            cc: None,
            bcc: None,
            reply_to: None,
            subject: String::new(),
            html_body: None,
            text_body: None,
            attachments: Vec::new(),
            headers: HashMap::new(),
        }
    }

    /// Set sender
    pub fn from(mut self, from: impl Into<String>) -> Self {
        self.from = from.into();
        self
    }

    /// Add recipient
    pub fn to(mut self, to: impl Into<String>) -> Self {
        self.to.push(to.into());
        self
    }

    /// Add CC recipient
    pub fn cc(mut self, cc: impl Into<String>) -> Self {
        self.cc.get_or_insert_with(Vec::new).push(cc.into());
        self
    }

    /// Add BCC recipient
    pub fn bcc(mut self, bcc: impl Into<String>) -> Self {
        self.bcc.get_or_insert_with(Vec::new).push(bcc.into());
        self
    }

    /// Set reply-to address
    pub fn reply_to(mut self, reply_to: impl Into<String>) -> Self {
        self.reply_to = Some(reply_to.into());
        self
    }

    /// Set subject
    pub fn subject(mut self, subject: impl Into<String>) -> Self {
        self.subject = subject.into();
        self
    }

    /// Set HTML body
    pub fn html_body(mut self, html: impl Into<Body>) -> Self {
        self.html_body = Some(html.into());
        self
    }

    /// Set text body
    pub fn text_body(mut self, text: impl Into<Body>) -> Self {
        self.text_body = Some(text.into());
        self
    }

    /// Add a header
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    /// Add attachment
    pub fn attach(mut self, attachment: Attachment) -> Self {
        self.attachments.push(attachment);
        self
    }

    /// Look up a header value, ignoring case of the name
    pub fn get_header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    /// Get all inline attachments (for HTML embedding)
    pub fn inline_attachments(&self) -> Vec<&Attachment> {
        self.attachments
            .iter()
            .filter(|a| a.disposition == AttachmentDisposition::Inline)
            .collect()
    }

    /// Materialized text body, if any
    pub fn text(&self) -> Option<&str> {
        self.text_body.as_ref().and_then(Body::as_str)
    }

    /// Materialized HTML body, if any
    pub fn html(&self) -> Option<&str> {
        self.html_body.as_ref().and_then(Body::as_str)
    }
}

impl Default for Email {
    fn default() -> Self {
        Self::new()
    }
}

impl Attachment {
    /// Create a new attachment with automatic MIME type detection
    pub fn new(filename: impl Into<String>, content: Vec<u8>) -> Self {
        let filename = filename.into();
        let content_type = mime_guess::from_path(&filename)
            .first()
            .map(|m| m.to_string())
            .unwrap_or_else(|| "application/octet-stream".to_string());

        Self {
            filename,
            content_type,
            content,
            content_id: None,
            disposition: AttachmentDisposition::Attachment,
        }
    }

    /// Create a new inline attachment (for embedding in HTML)
    pub fn inline(
        filename: impl Into<String>,
        content: Vec<u8>,
        content_id: impl Into<String>,
    ) -> Self {
        Self::new(filename, content).as_inline(content_id)
    }

    /// Set custom content type
    pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = content_type.into();
        self
    }

    /// Set as inline attachment
    pub fn as_inline(mut self, content_id: impl Into<String>) -> Self {
        self.disposition = AttachmentDisposition::Inline;
        self.content_id = Some(content_id.into());
        self
    }

    /// Check if attachment is an image
    pub fn is_image(&self) -> bool {
        self.content_type.starts_with("image/")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn test_body_emptiness() {
        assert!(Body::from("").is_empty());
        assert!(!Body::from("hi").is_empty());
        assert!(!Body::stream(Cursor::new(Vec::new())).is_empty());
    }

    struct BrokenPipe {
        sent: bool,
    }

    impl Read for BrokenPipe {
        fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
            if self.sent {
                return Err(std::io::Error::new(std::io::ErrorKind::BrokenPipe, "gone"));
            }
            self.sent = true;
            let chunk = b"<p>par";
            buf[..chunk.len()].copy_from_slice(chunk);
            Ok(chunk.len())
        }
    }

    #[test]
    fn test_stream_body_is_drained() {
        let mut body = Body::stream(Cursor::new(b"<p>streamed</p>".to_vec()));
        assert_eq!(body.as_str(), None);
        assert_eq!(body.materialize().unwrap(), "<p>streamed</p>");
        assert_eq!(body.as_str(), Some("<p>streamed</p>"));
    }

    #[test]
    fn test_failed_stream_keeps_partial_content() {
        let mut body = Body::stream(BrokenPipe { sent: false });
        let err = body.materialize().unwrap_err();
        assert!(matches!(err, EmailError::Io { .. }));
        assert_eq!(body.as_str(), Some("<p>par"));
    }

    #[test]
    fn test_header_lookup_is_case_insensitive() {
        let email = Email::new().header("X-Campaign", "spring");
        assert_eq!(email.get_header("x-campaign"), Some("spring"));
        assert_eq!(email.get_header("X-Other"), None);
    }

    #[test]
    fn test_inline_attachment() {
        let attachment = Attachment::inline("logo.png", vec![1, 2, 3], "logo");
        assert!(attachment.is_image());
        assert_eq!(attachment.content_type, "image/png");
        assert_eq!(attachment.content_id.as_deref(), Some("logo"));

        let raw = Attachment::new("logo.bin", vec![1]).with_content_type("image/svg+xml");
        assert!(raw.is_image());
        assert_eq!(raw.disposition, AttachmentDisposition::Attachment);

        let email = Email::new()
            .attach(attachment)
            .attach(Attachment::new("report.pdf", vec![0]));
        assert_eq!(email.inline_attachments().len(), 1);
    }
}
