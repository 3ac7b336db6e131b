pub mod engine;
pub mod wrapped;

pub use engine::*;
pub use wrapped::*;

use crate::{Attachment, EmailError};
use serde::Serialize;
use std::{
    collections::HashMap,
    sync::{Arc, Mutex, MutexGuard, PoisonError},
};

/// Template context for rendering emails
pub type TemplateContext = HashMap<String, serde_json::Value>;

/// Variable name bound to the message being rendered
pub const RESERVED_EMAIL_VAR: &str = "email";

/// Capability to render a named template with a set of variables.
///
/// Errors from the engine are returned as [`EmailError::Template`] holding
/// the engine's own error value.
pub trait TemplateEngine: Send + Sync {
    /// Render the template registered under `template`
    fn render(&self, template: &str, context: &TemplateContext) -> Result<String, EmailError>;

    /// Render while letting the template add files to the message.
    ///
    /// Engines without such helpers render normally and add nothing.
    fn render_with_attachments(
        &self,
        template: &str,
        context: &TemplateContext,
        _attachments: &TemplateAttachments,
    ) -> Result<String, EmailError> {
        self.render(template, context)
    }
}

/// Attachments requested by templates during one render pass
#[derive(Debug, Clone, Default)]
pub struct TemplateAttachments {
    inner: Arc<Mutex<PendingAttachments>>,
}

#[derive(Debug, Default)]
struct PendingAttachments {
    attachments: Vec<Attachment>,
    /// Embedded asset path to content id, kept for the whole pass
    images: HashMap<String, String>,
}

impl TemplateAttachments {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, PendingAttachments> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Content id of an image already embedded from `path` in this pass
    pub fn image_content_id(&self, path: &str) -> Option<String> {
        self.lock().images.get(path).cloned()
    }

    /// Queue an inline image embedded from `path`
    pub fn embed(&self, path: impl Into<String>, attachment: Attachment) {
        let mut pending = self.lock();
        if let Some(cid) = &attachment.content_id {
            pending.images.insert(path.into(), cid.clone());
        }
        pending.attachments.push(attachment);
    }

    /// Queue a regular attachment
    pub fn attach(&self, attachment: Attachment) {
        self.lock().attachments.push(attachment);
    }

    /// Hand over queued attachments, keeping the embedded image ids
    pub fn take(&self) -> Vec<Attachment> {
        std::mem::take(&mut self.lock().attachments)
    }
}

/// Helper trait for serializable contexts
pub trait IntoTemplateContext {
    fn into_context(self) -> Result<TemplateContext, EmailError>;
}

impl<T: Serialize> IntoTemplateContext for T {
    fn into_context(self) -> Result<TemplateContext, EmailError> {
        let value = serde_json::to_value(self)?;
        match value {
            serde_json::Value::Object(map) => Ok(map.into_iter().collect()),
            _ => {
                let mut context = TemplateContext::new();
                context.insert("data".to_string(), value);
                Ok(context)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[derive(Serialize)]
    struct Welcome {
        name: String,
        plan: &'static str,
    }

    #[test]
    fn test_struct_into_context() {
        let context = Welcome {
            name: "Ada".to_string(),
            plan: "pro",
        }
        .into_context()
        .unwrap();

        assert_eq!(context.get("name"), Some(&json!("Ada")));
        assert_eq!(context.get("plan"), Some(&json!("pro")));
    }

    #[test]
    fn test_embedded_images_are_remembered_after_take() {
        let attachments = TemplateAttachments::new();
        attachments.embed("img/logo.png", Attachment::inline("logo.png", vec![1], "logo@elif"));
        attachments.attach(Attachment::new("terms.pdf", vec![2]));

        let taken = attachments.take();
        assert_eq!(taken.len(), 2);
        assert!(attachments.take().is_empty());
        assert_eq!(
            attachments.image_content_id("img/logo.png").as_deref(),
            Some("logo@elif")
        );
        assert_eq!(attachments.image_content_id("logo.png"), None);
    }

    #[test]
    fn test_scalar_into_context_is_wrapped() {
        let context = 42.into_context().unwrap();
        assert_eq!(context.get("data"), Some(&json!(42)));
    }
}
