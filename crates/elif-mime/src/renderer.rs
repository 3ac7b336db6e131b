use crate::{
    config::MimeConfig,
    error::EmailError,
    html_to_text::HtmlToText,
    message::{Message, TemplatedEmail},
    templates::{
        TemplateAttachments, TemplateContext, TemplateEngine, WrappedEmail, RESERVED_EMAIL_VAR,
    },
    Body,
};
use std::sync::Arc;
use tracing::{debug, trace};

/// Produces the final bodies of a message
pub trait MessageBodyRenderer: Send + Sync {
    fn render(&self, message: &mut Message) -> Result<(), EmailError>;
}

/// Renders pending text/HTML templates of a message into its bodies.
///
/// Rendering happens at most once per message: templates and context are
/// cleared afterwards, so calling [`BodyRenderer::render`] again is a no-op.
/// When the message ends up without a text body, one is derived from the
/// HTML body.
pub struct BodyRenderer {
    engine: Arc<dyn TemplateEngine>,
    context: TemplateContext,
    converter: HtmlToText,
}

impl BodyRenderer {
    /// Create renderer with a default context shared by every message
    pub fn new(
        engine: Arc<dyn TemplateEngine>,
        context: TemplateContext,
    ) -> Result<Self, EmailError> {
        Ok(Self {
            engine,
            context,
            converter: HtmlToText::detect(&Default::default())?,
        })
    }

    /// Create renderer from configuration
    pub fn from_config(
        engine: Arc<dyn TemplateEngine>,
        config: &MimeConfig,
    ) -> Result<Self, EmailError> {
        Ok(Self {
            engine,
            context: config.default_context.clone(),
            converter: HtmlToText::detect(&config.text_fallback)?,
        })
    }

    /// Replace the HTML to text converter
    pub fn with_converter(mut self, converter: HtmlToText) -> Self {
        self.converter = converter;
        self
    }

    pub fn converter(&self) -> &HtmlToText {
        &self.converter
    }

    /// Render the message bodies in place
    pub fn render(&self, message: &mut Message) -> Result<(), EmailError> {
        match message.as_templated_mut() {
            Some(templated) => self.render_templated(templated),
            None => {
                trace!("Message does not support templates, skipping body rendering");
                Ok(())
            }
        }
    }

    /// Render a templated email in place
    pub fn render_templated(&self, message: &mut TemplatedEmail) -> Result<(), EmailError> {
        if message.is_rendered() {
            trace!("Email {} has already been rendered", message.id);
            return Ok(());
        }

        if message.context.contains_key(RESERVED_EMAIL_VAR) {
            return Err(EmailError::invalid_argument(format!(
                "A \"{}\" context cannot have an \"{}\" entry as this is a reserved variable.",
                std::any::type_name::<TemplatedEmail>(),
                RESERVED_EMAIL_VAR
            )));
        }

        let vars = self.build_context(message)?;
        let attachments = TemplateAttachments::new();

        if let Some(template) = message.text_template.clone() {
            debug!("Rendering text template '{}' for email {}", template, message.id);
            let text = self
                .engine
                .render_with_attachments(&template, &vars, &attachments)?;
            message.email.text_body = Some(Body::Text(text));
            message.email.attachments.extend(attachments.take());
            message.text_template = None;
        }

        if let Some(template) = message.html_template.clone() {
            debug!("Rendering HTML template '{}' for email {}", template, message.id);
            let html = self
                .engine
                .render_with_attachments(&template, &vars, &attachments)?;
            message.email.html_body = Some(Body::Text(html));
            message.email.attachments.extend(attachments.take());
            message.html_template = None;
        }

        message.context.clear();

        self.ensure_text_body(message)
    }

    /// Defaults, then message context, then the reserved `email` entry
    fn build_context(&self, message: &TemplatedEmail) -> Result<TemplateContext, EmailError> {
        let mut vars = self.context.clone();
        vars.extend(
            message
                .context
                .iter()
                .map(|(key, value)| (key.clone(), value.clone())),
        );
        vars.insert(
            RESERVED_EMAIL_VAR.to_string(),
            serde_json::to_value(WrappedEmail::new(&message.email))?,
        );
        Ok(vars)
    }

    /// Derive a text body from the HTML body when the text body is empty
    fn ensure_text_body(&self, message: &mut TemplatedEmail) -> Result<(), EmailError> {
        let has_text = message
            .email
            .text_body
            .as_ref()
            .is_some_and(|body| !body.is_empty());
        if has_text {
            return Ok(());
        }

        let Some(html_body) = message.email.html_body.as_mut() else {
            return Ok(());
        };

        // A stream can only be read once, so the drained HTML replaces it
        let text = self.converter.convert(html_body.materialize()?);
        debug!(
            "Derived text body for email {} using {} conversion",
            message.id,
            self.converter.strategy()
        );

        message.email.text_body = Some(Body::Text(text));
        Ok(())
    }
}

impl MessageBodyRenderer for BodyRenderer {
    fn render(&self, message: &mut Message) -> Result<(), EmailError> {
        BodyRenderer::render(self, message)
    }
}
