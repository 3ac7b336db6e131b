use crate::{templates::TemplateContext, Body, Email};
use serde::Serialize;
use std::ops::{Deref, DerefMut};

/// Name of a template resolvable by the template engine
pub type TemplateRef = String;

/// Email whose bodies are produced from templates
#[derive(Debug, Default)]
pub struct TemplatedEmail {
    /// Underlying email
    pub email: Email,
    /// Template for the plain text body
    pub text_template: Option<TemplateRef>,
    /// Template for the HTML body
    pub html_template: Option<TemplateRef>,
    /// Variables for this message; `email` is reserved
    pub context: TemplateContext,
}

impl TemplatedEmail {
    /// Create a new templated email
    pub fn new() -> Self {
        Self::default()
    }

    /// Wrap an existing email
    pub fn from_email(email: Email) -> Self {
        Self {
            email,
            ..Self::default()
        }
    }

    /// Set text template
    pub fn text_template(mut self, template: impl Into<TemplateRef>) -> Self {
        self.text_template = Some(template.into());
        self
    }

    /// Set HTML template
    pub fn html_template(mut self, template: impl Into<TemplateRef>) -> Self {
        self.html_template = Some(template.into());
        self
    }

    /// Replace the whole context
    pub fn context(mut self, context: TemplateContext) -> Self {
        self.context = context;
        self
    }

    /// Add a single context variable
    pub fn with(
        mut self,
        key: impl Into<String>,
        value: impl Serialize,
    ) -> Result<Self, crate::EmailError> {
        self.context.insert(key.into(), serde_json::to_value(value)?);
        Ok(self)
    }

    /// Set text body directly
    pub fn text_body(mut self, text: impl Into<Body>) -> Self {
        self.email.text_body = Some(text.into());
        self
    }

    /// Set HTML body directly
    pub fn html_body(mut self, html: impl Into<Body>) -> Self {
        self.email.html_body = Some(html.into());
        self
    }

    /// Apply a builder step to the underlying email
    pub fn map_email(mut self, f: impl FnOnce(Email) -> Email) -> Self {
        self.email = f(std::mem::take(&mut self.email));
        self
    }

    /// True once both templates have been rendered (or none were set)
    pub fn is_rendered(&self) -> bool {
        self.text_template.is_none() && self.html_template.is_none()
    }

    /// Consume into the underlying email
    pub fn into_email(self) -> Email {
        self.email
    }
}

impl Deref for TemplatedEmail {
    type Target = Email;

    fn deref(&self) -> &Email {
        &self.email
    }
}

impl DerefMut for TemplatedEmail {
    fn deref_mut(&mut self) -> &mut Email {
        &mut self.email
    }
}

/// A message handed to the body renderer
#[derive(Debug)]
pub enum Message {
    /// Plain email, bodies set directly
    Email(Email),
    /// Email with pending templates
    Templated(TemplatedEmail),
}

impl Message {
    /// Templated view of the message, if it supports templates
    pub fn as_templated_mut(&mut self) -> Option<&mut TemplatedEmail> {
        match self {
            Self::Templated(templated) => Some(templated),
            Self::Email(_) => None,
        }
    }

    pub fn email(&self) -> &Email {
        match self {
            Self::Email(email) => email,
            Self::Templated(templated) => &templated.email,
        }
    }

    pub fn email_mut(&mut self) -> &mut Email {
        match self {
            Self::Email(email) => email,
            Self::Templated(templated) => &mut templated.email,
        }
    }

    pub fn into_email(self) -> Email {
        match self {
            Self::Email(email) => email,
            Self::Templated(templated) => templated.email,
        }
    }
}

impl From<Email> for Message {
    fn from(email: Email) -> Self {
        Self::Email(email)
    }
}

impl From<TemplatedEmail> for Message {
    fn from(templated: TemplatedEmail) -> Self {
        Self::Templated(templated)
    }
}
