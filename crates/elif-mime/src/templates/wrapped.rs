use crate::{AttachmentDisposition, Email};
use serde::Serialize;
use std::collections::HashMap;

/// Read-only view of the message exposed to templates as `email`.
///
/// Built fresh for every render call. `images` only lists attachments that
/// were on the message before rendering; see [`crate::TeraEngine`] for
/// embedding new files from a template.
///
/// ```text
/// Hello {{ email.to_name }},
/// <img src="{{ email.images["logo.png"] }}">
/// {{ email.headers["X-Campaign"] }}
/// ```
#[derive(Debug, Clone, Serialize)]
pub struct WrappedEmail {
    pub subject: String,
    pub from: String,
    pub to: Vec<String>,
    /// Display name of the first recipient, or its address when it has none
    pub to_name: String,
    pub cc: Vec<String>,
    pub bcc: Vec<String>,
    pub reply_to: Option<String>,
    pub headers: HashMap<String, String>,
    /// Inline attachment filename to `cid:` URL
    pub images: HashMap<String, String>,
    /// Filenames of regular attachments
    pub attachments: Vec<String>,
}

impl WrappedEmail {
    pub fn new(email: &Email) -> Self {
        let mut images = HashMap::new();
        let mut attachments = Vec::new();
        for attachment in &email.attachments {
            match (attachment.disposition, &attachment.content_id) {
                (AttachmentDisposition::Inline, Some(cid)) => {
                    images.insert(attachment.filename.clone(), format!("cid:{}", cid));
                }
                _ => attachments.push(attachment.filename.clone()),
            }
        }

        Self {
            subject: email.subject.clone(),
            from: email.from.clone(),
            to: email.to.clone(),
            to_name: email.to.first().map(|to| display_name(to)).unwrap_or_default(),
            cc: email.cc.clone().unwrap_or_default(),
            bcc: email.bcc.clone().unwrap_or_default(),
            reply_to: email.reply_to.clone(),
            headers: email.headers.clone(),
            images,
            attachments,
        }
    }
}

/// `"Ada Lovelace <ada@example.com>"` -> `"Ada Lovelace"`
fn display_name(address: &str) -> String {
    match address.split_once('<') {
        Some((name, _)) if !name.trim().is_empty() => name.trim().trim_matches('"').to_string(),
        Some((_, rest)) => rest.trim_end_matches('>').trim().to_string(),
        None => address.trim().to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Attachment;

    #[test]
    fn test_to_name() {
        assert_eq!(display_name("\"Ada Lovelace\" <ada@example.com>"), "Ada Lovelace");
        assert_eq!(display_name("Ada <ada@example.com>"), "Ada");
        assert_eq!(display_name("<ada@example.com>"), "ada@example.com");
        assert_eq!(display_name("ada@example.com"), "ada@example.com");
    }

    #[test]
    fn test_wrapped_email_exposes_message() {
        let email = Email::new()
            .from("noreply@example.com")
            .to("Ada <ada@example.com>")
            .cc("ops@example.com")
            .subject("Welcome")
            .header("X-Campaign", "spring")
            .attach(Attachment::inline("logo.png", vec![0], "logo-1"))
            .attach(Attachment::new("terms.pdf", vec![0]));

        let wrapped = WrappedEmail::new(&email);
        assert_eq!(wrapped.to_name, "Ada");
        assert_eq!(wrapped.subject, "Welcome");
        assert_eq!(wrapped.cc, vec!["ops@example.com".to_string()]);
        assert!(wrapped.bcc.is_empty());
        assert_eq!(wrapped.headers["X-Campaign"], "spring");
        assert_eq!(wrapped.images["logo.png"], "cid:logo-1");
        assert_eq!(wrapped.attachments, vec!["terms.pdf".to_string()]);
    }
}
