//! Outbound email.

use std::ops::Deref;
use std::sync::Arc;

use aws_sdk_sesv2::{
    primitives::Blob,
    types::{Destination, EmailContent, RawMessage},
    Client as SesClient,
};
use data_encoding::{BASE64, BASE64_MIME};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum MailError {
    #[error("Failed to build message: {0}")]
    Build(String),
    #[error("Mail provider rejected message: {0}")]
    Send(String),
}

/// A file attached to an outgoing email.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attachment {
    pub filename: String,
    pub content_type: String,
    pub content: Vec<u8>,
}

/// An email ready to hand to a [`Mailer`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutgoingMail {
    /// Full `From` header value, e.g. `"Festival" <festival@example.com>`.
    pub from: String,
    pub to: String,
    pub subject: String,
    pub text: String,
    pub attachments: Vec<Attachment>,
}

impl OutgoingMail {
    /// Render as a `multipart/mixed` MIME document with CRLF line endings.
    ///
    /// Fails if any header value contains a control character, since a line
    /// break there would start a new header.
    pub fn to_mime(&self, boundary: &str) -> Result<String, MailError> {
        check_header("From", &self.from)?;
        check_header("To", &self.to)?;
        check_header("Subject", &self.subject)?;

        let mut mime = String::new();
        mime.push_str(&format!("From: {}\r\n", self.from));
        mime.push_str(&format!("To: {}\r\n", self.to));
        mime.push_str(&format!("Subject: {}\r\n", encode_header(&self.subject)));
        mime.push_str("MIME-Version: 1.0\r\n");
        mime.push_str(&format!(
            "Content-Type: multipart/mixed; boundary=\"{boundary}\"\r\n\r\n"
        ));

        mime.push_str(&format!("--{boundary}\r\n"));
        mime.push_str("Content-Type: text/plain; charset=UTF-8\r\n");
        mime.push_str("Content-Transfer-Encoding: base64\r\n\r\n");
        mime.push_str(&BASE64_MIME.encode(self.text.as_bytes()));

        for attachment in &self.attachments {
            check_header("Content-Type", &attachment.content_type)?;
            check_header("filename", &attachment.filename)?;
            let filename = encode_parameter(&attachment.filename);
            mime.push_str(&format!("--{boundary}\r\n"));
            mime.push_str(&format!(
                "Content-Type: {}; name*={filename}\r\n",
                attachment.content_type
            ));
            mime.push_str(&format!(
                "Content-Disposition: attachment; filename*={filename}\r\n"
            ));
            mime.push_str("Content-Transfer-Encoding: base64\r\n\r\n");
            mime.push_str(&BASE64_MIME.encode(&attachment.content));
        }

        mime.push_str(&format!("--{boundary}--\r\n"));
        Ok(mime)
    }
}

fn check_header(name: &str, value: &str) -> Result<(), MailError> {
    if value.chars().any(char::is_control) {
        return Err(MailError::Build(format!(
            "{name} contains a control character"
        )));
    }
    Ok(())
}

/// RFC 2047-encode a header value if it is not plain ASCII.
fn encode_header(value: &str) -> String {
    if value.is_ascii() {
        value.to_string()
    } else {
        format!("=?UTF-8?B?{}?=", BASE64.encode(value.as_bytes()))
    }
}

/// RFC 2231-encode a header parameter value, e.g. `UTF-8''caf%C3%A9.pdf`.
fn encode_parameter(value: &str) -> String {
    let mut encoded = String::from("UTF-8''");
    for byte in value.bytes() {
        if byte.is_ascii_alphanumeric() || b"!#$&+-.^_`|~".contains(&byte) {
            encoded.push(byte as char);
        } else {
            encoded.push_str(&format!("%{byte:02X}"));
        }
    }
    encoded
}

/// Something that can deliver email.
#[rocket::async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, mail: OutgoingMail) -> Result<(), MailError>;
}

/// Shared handle on the configured mailer, kept in managed state.
#[derive(Clone)]
pub struct Outbox(Arc<dyn Mailer>);

impl Outbox {
    pub fn new(mailer: impl Mailer + 'static) -> Self {
        Self(Arc::new(mailer))
    }
}

impl Deref for Outbox {
    type Target = dyn Mailer;

    fn deref(&self) -> &Self::Target {
        &*self.0
    }
}

/// Sends raw MIME messages through Amazon SES.
pub struct SesMailer {
    client: SesClient,
}

impl SesMailer {
    pub fn new(client: SesClient) -> Self {
        Self { client }
    }
}

#[rocket::async_trait]
impl Mailer for SesMailer {
    async fn send(&self, mail: OutgoingMail) -> Result<(), MailError> {
        let boundary = format!("festival-{:016x}", rand::random::<u64>());
        let raw = RawMessage::builder()
            .data(Blob::new(mail.to_mime(&boundary)?))
            .build()
            .map_err(|e| MailError::Build(e.to_string()))?;
        let destination = Destination::builder().to_addresses(&mail.to).build();

        self.client
            .send_email()
            .destination(destination)
            .content(EmailContent::builder().raw(raw).build())
            .send()
            .await
            .map_err(|e| MailError::Send(e.to_string()))?;

        debug!("Sent \"{}\" to {}", mail.subject, mail.to);
        Ok(())
    }
}

/// Keeps every message instead of sending it.
#[cfg(test)]
#[derive(Clone, Default)]
pub struct RecordingMailer {
    sent: Arc<std::sync::Mutex<Vec<OutgoingMail>>>,
    failing: Arc<std::sync::atomic::AtomicBool>,
}

#[cfg(test)]
impl RecordingMailer {
    pub fn sent(&self) -> Vec<OutgoingMail> {
        self.sent.lock().unwrap().clone()
    }

    /// Make every subsequent send fail.
    pub fn fail(&self) {
        self.failing
            .store(true, std::sync::atomic::Ordering::SeqCst);
    }
}

#[cfg(test)]
#[rocket::async_trait]
impl Mailer for RecordingMailer {
    async fn send(&self, mail: OutgoingMail) -> Result<(), MailError> {
        if self.failing.load(std::sync::atomic::Ordering::SeqCst) {
            return Err(MailError::Send("recording mailer set to fail".to_string()));
        }
        self.sent.lock().unwrap().push(mail);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn example() -> OutgoingMail {
        OutgoingMail {
            from: "\"Festival\" <festival@example.com>".to_string(),
            to: "agnes@example.com".to_string(),
            subject: "Votre candidature PDF - Agnès".to_string(),
            text: "Voici votre candidature au format PDF.".to_string(),
            attachments: vec![Attachment {
                filename: "Agnès_Candidature.pdf".to_string(),
                content_type: "application/pdf".to_string(),
                content: b"%PDF-1".to_vec(),
            }],
        }
    }

    #[test]
    fn mime_has_headers_and_attachment() {
        let mime = example().to_mime("BOUNDARY").unwrap();

        assert!(mime.starts_with("From: \"Festival\" <festival@example.com>\r\n"));
        assert!(mime.contains("To: agnes@example.com\r\n"));
        assert!(mime.contains("Content-Type: multipart/mixed; boundary=\"BOUNDARY\""));
        assert!(mime.contains(
            "Content-Type: application/pdf; name*=UTF-8''Agn%C3%A8s_Candidature.pdf\r\n"
        ));
        assert!(mime.contains(
            "Content-Disposition: attachment; filename*=UTF-8''Agn%C3%A8s_Candidature.pdf\r\n"
        ));
        assert!(mime.contains("JVBERi0x"));
        assert!(mime.ends_with("--BOUNDARY--\r\n"));
    }

    #[test]
    fn non_ascii_subject_is_encoded() {
        let mime = example().to_mime("BOUNDARY").unwrap();
        let expected = format!(
            "Subject: =?UTF-8?B?{}?=\r\n",
            BASE64.encode("Votre candidature PDF - Agnès".as_bytes())
        );
        assert!(mime.contains(&expected));
    }

    #[test]
    fn ascii_subject_is_left_alone() {
        assert_eq!(encode_header("Hello"), "Hello");
    }

    #[test]
    fn line_breaks_cannot_add_headers() {
        let name = "A\r\nBcc: victim@example.com";
        let mut mail = example();
        mail.subject = format!("Votre candidature PDF - {name}");
        mail.attachments[0].filename = format!("{name}_Candidature.pdf");
        assert!(matches!(mail.to_mime("BOUNDARY"), Err(MailError::Build(_))));

        let mut mail = example();
        mail.to = "a@x.com\nBcc: victim@example.com".to_string();
        assert!(matches!(mail.to_mime("BOUNDARY"), Err(MailError::Build(_))));
    }

    #[test]
    fn quotes_in_filename_are_encoded() {
        let mut mail = example();
        mail.attachments[0].filename = "O\"Brien; x=y.pdf".to_string();

        let mime = mail.to_mime("BOUNDARY").unwrap();

        assert!(mime.contains("filename*=UTF-8''O%22Brien%3B%20x%3Dy.pdf\r\n"));
        assert!(!mime.contains("O\"Brien"));
    }
}
