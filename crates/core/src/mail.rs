//! Delivery of finished documents to the Kindle address.

use std::future::Future;
use std::path::Path;
use std::time::Duration;

use lettre::message::header::ContentType;
use lettre::message::{Attachment, Mailbox, MultiPart, SinglePart};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};

use crate::config::KindleConfig;
use crate::{KindleKeepError, Result};

const BODY: &str = "Article sent from Karakeep to Kindle converter";
const SMTP_TIMEOUT: Duration = Duration::from_secs(60);

/// Something that can hand a file to the reader device.
pub trait Delivery {
    /// Sends `path` as an attachment.
    fn send(&self, path: &Path) -> impl Future<Output = Result<()>>;
}

fn mail_err(e: impl std::fmt::Display) -> KindleKeepError {
    KindleKeepError::MailError(e.to_string())
}

/// STARTTLS SMTP delivery.
pub struct SmtpDelivery {
    from: Mailbox,
    to: Mailbox,
    transport: AsyncSmtpTransport<Tokio1Executor>,
}

impl SmtpDelivery {
    pub fn new(kindle: &KindleConfig) -> Result<Self> {
        let from: Mailbox = kindle
            .smtp_user
            .parse()
            .map_err(|e| KindleKeepError::ConfigError(format!("kindle.smtp_user: {}", e)))?;
        let to: Mailbox = kindle
            .email
            .parse()
            .map_err(|e| KindleKeepError::ConfigError(format!("kindle.email: {}", e)))?;

        let transport = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&kindle.smtp_server)
            .map_err(mail_err)?
            .port(kindle.smtp_port)
            .credentials(Credentials::new(kindle.smtp_user.clone(), kindle.smtp_password.clone()))
            .timeout(Some(SMTP_TIMEOUT))
            .build();

        Ok(Self { from, to, transport })
    }

    /// Builds the message for `path` without sending it.
    pub fn build_message(&self, path: &Path) -> Result<Message> {
        build_message(self.from.clone(), self.to.clone(), path)
    }
}

/// Multipart message with a plain body and the file as attachment.
pub fn build_message(from: Mailbox, to: Mailbox, path: &Path) -> Result<Message> {
    if !path.is_file() {
        return Err(KindleKeepError::FileNotFound(path.to_path_buf()));
    }

    let bytes = std::fs::read(path)?;
    let filename = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| "document".to_string());
    let stem = path
        .file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_else(|| filename.clone());

    let content_type = ContentType::parse("application/octet-stream").map_err(mail_err)?;

    Message::builder()
        .from(from)
        .to(to)
        .subject(format!("Article from Karakeep - {}", stem))
        .multipart(
            MultiPart::mixed()
                .singlepart(SinglePart::plain(BODY.to_string()))
                .singlepart(Attachment::new(filename).body(bytes, content_type)),
        )
        .map_err(mail_err)
}

impl Delivery for SmtpDelivery {
    async fn send(&self, path: &Path) -> Result<()> {
        let message = self.build_message(path)?;
        self.transport.send(message).await.map_err(mail_err)?;

        tracing::info!(
            "Successfully sent {} to Kindle",
            path.file_name().unwrap_or_default().to_string_lossy()
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn kindle() -> KindleConfig {
        KindleConfig {
            email: "reader@kindle.com".to_string(),
            smtp_user: "me@example.org".to_string(),
            smtp_password: "pw".to_string(),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_message_has_subject_and_attachment() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("digest.epub");
        std::fs::write(&path, b"PK\x03\x04").unwrap();

        let delivery = SmtpDelivery::new(&kindle()).unwrap();
        let message = delivery.build_message(&path).unwrap();
        let raw = String::from_utf8_lossy(&message.formatted()).to_string();

        assert!(raw.contains("From: me@example.org"));
        assert!(raw.contains("To: reader@kindle.com"));
        assert!(raw.contains("Subject: Article from Karakeep - digest"));
        assert!(raw.contains("digest.epub"));
        assert!(raw.contains("application/octet-stream"));
        assert!(raw.contains(BODY));
    }

    #[tokio::test]
    async fn test_missing_file() {
        let delivery = SmtpDelivery::new(&kindle()).unwrap();
        let result = delivery.build_message(Path::new("/nonexistent/file.pdf"));
        assert!(matches!(result, Err(KindleKeepError::FileNotFound(_))));
    }

    #[test]
    fn test_invalid_addresses() {
        let mut config = kindle();
        config.email = "not an address".to_string();
        assert!(matches!(SmtpDelivery::new(&config), Err(KindleKeepError::ConfigError(_))));
    }
}
