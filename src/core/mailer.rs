// src/core/mailer.rs
//! Outgoing mail transport.

use anyhow::{Context, Result};
use async_trait::async_trait;
use lettre::{
    message::{
        header::{ContentType, HeaderName, HeaderValue},
        Mailbox,
    },
    transport::smtp::authentication::Credentials,
    AsyncFileTransport, AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
};

use crate::app_log;
use crate::core::config_manager::{MailSettings, MailTransportConfig};

/// Fully prepared message handed to a [`Mailer`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutgoingEmail {
    pub from: String,
    pub to: String,
    pub reply_to: Option<String>,
    pub subject: String,
    pub html_body: String,
    /// Extra headers already screened by the caller.
    pub headers: Vec<(String, String)>,
}

#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, email: &OutgoingEmail) -> Result<()>;
}

enum MailTransport {
    Smtp(AsyncSmtpTransport<Tokio1Executor>),
    File(AsyncFileTransport<Tokio1Executor>),
}

pub struct LettreMailer {
    transport: MailTransport,
}

impl LettreMailer {
    pub fn new(settings: &MailSettings) -> Result<Self> {
        let transport = match &settings.transport {
            MailTransportConfig::Smtp {
                host,
                port,
                username,
                password,
                use_tls,
            } => {
                if !use_tls {
                    app_log!(warn, "SMTP TLS is disabled - this is not recommended for production");
                }

                let mut builder = if *use_tls {
                    AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(host)
                        .with_context(|| format!("Failed to create SMTP transport for {}", host))?
                } else {
                    AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(host)
                }
                .port(*port);

                if let Some(username) = username {
                    builder = builder.credentials(Credentials::new(
                        username.clone(),
                        password.clone().unwrap_or_default(),
                    ));
                }

                MailTransport::Smtp(builder.build())
            }
            MailTransportConfig::File { path } => {
                if !path.exists() {
                    std::fs::create_dir_all(path).with_context(|| {
                        format!("Failed to create mail directory: {}", path.display())
                    })?;
                }
                MailTransport::File(AsyncFileTransport::<Tokio1Executor>::new(path))
            }
        };

        Ok(Self { transport })
    }

    fn build_message(email: &OutgoingEmail) -> Result<Message> {
        let from: Mailbox = email
            .from
            .parse()
            .with_context(|| format!("Invalid sender: {}", email.from))?;
        let to: Mailbox = email
            .to
            .parse()
            .with_context(|| format!("Invalid recipient: {}", email.to))?;

        let mut builder = Message::builder()
            .from(from)
            .to(to)
            .subject(email.subject.as_str())
            .header(ContentType::TEXT_HTML);

        if let Some(reply_to) = &email.reply_to {
            let reply_to: Mailbox = reply_to
                .parse()
                .with_context(|| format!("Invalid Reply-To: {}", reply_to))?;
            builder = builder.reply_to(reply_to);
        }

        for (name, value) in &email.headers {
            let header_name = HeaderName::new_from_ascii(name.clone())
                .map_err(|e| anyhow::anyhow!("Invalid header name {}: {}", name, e))?;
            builder = builder.raw_header(HeaderValue::new(header_name, value.clone()));
        }

        builder
            .body(email.html_body.clone())
            .context("Failed to build email message")
    }
}

#[async_trait]
impl Mailer for LettreMailer {
    async fn send(&self, email: &OutgoingEmail) -> Result<()> {
        let message = Self::build_message(email)?;

        match &self.transport {
            MailTransport::Smtp(smtp) => {
                smtp.send(message).await.context("SMTP send failed")?;
            }
            MailTransport::File(file) => {
                file.send(message).await.context("File transport send failed")?;
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> OutgoingEmail {
        OutgoingEmail {
            from: "Formateurs Pro <contact@example.com>".to_string(),
            to: "marie@example.com".to_string(),
            reply_to: Some("client@example.com".to_string()),
            subject: "Bonjour".to_string(),
            html_body: "<p>Bonjour</p>".to_string(),
            headers: vec![("X-Mailer".to_string(), "Trainer Directory".to_string())],
        }
    }

    #[test]
    fn test_build_message_carries_headers() {
        let message = LettreMailer::build_message(&sample()).unwrap();
        let raw = String::from_utf8(message.formatted()).unwrap();

        assert!(raw.contains("Reply-To: client@example.com"));
        assert!(raw.contains("X-Mailer: Trainer Directory"));
        assert!(raw.contains("Subject: Bonjour"));
    }

    #[test]
    fn test_build_message_rejects_bad_recipient() {
        let mut email = sample();
        email.to = "not an address".to_string();
        assert!(LettreMailer::build_message(&email).is_err());
    }

    #[tokio::test]
    async fn test_file_transport_writes_eml() {
        let dir = tempfile::tempdir().unwrap();
        let mailer = LettreMailer::new(&MailSettings {
            from_email: None,
            transport: MailTransportConfig::File {
                path: dir.path().to_path_buf(),
            },
        })
        .unwrap();

        mailer.send(&sample()).await.unwrap();

        let written = std::fs::read_dir(dir.path()).unwrap().count();
        assert_eq!(written, 1);
    }
}
