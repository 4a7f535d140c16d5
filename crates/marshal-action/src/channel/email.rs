//! Email channel.
//!
//! Sends plain-text mail through an SMTP transport configured from the
//! `[smtp]` section of the configuration.

use std::sync::Arc;

use async_trait::async_trait;
use lettre::message::header::ContentType;
use lettre::message::Mailbox;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};

use marshal_core::config::SmtpConfig;

use crate::channel::ChannelSender;
use crate::error::DeliveryError;
use crate::params::{optional_string, Params};

/// A fully addressed plain-text message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutgoingMail {
    pub from: String,
    pub to: String,
    pub subject: String,
    pub body: String,
}

/// SMTP send primitive.
#[async_trait]
pub trait MailTransport: Send + Sync {
    async fn send_mail(&self, mail: &OutgoingMail) -> Result<(), DeliveryError>;
}

/// `MailTransport` backed by lettre's async SMTP client.
pub struct SmtpMailer {
    config: SmtpConfig,
}

impl SmtpMailer {
    pub fn new(config: SmtpConfig) -> Self {
        Self { config }
    }

    fn transport(&self) -> Result<AsyncSmtpTransport<Tokio1Executor>, DeliveryError> {
        // Port 465 speaks implicit TLS; everything else upgrades with STARTTLS.
        let relay = if self.config.port == 465 {
            AsyncSmtpTransport::<Tokio1Executor>::relay(&self.config.host)
        } else {
            AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&self.config.host)
        };
        let builder = relay
            .map_err(|e| DeliveryError::Smtp(format!("SMTP relay: {e}")))?
            .port(self.config.port);

        let builder = if self.config.user.is_empty() {
            builder
        } else {
            builder.credentials(Credentials::new(
                self.config.user.clone(),
                self.config.password.clone(),
            ))
        };
        Ok(builder.build())
    }
}

#[async_trait]
impl MailTransport for SmtpMailer {
    async fn send_mail(&self, mail: &OutgoingMail) -> Result<(), DeliveryError> {
        let from: Mailbox = parse_mailbox(&mail.from)?;
        let to: Mailbox = parse_mailbox(&mail.to)?;

        let message = Message::builder()
            .from(from)
            .to(to)
            .subject(mail.subject.as_str())
            .header(ContentType::TEXT_PLAIN)
            .body(mail.body.clone())
            .map_err(|e| DeliveryError::Smtp(format!("Build email: {e}")))?;

        self.transport()?
            .send(message)
            .await
            .map_err(|e| DeliveryError::Smtp(e.to_string()))?;

        tracing::debug!(to = %mail.to, host = %self.config.host, "Email handed to SMTP relay");
        Ok(())
    }
}

fn parse_mailbox(address: &str) -> Result<Mailbox, DeliveryError> {
    address
        .parse()
        .map_err(|e: lettre::address::AddressError| DeliveryError::InvalidAddress {
            address: address.to_string(),
            reason: e.to_string(),
        })
}

/// Sender for the `email` channel. Requires a `to` parameter.
pub struct EmailSender {
    config: SmtpConfig,
    transport: Arc<dyn MailTransport>,
}

impl EmailSender {
    pub fn new(config: SmtpConfig, transport: Arc<dyn MailTransport>) -> Self {
        Self { config, transport }
    }
}

#[async_trait]
impl ChannelSender for EmailSender {
    fn channel(&self) -> &'static str {
        "email"
    }

    async fn send(&self, message: &str, params: &Params) -> Result<(), DeliveryError> {
        let to = optional_string(params, "to").ok_or(DeliveryError::MissingParam {
            channel: "email",
            param: "to",
        })?;

        let mail = OutgoingMail {
            from: self.config.sender().to_string(),
            to: to.to_string(),
            subject: optional_string(params, "subject")
                .unwrap_or(&self.config.subject)
                .to_string(),
            body: message.to_string(),
        };

        self.transport.send_mail(&mail).await?;
        tracing::info!(to = %mail.to, "Email notification sent");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[derive(Default)]
    struct RecordingTransport {
        sent: Mutex<Vec<OutgoingMail>>,
    }

    #[async_trait]
    impl MailTransport for RecordingTransport {
        async fn send_mail(&self, mail: &OutgoingMail) -> Result<(), DeliveryError> {
            self.sent.lock().unwrap().push(mail.clone());
            Ok(())
        }
    }

    struct RefusingTransport;

    #[async_trait]
    impl MailTransport for RefusingTransport {
        async fn send_mail(&self, _mail: &OutgoingMail) -> Result<(), DeliveryError> {
            Err(DeliveryError::Smtp("550 mailbox unavailable".to_string()))
        }
    }

    fn smtp_config() -> SmtpConfig {
        SmtpConfig {
            host: "smtp.example.com".to_string(),
            user: "alerts@example.com".to_string(),
            password: "pw".to_string(),
            ..SmtpConfig::default()
        }
    }

    fn params(value: serde_json::Value) -> Params {
        value.as_object().cloned().unwrap()
    }

    #[tokio::test]
    async fn test_email_builds_mail_from_config() {
        let transport = Arc::new(RecordingTransport::default());
        let sender = EmailSender::new(smtp_config(), transport.clone());

        sender
            .send("disk full", &params(serde_json::json!({"to": "ops@example.com"})))
            .await
            .unwrap();

        let sent = transport.sent.lock().unwrap();
        assert_eq!(
            sent[0],
            OutgoingMail {
                from: "alerts@example.com".to_string(),
                to: "ops@example.com".to_string(),
                subject: "System notification".to_string(),
                body: "disk full".to_string(),
            }
        );
    }

    #[tokio::test]
    async fn test_email_subject_override() {
        let transport = Arc::new(RecordingTransport::default());
        let sender = EmailSender::new(smtp_config(), transport.clone());

        sender
            .send(
                "body",
                &params(serde_json::json!({"to": "ops@example.com", "subject": "Urgent"})),
            )
            .await
            .unwrap();

        assert_eq!(transport.sent.lock().unwrap()[0].subject, "Urgent");
    }

    #[tokio::test]
    async fn test_email_requires_to() {
        let transport = Arc::new(RecordingTransport::default());
        let sender = EmailSender::new(smtp_config(), transport.clone());

        let err = sender.send("body", &Params::new()).await.unwrap_err();
        assert!(matches!(
            err,
            DeliveryError::MissingParam {
                channel: "email",
                param: "to"
            }
        ));
        assert!(transport.sent.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_email_transport_failure_is_returned() {
        let sender = EmailSender::new(smtp_config(), Arc::new(RefusingTransport));
        let err = sender
            .send("body", &params(serde_json::json!({"to": "ops@example.com"})))
            .await
            .unwrap_err();
        assert!(matches!(err, DeliveryError::Smtp(_)));
    }

    #[tokio::test]
    async fn test_smtp_mailer_rejects_bad_address() {
        let mailer = SmtpMailer::new(smtp_config());
        let err = mailer
            .send_mail(&OutgoingMail {
                from: "alerts@example.com".to_string(),
                to: "not an address".to_string(),
                subject: "s".to_string(),
                body: "b".to_string(),
            })
            .await
            .unwrap_err();
        assert!(matches!(err, DeliveryError::InvalidAddress { .. }));
    }

    #[test]
    fn test_email_channel_name() {
        let sender = EmailSender::new(smtp_config(), Arc::new(RefusingTransport));
        assert_eq!(sender.channel(), "email");
    }
}
