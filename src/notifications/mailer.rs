use async_trait::async_trait;
use lettre::{
    message::{header::ContentType, Mailbox},
    transport::smtp::authentication::Credentials,
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info, instrument};

use crate::{config::EmailConfig, errors::ServiceError};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmailMessage {
    pub to: String,
    pub subject: String,
    pub body: String,
}

/// Outbound email
#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, message: EmailMessage) -> Result<(), ServiceError>;
}

/// Writes emails to the log instead of sending them
#[derive(Debug, Default, Clone)]
pub struct LogMailer;

#[async_trait]
impl Mailer for LogMailer {
    async fn send(&self, message: EmailMessage) -> Result<(), ServiceError> {
        info!(to = %message.to, subject = %message.subject, "Email (not sent, email disabled)");
        debug!(body = %message.body, "Email body");
        Ok(())
    }
}

pub struct SmtpMailer {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
}

impl SmtpMailer {
    /// Port 465 uses implicit TLS, anything else STARTTLS
    pub fn new(config: &EmailConfig) -> Result<Self, ServiceError> {
        let host = config
            .smtp_host
            .as_deref()
            .ok_or_else(|| ServiceError::InternalError("SMTP host is not configured".into()))?;

        let builder = if config.smtp_port == 465 {
            AsyncSmtpTransport::<Tokio1Executor>::relay(host)
        } else {
            AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(host)
        }
        .map_err(|e| ServiceError::InternalError(format!("SMTP transport: {}", e)))?
        .port(config.smtp_port);

        let builder = match (&config.smtp_username, &config.smtp_password) {
            (Some(user), Some(password)) => {
                builder.credentials(Credentials::new(user.clone(), password.clone()))
            }
            _ => builder,
        };

        let from = config
            .from
            .parse::<Mailbox>()
            .map_err(|e| ServiceError::InternalError(format!("Invalid sender address: {}", e)))?;

        Ok(Self {
            transport: builder.build(),
            from,
        })
    }
}

#[async_trait]
impl Mailer for SmtpMailer {
    #[instrument(skip(self, message), fields(to = %message.to, subject = %message.subject))]
    async fn send(&self, message: EmailMessage) -> Result<(), ServiceError> {
        let to = message
            .to
            .parse::<Mailbox>()
            .map_err(|e| ServiceError::ValidationError(format!("Invalid recipient: {}", e)))?;

        let email = Message::builder()
            .from(self.from.clone())
            .to(to)
            .subject(message.subject)
            .header(ContentType::TEXT_PLAIN)
            .body(message.body)
            .map_err(|e| ServiceError::InternalError(format!("Email build failed: {}", e)))?;

        self.transport
            .send(email)
            .await
            .map_err(|e| ServiceError::ExternalServiceError(format!("SMTP send failed: {}", e)))?;

        info!("Email sent");
        Ok(())
    }
}

pub fn mailer_from_config(config: &EmailConfig) -> Result<Arc<dyn Mailer>, ServiceError> {
    if config.enabled {
        Ok(Arc::new(SmtpMailer::new(config)?))
    } else {
        Ok(Arc::new(LogMailer))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn log_mailer_accepts_everything() {
        let mailer = LogMailer;
        let result = mailer
            .send(EmailMessage {
                to: "asha@example.com".into(),
                subject: "Hello".into(),
                body: "Body".into(),
            })
            .await;
        assert!(result.is_ok());
    }

    #[test]
    fn smtp_mailer_needs_a_host() {
        let config = EmailConfig::default();
        assert!(SmtpMailer::new(&config).is_err());
    }

    #[tokio::test]
    async fn smtp_mailer_builds_from_config() {
        let config = EmailConfig {
            enabled: true,
            smtp_host: Some("smtp.example.com".into()),
            smtp_username: Some("user".into()),
            smtp_password: Some("secret".into()),
            ..EmailConfig::default()
        };
        assert!(SmtpMailer::new(&config).is_ok());
    }
}
