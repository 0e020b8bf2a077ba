// src/utils/mail.rs

use async_trait::async_trait;
use lettre::message::Mailbox;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};

use crate::config::Config;
use crate::error::AppError;

/// Builds an absolute link carrying a single-use token, rooted at the
/// configured public base URL.
pub fn token_link(config: &Config, path: &str, token: &str) -> Result<String, AppError> {
    let mut url = config
        .base_url
        .join(path)
        .map_err(|e| AppError::InternalServerError(e.to_string()))?;
    url.query_pairs_mut().append_pair("token", token);
    Ok(url.to_string())
}

/// Outbound transactional mail. The SMTP backend is used in production;
/// the no-op backend covers local development and tests.
#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, to: &str, subject: &str, body: &str) -> Result<(), AppError>;
}

pub struct SmtpMailer {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
}

impl SmtpMailer {
    pub fn from_config(config: &Config, host: &str) -> Result<Self, AppError> {
        let transport = AsyncSmtpTransport::<Tokio1Executor>::relay(host)
            .map_err(|e| AppError::InternalServerError(e.to_string()))?
            .port(config.smtp_port)
            .credentials(Credentials::new(
                config.smtp_username.clone(),
                config.smtp_password.clone(),
            ))
            .build();

        let from = config
            .mail_from
            .parse::<Mailbox>()
            .map_err(|e| AppError::InternalServerError(format!("invalid MAIL_FROM: {}", e)))?;

        Ok(SmtpMailer { transport, from })
    }
}

#[async_trait]
impl Mailer for SmtpMailer {
    async fn send(&self, to: &str, subject: &str, body: &str) -> Result<(), AppError> {
        let to = to
            .parse::<Mailbox>()
            .map_err(|e| AppError::InternalServerError(format!("invalid recipient: {}", e)))?;

        let message = Message::builder()
            .from(self.from.clone())
            .to(to)
            .subject(subject)
            .body(body.to_string())
            .map_err(|e| AppError::InternalServerError(e.to_string()))?;

        self.transport.send(message).await.map_err(|e| {
            tracing::error!("Failed to deliver mail: {:?}", e);
            AppError::InternalServerError(e.to_string())
        })?;

        Ok(())
    }
}

/// Logs instead of sending. Active when SMTP_HOST is unset.
pub struct NoopMailer;

#[async_trait]
impl Mailer for NoopMailer {
    async fn send(&self, to: &str, subject: &str, _body: &str) -> Result<(), AppError> {
        tracing::info!(%to, %subject, "SMTP not configured, mail suppressed");
        Ok(())
    }
}
