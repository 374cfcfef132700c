//! SMTP delivery over implicit TLS.

use std::time::Duration;

use async_trait::async_trait;
use lettre::{
    message::{header::ContentType, Mailbox, Message},
    transport::smtp::authentication::Credentials,
    AsyncSmtpTransport, AsyncTransport, Tokio1Executor,
};
use tracing::info;

use crate::config::{ConfigError, TransportConfig};
use crate::mail::{MailError, Mailer, OutgoingMail};

/// Relays messages to the configured SMTP server.
///
/// Built without lettre's connection pool, so each [`Mailer::send`] opens a
/// fresh TLS session and drops it once the message is handed over (or the
/// attempt fails).
pub struct SmtpMailer {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
    to: Mailbox,
}

impl SmtpMailer {
    /// Validate the addresses and prepare the transport.
    ///
    /// Nothing touches the network until the first send.
    pub fn new(config: &TransportConfig, timeout: Option<Duration>) -> Result<Self, ConfigError> {
        let from: Mailbox = config
            .from
            .parse()
            .map_err(|source| ConfigError::Address { field: "from", source })?;
        let to: Mailbox = config
            .to
            .parse()
            .map_err(|source| ConfigError::Address { field: "to", source })?;

        let transport = AsyncSmtpTransport::<Tokio1Executor>::relay(&config.server)?
            .port(config.port)
            .credentials(Credentials::new(
                config.username.clone(),
                config.password.clone(),
            ))
            .timeout(timeout)
            .build();

        Ok(Self {
            transport,
            from,
            to,
        })
    }

    /// Build the plain-text message for `mail`.
    pub fn build_message(&self, mail: &OutgoingMail) -> Result<Message, MailError> {
        let message = Message::builder()
            .from(self.from.clone())
            .to(self.to.clone())
            .subject(mail.subject.as_str())
            .header(ContentType::TEXT_PLAIN)
            .body(mail.body.clone())?;

        Ok(message)
    }
}

#[async_trait]
impl Mailer for SmtpMailer {
    async fn send(&self, mail: OutgoingMail) -> Result<(), MailError> {
        let message = self.build_message(&mail)?;

        info!(
            subject = %mail.subject,
            body_length = mail.body.len(),
            "mail_send_start"
        );

        let response = self.transport.send(message).await?;

        info!(code = %response.code(), "mail_sent");

        Ok(())
    }
}
