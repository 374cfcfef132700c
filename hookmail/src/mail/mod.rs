//! Outbound email.
//!
//! The web handler only sees the [`Mailer`] trait; [`SmtpMailer`] is the
//! production implementation.

pub mod smtp;

use async_trait::async_trait;
use thiserror::Error;

pub use smtp::SmtpMailer;

/// A single message to relay.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutgoingMail {
    pub subject: String,
    pub body: String,
}

/// Delivery failure.
///
/// Variants are kept apart for server-side logs only; callers treat every
/// variant the same way.
#[derive(Debug, Error)]
pub enum MailError {
    #[error("failed to build message: {0}")]
    Message(#[from] lettre::error::Error),

    #[error("smtp transport error: {0}")]
    Transport(#[from] lettre::transport::smtp::Error),
}

#[async_trait]
pub trait Mailer: Send + Sync {
    /// Send one message. No retries.
    async fn send(&self, mail: OutgoingMail) -> Result<(), MailError>;
}
