//! Hookmail - GitHub webhook to email bridge.
//!
//! Receives signed webhook deliveries over HTTP, checks the
//! `X-Hub-Signature` HMAC against a shared secret and relays the JSON
//! payload as a plain-text email over SMTPS.
//!
//! ## Architecture
//!
//! ```text
//! POST /webhook-to-email → signature gate → JSON gate → Mailer → {"success": ...}
//! ```

pub mod config;
pub mod mail;
pub mod payload;
pub mod secret;
pub mod web;

// Re-export commonly used types
pub use config::{Config, ConfigError, TransportConfig};
pub use mail::{MailError, Mailer, OutgoingMail, SmtpMailer};
pub use secret::SigningSecret;
pub use web::{router, AppState, DeliveryResult};
