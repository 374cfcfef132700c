//! Webhook endpoint handlers.
//!
//! The webhook handler runs three gates in order:
//! 1. Verify the `X-Hub-Signature` HMAC
//! 2. Require a (truthy) JSON body
//! 3. Relay the payload as one email
//!
//! Every outcome is answered with `200 OK`; failure is only visible in the
//! `success` field of the body. The one exception sits in front of the
//! handler: a body above the router's size limit is refused by axum with
//! `413 Payload Too Large` before any gate runs.

use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::State,
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
    Json,
};
use serde::Serialize;
use thiserror::Error;
use tracing::{error, info, warn};

use crate::mail::{Mailer, OutgoingMail};
use crate::payload::{parse_payload, render_sorted, subject_for};
use crate::secret::SigningSecret;
use crate::web::signature::{self, SIGNATURE_HEADER};

/// Header naming the GitHub event type.
pub const EVENT_HEADER: &str = "X-GitHub-Event";

/// Shared application state.
///
/// Both members are read-only after startup.
#[derive(Clone)]
pub struct AppState {
    pub secret: Arc<SigningSecret>,
    pub mailer: Arc<dyn Mailer>,
}

impl AppState {
    pub fn new(secret: SigningSecret, mailer: Arc<dyn Mailer>) -> Self {
        Self {
            secret: Arc::new(secret),
            mailer,
        }
    }
}

// =============================================================================
// Health Check
// =============================================================================

/// Health check response.
#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
}

/// Health check endpoint.
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse { status: "ok" })
}

// =============================================================================
// Webhook to Email
// =============================================================================

/// Reasons a webhook is not relayed. `Display` is the caller-visible text.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum RelayError {
    #[error("HMAC verification failed")]
    HmacVerification,

    #[error("No JSON")]
    NoJson,

    #[error("Error sending mail")]
    SendMail,
}

/// Webhook response body.
#[derive(Debug, Serialize, PartialEq, Eq)]
pub struct DeliveryResult {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl From<Result<(), RelayError>> for DeliveryResult {
    fn from(result: Result<(), RelayError>) -> Self {
        match result {
            Ok(()) => DeliveryResult {
                success: true,
                error: None,
            },
            Err(e) => DeliveryResult {
                success: false,
                error: Some(e.to_string()),
            },
        }
    }
}

/// `POST /webhook-to-email`
pub async fn webhook_to_email(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> impl IntoResponse {
    let event = header_str(&headers, EVENT_HEADER);

    info!(
        event = event.unwrap_or_default(),
        body_length = body.len(),
        has_signature = headers.contains_key(SIGNATURE_HEADER),
        "webhook_received"
    );

    let result = DeliveryResult::from(relay(&state, &headers, &body).await);

    info!(
        success = result.success,
        error = result.error.as_deref().unwrap_or_default(),
        "webhook_response"
    );

    (StatusCode::OK, Json(result))
}

async fn relay(state: &AppState, headers: &HeaderMap, body: &[u8]) -> Result<(), RelayError> {
    let supplied = header_str(headers, SIGNATURE_HEADER);
    if !signature::verify(body, supplied, &state.secret) {
        warn!("hmac_verification_failed");
        return Err(RelayError::HmacVerification);
    }

    let payload = parse_payload(body).ok_or_else(|| {
        warn!("payload_not_json");
        RelayError::NoJson
    })?;

    let body = render_sorted(&payload).map_err(|e| {
        error!(error = %e, "payload_render_failed");
        RelayError::SendMail
    })?;

    let mail = OutgoingMail {
        subject: subject_for(header_str(headers, EVENT_HEADER)),
        body,
    };

    state.mailer.send(mail).await.map_err(|e| {
        error!(error = %e, source = ?e, "mail_send_failed");
        RelayError::SendMail
    })
}

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|v| v.to_str().ok())
}
