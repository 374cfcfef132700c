//! Web server module for the webhook-to-email bridge.
//!
//! Routes:
//! - `POST /webhook-to-email`: verify, validate, relay
//! - `GET /health`: liveness probe
//!
//! Webhook outcomes are always `200 OK`. Bodies larger than
//! `max_body_bytes` never reach the handler and get `413`.

pub mod handlers;
pub mod signature;

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};
use tower_http::trace::TraceLayer;

pub use handlers::{
    health, webhook_to_email, AppState, DeliveryResult, HealthResponse, RelayError, EVENT_HEADER,
};
pub use signature::{expected_signature, verify, SIGNATURE_HEADER};

/// Build the application router.
///
/// `max_body_bytes` caps the webhook body; larger requests are answered
/// with `413 Payload Too Large`.
pub fn router(state: AppState, max_body_bytes: usize) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/webhook-to-email", post(webhook_to_email))
        .layer(DefaultBodyLimit::max(max_body_bytes))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use async_trait::async_trait;
    use axum::{
        body::{to_bytes, Body},
        http::{Request, StatusCode},
    };
    use serde_json::{json, Value};
    use tower::ServiceExt;

    use super::*;
    use crate::mail::{MailError, Mailer, OutgoingMail};
    use crate::secret::SigningSecret;

    const SECRET: &str = "webhook-secret";

    /// Records every message; optionally fails each send.
    #[derive(Default)]
    struct RecordingMailer {
        sent: Mutex<Vec<OutgoingMail>>,
        fail: bool,
    }

    #[async_trait]
    impl Mailer for RecordingMailer {
        async fn send(&self, mail: OutgoingMail) -> Result<(), MailError> {
            self.sent.lock().unwrap().push(mail);
            if self.fail {
                // A message without a sender is refused by lettre's builder.
                let err = lettre::Message::builder()
                    .subject("unsent")
                    .body(String::new())
                    .unwrap_err();
                return Err(MailError::Message(err));
            }
            Ok(())
        }
    }

    fn app(mailer: Arc<RecordingMailer>) -> Router {
        app_with_limit(mailer, 1024 * 1024)
    }

    fn app_with_limit(mailer: Arc<RecordingMailer>, max_body_bytes: usize) -> Router {
        let state = AppState::new(SigningSecret::new(SECRET), mailer);
        router(state, max_body_bytes)
    }

    fn sign(body: &[u8]) -> String {
        expected_signature(body, &SigningSecret::new(SECRET))
    }

    fn webhook_request(
        body: &'static str,
        signature: Option<String>,
        event: Option<&str>,
    ) -> Request<Body> {
        let mut builder = Request::builder()
            .method("POST")
            .uri("/webhook-to-email")
            .header("content-type", "application/json");
        if let Some(signature) = signature {
            builder = builder.header(SIGNATURE_HEADER, signature);
        }
        if let Some(event) = event {
            builder = builder.header(EVENT_HEADER, event);
        }
        builder.body(Body::from(body)).unwrap()
    }

    async fn call(app: Router, request: Request<Body>) -> (StatusCode, Value) {
        let response = app.oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn missing_signature_is_rejected() {
        let mailer = Arc::new(RecordingMailer::default());

        let (status, body) = call(
            app(mailer.clone()),
            webhook_request(r#"{"a":1}"#, None, Some("push")),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({"success": false, "error": "HMAC verification failed"}));
        assert!(mailer.sent.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn wrong_signature_is_rejected() {
        let mailer = Arc::new(RecordingMailer::default());
        let signature = sign(br#"{"a":2}"#);

        let (status, body) = call(
            app(mailer.clone()),
            webhook_request(r#"{"a":1}"#, Some(signature), None),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({"success": false, "error": "HMAC verification failed"}));
        assert!(mailer.sent.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn non_json_body_is_rejected() {
        let mailer = Arc::new(RecordingMailer::default());
        let raw = "not json";

        let (status, body) = call(
            app(mailer.clone()),
            webhook_request(raw, Some(sign(raw.as_bytes())), Some("push")),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({"success": false, "error": "No JSON"}));
        assert!(mailer.sent.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn falsy_json_body_is_rejected() {
        for raw in ["null", "{}", "false", "0"] {
            let mailer = Arc::new(RecordingMailer::default());

            let (status, body) = call(
                app(mailer.clone()),
                webhook_request(raw, Some(sign(raw.as_bytes())), None),
            )
            .await;

            assert_eq!(status, StatusCode::OK);
            assert_eq!(body, json!({"success": false, "error": "No JSON"}), "body {}", raw);
            assert!(mailer.sent.lock().unwrap().is_empty());
        }
    }

    #[tokio::test]
    async fn valid_webhook_is_relayed() {
        let mailer = Arc::new(RecordingMailer::default());
        let raw = r#"{"b":2,"a":1}"#;

        let (status, body) = call(
            app(mailer.clone()),
            webhook_request(raw, Some(sign(raw.as_bytes())), Some("pull_request")),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({"success": true}));

        let sent = mailer.sent.lock().unwrap();
        assert_eq!(
            *sent,
            vec![OutgoingMail {
                subject: "[Github Webhook] pull_request".to_string(),
                body: r#"{"a": 1, "b": 2}"#.to_string(),
            }]
        );
    }

    #[tokio::test]
    async fn missing_event_header_leaves_subject_suffix_empty() {
        let mailer = Arc::new(RecordingMailer::default());
        let raw = r#"{"zen":"Design for failure."}"#;

        let (_, body) = call(
            app(mailer.clone()),
            webhook_request(raw, Some(sign(raw.as_bytes())), None),
        )
        .await;

        assert_eq!(body, json!({"success": true}));
        assert_eq!(mailer.sent.lock().unwrap()[0].subject, "[Github Webhook] ");
    }

    #[tokio::test]
    async fn transport_failure_is_hidden_from_caller() {
        let mailer = Arc::new(RecordingMailer {
            fail: true,
            ..Default::default()
        });
        let raw = r#"{"a":1}"#;

        let response = app(mailer.clone())
            .oneshot(webhook_request(raw, Some(sign(raw.as_bytes())), Some("push")))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let text = String::from_utf8(bytes.to_vec()).unwrap();

        assert_eq!(text, r#"{"success":false,"error":"Error sending mail"}"#);
        assert!(!text.contains("missing"));
        assert_eq!(mailer.sent.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn identical_requests_send_twice() {
        let mailer = Arc::new(RecordingMailer::default());
        let service = app(mailer.clone());
        let raw = r#"{"action":"opened"}"#;

        for _ in 0..2 {
            let (status, body) = call(
                service.clone(),
                webhook_request(raw, Some(sign(raw.as_bytes())), Some("issues")),
            )
            .await;
            assert_eq!(status, StatusCode::OK);
            assert_eq!(body, json!({"success": true}));
        }

        let sent = mailer.sent.lock().unwrap();
        assert_eq!(sent.len(), 2);
        assert_eq!(sent[0], sent[1]);
    }

    #[tokio::test]
    async fn oversized_body_is_refused_before_the_handler() {
        let mailer = Arc::new(RecordingMailer::default());
        let raw = r#"{"padding":"0123456789012345678901234567890123456789"}"#;

        let response = app_with_limit(mailer.clone(), 16)
            .oneshot(webhook_request(raw, Some(sign(raw.as_bytes())), Some("push")))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
        assert!(mailer.sent.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn health_reports_ok() {
        let mailer = Arc::new(RecordingMailer::default());
        let request = Request::builder()
            .uri("/health")
            .body(Body::empty())
            .unwrap();

        let (status, body) = call(app(mailer), request).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({"status": "ok"}));
    }
}
