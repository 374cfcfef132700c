//! Hookmail web server.
//!
//! Loads the signing secret and SMTP settings once, then serves
//! `POST /webhook-to-email` on all interfaces.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::{net::TcpListener, signal};
use tracing::{info, warn};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use hookmail::{router, AppState, Config, SigningSecret, SmtpMailer, TransportConfig};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize structured JSON logging
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().json().flatten_event(true))
        .init();

    info!("web_server_starting");

    let config = Config::from_env();
    info!(
        port = config.port,
        secret_path = %config.secret_path.display(),
        transport_config_path = %config.transport_config_path.display(),
        smtp_timeout_secs = config.smtp_timeout_secs,
        max_body_bytes = config.max_body_bytes,
        "config_loaded"
    );

    let secret = SigningSecret::load(&config.secret_path)
        .context("Failed to load signing secret")?;
    if secret.is_empty() {
        warn!("signing_secret_empty");
    }

    let transport = TransportConfig::load(&config.transport_config_path)
        .context("Failed to load SMTP configuration")?;
    info!(
        server = %transport.server,
        port = transport.port,
        from = %transport.from,
        to = %transport.to,
        "transport_config_loaded"
    );

    let mailer = SmtpMailer::new(&transport, config.smtp_timeout())
        .context("Failed to set up SMTP transport")?;

    let state = AppState::new(secret, Arc::new(mailer));
    let app = router(state, config.max_body_bytes);

    // Bind to address
    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    let listener = TcpListener::bind(addr)
        .await
        .context("Failed to bind to address")?;

    info!(address = %addr, "web_server_listening");

    // Run server with graceful shutdown
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("web_server_shutdown_complete");

    Ok(())
}

/// Create a future that completes when a shutdown signal is received.
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received SIGINT"),
        _ = terminate => info!("Received SIGTERM"),
    }

    info!("web_server_shutting_down");
}
