//! Listkeeper Server - Main entry point.
//!
//! This binary starts the Listkeeper server with:
//! - Structured JSON logging
//! - Graceful shutdown handling (SIGTERM/SIGINT)
//! - Background cleanup of expired sessions
//!
//! # Configuration
//!
//! See [`listkeeper_server::config`] for environment variable configuration.
//!
//! # Example
//!
//! ```bash
//! PORT=4567 LISTKEEPER_SESSION_TTL_SECS=3600 cargo run --bin listkeeper-server
//! ```

use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use tokio::net::TcpListener;
use tokio::signal;
use tracing::{error, info};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

use listkeeper_server::config::Config;
use listkeeper_server::routes::{create_router, AppState};
use listkeeper_server::session::SessionStore;

/// Interval between sweeps for expired sessions (60 seconds).
const SESSION_CLEANUP_INTERVAL: Duration = Duration::from_secs(60);

#[tokio::main]
async fn main() -> ExitCode {
    init_logging();

    let config = match Config::from_env() {
        Ok(config) => config,
        Err(err) => {
            error!(error = %err, "Failed to load configuration");
            eprintln!("Error: {err}");
            eprintln!();
            eprintln!("Optional environment variables:");
            eprintln!("  PORT                         - HTTP server port (default: 4567)");
            eprintln!("  LISTKEEPER_SESSION_TTL_SECS  - Idle session lifetime (default: 86400)");
            eprintln!("  LISTKEEPER_MAX_SESSIONS      - Maximum live sessions (default: 10000)");
            eprintln!("  LISTKEEPER_SECURE_COOKIE     - Mark session cookie Secure ('true')");
            eprintln!("  RUST_LOG                     - Log level filter (default: info)");
            return ExitCode::from(1);
        }
    };

    info!(
        port = config.port,
        session_ttl_secs = config.session_ttl.as_secs(),
        max_sessions = config.max_sessions,
        secure_cookie = config.secure_cookie,
        "Listkeeper server starting"
    );

    let sessions = Arc::new(SessionStore::new(config.session_store_config()));
    let cleanup_handle = sessions.spawn_cleanup_task(SESSION_CLEANUP_INTERVAL);
    info!(
        interval_secs = SESSION_CLEANUP_INTERVAL.as_secs(),
        "Session cleanup task started"
    );

    let port = config.port;
    let app = create_router(AppState::with_sessions(config, sessions));

    let bind_addr = format!("0.0.0.0:{port}");
    let listener = match TcpListener::bind(&bind_addr).await {
        Ok(listener) => {
            info!(port, address = %bind_addr, "Server listening");
            listener
        }
        Err(err) => {
            error!(error = %err, address = %bind_addr, "Failed to bind to address");
            return ExitCode::from(1);
        }
    };

    let server = axum::serve(listener, app).with_graceful_shutdown(shutdown_signal());

    info!("Server ready to accept connections");

    if let Err(err) = server.await {
        error!(error = %err, "Server error");
        return ExitCode::from(1);
    }

    info!("Server shutting down gracefully");

    cleanup_handle.abort();
    info!("Session cleanup task stopped");

    info!("Server shutdown complete");
    ExitCode::SUCCESS
}

/// Initialize structured logging with tracing.
///
/// JSON output, filtered by `RUST_LOG` with a default of `info` for the
/// server and `debug` for request traces.
fn init_logging() {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,tower_http=debug,axum::rejection=trace"));

    let json_layer = fmt::layer()
        .json()
        .with_target(true)
        .with_level(true)
        .with_file(false)
        .with_line_number(false);

    tracing_subscriber::registry()
        .with(env_filter)
        .with(json_layer)
        .init();
}

/// Resolves when SIGTERM or SIGINT (Ctrl+C) is received.
///
/// Sessions live only in memory, so every list is dropped once the server
/// stops.
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received SIGINT (Ctrl+C), initiating graceful shutdown");
        }
        _ = terminate => {
            info!("Received SIGTERM, initiating graceful shutdown");
        }
    }
}
