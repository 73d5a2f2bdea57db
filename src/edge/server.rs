use std::net::SocketAddr;
use std::sync::Arc;

use axum::{Router, routing::get};
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::info;
use url::Url;

use super::{
    services::{health, proxy},
    state::AppState,
};
use crate::config::Config;
use crate::fetch;
use crate::fixup::{ImageFixer, WaybackFixer};
use crate::observability::Metrics;

type AnyError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Run the edge proxy until a shutdown signal arrives.
///
/// An explicit `address` wins over the configured bind address.
pub async fn run(address: Option<SocketAddr>) -> Result<(), AnyError> {
    // Load config
    info!("Loading configuration");
    let config = Config::load().map_err(|e| format!("Failed to load config: {}", e))?;

    let bind_addr = address.unwrap_or(config.server.bind_addr);

    // Config validation already vetted the URL shape
    let origin = Url::parse(&config.origin.base_url)
        .map_err(|e| format!("Invalid origin base_url: {}", e))?;

    let client = fetch::build_client(&config.upstream)
        .map_err(|e| format!("Failed to build upstream client: {}", e))?;

    let metrics = Arc::new(Metrics::new());
    let fixer: Arc<dyn ImageFixer> = Arc::new(WaybackFixer::new(client.clone(), metrics.clone()));

    info!(origin = %origin, "Fronting origin");

    let state = AppState::new(config, origin, client, fixer, metrics);
    let app = router(state);

    let listener = TcpListener::bind(bind_addr).await?;
    info!(address = %bind_addr, "imgmend edge listening");

    axum::serve(listener, app.into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

/// Build the edge router.
///
/// The proxy is the fallback, so it catches every method on every path the
/// operator routes do not claim.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/operators/health", get(health))
        .fallback(proxy)
        .with_state(state)
        // Trace every request/response pair passing the edge
        .layer(TraceLayer::new_for_http())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{SignalKind, signal};
        let mut sigterm = signal(SignalKind::terminate())
            .expect("failed to install signal handler");
        sigterm.recv().await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received");
}
