//! HTTP server
//!
//! Thin JSON adapters over the stages, the pipeline and the image client.

mod api;
mod error;
mod state;

use axum::Router;
use axum::extract::DefaultBodyLimit;
use eyre::{Context, Result};
use tower_http::cors::CorsLayer;
use tracing::{error, info};

pub use api::JsonBody;
pub use error::ApiError;
pub use state::{AppState, Backend, SharedState};

use crate::config::ServerConfig;

/// Request body limit; studio requests carry two images as data URLs
const MAX_BODY_BYTES: usize = 25 * 1024 * 1024;

/// Build the application router
pub fn build_router(state: SharedState, cors: bool) -> Router {
    let mut app = api::api_router()
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
        .with_state(state);

    if cors {
        app = app.layer(CorsLayer::permissive());
    }
    app
}

/// Bind and serve until Ctrl+C
pub async fn start_server(config: &ServerConfig, state: SharedState) -> Result<()> {
    let app = build_router(state, config.cors);

    let addr = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;

    let local_addr = listener.local_addr()?;
    info!("PrahaVerse listening on http://{}", local_addr);
    println!("PrahaVerse running at http://{}", local_addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Server shut down gracefully");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!(error = %e, "Failed to install Ctrl+C handler");
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
