// Main entry point - Dependency injection and server setup
use std::sync::Arc;
use axum::{
    routing::{get, post, put},
    Router,
};
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

use parking_occupancy::application::session_registry::SessionRegistry;
use parking_occupancy::infrastructure::config::load_settings;
use parking_occupancy::infrastructure::tracing_sink::TracingSnapshotSink;
use parking_occupancy::presentation::app_state::AppState;
use parking_occupancy::presentation::handlers::{
    create_session, end_session, get_view, health_check, push_snapshot, set_announcement,
    stream_views, update_simulation,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // Load configuration
    let settings = load_settings()?;
    let defaults = settings.session_defaults()?;
    let addr = settings.bind_addr()?;

    // Snapshot sink (persistence boundary) and session registry (application layer)
    let registry = SessionRegistry::new(defaults, Arc::new(TracingSnapshotSink));
    let reaper = registry.spawn_reaper();

    // Create application state
    let state = Arc::new(AppState {
        registry: registry.clone(),
        status_clear_ms: settings.presentation.status_clear_ms,
    });

    // Build router (presentation layer)
    let router = Router::new()
        .route("/healthz", get(health_check))
        .route("/sessions", post(create_session))
        .route("/sessions/:id", get(get_view).delete(end_session))
        .route("/sessions/:id/stream", get(stream_views))
        .route("/sessions/:id/simulation", put(update_simulation))
        .route("/sessions/:id/announcement", put(set_announcement))
        .route("/sessions/:id/snapshot", post(push_snapshot))
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    // Start server
    tracing::info!("Starting parking-occupancy service on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    reaper.abort();
    registry.end_all().await;
    tracing::info!("Server stopped");

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
    }
}
