use super::handlers;
use super::state::AppState;
use super::ws;
use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

/// Create the HTTP router with all routes
pub fn create_router(state: AppState) -> Router {
    let max_upload = state.settings.max_upload_bytes;

    Router::new()
        // Health check
        .route("/health", get(handlers::health_check))
        .route("/api/check-auth", get(handlers::check_auth))
        // Streaming transcription
        .route("/ws/transcribe", get(ws::transcribe_socket))
        // One-shot clip transcription
        .route(
            "/api/transcribe",
            post(handlers::transcribe_upload).layer(DefaultBodyLimit::max(max_upload)),
        )
        // Journal entries
        .route(
            "/api/journal-entries",
            get(handlers::list_entries).post(handlers::save_entry),
        )
        .route(
            "/api/journal-entries/cleanup",
            post(handlers::cleanup_entries),
        )
        // Add tracing middleware for request logging
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
