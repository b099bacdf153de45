use super::handlers;
use super::state::AppState;
use axum::{
    routing::{get, post},
    Router,
};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

/// Create the HTTP router with all routes
pub fn create_router(state: AppState) -> Router {
    Router::new()
        // Health check
        .route("/health", get(handlers::health_check))
        // Call lifecycle
        .route("/call/start", post(handlers::start_call))
        .route("/call/end", post(handlers::end_call))
        .route("/call/mute", post(handlers::toggle_mute))
        // Pause/resume requests to the agent
        .route("/call/pause", post(handlers::pause_session))
        .route("/call/resume", post(handlers::resume_session))
        // Queries
        .route("/call/state", get(handlers::get_call_state))
        .route("/usage", get(handlers::get_usage))
        // UI shells run on another origin during development
        .layer(CorsLayer::permissive())
        // Add tracing middleware for request logging
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
