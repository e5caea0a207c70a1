// Library exports for testing
pub mod config;
pub mod handlers;
pub mod network;
pub mod session;

use axum::{
    Router,
    routing::{get, post},
};
use session::SessionManager;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

/// Shared state handed to every handler
#[derive(Clone)]
pub struct AppState {
    pub sessions: Arc<SessionManager>,
    pub stun_server: Arc<str>,
}

impl AppState {
    pub fn new(sessions: Arc<SessionManager>, stun_server: impl Into<Arc<str>>) -> Self {
        Self {
            sessions,
            stun_server: stun_server.into(),
        }
    }
}

/// Build the full HTTP router: pages, assets, signaling API and health check
pub fn build_router(state: AppState) -> Router {
    Router::new()
        // Pages
        .route("/", get(handlers::pages::index_page))
        .route("/sender", get(handlers::pages::sender_page))
        .route("/viewer", get(handlers::pages::viewer_page))
        .route("/assets/sender.js", get(handlers::pages::sender_js))
        .route("/assets/viewer.js", get(handlers::pages::viewer_js))
        .route("/assets/style.css", get(handlers::pages::style_css))
        // Signaling API
        .route("/api/new", post(handlers::signaling::create_session))
        .route(
            "/api/offer",
            get(handlers::signaling::get_offer).post(handlers::signaling::submit_offer),
        )
        .route(
            "/api/answer",
            get(handlers::signaling::get_answer).post(handlers::signaling::submit_answer),
        )
        .route("/api/info", get(handlers::info::server_info))
        .route("/api/stats", get(handlers::info::stats))
        .route("/health", get(handlers::health::health_check))
        .with_state(state)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}
