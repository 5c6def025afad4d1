// src/routes/mod.rs
pub mod admin;
pub mod chat;
pub mod diagnosis;
pub mod market;

use std::path::Path;

use crate::{panels, state::SharedState};
use axum::{
    Json, Router,
    extract::DefaultBodyLimit,
    routing::{get, post},
};
use admin::{get_metrics_handler, list_sessions_handler};
use chat::{create_session_handler, delete_session_handler, get_session_handler, send_message_handler};
use diagnosis::diagnose_handler;
use market::{market_trend_handler, popular_crops_handler};
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

/// Base64 inflates the 10MB image limit by a third; leave room for the JSON around it.
pub const MAX_BODY_BYTES: usize = 16 * 1024 * 1024;

pub fn create_router(public_dir: impl AsRef<Path>) -> Router<SharedState> {
    let admin_routes = Router::new()
        .route("/metrics", get(get_metrics_handler))
        .route("/sessions", get(list_sessions_handler));

    let api_routes = Router::new()
        .route("/panels", get(|| async { Json(panels::catalog()) }))
        .route("/diagnose", post(diagnose_handler))
        .route("/chat/sessions", post(create_session_handler))
        .route(
            "/chat/sessions/{id}",
            get(get_session_handler).delete(delete_session_handler),
        )
        .route("/chat/sessions/{id}/messages", post(send_message_handler))
        .route("/market-trend", post(market_trend_handler))
        .route("/market-trend/popular", get(popular_crops_handler));

    Router::new()
        .nest("/api", api_routes)
        .nest("/admin", admin_routes)
        .route("/health", get(|| async { "OK" }))
        .fallback_service(ServeDir::new(public_dir.as_ref()))
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
        .layer(TraceLayer::new_for_http())
}
