// src/routes/admin.rs
use axum::{Json, extract::{FromRequestParts, State}, http::request::Parts};

use crate::{
    error::AppError,
    message::SessionList,
    services::metrics_manager::MetricsData,
    state::SharedState,
};

/// Passes only when `x-admin-key` matches the configured key. With no key
/// configured every admin request is refused.
pub struct AdminKey;

impl FromRequestParts<SharedState> for AdminKey {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &SharedState,
    ) -> Result<Self, Self::Rejection> {
        let provided = parts.headers.get("x-admin-key").and_then(|v| v.to_str().ok());
        match (state.admin_key.as_deref(), provided) {
            (Some(expected), Some(given)) if expected == given => Ok(AdminKey),
            _ => Err(AppError::Unauthorized("Invalid admin key".to_string())),
        }
    }
}

pub async fn get_metrics_handler(
    _admin: AdminKey,
    State(state): State<SharedState>,
) -> Json<MetricsData> {
    Json(state.metrics.get_metrics().await)
}

pub async fn list_sessions_handler(
    _admin: AdminKey,
    State(state): State<SharedState>,
) -> Json<SessionList> {
    let session_ids = state.sessions.list_session_ids().await;
    Json(SessionList { count: session_ids.len(), session_ids })
}
