// src/message.rs
use serde::{Deserialize, Serialize};

use crate::services::session_manager::ChatMessage;

#[derive(Debug, Default, Deserialize, Serialize)]
pub struct DiagnoseRequest {
    /// A `data:` URL or bare base64.
    #[serde(default)]
    pub image: Option<String>,
    #[serde(default)]
    pub mime_type: Option<String>,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct ChatRequest {
    pub message: String,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct SessionResponse {
    pub session_id: String,
    pub messages: Vec<ChatMessage>,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct MarketTrendRequest {
    #[serde(default)]
    pub crop: String,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct PopularCropsResponse {
    pub default: String,
    pub crops: Vec<String>,
}

/// Payload of the `fragment`, `done` and `error` chat stream events.
#[derive(Debug, Deserialize, Serialize)]
pub struct StreamText {
    pub text: String,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct SessionList {
    pub count: usize,
    pub session_ids: Vec<String>,
}
