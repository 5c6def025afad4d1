// src/routes/chat.rs
use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::sse::{Event, KeepAlive, KeepAliveStream, Sse},
};
use futures_util::{
    StreamExt,
    stream::{self, BoxStream},
};
use tokio::sync::mpsc;
use tracing::{error, info, warn};

use crate::{
    error::AppError,
    message::{ChatRequest, SessionResponse, StreamText},
    services::{
        gemini::GeminiError,
        metrics_manager::Feature,
        session_manager::{CHAT_FAILED, ChatMessage},
    },
    state::SharedState,
};

pub type EventStream = BoxStream<'static, Result<Event, axum::Error>>;

pub async fn create_session_handler(
    State(state): State<SharedState>,
) -> Result<(StatusCode, Json<SessionResponse>), AppError> {
    let session_id = state.sessions.create_session().await;
    let messages = state
        .sessions
        .get_transcript(&session_id)
        .await
        .ok_or_else(|| AppError::NotFound(format!("Chat session '{session_id}' not found")))?;

    info!(%session_id, "chat session created");
    Ok((StatusCode::CREATED, Json(SessionResponse { session_id, messages })))
}

pub async fn get_session_handler(
    State(state): State<SharedState>,
    Path(session_id): Path<String>,
) -> Result<Json<SessionResponse>, AppError> {
    let messages = state
        .sessions
        .get_transcript(&session_id)
        .await
        .ok_or_else(|| AppError::NotFound(format!("Chat session '{session_id}' not found")))?;
    Ok(Json(SessionResponse { session_id, messages }))
}

pub async fn delete_session_handler(
    State(state): State<SharedState>,
    Path(session_id): Path<String>,
) -> Result<StatusCode, AppError> {
    if state.sessions.remove_session(&session_id).await {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(AppError::NotFound(format!("Chat session '{session_id}' not found")))
    }
}

/// Stream the assistant's reply as server-sent events:
/// `fragment`* then `done`, or `error` if the model call fails.
pub async fn send_message_handler(
    State(state): State<SharedState>,
    Path(session_id): Path<String>,
    Json(payload): Json<ChatRequest>,
) -> Result<Sse<KeepAliveStream<EventStream>>, AppError> {
    let message = payload.message.trim();
    if message.is_empty() {
        return Err(AppError::BadRequest("Message cannot be empty".to_string()));
    }

    let history = state.sessions.begin_turn(&session_id, message).await?;
    state.metrics.record_request(Feature::Chat).await;

    // The turn runs detached so the session is settled even if the client goes away.
    let (tx, rx) = mpsc::channel(64);
    tokio::spawn(run_turn(state.clone(), session_id, message.to_string(), history, tx));

    let events = stream::unfold(rx, |mut rx| async move {
        rx.recv().await.map(|event| (Ok::<_, axum::Error>(event), rx))
    });

    Ok(Sse::new(events.boxed()).keep_alive(KeepAlive::default()))
}

async fn run_turn(
    state: SharedState,
    session_id: String,
    message: String,
    history: Vec<ChatMessage>,
    tx: mpsc::Sender<Event>,
) {
    match stream_reply(&state, &session_id, &message, &history, &tx).await {
        Ok(reply) => {
            state.sessions.finish_turn(&session_id, &message, &reply).await;
            info!(%session_id, chars = reply.len(), "chat reply complete");
            send(&tx, "done", reply).await;
        }
        Err(err) => {
            error!(%session_id, error = %err, "chat turn failed");
            state.metrics.record_failure(Feature::Chat).await;
            state.sessions.fail_turn(&session_id).await;
            send(&tx, "error", CHAT_FAILED.to_string()).await;
        }
    }
}

async fn stream_reply(
    state: &SharedState,
    session_id: &str,
    message: &str,
    history: &[ChatMessage],
    tx: &mpsc::Sender<Event>,
) -> Result<String, GeminiError> {
    let mut fragments = state.agronomist.chat_stream(history, message).await?;
    state.sessions.open_reply(session_id).await;

    let mut reply = String::new();
    while let Some(fragment) = fragments.next().await {
        let fragment = fragment?;
        state.sessions.append_fragment(session_id, &fragment).await;
        reply.push_str(&fragment);
        send(tx, "fragment", fragment).await;
    }
    Ok(reply)
}

async fn send(tx: &mpsc::Sender<Event>, kind: &'static str, text: String) {
    match Event::default().event(kind).json_data(StreamText { text }) {
        // A closed channel means the client left; the session is still updated.
        Ok(event) => {
            let _ = tx.send(event).await;
        }
        Err(err) => warn!(error = %err, "failed to encode {kind} event"),
    }
}
