// src/services/session_manager.rs
use std::{
    collections::HashMap,
    fmt::Debug,
    sync::Arc,
    time::{Duration, Instant},
};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::RwLock;
use uuid::Uuid;

pub const WELCOME_MESSAGE: &str = "Hello! I am AgriBot, your AI farming assistant. How can I help you today? You can ask me about planting schedules, soil health, pest control, and more.";

pub const CHAT_FAILED: &str = "Sorry, I encountered an error. Please try again.";

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    User,
    Model,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: MessageRole,
    pub text: String,
}

impl ChatMessage {
    pub fn user(text: impl Into<String>) -> Self {
        Self { role: MessageRole::User, text: text.into() }
    }

    pub fn model(text: impl Into<String>) -> Self {
        Self { role: MessageRole::Model, text: text.into() }
    }
}

#[derive(Debug, Error, PartialEq)]
pub enum SessionError {
    #[error("Chat session '{0}' not found")]
    NotFound(String),

    #[error("A reply is already in progress for this chat")]
    TurnInProgress,
}

#[derive(Clone, Debug)]
pub struct Session {
    pub id: String,
    /// Everything the assistant panel displays, welcome and error messages included.
    pub transcript: Vec<ChatMessage>,
    /// Completed turns only. This is what the model sees.
    pub history: Vec<ChatMessage>,
    pub in_flight: bool,
    pub last_active: Instant,
}

impl Session {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            transcript: vec![ChatMessage::model(WELCOME_MESSAGE)],
            history: Vec::new(),
            in_flight: false,
            last_active: Instant::now(),
        }
    }
}

#[derive(Clone)]
pub struct SessionManager {
    inner: Arc<RwLock<HashMap<String, Session>>>,
    ttl: Duration,
}

impl Debug for SessionManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionManager")
            .field("ttl", &self.ttl)
            .finish()
    }
}

impl SessionManager {
    pub fn new(ttl: Duration) -> Self {
        Self {
            inner: Arc::new(RwLock::new(HashMap::new())),
            ttl,
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Create a fresh session and return its id.
    pub async fn create_session(&self) -> String {
        let id = Uuid::new_v4().to_string();
        let session = Session::new(id.clone());

        let mut guard = self.inner.write().await;
        guard.insert(id.clone(), session);
        id
    }

    /// Get a copy of the displayed messages.
    pub async fn get_transcript(&self, session_id: &str) -> Option<Vec<ChatMessage>> {
        let guard = self.inner.read().await;
        guard.get(session_id).map(|s| s.transcript.clone())
    }

    pub async fn is_in_flight(&self, session_id: &str) -> bool {
        let guard = self.inner.read().await;
        guard.get(session_id).is_some_and(|s| s.in_flight)
    }

    /// Mark a turn as started and append the user's message.
    /// Returns the model history to send along with it.
    pub async fn begin_turn(
        &self,
        session_id: &str,
        text: &str,
    ) -> Result<Vec<ChatMessage>, SessionError> {
        let mut guard = self.inner.write().await;
        let session = guard
            .get_mut(session_id)
            .ok_or_else(|| SessionError::NotFound(session_id.to_string()))?;
        if session.in_flight {
            return Err(SessionError::TurnInProgress);
        }
        session.in_flight = true;
        session.transcript.push(ChatMessage::user(text));
        session.last_active = Instant::now();
        Ok(session.history.clone())
    }

    /// Start the (empty) model message fragments will be appended to.
    pub async fn open_reply(&self, session_id: &str) {
        self.with_session(session_id, |s| s.transcript.push(ChatMessage::model(""))).await;
    }

    /// Concatenate a fragment onto the trailing message if it belongs to the model.
    pub async fn append_fragment(&self, session_id: &str, fragment: &str) -> bool {
        let mut appended = false;
        self.with_session(session_id, |s| {
            if let Some(last) = s.transcript.last_mut() {
                if last.role == MessageRole::Model {
                    last.text.push_str(fragment);
                    appended = true;
                }
            }
        })
        .await;
        appended
    }

    /// Record a completed exchange and release the turn.
    pub async fn finish_turn(&self, session_id: &str, user_text: &str, reply: &str) {
        self.with_session(session_id, |s| {
            s.history.push(ChatMessage::user(user_text));
            s.history.push(ChatMessage::model(reply));
            s.in_flight = false;
        })
        .await;
    }

    /// Show the error in the transcript and release the turn. The failed
    /// exchange is not added to the model history.
    pub async fn fail_turn(&self, session_id: &str) {
        self.with_session(session_id, |s| {
            s.transcript.push(ChatMessage::model(CHAT_FAILED));
            s.in_flight = false;
        })
        .await;
    }

    async fn with_session<F: FnOnce(&mut Session)>(&self, session_id: &str, f: F) {
        let mut guard = self.inner.write().await;
        if let Some(session) = guard.get_mut(session_id) {
            f(session);
            session.last_active = Instant::now();
        }
    }

    /// Remove a session by id
    pub async fn remove_session(&self, session_id: &str) -> bool {
        let mut guard = self.inner.write().await;
        guard.remove(session_id).is_some()
    }

    /// Remove sessions idle longer than ttl. Sessions with a reply in flight stay.
    pub async fn purge_expired(&self) -> usize {
        let mut guard = self.inner.write().await;
        let now = Instant::now();
        let before = guard.len();
        guard.retain(|_, s| s.in_flight || now.duration_since(s.last_active) < self.ttl);
        before - guard.len()
    }

    /// Number of sessions
    pub async fn len(&self) -> usize {
        let guard = self.inner.read().await;
        guard.len()
    }

    /// List session ids
    pub async fn list_session_ids(&self) -> Vec<String> {
        let guard = self.inner.read().await;
        guard.keys().cloned().collect()
    }
}
