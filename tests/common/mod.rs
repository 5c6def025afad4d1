#![allow(dead_code)]

use std::sync::{
    Arc, Mutex,
    atomic::{AtomicUsize, Ordering},
};
use std::time::Duration;

use agrigenius_backend::routes::create_router;
use agrigenius_backend::services::agronomist::{Agronomist, FragmentStream};
use agrigenius_backend::services::diagnosis::{CropImage, Diagnosis};
use agrigenius_backend::services::gemini::GeminiError;
use agrigenius_backend::services::market::{MarketSource, MarketTrend};
use agrigenius_backend::services::session_manager::ChatMessage;
use agrigenius_backend::state::{AppState, SharedState};
use async_trait::async_trait;
use axum::Router;
use futures_util::{StreamExt, stream};

pub const ADMIN_KEY: &str = "farm-admin";

pub enum ChatScript {
    Reply(Vec<&'static str>),
    FailBeforeStream,
    FailMidStream(Vec<&'static str>),
    /// First fragment, a pause, then the rest of the reply.
    Paused(&'static str, Duration, &'static str),
}

pub struct FakeAgronomist {
    pub diagnosis: Option<Diagnosis>,
    pub chat: ChatScript,
    pub trend: Option<MarketTrend>,
    pub calls: AtomicUsize,
    pub histories: Mutex<Vec<Vec<ChatMessage>>>,
    pub crops: Mutex<Vec<String>>,
}

impl Default for FakeAgronomist {
    fn default() -> Self {
        Self {
            diagnosis: Some(blight()),
            chat: ChatScript::Reply(vec!["Plant ", "in ", "spring."]),
            trend: Some(corn_trend()),
            calls: AtomicUsize::new(0),
            histories: Mutex::new(Vec::new()),
            crops: Mutex::new(Vec::new()),
        }
    }
}

impl FakeAgronomist {
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

fn unavailable() -> GeminiError {
    GeminiError::Status { status: 503, body: "overloaded".to_string() }
}

#[async_trait]
impl Agronomist for FakeAgronomist {
    async fn diagnose(&self, _image: &CropImage) -> Result<Diagnosis, GeminiError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.diagnosis.clone().ok_or_else(unavailable)
    }

    async fn chat_stream(
        &self,
        history: &[ChatMessage],
        _message: &str,
    ) -> Result<FragmentStream, GeminiError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.histories.lock().unwrap().push(history.to_vec());
        let items: Vec<Result<String, GeminiError>> = match &self.chat {
            ChatScript::Reply(parts) => parts.iter().map(|p| Ok(p.to_string())).collect(),
            ChatScript::FailBeforeStream => return Err(unavailable()),
            ChatScript::Paused(first, pause, rest) => {
                let (first, pause, rest) = (first.to_string(), *pause, rest.to_string());
                let head = stream::iter(vec![Ok::<_, GeminiError>(first)]);
                let tail = stream::once(async move {
                    tokio::time::sleep(pause).await;
                    Ok(rest)
                });
                return Ok(head.chain(tail).boxed());
            }
            ChatScript::FailMidStream(parts) => parts
                .iter()
                .map(|p| Ok(p.to_string()))
                .chain(std::iter::once(Err(unavailable())))
                .collect(),
        };
        Ok(stream::iter(items).boxed())
    }

    async fn market_trend(&self, crop: &str) -> Result<MarketTrend, GeminiError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.crops.lock().unwrap().push(crop.to_string());
        self.trend.clone().ok_or_else(unavailable)
    }
}

pub fn blight() -> Diagnosis {
    Diagnosis {
        is_healthy: false,
        disease: "Late Blight".to_string(),
        description: "Water-soaked lesions on leaves and stems.".to_string(),
        causes: vec!["Phytophthora infestans".to_string(), "Cool, wet weather".to_string()],
        organic_treatments: vec!["Copper-based fungicide".to_string()],
        chemical_treatments: vec!["Chlorothalonil".to_string(), "Mancozeb".to_string()],
    }
}

pub fn healthy() -> Diagnosis {
    Diagnosis {
        is_healthy: true,
        disease: "None".to_string(),
        description: "The leaf looks vigorous.".to_string(),
        causes: vec![],
        organic_treatments: vec![],
        chemical_treatments: vec![],
    }
}

pub fn corn_trend() -> MarketTrend {
    MarketTrend {
        summary: "Corn prices are steady with firm export demand.".to_string(),
        sources: vec![MarketSource {
            uri: "https://news.example/corn".to_string(),
            title: "Corn outlook".to_string(),
        }],
    }
}

pub fn app(fake: Arc<FakeAgronomist>) -> (Router, SharedState) {
    let state: SharedState = Arc::new(
        AppState::new(fake, Duration::from_secs(60)).with_admin_key(Some(ADMIN_KEY.to_string())),
    );
    let router = create_router("public").with_state(state.clone());
    (router, state)
}

/// (event name, data) pairs from a `text/event-stream` body.
pub fn parse_events(body: &str) -> Vec<(String, String)> {
    body.replace("\r\n", "\n")
        .split("\n\n")
        .filter_map(|block| {
            let mut name = None;
            let mut data = Vec::new();
            for line in block.lines() {
                if let Some(rest) = line.strip_prefix("event:") {
                    name = Some(rest.trim().to_string());
                } else if let Some(rest) = line.strip_prefix("data:") {
                    data.push(rest.strip_prefix(' ').unwrap_or(rest).to_string());
                }
            }
            name.map(|n| (n, data.join("\n")))
        })
        .collect()
}
