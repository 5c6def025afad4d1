// src/services/gemini.rs
//! Thin client for the Gemini `generateContent` REST API.

use std::{collections::VecDeque, time::Duration};

use futures_util::{StreamExt, stream::BoxStream};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::config::Config;

#[derive(Debug, Error)]
pub enum GeminiError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Gemini returned status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("malformed response: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("response contained no text")]
    EmptyResponse,

    #[error("Gemini API error {code}: {message}")]
    Api { code: i64, message: String },

    #[error("response blocked: {0}")]
    Blocked(String),
}

pub type Result<T> = std::result::Result<T, GeminiError>;

pub type ResponseStream = BoxStream<'static, Result<GenerateContentResponse>>;

// ---- request wire types ----

#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateContentRequest {
    pub contents: Vec<Content>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub system_instruction: Option<Content>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub generation_config: Option<GenerationConfig>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub tools: Vec<Tool>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Content {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    #[serde(default)]
    pub parts: Vec<Part>,
}

impl Content {
    pub fn user(parts: Vec<Part>) -> Self {
        Self { role: Some("user".to_string()), parts }
    }

    pub fn model(text: impl Into<String>) -> Self {
        Self { role: Some("model".to_string()), parts: vec![Part::text(text)] }
    }

    /// System instructions carry no role.
    pub fn instruction(text: impl Into<String>) -> Self {
        Self { role: None, parts: vec![Part::text(text)] }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Part {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub inline_data: Option<InlineData>,
}

impl Part {
    pub fn text(text: impl Into<String>) -> Self {
        Self { text: Some(text.into()), inline_data: None }
    }

    pub fn inline(mime_type: impl Into<String>, data: impl Into<String>) -> Self {
        Self {
            text: None,
            inline_data: Some(InlineData { mime_type: mime_type.into(), data: data.into() }),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct InlineData {
    pub mime_type: String,
    pub data: String,
}

#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response_mime_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response_schema: Option<serde_json::Value>,
}

#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Tool {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub google_search: Option<GoogleSearch>,
}

impl Tool {
    pub fn google_search() -> Self {
        Self { google_search: Some(GoogleSearch {}) }
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct GoogleSearch {}

// ---- response wire types ----

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateContentResponse {
    #[serde(default)]
    pub candidates: Vec<Candidate>,
    /// Set when the server reports a failure, which can arrive mid-stream.
    #[serde(default)]
    pub error: Option<ApiError>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ApiError {
    #[serde(default)]
    pub code: i64,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub status: Option<String>,
}

const BLOCKING_FINISH_REASONS: [&str; 4] = ["SAFETY", "PROHIBITED_CONTENT", "BLOCKLIST", "SPII"];

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Candidate {
    #[serde(default)]
    pub content: Option<Content>,
    #[serde(default)]
    pub finish_reason: Option<String>,
    #[serde(default)]
    pub grounding_metadata: Option<GroundingMetadata>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GroundingMetadata {
    #[serde(default)]
    pub grounding_chunks: Vec<GroundingChunk>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct GroundingChunk {
    #[serde(default)]
    pub web: Option<WebSource>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct WebSource {
    #[serde(default)]
    pub uri: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
}

impl GenerateContentResponse {
    /// Turn an error payload or a blocked candidate into an error.
    pub fn into_checked(mut self) -> Result<Self> {
        if let Some(err) = self.error.take() {
            let message = match err.status {
                Some(status) => format!("{status}: {}", err.message),
                None => err.message,
            };
            return Err(GeminiError::Api { code: err.code, message });
        }
        if let Some(reason) = self
            .candidates
            .first()
            .and_then(|c| c.finish_reason.as_deref())
            .filter(|r| BLOCKING_FINISH_REASONS.contains(r))
        {
            return Err(GeminiError::Blocked(reason.to_string()));
        }
        Ok(self)
    }

    /// Concatenated text of the first candidate's parts.
    pub fn text(&self) -> String {
        self.candidates
            .first()
            .and_then(|c| c.content.as_ref())
            .map(|content| {
                content
                    .parts
                    .iter()
                    .filter_map(|p| p.text.as_deref())
                    .collect::<String>()
            })
            .unwrap_or_default()
    }

    pub fn grounding_chunks(&self) -> &[GroundingChunk] {
        self.candidates
            .first()
            .and_then(|c| c.grounding_metadata.as_ref())
            .map(|m| m.grounding_chunks.as_slice())
            .unwrap_or(&[])
    }
}

// ---- client ----

#[derive(Clone)]
pub struct GeminiClient {
    client: Client,
    base_url: String,
    model: String,
    api_key: String,
    timeout: Duration,
}

impl std::fmt::Debug for GeminiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GeminiClient")
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .finish()
    }
}

impl GeminiClient {
    pub fn new(
        base_url: &str,
        model: &str,
        api_key: &str,
        timeout: Duration,
    ) -> Result<Self> {
        // `timeout` bounds a whole one-shot call. Streams are only bounded by
        // the gap between chunks, so long replies are not cut off.
        let client = Client::builder()
            .connect_timeout(timeout)
            .read_timeout(timeout)
            .build()?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            model: model.to_string(),
            api_key: api_key.to_string(),
            timeout,
        })
    }

    pub fn from_config(config: &Config) -> Result<Self> {
        Self::new(&config.api_base, &config.model, &config.api_key, config.request_timeout)
    }

    fn endpoint(&self, method: &str) -> String {
        format!("{}/models/{}:{}", self.base_url, self.model, method)
    }

    async fn post(
        &self,
        url: &str,
        request: &GenerateContentRequest,
        deadline: Option<Duration>,
    ) -> Result<reqwest::Response> {
        let mut builder = self
            .client
            .post(url)
            .header("x-goog-api-key", &self.api_key)
            .json(request);
        if let Some(deadline) = deadline {
            builder = builder.timeout(deadline);
        }
        let response = builder.send().await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(GeminiError::Status { status: status.as_u16(), body });
        }
        Ok(response)
    }

    /// One-shot generation.
    pub async fn generate_content(
        &self,
        request: &GenerateContentRequest,
    ) -> Result<GenerateContentResponse> {
        let url = self.endpoint("generateContent");
        debug!(model = %self.model, "sending generateContent request");
        let response = self.post(&url, request, Some(self.timeout)).await?;
        let bytes = response.bytes().await?;
        serde_json::from_slice::<GenerateContentResponse>(&bytes)?.into_checked()
    }

    /// Streaming generation. Items arrive in the order the server sends them.
    pub async fn stream_generate_content(
        &self,
        request: &GenerateContentRequest,
    ) -> Result<ResponseStream> {
        let url = format!("{}?alt=sse", self.endpoint("streamGenerateContent"));
        debug!(model = %self.model, "sending streamGenerateContent request");
        let response = self.post(&url, request, None).await?;

        let bytes = response.bytes_stream().boxed().fuse();
        let state = (bytes, SseDecoder::default(), VecDeque::<String>::new());

        let stream = futures_util::stream::unfold(state, |(mut bytes, mut decoder, mut pending)| async move {
            loop {
                if let Some(payload) = pending.pop_front() {
                    let item = serde_json::from_str::<GenerateContentResponse>(&payload)
                        .map_err(GeminiError::from)
                        .and_then(GenerateContentResponse::into_checked);
                    return Some((item, (bytes, decoder, pending)));
                }
                match bytes.next().await {
                    Some(Ok(chunk)) => pending.extend(decoder.push(&chunk)),
                    Some(Err(e)) => return Some((Err(e.into()), (bytes, decoder, pending))),
                    None => {
                        pending.extend(decoder.finish());
                        if pending.is_empty() {
                            return None;
                        }
                    }
                }
            }
        });

        Ok(stream.boxed())
    }
}

/// Incremental `text/event-stream` decoder yielding the `data:` payload of each event.
#[derive(Debug, Default)]
pub struct SseDecoder {
    buffer: Vec<u8>,
}

impl SseDecoder {
    /// Feed raw bytes; returns the payloads of every event completed by them.
    pub fn push(&mut self, chunk: &[u8]) -> Vec<String> {
        self.buffer.extend(chunk.iter().copied().filter(|b| *b != b'\r'));

        let mut events = Vec::new();
        while let Some(pos) = self.buffer.windows(2).position(|w| w == b"\n\n") {
            let block: Vec<u8> = self.buffer.drain(..pos + 2).collect();
            if let Some(data) = Self::parse_block(&block[..pos]) {
                events.push(data);
            }
        }
        events
    }

    /// Flush a trailing event that was not terminated by a blank line.
    pub fn finish(&mut self) -> Vec<String> {
        let block = std::mem::take(&mut self.buffer);
        Self::parse_block(&block).into_iter().collect()
    }

    fn parse_block(block: &[u8]) -> Option<String> {
        let text = String::from_utf8_lossy(block);
        let data: Vec<&str> = text
            .lines()
            .filter_map(|line| line.strip_prefix("data:"))
            .map(|rest| rest.strip_prefix(' ').unwrap_or(rest))
            .collect();
        if data.is_empty() { None } else { Some(data.join("\n")) }
    }
}
