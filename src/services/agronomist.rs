// src/services/agronomist.rs
//! The three model-backed operations behind the panels.

use async_trait::async_trait;
use futures_util::{StreamExt, future, stream::BoxStream};
use tracing::debug;

use super::diagnosis::{self, CropImage, DIAGNOSIS_PROMPT, Diagnosis};
use super::gemini::{
    Content, GeminiClient, GeminiError, GenerateContentRequest, GenerationConfig, Part, Tool,
};
use super::market::{self, MarketTrend};
use super::session_manager::{ChatMessage, MessageRole};

pub const SYSTEM_INSTRUCTION: &str = "You are AgriBot, a friendly and knowledgeable AI farming assistant. Your goal is to provide clear, practical, and helpful advice to farmers on a wide range of agricultural topics. Be concise and easy to understand.";

/// Reply text, fragment by fragment, in arrival order.
pub type FragmentStream = BoxStream<'static, Result<String, GeminiError>>;

#[async_trait]
pub trait Agronomist: Send + Sync {
    async fn diagnose(&self, image: &CropImage) -> Result<Diagnosis, GeminiError>;

    /// `history` holds the completed turns of the conversation so far.
    async fn chat_stream(
        &self,
        history: &[ChatMessage],
        message: &str,
    ) -> Result<FragmentStream, GeminiError>;

    async fn market_trend(&self, crop: &str) -> Result<MarketTrend, GeminiError>;
}

pub fn diagnosis_request(image: &CropImage) -> GenerateContentRequest {
    GenerateContentRequest {
        contents: vec![Content::user(vec![
            Part::inline(&image.mime_type, &image.data),
            Part::text(DIAGNOSIS_PROMPT),
        ])],
        generation_config: Some(GenerationConfig {
            response_mime_type: Some("application/json".to_string()),
            response_schema: Some(diagnosis::response_schema()),
        }),
        ..Default::default()
    }
}

pub fn chat_request(history: &[ChatMessage], message: &str) -> GenerateContentRequest {
    let mut contents: Vec<Content> = history
        .iter()
        .map(|m| match m.role {
            MessageRole::User => Content::user(vec![Part::text(&m.text)]),
            MessageRole::Model => Content::model(&m.text),
        })
        .collect();
    contents.push(Content::user(vec![Part::text(message)]));

    GenerateContentRequest {
        contents,
        system_instruction: Some(Content::instruction(SYSTEM_INSTRUCTION)),
        ..Default::default()
    }
}

pub fn market_request(crop: &str) -> GenerateContentRequest {
    GenerateContentRequest {
        contents: vec![Content::user(vec![Part::text(market::market_prompt(crop))])],
        tools: vec![Tool::google_search()],
        ..Default::default()
    }
}

#[async_trait]
impl Agronomist for GeminiClient {
    async fn diagnose(&self, image: &CropImage) -> Result<Diagnosis, GeminiError> {
        let response = self.generate_content(&diagnosis_request(image)).await?;
        let text = response.text();
        if text.trim().is_empty() {
            return Err(GeminiError::EmptyResponse);
        }
        Ok(serde_json::from_str(text.trim())?)
    }

    async fn chat_stream(
        &self,
        history: &[ChatMessage],
        message: &str,
    ) -> Result<FragmentStream, GeminiError> {
        debug!(turns = history.len() / 2, "starting chat turn");
        let responses = self.stream_generate_content(&chat_request(history, message)).await?;
        let fragments = responses
            .map(|item| item.map(|response| response.text()))
            .filter(|item| future::ready(!matches!(item, Ok(text) if text.is_empty())));
        Ok(fragments.boxed())
    }

    async fn market_trend(&self, crop: &str) -> Result<MarketTrend, GeminiError> {
        let response = self.generate_content(&market_request(crop)).await?;
        let summary = response.text();
        if summary.trim().is_empty() {
            return Err(GeminiError::EmptyResponse);
        }
        Ok(MarketTrend {
            summary,
            sources: market::sources_from_grounding(response.grounding_chunks()),
        })
    }
}
