// src/services/market.rs
use serde::{Deserialize, Serialize};

use super::gemini::GroundingChunk;

pub const MARKET_FAILED: &str =
    "Failed to retrieve market trends. The AI may be busy, please try again later.";

pub const EMPTY_CROP: &str = "Please enter a crop name.";

pub const DEFAULT_CROP: &str = "Wheat";

pub const POPULAR_CROPS: [&str; 6] = ["Corn", "Soybeans", "Rice", "Potatoes", "Tomatoes", "Cotton"];

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MarketSource {
    pub uri: String,
    pub title: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MarketTrend {
    pub summary: String,
    pub sources: Vec<MarketSource>,
}

pub fn market_prompt(crop: &str) -> String {
    format!(
        "Provide a brief market analysis and trend summary for {crop} based on recent news. \
         Focus on price, demand, and future outlook in 3-4 sentences."
    )
}

/// Returns the trimmed crop name, or `None` when nothing usable was entered.
pub fn normalize_crop(raw: &str) -> Option<&str> {
    let crop = raw.trim();
    (!crop.is_empty()).then_some(crop)
}

/// Web citations in grounding order. Chunks without a URI are dropped and a
/// missing title falls back to the URI.
pub fn sources_from_grounding(chunks: &[GroundingChunk]) -> Vec<MarketSource> {
    chunks
        .iter()
        .filter_map(|chunk| chunk.web.as_ref())
        .filter_map(|web| {
            let uri = web.uri.as_deref().map(str::trim).filter(|u| !u.is_empty())?;
            let title = web
                .title
                .as_deref()
                .map(str::trim)
                .filter(|t| !t.is_empty())
                .unwrap_or(uri);
            Some(MarketSource { uri: uri.to_string(), title: title.to_string() })
        })
        .collect()
}
