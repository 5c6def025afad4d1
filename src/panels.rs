// src/panels.rs
use serde::Serialize;

/// The three views of the app shell.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub enum Panel {
    #[default]
    CropDoctor,
    FarmingAssistant,
    MarketWatch,
}

impl Panel {
    pub const ALL: [Panel; 3] = [Panel::CropDoctor, Panel::FarmingAssistant, Panel::MarketWatch];

    pub fn title(&self) -> &'static str {
        match self {
            Panel::CropDoctor => "Crop Doctor",
            Panel::FarmingAssistant => "Farming Assistant",
            Panel::MarketWatch => "Market Watch",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            Panel::CropDoctor => {
                "Upload a photo of a plant leaf to get an AI diagnosis for diseases and pests."
            }
            Panel::FarmingAssistant => "Chat with our AI expert to get instant farming advice.",
            Panel::MarketWatch => {
                "Get AI-powered market analysis for your crops, grounded in the latest web search results."
            }
        }
    }
}

#[derive(Debug, Serialize)]
pub struct PanelInfo {
    pub id: Panel,
    pub title: &'static str,
    pub description: &'static str,
}

#[derive(Debug, Serialize)]
pub struct PanelCatalog {
    pub default: Panel,
    pub panels: Vec<PanelInfo>,
}

pub fn catalog() -> PanelCatalog {
    PanelCatalog {
        default: Panel::default(),
        panels: Panel::ALL
            .iter()
            .map(|p| PanelInfo { id: *p, title: p.title(), description: p.description() })
            .collect(),
    }
}
