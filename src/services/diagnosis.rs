// src/services/diagnosis.rs
use base64::{Engine, engine::general_purpose::STANDARD};
use serde::{Deserialize, Serialize};
use serde_json::json;
use thiserror::Error;

pub const MAX_IMAGE_BYTES: usize = 10 * 1024 * 1024;

pub const DIAGNOSIS_FAILED: &str = "Failed to get a diagnosis from the AI. Please try again.";

pub const DIAGNOSIS_PROMPT: &str = "You are an expert agronomist and plant pathologist. Analyze this image of a plant. Identify if it's healthy or diseased. If diseased, provide the common name, a description, common causes, and suggest 2-3 organic and chemical treatment options. Respond in the requested JSON format.";

#[derive(Debug, Error, PartialEq)]
pub enum ImageError {
    #[error("Please select an image first.")]
    Missing,

    #[error("Image type is missing.")]
    MissingMimeType,

    #[error("Unsupported file type '{0}'. Please upload an image.")]
    NotAnImage(String),

    #[error("Image data is not valid base64.")]
    InvalidEncoding,

    #[error("Image is too large. The limit is 10MB.")]
    TooLarge,
}

/// A validated image ready to be sent inline to the model.
#[derive(Debug, Clone, PartialEq)]
pub struct CropImage {
    pub mime_type: String,
    pub data: String,
}

impl CropImage {
    /// Accepts either a `data:<mime>;base64,<payload>` URL or raw base64 with
    /// a separate MIME type.
    pub fn parse(image: Option<&str>, mime_type: Option<&str>) -> Result<Self, ImageError> {
        let image = image.map(str::trim).filter(|s| !s.is_empty()).ok_or(ImageError::Missing)?;

        let (url_mime, data) = match image.strip_prefix("data:") {
            Some(rest) => {
                let (header, payload) = rest.split_once(',').ok_or(ImageError::InvalidEncoding)?;
                let mime = header.strip_suffix(";base64").ok_or(ImageError::InvalidEncoding)?;
                (Some(mime), payload)
            }
            None => (None, image),
        };

        let mime_type = mime_type
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .or(url_mime.filter(|s| !s.is_empty()))
            .ok_or(ImageError::MissingMimeType)?
            .to_ascii_lowercase();

        if !mime_type.starts_with("image/") {
            return Err(ImageError::NotAnImage(mime_type));
        }

        if data.is_empty() {
            return Err(ImageError::Missing);
        }
        // base64 inflates by 4/3; reject obviously oversized payloads before decoding.
        if data.len() / 4 * 3 > MAX_IMAGE_BYTES + 3 {
            return Err(ImageError::TooLarge);
        }
        let decoded = STANDARD.decode(data).map_err(|_| ImageError::InvalidEncoding)?;
        if decoded.len() > MAX_IMAGE_BYTES {
            return Err(ImageError::TooLarge);
        }

        Ok(Self { mime_type, data: data.to_string() })
    }
}

/// Structured result of the plant health analysis.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Diagnosis {
    pub is_healthy: bool,
    pub disease: String,
    pub description: String,
    #[serde(default)]
    pub causes: Vec<String>,
    #[serde(default)]
    pub organic_treatments: Vec<String>,
    #[serde(default)]
    pub chemical_treatments: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ReportSection {
    pub title: String,
    pub items: Vec<String>,
}

/// What the Crop Doctor panel shows for a diagnosis.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DiagnosisReport {
    pub headline: String,
    pub diagnosis: Diagnosis,
    pub sections: Vec<ReportSection>,
}

impl Diagnosis {
    /// Causes and treatments are only shown for unhealthy plants.
    pub fn report(self) -> DiagnosisReport {
        let headline = if self.is_healthy {
            "Healthy Plant".to_string()
        } else {
            self.disease.clone()
        };

        let sections = if self.is_healthy {
            Vec::new()
        } else {
            vec![
                section("Common Causes", &self.causes),
                section("Organic Treatments", &self.organic_treatments),
                section("Chemical Treatments", &self.chemical_treatments),
            ]
        };

        DiagnosisReport { headline, diagnosis: self, sections }
    }
}

fn section(title: &str, items: &[String]) -> ReportSection {
    ReportSection { title: title.to_string(), items: items.to_vec() }
}

/// JSON schema the model must answer with.
pub fn response_schema() -> serde_json::Value {
    let list = |description: &str| {
        json!({ "type": "ARRAY", "items": { "type": "STRING" }, "description": description })
    };
    json!({
        "type": "OBJECT",
        "properties": {
            "is_healthy": { "type": "BOOLEAN", "description": "Is the plant in the image healthy?" },
            "disease": {
                "type": "STRING",
                "description": "The common name of the disease or pest. \"None\" if healthy."
            },
            "description": {
                "type": "STRING",
                "description": "A brief description of the disease/pest and its symptoms."
            },
            "causes": list("A list of common causes for this issue."),
            "organic_treatments": list("A list of 2-3 suggested organic treatment options."),
            "chemical_treatments": list("A list of 2-3 suggested chemical treatment options.")
        },
        "required": [
            "is_healthy", "disease", "description",
            "causes", "organic_treatments", "chemical_treatments"
        ]
    })
}
