use serde::{Deserialize, Serialize};

#[derive(Debug, Clone)]
pub struct GenerationRequest {
    pub image_bytes: Vec<u8>,
    pub content_type: Option<String>,
    pub style_id: String,
    pub room_type_id: String,
    pub custom_prompt: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RefineRequest {
    pub image_url: String,
    pub prompt: String,
}

#[derive(Debug, Clone, PartialEq)]
pub enum PipelineResult {
    Generated { url: String },
    /// Canned image served without touching the model service.
    Demo { url: String },
}

impl PipelineResult {
    pub fn url(&self) -> &str {
        match self {
            PipelineResult::Generated { url } | PipelineResult::Demo { url } => url,
        }
    }

    pub fn is_demo(&self) -> bool {
        matches!(self, PipelineResult::Demo { .. })
    }
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateResponse {
    pub result_url: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}
