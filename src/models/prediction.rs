use crate::error::{Result, StagingError};
use serde::{Deserialize, Serialize};

/// Instruction-driven edit of a whole image (Flux Kontext).
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct EditInput {
    pub prompt: String,
    pub input_image: String,
    pub aspect_ratio: String,
    pub output_format: String,
    pub safety_tolerance: u8,
}

impl EditInput {
    pub fn new(input_image: impl Into<String>, prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            input_image: input_image.into(),
            aspect_ratio: "match_input_image".to_string(),
            output_format: "jpg".to_string(),
            safety_tolerance: 2,
        }
    }
}

/// Masked generation: white mask pixels are replaced, black are kept (Flux Fill).
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct InpaintInput {
    pub image: String,
    pub mask: String,
    pub prompt: String,
    pub guidance: f32,
    pub steps: u32,
    pub output_format: String,
}

/// Input of the dedicated proplabs staging model.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct VirtualStagingInput {
    pub image: String,
    pub room: String,
    pub furniture_style: String,
    pub furniture_items: String,
    pub replicate_api_key: String,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(untagged)]
pub enum ModelInput {
    Edit(EditInput),
    Inpaint(InpaintInput),
    VirtualStaging(VirtualStagingInput),
}

impl ModelInput {
    pub fn kind(&self) -> &'static str {
        match self {
            ModelInput::Edit(_) => "edit",
            ModelInput::Inpaint(_) => "inpaint",
            ModelInput::VirtualStaging(_) => "virtual-staging",
        }
    }

    pub fn prompt(&self) -> Option<&str> {
        match self {
            ModelInput::Edit(input) => Some(&input.prompt),
            ModelInput::Inpaint(input) => Some(&input.prompt),
            ModelInput::VirtualStaging(_) => None,
        }
    }
}

/// The shapes a model result arrives in.
///
/// Variants are tried top to bottom when deserializing, which is also the
/// order in which [`ModelOutput::normalize`] extracts the URL.
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum ModelOutput {
    Plain(String),
    File { url: String },
    UrlLike { href: String },
    List(Vec<ModelOutput>),
    Other(serde_json::Value),
}

impl ModelOutput {
    pub fn plain(url: impl Into<String>) -> Self {
        ModelOutput::Plain(url.into())
    }

    /// Resolve to a single non-empty URL string.
    pub fn normalize(&self) -> Result<String> {
        self.extract_url().ok_or_else(|| {
            StagingError::NoOutput(format!("model returned no usable image URL: {}", self.describe()))
        })
    }

    fn extract_url(&self) -> Option<String> {
        let url = match self {
            ModelOutput::Plain(url) => url.as_str(),
            ModelOutput::File { url } => url.as_str(),
            ModelOutput::UrlLike { href } => href.as_str(),
            ModelOutput::List(items) => return items.iter().find_map(ModelOutput::extract_url),
            ModelOutput::Other(_) => return None,
        };
        let url = url.trim();
        (!url.is_empty()).then(|| url.to_string())
    }

    fn describe(&self) -> String {
        match self {
            ModelOutput::Plain(_) => "empty string".to_string(),
            ModelOutput::File { .. } | ModelOutput::UrlLike { .. } => "empty url".to_string(),
            ModelOutput::List(items) => format!("list of {} without urls", items.len()),
            ModelOutput::Other(value) => {
                let raw = value.to_string();
                raw.chars().take(120).collect()
            }
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct PredictionUrls {
    pub get: Option<String>,
}

/// Prediction record returned by the Replicate HTTP API.
#[derive(Debug, Clone, Deserialize)]
pub struct Prediction {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub output: Option<ModelOutput>,
    #[serde(default)]
    pub error: Option<serde_json::Value>,
    #[serde(default)]
    pub urls: Option<PredictionUrls>,
}

impl Prediction {
    pub fn is_succeeded(&self) -> bool {
        self.status.eq_ignore_ascii_case("succeeded")
    }

    pub fn is_pending(&self) -> bool {
        matches!(
            self.status.to_ascii_lowercase().as_str(),
            "starting" | "processing"
        )
    }

    pub fn poll_url(&self) -> Option<&str> {
        self.urls
            .as_ref()
            .and_then(|urls| urls.get.as_deref())
            .map(str::trim)
            .filter(|url| !url.is_empty())
    }

    pub fn error_text(&self) -> String {
        match &self.error {
            Some(serde_json::Value::String(text)) => text.clone(),
            Some(value) if !value.is_null() => value.to_string(),
            _ => format!("prediction ended with status '{}'", self.status),
        }
    }
}
