use thiserror::Error;

#[derive(Debug, Error)]
pub enum StagingError {
    #[error("Validation error: {0}")]
    Validation(String),
    #[error("Rate limited: {0}")]
    RateLimited(String),
    #[error("No output: {0}")]
    NoOutput(String),
    #[error("Model {model} still rate limited after {attempts} attempts: {last_error}")]
    ExhaustedRetries {
        model: String,
        attempts: u32,
        last_error: String,
    },
    #[error("Configuration error: {0}")]
    Config(String),
    #[error("Request error: {0}")]
    Request(String),
    #[error("Response error: {0}")]
    Response(String),
    #[error("Image error: {0}")]
    Image(String),
    #[error("Serialization error: {0}")]
    Serialization(String),
    #[error("Internal error: {0}")]
    Internal(String),
}

impl StagingError {
    /// Caller-side mistakes are reported as such; everything else is a server failure.
    pub fn is_client_error(&self) -> bool {
        matches!(self, StagingError::Validation(_))
    }
}

impl From<reqwest::Error> for StagingError {
    fn from(err: reqwest::Error) -> Self {
        StagingError::Request(err.to_string())
    }
}

impl From<image::ImageError> for StagingError {
    fn from(err: image::ImageError) -> Self {
        StagingError::Image(err.to_string())
    }
}

impl From<serde_json::Error> for StagingError {
    fn from(err: serde_json::Error) -> Self {
        StagingError::Serialization(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, StagingError>;
