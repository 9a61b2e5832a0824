use crate::{
    config::ReplicateConfig,
    error::{Result, StagingError},
    models::{ModelInput, ModelOutput, Prediction},
};
use async_trait::async_trait;
use reqwest::{Client, Response, StatusCode};
use serde_json::json;
use std::time::Instant;

/// Seam between the pipeline and the hosted model service.
#[async_trait]
pub trait ModelRunner: Send + Sync {
    async fn run(&self, model: &str, input: &ModelInput) -> Result<ModelOutput>;
}

#[derive(Clone)]
pub struct ReplicateRunner {
    http: Client,
    config: ReplicateConfig,
    token: String,
}

impl ReplicateRunner {
    pub fn new(config: ReplicateConfig) -> Result<Self> {
        let token = config
            .api_token
            .clone()
            .ok_or_else(|| StagingError::Config("Replicate API token is required".into()))?;

        Ok(Self {
            http: Client::new(),
            config,
            token,
        })
    }

    /// `owner/name:version` runs a pinned version, `owner/name` the model's latest.
    fn prediction_request(&self, model: &str, input: &ModelInput) -> (String, serde_json::Value) {
        match model.split_once(':') {
            Some((_, version)) => (
                format!("{}/predictions", self.config.api_base),
                json!({ "version": version, "input": input }),
            ),
            None => (
                format!("{}/models/{}/predictions", self.config.api_base, model),
                json!({ "input": input }),
            ),
        }
    }

    async fn read_prediction(label: &str, response: Response) -> Result<Prediction> {
        let status = response.status();
        if status == StatusCode::TOO_MANY_REQUESTS {
            let body = response.text().await.unwrap_or_default();
            return Err(StagingError::RateLimited(format!(
                "{} failed with status 429 Too Many Requests: {}",
                label,
                truncate(&body, 512)
            )));
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(StagingError::Response(format!(
                "{} failed with status {}: {}",
                label,
                status.as_u16(),
                truncate(&body, 512)
            )));
        }

        let body = response.text().await?;
        serde_json::from_str(&body).map_err(|e| {
            StagingError::Response(format!("{} returned malformed prediction: {}", label, e))
        })
    }

    async fn poll(&self, poll_url: &str) -> Result<Prediction> {
        let started = Instant::now();
        loop {
            let response = self
                .http
                .get(poll_url)
                .bearer_auth(&self.token)
                .send()
                .await
                .map_err(|e| {
                    StagingError::Request(format!("Replicate poll request failed ({}): {}", poll_url, e))
                })?;
            // Throttled polls keep waiting on the same prediction.
            if response.status() == StatusCode::TOO_MANY_REQUESTS {
                log::warn!("⚠️  Replicate poll throttled, polling {} again", poll_url);
            } else {
                let prediction = Self::read_prediction("Replicate poll", response).await?;
                if !prediction.is_pending() {
                    return Ok(prediction);
                }
            }
            if started.elapsed() >= self.config.poll_timeout {
                return Err(StagingError::Response(format!(
                    "Replicate polling timed out after {:.1}s",
                    self.config.poll_timeout.as_secs_f64()
                )));
            }
            tokio::time::sleep(self.config.poll_interval).await;
        }
    }
}

#[async_trait]
impl ModelRunner for ReplicateRunner {
    async fn run(&self, model: &str, input: &ModelInput) -> Result<ModelOutput> {
        let (endpoint, payload) = self.prediction_request(model, input);

        log::info!("Running model: {} ({})", model, input.kind());
        if let Some(prompt) = input.prompt() {
            log::debug!("Prompt for {}: {}", model, prompt);
        }

        let response = self
            .http
            .post(&endpoint)
            .bearer_auth(&self.token)
            .header("Prefer", "wait")
            .json(&payload)
            .send()
            .await
            .map_err(|e| StagingError::Request(format!("Replicate request failed ({}): {}", endpoint, e)))?;
        let mut prediction = Self::read_prediction("Replicate", response).await?;

        if prediction.is_pending() {
            let poll_url = prediction
                .poll_url()
                .ok_or_else(|| StagingError::Response("Replicate prediction missing poll URL".into()))?
                .to_string();
            log::debug!("Prediction still running, polling {}", poll_url);
            prediction = self.poll(&poll_url).await?;
        }

        if !prediction.is_succeeded() {
            return Err(StagingError::Response(format!(
                "Replicate prediction {} failed: {}",
                prediction.id.as_deref().unwrap_or("<unknown>"),
                prediction.error_text()
            )));
        }

        Ok(prediction
            .output
            .unwrap_or(ModelOutput::Other(serde_json::Value::Null)))
    }
}

fn truncate(text: &str, max_chars: usize) -> String {
    text.chars().take(max_chars).collect()
}
