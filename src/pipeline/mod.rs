pub mod demo;
pub mod steps;

use crate::{
    config::{Config, PipelineConfig},
    error::Result,
    imaging::{fetch_image, image_dimensions, mask_data_uri},
    logger,
    models::{EditInput, ModelInput, PipelineResult, RoomType, Style},
    replicate::{ModelClient, ReplicateRunner},
};
use std::sync::Arc;

pub use demo::demo_image;
pub use steps::{plan, Step, StepContext, StepDescriptor};

#[derive(Clone)]
pub struct StagingPipeline {
    /// `None` in demo mode: no model calls are possible.
    client: Option<ModelClient>,
    http: reqwest::Client,
    config: PipelineConfig,
    api_token: Option<String>,
}

impl StagingPipeline {
    pub fn new(client: ModelClient, config: PipelineConfig) -> Self {
        Self {
            client: Some(client),
            http: reqwest::Client::new(),
            config,
            api_token: None,
        }
    }

    pub fn demo(config: PipelineConfig) -> Self {
        Self {
            client: None,
            http: reqwest::Client::new(),
            config,
            api_token: None,
        }
    }

    pub fn from_config(config: &Config) -> Result<Self> {
        if config.demo_mode {
            log::info!("🎭 Demo mode enabled, model calls are bypassed");
            return Ok(Self::demo(config.pipeline.clone()));
        }

        let runner = ReplicateRunner::new(config.replicate.clone())?;
        let client = ModelClient::new(Arc::new(runner), config.retry.clone());
        Ok(Self {
            api_token: config.replicate.api_token.clone(),
            ..Self::new(client, config.pipeline.clone())
        })
    }

    pub fn is_demo(&self) -> bool {
        self.client.is_none()
    }

    /// Download an image (or decode a data URI) within the configured size cap.
    pub async fn fetch_image(&self, url: &str) -> Result<Vec<u8>> {
        fetch_image(&self.http, url, self.config.max_image_bytes).await
    }

    async fn pause(&self) {
        if !self.config.step_pause.is_zero() {
            log::debug!(
                "Pausing {:.1}s before next model call",
                self.config.step_pause.as_secs_f64()
            );
            tokio::time::sleep(self.config.step_pause).await;
        }
    }

    /// Run every planned step, each one consuming the previous step's image.
    pub async fn stage(
        &self,
        image_url: &str,
        style: &Style,
        room: &RoomType,
        custom_prompt: Option<&str>,
    ) -> Result<PipelineResult> {
        let Some(client) = &self.client else {
            tokio::time::sleep(self.config.demo_delay).await;
            return Ok(PipelineResult::Demo {
                url: demo_image(&room.id).to_string(),
            });
        };

        let ctx = StepContext {
            style,
            room,
            custom_prompt,
            guidance: self.config.guidance,
            steps: self.config.steps,
            api_token: self.api_token.as_deref(),
        };

        let mut current = image_url.to_string();
        for (idx, descriptor) in plan(&self.config).iter().enumerate() {
            if idx > 0 {
                self.pause().await;
            }
            let _timer = logger::timer(&format!("step {} ({})", descriptor.step.name(), descriptor.model));

            let mask = if descriptor.needs_mask() {
                let bytes = self.fetch_image(&current).await?;
                let (width, height) = image_dimensions(&bytes)?;
                log::debug!("Intermediate image is {}x{}", width, height);
                Some(mask_data_uri(width, height, &self.config.mask)?)
            } else {
                None
            };

            let input = descriptor.build_input(&ctx, &current, mask)?;
            current = client.run(&descriptor.model, &input).await?;
            log::info!("✅ Step {} finished", descriptor.step.name());
        }

        Ok(PipelineResult::Generated { url: current })
    }

    /// Single corrective edit of an already staged image.
    pub async fn refine(&self, image_url: &str, instruction: &str) -> Result<PipelineResult> {
        let Some(client) = &self.client else {
            tokio::time::sleep(self.config.demo_delay).await;
            return Ok(PipelineResult::Demo {
                url: image_url.to_string(),
            });
        };

        let _timer = logger::timer("refine");
        let input = ModelInput::Edit(EditInput::new(image_url, steps::refine_prompt(instruction)));
        let url = client.run(&self.config.edit_model, &input).await?;
        Ok(PipelineResult::Generated { url })
    }
}
