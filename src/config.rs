use crate::error::{Result, StagingError};
use std::env;
use std::str::FromStr;
use std::time::Duration;

pub const DEFAULT_API_BASE: &str = "https://api.replicate.com/v1";

/// Hosts Replicate serves prediction outputs from.
pub const DEFAULT_IMAGE_HOSTS: &[&str] = &["replicate.delivery"];

fn env_parse<T: FromStr>(key: &str) -> Option<T> {
    env::var(key).ok().and_then(|val| val.trim().parse().ok())
}

fn env_millis(key: &str) -> Option<Duration> {
    env_parse::<u64>(key).map(Duration::from_millis)
}

fn env_flag(key: &str) -> bool {
    env::var(key).ok().map_or(false, |val| val.trim() == "true")
}

#[derive(Debug, Clone)]
pub struct ReplicateConfig {
    pub api_token: Option<String>,
    pub api_base: String,
    pub poll_interval: Duration,
    pub poll_timeout: Duration,
}

impl Default for ReplicateConfig {
    fn default() -> Self {
        ReplicateConfig {
            api_token: None,
            api_base: DEFAULT_API_BASE.to_string(),
            poll_interval: Duration::from_secs(1),
            poll_timeout: Duration::from_secs(300),
        }
    }
}

impl ReplicateConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_env() -> Self {
        let api_token = env::var("REPLICATE_API_TOKEN")
            .ok()
            .map(|token| token.trim().to_string())
            .filter(|token| !token.is_empty());
        let api_base = env::var("REPLICATE_API_BASE")
            .ok()
            .map(|base| base.trim().trim_end_matches('/').to_string())
            .filter(|base| !base.is_empty())
            .unwrap_or_else(|| DEFAULT_API_BASE.to_string());

        let defaults = Self::default();
        ReplicateConfig {
            api_token,
            api_base,
            poll_interval: env_millis("REPLICATE_POLL_INTERVAL_MS").unwrap_or(defaults.poll_interval),
            poll_timeout: env_millis("REPLICATE_POLL_TIMEOUT_MS").unwrap_or(defaults.poll_timeout),
        }
    }

    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.api_token = Some(token.into());
        self
    }

    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into();
        self
    }

    pub fn with_polling(mut self, interval: Duration, timeout: Duration) -> Self {
        self.poll_interval = interval;
        self.poll_timeout = timeout;
        self
    }
}

#[derive(Debug, Clone)]
pub struct RetryConfig {
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub max_jitter: Duration,
}

impl Default for RetryConfig {
    fn default() -> Self {
        RetryConfig {
            max_attempts: 4,
            base_delay: Duration::from_secs(10),
            max_jitter: Duration::from_secs(2),
        }
    }
}

impl RetryConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_env() -> Self {
        let defaults = Self::default();
        RetryConfig {
            max_attempts: env_parse("RETRY_MAX_ATTEMPTS").unwrap_or(defaults.max_attempts),
            base_delay: env_millis("RETRY_BASE_DELAY_MS").unwrap_or(defaults.base_delay),
            max_jitter: env_millis("RETRY_MAX_JITTER_MS").unwrap_or(defaults.max_jitter),
        }
    }

    /// No sleeping between attempts. Used by tests and local tooling.
    pub fn immediate(max_attempts: u32) -> Self {
        RetryConfig {
            max_attempts,
            base_delay: Duration::ZERO,
            max_jitter: Duration::ZERO,
        }
    }

    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts;
        self
    }

    pub fn with_delays(mut self, base_delay: Duration, max_jitter: Duration) -> Self {
        self.base_delay = base_delay;
        self.max_jitter = max_jitter;
        self
    }
}

/// Row fractions bounding the inpainting mask gradient.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MaskConfig {
    pub preserve_until: f32,
    pub ramp_until: f32,
}

impl Default for MaskConfig {
    fn default() -> Self {
        MaskConfig {
            preserve_until: 0.25,
            ramp_until: 0.40,
        }
    }
}

impl MaskConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        MaskConfig {
            preserve_until: env_parse("MASK_PRESERVE_FRACTION").unwrap_or(defaults.preserve_until),
            ramp_until: env_parse("MASK_RAMP_END_FRACTION").unwrap_or(defaults.ramp_until),
        }
    }

    pub fn validate(&self) -> Result<()> {
        let ordered = 0.0 <= self.preserve_until
            && self.preserve_until < self.ramp_until
            && self.ramp_until <= 1.0;
        if !ordered {
            return Err(StagingError::Config(format!(
                "mask fractions must satisfy 0 <= {} < {} <= 1",
                self.preserve_until, self.ramp_until
            )));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StagingStrategy {
    /// Clean+finish, gradient-masked inpainting, then a polish pass.
    Inpaint,
    /// Clean, finish, then the dedicated proplabs staging model.
    /// Kept for comparison runs only; `Inpaint` is the supported pipeline.
    DedicatedModel,
}

impl FromStr for StagingStrategy {
    type Err = StagingError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "inpaint" => Ok(StagingStrategy::Inpaint),
            "dedicated" | "dedicated-model" => Ok(StagingStrategy::DedicatedModel),
            other => Err(StagingError::Config(format!(
                "unknown staging strategy '{}'",
                other
            ))),
        }
    }
}

#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub strategy: StagingStrategy,
    pub edit_model: String,
    pub inpaint_model: String,
    pub staging_model: String,
    pub step_pause: Duration,
    pub demo_delay: Duration,
    pub guidance: f32,
    pub steps: u32,
    pub mask: MaskConfig,
    /// Cap on any image the pipeline downloads or decodes from a data URI.
    pub max_image_bytes: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        PipelineConfig {
            strategy: StagingStrategy::Inpaint,
            edit_model: "black-forest-labs/flux-kontext-pro".to_string(),
            inpaint_model: "black-forest-labs/flux-fill-pro".to_string(),
            staging_model:
                "proplabs/virtual-staging:635d607efc6e3a6016ef6d655327cd35f3d792e84b8f110688b04498c6e94cfb"
                    .to_string(),
            step_pause: Duration::from_secs(5),
            demo_delay: Duration::from_secs(3),
            guidance: 60.0,
            steps: 50,
            mask: MaskConfig::default(),
            max_image_bytes: 20 * 1024 * 1024,
        }
    }
}

impl PipelineConfig {
    pub fn from_env() -> Result<Self> {
        let defaults = Self::default();
        let strategy = match env::var("STAGING_STRATEGY") {
            Ok(value) if !value.trim().is_empty() => value.parse()?,
            _ => defaults.strategy,
        };

        Ok(PipelineConfig {
            strategy,
            edit_model: env::var("EDIT_MODEL").unwrap_or(defaults.edit_model),
            inpaint_model: env::var("INPAINT_MODEL").unwrap_or(defaults.inpaint_model),
            staging_model: defaults.staging_model,
            step_pause: env_millis("STEP_PAUSE_MS").unwrap_or(defaults.step_pause),
            demo_delay: env_millis("DEMO_DELAY_MS").unwrap_or(defaults.demo_delay),
            guidance: defaults.guidance,
            steps: defaults.steps,
            mask: MaskConfig::from_env(),
            max_image_bytes: env_parse("MAX_IMAGE_BYTES").unwrap_or(defaults.max_image_bytes),
        })
    }

    pub fn with_strategy(mut self, strategy: StagingStrategy) -> Self {
        self.strategy = strategy;
        self
    }

    pub fn with_pauses(mut self, step_pause: Duration, demo_delay: Duration) -> Self {
        self.step_pause = step_pause;
        self.demo_delay = demo_delay;
        self
    }

    pub fn with_mask(mut self, mask: MaskConfig) -> Self {
        self.mask = mask;
        self
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: Option<u16>,
    pub demo_mode: bool,
    pub output_quality: u8,
    pub max_upload_bytes: usize,
    pub catalog_path: Option<String>,
    /// Hosts `/api/refine` may fetch an `imageUrl` from.
    pub allowed_image_hosts: Vec<String>,
    pub replicate: ReplicateConfig,
    pub retry: RetryConfig,
    pub pipeline: PipelineConfig,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            host: "127.0.0.1".to_string(),
            port: None,
            demo_mode: false,
            output_quality: 90,
            max_upload_bytes: 20 * 1024 * 1024,
            catalog_path: None,
            allowed_image_hosts: DEFAULT_IMAGE_HOSTS.iter().map(|host| host.to_string()).collect(),
            replicate: ReplicateConfig::default(),
            retry: RetryConfig::default(),
            pipeline: PipelineConfig::default(),
        }
    }
}

impl Config {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_env() -> Result<Self> {
        let defaults = Self::default();
        Ok(Config {
            host: env::var("HOST").unwrap_or(defaults.host),
            port: env_parse("PORT"),
            demo_mode: env_flag("DEMO_MODE"),
            output_quality: env_parse("OUTPUT_JPEG_QUALITY").unwrap_or(defaults.output_quality),
            max_upload_bytes: env_parse("MAX_UPLOAD_BYTES").unwrap_or(defaults.max_upload_bytes),
            catalog_path: env::var("CATALOG_PATH").ok().filter(|path| !path.is_empty()),
            allowed_image_hosts: env::var("ALLOWED_IMAGE_HOSTS")
                .ok()
                .map(|hosts| {
                    hosts
                        .split(',')
                        .map(|host| host.trim().to_string())
                        .filter(|host| !host.is_empty())
                        .collect()
                })
                .unwrap_or(defaults.allowed_image_hosts),
            replicate: ReplicateConfig::from_env(),
            retry: RetryConfig::from_env(),
            pipeline: PipelineConfig::from_env()?,
        })
    }

    pub fn port_or_default(&self) -> u16 {
        self.port.unwrap_or(8080)
    }

    pub fn with_port(mut self, port: u16) -> Self {
        self.port = Some(port);
        self
    }

    pub fn with_demo_mode(mut self, enabled: bool) -> Self {
        self.demo_mode = enabled;
        self
    }

    pub fn with_replicate(mut self, config: ReplicateConfig) -> Self {
        self.replicate = config;
        self
    }

    pub fn with_retry(mut self, config: RetryConfig) -> Self {
        self.retry = config;
        self
    }

    pub fn with_pipeline(mut self, config: PipelineConfig) -> Self {
        self.pipeline = config;
        self
    }

    pub fn with_catalog_path(mut self, path: impl Into<String>) -> Self {
        self.catalog_path = Some(path.into());
        self
    }

    pub fn with_allowed_image_hosts(mut self, hosts: Vec<String>) -> Self {
        self.allowed_image_hosts = hosts;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if !self.demo_mode && self.replicate.api_token.is_none() {
            return Err(StagingError::Config(
                "REPLICATE_API_TOKEN is required unless DEMO_MODE=true".into(),
            ));
        }
        if self.retry.max_attempts == 0 {
            return Err(StagingError::Config(
                "retry.max_attempts must be at least 1".into(),
            ));
        }
        if !(1..=100).contains(&self.output_quality) {
            return Err(StagingError::Config(format!(
                "output JPEG quality {} is outside 1..=100",
                self.output_quality
            )));
        }
        if self.pipeline.max_image_bytes == 0 || self.max_upload_bytes == 0 {
            return Err(StagingError::Config("image size limits must be non-zero".into()));
        }
        self.pipeline.mask.validate()
    }
}
