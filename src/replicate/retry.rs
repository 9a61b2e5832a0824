use crate::config::RetryConfig;
use crate::error::StagingError;
use rand::Rng;
use std::time::Duration;

const RATE_LIMIT_MARKERS: &[&str] = &[
    "429",
    "too many requests",
    "throttl",
    "rate limit",
    "rate-limit",
    "ratelimit",
    "rate limited",
];

/// True when the failure signals throttling by the model service.
pub fn is_rate_limited(err: &StagingError) -> bool {
    match err {
        StagingError::RateLimited(_) => true,
        StagingError::Request(msg) | StagingError::Response(msg) | StagingError::Internal(msg) => {
            let lowered = msg.to_ascii_lowercase();
            RATE_LIMIT_MARKERS
                .iter()
                .any(|marker| lowered.contains(marker))
        }
        _ => false,
    }
}

#[derive(Debug, Clone)]
pub struct RetryPolicy {
    config: RetryConfig,
}

impl RetryPolicy {
    pub fn new(config: RetryConfig) -> Self {
        Self { config }
    }

    pub fn max_attempts(&self) -> u32 {
        self.config.max_attempts.max(1)
    }

    /// Deterministic part of the pause after failed attempt `attempt` (1-based).
    pub fn base_delay(&self, attempt: u32) -> Duration {
        self.config.base_delay.saturating_mul(attempt)
    }

    pub fn delay(&self, attempt: u32) -> Duration {
        let jitter_ms = self.config.max_jitter.as_millis() as u64;
        let jitter = if jitter_ms == 0 {
            Duration::ZERO
        } else {
            Duration::from_millis(rand::thread_rng().gen_range(0..=jitter_ms))
        };
        self.base_delay(attempt) + jitter
    }
}
