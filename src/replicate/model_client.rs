use crate::{
    config::RetryConfig,
    error::{Result, StagingError},
    models::ModelInput,
    replicate::{
        retry::{is_rate_limited, RetryPolicy},
        runner::ModelRunner,
    },
};
use std::sync::Arc;

#[derive(Clone)]
pub struct ModelClient {
    runner: Arc<dyn ModelRunner>,
    policy: RetryPolicy,
}

impl ModelClient {
    pub fn new(runner: Arc<dyn ModelRunner>, retry: RetryConfig) -> Self {
        Self {
            runner,
            policy: RetryPolicy::new(retry),
        }
    }

    /// Run `model` and return the URL of its image.
    ///
    /// Throttled calls are retried with a growing pause; any other failure is
    /// returned as-is on the first occurrence.
    pub async fn run(&self, model: &str, input: &ModelInput) -> Result<String> {
        let max_attempts = self.policy.max_attempts();
        let mut last_error = String::new();

        for attempt in 1..=max_attempts {
            match self.runner.run(model, input).await {
                Ok(output) => return output.normalize(),
                Err(err) if is_rate_limited(&err) => {
                    last_error = err.to_string();
                    if attempt == max_attempts {
                        break;
                    }
                    let delay = self.policy.delay(attempt);
                    log::warn!(
                        "⚠️  {} rate limited (attempt {}/{}), retrying in {:.1}s",
                        model,
                        attempt,
                        max_attempts,
                        delay.as_secs_f64()
                    );
                    tokio::time::sleep(delay).await;
                }
                Err(err) => return Err(err),
            }
        }

        Err(StagingError::ExhaustedRetries {
            model: model.to_string(),
            attempts: max_attempts,
            last_error,
        })
    }
}
