pub mod model_client;
pub mod retry;
pub mod runner;

pub use model_client::ModelClient;
pub use retry::{is_rate_limited, RetryPolicy};
pub use runner::{ModelRunner, ReplicateRunner};
