//! Virtual staging service.
//!
//! A room photo goes through a fixed sequence of Flux calls on Replicate
//! (clean and finish, masked furnishing, polish) and comes back resized to
//! the dimensions of the upload.

pub mod config;
pub mod error;
pub mod imaging;
pub mod logger;
pub mod models;
pub mod pipeline;
pub mod replicate;
#[cfg(feature = "server")]
pub mod server;
#[cfg(test)]
mod test_support;

pub use config::{
    Config, MaskConfig, PipelineConfig, ReplicateConfig, RetryConfig, StagingStrategy,
};
pub use error::{Result, StagingError};
pub use models::*;
pub use pipeline::StagingPipeline;
pub use replicate::{ModelClient, ModelRunner, ReplicateRunner};
