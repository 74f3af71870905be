//! Image transfer: pull, tag, push and local removal of images
//!
//! The [`ImageTransfer`] trait is the seam between the orchestrator and the
//! container engine. Pull and push return the raw newline-delimited JSON stream;
//! errors the engine reports inside that stream are left for [`events::decode`]
//! to find. Failures to run the step at all come back as [`TransferFailure`].

pub mod cli;
pub mod engine;
pub mod events;

pub use cli::DockerCli;
pub use engine::DockerEngine;
pub use events::{TransferEvent, decode, first_error};

use crate::config::{MigrationConfig, TransferBackend};
use crate::error::Result;
use crate::logging::Logger;
use async_trait::async_trait;
use thiserror::Error;

/// Why a single transfer step could not complete
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransferFailure {
    /// The image or tag does not exist locally or remotely
    #[error("not found: {0}")]
    NotFound(String),
    /// The engine or its client binary could not be reached
    #[error("unavailable: {0}")]
    ToolUnavailable(String),
    /// The engine answered and refused the operation
    #[error("{0}")]
    Rejected(String),
}

pub type StepResult<T> = std::result::Result<T, TransferFailure>;

#[async_trait]
pub trait ImageTransfer: Send + Sync {
    /// Pull `image:tag`, returning the raw progress stream
    async fn pull(&self, image: &str, tag: &str) -> StepResult<String>;

    /// Create `target_repository:tag` pointing at `source`
    async fn tag(&self, source: &str, target_repository: &str, tag: &str) -> StepResult<()>;

    /// Push `repository:tag`, returning the raw progress stream
    async fn push(&self, repository: &str, tag: &str) -> StepResult<String>;

    /// Remove a local image reference
    async fn remove_image(&self, reference: &str) -> StepResult<()>;
}

/// Build the transfer backend selected in the configuration
pub fn from_config(config: &MigrationConfig, output: Logger) -> Result<Box<dyn ImageTransfer>> {
    Ok(match &config.backend {
        TransferBackend::Cli { binary } => Box::new(DockerCli::new(binary.clone(), output)),
        TransferBackend::Engine { host } => Box::new(DockerEngine::new(
            host.clone(),
            config.credentials.clone(),
            output,
        )?),
    })
}
