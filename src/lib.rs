//! Docker Image Migrator Library
//!
//! Moves every image and tag of a legacy (v1) Docker registry to a v2 registry
//! or to AWS ECR: discover, provision the destination repository if needed,
//! pull, retag, push, verify the push stream, clean up local copies.

pub mod cli;
pub mod config;
pub mod error;
pub mod logging;
pub mod migration;
pub mod provision;
pub mod registry;
pub mod transfer;

pub use config::MigrationConfig;
pub use error::{MigrateError, Result};
pub use logging::Logger;
pub use migration::{MigrationSummary, MigrationTarget, Migrator};
