//! Registry module for the legacy source registry
//!
//! Discovery only: listing repositories from the v1 catalog search and listing the
//! tags of each repository. The [`SourceRegistry`] trait is the seam the
//! orchestrator depends on.

pub mod client;
pub mod reference;

pub use client::{RegistryClient, RegistryClientBuilder};
pub use reference::{ImageRef, TagEntry};

use crate::error::Result;
use async_trait::async_trait;

/// Read-only view of a registry's repositories and tags
#[async_trait]
pub trait SourceRegistry: Send + Sync {
    /// Repositories in catalog order, without the `library/` namespace
    async fn list_repositories(&self) -> Result<Vec<ImageRef>>;

    /// Tags of one repository in the order the registry lists them
    async fn list_tags(&self, image: &ImageRef) -> Result<Vec<TagEntry>>;
}
