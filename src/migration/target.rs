//! Per-tag migration targets and run counters

use crate::registry::ImageRef;

/// One (image, tag) pair and where it is going
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MigrationTarget {
    pub source_ref: ImageRef,
    /// Destination repository, without tag
    pub destination_endpoint: String,
    pub tag: String,
}

impl MigrationTarget {
    pub fn new(source_ref: ImageRef, destination_endpoint: String, tag: String) -> Self {
        Self {
            source_ref,
            destination_endpoint,
            tag,
        }
    }

    /// Source repository, without tag
    pub fn source_repository(&self) -> String {
        self.source_ref.to_string()
    }

    /// `src/name:tag`
    pub fn source_reference(&self) -> String {
        self.source_ref.with_tag(&self.tag)
    }

    /// `destination:tag`
    pub fn destination_reference(&self) -> String {
        format!("{}:{}", self.destination_endpoint, self.tag)
    }
}

/// Counters for a completed run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MigrationSummary {
    pub images: usize,
    pub tags_migrated: usize,
    pub tags_skipped: usize,
    pub cleanup_failures: usize,
}
