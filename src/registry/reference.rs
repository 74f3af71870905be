//! Repository and tag identities discovered on the source registry

use std::fmt;

/// Namespace the legacy catalog puts in front of official images
const LIBRARY_PREFIX: &str = "library/";

/// A repository on a registry host
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ImageRef {
    pub registry_host: String,
    pub repository_name: String,
}

impl ImageRef {
    /// Build a reference from a catalog name, dropping any `library/` namespace
    pub fn from_catalog(registry_host: &str, name: &str) -> Self {
        let repository_name = name.strip_prefix(LIBRARY_PREFIX).unwrap_or(name);
        Self {
            registry_host: registry_host.to_string(),
            repository_name: repository_name.to_string(),
        }
    }

    /// `host/name:tag`
    pub fn with_tag(&self, tag: &str) -> String {
        format!("{}:{}", self, tag)
    }
}

impl fmt::Display for ImageRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.registry_host, self.repository_name)
    }
}

/// One tag of a repository together with the image id the registry reports for it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TagEntry {
    pub tag: String,
    pub digest_or_id: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_library_prefix_is_stripped() {
        let image = ImageRef::from_catalog("old.example.com", "library/nginx");
        assert_eq!(image.repository_name, "nginx");
        assert_eq!(image.to_string(), "old.example.com/nginx");
        assert_eq!(image.with_tag("1.25"), "old.example.com/nginx:1.25");
    }

    #[test]
    fn test_other_namespaces_are_kept() {
        let image = ImageRef::from_catalog("old.example.com", "team/library/api");
        assert_eq!(image.repository_name, "team/library/api");
    }
}
