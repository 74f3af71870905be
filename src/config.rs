//! Configuration for a migration run
//!
//! A [`MigrationConfig`] is assembled once from command-line arguments and the
//! environment, validated, and then handed to the orchestrator. Nothing mutates
//! it afterwards.

use crate::error::{MigrateError, Result};
use std::path::PathBuf;
use std::time::Duration;

/// What to do when the plan or apply step exits with a failing status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ProvisionPolicy {
    /// Abort the run
    #[default]
    Strict,
    /// Log the failure and carry on with the next step
    Lenient,
}

impl std::str::FromStr for ProvisionPolicy {
    type Err = MigrateError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "strict" => Ok(ProvisionPolicy::Strict),
            "lenient" => Ok(ProvisionPolicy::Lenient),
            other => Err(MigrateError::Config(format!(
                "Unknown provision policy '{}': expected strict or lenient",
                other
            ))),
        }
    }
}

/// Which image-transfer implementation drives pull/tag/push/remove
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransferBackend {
    /// The `docker` command-line client
    Cli { binary: String },
    /// The Docker Engine HTTP API over TCP
    Engine { host: String },
}

/// Terraform settings for managed-destination mode
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProvisionConfig {
    pub binary: String,
    pub working_dir: Option<PathBuf>,
    pub name_variable: String,
    pub output_key: String,
    pub policy: ProvisionPolicy,
}

impl Default for ProvisionConfig {
    fn default() -> Self {
        Self {
            binary: "terraform".to_string(),
            working_dir: None,
            name_variable: "repository_name".to_string(),
            output_key: "registry_url".to_string(),
            policy: ProvisionPolicy::default(),
        }
    }
}

/// Credentials sent to the destination registry on push
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PushCredentials {
    pub username: String,
    pub password: String,
}

/// Immutable configuration for one migration run
#[derive(Debug, Clone)]
pub struct MigrationConfig {
    pub source: String,
    pub destination: String,
    pub managed_destination: bool,
    pub backend: TransferBackend,
    pub provision: ProvisionConfig,
    pub credentials: Option<PushCredentials>,
    pub request_timeout: Duration,
    pub transfer_timeout: Option<Duration>,
    pub verbose: bool,
}

impl MigrationConfig {
    pub fn new(source: impl Into<String>, destination: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            destination: destination.into(),
            managed_destination: false,
            backend: TransferBackend::Cli {
                binary: "docker".to_string(),
            },
            provision: ProvisionConfig::default(),
            credentials: None,
            request_timeout: Duration::from_secs(30),
            transfer_timeout: None,
            verbose: true,
        }
    }

    pub fn with_managed_destination(mut self, managed: bool) -> Self {
        self.managed_destination = managed;
        self
    }

    pub fn with_backend(mut self, backend: TransferBackend) -> Self {
        self.backend = backend;
        self
    }

    pub fn with_provision(mut self, provision: ProvisionConfig) -> Self {
        self.provision = provision;
        self
    }

    pub fn with_credentials(mut self, credentials: Option<PushCredentials>) -> Self {
        self.credentials = credentials;
        self
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    pub fn with_transfer_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.transfer_timeout = timeout;
        self
    }

    pub fn with_verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.source.trim().is_empty() {
            return Err(MigrateError::Config(
                "Source registry cannot be empty".to_string(),
            ));
        }
        if self.destination.trim().is_empty() {
            return Err(MigrateError::Config(
                "Destination cannot be empty".to_string(),
            ));
        }
        if self.request_timeout.is_zero() {
            return Err(MigrateError::Config(
                "Request timeout must be greater than 0".to_string(),
            ));
        }
        if self.transfer_timeout.is_some_and(|t| t.is_zero()) {
            return Err(MigrateError::Config(
                "Transfer timeout must be greater than 0".to_string(),
            ));
        }
        if let TransferBackend::Engine { host } = &self.backend {
            if !host.starts_with("http://") && !host.starts_with("https://") {
                return Err(MigrateError::Config(format!(
                    "Invalid Docker host: {}. Must start with http://, https:// or tcp://",
                    host
                )));
            }
        }
        if self.managed_destination && self.provision.output_key.is_empty() {
            return Err(MigrateError::Config(
                "Terraform output key cannot be empty".to_string(),
            ));
        }
        Ok(())
    }
}

/// Normalize a `DOCKER_HOST`-style value to an HTTP base URL
pub fn docker_host_to_url(host: &str) -> Result<String> {
    if let Some(rest) = host.strip_prefix("tcp://") {
        Ok(format!("http://{}", rest.trim_end_matches('/')))
    } else if host.starts_with("http://") || host.starts_with("https://") {
        Ok(host.trim_end_matches('/').to_string())
    } else if host.starts_with("unix://") || host.starts_with("npipe://") {
        Err(MigrateError::Config(format!(
            "Docker host {} is a local socket; use --backend cli or expose the daemon over tcp://",
            host
        )))
    } else {
        Ok(format!("http://{}", host.trim_end_matches('/')))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = MigrationConfig::new("old.example.com", "new.example.com");
        assert!(!config.managed_destination);
        assert_eq!(config.provision.output_key, "registry_url");
        assert_eq!(config.provision.policy, ProvisionPolicy::Strict);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validation_rejects_empty_hosts() {
        assert!(MigrationConfig::new("", "dest").validate().is_err());
        assert!(MigrationConfig::new("src", "  ").validate().is_err());
    }

    #[test]
    fn test_validation_rejects_zero_timeouts() {
        let config = MigrationConfig::new("src", "dest").with_request_timeout(Duration::ZERO);
        assert!(config.validate().is_err());

        let config =
            MigrationConfig::new("src", "dest").with_transfer_timeout(Some(Duration::ZERO));
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_provision_policy_parsing() {
        assert_eq!("strict".parse::<ProvisionPolicy>().unwrap(), ProvisionPolicy::Strict);
        assert_eq!("Lenient".parse::<ProvisionPolicy>().unwrap(), ProvisionPolicy::Lenient);
        assert!("sometimes".parse::<ProvisionPolicy>().is_err());
    }

    #[test]
    fn test_docker_host_to_url() {
        assert_eq!(
            docker_host_to_url("tcp://127.0.0.1:2375").unwrap(),
            "http://127.0.0.1:2375"
        );
        assert_eq!(
            docker_host_to_url("https://docker.internal:2376/").unwrap(),
            "https://docker.internal:2376"
        );
        assert_eq!(docker_host_to_url("localhost:2375").unwrap(), "http://localhost:2375");
        assert!(docker_host_to_url("unix:///var/run/docker.sock").is_err());
    }
}
