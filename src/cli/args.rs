//! Command-line argument parsing

use crate::config::{
    MigrationConfig, ProvisionConfig, ProvisionPolicy, PushCredentials, TransferBackend,
    docker_host_to_url,
};
use crate::error::{MigrateError, Result};
use clap::builder::BoolishValueParser;
use clap::{Parser, ValueEnum};
use std::path::PathBuf;
use std::time::Duration;

const DEFAULT_DOCKER_HOST: &str = "http://localhost:2375";

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Backend {
    /// Drive the `docker` command-line client
    Cli,
    /// Talk to the Docker Engine API over TCP
    Engine,
}

#[derive(Parser, Debug)]
#[command(name = "dim")]
#[command(about = "Migrate Docker images from a v1 registry to a v2 registry or AWS ECR")]
#[command(version)]
pub struct Args {
    /// Source (legacy v1) registry host
    #[arg(long = "src", env = "DIM_SRC")]
    pub src: String,

    /// Destination registry host, or the ECR registry when --is-ecr is set
    #[arg(long = "dest", env = "DIM_DEST")]
    pub dest: String,

    /// Destination is a managed registry whose repositories must be created first
    #[arg(
        long = "is-ecr",
        env = "DIM_IS_ECR",
        default_value = "false",
        num_args = 0..=1,
        default_missing_value = "true",
        value_parser = BoolishValueParser::new()
    )]
    pub is_ecr: bool,

    /// Image transfer backend
    #[arg(long = "backend", value_enum, default_value_t = Backend::Cli)]
    pub backend: Backend,

    /// Docker client binary used by the cli backend
    #[arg(long = "docker-bin", default_value = "docker")]
    pub docker_bin: String,

    /// Docker Engine address used by the engine backend (falls back to DOCKER_HOST)
    #[arg(long = "docker-host")]
    pub docker_host: Option<String>,

    /// Username for the destination registry (engine backend)
    #[arg(long = "dest-username", env = "DIM_DEST_USERNAME")]
    pub dest_username: Option<String>,

    /// Password for the destination registry (engine backend)
    #[arg(long = "dest-password", env = "DIM_DEST_PASSWORD", hide_env_values = true)]
    pub dest_password: Option<String>,

    /// Terraform binary used to create ECR repositories
    #[arg(long = "terraform-bin", default_value = "terraform")]
    pub terraform_bin: String,

    /// Initialized Terraform working directory holding the repository module
    #[arg(long = "terraform-dir", env = "DIM_TERRAFORM_DIR")]
    pub terraform_dir: Option<PathBuf>,

    /// Terraform variable receiving the repository name
    #[arg(long = "terraform-var", default_value = "repository_name")]
    pub terraform_var: String,

    /// Terraform output holding the repository URL
    #[arg(long = "terraform-output", default_value = "registry_url")]
    pub terraform_output: String,

    /// What to do when terraform plan or apply fails: strict or lenient
    #[arg(long = "provision-policy", default_value = "strict")]
    pub provision_policy: String,

    /// Timeout in seconds for source registry requests
    #[arg(long = "request-timeout", default_value = "30")]
    pub request_timeout: u64,

    /// Timeout in seconds for each pull, tag, push and remove (unbounded by default)
    #[arg(long = "transfer-timeout")]
    pub transfer_timeout: Option<u64>,

    /// Suppress DEBUG output
    #[arg(long = "quiet", short = 'q', env = "DIM_QUIET")]
    pub quiet: bool,
}

impl Args {
    pub fn parse_args() -> Self {
        Args::parse()
    }

    /// Validate arguments
    pub fn validate(&self) -> Result<()> {
        if self.src.trim().is_empty() {
            return Err(MigrateError::Config("--src cannot be empty".to_string()));
        }
        if self.dest.trim().is_empty() {
            return Err(MigrateError::Config("--dest cannot be empty".to_string()));
        }
        if self.request_timeout == 0 {
            return Err(MigrateError::Config(
                "Request timeout must be greater than 0".to_string(),
            ));
        }
        if self.transfer_timeout == Some(0) {
            return Err(MigrateError::Config(
                "Transfer timeout must be greater than 0".to_string(),
            ));
        }
        match (&self.dest_username, &self.dest_password) {
            (Some(_), None) => Err(MigrateError::Config(
                "Password is required when username is provided".to_string(),
            )),
            (None, Some(_)) => Err(MigrateError::Config(
                "Username is required when password is provided".to_string(),
            )),
            _ => Ok(()),
        }
    }

    /// Fill the Docker Engine address from the environment when not given
    pub fn from_env(mut self) -> Self {
        if self.docker_host.is_none() {
            self.docker_host = std::env::var("DOCKER_HOST").ok();
        }
        self
    }

    /// Build the immutable run configuration
    pub fn to_config(&self) -> Result<MigrationConfig> {
        self.validate()?;

        let backend = match self.backend {
            Backend::Cli => TransferBackend::Cli {
                binary: self.docker_bin.clone(),
            },
            Backend::Engine => TransferBackend::Engine {
                host: docker_host_to_url(
                    self.docker_host.as_deref().unwrap_or(DEFAULT_DOCKER_HOST),
                )?,
            },
        };

        let provision = ProvisionConfig {
            binary: self.terraform_bin.clone(),
            working_dir: self.terraform_dir.clone(),
            name_variable: self.terraform_var.clone(),
            output_key: self.terraform_output.clone(),
            policy: self.provision_policy.parse::<ProvisionPolicy>()?,
        };

        let credentials = match (&self.dest_username, &self.dest_password) {
            (Some(username), Some(password)) => Some(PushCredentials {
                username: username.clone(),
                password: password.clone(),
            }),
            _ => None,
        };

        let config = MigrationConfig::new(self.src.trim(), self.dest.trim())
            .with_managed_destination(self.is_ecr)
            .with_backend(backend)
            .with_provision(provision)
            .with_credentials(credentials)
            .with_request_timeout(Duration::from_secs(self.request_timeout))
            .with_transfer_timeout(self.transfer_timeout.map(Duration::from_secs))
            .with_verbose(!self.quiet);
        config.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Args {
        Args::try_parse_from(std::iter::once("dim").chain(args.iter().copied())).unwrap()
    }

    #[test]
    fn test_minimal_arguments() {
        let args = parse(&["--src", "old.example.com", "--dest", "new.example.com"]);
        assert!(!args.is_ecr);
        let config = args.to_config().unwrap();
        assert_eq!(config.source, "old.example.com");
        assert!(!config.managed_destination);
        assert_eq!(
            config.backend,
            TransferBackend::Cli {
                binary: "docker".to_string()
            }
        );
        assert!(config.transfer_timeout.is_none());
    }

    #[test]
    fn test_is_ecr_accepts_a_value() {
        let args = parse(&["--src", "a", "--dest", "b", "--is-ecr", "true"]);
        assert!(args.is_ecr);
        let args = parse(&["--src", "a", "--dest", "b", "--is-ecr", "no"]);
        assert!(!args.is_ecr);
        let args = parse(&["--src", "a", "--dest", "b", "--is-ecr"]);
        assert!(args.is_ecr);
    }

    #[test]
    fn test_engine_backend_and_policy() {
        let args = parse(&[
            "--src",
            "a",
            "--dest",
            "b",
            "--backend",
            "engine",
            "--docker-host",
            "tcp://10.0.0.5:2375",
            "--provision-policy",
            "lenient",
            "--transfer-timeout",
            "600",
        ]);
        let config = args.to_config().unwrap();
        assert_eq!(
            config.backend,
            TransferBackend::Engine {
                host: "http://10.0.0.5:2375".to_string()
            }
        );
        assert_eq!(config.provision.policy, ProvisionPolicy::Lenient);
        assert_eq!(config.transfer_timeout, Some(Duration::from_secs(600)));
    }

    #[test]
    fn test_credentials_must_come_in_pairs() {
        let args = parse(&["--src", "a", "--dest", "b", "--dest-username", "AWS"]);
        assert!(matches!(args.validate(), Err(MigrateError::Config(_))));
    }

    #[test]
    fn test_missing_source_is_rejected() {
        assert!(Args::try_parse_from(["dim", "--dest", "b"]).is_err());
    }
}
