//! Runner wiring the collaborators of a migration run together

use crate::cli::args::Args;
use crate::config::MigrationConfig;
use crate::error::Result;
use crate::logging::Logger;
use crate::migration::{MigrationSummary, Migrator};
use crate::provision::{RepositoryProvisioner, TerraformCli};
use crate::registry::RegistryClient;
use crate::transfer;

pub struct Runner {
    config: MigrationConfig,
    output: Logger,
}

impl Runner {
    pub fn new(args: Args) -> Result<Self> {
        let config = args.to_config()?;
        let output = Logger::new(config.verbose);
        output.debug(&format!(
            "Passed arguments: src={} dest={} is_ecr={} backend={:?}",
            args.src, args.dest, args.is_ecr, args.backend
        ));

        Ok(Self { config, output })
    }

    pub fn output(&self) -> &Logger {
        &self.output
    }

    pub async fn run(&self) -> Result<MigrationSummary> {
        self.output.info(&format!(
            "Migrating images from {} to {}{}",
            self.config.source,
            self.config.destination,
            if self.config.managed_destination {
                " (managed repositories)"
            } else {
                ""
            }
        ));

        let migrator = self.build_migrator()?;
        let summary = migrator.run().await?;

        self.output.summary_kv(
            &format!("Migration completed in {}", self.output.elapsed()),
            &[
                ("Images", summary.images.to_string()),
                ("Tags migrated", summary.tags_migrated.to_string()),
                ("Tags skipped", summary.tags_skipped.to_string()),
                ("Cleanup failures", summary.cleanup_failures.to_string()),
            ],
        );
        Ok(summary)
    }

    fn build_migrator(&self) -> Result<Migrator> {
        let registry = RegistryClient::builder(self.config.source.clone())
            .with_timeout(self.config.request_timeout)
            .with_logger(self.output.clone())
            .build()?;

        let transfer = transfer::from_config(&self.config, self.output.clone())?;

        let provisioner = if self.config.managed_destination {
            let provision = &self.config.provision;
            let tool = TerraformCli::new(
                provision.binary.clone(),
                provision.working_dir.clone(),
                self.output.clone(),
            );
            Some(RepositoryProvisioner::new(
                Box::new(tool),
                provision.name_variable.clone(),
                provision.output_key.clone(),
                provision.policy,
                self.output.clone(),
            ))
        } else {
            None
        };

        Migrator::new(
            self.config.clone(),
            Box::new(registry),
            transfer,
            provisioner,
            self.output.clone(),
        )
    }
}
