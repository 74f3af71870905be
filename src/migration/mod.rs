//! Migration orchestrator
//!
//! Drives discovery, optional repository provisioning and the per-tag
//! pull → tag → push → verify → cleanup sequence, strictly one tag at a time.
//! Every step returns an explicit result and the decision to continue, skip or
//! abort is taken here:
//!
//! - empty pull output: skip the tag
//! - error event in pull or push output: abort the whole run (exit status 1)
//! - image already gone during cleanup: log, keep going
//! - anything else: abort

pub mod target;

pub use target::{MigrationSummary, MigrationTarget};

use crate::config::MigrationConfig;
use crate::error::{MigrateError, Result};
use crate::logging::Logger;
use crate::provision::RepositoryProvisioner;
use crate::registry::{ImageRef, SourceRegistry};
use crate::transfer::{ImageTransfer, StepResult, TransferFailure, decode, first_error};
use std::future::Future;

pub struct Migrator {
    config: MigrationConfig,
    registry: Box<dyn SourceRegistry>,
    transfer: Box<dyn ImageTransfer>,
    provisioner: Option<RepositoryProvisioner>,
    output: Logger,
}

impl Migrator {
    pub fn new(
        config: MigrationConfig,
        registry: Box<dyn SourceRegistry>,
        transfer: Box<dyn ImageTransfer>,
        provisioner: Option<RepositoryProvisioner>,
        output: Logger,
    ) -> Result<Self> {
        config.validate()?;
        if config.managed_destination && provisioner.is_none() {
            return Err(MigrateError::Config(
                "Managed destination mode requires a repository provisioner".to_string(),
            ));
        }

        Ok(Self {
            config,
            registry,
            transfer,
            provisioner,
            output,
        })
    }

    /// Migrate every tag of every repository on the source registry
    pub async fn run(&self) -> Result<MigrationSummary> {
        let mut summary = MigrationSummary::default();

        let images = self
            .registry
            .list_repositories()
            .await
            .map_err(|e| self.log_error(e))?;

        for image in &images {
            summary.images += 1;

            let tags = self
                .registry
                .list_tags(image)
                .await
                .map_err(|e| self.log_error(e))?;
            if tags.is_empty() {
                self.output
                    .debug(&format!("No tags for {}, nothing to migrate", image));
                continue;
            }

            let destination = self.resolve_destination(image).await?;

            for entry in tags {
                let target = MigrationTarget::new(image.clone(), destination.clone(), entry.tag);
                self.migrate_tag(&target, &mut summary).await?;
            }
        }

        Ok(summary)
    }

    async fn resolve_destination(&self, image: &ImageRef) -> Result<String> {
        match (&self.provisioner, self.config.managed_destination) {
            (Some(provisioner), true) => provisioner
                .ensure_repository(&image.repository_name)
                .await
                .map_err(|e| self.log_error(e)),
            _ => Ok(format!(
                "{}/{}",
                self.config.destination.trim_end_matches('/'),
                image.repository_name
            )),
        }
    }

    async fn migrate_tag(&self, target: &MigrationTarget, summary: &mut MigrationSummary) -> Result<()> {
        let source = target.source_reference();
        let destination = target.destination_reference();

        self.output.debug(&format!("Pulling image {}", source));
        let pulled = self
            .timed("pull", &source, self.transfer.pull(&target.source_repository(), &target.tag))
            .await?
            .map_err(|f| self.step_failed("pull", &source, f))?;
        if pulled.trim().is_empty() {
            self.output
                .info(&format!("Pull of {} returned nothing, skipping", source));
            summary.tags_skipped += 1;
            return Ok(());
        }
        self.verify_stream(&source, &pulled)?;

        self.output
            .debug(&format!("Tagging {} as {}", source, destination));
        self.timed(
            "tag",
            &source,
            self.transfer
                .tag(&source, &target.destination_endpoint, &target.tag),
        )
        .await?
        .map_err(|f| self.step_failed("tag", &source, f))?;

        self.output.debug(&format!("Pushing image {}", destination));
        let pushed = self
            .timed(
                "push",
                &destination,
                self.transfer.push(&target.destination_endpoint, &target.tag),
            )
            .await?
            .map_err(|f| self.step_failed("push", &destination, f))?;
        self.verify_stream(&destination, &pushed)?;

        self.output.info(&format!(
            "Image {} pushed to {} successfully",
            source, destination
        ));
        summary.tags_migrated += 1;

        self.cleanup(&[source, destination], summary).await
    }

    /// Abort on the first error event in a pull or push stream
    fn verify_stream(&self, reference: &str, raw: &str) -> Result<()> {
        let events = decode(raw);
        match first_error(&events) {
            Some(event) => Err(self.log_error(MigrateError::Transfer {
                reference: reference.to_string(),
                message: event.error.clone().unwrap_or_default(),
                detail: event.error_detail.clone(),
            })),
            None => Ok(()),
        }
    }

    /// Remove local copies; images that are already gone are not fatal
    async fn cleanup(&self, references: &[String], summary: &mut MigrationSummary) -> Result<()> {
        for reference in references {
            match self
                .timed("remove", reference, self.transfer.remove_image(reference))
                .await?
            {
                Ok(()) => self
                    .output
                    .debug(&format!("Image {} removed locally", reference)),
                Err(TransferFailure::NotFound(message)) => {
                    self.output.error(&format!(
                        "Could not remove {}: {}",
                        reference, message
                    ));
                    summary.cleanup_failures += 1;
                }
                Err(failure) => return Err(self.step_failed("remove", reference, failure)),
            }
        }
        Ok(())
    }

    async fn timed<T>(
        &self,
        operation: &str,
        reference: &str,
        step: impl Future<Output = StepResult<T>>,
    ) -> Result<StepResult<T>> {
        match self.config.transfer_timeout {
            Some(limit) => tokio::time::timeout(limit, step).await.map_err(|_| {
                self.log_error(MigrateError::Timeout(format!(
                    "{} of {} did not finish within {}s",
                    operation,
                    reference,
                    limit.as_secs()
                )))
            }),
            None => Ok(step.await),
        }
    }

    fn step_failed(&self, operation: &str, reference: &str, failure: TransferFailure) -> MigrateError {
        let err = match failure {
            TransferFailure::ToolUnavailable(message) => MigrateError::TransferToolMissing(message),
            TransferFailure::NotFound(message) | TransferFailure::Rejected(message) => {
                MigrateError::TransferStep {
                    operation: operation.to_string(),
                    reference: reference.to_string(),
                    message,
                }
            }
        };
        self.log_error(err)
    }

    fn log_error(&self, err: MigrateError) -> MigrateError {
        self.output.error(&err.to_string());
        err
    }
}
