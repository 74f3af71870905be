//! Terraform driven through its command-line interface

use crate::error::{MigrateError, Result};
use crate::logging::Logger;
use crate::provision::{ProvisionResult, ProvisionTool};
use async_trait::async_trait;
use std::path::PathBuf;
use std::process::Stdio;
use tokio::process::Command;

pub struct TerraformCli {
    binary: String,
    working_dir: Option<PathBuf>,
    output: Logger,
}

impl TerraformCli {
    pub fn new(binary: String, working_dir: Option<PathBuf>, output: Logger) -> Self {
        Self {
            binary,
            working_dir,
            output,
        }
    }

    fn base_args(&self) -> Vec<String> {
        match &self.working_dir {
            Some(dir) => vec![format!("-chdir={}", dir.display())],
            None => Vec::new(),
        }
    }

    async fn run(&self, args: Vec<String>) -> Result<ProvisionResult> {
        self.output
            .debug(&format!("Running {} {}", self.binary, args.join(" ")));

        let result = Command::new(&self.binary)
            .args(&args)
            .stdin(Stdio::null())
            .output()
            .await
            .map_err(|e| {
                if e.kind() == std::io::ErrorKind::NotFound {
                    MigrateError::ProvisionToolMissing(format!("{} not found in PATH", self.binary))
                } else {
                    MigrateError::ProvisionToolMissing(format!("cannot run {}: {}", self.binary, e))
                }
            })?;

        Ok(ProvisionResult {
            exit_code: result.status.code().unwrap_or(-1),
            stdout: String::from_utf8_lossy(&result.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&result.stderr).into_owned(),
            endpoint: None,
        })
    }

    fn command_args(&self, command: &str, extra: &[&str], vars: &[(String, String)]) -> Vec<String> {
        let mut args = self.base_args();
        args.push(command.to_string());
        args.extend(["-input=false", "-no-color"].iter().map(|s| s.to_string()));
        args.extend(extra.iter().map(|s| s.to_string()));
        for (name, value) in vars {
            args.push("-var".to_string());
            args.push(format!("{}={}", name, value));
        }
        args
    }
}

/// Workspace holding the state of one repository.
///
/// Terraform rejects path separators in workspace names; `/` maps to `~`,
/// which never occurs in a repository name.
pub fn workspace_name(repository: &str) -> String {
    repository.replace('/', "~")
}

#[async_trait]
impl ProvisionTool for TerraformCli {
    async fn select_workspace(&self, repository: &str) -> Result<ProvisionResult> {
        let mut args = self.base_args();
        args.extend(["workspace", "select", "-or-create"].iter().map(|s| s.to_string()));
        args.push(workspace_name(repository));
        self.run(args).await
    }

    async fn plan(&self, vars: &[(String, String)]) -> Result<ProvisionResult> {
        self.run(self.command_args("plan", &["-detailed-exitcode"], vars))
            .await
    }

    async fn apply(&self, vars: &[(String, String)]) -> Result<ProvisionResult> {
        self.run(self.command_args("apply", &["-auto-approve"], vars))
            .await
    }

    async fn output(&self, key: &str) -> Result<ProvisionResult> {
        let mut args = self.base_args();
        args.extend(["output", "-no-color", "-raw", key].iter().map(|s| s.to_string()));

        let mut result = self.run(args).await?;
        if result.success() {
            let value = result.stdout.trim().trim_matches('"');
            if !value.is_empty() {
                result.endpoint = Some(value.to_string());
            }
        }
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_args() {
        let terraform = TerraformCli::new(
            "terraform".to_string(),
            Some(PathBuf::from("/srv/ecr")),
            Logger::new_quiet(),
        );
        let vars = vec![("repository_name".to_string(), "nginx".to_string())];
        assert_eq!(
            terraform.command_args("plan", &["-detailed-exitcode"], &vars),
            vec![
                "-chdir=/srv/ecr",
                "plan",
                "-input=false",
                "-no-color",
                "-detailed-exitcode",
                "-var",
                "repository_name=nginx",
            ]
        );
    }

    #[test]
    fn test_workspace_name() {
        assert_eq!(workspace_name("nginx"), "nginx");
        assert_eq!(workspace_name("team/api"), "team~api");
    }

    #[tokio::test]
    async fn test_missing_binary_is_fatal() {
        let terraform = TerraformCli::new(
            "dim-test-no-such-terraform".to_string(),
            None,
            Logger::new_quiet(),
        );
        let err = terraform.plan(&[]).await.unwrap_err();
        assert!(matches!(err, MigrateError::ProvisionToolMissing(_)));
    }
}
