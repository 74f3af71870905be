//! Destination repository provisioning for managed registries
//!
//! [`RepositoryProvisioner::ensure_repository`] selects a per-repository
//! workspace, then runs plan, apply and output through a [`ProvisionTool`] and
//! returns the endpoint images are pushed to. Each repository keeps its own
//! state, so provisioning one name never touches another.
//!
//! A tool that cannot be launched and a workspace that cannot be selected are
//! always fatal; failing plan/apply steps are handled according to
//! [`ProvisionPolicy`].

pub mod terraform;

pub use terraform::TerraformCli;

use crate::config::ProvisionPolicy;
use crate::error::{MigrateError, Result};
use crate::logging::Logger;
use async_trait::async_trait;

/// Outcome of one provisioning tool invocation
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProvisionResult {
    pub exit_code: i32,
    pub stdout: String,
    pub stderr: String,
    pub endpoint: Option<String>,
}

impl ProvisionResult {
    pub fn success(&self) -> bool {
        self.exit_code == 0
    }
}

/// Plan exit status under `-detailed-exitcode`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlanStatus {
    NoChanges,
    ChangesPending,
    Failed(i32),
}

impl PlanStatus {
    pub fn from_exit_code(code: i32) -> Self {
        match code {
            0 => PlanStatus::NoChanges,
            2 => PlanStatus::ChangesPending,
            other => PlanStatus::Failed(other),
        }
    }
}

/// Infrastructure-as-code tool driven by the provisioner
#[async_trait]
pub trait ProvisionTool: Send + Sync {
    /// Switch to the state owned by `repository`, creating it when missing
    async fn select_workspace(&self, repository: &str) -> Result<ProvisionResult>;

    async fn plan(&self, vars: &[(String, String)]) -> Result<ProvisionResult>;

    async fn apply(&self, vars: &[(String, String)]) -> Result<ProvisionResult>;

    /// Read one output value; `endpoint` carries it on success
    async fn output(&self, key: &str) -> Result<ProvisionResult>;
}

pub struct RepositoryProvisioner {
    tool: Box<dyn ProvisionTool>,
    name_variable: String,
    output_key: String,
    policy: ProvisionPolicy,
    output: Logger,
}

impl RepositoryProvisioner {
    pub fn new(
        tool: Box<dyn ProvisionTool>,
        name_variable: String,
        output_key: String,
        policy: ProvisionPolicy,
        output: Logger,
    ) -> Self {
        Self {
            tool,
            name_variable,
            output_key,
            policy,
            output,
        }
    }

    /// Make sure the repository `name` exists and return its endpoint
    pub async fn ensure_repository(&self, name: &str) -> Result<String> {
        let vars = vec![(self.name_variable.clone(), name.to_string())];

        let workspace = self.tool.select_workspace(name).await?;
        if !workspace.success() {
            let err = MigrateError::ProvisionStep {
                step: "workspace".to_string(),
                exit_code: workspace.exit_code,
                stderr: workspace.stderr.trim().to_string(),
            };
            self.output.error(&err.to_string());
            return Err(err);
        }

        self.output
            .debug(&format!("Planning destination repository {}", name));
        let plan = self.tool.plan(&vars).await?;
        match PlanStatus::from_exit_code(plan.exit_code) {
            PlanStatus::NoChanges => self
                .output
                .debug(&format!("Repository {} is up to date", name)),
            PlanStatus::ChangesPending => self
                .output
                .debug(&format!("Repository {} has pending changes", name)),
            PlanStatus::Failed(code) => self.step_failed("plan", code, &plan.stderr)?,
        }

        self.output
            .debug(&format!("Applying destination repository {}", name));
        let apply = self.tool.apply(&vars).await?;
        if !apply.success() {
            self.step_failed("apply", apply.exit_code, &apply.stderr)?;
        }

        let lookup = self.tool.output(&self.output_key).await?;
        let endpoint = match lookup.endpoint.clone() {
            Some(endpoint) if lookup.success() && !endpoint.is_empty() => endpoint,
            _ => {
                return Err(MigrateError::Provision(format!(
                    "no value for output '{}' after provisioning {} (exit code {}): {}",
                    self.output_key,
                    name,
                    lookup.exit_code,
                    lookup.stderr.trim()
                )));
            }
        };

        self.output
            .info(&format!("Destination for {} resolved to {}", name, endpoint));
        Ok(endpoint)
    }

    fn step_failed(&self, step: &str, exit_code: i32, stderr: &str) -> Result<()> {
        let err = MigrateError::ProvisionStep {
            step: step.to_string(),
            exit_code,
            stderr: stderr.trim().to_string(),
        };
        self.output.error(&err.to_string());
        match self.policy {
            ProvisionPolicy::Strict => Err(err),
            ProvisionPolicy::Lenient => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    /// Scripted tool: plan/apply exit codes are taken from queues
    struct ScriptedTool {
        plans: Mutex<Vec<i32>>,
        applies: Mutex<Vec<i32>>,
        endpoint: Option<String>,
        workspace_code: i32,
        workspaces: Mutex<Vec<String>>,
    }

    impl ScriptedTool {
        fn new(plans: Vec<i32>, applies: Vec<i32>, endpoint: Option<&str>) -> Self {
            Self {
                plans: Mutex::new(plans),
                applies: Mutex::new(applies),
                endpoint: endpoint.map(str::to_string),
                workspace_code: 0,
                workspaces: Mutex::new(Vec::new()),
            }
        }

        fn result(code: i32) -> ProvisionResult {
            ProvisionResult {
                exit_code: code,
                stderr: if code == 0 { String::new() } else { "boom".to_string() },
                ..Default::default()
            }
        }
    }

    #[async_trait]
    impl ProvisionTool for ScriptedTool {
        async fn select_workspace(&self, repository: &str) -> Result<ProvisionResult> {
            self.workspaces.lock().unwrap().push(repository.to_string());
            Ok(Self::result(self.workspace_code))
        }

        async fn plan(&self, vars: &[(String, String)]) -> Result<ProvisionResult> {
            assert_eq!(vars[0].0, "repository_name");
            Ok(Self::result(self.plans.lock().unwrap().remove(0)))
        }

        async fn apply(&self, _vars: &[(String, String)]) -> Result<ProvisionResult> {
            Ok(Self::result(self.applies.lock().unwrap().remove(0)))
        }

        async fn output(&self, key: &str) -> Result<ProvisionResult> {
            assert_eq!(key, "registry_url");
            Ok(ProvisionResult {
                endpoint: self.endpoint.clone(),
                ..Default::default()
            })
        }
    }

    /// Lets a test keep a handle on the tool after boxing it
    struct SharedTool(std::sync::Arc<ScriptedTool>);

    #[async_trait]
    impl ProvisionTool for SharedTool {
        async fn select_workspace(&self, repository: &str) -> Result<ProvisionResult> {
            self.0.select_workspace(repository).await
        }

        async fn plan(&self, vars: &[(String, String)]) -> Result<ProvisionResult> {
            self.0.plan(vars).await
        }

        async fn apply(&self, vars: &[(String, String)]) -> Result<ProvisionResult> {
            self.0.apply(vars).await
        }

        async fn output(&self, key: &str) -> Result<ProvisionResult> {
            self.0.output(key).await
        }
    }

    fn provisioner(tool: impl ProvisionTool + 'static, policy: ProvisionPolicy) -> RepositoryProvisioner {
        RepositoryProvisioner::new(
            Box::new(tool),
            "repository_name".to_string(),
            "registry_url".to_string(),
            policy,
            Logger::new_quiet(),
        )
    }

    #[test]
    fn test_plan_status() {
        assert_eq!(PlanStatus::from_exit_code(0), PlanStatus::NoChanges);
        assert_eq!(PlanStatus::from_exit_code(2), PlanStatus::ChangesPending);
        assert_eq!(PlanStatus::from_exit_code(1), PlanStatus::Failed(1));
    }

    #[tokio::test]
    async fn test_changes_pending_then_apply() {
        let tool = ScriptedTool::new(
            vec![2],
            vec![0],
            Some("123.dkr.ecr.region.amazonaws.com/myimage"),
        );
        let endpoint = provisioner(tool, ProvisionPolicy::Strict)
            .ensure_repository("myimage")
            .await
            .unwrap();
        assert_eq!(endpoint, "123.dkr.ecr.region.amazonaws.com/myimage");
    }

    #[tokio::test]
    async fn test_strict_policy_aborts_on_plan_failure() {
        let tool = ScriptedTool::new(vec![1], vec![0], Some("endpoint"));
        let err = provisioner(tool, ProvisionPolicy::Strict)
            .ensure_repository("myimage")
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            MigrateError::ProvisionStep { ref step, exit_code: 1, .. } if step == "plan"
        ));
    }

    #[tokio::test]
    async fn test_lenient_policy_continues_after_failures() {
        let tool = ScriptedTool::new(vec![1], vec![1], Some("endpoint"));
        let endpoint = provisioner(tool, ProvisionPolicy::Lenient)
            .ensure_repository("myimage")
            .await
            .unwrap();
        assert_eq!(endpoint, "endpoint");
    }

    #[tokio::test]
    async fn test_workspace_is_selected_before_plan() {
        let tool = std::sync::Arc::new(ScriptedTool::new(vec![2], vec![0], Some("endpoint")));
        let provisioner = provisioner(SharedTool(tool.clone()), ProvisionPolicy::Strict);
        provisioner.ensure_repository("team/api").await.unwrap();
        assert_eq!(*tool.workspaces.lock().unwrap(), vec!["team/api"]);
    }

    #[tokio::test]
    async fn test_workspace_failure_is_fatal_under_lenient_policy() {
        let mut tool = ScriptedTool::new(vec![0], vec![0], Some("endpoint"));
        tool.workspace_code = 1;
        let err = provisioner(tool, ProvisionPolicy::Lenient)
            .ensure_repository("myimage")
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            MigrateError::ProvisionStep { ref step, exit_code: 1, .. } if step == "workspace"
        ));
    }

    #[tokio::test]
    async fn test_missing_output_is_fatal() {
        let tool = ScriptedTool::new(vec![0], vec![0], None);
        let err = provisioner(tool, ProvisionPolicy::Lenient)
            .ensure_repository("myimage")
            .await
            .unwrap_err();
        assert!(matches!(err, MigrateError::Provision(_)));
    }
}
