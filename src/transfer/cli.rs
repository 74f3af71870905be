//! Image transfer through the `docker` command-line client
//!
//! The CLI prints plain text rather than the engine's JSON stream, so pull and
//! push output is re-encoded: one `{"status": ..}` line per output line and, when
//! the command fails, a closing `{"error": .., "errorDetail": {"message": ..}}`
//! line carrying stderr.

use crate::logging::Logger;
use crate::transfer::{ImageTransfer, StepResult, TransferFailure};
use async_trait::async_trait;
use serde_json::json;
use std::process::{Output, Stdio};
use tokio::process::Command;

const NO_SUCH_IMAGE: &str = "No such image";

pub struct DockerCli {
    binary: String,
    output: Logger,
}

impl DockerCli {
    pub fn new(binary: String, output: Logger) -> Self {
        Self { binary, output }
    }

    async fn run(&self, args: &[&str]) -> StepResult<Output> {
        self.output
            .debug(&format!("Running {} {}", self.binary, args.join(" ")));

        Command::new(&self.binary)
            .args(args)
            .stdin(Stdio::null())
            .output()
            .await
            .map_err(|e| {
                if e.kind() == std::io::ErrorKind::NotFound {
                    TransferFailure::ToolUnavailable(format!("{} not found in PATH", self.binary))
                } else {
                    TransferFailure::ToolUnavailable(format!("cannot run {}: {}", self.binary, e))
                }
            })
    }

    /// Run a command whose failures are reported through the event stream
    async fn run_streaming(&self, args: &[&str]) -> StepResult<String> {
        let result = self.run(args).await?;
        Ok(encode_output(&result))
    }

    /// Run a command whose failures are returned as step failures
    async fn run_checked(&self, args: &[&str]) -> StepResult<()> {
        let result = self.run(args).await?;
        if result.status.success() {
            return Ok(());
        }
        let stderr = String::from_utf8_lossy(&result.stderr).trim().to_string();
        if stderr.contains(NO_SUCH_IMAGE) {
            Err(TransferFailure::NotFound(stderr))
        } else {
            Err(TransferFailure::Rejected(stderr))
        }
    }
}

#[async_trait]
impl ImageTransfer for DockerCli {
    async fn pull(&self, image: &str, tag: &str) -> StepResult<String> {
        let reference = format!("{}:{}", image, tag);
        self.run_streaming(&["pull", &reference]).await
    }

    async fn tag(&self, source: &str, target_repository: &str, tag: &str) -> StepResult<()> {
        let target = format!("{}:{}", target_repository, tag);
        self.run_checked(&["tag", source, &target]).await
    }

    async fn push(&self, repository: &str, tag: &str) -> StepResult<String> {
        let reference = format!("{}:{}", repository, tag);
        self.run_streaming(&["push", &reference]).await
    }

    async fn remove_image(&self, reference: &str) -> StepResult<()> {
        self.run_checked(&["rmi", reference]).await
    }
}

/// Re-encode CLI output as newline-delimited JSON events
fn encode_output(result: &Output) -> String {
    let mut raw = String::new();
    for line in String::from_utf8_lossy(&result.stdout).lines() {
        let line = line.trim();
        if !line.is_empty() {
            raw.push_str(&json!({ "status": line }).to_string());
            raw.push('\n');
        }
    }

    if !result.status.success() {
        let stderr = String::from_utf8_lossy(&result.stderr).trim().to_string();
        let message = match result.status.code() {
            Some(code) => format!("docker exited with status {}", code),
            None => "docker terminated by signal".to_string(),
        };
        raw.push_str(&json!({ "error": message, "errorDetail": { "message": stderr } }).to_string());
        raw.push('\n');
    }
    raw
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use crate::transfer::events::{decode, first_error};
    use std::os::unix::process::ExitStatusExt;
    use std::process::ExitStatus;

    fn output(code: i32, stdout: &str, stderr: &str) -> Output {
        Output {
            status: ExitStatus::from_raw(code << 8),
            stdout: stdout.as_bytes().to_vec(),
            stderr: stderr.as_bytes().to_vec(),
        }
    }

    #[test]
    fn test_successful_output_has_no_error() {
        let raw = encode_output(&output(0, "latest: Pulling from nginx\nDigest: sha256:00\n", ""));
        let events = decode(&raw);
        assert_eq!(events.len(), 2);
        assert!(first_error(&events).is_none());
    }

    #[test]
    fn test_failed_output_ends_with_error() {
        let raw = encode_output(&output(
            1,
            "The push refers to repository [new.example.com/nginx]\n",
            "denied: requested access to the resource is denied\n",
        ));
        let events = decode(&raw);
        let error = first_error(&events).unwrap();
        assert_eq!(error.error.as_deref(), Some("docker exited with status 1"));
        assert_eq!(
            error.error_detail.as_deref(),
            Some("denied: requested access to the resource is denied")
        );
    }

    #[tokio::test]
    async fn test_missing_binary_is_tool_unavailable() {
        let cli = DockerCli::new("dim-test-no-such-docker".to_string(), Logger::new_quiet());
        let err = cli.pull("old.example.com/nginx", "latest").await.unwrap_err();
        assert!(matches!(err, TransferFailure::ToolUnavailable(_)));
    }
}
