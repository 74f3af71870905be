//! Image transfer through the Docker Engine HTTP API
//!
//! Pull and push responses are chunked streams of JSON lines; they are read to
//! the end and returned verbatim, with each complete line echoed at DEBUG.

use crate::config::PushCredentials;
use crate::error::{MigrateError, Result};
use crate::error::handlers::HttpErrorHandler;
use crate::logging::Logger;
use crate::transfer::events::TransferEvent;
use crate::transfer::{ImageTransfer, StepResult, TransferFailure};
use async_trait::async_trait;
use base64::Engine as _;
use base64::engine::general_purpose::URL_SAFE;
use futures_util::StreamExt;
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde_json::json;

const REGISTRY_AUTH_HEADER: &str = "X-Registry-Auth";

pub struct DockerEngine {
    client: Client,
    host: String,
    registry_auth: String,
    output: Logger,
}

impl DockerEngine {
    pub fn new(host: String, credentials: Option<PushCredentials>, output: Logger) -> Result<Self> {
        let client = Client::builder()
            .no_proxy()
            .build()
            .map_err(|e| MigrateError::Config(format!("cannot build Docker engine client: {}", e)))?;
        Ok(Self {
            client,
            host: host.trim_end_matches('/').to_string(),
            registry_auth: encode_registry_auth(credentials.as_ref()),
            output,
        })
    }

    async fn send(&self, request: RequestBuilder, context: &str) -> StepResult<Response> {
        let response = request.send().await.map_err(|e| {
            if e.is_connect() || e.is_timeout() {
                TransferFailure::ToolUnavailable(format!(
                    "Docker engine at {} unreachable during {}: {}",
                    self.host, context, e
                ))
            } else {
                TransferFailure::Rejected(format!("{} request failed: {}", context, e))
            }
        })?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        let message = HttpErrorHandler::daemon_message(&body);
        if status == StatusCode::NOT_FOUND {
            Err(TransferFailure::NotFound(message))
        } else {
            Err(TransferFailure::Rejected(format!(
                "{} failed (status {}): {}",
                context, status, message
            )))
        }
    }

    /// Read a progress stream to completion
    async fn collect_stream(&self, response: Response) -> StepResult<String> {
        let mut raw = String::new();
        let mut pending = Vec::new();
        let mut stream = response.bytes_stream();

        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(|e| {
                TransferFailure::Rejected(format!("progress stream interrupted: {}", e))
            })?;
            pending.extend_from_slice(&chunk);

            while let Some(pos) = pending.iter().position(|b| *b == b'\n') {
                let line: Vec<u8> = pending.drain(..=pos).collect();
                let line = String::from_utf8_lossy(&line).into_owned();
                self.echo_line(&line);
                raw.push_str(&line);
            }
        }
        raw.push_str(&String::from_utf8_lossy(&pending));
        Ok(raw)
    }

    fn echo_line(&self, line: &str) {
        if let Ok(event) = serde_json::from_str::<TransferEvent>(line.trim()) {
            let text = event.describe();
            if !text.is_empty() {
                self.output.debug(&text);
            }
        }
    }
}

#[async_trait]
impl ImageTransfer for DockerEngine {
    async fn pull(&self, image: &str, tag: &str) -> StepResult<String> {
        let url = format!("{}/images/create", self.host);
        let request = self
            .client
            .post(&url)
            .query(&[("fromImage", image), ("tag", tag)]);
        let response = self.send(request, "pull").await?;
        self.collect_stream(response).await
    }

    async fn tag(&self, source: &str, target_repository: &str, tag: &str) -> StepResult<()> {
        let url = format!("{}/images/{}/tag", self.host, source);
        let request = self
            .client
            .post(&url)
            .query(&[("repo", target_repository), ("tag", tag)]);
        self.send(request, "tag").await?;
        Ok(())
    }

    async fn push(&self, repository: &str, tag: &str) -> StepResult<String> {
        let url = format!("{}/images/{}/push", self.host, repository);
        let request = self
            .client
            .post(&url)
            .query(&[("tag", tag)])
            .header(REGISTRY_AUTH_HEADER, &self.registry_auth);
        let response = self.send(request, "push").await?;
        self.collect_stream(response).await
    }

    async fn remove_image(&self, reference: &str) -> StepResult<()> {
        let url = format!("{}/images/{}", self.host, reference);
        self.send(self.client.delete(&url), "remove").await?;
        Ok(())
    }
}

/// Base64url-encoded auth config expected in `X-Registry-Auth`
fn encode_registry_auth(credentials: Option<&PushCredentials>) -> String {
    let auth = match credentials {
        Some(credentials) => json!({
            "username": credentials.username,
            "password": credentials.password,
        }),
        None => json!({}),
    };
    URL_SAFE.encode(auth.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    /// Serve one canned HTTP response and hand back the request head
    async fn serve_once(status: &str, body: &str) -> (String, tokio::task::JoinHandle<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let response = format!(
            "HTTP/1.1 {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
            status,
            body.len(),
            body
        );
        let handle = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut buf = vec![0u8; 8192];
            let n = socket.read(&mut buf).await.unwrap();
            socket.write_all(response.as_bytes()).await.unwrap();
            socket.shutdown().await.ok();
            String::from_utf8_lossy(&buf[..n]).into_owned()
        });
        (format!("http://{}", addr), handle)
    }

    #[test]
    fn test_anonymous_registry_auth() {
        assert_eq!(encode_registry_auth(None), "e30=");
    }

    #[test]
    fn test_registry_auth_roundtrips_credentials() {
        let credentials = PushCredentials {
            username: "AWS".to_string(),
            password: "secret".to_string(),
        };
        let decoded = URL_SAFE.decode(encode_registry_auth(Some(&credentials))).unwrap();
        let value: serde_json::Value = serde_json::from_slice(&decoded).unwrap();
        assert_eq!(value["username"], "AWS");
        assert_eq!(value["password"], "secret");
    }

    #[tokio::test]
    async fn test_push_returns_raw_stream() {
        let body = "{\"status\":\"Pushed\",\"id\":\"a1\"}\n{\"error\":\"denied\",\"errorDetail\":{\"message\":\"access denied\"}}\n";
        let (host, handle) = serve_once("200 OK", body).await;
        let engine = DockerEngine::new(host, None, Logger::new_quiet()).unwrap();

        let raw = engine.push("new.example.com/nginx", "latest").await.unwrap();
        assert_eq!(raw, body);

        let request = handle.await.unwrap();
        assert!(request.starts_with("POST /images/new.example.com/nginx/push?tag=latest"));
        assert!(request.to_ascii_lowercase().contains("x-registry-auth: e30="));
    }

    #[tokio::test]
    async fn test_remove_missing_image_is_not_found() {
        let (host, _handle) =
            serve_once("404 Not Found", "{\"message\":\"No such image: nginx:latest\"}").await;
        let engine = DockerEngine::new(host, None, Logger::new_quiet()).unwrap();

        let err = engine.remove_image("nginx:latest").await.unwrap_err();
        assert_eq!(err, TransferFailure::NotFound("No such image: nginx:latest".to_string()));
    }

    #[tokio::test]
    async fn test_unreachable_engine_is_tool_unavailable() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let engine =
            DockerEngine::new(format!("http://{}", addr), None, Logger::new_quiet()).unwrap();
        let err = engine.pull("old.example.com/nginx", "latest").await.unwrap_err();
        assert!(matches!(err, TransferFailure::ToolUnavailable(_)));
    }
}
