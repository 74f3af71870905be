// Client for the legacy (v1) registry API. Only the two read-only discovery
// endpoints are used: the catalog search and the per-repository tag listing.

use crate::error::handlers::HttpErrorHandler;
use crate::error::{MigrateError, Result};
use crate::logging::Logger;
use crate::registry::{ImageRef, SourceRegistry, TagEntry};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;

#[derive(Debug, Deserialize)]
struct SearchResponse {
    results: Vec<SearchResult>,
}

#[derive(Debug, Deserialize)]
struct SearchResult {
    name: String,
}

pub struct RegistryClientBuilder {
    address: String,
    timeout: Duration,
    output: Logger,
}

impl RegistryClientBuilder {
    pub fn new(address: String) -> Self {
        Self {
            address,
            timeout: Duration::from_secs(30),
            output: Logger::new(true),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_logger(mut self, output: Logger) -> Self {
        self.output = output;
        self
    }

    pub fn build(self) -> Result<RegistryClient> {
        // Legacy registries are routinely deployed with self-signed certificates,
        // so certificate and hostname validation stay off for the source side.
        let client = Client::builder()
            .danger_accept_invalid_certs(true)
            .danger_accept_invalid_hostnames(true)
            .timeout(self.timeout)
            .build()?;

        let (base_url, host) = split_address(&self.address)?;

        Ok(RegistryClient {
            client,
            base_url,
            host,
            output: self.output,
        })
    }
}

pub struct RegistryClient {
    client: Client,
    base_url: String,
    host: String,
    output: Logger,
}

impl RegistryClient {
    pub fn builder(address: String) -> RegistryClientBuilder {
        RegistryClientBuilder::new(address)
    }

    /// Registry host as it appears in image references
    pub fn host(&self) -> &str {
        &self.host
    }

    async fn get_json(&self, url: &str, operation: &str) -> Result<String> {
        self.output.debug(&format!("GET {}", url));

        let response = self.client.get(url).send().await?;
        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            return Err(HttpErrorHandler::handle_discovery_error(
                status, &body, operation,
            ));
        }
        Ok(body)
    }
}

#[async_trait]
impl SourceRegistry for RegistryClient {
    async fn list_repositories(&self) -> Result<Vec<ImageRef>> {
        self.output.debug("Getting list of images");
        let url = format!("{}/v1/search", self.base_url);
        let body = self.get_json(&url, "catalog search").await?;
        let images = parse_catalog(&self.host, &body)?;
        self.output
            .debug(&format!("Found {} repositories on {}", images.len(), self.host));
        Ok(images)
    }

    async fn list_tags(&self, image: &ImageRef) -> Result<Vec<TagEntry>> {
        let url = format!(
            "{}/v1/repositories/{}/tags",
            self.base_url, image.repository_name
        );
        let body = self.get_json(&url, "tag listing").await?;
        let tags = parse_tags(&body)?;
        self.output.debug(&format!(
            "Found {} tags for repository {}",
            tags.len(),
            image.repository_name
        ));
        Ok(tags)
    }
}

/// Split a source address into the HTTPS base URL and the bare host.
///
/// A bare host gets `https://`; an explicit scheme is kept as given.
fn split_address(address: &str) -> Result<(String, String)> {
    let address = address.trim().trim_end_matches('/');
    let base_url = if address.starts_with("http://") || address.starts_with("https://") {
        address.to_string()
    } else {
        format!("https://{}", address)
    };

    let parsed = url::Url::parse(&base_url)?;
    let host = parsed
        .host_str()
        .ok_or_else(|| MigrateError::Config(format!("No host in source address: {}", address)))?;
    let host = match parsed.port() {
        Some(port) => format!("{}:{}", host, port),
        None => host.to_string(),
    };

    Ok((base_url, host))
}

/// Parse a `/v1/search` body into ordered, de-duplicated repository references
pub fn parse_catalog(registry_host: &str, body: &str) -> Result<Vec<ImageRef>> {
    let search: SearchResponse = serde_json::from_str(body)?;
    let mut images: Vec<ImageRef> = Vec::with_capacity(search.results.len());
    for result in search.results {
        let image = ImageRef::from_catalog(registry_host, &result.name);
        if !images.contains(&image) {
            images.push(image);
        }
    }
    Ok(images)
}

/// Parse a `/v1/repositories/{name}/tags` body, keeping the registry's order
pub fn parse_tags(body: &str) -> Result<Vec<TagEntry>> {
    let tags: serde_json::Map<String, serde_json::Value> = serde_json::from_str(body)?;
    Ok(tags
        .into_iter()
        .map(|(tag, id)| TagEntry {
            tag,
            digest_or_id: match id {
                serde_json::Value::String(s) => s,
                other => other.to_string(),
            },
        })
        .collect())
}
