//! Standardized error handling for registry and daemon responses

use crate::error::MigrateError;
use reqwest::StatusCode;

/// Standard error handler for HTTP responses
pub struct HttpErrorHandler;

impl HttpErrorHandler {
    /// Handle source registry errors during discovery
    pub fn handle_discovery_error(
        status: StatusCode,
        error_text: &str,
        operation: &str,
    ) -> MigrateError {
        let error_msg = match status.as_u16() {
            401 => format!("Unauthorized to perform {}: {}", operation, error_text),
            403 => format!(
                "Forbidden: insufficient permissions for {}: {}",
                operation, error_text
            ),
            404 => format!("Resource not found for {}: {}", operation, error_text),
            429 => format!("Rate limited during {}: {}", operation, error_text),
            500 => format!("Registry server error during {}: {}", operation, error_text),
            502 | 503 => format!("Registry unavailable for {}: {}", operation, error_text),
            _ => format!("{} failed (status {}): {}", operation, status, error_text),
        };

        MigrateError::Discovery(error_msg)
    }

    /// Extract the `message` field of a daemon error body, falling back to the raw text
    pub fn daemon_message(error_text: &str) -> String {
        serde_json::from_str::<serde_json::Value>(error_text)
            .ok()
            .and_then(|v| v.get("message").and_then(|m| m.as_str()).map(str::to_string))
            .unwrap_or_else(|| error_text.trim().to_string())
    }
}

/// Network error categorization and handling
pub struct NetworkErrorHandler;

impl NetworkErrorHandler {
    /// Categorize and format network errors with helpful context
    pub fn handle_network_error(error: &reqwest::Error, context: &str) -> MigrateError {
        if error.is_timeout() {
            MigrateError::Discovery(format!("{} timeout: {}", context, error))
        } else if error.is_connect() {
            MigrateError::Discovery(format!("Connection error during {}: {}", context, error))
        } else if error.is_decode() {
            MigrateError::Discovery(format!("Malformed response during {}: {}", context, error))
        } else if error.to_string().contains("dns") {
            MigrateError::Discovery(format!("DNS resolution error for {}: {}", context, error))
        } else {
            MigrateError::Discovery(format!("{} network error: {}", context, error))
        }
    }
}
