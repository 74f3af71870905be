//! Error types and handlers for migration operations

pub mod handlers;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, MigrateError>;

/// Exit status for a transfer error detected in pull/push output
pub const EXIT_TRANSFER_ERROR: i32 = 1;
/// Exit status for every other fatal error
pub const EXIT_FATAL: i32 = 2;

#[derive(Error, Debug)]
pub enum MigrateError {
    /// Source registry unreachable or returned something unusable
    #[error("Discovery error: {0}")]
    Discovery(String),

    /// Provisioning tool could not be launched at all
    #[error("Provisioning tool unavailable: {0}")]
    ProvisionToolMissing(String),

    /// Plan or apply exited with a failing status
    #[error("Provisioning {step} step failed with exit code {exit_code}: {stderr}")]
    ProvisionStep {
        step: String,
        exit_code: i32,
        stderr: String,
    },

    /// Provisioning finished but no usable endpoint came out of it
    #[error("Provisioning error: {0}")]
    Provision(String),

    /// Error event decoded from a pull or push stream
    #[error("Transfer of {reference} failed: {message}{}", detail_suffix(.detail))]
    Transfer {
        reference: String,
        message: String,
        detail: Option<String>,
    },

    /// Image transfer tool or daemon unavailable
    #[error("Image transfer tool unavailable: {0}")]
    TransferToolMissing(String),

    /// Any other rejected transfer step
    #[error("{operation} of {reference} failed: {message}")]
    TransferStep {
        operation: String,
        reference: String,
        message: String,
    },

    #[error("Timeout: {0}")]
    Timeout(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

fn detail_suffix(detail: &Option<String>) -> String {
    match detail {
        Some(detail) => format!(" ({})", detail),
        None => String::new(),
    }
}

impl MigrateError {
    /// Process exit status for this error
    pub fn exit_code(&self) -> i32 {
        match self {
            MigrateError::Transfer { .. } => EXIT_TRANSFER_ERROR,
            _ => EXIT_FATAL,
        }
    }
}

impl From<reqwest::Error> for MigrateError {
    fn from(err: reqwest::Error) -> Self {
        handlers::NetworkErrorHandler::handle_network_error(&err, "registry request")
    }
}

impl From<serde_json::Error> for MigrateError {
    fn from(err: serde_json::Error) -> Self {
        MigrateError::Discovery(format!("Malformed JSON response: {}", err))
    }
}

impl From<url::ParseError> for MigrateError {
    fn from(err: url::ParseError) -> Self {
        MigrateError::Config(err.to_string())
    }
}
