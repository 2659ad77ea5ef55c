//! Cloud access point error types

use thiserror::Error;

/// Errors raised by ports, adapters and the provisioning workflow
#[derive(Error, Debug)]
pub enum CloudError {
    #[error("Unsupported provider: {0}")]
    UnsupportedProvider(String),

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Fetch failed: {0}")]
    Fetch(String),

    #[error("Access point cannot be used: {0}")]
    ReconciliationInvalid(String),

    #[error("Provisioning failed: {0}")]
    ProvisioningFailed(String),

    #[error("Provisioning timed out after {elapsed_ms}ms (bound {bound_ms}ms)")]
    ProvisioningTimedOut { elapsed_ms: u64, bound_ms: u64 },

    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("API error: {0}")]
    Api(String),

    #[error("Invalid native resource: {0}")]
    InvalidNative(String),

    #[error("Fixture state error: {0}")]
    StateError(String),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl CloudError {
    /// Whether the user can retry the same request without changing input
    pub fn is_retriable(&self) -> bool {
        matches!(
            self,
            CloudError::Fetch(_)
                | CloudError::Api(_)
                | CloudError::Http(_)
                | CloudError::ProvisioningFailed(_)
                | CloudError::ProvisioningTimedOut { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, CloudError>;
