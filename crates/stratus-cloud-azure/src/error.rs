//! Azure backend error types

use stratus_cloud::{CloudError, ResourceKind};
use thiserror::Error;
use tracing::warn;

/// Errors raised by an [`AzureClient`](crate::client::AzureClient)
#[derive(Error, Debug)]
pub enum AzureError {
    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Resource already exists: {0}")]
    Conflict(String),

    #[error("Azure API error ({code}): {message}")]
    Api { code: String, message: String },

    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),

    #[error("Invalid value for {name}: {value}")]
    InvalidEnvVar { name: String, value: String },

    #[error("JSON parse error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("Cloud error: {0}")]
    CloudError(#[from] CloudError),
}

pub type Result<T> = std::result::Result<T, AzureError>;

pub(crate) const PROVIDER: &str = "azure";

impl AzureError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, AzureError::NotFound(_))
    }

    /// Convert into the provider-agnostic taxonomy, attaching the entity
    /// kind and the identifier the request was about
    pub fn into_cloud(self, kind: ResourceKind, target: &str) -> CloudError {
        match self {
            AzureError::NotFound(_) => CloudError::not_found(kind, target),
            AzureError::Conflict(_) => CloudError::Conflict {
                kind,
                name: target.to_string(),
            },
            AzureError::MissingEnvVar(_) | AzureError::InvalidEnvVar { .. } => {
                CloudError::InvalidConfiguration(self.to_string())
            }
            AzureError::CloudError(e) => e,
            other => CloudError::ProviderFailure {
                provider: PROVIDER.to_string(),
                kind,
                target: target.to_string(),
                message: other.to_string(),
            },
        }
    }
}

/// Boundary conversions from client results into service results
pub(crate) trait AzureResultExt<T> {
    /// Any error, with context
    fn context(self, kind: ResourceKind, target: &str) -> stratus_cloud::Result<T>;

    /// Not-found becomes `None`
    fn optional(self, kind: ResourceKind, target: &str) -> stratus_cloud::Result<Option<T>>;

    /// Success or not-found both mean the resource is gone
    fn absent(self, kind: ResourceKind, target: &str) -> stratus_cloud::Result<bool>;
}

impl<T> AzureResultExt<T> for Result<T> {
    fn context(self, kind: ResourceKind, target: &str) -> stratus_cloud::Result<T> {
        self.map_err(|e| e.into_cloud(kind, target))
    }

    fn optional(self, kind: ResourceKind, target: &str) -> stratus_cloud::Result<Option<T>> {
        match self {
            Ok(value) => Ok(Some(value)),
            Err(e) if e.is_not_found() => {
                warn!(%kind, id = target, "Not found: {}", e);
                Ok(None)
            }
            Err(e) => Err(e.into_cloud(kind, target)),
        }
    }

    fn absent(self, kind: ResourceKind, target: &str) -> stratus_cloud::Result<bool> {
        match self {
            Ok(_) => Ok(true),
            Err(e) if e.is_not_found() => {
                warn!(%kind, id = target, "Already absent: {}", e);
                Ok(true)
            }
            Err(e) => Err(e.into_cloud(kind, target)),
        }
    }
}
