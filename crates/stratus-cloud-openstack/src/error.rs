//! OpenStack backend error types

use stratus_cloud::{CloudError, ResourceKind};
use thiserror::Error;
use tracing::warn;

/// Errors raised by the OpenStack service clients
#[derive(Error, Debug)]
pub enum OpenStackError {
    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Resource already exists: {0}")]
    Conflict(String),

    #[error("OpenStack API error ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("No endpoint for service '{0}' in the catalog")]
    MissingEndpoint(String),

    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),

    #[error("Invalid value for {name}: {value}")]
    InvalidEnvVar { name: String, value: String },

    #[error("JSON parse error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("Cloud error: {0}")]
    CloudError(#[from] CloudError),
}

pub type Result<T> = std::result::Result<T, OpenStackError>;

pub(crate) const PROVIDER: &str = "openstack";

impl OpenStackError {
    pub fn is_not_found(&self) -> bool {
        match self {
            OpenStackError::NotFound(_) => true,
            OpenStackError::Api { status, .. } => *status == 404,
            _ => false,
        }
    }

    pub fn is_conflict(&self) -> bool {
        match self {
            OpenStackError::Conflict(_) => true,
            OpenStackError::Api { status, .. } => *status == 409,
            _ => false,
        }
    }

    /// Convert into the provider-agnostic taxonomy
    pub fn into_cloud(self, kind: ResourceKind, target: &str) -> CloudError {
        if self.is_not_found() {
            return CloudError::not_found(kind, target);
        }
        if self.is_conflict() {
            return CloudError::Conflict {
                kind,
                name: target.to_string(),
            };
        }
        match self {
            OpenStackError::MissingEnvVar(_) | OpenStackError::InvalidEnvVar { .. } => {
                CloudError::InvalidConfiguration(self.to_string())
            }
            OpenStackError::CloudError(e) => e,
            other => CloudError::ProviderFailure {
                provider: PROVIDER.to_string(),
                kind,
                target: target.to_string(),
                message: other.to_string(),
            },
        }
    }
}

pub(crate) trait OpenStackResultExt<T> {
    fn context(self, kind: ResourceKind, target: &str) -> stratus_cloud::Result<T>;

    /// Not-found becomes `None`
    fn optional(self, kind: ResourceKind, target: &str) -> stratus_cloud::Result<Option<T>>;

    /// Success or not-found both mean the resource is gone
    fn absent(self, kind: ResourceKind, target: &str) -> stratus_cloud::Result<bool>;
}

impl<T> OpenStackResultExt<T> for Result<T> {
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
