//! Cloud provider error types

use thiserror::Error;

/// Category of managed resource, used to give errors and logs context
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceKind {
    Instance,
    InstanceType,
    Image,
    Region,
    Volume,
    Snapshot,
    Bucket,
    KeyPair,
    SecurityGroup,
    Network,
    Subnet,
    Router,
    Gateway,
    FloatingIp,
    NetworkInterface,
}

impl std::fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ResourceKind::Instance => write!(f, "instance"),
            ResourceKind::InstanceType => write!(f, "instance type"),
            ResourceKind::Image => write!(f, "image"),
            ResourceKind::Region => write!(f, "region"),
            ResourceKind::Volume => write!(f, "volume"),
            ResourceKind::Snapshot => write!(f, "snapshot"),
            ResourceKind::Bucket => write!(f, "bucket"),
            ResourceKind::KeyPair => write!(f, "key pair"),
            ResourceKind::SecurityGroup => write!(f, "security group"),
            ResourceKind::Network => write!(f, "network"),
            ResourceKind::Subnet => write!(f, "subnet"),
            ResourceKind::Router => write!(f, "router"),
            ResourceKind::Gateway => write!(f, "gateway"),
            ResourceKind::FloatingIp => write!(f, "floating ip"),
            ResourceKind::NetworkInterface => write!(f, "network interface"),
        }
    }
}

/// Cloud provider errors
#[derive(Error, Debug)]
pub enum CloudError {
    #[error("{kind} not found: {id}")]
    NotFound { kind: ResourceKind, id: String },

    #[error("{kind} already exists: {name}")]
    Conflict { kind: ResourceKind, name: String },

    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    #[error("Invalid {kind} name '{name}': {reason}")]
    InvalidName {
        kind: ResourceKind,
        name: String,
        reason: String,
    },

    #[error("Unsupported on {provider}: {feature}")]
    Unsupported { provider: String, feature: String },

    #[error("{provider} {kind} request failed for '{target}': {message}")]
    ProviderFailure {
        provider: String,
        kind: ResourceKind,
        target: String,
        message: String,
    },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl CloudError {
    pub fn not_found(kind: ResourceKind, id: impl Into<String>) -> Self {
        CloudError::NotFound {
            kind,
            id: id.into(),
        }
    }

    pub fn unsupported(provider: impl Into<String>, feature: impl Into<String>) -> Self {
        CloudError::Unsupported {
            provider: provider.into(),
            feature: feature.into(),
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, CloudError::NotFound { .. })
    }

    pub fn is_conflict(&self) -> bool {
        matches!(self, CloudError::Conflict { .. })
    }
}

pub type Result<T> = std::result::Result<T, CloudError>;
