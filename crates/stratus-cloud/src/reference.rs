//! Resource references and composite identifiers

use crate::error::{CloudError, ResourceKind, Result};
use crate::resource::Resource;
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::str::FromStr;

/// Delimiter joining a parent network id and a subnet id.
///
/// Reserved: it must not appear inside either component.
pub const SUBNET_ID_DELIMITER: &str = "|$|";

/// Either a bare identifier or an already-resolved resource.
///
/// Services resolve a reference once, at the entry of each public operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reference<T> {
    Id(String),
    Resolved(T),
}

impl<T: Resource> Reference<T> {
    pub fn id(&self) -> &str {
        match self {
            Reference::Id(id) => id,
            Reference::Resolved(resource) => resource.id(),
        }
    }

    pub fn resolved(&self) -> Option<&T> {
        match self {
            Reference::Id(_) => None,
            Reference::Resolved(resource) => Some(resource),
        }
    }
}

impl<T: Resource + Clone> Reference<T> {
    /// Turn the reference into a concrete resource, looking it up by id
    /// when needed. A dangling id is a `NotFound` error.
    pub async fn resolve<'a, F, Fut>(&'a self, kind: ResourceKind, lookup: F) -> Result<T>
    where
        F: FnOnce(&'a str) -> Fut,
        Fut: Future<Output = Result<Option<T>>>,
    {
        match self {
            Reference::Resolved(resource) => Ok(resource.clone()),
            Reference::Id(id) => lookup(id)
                .await?
                .ok_or_else(|| CloudError::not_found(kind, id.clone())),
        }
    }
}

impl<T> From<&str> for Reference<T> {
    fn from(id: &str) -> Self {
        Reference::Id(id.to_string())
    }
}

impl<T> From<String> for Reference<T> {
    fn from(id: String) -> Self {
        Reference::Id(id)
    }
}

impl<T: Resource> From<T> for Reference<T> {
    fn from(resource: T) -> Self {
        Reference::Resolved(resource)
    }
}

/// Subnet identifier.
///
/// Some providers (Azure) cannot resolve a subnet without its parent network,
/// so the id carries both components and renders as
/// `<network><SUBNET_ID_DELIMITER><subnet>`. Providers with globally unique
/// subnet ids (OpenStack) use the single-component form.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "String", from = "String")]
pub struct SubnetId {
    network: Option<String>,
    subnet: String,
    rendered: String,
}

impl SubnetId {
    pub fn composite(network: impl Into<String>, subnet: impl Into<String>) -> Self {
        let network = network.into();
        let subnet = subnet.into();
        let rendered = format!("{}{}{}", network, SUBNET_ID_DELIMITER, subnet);
        Self {
            network: Some(network),
            subnet,
            rendered,
        }
    }

    pub fn simple(subnet: impl Into<String>) -> Self {
        let subnet = subnet.into();
        Self {
            network: None,
            rendered: subnet.clone(),
            subnet,
        }
    }

    /// Parse a rendered id; the inverse of `Display`
    pub fn parse(value: &str) -> Self {
        match value.split_once(SUBNET_ID_DELIMITER) {
            Some((network, subnet)) => Self::composite(network, subnet),
            None => Self::simple(value),
        }
    }

    pub fn network(&self) -> Option<&str> {
        self.network.as_deref()
    }

    pub fn subnet(&self) -> &str {
        &self.subnet
    }

    pub fn as_str(&self) -> &str {
        &self.rendered
    }

    pub fn is_composite(&self) -> bool {
        self.network.is_some()
    }
}

impl std::fmt::Display for SubnetId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.rendered)
    }
}

impl FromStr for SubnetId {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Ok(Self::parse(s))
    }
}

impl From<String> for SubnetId {
    fn from(value: String) -> Self {
        Self::parse(&value)
    }
}

impl From<&str> for SubnetId {
    fn from(value: &str) -> Self {
        Self::parse(value)
    }
}

impl From<SubnetId> for String {
    fn from(value: SubnetId) -> Self {
        value.rendered
    }
}
