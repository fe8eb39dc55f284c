//! Azure entity services

pub mod compute;
pub mod network;
pub mod security;
pub mod storage;

use crate::client::AzureClient;
use crate::config::AzureConfig;
use crate::models::Tags;
use crate::normalize::{DESCRIPTION_TAG, NAME_TAG};
use std::sync::Arc;
use stratus_cloud::{MaterializedPageSource, PageRequest, PagedResult, Resource};
use uuid::Uuid;

pub use compute::{AzureImageService, AzureInstanceService, AzureInstanceTypeService, AzureRegionService};
pub use network::{AzureGatewayService, AzureNetworkService, AzureRouterService, AzureSubnetService};
pub use security::{AzureKeyPairService, AzureSecurityGroupService};
pub use storage::{AzureBucketService, AzureSnapshotService, AzureVolumeService};

/// Client and configuration shared by every Azure service
#[derive(Clone)]
pub struct AzureContext {
    pub(crate) client: Arc<dyn AzureClient>,
    pub(crate) config: Arc<AzureConfig>,
}

impl AzureContext {
    pub fn new(client: Arc<dyn AzureClient>, config: AzureConfig) -> Self {
        Self {
            client,
            config: Arc::new(config),
        }
    }

    pub fn config(&self) -> &AzureConfig {
        &self.config
    }

    /// Client-side page over a fully listed result
    pub(crate) fn page<T: Resource>(&self, objects: Vec<T>, page: &PageRequest) -> PagedResult<T> {
        MaterializedPageSource::new(objects, self.config.result_limit).into_page(page)
    }

    /// ARM URI of a resource in the configured resource group
    pub(crate) fn resource_uri(&self, resource_type: &str, name: &str) -> String {
        format!(
            "{}/providers/{}/{}",
            self.config.resource_group_scope(),
            resource_type,
            name
        )
    }
}

/// `<name>-<6 hex>`; Azure names are keys, user names are not
pub(crate) fn unique_name(name: &str) -> String {
    let suffix = Uuid::new_v4().simple().to_string();
    format!("{}-{}", name, &suffix[..6])
}

pub(crate) fn name_tags(name: &str, description: Option<&str>) -> Tags {
    let mut tags = Tags::new();
    tags.insert(NAME_TAG.to_string(), name.to_string());
    if let Some(description) = description.filter(|d| !d.is_empty()) {
        tags.insert(DESCRIPTION_TAG.to_string(), description.to_string());
    }
    tags
}
