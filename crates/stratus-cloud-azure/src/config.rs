//! Azure backend configuration

use crate::error::{AzureError, Result};
use serde::Deserialize;
use stratus_cloud::DEFAULT_RESULT_LIMIT;

/// Name of the library-default virtual network
pub const DEFAULT_NETWORK_NAME: &str = "stratus-default-net";

/// Name of the library-default subnet inside [`DEFAULT_NETWORK_NAME`]
pub const DEFAULT_SUBNET_NAME: &str = "stratus-default-subnet";

/// Name reported for the implicit internet gateway of a virtual network
pub const DEFAULT_GATEWAY_NAME: &str = "stratus-default-gateway";

/// Address space of networks created without an explicit CIDR
pub const DEFAULT_NETWORK_CIDR: &str = "10.0.0.0/16";

/// Address prefix of the library-default subnet
pub const DEFAULT_SUBNET_CIDR: &str = "10.0.1.0/24";

/// Partition holding every key pair entity in the key table
pub const KEY_PAIR_PARTITION_KEY: &str = "00000000-0000-0000-0000-000000000000";

/// Login user created on new virtual machines
pub const DEFAULT_VM_USER_NAME: &str = "stratus";

/// Azure subscription, resource group and region the backend works in
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct AzureConfig {
    pub subscription_id: String,
    pub resource_group: String,
    pub region_name: String,

    /// Storage account backing buckets and the key pair table
    #[serde(default)]
    pub storage_account: Option<String>,

    #[serde(default = "default_vm_user_name")]
    pub vm_default_user_name: String,

    /// Page size used when a list call does not set a limit
    #[serde(default = "default_result_limit")]
    pub result_limit: usize,
}

fn default_vm_user_name() -> String {
    DEFAULT_VM_USER_NAME.to_string()
}

fn default_result_limit() -> usize {
    DEFAULT_RESULT_LIMIT
}

fn required(name: &str) -> Result<String> {
    std::env::var(name).map_err(|_| AzureError::MissingEnvVar(name.to_string()))
}

impl AzureConfig {
    pub fn new(
        subscription_id: impl Into<String>,
        resource_group: impl Into<String>,
        region_name: impl Into<String>,
    ) -> Self {
        Self {
            subscription_id: subscription_id.into(),
            resource_group: resource_group.into(),
            region_name: region_name.into(),
            storage_account: None,
            vm_default_user_name: default_vm_user_name(),
            result_limit: default_result_limit(),
        }
    }

    /// Create AzureConfig from environment variables
    pub fn from_env() -> Result<Self> {
        let mut config = Self::new(
            required("AZURE_SUBSCRIPTION_ID")?,
            required("AZURE_RESOURCE_GROUP")?,
            required("AZURE_REGION_NAME")?,
        );

        config.storage_account = std::env::var("AZURE_STORAGE_ACCOUNT").ok();

        if let Ok(user) = std::env::var("AZURE_VM_DEFAULT_USER_NAME") {
            config.vm_default_user_name = user;
        }

        if let Ok(limit) = std::env::var("STRATUS_RESULT_LIMIT") {
            config.result_limit = limit
                .parse()
                .ok()
                .filter(|l: &usize| *l > 0)
                .ok_or_else(|| AzureError::InvalidEnvVar {
                    name: "STRATUS_RESULT_LIMIT".to_string(),
                    value: limit.clone(),
                })?;
        }

        Ok(config)
    }

    /// ARM scope of the configured resource group
    pub fn resource_group_scope(&self) -> String {
        format!(
            "/subscriptions/{}/resourceGroups/{}",
            self.subscription_id, self.resource_group
        )
    }

    /// Home directory path of the SSH authorized keys file for new VMs
    pub fn authorized_keys_path(&self) -> String {
        format!("/home/{}/.ssh/authorized_keys", self.vm_default_user_name)
    }
}
