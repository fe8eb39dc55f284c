//! Azure backend for Stratus Cloud
//!
//! This crate implements the CloudProvider trait for Azure Resource Manager
//! and an Azure storage account.
//!
//! # Features
//!
//! - Virtual machines, created in several steps (NIC, disks, VM)
//! - Managed disks and disk snapshots
//! - Virtual networks, composite-id subnets and public IPs
//! - Network security groups, with group merging at launch
//! - Blob containers and table-backed SSH key pairs
//!
//! # Requirements
//!
//! - An [`AzureClient`] implementation speaking to ARM and the storage account
//! - `AZURE_SUBSCRIPTION_ID`, `AZURE_RESOURCE_GROUP` and `AZURE_REGION_NAME`
//!   set when building the configuration from the environment
//!
//! # Example
//!
//! ```ignore
//! use stratus_cloud::{CloudProvider, LaunchRequest, PageRequest};
//! use stratus_cloud_azure::AzureCloudProvider;
//!
//! let provider = AzureCloudProvider::from_env(client)?;
//!
//! let images = provider.compute().images().find("ubuntu-*", PageRequest::new()).await?;
//! let request = LaunchRequest::new("web", images.items()[0].clone(), "Standard_B1s")
//!     .with_key_pair("deploy");
//! let instance = provider.compute().instances().create(request).await?;
//! ```

pub mod client;
pub mod config;
pub mod error;
pub mod launch;
pub mod models;
pub mod normalize;
pub mod provider;
pub mod services;
pub mod userdata;

pub use client::AzureClient;
pub use config::AzureConfig;
pub use error::{AzureError, Result};
pub use launch::AzureLaunchResolver;
pub use provider::AzureCloudProvider;
pub use services::AzureContext;
