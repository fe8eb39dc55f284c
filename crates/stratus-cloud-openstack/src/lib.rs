//! OpenStack backend for Stratus Cloud
//!
//! This crate implements the CloudProvider trait on top of Nova, Cinder,
//! Neutron, Swift and Keystone.
//!
//! # Features
//!
//! - Servers launched with Nova block device mapping v2 and Neutron ports
//! - Server-side paging for servers, flavors, images, volumes, snapshots
//!   and containers
//! - Default network, subnet and router routed to the external network
//! - Regions from Keystone v3, or from the v2 service catalog
//!
//! # Requirements
//!
//! - [`OpenStackClients`] for an authenticated session
//! - `OS_REGION_NAME` set when building the configuration from the
//!   environment
//!
//! # Example
//!
//! ```ignore
//! use stratus_cloud::{CloudProvider, DeviceSource, LaunchConfig, LaunchRequest};
//! use stratus_cloud_openstack::{OpenStackClients, OpenStackCloudProvider};
//!
//! let provider = OpenStackCloudProvider::from_env(OpenStackClients::from_shared(session))?;
//!
//! let mut config = LaunchConfig::new();
//! config.add_root_device(Some(20)).add_ephemeral_device();
//! let request = LaunchRequest::new("web", "ubuntu-22.04", "m1.small")
//!     .with_key_pair("deploy")
//!     .with_security_group("web")
//!     .with_launch_config(config);
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

pub use client::{CinderApi, KeystoneApi, NeutronApi, NovaApi, OpenStackClients, SwiftApi};
pub use config::OpenStackConfig;
pub use error::{OpenStackError, Result};
pub use launch::OpenStackLaunchResolver;
pub use provider::OpenStackCloudProvider;
pub use services::OpenStackContext;
