//! Stratus Cloud
//!
//! This crate provides a provider-agnostic view of compute, block storage,
//! object storage, networking and security resources. Backends normalize
//! their native objects into one uniform resource model and expose the same
//! entity-service contract for every kind.
//!
//! # Supported Providers
//!
//! - **Azure**: `stratus-cloud-azure` (ARM resources, storage tables)
//! - **OpenStack**: `stratus-cloud-openstack` (Nova, Cinder, Neutron, Swift, Keystone)
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────┐
//! │                    Caller                        │
//! └─────────────────┬───────────────────────────────┘
//!                   │
//! ┌─────────────────▼───────────────────────────────┐
//! │                stratus-cloud                     │
//! │  ┌──────────────────────────────────────────┐   │
//! │  │  trait CloudProvider (aggregator)         │   │
//! │  │  compute / block_store / object_store /   │   │
//! │  │  networking / security                    │   │
//! │  └──────────────────────────────────────────┘   │
//! │  ┌──────────────┐ ┌──────────────┐ ┌─────────┐  │
//! │  │ Entity       │ │ PagedResult  │ │ Launch  │  │
//! │  │ services     │ │ PageSource   │ │ config  │  │
//! │  └──────────────┘ └──────────────┘ └─────────┘  │
//! └───────┬─────────────────┬───────────────────────┘
//!         │                 │
//! ┌───────▼───────┐ ┌───────▼───────┐
//! │     azure     │ │   openstack   │
//! │   provider    │ │   provider    │
//! └───────────────┘ └───────────────┘
//! ```

pub mod error;
pub mod launch;
pub mod matching;
pub mod naming;
pub mod paging;
pub mod provider;
pub mod reference;
pub mod resource;
pub mod service;

// Re-exports
pub use error::{CloudError, ResourceKind, Result};
pub use launch::{
    BlockDeviceMapping, DeviceKind, DeviceSource, LaunchConfig, LaunchRequest, LaunchStage,
};
pub use matching::{NameFilter, NameMatch};
pub use naming::{validate_bucket_name, validate_resource_name};
pub use paging::{
    CursorPageSource, CursorRequest, DEFAULT_RESULT_LIMIT, MaterializedPageSource, PageRequest,
    PageSource, PagedResult, Paginator,
};
pub use provider::{
    BlockStoreServices, CloudProvider, ComputeServices, NetworkingServices, SecurityServices,
};
pub use reference::{Reference, SUBNET_ID_DELIMITER, SubnetId};
pub use resource::{
    Bucket, FloatingIp, ImageState, Instance, InstanceState, InstanceType, InternetGateway,
    KeyPair, MachineImage, Network, NetworkState, PlacementZone, Region, Resource, Router,
    RuleDirection, SecurityGroup, SecurityGroupRule, Snapshot, SnapshotState, Subnet, Volume,
    VolumeState,
};
pub use service::{
    BucketService, GatewayService, ImageService, InstanceService, InstanceTypeService,
    KeyPairService, NetworkService, RegionService, RouterService, SecurityGroupService,
    SnapshotService, SnapshotSpec, SubnetService, VolumeService, VolumeSpec,
};
