//! Cloud provider trait definition

use crate::service::{
    BucketService, GatewayService, ImageService, InstanceService, InstanceTypeService,
    KeyPairService, NetworkService, RegionService, RouterService, SecurityGroupService,
    SnapshotService, SubnetService, VolumeService,
};
use std::sync::Arc;

/// Cloud provider abstraction trait
///
/// All backends (Azure, OpenStack) implement this trait to expose their
/// entity services grouped by domain. Construction is the only logic a
/// provider carries; every operation delegates to a service.
pub trait CloudProvider: Send + Sync {
    /// Returns the provider name (e.g., "azure", "openstack")
    fn name(&self) -> &str;

    fn compute(&self) -> &ComputeServices;

    fn block_store(&self) -> &BlockStoreServices;

    fn object_store(&self) -> &dyn BucketService;

    fn networking(&self) -> &NetworkingServices;

    fn security(&self) -> &SecurityServices;
}

/// Instances, instance types, images and regions
#[derive(Clone)]
pub struct ComputeServices {
    instances: Arc<dyn InstanceService>,
    instance_types: Arc<dyn InstanceTypeService>,
    images: Arc<dyn ImageService>,
    regions: Arc<dyn RegionService>,
}

impl ComputeServices {
    pub fn new(
        instances: Arc<dyn InstanceService>,
        instance_types: Arc<dyn InstanceTypeService>,
        images: Arc<dyn ImageService>,
        regions: Arc<dyn RegionService>,
    ) -> Self {
        Self {
            instances,
            instance_types,
            images,
            regions,
        }
    }

    pub fn instances(&self) -> &dyn InstanceService {
        self.instances.as_ref()
    }

    pub fn instance_types(&self) -> &dyn InstanceTypeService {
        self.instance_types.as_ref()
    }

    pub fn images(&self) -> &dyn ImageService {
        self.images.as_ref()
    }

    pub fn regions(&self) -> &dyn RegionService {
        self.regions.as_ref()
    }
}

/// Volumes and snapshots
#[derive(Clone)]
pub struct BlockStoreServices {
    volumes: Arc<dyn VolumeService>,
    snapshots: Arc<dyn SnapshotService>,
}

impl BlockStoreServices {
    pub fn new(volumes: Arc<dyn VolumeService>, snapshots: Arc<dyn SnapshotService>) -> Self {
        Self { volumes, snapshots }
    }

    pub fn volumes(&self) -> &dyn VolumeService {
        self.volumes.as_ref()
    }

    pub fn snapshots(&self) -> &dyn SnapshotService {
        self.snapshots.as_ref()
    }
}

/// Networks, subnets, routers and internet gateways
#[derive(Clone)]
pub struct NetworkingServices {
    networks: Arc<dyn NetworkService>,
    subnets: Arc<dyn SubnetService>,
    routers: Arc<dyn RouterService>,
    gateways: Arc<dyn GatewayService>,
}

impl NetworkingServices {
    pub fn new(
        networks: Arc<dyn NetworkService>,
        subnets: Arc<dyn SubnetService>,
        routers: Arc<dyn RouterService>,
        gateways: Arc<dyn GatewayService>,
    ) -> Self {
        Self {
            networks,
            subnets,
            routers,
            gateways,
        }
    }

    pub fn networks(&self) -> &dyn NetworkService {
        self.networks.as_ref()
    }

    pub fn subnets(&self) -> &dyn SubnetService {
        self.subnets.as_ref()
    }

    pub fn routers(&self) -> &dyn RouterService {
        self.routers.as_ref()
    }

    pub fn gateways(&self) -> &dyn GatewayService {
        self.gateways.as_ref()
    }
}

/// Key pairs and security groups
#[derive(Clone)]
pub struct SecurityServices {
    key_pairs: Arc<dyn KeyPairService>,
    security_groups: Arc<dyn SecurityGroupService>,
}

impl SecurityServices {
    pub fn new(
        key_pairs: Arc<dyn KeyPairService>,
        security_groups: Arc<dyn SecurityGroupService>,
    ) -> Self {
        Self {
            key_pairs,
            security_groups,
        }
    }

    pub fn key_pairs(&self) -> &dyn KeyPairService {
        self.key_pairs.as_ref()
    }

    pub fn security_groups(&self) -> &dyn SecurityGroupService {
        self.security_groups.as_ref()
    }
}
