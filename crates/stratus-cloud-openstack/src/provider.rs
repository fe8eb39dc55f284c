//! OpenStack provider implementation

use crate::client::OpenStackClients;
use crate::config::OpenStackConfig;
use crate::error::{PROVIDER, Result};
use crate::services::{
    OpenStackBucketService, OpenStackContext, OpenStackGatewayService, OpenStackImageService,
    OpenStackInstanceService, OpenStackInstanceTypeService, OpenStackKeyPairService,
    OpenStackNetworkService, OpenStackRegionService, OpenStackRouterService,
    OpenStackSecurityGroupService, OpenStackSnapshotService, OpenStackSubnetService,
    OpenStackVolumeService,
};
use std::sync::Arc;
use stratus_cloud::{
    BlockStoreServices, BucketService, CloudProvider, ComputeServices, NetworkingServices,
    SecurityServices,
};

/// OpenStack provider
pub struct OpenStackCloudProvider {
    ctx: OpenStackContext,
    compute: ComputeServices,
    block_store: BlockStoreServices,
    object_store: Arc<OpenStackBucketService>,
    networking: NetworkingServices,
    security: SecurityServices,
}

impl OpenStackCloudProvider {
    pub fn new(clients: OpenStackClients, config: OpenStackConfig) -> Self {
        let ctx = OpenStackContext::new(clients, config);

        let compute = ComputeServices::new(
            Arc::new(OpenStackInstanceService::new(ctx.clone())),
            Arc::new(OpenStackInstanceTypeService::new(ctx.clone())),
            Arc::new(OpenStackImageService::new(ctx.clone())),
            Arc::new(OpenStackRegionService::new(ctx.clone())),
        );
        let block_store = BlockStoreServices::new(
            Arc::new(OpenStackVolumeService::new(ctx.clone())),
            Arc::new(OpenStackSnapshotService::new(ctx.clone())),
        );
        let networking = NetworkingServices::new(
            Arc::new(OpenStackNetworkService::new(ctx.clone())),
            Arc::new(OpenStackSubnetService::new(ctx.clone())),
            Arc::new(OpenStackRouterService::new(ctx.clone())),
            Arc::new(OpenStackGatewayService::new(ctx.clone())),
        );
        let security = SecurityServices::new(
            Arc::new(OpenStackKeyPairService::new(ctx.clone())),
            Arc::new(OpenStackSecurityGroupService::new(ctx.clone())),
        );

        Self {
            object_store: Arc::new(OpenStackBucketService::new(ctx.clone())),
            ctx,
            compute,
            block_store,
            networking,
            security,
        }
    }

    /// Build the provider with configuration read from the environment
    pub fn from_env(clients: OpenStackClients) -> Result<Self> {
        Ok(Self::new(clients, OpenStackConfig::from_env()?))
    }

    pub fn config(&self) -> &OpenStackConfig {
        self.ctx.config()
    }
}

impl CloudProvider for OpenStackCloudProvider {
    fn name(&self) -> &str {
        PROVIDER
    }

    fn compute(&self) -> &ComputeServices {
        &self.compute
    }

    fn block_store(&self) -> &BlockStoreServices {
        &self.block_store
    }

    fn object_store(&self) -> &dyn BucketService {
        self.object_store.as_ref()
    }

    fn networking(&self) -> &NetworkingServices {
        &self.networking
    }

    fn security(&self) -> &SecurityServices {
        &self.security
    }
}
