//! Azure provider implementation

use crate::client::AzureClient;
use crate::config::AzureConfig;
use crate::error::{PROVIDER, Result};
use crate::services::{
    AzureBucketService, AzureContext, AzureGatewayService, AzureImageService,
    AzureInstanceService, AzureInstanceTypeService, AzureKeyPairService, AzureNetworkService,
    AzureRegionService, AzureRouterService, AzureSecurityGroupService, AzureSnapshotService,
    AzureSubnetService, AzureVolumeService,
};
use std::sync::Arc;
use stratus_cloud::{
    BlockStoreServices, BucketService, CloudProvider, ComputeServices, NetworkingServices,
    SecurityServices,
};

/// Azure provider
pub struct AzureCloudProvider {
    ctx: AzureContext,
    compute: ComputeServices,
    block_store: BlockStoreServices,
    object_store: Arc<AzureBucketService>,
    networking: NetworkingServices,
    security: SecurityServices,
}

impl AzureCloudProvider {
    pub fn new(client: Arc<dyn AzureClient>, config: AzureConfig) -> Self {
        let ctx = AzureContext::new(client, config);

        let compute = ComputeServices::new(
            Arc::new(AzureInstanceService::new(ctx.clone())),
            Arc::new(AzureInstanceTypeService::new(ctx.clone())),
            Arc::new(AzureImageService::new(ctx.clone())),
            Arc::new(AzureRegionService::new(ctx.clone())),
        );
        let block_store = BlockStoreServices::new(
            Arc::new(AzureVolumeService::new(ctx.clone())),
            Arc::new(AzureSnapshotService::new(ctx.clone())),
        );
        let networking = NetworkingServices::new(
            Arc::new(AzureNetworkService::new(ctx.clone())),
            Arc::new(AzureSubnetService::new(ctx.clone())),
            Arc::new(AzureRouterService::new()),
            Arc::new(AzureGatewayService::new(ctx.clone())),
        );
        let security = SecurityServices::new(
            Arc::new(AzureKeyPairService::new(ctx.clone())),
            Arc::new(AzureSecurityGroupService::new(ctx.clone())),
        );

        Self {
            object_store: Arc::new(AzureBucketService::new(ctx.clone())),
            ctx,
            compute,
            block_store,
            networking,
            security,
        }
    }

    /// Build the provider with configuration read from the environment
    pub fn from_env(client: Arc<dyn AzureClient>) -> Result<Self> {
        Ok(Self::new(client, AzureConfig::from_env()?))
    }

    pub fn config(&self) -> &AzureConfig {
        self.ctx.config()
    }
}

impl CloudProvider for AzureCloudProvider {
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
