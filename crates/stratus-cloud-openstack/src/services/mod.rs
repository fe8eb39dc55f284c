//! OpenStack entity services

pub mod compute;
pub mod network;
pub mod security;
pub mod storage;

use crate::client::OpenStackClients;
use crate::config::OpenStackConfig;
use futures_util::future::BoxFuture;
use std::future::Future;
use std::sync::Arc;
use stratus_cloud::{
    CursorPageSource, CursorRequest, MaterializedPageSource, PageRequest, PageSource, PagedResult,
    Resource, Result,
};

pub use compute::{
    OpenStackImageService, OpenStackInstanceService, OpenStackInstanceTypeService,
    OpenStackRegionService,
};
pub use network::{
    OpenStackGatewayService, OpenStackNetworkService, OpenStackRouterService,
    OpenStackSubnetService,
};
pub use security::{OpenStackKeyPairService, OpenStackSecurityGroupService};
pub use storage::{OpenStackBucketService, OpenStackSnapshotService, OpenStackVolumeService};

/// Service clients and configuration shared by every OpenStack service
#[derive(Clone)]
pub struct OpenStackContext {
    pub(crate) clients: OpenStackClients,
    pub(crate) config: Arc<OpenStackConfig>,
}

impl OpenStackContext {
    pub fn new(clients: OpenStackClients, config: OpenStackConfig) -> Self {
        Self {
            clients,
            config: Arc::new(config),
        }
    }

    pub fn config(&self) -> &OpenStackConfig {
        &self.config
    }

    /// Client-side page over a fully listed result
    pub(crate) fn page<T: Resource>(&self, objects: Vec<T>, page: &PageRequest) -> PagedResult<T> {
        MaterializedPageSource::new(objects, self.config.result_limit).into_page(page)
    }

    /// Server-side page through a call that takes limit and marker
    pub(crate) async fn cursor<'a, T, F>(
        &self,
        page: &PageRequest,
        fetch: F,
    ) -> Result<PagedResult<T>>
    where
        T: Resource + Send + Sync + 'a,
        F: Fn(CursorRequest) -> BoxFuture<'a, Result<Vec<T>>> + Send + Sync + 'a,
    {
        CursorPageSource::new(self.config.result_limit, fetch)
            .fetch(page)
            .await
    }
}

/// Fill one cursor window with items passing `keep`.
///
/// For listings whose server-side filter is missing or unreliable: batches
/// are fetched until `request.limit` items matched or the listing ran dry,
/// so the lookahead item still tells whether more matches may follow.
pub(crate) async fn filtered_window<T, F, Fut>(
    request: CursorRequest,
    fetch: F,
    keep: impl Fn(&T) -> bool,
) -> Result<Vec<T>>
where
    T: Resource,
    F: Fn(CursorRequest) -> Fut,
    Fut: Future<Output = Result<Vec<T>>>,
{
    let mut matched = Vec::new();
    let mut marker = request.marker;
    loop {
        let batch = fetch(CursorRequest {
            limit: request.limit,
            marker: marker.clone(),
        })
        .await?;
        let exhausted = batch.len() < request.limit;
        marker = batch.last().map(|o| o.id().to_string());
        matched.extend(batch.into_iter().filter(|o| keep(o)));

        if exhausted || matched.len() >= request.limit {
            break;
        }
    }
    matched.truncate(request.limit);
    Ok(matched)
}
