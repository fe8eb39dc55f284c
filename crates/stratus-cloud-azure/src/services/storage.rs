//! Managed disks, disk snapshots and blob containers

use super::{AzureContext, name_tags, unique_name};
use crate::error::AzureResultExt;
use crate::models::{CreationData, Disk, DiskProperties, DiskSnapshot};
use crate::normalize;
use async_trait::async_trait;
use stratus_cloud::{
    Bucket, BucketService, CloudError, NameFilter, PageRequest, PagedResult, Reference,
    ResourceKind, Result, Snapshot, SnapshotService, SnapshotSpec, Volume, VolumeService,
    VolumeSpec,
};
use tracing::{debug, info};

const DISK_TYPE: &str = "Microsoft.Compute/disks";
const SNAPSHOT_TYPE: &str = "Microsoft.Compute/snapshots";

#[derive(Clone)]
pub struct AzureVolumeService {
    ctx: AzureContext,
}

impl AzureVolumeService {
    pub fn new(ctx: AzureContext) -> Self {
        Self { ctx }
    }

    async fn all(&self) -> Result<Vec<Volume>> {
        debug!(kind = %ResourceKind::Volume, "Listing disks");
        let disks = self
            .ctx
            .client
            .list_disks()
            .await
            .context(ResourceKind::Volume, "*")?;
        Ok(disks.iter().map(normalize::volume).collect())
    }
}

#[async_trait]
impl VolumeService for AzureVolumeService {
    async fn get(&self, id: &str) -> Result<Option<Volume>> {
        debug!(kind = %ResourceKind::Volume, id, "Getting disk");
        let disk = self
            .ctx
            .client
            .get_disk(id)
            .await
            .optional(ResourceKind::Volume, id)?;
        Ok(disk.as_ref().map(normalize::volume))
    }

    async fn list(&self, page: PageRequest) -> Result<PagedResult<Volume>> {
        Ok(self.ctx.page(self.all().await?, &page))
    }

    async fn find(&self, name: &str, page: PageRequest) -> Result<PagedResult<Volume>> {
        let matched = NameFilter::glob(name).retain(self.all().await?);
        Ok(self.ctx.page(matched, &page))
    }

    async fn create(&self, spec: VolumeSpec) -> Result<Volume> {
        let snapshot = match &spec.snapshot {
            Some(reference) => {
                let snapshots = AzureSnapshotService::new(self.ctx.clone());
                Some(
                    reference
                        .resolve(ResourceKind::Snapshot, |id| snapshots.get(id))
                        .await?,
                )
            }
            None => None,
        };

        let creation_data = match &snapshot {
            Some(snapshot) => CreationData {
                create_option: "Copy".to_string(),
                source_resource_id: Some(
                    snapshot
                        .resource_id
                        .clone()
                        .unwrap_or_else(|| self.ctx.resource_uri(SNAPSHOT_TYPE, &snapshot.id)),
                ),
            },
            None => {
                if spec.size == 0 {
                    return Err(CloudError::InvalidConfiguration(format!(
                        "volume '{}' needs a size greater than zero",
                        spec.name
                    )));
                }
                CreationData {
                    create_option: "Empty".to_string(),
                    source_resource_id: None,
                }
            }
        };

        // A copy is at least as large as its source
        let size = match &snapshot {
            Some(snapshot) => spec.size.max(snapshot.size),
            None => spec.size,
        };

        let disk_name = unique_name(&spec.name);
        let disk = Disk {
            location: spec
                .zone
                .clone()
                .unwrap_or_else(|| self.ctx.config.region_name.clone()),
            tags: name_tags(&spec.name, spec.description.as_deref()),
            properties: DiskProperties {
                disk_size_gb: Some(size),
                creation_data,
                ..Default::default()
            },
            ..Default::default()
        };

        info!(kind = %ResourceKind::Volume, name = %disk_name, size, "Creating disk");
        let created = self
            .ctx
            .client
            .create_disk(&disk_name, &disk)
            .await
            .context(ResourceKind::Volume, &disk_name)?;
        Ok(normalize::volume(&created))
    }

    async fn delete(&self, id: &str) -> Result<bool> {
        info!(kind = %ResourceKind::Volume, id, "Deleting disk");
        self.ctx
            .client
            .delete_disk(id)
            .await
            .absent(ResourceKind::Volume, id)
    }
}

#[derive(Clone)]
pub struct AzureSnapshotService {
    ctx: AzureContext,
}

impl AzureSnapshotService {
    pub fn new(ctx: AzureContext) -> Self {
        Self { ctx }
    }

    async fn all(&self) -> Result<Vec<Snapshot>> {
        debug!(kind = %ResourceKind::Snapshot, "Listing snapshots");
        let snapshots = self
            .ctx
            .client
            .list_snapshots()
            .await
            .context(ResourceKind::Snapshot, "*")?;
        Ok(snapshots.iter().map(normalize::snapshot).collect())
    }
}

#[async_trait]
impl SnapshotService for AzureSnapshotService {
    async fn get(&self, id: &str) -> Result<Option<Snapshot>> {
        debug!(kind = %ResourceKind::Snapshot, id, "Getting snapshot");
        let snapshot = self
            .ctx
            .client
            .get_snapshot(id)
            .await
            .optional(ResourceKind::Snapshot, id)?;
        Ok(snapshot.as_ref().map(normalize::snapshot))
    }

    async fn list(&self, page: PageRequest) -> Result<PagedResult<Snapshot>> {
        Ok(self.ctx.page(self.all().await?, &page))
    }

    async fn find(&self, name: &str, page: PageRequest) -> Result<PagedResult<Snapshot>> {
        let matched = NameFilter::glob(name).retain(self.all().await?);
        Ok(self.ctx.page(matched, &page))
    }

    async fn create(&self, spec: SnapshotSpec) -> Result<Snapshot> {
        let volumes = AzureVolumeService::new(self.ctx.clone());
        let volume = spec
            .volume
            .resolve(ResourceKind::Volume, |id| volumes.get(id))
            .await?;

        let snapshot_name = unique_name(&spec.name);
        let snapshot = DiskSnapshot {
            location: self.ctx.config.region_name.clone(),
            tags: name_tags(&spec.name, spec.description.as_deref()),
            properties: DiskProperties {
                disk_size_gb: Some(volume.size),
                creation_data: CreationData {
                    create_option: "Copy".to_string(),
                    source_resource_id: Some(
                        volume
                            .resource_id
                            .clone()
                            .unwrap_or_else(|| self.ctx.resource_uri(DISK_TYPE, &volume.id)),
                    ),
                },
                ..Default::default()
            },
            ..Default::default()
        };

        info!(kind = %ResourceKind::Snapshot, name = %snapshot_name, volume = %volume.id, "Creating snapshot");
        let created = self
            .ctx
            .client
            .create_snapshot(&snapshot_name, &snapshot)
            .await
            .context(ResourceKind::Snapshot, &snapshot_name)?;
        Ok(normalize::snapshot(&created))
    }

    async fn delete(&self, id: &str) -> Result<bool> {
        info!(kind = %ResourceKind::Snapshot, id, "Deleting snapshot");
        self.ctx
            .client
            .delete_snapshot(id)
            .await
            .absent(ResourceKind::Snapshot, id)
    }

    async fn create_volume(
        &self,
        snapshot: &Reference<Snapshot>,
        size: Option<u32>,
        zone: Option<&str>,
    ) -> Result<Volume> {
        let snapshot = snapshot
            .resolve(ResourceKind::Snapshot, |id| self.get(id))
            .await?;

        let mut spec = VolumeSpec::new(snapshot.name.clone(), size.unwrap_or(snapshot.size))
            .from_snapshot(snapshot);
        if let Some(zone) = zone {
            spec = spec.in_zone(zone);
        }
        AzureVolumeService::new(self.ctx.clone()).create(spec).await
    }
}

#[derive(Clone)]
pub struct AzureBucketService {
    ctx: AzureContext,
}

impl AzureBucketService {
    pub fn new(ctx: AzureContext) -> Self {
        Self { ctx }
    }

    async fn containers(&self, prefix: Option<&str>) -> Result<Vec<Bucket>> {
        debug!(kind = %ResourceKind::Bucket, ?prefix, "Listing containers");
        let containers = self
            .ctx
            .client
            .list_containers(prefix)
            .await
            .context(ResourceKind::Bucket, prefix.unwrap_or("*"))?;
        Ok(containers.iter().map(normalize::bucket).collect())
    }
}

#[async_trait]
impl BucketService for AzureBucketService {
    async fn get(&self, id: &str) -> Result<Option<Bucket>> {
        debug!(kind = %ResourceKind::Bucket, id, "Getting container");
        let container = self
            .ctx
            .client
            .get_container(id)
            .await
            .optional(ResourceKind::Bucket, id)?;
        Ok(container.as_ref().map(normalize::bucket))
    }

    async fn list(&self, page: PageRequest) -> Result<PagedResult<Bucket>> {
        Ok(self.ctx.page(self.containers(None).await?, &page))
    }

    /// Server-side prefix filter
    async fn find(&self, name: &str, page: PageRequest) -> Result<PagedResult<Bucket>> {
        Ok(self.ctx.page(self.containers(Some(name)).await?, &page))
    }

    async fn create(&self, name: &str, _location: Option<&str>) -> Result<Bucket> {
        // Container names are lowercase only
        let name = name.to_lowercase();
        info!(kind = %ResourceKind::Bucket, name = %name, "Creating container");
        let container = self
            .ctx
            .client
            .create_container(&name)
            .await
            .context(ResourceKind::Bucket, &name)?;
        Ok(normalize::bucket(&container))
    }

    async fn delete(&self, id: &str) -> Result<bool> {
        info!(kind = %ResourceKind::Bucket, id, "Deleting container");
        self.ctx
            .client
            .delete_container(id)
            .await
            .absent(ResourceKind::Bucket, id)
    }
}
