//! Cinder volumes and snapshots, Swift containers

use super::{OpenStackContext, filtered_window};
use crate::error::OpenStackResultExt;
use crate::models::{ContainerQuery, SnapshotCreate, VolumeCreate, VolumeQuery};
use crate::normalize;
use async_trait::async_trait;
use futures_util::FutureExt;
use stratus_cloud::{
    Bucket, BucketService, CloudError, CursorRequest, PageRequest, PagedResult, Reference,
    ResourceKind, Result, Snapshot, SnapshotService, SnapshotSpec, Volume, VolumeService,
    VolumeSpec, validate_bucket_name, validate_resource_name,
};
use tracing::{debug, info};

#[derive(Clone)]
pub struct OpenStackVolumeService {
    ctx: OpenStackContext,
}

impl OpenStackVolumeService {
    pub fn new(ctx: OpenStackContext) -> Self {
        Self { ctx }
    }

    async fn fetch(&self, name: Option<&str>, request: CursorRequest) -> Result<Vec<Volume>> {
        debug!(kind = %ResourceKind::Volume, name, limit = request.limit, "Listing volumes");
        let query = VolumeQuery {
            name: name.map(str::to_string),
            limit: Some(request.limit),
            marker: request.marker,
        };
        let volumes = self
            .ctx
            .clients
            .cinder
            .list_volumes(&query)
            .await
            .context(ResourceKind::Volume, name.unwrap_or("*"))?;
        Ok(volumes.iter().map(normalize::volume).collect())
    }
}

#[async_trait]
impl VolumeService for OpenStackVolumeService {
    async fn get(&self, id: &str) -> Result<Option<Volume>> {
        debug!(kind = %ResourceKind::Volume, id, "Getting volume");
        let volume = self
            .ctx
            .clients
            .cinder
            .get_volume(id)
            .await
            .optional(ResourceKind::Volume, id)?;
        Ok(volume.as_ref().map(normalize::volume))
    }

    async fn list(&self, page: PageRequest) -> Result<PagedResult<Volume>> {
        self.ctx
            .cursor(&page, |req| self.fetch(None, req).boxed())
            .await
    }

    /// Cinder filters on the exact name
    async fn find(&self, name: &str, page: PageRequest) -> Result<PagedResult<Volume>> {
        self.ctx
            .cursor(&page, move |req| self.fetch(Some(name), req).boxed())
            .await
    }

    async fn create(&self, spec: VolumeSpec) -> Result<Volume> {
        validate_resource_name(ResourceKind::Volume, &spec.name)?;

        let snapshot = match &spec.snapshot {
            Some(reference) => {
                let snapshots = OpenStackSnapshotService::new(self.ctx.clone());
                Some(
                    reference
                        .resolve(ResourceKind::Snapshot, |id| snapshots.get(id))
                        .await?,
                )
            }
            None => None,
        };

        let size = match &snapshot {
            // Cinder refuses a copy smaller than its source
            Some(snapshot) => spec.size.max(snapshot.size),
            None if spec.size == 0 => {
                return Err(CloudError::InvalidConfiguration(format!(
                    "volume '{}' needs a size greater than zero",
                    spec.name
                )));
            }
            None => spec.size,
        };

        let request = VolumeCreate {
            name: spec.name.clone(),
            size: Some(size),
            availability_zone: spec.zone.clone(),
            snapshot_id: snapshot.map(|s| s.id),
            description: spec.description.clone(),
        };

        info!(kind = %ResourceKind::Volume, name = %spec.name, size, "Creating volume");
        let created = self
            .ctx
            .clients
            .cinder
            .create_volume(&request)
            .await
            .context(ResourceKind::Volume, &spec.name)?;
        Ok(normalize::volume(&created))
    }

    async fn delete(&self, id: &str) -> Result<bool> {
        info!(kind = %ResourceKind::Volume, id, "Deleting volume");
        self.ctx
            .clients
            .cinder
            .delete_volume(id)
            .await
            .absent(ResourceKind::Volume, id)
    }
}

#[derive(Clone)]
pub struct OpenStackSnapshotService {
    ctx: OpenStackContext,
}

impl OpenStackSnapshotService {
    pub fn new(ctx: OpenStackContext) -> Self {
        Self { ctx }
    }

    async fn fetch(&self, name: Option<&str>, request: CursorRequest) -> Result<Vec<Snapshot>> {
        debug!(kind = %ResourceKind::Snapshot, name, limit = request.limit, "Listing snapshots");
        let query = VolumeQuery {
            name: name.map(str::to_string),
            limit: Some(request.limit),
            marker: request.marker,
        };
        let snapshots = self
            .ctx
            .clients
            .cinder
            .list_snapshots(&query)
            .await
            .context(ResourceKind::Snapshot, name.unwrap_or("*"))?;
        Ok(snapshots.iter().map(normalize::snapshot).collect())
    }
}

#[async_trait]
impl SnapshotService for OpenStackSnapshotService {
    async fn get(&self, id: &str) -> Result<Option<Snapshot>> {
        debug!(kind = %ResourceKind::Snapshot, id, "Getting snapshot");
        let snapshot = self
            .ctx
            .clients
            .cinder
            .get_snapshot(id)
            .await
            .optional(ResourceKind::Snapshot, id)?;
        Ok(snapshot.as_ref().map(normalize::snapshot))
    }

    async fn list(&self, page: PageRequest) -> Result<PagedResult<Snapshot>> {
        self.ctx
            .cursor(&page, |req| self.fetch(None, req).boxed())
            .await
    }

    /// The name filter is passed on but not trusted; names are re-checked
    async fn find(&self, name: &str, page: PageRequest) -> Result<PagedResult<Snapshot>> {
        self.ctx
            .cursor(&page, move |req| {
                filtered_window(
                    req,
                    move |r| self.fetch(Some(name), r),
                    move |s: &Snapshot| s.name == name,
                )
                .boxed()
            })
            .await
    }

    async fn create(&self, spec: SnapshotSpec) -> Result<Snapshot> {
        validate_resource_name(ResourceKind::Snapshot, &spec.name)?;
        let volume_id = spec.volume.id();

        let request = SnapshotCreate {
            volume_id: volume_id.to_string(),
            name: spec.name.clone(),
            description: spec.description.clone(),
        };

        info!(kind = %ResourceKind::Snapshot, name = %spec.name, volume = volume_id, "Creating snapshot");
        let created = self
            .ctx
            .clients
            .cinder
            .create_snapshot(&request)
            .await
            .context(ResourceKind::Volume, volume_id)?;
        Ok(normalize::snapshot(&created))
    }

    async fn delete(&self, id: &str) -> Result<bool> {
        info!(kind = %ResourceKind::Snapshot, id, "Deleting snapshot");
        self.ctx
            .clients
            .cinder
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
            .from_snapshot(Reference::Resolved(snapshot));
        if let Some(zone) = zone {
            spec = spec.in_zone(zone);
        }
        OpenStackVolumeService::new(self.ctx.clone())
            .create(spec)
            .await
    }
}

#[derive(Clone)]
pub struct OpenStackBucketService {
    ctx: OpenStackContext,
}

impl OpenStackBucketService {
    pub fn new(ctx: OpenStackContext) -> Self {
        Self { ctx }
    }

    async fn fetch(&self, prefix: Option<&str>, request: CursorRequest) -> Result<Vec<Bucket>> {
        debug!(kind = %ResourceKind::Bucket, prefix, limit = request.limit, "Listing containers");
        let query = ContainerQuery {
            prefix: prefix.map(str::to_string),
            limit: Some(request.limit),
            marker: request.marker,
        };
        let containers = self
            .ctx
            .clients
            .swift
            .list_containers(&query)
            .await
            .context(ResourceKind::Bucket, prefix.unwrap_or("*"))?;
        Ok(containers.iter().map(normalize::bucket).collect())
    }
}

#[async_trait]
impl BucketService for OpenStackBucketService {
    /// Swift has no single-container lookup that returns the usage
    /// counters, so this is a prefix listing narrowed to the exact name
    async fn get(&self, id: &str) -> Result<Option<Bucket>> {
        let request = CursorRequest {
            limit: self.ctx.config.result_limit,
            marker: None,
        };
        let found = filtered_window(
            request,
            |r| self.fetch(Some(id), r),
            |b: &Bucket| b.id == id,
        )
        .await?;
        Ok(found.into_iter().next())
    }

    async fn list(&self, page: PageRequest) -> Result<PagedResult<Bucket>> {
        self.ctx
            .cursor(&page, |req| self.fetch(None, req).boxed())
            .await
    }

    /// Substring match on the container name
    async fn find(&self, name: &str, page: PageRequest) -> Result<PagedResult<Bucket>> {
        self.ctx
            .cursor(&page, move |req| {
                filtered_window(
                    req,
                    move |r| self.fetch(None, r),
                    move |b: &Bucket| b.name.contains(name),
                )
                .boxed()
            })
            .await
    }

    async fn create(&self, name: &str, location: Option<&str>) -> Result<Bucket> {
        validate_bucket_name(name)?;
        if let Some(location) = location {
            debug!(kind = %ResourceKind::Bucket, name, location, "Swift ignores the location");
        }

        info!(kind = %ResourceKind::Bucket, name, "Creating container");
        self.ctx
            .clients
            .swift
            .create_container(name)
            .await
            .context(ResourceKind::Bucket, name)?;

        self.get(name)
            .await?
            .ok_or_else(|| CloudError::not_found(ResourceKind::Bucket, name))
    }

    async fn delete(&self, id: &str) -> Result<bool> {
        info!(kind = %ResourceKind::Bucket, id, "Deleting container");
        self.ctx
            .clients
            .swift
            .delete_container(id)
            .await
            .absent(ResourceKind::Bucket, id)
    }
}
