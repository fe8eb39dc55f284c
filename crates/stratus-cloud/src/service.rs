//! Entity service traits
//!
//! One trait per entity kind. Every backend implements the same contract:
//!
//! - `get` returns `Ok(None)` when the id does not resolve; other provider
//!   errors propagate.
//! - `list` and `find` never fail with `NotFound`; no match is an empty page.
//! - `create` is not idempotent unless the provider keys the kind by name
//!   (key pairs), in which case a second create fails with `Conflict`.
//! - `delete` returns `Ok(true)` when the resource is absent afterwards,
//!   whether or not it existed before the call.

use crate::error::{CloudError, ResourceKind, Result};
use crate::launch::LaunchRequest;
use crate::matching::NameFilter;
use crate::paging::{
    DEFAULT_RESULT_LIMIT, MaterializedPageSource, PageRequest, PagedResult, Paginator,
};
use crate::reference::Reference;
use crate::resource::{
    Bucket, FloatingIp, Instance, InstanceType, InternetGateway, KeyPair, MachineImage, Network,
    Region, Router, SecurityGroup, SecurityGroupRule, Snapshot, Subnet, Volume,
};
use async_trait::async_trait;
use tracing::{debug, info};

/// Parameters for a new volume
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VolumeSpec {
    pub name: String,

    /// Size in GB
    pub size: u32,
    pub zone: Option<String>,
    pub snapshot: Option<Reference<Snapshot>>,
    pub description: Option<String>,
}

impl VolumeSpec {
    pub fn new(name: impl Into<String>, size: u32) -> Self {
        Self {
            name: name.into(),
            size,
            zone: None,
            snapshot: None,
            description: None,
        }
    }

    pub fn in_zone(mut self, zone: impl Into<String>) -> Self {
        self.zone = Some(zone.into());
        self
    }

    pub fn from_snapshot(mut self, snapshot: impl Into<Reference<Snapshot>>) -> Self {
        self.snapshot = Some(snapshot.into());
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

/// Parameters for a new snapshot
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SnapshotSpec {
    pub name: String,
    pub volume: Reference<Volume>,
    pub description: Option<String>,
}

impl SnapshotSpec {
    pub fn new(name: impl Into<String>, volume: impl Into<Reference<Volume>>) -> Self {
        Self {
            name: name.into(),
            volume: volume.into(),
            description: None,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

#[async_trait]
pub trait InstanceService: Send + Sync {
    async fn get(&self, id: &str) -> Result<Option<Instance>>;
    async fn list(&self, page: PageRequest) -> Result<PagedResult<Instance>>;
    async fn find(&self, name: &str, page: PageRequest) -> Result<PagedResult<Instance>>;

    /// Resolve the request and provision the instance with everything it
    /// needs. Sub-resources provisioned before a failure are left in place.
    async fn create(&self, request: LaunchRequest) -> Result<Instance>;

    /// Delete the instance along with the disks marked delete-on-terminate
    async fn delete(&self, id: &str) -> Result<bool>;
}

#[async_trait]
pub trait InstanceTypeService: Send + Sync {
    async fn list(&self, page: PageRequest) -> Result<PagedResult<InstanceType>>;

    /// Page size for requests that carry no limit
    fn result_limit(&self) -> usize {
        DEFAULT_RESULT_LIMIT
    }

    async fn get(&self, id: &str) -> Result<Option<InstanceType>> {
        debug!(kind = %ResourceKind::InstanceType, id, "Looking up by scanning all pages");
        let all = Paginator::new(None, |req| self.list(req)).collect_all().await?;
        Ok(all.into_iter().find(|t| t.id == id))
    }

    /// Exact-name filter over the full list
    async fn find(&self, name: &str, page: PageRequest) -> Result<PagedResult<InstanceType>> {
        let all = Paginator::new(None, |req| self.list(req)).collect_all().await?;
        let matched = NameFilter::exact(name).retain(all);
        Ok(MaterializedPageSource::new(matched, self.result_limit()).into_page(&page))
    }
}

#[async_trait]
pub trait ImageService: Send + Sync {
    async fn get(&self, id: &str) -> Result<Option<MachineImage>>;
    async fn list(&self, page: PageRequest) -> Result<PagedResult<MachineImage>>;
    async fn find(&self, name: &str, page: PageRequest) -> Result<PagedResult<MachineImage>>;
}

#[async_trait]
pub trait RegionService: Send + Sync {
    async fn get(&self, id: &str) -> Result<Option<Region>>;
    async fn list(&self, page: PageRequest) -> Result<PagedResult<Region>>;

    /// The region this provider is configured for
    async fn current(&self) -> Result<Region>;
}

#[async_trait]
pub trait VolumeService: Send + Sync {
    async fn get(&self, id: &str) -> Result<Option<Volume>>;
    async fn list(&self, page: PageRequest) -> Result<PagedResult<Volume>>;
    async fn find(&self, name: &str, page: PageRequest) -> Result<PagedResult<Volume>>;
    async fn create(&self, spec: VolumeSpec) -> Result<Volume>;
    async fn delete(&self, id: &str) -> Result<bool>;
}

#[async_trait]
pub trait SnapshotService: Send + Sync {
    async fn get(&self, id: &str) -> Result<Option<Snapshot>>;
    async fn list(&self, page: PageRequest) -> Result<PagedResult<Snapshot>>;
    async fn find(&self, name: &str, page: PageRequest) -> Result<PagedResult<Snapshot>>;
    async fn create(&self, spec: SnapshotSpec) -> Result<Snapshot>;
    async fn delete(&self, id: &str) -> Result<bool>;

    /// New volume copied from a snapshot. Size defaults to the snapshot size.
    async fn create_volume(
        &self,
        snapshot: &Reference<Snapshot>,
        size: Option<u32>,
        zone: Option<&str>,
    ) -> Result<Volume>;
}

#[async_trait]
pub trait BucketService: Send + Sync {
    async fn get(&self, id: &str) -> Result<Option<Bucket>>;
    async fn list(&self, page: PageRequest) -> Result<PagedResult<Bucket>>;
    async fn find(&self, name: &str, page: PageRequest) -> Result<PagedResult<Bucket>>;
    async fn create(&self, name: &str, location: Option<&str>) -> Result<Bucket>;
    async fn delete(&self, id: &str) -> Result<bool>;
}

#[async_trait]
pub trait KeyPairService: Send + Sync {
    async fn get(&self, id: &str) -> Result<Option<KeyPair>>;
    async fn list(&self, page: PageRequest) -> Result<PagedResult<KeyPair>>;
    async fn find(&self, name: &str, page: PageRequest) -> Result<PagedResult<KeyPair>>;

    /// Register a new key pair. The private key is only returned here.
    async fn create(&self, name: &str) -> Result<KeyPair>;
    async fn delete(&self, id: &str) -> Result<bool>;
}

#[async_trait]
pub trait SecurityGroupService: Send + Sync {
    async fn get(&self, id: &str) -> Result<Option<SecurityGroup>>;
    async fn list(&self, page: PageRequest) -> Result<PagedResult<SecurityGroup>>;
    async fn find(&self, name: &str, page: PageRequest) -> Result<PagedResult<SecurityGroup>>;
    async fn create(
        &self,
        name: &str,
        description: &str,
        network_id: Option<&str>,
    ) -> Result<SecurityGroup>;
    async fn delete(&self, id: &str) -> Result<bool>;

    async fn add_rule(&self, group_id: &str, rule: SecurityGroupRule) -> Result<SecurityGroupRule>;

    /// Create a new group named `name` holding the union of the rules of
    /// `groups`. Duplicate rules are added once.
    async fn merge(&self, name: &str, groups: &[SecurityGroup]) -> Result<SecurityGroup> {
        let ids: Vec<&str> = groups.iter().map(|g| g.id.as_str()).collect();
        let description = format!("Merge security groups {}", ids.join(","));
        let merged = self.create(name, &description, None).await?;
        info!(group = %merged.id, sources = ids.len(), "Merging security groups");

        let mut rules = merged.rules.clone();
        for rule in groups.iter().flat_map(|g| g.rules.iter()) {
            if rules.contains(rule) {
                continue;
            }
            self.add_rule(&merged.id, rule.clone()).await?;
            rules.push(rule.clone());
        }

        self.get(&merged.id)
            .await?
            .ok_or_else(|| CloudError::not_found(ResourceKind::SecurityGroup, merged.id.clone()))
    }
}

#[async_trait]
pub trait NetworkService: Send + Sync {
    async fn get(&self, id: &str) -> Result<Option<Network>>;
    async fn list(&self, page: PageRequest) -> Result<PagedResult<Network>>;
    async fn find(&self, name: &str, page: PageRequest) -> Result<PagedResult<Network>>;

    /// Create a network. Backends fall back to their default CIDR.
    async fn create(&self, name: Option<&str>, cidr_block: Option<&str>) -> Result<Network>;
    async fn delete(&self, id: &str) -> Result<bool>;

    async fn floating_ips(&self, page: PageRequest) -> Result<PagedResult<FloatingIp>>;
    async fn create_floating_ip(&self) -> Result<FloatingIp>;
}

#[async_trait]
pub trait SubnetService: Send + Sync {
    async fn get(&self, id: &str) -> Result<Option<Subnet>>;
    async fn list(&self, page: PageRequest) -> Result<PagedResult<Subnet>>;

    /// Subnets of a single network
    async fn list_in(&self, network_id: &str, page: PageRequest) -> Result<PagedResult<Subnet>>;
    async fn find(&self, name: &str, page: PageRequest) -> Result<PagedResult<Subnet>>;
    async fn create(
        &self,
        network_id: &str,
        cidr_block: &str,
        name: Option<&str>,
        zone: Option<&str>,
    ) -> Result<Subnet>;
    async fn delete(&self, id: &str) -> Result<bool>;

    /// The default subnet, provisioning the default network (and whatever
    /// routing the backend needs) on first use
    async fn get_or_create_default(&self, zone: Option<&str>) -> Result<Subnet>;
}

#[async_trait]
pub trait RouterService: Send + Sync {
    async fn get(&self, id: &str) -> Result<Option<Router>>;
    async fn list(&self, page: PageRequest) -> Result<PagedResult<Router>>;
    async fn find(&self, name: &str, page: PageRequest) -> Result<PagedResult<Router>>;
    async fn create(&self, name: Option<&str>, network_id: &str) -> Result<Router>;
    async fn delete(&self, id: &str) -> Result<bool>;

    async fn attach_subnet(&self, router_id: &str, subnet_id: &str) -> Result<()>;
    async fn detach_subnet(&self, router_id: &str, subnet_id: &str) -> Result<()>;
    async fn attach_gateway(&self, router_id: &str, gateway: &InternetGateway) -> Result<()>;
    async fn detach_gateway(&self, router_id: &str) -> Result<()>;
}

#[async_trait]
pub trait GatewayService: Send + Sync {
    /// Internet gateway for `network_id`, created if it does not exist yet
    async fn get_or_create_inet_gateway(
        &self,
        network_id: &str,
        name: Option<&str>,
    ) -> Result<InternetGateway>;
    async fn list(&self, page: PageRequest) -> Result<PagedResult<InternetGateway>>;
    async fn delete(&self, id: &str) -> Result<bool>;
}
