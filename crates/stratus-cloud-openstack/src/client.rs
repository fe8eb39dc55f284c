//! OpenStack service client boundary
//!
//! One trait per OpenStack service. Implementations wrap an authenticated
//! session scoped to the configured region and report missing resources as
//! [`OpenStackError::NotFound`](crate::error::OpenStackError::NotFound) or
//! an HTTP 404 [`Api`](crate::error::OpenStackError::Api) error.

use crate::error::Result;
use crate::models::{
    AvailabilityZone, CatalogEntry, Container, ContainerQuery, Flavor, FloatingIp, Image,
    KeystoneRegion, Keypair, Network, NetworkCreate, Port, PortCreate, PortQuery, Router,
    RouterCreate, SecurityGroup, SecurityGroupCreate, SecurityGroupRule, Server, ServerCreate,
    ServerQuery, SnapshotCreate, Subnet, SubnetCreate, Volume, VolumeCreate, VolumeQuery,
    VolumeSnapshot,
};
use async_trait::async_trait;
use std::sync::Arc;

/// Compute
#[async_trait]
pub trait NovaApi: Send + Sync {
    async fn get_server(&self, id: &str) -> Result<Server>;
    async fn list_servers(&self, query: &ServerQuery) -> Result<Vec<Server>>;
    async fn create_server(&self, server: &ServerCreate) -> Result<Server>;
    async fn delete_server(&self, id: &str) -> Result<()>;

    async fn list_flavors(&self, limit: Option<usize>, marker: Option<&str>) -> Result<Vec<Flavor>>;
    async fn get_image(&self, id: &str) -> Result<Image>;
    async fn list_images(&self, limit: Option<usize>, marker: Option<&str>) -> Result<Vec<Image>>;

    async fn get_keypair(&self, name: &str) -> Result<Keypair>;
    async fn list_keypairs(&self) -> Result<Vec<Keypair>>;

    /// Nova generates the key pair and returns the private key once
    async fn create_keypair(&self, name: &str) -> Result<Keypair>;
    async fn delete_keypair(&self, name: &str) -> Result<()>;

    async fn list_availability_zones(&self) -> Result<Vec<AvailabilityZone>>;
}

/// Block storage
#[async_trait]
pub trait CinderApi: Send + Sync {
    async fn get_volume(&self, id: &str) -> Result<Volume>;
    async fn list_volumes(&self, query: &VolumeQuery) -> Result<Vec<Volume>>;
    async fn create_volume(&self, volume: &VolumeCreate) -> Result<Volume>;
    async fn delete_volume(&self, id: &str) -> Result<()>;

    async fn get_snapshot(&self, id: &str) -> Result<VolumeSnapshot>;

    /// Some Cinder releases ignore the name filter; callers re-check names
    async fn list_snapshots(&self, query: &VolumeQuery) -> Result<Vec<VolumeSnapshot>>;
    async fn create_snapshot(&self, snapshot: &SnapshotCreate) -> Result<VolumeSnapshot>;
    async fn delete_snapshot(&self, id: &str) -> Result<()>;
}

/// Networking
#[async_trait]
pub trait NeutronApi: Send + Sync {
    /// Exact match on `name` when set
    async fn list_networks(&self, name: Option<&str>) -> Result<Vec<Network>>;
    async fn create_network(&self, network: &NetworkCreate) -> Result<Network>;
    async fn delete_network(&self, id: &str) -> Result<()>;

    async fn list_subnets(&self, network_id: Option<&str>) -> Result<Vec<Subnet>>;
    async fn create_subnet(&self, subnet: &SubnetCreate) -> Result<Subnet>;
    async fn delete_subnet(&self, id: &str) -> Result<()>;

    async fn list_routers(&self) -> Result<Vec<Router>>;
    async fn create_router(&self, router: &RouterCreate) -> Result<Router>;
    async fn delete_router(&self, id: &str) -> Result<()>;
    async fn add_router_interface(&self, router_id: &str, subnet_id: &str) -> Result<()>;
    async fn remove_router_interface(&self, router_id: &str, subnet_id: &str) -> Result<()>;

    /// Set the external gateway network, or clear it with `None`
    async fn set_router_gateway(&self, router_id: &str, network_id: Option<&str>) -> Result<Router>;

    async fn list_ports(&self, query: &PortQuery) -> Result<Vec<Port>>;
    async fn create_port(&self, port: &PortCreate) -> Result<Port>;
    async fn delete_port(&self, id: &str) -> Result<()>;

    async fn list_floating_ips(&self) -> Result<Vec<FloatingIp>>;
    async fn create_floating_ip(&self, floating_network_id: &str) -> Result<FloatingIp>;

    async fn get_security_group(&self, id: &str) -> Result<SecurityGroup>;
    async fn list_security_groups(&self) -> Result<Vec<SecurityGroup>>;
    async fn create_security_group(&self, group: &SecurityGroupCreate) -> Result<SecurityGroup>;
    async fn delete_security_group(&self, id: &str) -> Result<()>;
    async fn create_security_group_rule(&self, rule: &SecurityGroupRule) -> Result<SecurityGroupRule>;
}

/// Object storage
#[async_trait]
pub trait SwiftApi: Send + Sync {
    async fn list_containers(&self, query: &ContainerQuery) -> Result<Vec<Container>>;
    async fn create_container(&self, name: &str) -> Result<()>;
    async fn delete_container(&self, name: &str) -> Result<()>;
}

/// Identity
#[async_trait]
pub trait KeystoneApi: Send + Sync {
    /// Keystone v3 only
    async fn list_regions(&self) -> Result<Vec<KeystoneRegion>>;
    async fn service_catalog(&self) -> Result<Vec<CatalogEntry>>;
}

/// The five service clients of one authenticated session
#[derive(Clone)]
pub struct OpenStackClients {
    pub nova: Arc<dyn NovaApi>,
    pub cinder: Arc<dyn CinderApi>,
    pub neutron: Arc<dyn NeutronApi>,
    pub swift: Arc<dyn SwiftApi>,
    pub keystone: Arc<dyn KeystoneApi>,
}

impl OpenStackClients {
    /// Use one value for every service, e.g. a client speaking to all
    /// endpoints of the catalog
    pub fn from_shared<C>(client: Arc<C>) -> Self
    where
        C: NovaApi + CinderApi + NeutronApi + SwiftApi + KeystoneApi + 'static,
    {
        Self {
            nova: client.clone(),
            cinder: client.clone(),
            neutron: client.clone(),
            swift: client.clone(),
            keystone: client,
        }
    }
}
