//! Azure SDK boundary
//!
//! [`AzureClient`] is the surface the entity services drive. An
//! implementation wraps the ARM compute, network and storage clients for one
//! subscription and resource group; names passed here are ARM resource names
//! inside that group. Missing resources must surface as
//! [`AzureError::NotFound`](crate::error::AzureError::NotFound).

use crate::error::Result;
use crate::models::{
    Container, Disk, DiskSnapshot, Image, KeyPairEntity, Location, NetworkInterface,
    NetworkSecurityGroup, PublicIpAddress, SecurityRule, Tags, VirtualMachine, VirtualMachineSize,
    VirtualNetwork, VirtualNetworkSubnet,
};
use async_trait::async_trait;

#[async_trait]
pub trait AzureClient: Send + Sync {
    // Compute
    async fn get_vm(&self, name: &str) -> Result<VirtualMachine>;
    async fn list_vms(&self) -> Result<Vec<VirtualMachine>>;
    async fn create_vm(&self, name: &str, vm: &VirtualMachine) -> Result<VirtualMachine>;
    async fn delete_vm(&self, name: &str) -> Result<()>;
    async fn list_vm_sizes(&self, location: &str) -> Result<Vec<VirtualMachineSize>>;
    async fn get_image(&self, name: &str) -> Result<Image>;
    async fn list_images(&self) -> Result<Vec<Image>>;
    async fn list_locations(&self) -> Result<Vec<Location>>;

    // Disks and snapshots
    async fn get_disk(&self, name: &str) -> Result<Disk>;
    async fn list_disks(&self) -> Result<Vec<Disk>>;
    async fn create_disk(&self, name: &str, disk: &Disk) -> Result<Disk>;
    async fn update_disk_tags(&self, name: &str, tags: &Tags) -> Result<Disk>;
    async fn delete_disk(&self, name: &str) -> Result<()>;
    async fn get_snapshot(&self, name: &str) -> Result<DiskSnapshot>;
    async fn list_snapshots(&self) -> Result<Vec<DiskSnapshot>>;
    async fn create_snapshot(&self, name: &str, snapshot: &DiskSnapshot) -> Result<DiskSnapshot>;
    async fn delete_snapshot(&self, name: &str) -> Result<()>;

    // Networking
    async fn get_network(&self, name: &str) -> Result<VirtualNetwork>;
    async fn list_networks(&self) -> Result<Vec<VirtualNetwork>>;

    /// Create or update; ARM PUT semantics
    async fn create_network(&self, name: &str, network: &VirtualNetwork) -> Result<VirtualNetwork>;
    async fn delete_network(&self, name: &str) -> Result<()>;
    async fn get_subnet(&self, network: &str, subnet: &str) -> Result<VirtualNetworkSubnet>;
    async fn list_subnets(&self, network: &str) -> Result<Vec<VirtualNetworkSubnet>>;

    /// Create or update; ARM PUT semantics
    async fn create_subnet(
        &self,
        network: &str,
        name: &str,
        subnet: &VirtualNetworkSubnet,
    ) -> Result<VirtualNetworkSubnet>;
    async fn delete_subnet(&self, network: &str, subnet: &str) -> Result<()>;
    async fn get_nic(&self, name: &str) -> Result<NetworkInterface>;
    async fn create_nic(&self, name: &str, nic: &NetworkInterface) -> Result<NetworkInterface>;
    async fn delete_nic(&self, name: &str) -> Result<()>;
    async fn list_public_ips(&self) -> Result<Vec<PublicIpAddress>>;
    async fn create_public_ip(&self, name: &str, ip: &PublicIpAddress) -> Result<PublicIpAddress>;

    // Security
    async fn get_security_group(&self, name: &str) -> Result<NetworkSecurityGroup>;
    async fn list_security_groups(&self) -> Result<Vec<NetworkSecurityGroup>>;
    async fn create_security_group(
        &self,
        name: &str,
        group: &NetworkSecurityGroup,
    ) -> Result<NetworkSecurityGroup>;
    async fn delete_security_group(&self, name: &str) -> Result<()>;
    async fn create_security_rule(&self, group: &str, rule: &SecurityRule) -> Result<SecurityRule>;

    // Storage account
    async fn get_container(&self, name: &str) -> Result<Container>;

    /// Server-side prefix filter when `prefix` is set
    async fn list_containers(&self, prefix: Option<&str>) -> Result<Vec<Container>>;
    async fn create_container(&self, name: &str) -> Result<Container>;
    async fn delete_container(&self, name: &str) -> Result<()>;

    /// Key table rows of one partition
    async fn list_key_pairs(&self, partition: &str) -> Result<Vec<KeyPairEntity>>;

    /// Insert a row; an existing row key is a `Conflict`
    async fn insert_key_pair(&self, entity: &KeyPairEntity) -> Result<KeyPairEntity>;
    async fn delete_key_pair(&self, partition: &str, row_key: &str) -> Result<()>;
}
