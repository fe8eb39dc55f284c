//! Uniform, provider-agnostic resource shapes
//!
//! Entity services normalize provider-native objects into these types at the
//! service boundary. They hold plain data only; every follow-up mutation goes
//! back through a service using the resource id.

use crate::reference::SubnetId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Common identity of every uniform resource
pub trait Resource {
    /// Provider-native identifier, stable for the resource lifetime
    fn id(&self) -> &str;

    /// Display name (user-assigned or provider-assigned)
    fn name(&self) -> &str;
}

macro_rules! impl_resource {
    ($($ty:ty),* $(,)?) => {
        $(
            impl Resource for $ty {
                fn id(&self) -> &str {
                    &self.id
                }

                fn name(&self) -> &str {
                    &self.name
                }
            }
        )*
    };
}

/// Lifecycle state of an instance
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InstanceState {
    Pending,
    Running,
    Stopped,
    Terminated,
    Error,
    Unknown,
}

/// Lifecycle state of a block storage volume
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VolumeState {
    Creating,
    Available,
    InUse,
    Deleting,
    Error,
    Unknown,
}

/// Lifecycle state of a volume snapshot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SnapshotState {
    Pending,
    Available,
    Error,
    Unknown,
}

/// Lifecycle state of networks, subnets and routers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NetworkState {
    Pending,
    Available,
    Down,
    Error,
    Unknown,
}

/// Lifecycle state of a machine image
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ImageState {
    Pending,
    Available,
    Error,
    Unknown,
}

macro_rules! impl_state_display {
    ($ty:ty { $($variant:ident => $text:literal),* $(,)? }) => {
        impl std::fmt::Display for $ty {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                match self {
                    $(Self::$variant => write!(f, $text),)*
                }
            }
        }
    };
}

impl_state_display!(InstanceState {
    Pending => "pending",
    Running => "running",
    Stopped => "stopped",
    Terminated => "terminated",
    Error => "error",
    Unknown => "unknown",
});

impl_state_display!(VolumeState {
    Creating => "creating",
    Available => "available",
    InUse => "in-use",
    Deleting => "deleting",
    Error => "error",
    Unknown => "unknown",
});

impl_state_display!(SnapshotState {
    Pending => "pending",
    Available => "available",
    Error => "error",
    Unknown => "unknown",
});

impl_state_display!(NetworkState {
    Pending => "pending",
    Available => "available",
    Down => "down",
    Error => "error",
    Unknown => "unknown",
});

impl_state_display!(ImageState {
    Pending => "pending",
    Available => "available",
    Error => "error",
    Unknown => "unknown",
});

/// An availability zone within a region
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlacementZone {
    pub id: String,
    pub name: String,
    pub region: String,
}

/// A provider region (Azure location, OpenStack keystone region)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Region {
    pub id: String,
    pub name: String,

    /// Zones available in this region
    pub zones: Vec<PlacementZone>,
}

/// A virtual machine size / flavor
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstanceType {
    pub id: String,
    pub name: String,
    pub family: Option<String>,
    pub vcpus: Option<u32>,
    pub ram_mb: Option<u64>,
    pub root_disk_gb: Option<u64>,
    pub ephemeral_disk_gb: Option<u64>,
    pub num_ephemeral_disks: u32,

    /// Provider-specific extra specs
    pub extra_data: HashMap<String, String>,
}

impl InstanceType {
    /// Root plus ephemeral disk size, when at least one of them is known
    pub fn total_disk_gb(&self) -> Option<u64> {
        match (self.root_disk_gb, self.ephemeral_disk_gb) {
            (None, None) => None,
            (root, ephemeral) => Some(root.unwrap_or(0) + ephemeral.unwrap_or(0)),
        }
    }
}

/// A bootable machine image
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MachineImage {
    pub id: String,
    pub name: String,

    /// Internal provider URI, when distinct from `id`
    pub resource_id: Option<String>,
    pub description: Option<String>,
    pub state: ImageState,
    pub min_disk_gb: Option<u32>,
}

/// A virtual machine
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Instance {
    pub id: String,
    pub name: String,
    pub resource_id: Option<String>,
    pub state: InstanceState,
    pub instance_type: Option<String>,
    pub image_id: Option<String>,
    pub zone: Option<String>,
    pub key_pair_name: Option<String>,

    /// Subnet of the first network interface
    pub subnet_id: Option<String>,

    /// Ids as the security group service reports them
    pub security_group_ids: Vec<String>,
    pub public_ips: Vec<String>,
    pub private_ips: Vec<String>,
    pub tags: HashMap<String, String>,
}

/// A block storage volume
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Volume {
    pub id: String,
    pub name: String,
    pub resource_id: Option<String>,
    pub description: Option<String>,

    /// Size in GB
    pub size: u32,
    pub state: VolumeState,
    pub zone: Option<String>,

    /// Snapshot this volume was copied from
    pub source_snapshot_id: Option<String>,

    /// Instance currently borrowing this volume
    pub attached_to: Option<String>,
    pub create_time: Option<DateTime<Utc>>,
    pub tags: HashMap<String, String>,
}

/// A point-in-time copy of a volume
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snapshot {
    pub id: String,
    pub name: String,
    pub resource_id: Option<String>,
    pub description: Option<String>,

    /// Source volume (lookup only, the snapshot outlives it)
    pub volume_id: Option<String>,

    /// Size in GB
    pub size: u32,
    pub state: SnapshotState,
    pub create_time: Option<DateTime<Utc>>,
}

/// An object-store container
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bucket {
    pub id: String,
    pub name: String,
    pub object_count: Option<u64>,
    pub bytes_used: Option<u64>,
}

/// An SSH key pair registered with the provider
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyPair {
    pub id: String,
    pub name: String,
    pub fingerprint: Option<String>,
    pub public_key: Option<String>,

    /// Private key material, only ever populated by `create`
    pub material: Option<String>,
}

/// Traffic direction of a security group rule
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RuleDirection {
    Ingress,
    Egress,
}

/// A single allow rule in a security group
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SecurityGroupRule {
    pub direction: RuleDirection,

    /// `tcp`, `udp`, `icmp` or `*`
    pub protocol: String,
    pub from_port: Option<u16>,
    pub to_port: Option<u16>,
    pub cidr: Option<String>,

    /// Peer security group granted access
    pub source_group: Option<String>,
}

impl SecurityGroupRule {
    /// Ingress rule for a single port or port range from a CIDR block
    pub fn ingress(
        protocol: impl Into<String>,
        from_port: u16,
        to_port: u16,
        cidr: impl Into<String>,
    ) -> Self {
        Self {
            direction: RuleDirection::Ingress,
            protocol: protocol.into(),
            from_port: Some(from_port),
            to_port: Some(to_port),
            cidr: Some(cidr.into()),
            source_group: None,
        }
    }

    /// Whether this rule admits `protocol` traffic on `port`
    pub fn permits(&self, protocol: &str, port: u16) -> bool {
        let protocol_ok = self.protocol == "*" || self.protocol.eq_ignore_ascii_case(protocol);
        let from = self.from_port.unwrap_or(0);
        let to = self.to_port.unwrap_or(u16::MAX);
        protocol_ok && (from..=to).contains(&port)
    }
}

/// A named set of firewall rules
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SecurityGroup {
    pub id: String,
    pub name: String,
    pub resource_id: Option<String>,
    pub description: Option<String>,
    pub network_id: Option<String>,
    pub rules: Vec<SecurityGroupRule>,
}

impl SecurityGroup {
    pub fn permits(&self, protocol: &str, port: u16) -> bool {
        self.rules
            .iter()
            .filter(|r| r.direction == RuleDirection::Ingress)
            .any(|r| r.permits(protocol, port))
    }
}

/// A private network
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Network {
    pub id: String,
    pub name: String,
    pub resource_id: Option<String>,
    pub state: NetworkState,
    pub cidr_block: Option<String>,

    /// Whether the network is an external (internet-routable) network
    pub external: bool,
    pub location: Option<String>,
}

/// A subnet; always belongs to exactly one network
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subnet {
    pub id: SubnetId,
    pub name: String,
    pub resource_id: Option<String>,
    pub network_id: String,
    pub cidr_block: Option<String>,
    pub state: NetworkState,

    /// Zone affinity, when the provider has one
    pub zone: Option<String>,
}

impl Resource for Subnet {
    fn id(&self) -> &str {
        self.id.as_str()
    }

    fn name(&self) -> &str {
        &self.name
    }
}

/// A router joining subnets and an optional external gateway
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Router {
    pub id: String,
    pub name: String,
    pub state: NetworkState,
    pub network_id: Option<String>,
    pub subnet_ids: Vec<String>,
    pub gateway_network_id: Option<String>,
}

/// An internet gateway (OpenStack: the external network)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InternetGateway {
    pub id: String,
    pub name: String,
    pub network_id: Option<String>,
}

/// A public address that can be associated with an instance
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FloatingIp {
    pub id: String,
    pub name: String,
    pub public_ip: Option<String>,
    pub private_ip: Option<String>,
}

impl FloatingIp {
    pub fn in_use(&self) -> bool {
        self.private_ip.is_some()
    }
}

impl_resource!(
    PlacementZone,
    Region,
    InstanceType,
    MachineImage,
    Instance,
    Volume,
    Snapshot,
    Bucket,
    KeyPair,
    SecurityGroup,
    Network,
    Router,
    InternetGateway,
    FloatingIp,
);
