//! OpenStack objects to uniform resources

use crate::models::{
    AvailabilityZone, CatalogEntry, Container, Flavor, FloatingIp as NativeFloatingIp, Image,
    KeystoneRegion, Keypair, Network as NativeNetwork, Port, ROUTER_INTERFACE_OWNER,
    Router as NativeRouter, SecurityGroup as NativeSecurityGroup,
    SecurityGroupRule as NativeSecurityGroupRule, Server, Subnet as NativeSubnet,
    Volume as NativeVolume, VolumeSnapshot,
};
use std::collections::BTreeSet;
use stratus_cloud::{
    Bucket, FloatingIp, ImageState, Instance, InstanceState, InstanceType, InternetGateway,
    KeyPair, MachineImage, Network, NetworkState, PlacementZone, Region, Router, RuleDirection,
    SecurityGroup, SecurityGroupRule, Snapshot, SnapshotState, Subnet, SubnetId, Volume,
    VolumeState,
};

fn name_or_id(name: Option<&str>, id: &str) -> String {
    match name {
        Some(name) if !name.is_empty() => name.to_string(),
        _ => id.to_string(),
    }
}

pub fn instance_state(status: &str) -> InstanceState {
    match status.to_ascii_uppercase().as_str() {
        "ACTIVE" => InstanceState::Running,
        "BUILD" | "REBUILD" | "REBOOT" | "HARD_REBOOT" | "RESIZE" | "VERIFY_RESIZE"
        | "MIGRATING" | "PASSWORD" => InstanceState::Pending,
        "SHUTOFF" | "STOPPED" | "SUSPENDED" | "PAUSED" | "SHELVED" | "SHELVED_OFFLOADED" => {
            InstanceState::Stopped
        }
        "DELETED" | "SOFT_DELETED" => InstanceState::Terminated,
        "ERROR" => InstanceState::Error,
        _ => InstanceState::Unknown,
    }
}

pub fn instance(server: &Server) -> Instance {
    let mut public_ips = Vec::new();
    let mut private_ips = Vec::new();
    for address in server.addresses.values().flatten() {
        match address.kind.as_deref() {
            Some("floating") => public_ips.push(address.addr.clone()),
            _ => private_ips.push(address.addr.clone()),
        }
    }
    public_ips.sort();
    private_ips.sort();

    Instance {
        id: server.id.clone(),
        name: name_or_id(Some(&server.name), &server.id),
        resource_id: None,
        state: instance_state(&server.status),
        instance_type: server.flavor.as_ref().map(|f| f.id.clone()),
        image_id: server.image.as_ref().map(|i| i.id.clone()),
        zone: server.availability_zone.clone(),
        key_pair_name: server.key_name.clone(),
        subnet_id: None,
        // Nova reports security groups by name; see instance_with_ports
        security_group_ids: server.security_groups.iter().map(|g| g.name.clone()).collect(),
        public_ips,
        private_ips,
        tags: server.metadata.clone(),
    }
}

/// A server with the attachments Neutron knows about.
///
/// `ports` may hold ports of other devices. The server's own ports give
/// the subnet and the security group ids. A server without ports only
/// has Nova's group names, which `groups` maps back to ids; a name with
/// no matching group is kept as is.
pub fn instance_with_ports(
    server: &Server,
    ports: &[Port],
    groups: &[NativeSecurityGroup],
) -> Instance {
    let mut instance = instance(server);
    let own: Vec<&Port> = ports.iter().filter(|p| p.device_id == server.id).collect();
    instance.subnet_id = own
        .iter()
        .flat_map(|p| &p.fixed_ips)
        .map(|ip| ip.subnet_id.clone())
        .next();

    let mut ids: Vec<String> = Vec::new();
    let named = server.security_groups.iter().map(|reference| {
        groups
            .iter()
            .find(|g| g.name == reference.name)
            .map_or_else(|| reference.name.clone(), |g| g.id.clone())
    });
    let found: Vec<String> = if own.is_empty() {
        named.collect()
    } else {
        own.iter().flat_map(|p| p.security_groups.iter().cloned()).collect()
    };
    for id in found {
        if !ids.contains(&id) {
            ids.push(id);
        }
    }
    instance.security_group_ids = ids;
    instance
}

pub fn instance_type(flavor: &Flavor) -> InstanceType {
    InstanceType {
        id: flavor.id.clone(),
        name: name_or_id(Some(&flavor.name), &flavor.id),
        family: None,
        vcpus: Some(flavor.vcpus),
        ram_mb: Some(flavor.ram),
        root_disk_gb: Some(flavor.disk),
        ephemeral_disk_gb: Some(flavor.ephemeral),
        num_ephemeral_disks: u32::from(flavor.ephemeral > 0),
        extra_data: flavor.extra_specs.clone(),
    }
}

pub fn image_state(status: &str) -> ImageState {
    match status.to_ascii_uppercase().as_str() {
        "ACTIVE" => ImageState::Available,
        "SAVING" | "QUEUED" | "IMPORTING" => ImageState::Pending,
        "ERROR" | "KILLED" => ImageState::Error,
        _ => ImageState::Unknown,
    }
}

pub fn image(image: &Image) -> MachineImage {
    MachineImage {
        id: image.id.clone(),
        name: name_or_id(Some(&image.name), &image.id),
        resource_id: None,
        description: image.metadata.get("description").cloned(),
        state: image_state(&image.status),
        min_disk_gb: image.min_disk.filter(|d| *d > 0),
    }
}

pub fn volume_state(status: &str) -> VolumeState {
    match status {
        "creating" | "downloading" => VolumeState::Creating,
        "available" => VolumeState::Available,
        "in-use" | "attaching" | "detaching" | "reserved" => VolumeState::InUse,
        "deleting" => VolumeState::Deleting,
        "error" | "error_deleting" | "error_restoring" | "error_extending" => VolumeState::Error,
        _ => VolumeState::Unknown,
    }
}

pub fn volume(volume: &NativeVolume) -> Volume {
    Volume {
        id: volume.id.clone(),
        name: name_or_id(volume.name.as_deref(), &volume.id),
        resource_id: None,
        description: volume.description.clone().filter(|d| !d.is_empty()),
        size: volume.size,
        state: volume_state(&volume.status),
        zone: volume.availability_zone.clone(),
        source_snapshot_id: volume.snapshot_id.clone(),
        attached_to: volume.attachments.first().map(|a| a.server_id.clone()),
        create_time: volume.created_at,
        tags: volume.metadata.clone(),
    }
}

pub fn snapshot_state(status: &str) -> SnapshotState {
    match status {
        "creating" => SnapshotState::Pending,
        "available" => SnapshotState::Available,
        "error" | "error_deleting" => SnapshotState::Error,
        _ => SnapshotState::Unknown,
    }
}

pub fn snapshot(snapshot: &VolumeSnapshot) -> Snapshot {
    Snapshot {
        id: snapshot.id.clone(),
        name: name_or_id(snapshot.name.as_deref(), &snapshot.id),
        resource_id: None,
        description: snapshot.description.clone().filter(|d| !d.is_empty()),
        volume_id: Some(snapshot.volume_id.clone()),
        size: snapshot.size,
        state: snapshot_state(&snapshot.status),
        create_time: snapshot.created_at,
    }
}

pub fn bucket(container: &Container) -> Bucket {
    Bucket {
        id: container.name.clone(),
        name: container.name.clone(),
        object_count: Some(container.count),
        bytes_used: Some(container.bytes),
    }
}

/// Key pairs are keyed by name
pub fn key_pair(keypair: &Keypair) -> KeyPair {
    KeyPair {
        id: keypair.name.clone(),
        name: keypair.name.clone(),
        fingerprint: keypair.fingerprint.clone(),
        public_key: keypair.public_key.clone(),
        material: keypair.private_key.clone(),
    }
}

pub fn security_rule(rule: &NativeSecurityGroupRule) -> SecurityGroupRule {
    SecurityGroupRule {
        direction: if rule.direction == "egress" {
            RuleDirection::Egress
        } else {
            RuleDirection::Ingress
        },
        protocol: rule.protocol.clone().unwrap_or_else(|| "*".to_string()),
        from_port: rule.port_range_min,
        to_port: rule.port_range_max,
        cidr: rule.remote_ip_prefix.clone(),
        source_group: rule.remote_group_id.clone(),
    }
}

/// Neutron rule payload for a uniform rule
pub fn native_security_rule(group_id: &str, rule: &SecurityGroupRule) -> NativeSecurityGroupRule {
    NativeSecurityGroupRule {
        id: String::new(),
        security_group_id: group_id.to_string(),
        direction: match rule.direction {
            RuleDirection::Ingress => "ingress".to_string(),
            RuleDirection::Egress => "egress".to_string(),
        },
        ethertype: Some("IPv4".to_string()),
        protocol: (rule.protocol != "*").then(|| rule.protocol.to_ascii_lowercase()),
        port_range_min: rule.from_port,
        port_range_max: rule.to_port,
        remote_ip_prefix: rule.cidr.clone(),
        remote_group_id: rule.source_group.clone(),
    }
}

pub fn security_group(group: &NativeSecurityGroup) -> SecurityGroup {
    SecurityGroup {
        id: group.id.clone(),
        name: name_or_id(Some(&group.name), &group.id),
        resource_id: None,
        description: group.description.clone().filter(|d| !d.is_empty()),
        network_id: None,
        rules: group.security_group_rules.iter().map(security_rule).collect(),
    }
}

pub fn network_state(status: &str) -> NetworkState {
    match status.to_ascii_uppercase().as_str() {
        "ACTIVE" => NetworkState::Available,
        "BUILD" => NetworkState::Pending,
        "DOWN" => NetworkState::Down,
        "ERROR" => NetworkState::Error,
        _ => NetworkState::Unknown,
    }
}

/// Neutron networks carry no address space; it lives on their subnets
pub fn network(network: &NativeNetwork) -> Network {
    Network {
        id: network.id.clone(),
        name: name_or_id(Some(&network.name), &network.id),
        resource_id: None,
        state: network_state(&network.status),
        cidr_block: None,
        external: network.router_external,
        location: None,
    }
}

pub fn subnet(subnet: &NativeSubnet) -> Subnet {
    Subnet {
        id: SubnetId::simple(subnet.id.clone()),
        name: name_or_id(Some(&subnet.name), &subnet.id),
        resource_id: None,
        network_id: subnet.network_id.clone(),
        cidr_block: subnet.cidr.clone(),
        state: NetworkState::Available,
        zone: None,
    }
}

/// `ports` may hold ports of other devices; only this router's
/// interfaces count
pub fn router(router: &NativeRouter, ports: &[Port]) -> Router {
    let mut subnet_ids: Vec<String> = ports
        .iter()
        .filter(|p| p.device_id == router.id && p.device_owner == ROUTER_INTERFACE_OWNER)
        .flat_map(|p| p.fixed_ips.iter().map(|ip| ip.subnet_id.clone()))
        .collect();
    subnet_ids.sort();
    subnet_ids.dedup();

    Router {
        id: router.id.clone(),
        name: name_or_id(Some(&router.name), &router.id),
        state: network_state(&router.status),
        network_id: None,
        subnet_ids,
        gateway_network_id: router
            .external_gateway_info
            .as_ref()
            .map(|g| g.network_id.clone()),
    }
}

/// The internet gateway of an OpenStack cloud is its external network
pub fn gateway(network: &NativeNetwork) -> InternetGateway {
    InternetGateway {
        id: network.id.clone(),
        name: name_or_id(Some(&network.name), &network.id),
        network_id: Some(network.id.clone()),
    }
}

pub fn floating_ip(ip: &NativeFloatingIp) -> FloatingIp {
    FloatingIp {
        id: ip.id.clone(),
        name: ip
            .floating_ip_address
            .clone()
            .unwrap_or_else(|| ip.id.clone()),
        public_ip: ip.floating_ip_address.clone(),
        private_ip: ip.fixed_ip_address.clone(),
    }
}

pub fn zone(zone: &AvailabilityZone, region: &str) -> PlacementZone {
    PlacementZone {
        id: zone.zone_name.clone(),
        name: zone.zone_name.clone(),
        region: region.to_string(),
    }
}

pub fn region(id: &str, zones: Vec<PlacementZone>) -> Region {
    Region {
        id: id.to_string(),
        name: id.to_string(),
        zones,
    }
}

pub fn keystone_region(region: &KeystoneRegion) -> String {
    region.id.clone()
}

/// Distinct regions named by any endpoint of a v2 service catalog
pub fn catalog_regions(catalog: &[CatalogEntry]) -> Vec<String> {
    let regions: BTreeSet<String> = catalog
        .iter()
        .flat_map(|service| service.endpoints.iter())
        .filter_map(|e| e.region.clone().or_else(|| e.region_id.clone()))
        .filter(|r| !r.is_empty())
        .collect();
    regions.into_iter().collect()
}
