//! ARM objects to uniform resources
//!
//! Every function here is pure. Missing optional fields map to `None` and
//! unrecognized states to the `Unknown` variant.

use crate::models::{
    Container, Disk, DiskSnapshot, Image, KeyPairEntity, Location, NetworkInterface,
    NetworkSecurityGroup, PublicIpAddress, SecurityRule, SecurityRuleProperties, Tags, VirtualMachine,
    VirtualMachineSize, VirtualNetwork, VirtualNetworkSubnet,
};
use ssh_key::{HashAlg, PublicKey};
use std::collections::HashMap;
use stratus_cloud::{
    Bucket, FloatingIp, ImageState, Instance, InstanceState, InstanceType, KeyPair, MachineImage,
    Network, NetworkState, PlacementZone, Region, RuleDirection, SecurityGroup, SecurityGroupRule,
    Snapshot, SnapshotState, Subnet, SubnetId, Volume, VolumeState,
};

/// Tag holding the user-facing name
pub const NAME_TAG: &str = "Name";

/// Tag holding the user-facing description
pub const DESCRIPTION_TAG: &str = "Description";

/// Tag naming the key pair a VM was launched with
pub const KEY_PAIR_TAG: &str = "Key_Pair";

/// Disk tag recording whether the disk goes away with its VM
pub const DELETE_ON_TERMINATE_TAG: &str = "delete_on_terminate";

/// Last path segment of an ARM resource URI
pub fn arm_name(resource_id: &str) -> &str {
    resource_id
        .trim_end_matches('/')
        .rsplit('/')
        .next()
        .unwrap_or(resource_id)
}

fn tagged_name(tags: &Tags, fallback: &str) -> String {
    tags.get(NAME_TAG)
        .cloned()
        .unwrap_or_else(|| fallback.to_string())
}

fn non_empty(value: &str) -> Option<String> {
    (!value.is_empty()).then(|| value.to_string())
}

/// Only a case-insensitive `true` counts; anything else keeps the disk
pub fn delete_on_terminate(tags: &Tags) -> bool {
    tags.get(DELETE_ON_TERMINATE_TAG)
        .is_some_and(|v| v.trim().eq_ignore_ascii_case("true"))
}

fn provisioning_network_state(state: Option<&str>) -> NetworkState {
    match state {
        Some("Succeeded") => NetworkState::Available,
        Some("Creating") | Some("Updating") => NetworkState::Pending,
        Some("Deleting") => NetworkState::Down,
        Some("Failed") => NetworkState::Error,
        _ => NetworkState::Unknown,
    }
}

pub fn instance_state(vm: &VirtualMachine) -> InstanceState {
    let power = vm.properties.instance_view.as_ref().and_then(|view| {
        view.statuses
            .iter()
            .find_map(|s| s.code.strip_prefix("PowerState/"))
    });

    match power {
        Some("running") => return InstanceState::Running,
        Some("starting") => return InstanceState::Pending,
        Some("stopped") | Some("stopping") | Some("deallocated") | Some("deallocating") => {
            return InstanceState::Stopped;
        }
        _ => {}
    }

    match vm.properties.provisioning_state.as_deref() {
        Some("Creating") | Some("Updating") => InstanceState::Pending,
        Some("Succeeded") => InstanceState::Running,
        Some("Deleting") => InstanceState::Terminated,
        Some("Failed") => InstanceState::Error,
        _ => InstanceState::Unknown,
    }
}

pub fn instance(vm: &VirtualMachine) -> Instance {
    let props = &vm.properties;
    Instance {
        id: vm.name.clone(),
        name: tagged_name(&vm.tags, &vm.name),
        resource_id: non_empty(&vm.id),
        state: instance_state(vm),
        instance_type: props.hardware_profile.as_ref().map(|h| h.vm_size.clone()),
        image_id: props
            .storage_profile
            .as_ref()
            .and_then(|s| s.image_reference.as_ref())
            .map(|r| arm_name(&r.id).to_string()),
        zone: non_empty(&vm.location),
        key_pair_name: vm.tags.get(KEY_PAIR_TAG).cloned(),
        subnet_id: None,
        security_group_ids: Vec::new(),
        public_ips: Vec::new(),
        private_ips: Vec::new(),
        tags: vm.tags.clone(),
    }
}

/// Composite subnet id from an ARM subnet URI
/// (`.../virtualNetworks/<network>/subnets/<subnet>`)
pub fn subnet_id_from_uri(uri: &str) -> Option<SubnetId> {
    let segments: Vec<&str> = uri.trim_end_matches('/').split('/').collect();
    let after = |key: &str| {
        segments
            .iter()
            .position(|s| s.eq_ignore_ascii_case(key))
            .and_then(|i| segments.get(i + 1))
            .copied()
    };
    Some(SubnetId::composite(after("virtualNetworks")?, after("subnets")?))
}

/// A VM plus the network attachments read from its NICs.
///
/// `public_ips` only needs to hold the addresses the NICs reference.
pub fn instance_with_nics(
    vm: &VirtualMachine,
    nics: &[NetworkInterface],
    public_ips: &[PublicIpAddress],
) -> Instance {
    let mut instance = instance(vm);
    for nic in nics {
        if let Some(group) = &nic.properties.network_security_group {
            let id = arm_name(&group.id).to_string();
            if !instance.security_group_ids.contains(&id) {
                instance.security_group_ids.push(id);
            }
        }

        for config in &nic.properties.ip_configurations {
            let props = &config.properties;
            if instance.subnet_id.is_none() {
                instance.subnet_id = subnet_id_from_uri(&props.subnet.id).map(|id| id.to_string());
            }
            if let Some(ip) = &props.private_ip_address {
                instance.private_ips.push(ip.clone());
            }
            let public = props.public_ip_address.as_ref().and_then(|reference| {
                public_ips
                    .iter()
                    .find(|ip| ip.id.eq_ignore_ascii_case(&reference.id))
                    .and_then(|ip| ip.properties.ip_address.clone())
            });
            instance.public_ips.extend(public);
        }
    }
    instance
}

/// Names of the NICs attached to a VM
pub fn vm_nic_names(vm: &VirtualMachine) -> Vec<String> {
    vm.properties
        .network_profile
        .as_ref()
        .map(|n| {
            n.network_interfaces
                .iter()
                .map(|nic| arm_name(&nic.id).to_string())
                .collect()
        })
        .unwrap_or_default()
}

pub fn instance_type(size: &VirtualMachineSize) -> InstanceType {
    // Standard_D2s_v3 -> D
    let family = size
        .name
        .split('_')
        .nth(1)
        .map(|s| s.chars().take_while(|c| c.is_ascii_alphabetic()).collect::<String>())
        .filter(|f| !f.is_empty());

    let ephemeral_gb = size.resource_disk_size_in_mb.map(|mb| mb / 1024);
    let mut extra_data = HashMap::new();
    if let Some(max) = size.max_data_disk_count {
        extra_data.insert("max_data_disk_count".to_string(), max.to_string());
    }

    InstanceType {
        id: size.name.clone(),
        name: size.name.clone(),
        family,
        vcpus: size.number_of_cores,
        ram_mb: size.memory_in_mb,
        root_disk_gb: size.os_disk_size_in_mb.map(|mb| mb / 1024),
        ephemeral_disk_gb: ephemeral_gb,
        num_ephemeral_disks: u32::from(ephemeral_gb.is_some_and(|gb| gb > 0)),
        extra_data,
    }
}

pub fn machine_image(image: &Image) -> MachineImage {
    let state = match image.properties.provisioning_state.as_deref() {
        Some("Succeeded") => ImageState::Available,
        Some("Creating") | Some("Updating") => ImageState::Pending,
        Some("Failed") => ImageState::Error,
        _ => ImageState::Unknown,
    };
    MachineImage {
        id: image.name.clone(),
        name: tagged_name(&image.tags, &image.name),
        resource_id: non_empty(&image.id),
        description: image.tags.get(DESCRIPTION_TAG).cloned(),
        state,
        min_disk_gb: image
            .properties
            .storage_profile
            .as_ref()
            .and_then(|s| s.os_disk.as_ref())
            .and_then(|d| d.disk_size_gb),
    }
}

/// Azure has no zones below a location; each region is its own zone
pub fn region(location: &Location) -> Region {
    Region {
        id: location.name.clone(),
        name: location
            .display_name
            .clone()
            .unwrap_or_else(|| location.name.clone()),
        zones: vec![PlacementZone {
            id: location.name.clone(),
            name: location.name.clone(),
            region: location.name.clone(),
        }],
    }
}

pub fn volume(disk: &Disk) -> Volume {
    let props = &disk.properties;
    let state = match (props.disk_state.as_deref(), props.provisioning_state.as_deref()) {
        (_, Some("Creating")) | (_, Some("Updating")) => VolumeState::Creating,
        (_, Some("Deleting")) => VolumeState::Deleting,
        (_, Some("Failed")) => VolumeState::Error,
        (Some("Attached"), _) | (Some("Reserved"), _) => VolumeState::InUse,
        (Some("Unattached"), _) | (None, Some("Succeeded")) => VolumeState::Available,
        _ => VolumeState::Unknown,
    };

    let source_snapshot_id = props
        .creation_data
        .create_option
        .eq_ignore_ascii_case("copy")
        .then(|| props.creation_data.source_resource_id.as_deref())
        .flatten()
        .map(|id| arm_name(id).to_string());

    Volume {
        id: disk.name.clone(),
        name: tagged_name(&disk.tags, &disk.name),
        resource_id: non_empty(&disk.id),
        description: disk.tags.get(DESCRIPTION_TAG).cloned(),
        size: props.disk_size_gb.unwrap_or(0),
        state,
        zone: non_empty(&disk.location),
        source_snapshot_id,
        attached_to: disk.managed_by.as_deref().map(|id| arm_name(id).to_string()),
        create_time: props.time_created,
        tags: disk.tags.clone(),
    }
}

pub fn snapshot(snapshot: &DiskSnapshot) -> Snapshot {
    let props = &snapshot.properties;
    let state = match props.provisioning_state.as_deref() {
        Some("Succeeded") => SnapshotState::Available,
        Some("Creating") | Some("Updating") => SnapshotState::Pending,
        Some("Failed") => SnapshotState::Error,
        _ => SnapshotState::Unknown,
    };
    Snapshot {
        id: snapshot.name.clone(),
        name: tagged_name(&snapshot.tags, &snapshot.name),
        resource_id: non_empty(&snapshot.id),
        description: snapshot.tags.get(DESCRIPTION_TAG).cloned(),
        volume_id: props
            .creation_data
            .source_resource_id
            .as_deref()
            .map(|id| arm_name(id).to_string()),
        size: props.disk_size_gb.unwrap_or(0),
        state,
        create_time: props.time_created,
    }
}

pub fn bucket(container: &Container) -> Bucket {
    Bucket {
        id: container.name.clone(),
        name: container.name.clone(),
        object_count: None,
        bytes_used: None,
    }
}

pub fn key_pair(entity: &KeyPairEntity) -> KeyPair {
    let fingerprint = PublicKey::from_openssh(&entity.key)
        .ok()
        .map(|key| key.fingerprint(HashAlg::Sha256).to_string());
    KeyPair {
        id: entity.name.clone(),
        name: entity.name.clone(),
        fingerprint,
        public_key: Some(entity.key.clone()),
        material: None,
    }
}

fn parse_port_range(range: &str) -> (Option<u16>, Option<u16>) {
    match range.trim() {
        "*" | "" => (None, None),
        range => match range.split_once('-') {
            Some((from, to)) => (from.trim().parse().ok(), to.trim().parse().ok()),
            None => {
                let port = range.parse().ok();
                (port, port)
            }
        },
    }
}

fn render_port_range(from: Option<u16>, to: Option<u16>) -> String {
    match (from, to) {
        (None, None) => "*".to_string(),
        (Some(from), Some(to)) if from == to => from.to_string(),
        (from, to) => format!("{}-{}", from.unwrap_or(0), to.unwrap_or(u16::MAX)),
    }
}

/// Allow rules only; deny rules have no uniform representation
pub fn security_group_rule(rule: &SecurityRule) -> Option<SecurityGroupRule> {
    let props = &rule.properties;
    if !props.access.eq_ignore_ascii_case("allow") {
        return None;
    }
    let direction = if props.direction.eq_ignore_ascii_case("outbound") {
        RuleDirection::Egress
    } else {
        RuleDirection::Ingress
    };
    let (from_port, to_port) = parse_port_range(&props.destination_port_range);
    let cidr = match props.source_address_prefix.as_str() {
        "*" | "" => None,
        prefix => Some(prefix.to_string()),
    };
    Some(SecurityGroupRule {
        direction,
        protocol: props.protocol.to_ascii_lowercase(),
        from_port,
        to_port,
        cidr,
        source_group: None,
    })
}

/// Uniform rule to an ARM security rule with the given name and priority
pub fn native_security_rule(rule: &SecurityGroupRule, name: &str, priority: u32) -> SecurityRule {
    let protocol = match rule.protocol.to_ascii_lowercase().as_str() {
        "tcp" => "Tcp".to_string(),
        "udp" => "Udp".to_string(),
        "icmp" => "Icmp".to_string(),
        _ => "*".to_string(),
    };
    let direction = match rule.direction {
        RuleDirection::Ingress => "Inbound",
        RuleDirection::Egress => "Outbound",
    };
    SecurityRule {
        name: name.to_string(),
        properties: SecurityRuleProperties {
            protocol,
            source_port_range: "*".to_string(),
            destination_port_range: render_port_range(rule.from_port, rule.to_port),
            source_address_prefix: rule.cidr.clone().unwrap_or_else(|| "*".to_string()),
            destination_address_prefix: "*".to_string(),
            access: "Allow".to_string(),
            priority,
            direction: direction.to_string(),
        },
    }
}

pub fn security_group(group: &NetworkSecurityGroup) -> SecurityGroup {
    SecurityGroup {
        id: group.name.clone(),
        name: tagged_name(&group.tags, &group.name),
        resource_id: non_empty(&group.id),
        description: group.tags.get(DESCRIPTION_TAG).cloned(),
        network_id: None,
        rules: group
            .properties
            .security_rules
            .iter()
            .filter_map(security_group_rule)
            .collect(),
    }
}

pub fn network(network: &VirtualNetwork) -> Network {
    Network {
        id: network.name.clone(),
        name: tagged_name(&network.tags, &network.name),
        resource_id: non_empty(&network.id),
        state: provisioning_network_state(network.properties.provisioning_state.as_deref()),
        cidr_block: network.properties.address_space.address_prefixes.first().cloned(),
        external: false,
        location: non_empty(&network.location),
    }
}

/// Subnet of `network_name`; the zone comes from the parent network
pub fn subnet(
    network_name: &str,
    network_location: Option<&str>,
    subnet: &VirtualNetworkSubnet,
) -> Subnet {
    Subnet {
        id: SubnetId::composite(network_name, &subnet.name),
        name: subnet.name.clone(),
        resource_id: non_empty(&subnet.id),
        network_id: network_name.to_string(),
        cidr_block: subnet.properties.address_prefix.clone(),
        state: provisioning_network_state(subnet.properties.provisioning_state.as_deref()),
        zone: network_location.map(str::to_string),
    }
}

pub fn floating_ip(ip: &PublicIpAddress) -> FloatingIp {
    FloatingIp {
        id: ip.name.clone(),
        name: ip.name.clone(),
        public_ip: ip.properties.ip_address.clone(),
        private_ip: None,
    }
}
