//! Server creation
//!
//! Nova provisions block devices and the boot volume itself from a
//! `block_device_mapping_v2` list, so most launch stages only translate.
//! The one sub-resource created up front is the Neutron port, made when
//! the request names a subnet so the server lands in it with the requested
//! security groups.

use crate::config::ROOT_DEVICE_NAME;
use crate::error::OpenStackResultExt;
use crate::models::{
    BlockDeviceMappingV2, FixedIp, NameRef, PortCreate, ServerCreate, ServerNetwork,
};
use crate::services::{
    OpenStackContext, OpenStackInstanceService, OpenStackInstanceTypeService,
    OpenStackSecurityGroupService, OpenStackSubnetService,
};
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use stratus_cloud::{
    DeviceSource, Instance, InstanceType, InstanceTypeService, LaunchConfig, LaunchRequest,
    LaunchStage, PageRequest, ResourceKind, Result, SecurityGroup, SecurityGroupService, Subnet,
    SubnetService, validate_resource_name,
};
use tracing::{debug, info, warn};

/// Translate block-device mappings into Nova's v2 format.
///
/// A root device without a source boots from `image_id`.
pub fn block_device_mapping(config: &LaunchConfig, image_id: &str) -> Vec<BlockDeviceMappingV2> {
    config
        .devices()
        .iter()
        .map(|device| {
            if device.is_ephemeral() {
                return BlockDeviceMappingV2 {
                    source_type: "blank".to_string(),
                    destination_type: "local".to_string(),
                    delete_on_termination: Some(true),
                    ..Default::default()
                };
            }

            let (source_type, uuid) = match &device.source {
                DeviceSource::Snapshot(snapshot) => ("snapshot", Some(snapshot.id().to_string())),
                DeviceSource::Volume(volume) => ("volume", Some(volume.id().to_string())),
                DeviceSource::Image(image) => ("image", Some(image.id().to_string())),
                DeviceSource::None if device.is_root => ("image", Some(image_id.to_string())),
                DeviceSource::None => ("blank", None),
            };

            BlockDeviceMappingV2 {
                boot_index: device.is_root.then_some(0),
                device_name: device.is_root.then(|| ROOT_DEVICE_NAME.to_string()),
                source_type: source_type.to_string(),
                destination_type: "volume".to_string(),
                uuid,
                volume_size: device.size,
                delete_on_termination: device.delete_on_terminate,
            }
        })
        .collect()
}

/// How the server joins the network
enum Attachment {
    /// Through a pre-made port carrying the security groups
    Port(String),

    /// Default network; security groups passed by name
    Named(Vec<String>),
}

pub struct OpenStackLaunchResolver {
    ctx: OpenStackContext,
    stage: LaunchStage,
}

impl OpenStackLaunchResolver {
    pub fn new(ctx: OpenStackContext) -> Self {
        Self {
            ctx,
            stage: LaunchStage::ResolvingNetwork,
        }
    }

    pub fn stage(&self) -> LaunchStage {
        self.stage
    }

    fn advance(&mut self) {
        if let Some(next) = self.stage.next() {
            debug!(from = %self.stage, to = %next, "Launch stage");
            self.stage = next;
        }
    }

    pub async fn launch(mut self, request: LaunchRequest) -> Result<Instance> {
        let result = self.run(&request).await;
        if let Err(e) = &result {
            warn!(
                name = %request.name,
                stage = %self.stage,
                error = %e,
                "Launch failed, already provisioned resources are left in place"
            );
        }
        result
    }

    async fn run(&mut self, request: &LaunchRequest) -> Result<Instance> {
        request.validate()?;
        validate_resource_name(ResourceKind::Instance, &request.name)?;

        let flavor = request
            .instance_type
            .resolve(ResourceKind::InstanceType, |id| self.flavor(id))
            .await?;
        let image_id = request.image.id().to_string();
        let key_name = request.key_pair.as_ref().map(|k| match k.resolved() {
            Some(key_pair) => key_pair.name.clone(),
            None => k.id().to_string(),
        });

        let subnet = self.resolve_network(request).await?;
        self.advance();

        let groups = self.resolve_security_groups(request).await?;
        self.advance();

        let (has_root, mapping) = match &request.launch_config {
            Some(config) => (
                config.root_device().is_some(),
                block_device_mapping(config, &image_id),
            ),
            None => (false, Vec::new()),
        };
        self.advance();

        let attachment = self.provision_port(request, subnet.as_ref(), &groups).await?;
        self.advance();

        debug!(name = %request.name, devices = mapping.len(), "Block devices are provisioned by Nova");
        self.advance();

        let (networks, security_groups) = match attachment {
            Attachment::Port(port) => (
                vec![ServerNetwork {
                    uuid: subnet.as_ref().map(|s| s.network_id.clone()),
                    port: Some(port),
                }],
                Vec::new(),
            ),
            Attachment::Named(names) => (
                Vec::new(),
                names.into_iter().map(|name| NameRef { name }).collect(),
            ),
        };

        let server = ServerCreate {
            name: request.name.clone(),
            image_ref: (!has_root).then_some(image_id),
            flavor_ref: flavor.id.clone(),
            min_count: 1,
            max_count: 1,
            availability_zone: request.zone.clone(),
            key_name,
            security_groups,
            user_data: request.user_data.as_ref().map(|u| STANDARD.encode(u)),
            block_device_mapping_v2: mapping,
            networks,
        };

        info!(name = %request.name, flavor = %flavor.id, "Creating server");
        let created = self
            .ctx
            .clients
            .nova
            .create_server(&server)
            .await
            .context(ResourceKind::Instance, &request.name)?;
        self.advance();
        OpenStackInstanceService::new(self.ctx.clone())
            .describe_one(&created)
            .await
    }

    /// Flavors are given by id or by name
    async fn flavor(&self, id_or_name: &str) -> Result<Option<InstanceType>> {
        let flavors = OpenStackInstanceTypeService::new(self.ctx.clone());
        if let Some(flavor) = flavors.get(id_or_name).await? {
            return Ok(Some(flavor));
        }
        Ok(flavors
            .find(id_or_name, PageRequest::new())
            .await?
            .into_iter()
            .next())
    }

    async fn resolve_network(&self, request: &LaunchRequest) -> Result<Option<Subnet>> {
        let Some(reference) = &request.subnet else {
            return Ok(None);
        };
        let subnets = OpenStackSubnetService::new(self.ctx.clone());
        let subnet = reference
            .resolve(ResourceKind::Subnet, |id| subnets.get(id))
            .await?;
        Ok(Some(subnet))
    }

    /// Groups are given by id or by name
    async fn security_group(&self, id_or_name: &str) -> Result<Option<SecurityGroup>> {
        let groups = OpenStackSecurityGroupService::new(self.ctx.clone());
        if let Some(group) = groups.get(id_or_name).await? {
            return Ok(Some(group));
        }
        Ok(groups
            .find(id_or_name, PageRequest::new())
            .await?
            .into_iter()
            .next())
    }

    async fn resolve_security_groups(&self, request: &LaunchRequest) -> Result<Vec<SecurityGroup>> {
        let mut groups = Vec::with_capacity(request.security_groups.len());
        for reference in &request.security_groups {
            let group = reference
                .resolve(ResourceKind::SecurityGroup, |id| self.security_group(id))
                .await?;
            groups.push(group);
        }
        Ok(groups)
    }

    async fn provision_port(
        &self,
        request: &LaunchRequest,
        subnet: Option<&Subnet>,
        groups: &[SecurityGroup],
    ) -> Result<Attachment> {
        let Some(subnet) = subnet else {
            return Ok(Attachment::Named(groups.iter().map(|g| g.name.clone()).collect()));
        };

        let port = PortCreate {
            name: request.name.clone(),
            network_id: subnet.network_id.clone(),
            admin_state_up: true,
            fixed_ips: vec![FixedIp {
                subnet_id: subnet.id.to_string(),
                ip_address: None,
            }],
            security_groups: groups.iter().map(|g| g.id.clone()).collect(),
        };

        info!(
            kind = %ResourceKind::NetworkInterface,
            name = %request.name,
            subnet = %subnet.id,
            "Creating port"
        );
        let created = self
            .ctx
            .clients
            .neutron
            .create_port(&port)
            .await
            .context(ResourceKind::NetworkInterface, &request.name)?;
        Ok(Attachment::Port(created.id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_root_device_boots_from_image() {
        let mut config = LaunchConfig::new();
        config.add_root_device(Some(30));

        let mapping = block_device_mapping(&config, "img-1");
        assert_eq!(mapping.len(), 1);
        let root = &mapping[0];
        assert_eq!(root.boot_index, Some(0));
        assert_eq!(root.device_name.as_deref(), Some("/dev/sda"));
        assert_eq!(root.source_type, "image");
        assert_eq!(root.uuid.as_deref(), Some("img-1"));
        assert_eq!(root.destination_type, "volume");
        assert_eq!(root.volume_size, Some(30));
        assert_eq!(root.delete_on_termination, Some(true));
    }

    #[test]
    fn test_source_types() {
        let mut config = LaunchConfig::new();
        config
            .add_volume_device(DeviceSource::Snapshot("snap-1".into()), None, Some(false))
            .add_volume_device(DeviceSource::Volume("vol-1".into()), None, None)
            .add_volume_device(DeviceSource::Image("img-2".into()), Some(8), None)
            .add_volume_device(DeviceSource::None, Some(4), Some(true));

        let mapping = block_device_mapping(&config, "img-1");
        let sources: Vec<(&str, Option<&str>)> = mapping
            .iter()
            .map(|m| (m.source_type.as_str(), m.uuid.as_deref()))
            .collect();
        assert_eq!(
            sources,
            vec![
                ("snapshot", Some("snap-1")),
                ("volume", Some("vol-1")),
                ("image", Some("img-2")),
                ("blank", None),
            ]
        );
        assert!(mapping.iter().all(|m| m.boot_index.is_none()));
        assert_eq!(mapping[0].delete_on_termination, Some(false));
        assert_eq!(mapping[1].delete_on_termination, None);
        assert_eq!(mapping[3].volume_size, Some(4));
    }

    #[test]
    fn test_ephemeral_is_local_blank() {
        let mut config = LaunchConfig::new();
        config.add_ephemeral_device();

        let mapping = block_device_mapping(&config, "img-1");
        assert_eq!(mapping[0].source_type, "blank");
        assert_eq!(mapping[0].destination_type, "local");
        assert_eq!(mapping[0].delete_on_termination, Some(true));
        assert_eq!(mapping[0].uuid, None);
    }
}
