//! Multi-step virtual machine creation
//!
//! Azure cannot create a VM together with its network interface and data
//! disks in one call. The resolver walks the launch stages in order:
//!
//! ```text
//! ResolvingNetwork ─▶ ResolvingSecurityGroups ─▶ ResolvingBlockDevices
//!        ─▶ ProvisioningNetworkInterface ─▶ ProvisioningDisks ─▶ ProvisioningInstance
//! ```
//!
//! The resolving stages only read. Configuration errors therefore surface
//! before the first mutation. When several security groups are requested,
//! their merged group is created as the first provisioning step. A failure
//! in a provisioning stage leaves the sub-resources already created in
//! place; nothing is rolled back.

use crate::error::{AzureResultExt, PROVIDER};
use crate::models::{
    DataDisk, HardwareProfile, IpConfiguration, IpConfigurationProperties, LinuxConfiguration,
    NetworkInterface, NetworkInterfaceProperties, NetworkProfile, OsDisk, OsProfile,
    SshConfiguration, SshPublicKey, StorageProfile, SubResource, VirtualMachine,
    VirtualMachineProperties,
};
use crate::normalize::{DELETE_ON_TERMINATE_TAG, KEY_PAIR_TAG};
use crate::services::{
    AzureContext, AzureImageService, AzureInstanceService, AzureKeyPairService,
    AzureSecurityGroupService, AzureSnapshotService, AzureSubnetService, AzureVolumeService,
    name_tags, unique_name,
};
use crate::userdata;
use stratus_cloud::{
    BlockDeviceMapping, CloudError, DeviceSource, ImageService, Instance, KeyPair,
    KeyPairService, LaunchRequest, LaunchStage, ResourceKind, Result, SecurityGroup,
    SecurityGroupService, Snapshot, SnapshotService, Subnet, SubnetService, Volume, VolumeService, VolumeSpec,
};
use tracing::{debug, info, warn};

const IMAGE_TYPE: &str = "Microsoft.Compute/images";
const DISK_TYPE: &str = "Microsoft.Compute/disks";
const SECURITY_GROUP_TYPE: &str = "Microsoft.Network/networkSecurityGroups";
const NIC_TYPE: &str = "Microsoft.Network/networkInterfaces";

/// A data disk to attach, before anything is created
#[derive(Debug)]
enum DiskSource {
    Blank { size: u32, zone: String },
    Snapshot {
        snapshot: Snapshot,
        size: Option<u32>,
        zone: Option<String>,
    },
    Existing(Volume),
}

#[derive(Debug)]
struct PlannedDisk {
    source: DiskSource,
    delete_on_terminate: bool,
}

/// Output of the resolving stages
struct LaunchPlan {
    instance_name: String,
    key_pair: KeyPair,
    public_key: String,
    image_uri: String,
    subnet: Subnet,
    zone: Option<String>,
    security_groups: Vec<SecurityGroup>,
    root_size: Option<u32>,
    disks: Vec<PlannedDisk>,
}

pub struct AzureLaunchResolver {
    ctx: AzureContext,
    stage: LaunchStage,
}

impl AzureLaunchResolver {
    pub fn new(ctx: AzureContext) -> Self {
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
        let Some(key_pair_ref) = &request.key_pair else {
            return Err(CloudError::unsupported(
                PROVIDER,
                "launching an instance without a key pair",
            ));
        };

        let instance_name = unique_name(&request.name);

        let key_pairs = AzureKeyPairService::new(self.ctx.clone());
        let key_pair = key_pair_ref
            .resolve(ResourceKind::KeyPair, |id| key_pairs.get(id))
            .await?;
        let Some(public_key) = key_pair.public_key.clone() else {
            return Err(CloudError::InvalidConfiguration(format!(
                "key pair '{}' has no public key",
                key_pair.name
            )));
        };

        let images = AzureImageService::new(self.ctx.clone());
        let image = request
            .image
            .resolve(ResourceKind::Image, |id| images.get(id))
            .await?;
        let image_uri = image
            .resource_id
            .clone()
            .unwrap_or_else(|| self.ctx.resource_uri(IMAGE_TYPE, &image.id));

        debug!(name = %instance_name, stage = %self.stage, "Launch stage");
        let (subnet, zone) = self.resolve_network(request).await?;
        self.advance();

        let security_groups = self.resolve_security_groups(request).await?;
        self.advance();

        let (root_size, disks) = self.resolve_block_devices(request, zone.as_deref()).await?;
        self.advance();

        let plan = LaunchPlan {
            instance_name,
            key_pair,
            public_key,
            image_uri,
            subnet,
            zone,
            security_groups,
            root_size,
            disks,
        };

        let nic = self.provision_nic(&plan).await?;
        self.advance();

        let data_disks = self.provision_disks(request, &plan).await?;
        self.advance();

        let instance = self
            .provision_instance(request, &plan, nic, data_disks)
            .await?;
        self.advance();
        Ok(instance)
    }

    /// The subnet's zone wins over the requested one
    async fn resolve_network(&self, request: &LaunchRequest) -> Result<(Subnet, Option<String>)> {
        let subnets = AzureSubnetService::new(self.ctx.clone());
        let subnet = match &request.subnet {
            Some(reference) => {
                reference
                    .resolve(ResourceKind::Subnet, |id| subnets.get(id))
                    .await?
            }
            None => subnets.get_or_create_default(request.zone.as_deref()).await?,
        };
        let zone = subnet.zone.clone().or_else(|| request.zone.clone());
        Ok((subnet, zone))
    }

    async fn resolve_security_groups(
        &self,
        request: &LaunchRequest,
    ) -> Result<Vec<SecurityGroup>> {
        let groups_svc = AzureSecurityGroupService::new(self.ctx.clone());
        let mut groups = Vec::with_capacity(request.security_groups.len());
        for reference in &request.security_groups {
            groups.push(
                reference
                    .resolve(ResourceKind::SecurityGroup, |id| groups_svc.get(id))
                    .await?,
            );
        }
        Ok(groups)
    }

    /// A NIC takes one security group, so several are merged into one
    async fn provision_security_group(&self, plan: &LaunchPlan) -> Result<Option<String>> {
        let group = match plan.security_groups.as_slice() {
            [] => return Ok(None),
            [group] => group.clone(),
            groups => {
                AzureSecurityGroupService::new(self.ctx.clone())
                    .merge(&format!("{}-sg", plan.instance_name), groups)
                    .await?
            }
        };
        Ok(Some(group.resource_id.clone().unwrap_or_else(|| {
            self.ctx.resource_uri(SECURITY_GROUP_TYPE, &group.id)
        })))
    }

    async fn resolve_block_devices(
        &self,
        request: &LaunchRequest,
        zone: Option<&str>,
    ) -> Result<(Option<u32>, Vec<PlannedDisk>)> {
        let Some(config) = &request.launch_config else {
            return Ok((None, Vec::new()));
        };

        let root_size = config.root_device().and_then(|d| d.size);
        let mut disks = Vec::new();
        for device in config.devices().iter().filter(|d| !d.is_root) {
            if device.is_ephemeral() {
                debug!("Ephemeral device skipped, Azure VMs carry a resource disk");
                continue;
            }
            if let Some(source) = self.plan_disk(device, zone).await? {
                disks.push(PlannedDisk {
                    source,
                    delete_on_terminate: device.delete_on_terminate.unwrap_or(false),
                });
            }
        }
        Ok((root_size, disks))
    }

    async fn plan_disk(
        &self,
        device: &BlockDeviceMapping,
        zone: Option<&str>,
    ) -> Result<Option<DiskSource>> {
        match &device.source {
            DeviceSource::None => {
                let Some(zone) = zone else {
                    return Err(CloudError::InvalidConfiguration(
                        "a blank volume needs a zone and none could be resolved".to_string(),
                    ));
                };
                let Some(size) = device.size else {
                    return Err(CloudError::InvalidConfiguration(
                        "a blank volume needs a size".to_string(),
                    ));
                };
                Ok(Some(DiskSource::Blank {
                    size,
                    zone: zone.to_string(),
                }))
            }
            DeviceSource::Snapshot(reference) => {
                let snapshots = AzureSnapshotService::new(self.ctx.clone());
                let snapshot = reference
                    .resolve(ResourceKind::Snapshot, |id| snapshots.get(id))
                    .await?;
                Ok(Some(DiskSource::Snapshot {
                    snapshot,
                    size: device.size,
                    zone: zone.map(str::to_string),
                }))
            }
            DeviceSource::Volume(reference) => {
                let volumes = AzureVolumeService::new(self.ctx.clone());
                let volume = reference
                    .resolve(ResourceKind::Volume, |id| volumes.get(id))
                    .await?;
                Ok(Some(DiskSource::Existing(volume)))
            }
            DeviceSource::Image(reference) => {
                warn!(image = %reference.id(), "Image-sourced data disks are not supported on Azure, skipping");
                Ok(None)
            }
        }
    }

    async fn provision_nic(&self, plan: &LaunchPlan) -> Result<SubResource> {
        let security_group = self.provision_security_group(plan).await?;
        let nic_name = format!("{}_nic", plan.instance_name);
        let subnet_uri = plan.subnet.resource_id.clone().unwrap_or_else(|| {
            format!(
                "{}/providers/Microsoft.Network/virtualNetworks/{}/subnets/{}",
                self.ctx.config.resource_group_scope(),
                plan.subnet.network_id,
                plan.subnet.id.subnet()
            )
        });

        let nic = NetworkInterface {
            location: self.location(plan),
            properties: NetworkInterfaceProperties {
                ip_configurations: vec![IpConfiguration {
                    name: format!("{}_ip_config", plan.instance_name),
                    properties: IpConfigurationProperties {
                        private_ip_allocation_method: "Dynamic".to_string(),
                        subnet: SubResource::new(subnet_uri),
                        private_ip_address: None,
                        public_ip_address: None,
                    },
                }],
                network_security_group: security_group.map(SubResource::new),
            },
            ..Default::default()
        };

        info!(kind = %ResourceKind::NetworkInterface, name = %nic_name, "Creating NIC");
        let created = self
            .ctx
            .client
            .create_nic(&nic_name, &nic)
            .await
            .context(ResourceKind::NetworkInterface, &nic_name)?;

        let id = if created.id.is_empty() {
            self.ctx.resource_uri(NIC_TYPE, &nic_name)
        } else {
            created.id
        };
        Ok(SubResource::new(id))
    }

    async fn provision_disks(
        &self,
        request: &LaunchRequest,
        plan: &LaunchPlan,
    ) -> Result<Vec<DataDisk>> {
        if plan.disks.is_empty() {
            debug!(stage = %self.stage, "No data disks, skipping");
            return Ok(Vec::new());
        }

        let volumes = AzureVolumeService::new(self.ctx.clone());
        let mut attached = Vec::with_capacity(plan.disks.len());
        for (lun, disk) in plan.disks.iter().enumerate() {
            let volume = match &disk.source {
                DiskSource::Blank { size, zone } => {
                    let spec = VolumeSpec::new(format!("{}_disk", request.name), *size)
                        .in_zone(zone.clone());
                    volumes.create(spec).await?
                }
                DiskSource::Snapshot {
                    snapshot,
                    size,
                    zone,
                } => {
                    let mut spec =
                        VolumeSpec::new(snapshot.name.clone(), size.unwrap_or(snapshot.size))
                            .from_snapshot(snapshot.clone());
                    if let Some(zone) = zone {
                        spec = spec.in_zone(zone.clone());
                    }
                    volumes.create(spec).await?
                }
                DiskSource::Existing(volume) => volume.clone(),
            };

            self.tag_delete_on_terminate(&volume, disk.delete_on_terminate)
                .await?;

            let lun = u32::try_from(lun).map_err(|_| {
                CloudError::InvalidConfiguration("too many data disks".to_string())
            })?;
            attached.push(DataDisk {
                lun,
                name: volume.id.clone(),
                create_option: "Attach".to_string(),
                managed_disk: Some(SubResource::new(
                    volume
                        .resource_id
                        .clone()
                        .unwrap_or_else(|| self.ctx.resource_uri(DISK_TYPE, &volume.id)),
                )),
            });
        }
        Ok(attached)
    }

    async fn tag_delete_on_terminate(&self, volume: &Volume, delete: bool) -> Result<()> {
        let mut tags = volume.tags.clone();
        tags.insert(
            DELETE_ON_TERMINATE_TAG.to_string(),
            if delete { "True" } else { "False" }.to_string(),
        );

        debug!(kind = %ResourceKind::Volume, id = %volume.id, delete, "Tagging disk");
        self.ctx
            .client
            .update_disk_tags(&volume.id, &tags)
            .await
            .context(ResourceKind::Volume, &volume.id)?;
        Ok(())
    }

    async fn provision_instance(
        &self,
        request: &LaunchRequest,
        plan: &LaunchPlan,
        nic: SubResource,
        data_disks: Vec<DataDisk>,
    ) -> Result<Instance> {
        let config = &self.ctx.config;
        let mut tags = name_tags(&request.name, None);
        tags.insert(KEY_PAIR_TAG.to_string(), plan.key_pair.name.clone());

        let vm = VirtualMachine {
            location: self.location(plan),
            tags,
            properties: VirtualMachineProperties {
                hardware_profile: Some(HardwareProfile {
                    vm_size: request.instance_type.id().to_string(),
                }),
                storage_profile: Some(StorageProfile {
                    image_reference: Some(SubResource::new(plan.image_uri.clone())),
                    os_disk: Some(OsDisk {
                        name: format!("{}_os_disk", plan.instance_name),
                        create_option: "FromImage".to_string(),
                        disk_size_gb: plan.root_size,
                        managed_disk: None,
                    }),
                    data_disks,
                }),
                os_profile: Some(OsProfile {
                    admin_username: config.vm_default_user_name.clone(),
                    computer_name: plan.instance_name.clone(),
                    custom_data: userdata::custom_data(request.user_data.as_deref()),
                    linux_configuration: Some(LinuxConfiguration {
                        disable_password_authentication: true,
                        ssh: SshConfiguration {
                            public_keys: vec![SshPublicKey {
                                path: config.authorized_keys_path(),
                                key_data: plan.public_key.clone(),
                            }],
                        },
                    }),
                }),
                network_profile: Some(NetworkProfile {
                    network_interfaces: vec![nic],
                }),
                ..Default::default()
            },
            ..Default::default()
        };

        info!(
            kind = %ResourceKind::Instance,
            name = %plan.instance_name,
            size = %request.instance_type.id(),
            "Creating virtual machine"
        );
        let created = self
            .ctx
            .client
            .create_vm(&plan.instance_name, &vm)
            .await
            .context(ResourceKind::Instance, &plan.instance_name)?;
        AzureInstanceService::new(self.ctx.clone())
            .describe(&created)
            .await
    }

    fn location(&self, plan: &LaunchPlan) -> String {
        plan.zone
            .clone()
            .unwrap_or_else(|| self.ctx.config.region_name.clone())
    }
}
