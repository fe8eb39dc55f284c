//! Instance launch configuration
//!
//! A [`LaunchRequest`] carries everything needed to create an instance. Its
//! [`LaunchConfig`] is the ordered list of block-device mappings; backends
//! walk it during the [`LaunchStage::ResolvingBlockDevices`] stage.

use crate::error::{CloudError, Result};
use crate::reference::Reference;
use crate::resource::{
    InstanceType, KeyPair, MachineImage, SecurityGroup, Snapshot, Subnet, Volume,
};

/// Where a block device gets its initial contents from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeviceSource {
    /// A new blank device
    None,
    Volume(Reference<Volume>),
    Snapshot(Reference<Snapshot>),
    Image(Reference<MachineImage>),
}

impl DeviceSource {
    pub fn is_none(&self) -> bool {
        matches!(self, DeviceSource::None)
    }
}

/// Whether a mapping is a persistent volume or an instance-local disk
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceKind {
    Volume,
    Ephemeral,
}

/// One declared block device attachment
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockDeviceMapping {
    pub is_root: bool,
    pub kind: DeviceKind,
    pub source: DeviceSource,

    /// Size in GB
    pub size: Option<u32>,
    pub delete_on_terminate: Option<bool>,
}

impl BlockDeviceMapping {
    pub fn is_volume(&self) -> bool {
        self.kind == DeviceKind::Volume
    }

    pub fn is_ephemeral(&self) -> bool {
        self.kind == DeviceKind::Ephemeral
    }
}

/// Ordered block-device mappings for a launch
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LaunchConfig {
    devices: Vec<BlockDeviceMapping>,
}

impl LaunchConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from raw mappings. Nothing is checked until [`validate`](Self::validate).
    pub fn from_devices(devices: Vec<BlockDeviceMapping>) -> Self {
        Self { devices }
    }

    /// Boot disk created from the instance image, optionally resized
    pub fn add_root_device(&mut self, size: Option<u32>) -> &mut Self {
        self.devices.push(BlockDeviceMapping {
            is_root: true,
            kind: DeviceKind::Volume,
            source: DeviceSource::None,
            size,
            delete_on_terminate: Some(true),
        });
        self
    }

    /// Boot disk backed by an existing volume, snapshot or image
    pub fn add_boot_volume(
        &mut self,
        source: DeviceSource,
        size: Option<u32>,
        delete_on_terminate: Option<bool>,
    ) -> &mut Self {
        self.devices.push(BlockDeviceMapping {
            is_root: true,
            kind: DeviceKind::Volume,
            source,
            size,
            delete_on_terminate,
        });
        self
    }

    /// Non-root data volume
    pub fn add_volume_device(
        &mut self,
        source: DeviceSource,
        size: Option<u32>,
        delete_on_terminate: Option<bool>,
    ) -> &mut Self {
        self.devices.push(BlockDeviceMapping {
            is_root: false,
            kind: DeviceKind::Volume,
            source,
            size,
            delete_on_terminate,
        });
        self
    }

    /// Instance-local scratch disk
    pub fn add_ephemeral_device(&mut self) -> &mut Self {
        self.devices.push(BlockDeviceMapping {
            is_root: false,
            kind: DeviceKind::Ephemeral,
            source: DeviceSource::None,
            size: None,
            delete_on_terminate: Some(true),
        });
        self
    }

    pub fn devices(&self) -> &[BlockDeviceMapping] {
        &self.devices
    }

    pub fn is_empty(&self) -> bool {
        self.devices.is_empty()
    }

    pub fn root_device(&self) -> Option<&BlockDeviceMapping> {
        self.devices.iter().find(|d| d.is_root)
    }

    /// Whether any device other than the root needs provisioning
    pub fn has_data_devices(&self) -> bool {
        self.devices.iter().any(|d| !d.is_root)
    }

    /// Reject structurally impossible configurations.
    ///
    /// Runs before any provider call is made.
    pub fn validate(&self) -> Result<()> {
        let roots = self.devices.iter().filter(|d| d.is_root).count();
        if roots > 1 {
            return Err(CloudError::InvalidConfiguration(format!(
                "only one root device is allowed, found {}",
                roots
            )));
        }

        if let Some(root) = self.root_device()
            && root.is_ephemeral()
        {
            return Err(CloudError::InvalidConfiguration(
                "the root device cannot be ephemeral".to_string(),
            ));
        }

        if self.devices.iter().any(|d| d.size == Some(0)) {
            return Err(CloudError::InvalidConfiguration(
                "block device size must be greater than zero".to_string(),
            ));
        }

        Ok(())
    }
}

/// Steps of instance creation, in order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum LaunchStage {
    ResolvingNetwork,
    ResolvingSecurityGroups,
    ResolvingBlockDevices,
    ProvisioningNetworkInterface,
    ProvisioningDisks,
    ProvisioningInstance,
    Done,
}

impl LaunchStage {
    pub fn next(self) -> Option<LaunchStage> {
        use LaunchStage::*;
        match self {
            ResolvingNetwork => Some(ResolvingSecurityGroups),
            ResolvingSecurityGroups => Some(ResolvingBlockDevices),
            ResolvingBlockDevices => Some(ProvisioningNetworkInterface),
            ProvisioningNetworkInterface => Some(ProvisioningDisks),
            ProvisioningDisks => Some(ProvisioningInstance),
            ProvisioningInstance => Some(Done),
            Done => None,
        }
    }
}

impl std::fmt::Display for LaunchStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LaunchStage::ResolvingNetwork => write!(f, "resolving network"),
            LaunchStage::ResolvingSecurityGroups => write!(f, "resolving security groups"),
            LaunchStage::ResolvingBlockDevices => write!(f, "resolving block devices"),
            LaunchStage::ProvisioningNetworkInterface => {
                write!(f, "provisioning network interface")
            }
            LaunchStage::ProvisioningDisks => write!(f, "provisioning disks"),
            LaunchStage::ProvisioningInstance => write!(f, "provisioning instance"),
            LaunchStage::Done => write!(f, "done"),
        }
    }
}

/// Everything needed to create one instance
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LaunchRequest {
    pub name: String,
    pub image: Reference<MachineImage>,
    pub instance_type: Reference<InstanceType>,
    pub subnet: Option<Reference<Subnet>>,
    pub zone: Option<String>,
    pub key_pair: Option<Reference<KeyPair>>,
    pub security_groups: Vec<Reference<SecurityGroup>>,
    pub user_data: Option<String>,
    pub launch_config: Option<LaunchConfig>,
}

impl LaunchRequest {
    pub fn new(
        name: impl Into<String>,
        image: impl Into<Reference<MachineImage>>,
        instance_type: impl Into<Reference<InstanceType>>,
    ) -> Self {
        Self {
            name: name.into(),
            image: image.into(),
            instance_type: instance_type.into(),
            subnet: None,
            zone: None,
            key_pair: None,
            security_groups: Vec::new(),
            user_data: None,
            launch_config: None,
        }
    }

    pub fn with_subnet(mut self, subnet: impl Into<Reference<Subnet>>) -> Self {
        self.subnet = Some(subnet.into());
        self
    }

    pub fn with_zone(mut self, zone: impl Into<String>) -> Self {
        self.zone = Some(zone.into());
        self
    }

    pub fn with_key_pair(mut self, key_pair: impl Into<Reference<KeyPair>>) -> Self {
        self.key_pair = Some(key_pair.into());
        self
    }

    pub fn with_security_group(mut self, group: impl Into<Reference<SecurityGroup>>) -> Self {
        self.security_groups.push(group.into());
        self
    }

    pub fn with_user_data(mut self, user_data: impl Into<String>) -> Self {
        self.user_data = Some(user_data.into());
        self
    }

    pub fn with_launch_config(mut self, config: LaunchConfig) -> Self {
        self.launch_config = Some(config);
        self
    }

    /// Validate the parts of the request that need no provider lookup
    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(CloudError::InvalidConfiguration(
                "instance name must not be empty".to_string(),
            ));
        }
        match &self.launch_config {
            Some(config) => config.validate(),
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_root_is_valid() {
        let mut config = LaunchConfig::new();
        config
            .add_root_device(Some(30))
            .add_volume_device(DeviceSource::None, Some(10), Some(true))
            .add_ephemeral_device();

        assert!(config.validate().is_ok());
        assert_eq!(config.devices().len(), 3);
        assert_eq!(config.root_device().and_then(|d| d.size), Some(30));
        assert!(config.has_data_devices());
    }

    #[test]
    fn test_two_roots_rejected() {
        let mut config = LaunchConfig::new();
        config
            .add_root_device(None)
            .add_boot_volume(DeviceSource::Volume("vol-1".into()), None, None);

        let err = config.validate().unwrap_err();
        assert!(matches!(err, CloudError::InvalidConfiguration(_)));
    }

    #[test]
    fn test_zero_size_rejected() {
        let mut config = LaunchConfig::new();
        config.add_volume_device(DeviceSource::None, Some(0), None);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_ephemeral_root_rejected() {
        let config = LaunchConfig::from_devices(vec![BlockDeviceMapping {
            is_root: true,
            kind: DeviceKind::Ephemeral,
            source: DeviceSource::None,
            size: None,
            delete_on_terminate: None,
        }]);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_root_only_has_no_data_devices() {
        let mut config = LaunchConfig::new();
        config.add_root_device(Some(20));
        assert!(!config.has_data_devices());
    }

    #[test]
    fn test_stage_order() {
        let mut stage = LaunchStage::ResolvingNetwork;
        let mut seen = vec![stage];
        while let Some(next) = stage.next() {
            assert!(next > stage);
            seen.push(next);
            stage = next;
        }
        assert_eq!(seen.len(), 7);
        assert_eq!(stage, LaunchStage::Done);
        assert_eq!(LaunchStage::ProvisioningDisks.to_string(), "provisioning disks");
    }

    #[test]
    fn test_request_validation() {
        let request = LaunchRequest::new(" ", "img", "Standard_B1s");
        assert!(request.validate().is_err());

        let mut config = LaunchConfig::new();
        config.add_root_device(None).add_root_device(None);
        let request = LaunchRequest::new("web", "img", "Standard_B1s").with_launch_config(config);
        assert!(request.validate().is_err());
    }
}
