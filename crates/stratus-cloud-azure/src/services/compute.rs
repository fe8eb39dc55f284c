//! Virtual machines, VM sizes, images and locations

use super::AzureContext;
use crate::error::AzureResultExt;
use crate::launch::AzureLaunchResolver;
use crate::models::VirtualMachine;
use crate::normalize;
use async_trait::async_trait;
use stratus_cloud::{
    CloudError, ImageService, Instance, InstanceService, InstanceType, InstanceTypeService,
    LaunchRequest, MachineImage, NameFilter, PageRequest, PagedResult, Region, RegionService,
    ResourceKind, Result,
};
use tracing::{debug, info};

#[derive(Clone)]
pub struct AzureInstanceService {
    ctx: AzureContext,
}

impl AzureInstanceService {
    pub fn new(ctx: AzureContext) -> Self {
        Self { ctx }
    }

    async fn all(&self) -> Result<Vec<Instance>> {
        debug!(kind = %ResourceKind::Instance, "Listing virtual machines");
        let vms = self
            .ctx
            .client
            .list_vms()
            .await
            .context(ResourceKind::Instance, "*")?;

        let mut instances = Vec::with_capacity(vms.len());
        for vm in &vms {
            instances.push(self.describe(vm).await?);
        }
        Ok(instances)
    }

    /// Subnet, NSG and addresses live on the NICs, not on the VM
    pub(crate) async fn describe(&self, vm: &VirtualMachine) -> Result<Instance> {
        let mut nics = Vec::new();
        for name in normalize::vm_nic_names(vm) {
            let nic = self
                .ctx
                .client
                .get_nic(&name)
                .await
                .optional(ResourceKind::NetworkInterface, &name)?;
            nics.extend(nic);
        }

        let has_public_ip = nics
            .iter()
            .flat_map(|nic| &nic.properties.ip_configurations)
            .any(|config| config.properties.public_ip_address.is_some());
        let public_ips = if has_public_ip {
            self.ctx
                .client
                .list_public_ips()
                .await
                .context(ResourceKind::FloatingIp, &vm.name)?
        } else {
            Vec::new()
        };

        Ok(normalize::instance_with_nics(vm, &nics, &public_ips))
    }

    async fn delete_disk(&self, name: &str) -> Result<bool> {
        self.ctx
            .client
            .delete_disk(name)
            .await
            .absent(ResourceKind::Volume, name)
    }
}

#[async_trait]
impl InstanceService for AzureInstanceService {
    async fn get(&self, id: &str) -> Result<Option<Instance>> {
        debug!(kind = %ResourceKind::Instance, id, "Getting virtual machine");
        let vm = self
            .ctx
            .client
            .get_vm(id)
            .await
            .optional(ResourceKind::Instance, id)?;
        match vm {
            Some(vm) => Ok(Some(self.describe(&vm).await?)),
            None => Ok(None),
        }
    }

    async fn list(&self, page: PageRequest) -> Result<PagedResult<Instance>> {
        Ok(self.ctx.page(self.all().await?, &page))
    }

    async fn find(&self, name: &str, page: PageRequest) -> Result<PagedResult<Instance>> {
        let matched = NameFilter::glob(name).retain(self.all().await?);
        Ok(self.ctx.page(matched, &page))
    }

    async fn create(&self, request: LaunchRequest) -> Result<Instance> {
        AzureLaunchResolver::new(self.ctx.clone())
            .launch(request)
            .await
    }

    /// The VM goes first, then its NICs and OS disk. Data disks only go when
    /// they were tagged delete-on-terminate at launch.
    async fn delete(&self, id: &str) -> Result<bool> {
        let Some(vm) = self
            .ctx
            .client
            .get_vm(id)
            .await
            .optional(ResourceKind::Instance, id)?
        else {
            return Ok(true);
        };

        info!(kind = %ResourceKind::Instance, id, "Deleting virtual machine");
        self.ctx
            .client
            .delete_vm(id)
            .await
            .absent(ResourceKind::Instance, id)?;

        for nic in normalize::vm_nic_names(&vm) {
            debug!(kind = %ResourceKind::NetworkInterface, id = %nic, "Deleting NIC");
            self.ctx
                .client
                .delete_nic(&nic)
                .await
                .absent(ResourceKind::NetworkInterface, &nic)?;
        }

        let Some(storage) = vm.properties.storage_profile.as_ref() else {
            return Ok(true);
        };

        if let Some(os_disk) = &storage.os_disk {
            debug!(kind = %ResourceKind::Volume, id = %os_disk.name, "Deleting OS disk");
            self.delete_disk(&os_disk.name).await?;
        }

        for data_disk in &storage.data_disks {
            let disk = self
                .ctx
                .client
                .get_disk(&data_disk.name)
                .await
                .optional(ResourceKind::Volume, &data_disk.name)?;
            match disk {
                Some(disk) if normalize::delete_on_terminate(&disk.tags) => {
                    debug!(kind = %ResourceKind::Volume, id = %data_disk.name, "Deleting data disk");
                    self.delete_disk(&data_disk.name).await?;
                }
                Some(_) => {
                    debug!(kind = %ResourceKind::Volume, id = %data_disk.name, "Keeping data disk");
                }
                None => {}
            }
        }

        Ok(true)
    }
}

/// VM sizes available in the configured region
#[derive(Clone)]
pub struct AzureInstanceTypeService {
    ctx: AzureContext,
}

impl AzureInstanceTypeService {
    pub fn new(ctx: AzureContext) -> Self {
        Self { ctx }
    }
}

#[async_trait]
impl InstanceTypeService for AzureInstanceTypeService {
    fn result_limit(&self) -> usize {
        self.ctx.config.result_limit
    }

    async fn list(&self, page: PageRequest) -> Result<PagedResult<InstanceType>> {
        let region = &self.ctx.config.region_name;
        debug!(kind = %ResourceKind::InstanceType, region = %region, "Listing VM sizes");
        let sizes = self
            .ctx
            .client
            .list_vm_sizes(region)
            .await
            .context(ResourceKind::InstanceType, region)?;
        Ok(self
            .ctx
            .page(sizes.iter().map(normalize::instance_type).collect(), &page))
    }
}

#[derive(Clone)]
pub struct AzureImageService {
    ctx: AzureContext,
}

impl AzureImageService {
    pub fn new(ctx: AzureContext) -> Self {
        Self { ctx }
    }

    async fn all(&self) -> Result<Vec<MachineImage>> {
        debug!(kind = %ResourceKind::Image, "Listing images");
        let images = self
            .ctx
            .client
            .list_images()
            .await
            .context(ResourceKind::Image, "*")?;
        Ok(images.iter().map(normalize::machine_image).collect())
    }
}

#[async_trait]
impl ImageService for AzureImageService {
    async fn get(&self, id: &str) -> Result<Option<MachineImage>> {
        debug!(kind = %ResourceKind::Image, id, "Getting image");
        let image = self
            .ctx
            .client
            .get_image(id)
            .await
            .optional(ResourceKind::Image, id)?;
        Ok(image.as_ref().map(normalize::machine_image))
    }

    async fn list(&self, page: PageRequest) -> Result<PagedResult<MachineImage>> {
        Ok(self.ctx.page(self.all().await?, &page))
    }

    async fn find(&self, name: &str, page: PageRequest) -> Result<PagedResult<MachineImage>> {
        let matched = NameFilter::glob(name).retain(self.all().await?);
        Ok(self.ctx.page(matched, &page))
    }
}

/// Subscription locations
#[derive(Clone)]
pub struct AzureRegionService {
    ctx: AzureContext,
}

impl AzureRegionService {
    pub fn new(ctx: AzureContext) -> Self {
        Self { ctx }
    }

    async fn all(&self) -> Result<Vec<Region>> {
        debug!(kind = %ResourceKind::Region, "Listing locations");
        let locations = self
            .ctx
            .client
            .list_locations()
            .await
            .context(ResourceKind::Region, "*")?;
        Ok(locations.iter().map(normalize::region).collect())
    }
}

#[async_trait]
impl RegionService for AzureRegionService {
    async fn get(&self, id: &str) -> Result<Option<Region>> {
        Ok(self.all().await?.into_iter().find(|r| r.id == id))
    }

    async fn list(&self, page: PageRequest) -> Result<PagedResult<Region>> {
        Ok(self.ctx.page(self.all().await?, &page))
    }

    async fn current(&self) -> Result<Region> {
        let region = &self.ctx.config.region_name;
        self.get(region)
            .await?
            .ok_or_else(|| CloudError::not_found(ResourceKind::Region, region.clone()))
    }
}
