//! Nova servers, flavors and images; Keystone regions

use super::OpenStackContext;
use crate::error::OpenStackResultExt;
use crate::launch::OpenStackLaunchResolver;
use crate::models::{Port, PortQuery, SecurityGroup, Server, ServerQuery};
use crate::normalize;
use async_trait::async_trait;
use futures_util::FutureExt;
use stratus_cloud::{
    CloudError, CursorRequest, ImageService, Instance, InstanceService, InstanceType,
    InstanceTypeService, LaunchRequest, MachineImage, NameFilter, PageRequest, PagedResult,
    Paginator, Region, RegionService, ResourceKind, Result,
};
use tracing::{debug, info};

#[derive(Clone)]
pub struct OpenStackInstanceService {
    ctx: OpenStackContext,
}

impl OpenStackInstanceService {
    pub fn new(ctx: OpenStackContext) -> Self {
        Self { ctx }
    }

    async fn fetch(&self, name: Option<&str>, request: CursorRequest) -> Result<Vec<Instance>> {
        debug!(kind = %ResourceKind::Instance, name, limit = request.limit, "Listing servers");
        let query = ServerQuery {
            name: name.map(str::to_string),
            limit: Some(request.limit),
            marker: request.marker,
        };
        let servers = self
            .ctx
            .clients
            .nova
            .list_servers(&query)
            .await
            .context(ResourceKind::Instance, name.unwrap_or("*"))?;
        self.describe(&servers).await
    }

    /// Nova knows neither subnets nor group ids; both come from Neutron
    async fn attachments(&self, servers: &[Server]) -> Result<(Vec<Port>, Vec<SecurityGroup>)> {
        let neutron = &self.ctx.clients.neutron;
        let (device_id, target) = match servers {
            [] => return Ok((Vec::new(), Vec::new())),
            [server] => (Some(server.id.clone()), server.id.as_str()),
            _ => (None, "*"),
        };
        let ports = neutron
            .list_ports(&PortQuery {
                device_id,
                device_owner: None,
            })
            .await
            .context(ResourceKind::NetworkInterface, target)?;

        let unported = servers.iter().any(|server| {
            !server.security_groups.is_empty() && !ports.iter().any(|p| p.device_id == server.id)
        });
        let groups = if unported {
            neutron
                .list_security_groups()
                .await
                .context(ResourceKind::SecurityGroup, "*")?
        } else {
            Vec::new()
        };
        Ok((ports, groups))
    }

    async fn describe(&self, servers: &[Server]) -> Result<Vec<Instance>> {
        let (ports, groups) = self.attachments(servers).await?;
        Ok(servers
            .iter()
            .map(|server| normalize::instance_with_ports(server, &ports, &groups))
            .collect())
    }

    pub(crate) async fn describe_one(&self, server: &Server) -> Result<Instance> {
        let (ports, groups) = self.attachments(std::slice::from_ref(server)).await?;
        Ok(normalize::instance_with_ports(server, &ports, &groups))
    }
}

#[async_trait]
impl InstanceService for OpenStackInstanceService {
    async fn get(&self, id: &str) -> Result<Option<Instance>> {
        debug!(kind = %ResourceKind::Instance, id, "Getting server");
        let server = self
            .ctx
            .clients
            .nova
            .get_server(id)
            .await
            .optional(ResourceKind::Instance, id)?;
        match server {
            Some(server) => self.describe_one(&server).await.map(Some),
            None => Ok(None),
        }
    }

    async fn list(&self, page: PageRequest) -> Result<PagedResult<Instance>> {
        self.ctx
            .cursor(&page, |req| self.fetch(None, req).boxed())
            .await
    }

    /// Nova matches the name as a regular expression
    async fn find(&self, name: &str, page: PageRequest) -> Result<PagedResult<Instance>> {
        self.ctx
            .cursor(&page, move |req| self.fetch(Some(name), req).boxed())
            .await
    }

    async fn create(&self, request: LaunchRequest) -> Result<Instance> {
        OpenStackLaunchResolver::new(self.ctx.clone())
            .launch(request)
            .await
    }

    /// Nova removes volumes flagged delete-on-termination itself; the
    /// port created at launch has to go separately
    async fn delete(&self, id: &str) -> Result<bool> {
        let clients = &self.ctx.clients;
        let Some(server) = clients
            .nova
            .get_server(id)
            .await
            .optional(ResourceKind::Instance, id)?
        else {
            return Ok(true);
        };

        let ports = clients
            .neutron
            .list_ports(&PortQuery {
                device_id: Some(server.id.clone()),
                device_owner: None,
            })
            .await
            .context(ResourceKind::NetworkInterface, id)?;

        info!(kind = %ResourceKind::Instance, id, "Deleting server");
        clients
            .nova
            .delete_server(id)
            .await
            .absent(ResourceKind::Instance, id)?;

        for port in ports.iter().filter(|p| p.name == server.name) {
            info!(kind = %ResourceKind::NetworkInterface, id = %port.id, "Deleting port");
            clients
                .neutron
                .delete_port(&port.id)
                .await
                .absent(ResourceKind::NetworkInterface, &port.id)?;
        }
        Ok(true)
    }
}

#[derive(Clone)]
pub struct OpenStackInstanceTypeService {
    ctx: OpenStackContext,
}

impl OpenStackInstanceTypeService {
    pub fn new(ctx: OpenStackContext) -> Self {
        Self { ctx }
    }

    async fn fetch(&self, request: CursorRequest) -> Result<Vec<InstanceType>> {
        debug!(kind = %ResourceKind::InstanceType, limit = request.limit, "Listing flavors");
        let flavors = self
            .ctx
            .clients
            .nova
            .list_flavors(Some(request.limit), request.marker.as_deref())
            .await
            .context(ResourceKind::InstanceType, "*")?;
        Ok(flavors.iter().map(normalize::instance_type).collect())
    }
}

#[async_trait]
impl InstanceTypeService for OpenStackInstanceTypeService {
    fn result_limit(&self) -> usize {
        self.ctx.config.result_limit
    }

    async fn list(&self, page: PageRequest) -> Result<PagedResult<InstanceType>> {
        self.ctx
            .cursor(&page, |req| self.fetch(req).boxed())
            .await
    }
}

#[derive(Clone)]
pub struct OpenStackImageService {
    ctx: OpenStackContext,
}

impl OpenStackImageService {
    pub fn new(ctx: OpenStackContext) -> Self {
        Self { ctx }
    }

    async fn fetch(&self, request: CursorRequest) -> Result<Vec<MachineImage>> {
        debug!(kind = %ResourceKind::Image, limit = request.limit, "Listing images");
        let images = self
            .ctx
            .clients
            .nova
            .list_images(Some(request.limit), request.marker.as_deref())
            .await
            .context(ResourceKind::Image, "*")?;
        Ok(images.iter().map(normalize::image).collect())
    }
}

#[async_trait]
impl ImageService for OpenStackImageService {
    async fn get(&self, id: &str) -> Result<Option<MachineImage>> {
        debug!(kind = %ResourceKind::Image, id, "Getting image");
        let image = self
            .ctx
            .clients
            .nova
            .get_image(id)
            .await
            .optional(ResourceKind::Image, id)?;
        Ok(image.as_ref().map(normalize::image))
    }

    async fn list(&self, page: PageRequest) -> Result<PagedResult<MachineImage>> {
        self.ctx
            .cursor(&page, |req| self.fetch(req).boxed())
            .await
    }

    /// Glob over every image; walks the whole listing
    async fn find(&self, name: &str, page: PageRequest) -> Result<PagedResult<MachineImage>> {
        let all = Paginator::new(None, |req| self.list(req))
            .collect_all()
            .await?;
        let matched = NameFilter::glob(name).retain(all);
        Ok(self.ctx.page(matched, &page))
    }
}

#[derive(Clone)]
pub struct OpenStackRegionService {
    ctx: OpenStackContext,
}

impl OpenStackRegionService {
    pub fn new(ctx: OpenStackContext) -> Self {
        Self { ctx }
    }

    async fn region_ids(&self) -> Result<Vec<String>> {
        let keystone = &self.ctx.clients.keystone;
        if self.ctx.config.has_region_api() {
            debug!(kind = %ResourceKind::Region, "Listing keystone regions");
            let regions = keystone
                .list_regions()
                .await
                .context(ResourceKind::Region, "*")?;
            Ok(regions.iter().map(normalize::keystone_region).collect())
        } else {
            // Identity v2 has no region API, only the endpoints know them
            debug!(kind = %ResourceKind::Region, "Collecting regions from the service catalog");
            let catalog = keystone
                .service_catalog()
                .await
                .context(ResourceKind::Region, "*")?;
            Ok(normalize::catalog_regions(&catalog))
        }
    }

    /// Zones are only visible for the region the session is scoped to
    async fn all(&self) -> Result<Vec<Region>> {
        let current = &self.ctx.config.region_name;
        let zones = self
            .ctx
            .clients
            .nova
            .list_availability_zones()
            .await
            .context(ResourceKind::Region, current)?;

        Ok(self
            .region_ids()
            .await?
            .iter()
            .map(|id| {
                let region_zones = if id == current {
                    zones
                        .iter()
                        .filter(|z| z.zone_state.available)
                        .map(|z| normalize::zone(z, id))
                        .collect()
                } else {
                    Vec::new()
                };
                normalize::region(id, region_zones)
            })
            .collect())
    }
}

#[async_trait]
impl RegionService for OpenStackRegionService {
    async fn get(&self, id: &str) -> Result<Option<Region>> {
        Ok(self.all().await?.into_iter().find(|r| r.id == id))
    }

    async fn list(&self, page: PageRequest) -> Result<PagedResult<Region>> {
        Ok(self.ctx.page(self.all().await?, &page))
    }

    async fn current(&self) -> Result<Region> {
        let name = &self.ctx.config.region_name;
        self.get(name)
            .await?
            .ok_or_else(|| CloudError::not_found(ResourceKind::Region, name.clone()))
    }
}
