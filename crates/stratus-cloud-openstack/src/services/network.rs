//! Neutron networks, subnets, routers, gateways and floating IPs

use super::OpenStackContext;
use crate::config::{
    DEFAULT_GATEWAY_NAME, DEFAULT_NETWORK_CIDR, DEFAULT_NETWORK_NAME, DEFAULT_ROUTER_NAME,
    DEFAULT_SUBNET_CIDR, DEFAULT_SUBNET_NAME,
};
use crate::error::OpenStackResultExt;
use crate::models::{
    Network as NativeNetwork, NetworkCreate, PortQuery, ROUTER_INTERFACE_OWNER, RouterCreate,
    SubnetCreate,
};
use crate::normalize;
use async_trait::async_trait;
use stratus_cloud::{
    CloudError, FloatingIp, GatewayService, InternetGateway, NameFilter, Network, NetworkService,
    PageRequest, PagedResult, ResourceKind, Result, Router, RouterService, Subnet, SubnetService,
    validate_resource_name,
};
use tracing::{debug, info, warn};

async fn external_networks(ctx: &OpenStackContext) -> Result<Vec<NativeNetwork>> {
    debug!(kind = %ResourceKind::Network, "Listing external networks");
    let networks = ctx
        .clients
        .neutron
        .list_networks(None)
        .await
        .context(ResourceKind::Network, "*")?;
    Ok(networks.into_iter().filter(|n| n.router_external).collect())
}

#[derive(Clone)]
pub struct OpenStackNetworkService {
    ctx: OpenStackContext,
}

impl OpenStackNetworkService {
    pub fn new(ctx: OpenStackContext) -> Self {
        Self { ctx }
    }

    async fn all(&self, name: Option<&str>) -> Result<Vec<Network>> {
        debug!(kind = %ResourceKind::Network, name, "Listing networks");
        let networks = self
            .ctx
            .clients
            .neutron
            .list_networks(name)
            .await
            .context(ResourceKind::Network, name.unwrap_or("*"))?;
        Ok(networks.iter().map(normalize::network).collect())
    }
}

#[async_trait]
impl NetworkService for OpenStackNetworkService {
    async fn get(&self, id: &str) -> Result<Option<Network>> {
        Ok(self.all(None).await?.into_iter().find(|n| n.id == id))
    }

    async fn list(&self, page: PageRequest) -> Result<PagedResult<Network>> {
        Ok(self.ctx.page(self.all(None).await?, &page))
    }

    async fn find(&self, name: &str, page: PageRequest) -> Result<PagedResult<Network>> {
        Ok(self.ctx.page(self.all(Some(name)).await?, &page))
    }

    /// Neutron networks have no address space of their own; the CIDR is
    /// given to their subnets instead
    async fn create(&self, name: Option<&str>, cidr_block: Option<&str>) -> Result<Network> {
        let name = name.unwrap_or(DEFAULT_NETWORK_NAME);
        validate_resource_name(ResourceKind::Network, name)?;
        if let Some(cidr) = cidr_block {
            debug!(kind = %ResourceKind::Network, name, cidr, "Network CIDR is not used");
        }

        let request = NetworkCreate {
            name: name.to_string(),
            admin_state_up: true,
        };
        info!(kind = %ResourceKind::Network, name, "Creating network");
        let created = self
            .ctx
            .clients
            .neutron
            .create_network(&request)
            .await
            .context(ResourceKind::Network, name)?;
        Ok(normalize::network(&created))
    }

    async fn delete(&self, id: &str) -> Result<bool> {
        info!(kind = %ResourceKind::Network, id, "Deleting network");
        self.ctx
            .clients
            .neutron
            .delete_network(id)
            .await
            .absent(ResourceKind::Network, id)
    }

    async fn floating_ips(&self, page: PageRequest) -> Result<PagedResult<FloatingIp>> {
        debug!(kind = %ResourceKind::FloatingIp, "Listing floating IPs");
        let ips = self
            .ctx
            .clients
            .neutron
            .list_floating_ips()
            .await
            .context(ResourceKind::FloatingIp, "*")?;
        Ok(self
            .ctx
            .page(ips.iter().map(normalize::floating_ip).collect(), &page))
    }

    /// Allocated from the first external network
    async fn create_floating_ip(&self) -> Result<FloatingIp> {
        let pool = external_networks(&self.ctx)
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| {
                CloudError::InvalidConfiguration(
                    "no external network to allocate a floating IP from".to_string(),
                )
            })?;

        info!(kind = %ResourceKind::FloatingIp, network = %pool.id, "Allocating floating IP");
        let created = self
            .ctx
            .clients
            .neutron
            .create_floating_ip(&pool.id)
            .await
            .context(ResourceKind::FloatingIp, &pool.id)?;
        Ok(normalize::floating_ip(&created))
    }
}

#[derive(Clone)]
pub struct OpenStackSubnetService {
    ctx: OpenStackContext,
}

impl OpenStackSubnetService {
    pub fn new(ctx: OpenStackContext) -> Self {
        Self { ctx }
    }

    async fn all(&self, network_id: Option<&str>) -> Result<Vec<Subnet>> {
        debug!(kind = %ResourceKind::Subnet, network_id, "Listing subnets");
        let subnets = self
            .ctx
            .clients
            .neutron
            .list_subnets(network_id)
            .await
            .context(ResourceKind::Subnet, network_id.unwrap_or("*"))?;
        Ok(subnets.iter().map(normalize::subnet).collect())
    }
}

#[async_trait]
impl SubnetService for OpenStackSubnetService {
    async fn get(&self, id: &str) -> Result<Option<Subnet>> {
        Ok(self
            .all(None)
            .await?
            .into_iter()
            .find(|s| s.id.as_str() == id))
    }

    async fn list(&self, page: PageRequest) -> Result<PagedResult<Subnet>> {
        Ok(self.ctx.page(self.all(None).await?, &page))
    }

    async fn list_in(&self, network_id: &str, page: PageRequest) -> Result<PagedResult<Subnet>> {
        Ok(self.ctx.page(self.all(Some(network_id)).await?, &page))
    }

    async fn find(&self, name: &str, page: PageRequest) -> Result<PagedResult<Subnet>> {
        let matched = NameFilter::exact(name).retain(self.all(None).await?);
        Ok(self.ctx.page(matched, &page))
    }

    /// Neutron subnets span the whole region; `zone` is not used
    async fn create(
        &self,
        network_id: &str,
        cidr_block: &str,
        name: Option<&str>,
        zone: Option<&str>,
    ) -> Result<Subnet> {
        if let Some(name) = name {
            validate_resource_name(ResourceKind::Subnet, name)?;
        }
        if let Some(zone) = zone {
            debug!(kind = %ResourceKind::Subnet, zone, "Subnet zone is not used");
        }

        let request = SubnetCreate {
            name: name.map(str::to_string),
            network_id: network_id.to_string(),
            cidr: cidr_block.to_string(),
            ip_version: 4,
        };
        info!(kind = %ResourceKind::Subnet, network = network_id, cidr = cidr_block, "Creating subnet");
        let created = self
            .ctx
            .clients
            .neutron
            .create_subnet(&request)
            .await
            .context(ResourceKind::Subnet, name.unwrap_or(cidr_block))?;
        Ok(normalize::subnet(&created))
    }

    async fn delete(&self, id: &str) -> Result<bool> {
        info!(kind = %ResourceKind::Subnet, id, "Deleting subnet");
        self.ctx
            .clients
            .neutron
            .delete_subnet(id)
            .await
            .absent(ResourceKind::Subnet, id)?;
        Ok(self.get(id).await?.is_none())
    }

    /// Find the default subnet by name, otherwise build the default
    /// network, subnet and router and route it to the external network
    async fn get_or_create_default(&self, zone: Option<&str>) -> Result<Subnet> {
        let existing = self.find(DEFAULT_SUBNET_NAME, PageRequest::new()).await?;
        if let Some(subnet) = existing.into_iter().next() {
            return Ok(subnet);
        }

        info!(kind = %ResourceKind::Subnet, zone, "Provisioning the default subnet");
        let networks = OpenStackNetworkService::new(self.ctx.clone());
        let network = match networks
            .find(DEFAULT_NETWORK_NAME, PageRequest::new())
            .await?
            .into_iter()
            .next()
        {
            Some(network) => network,
            None => {
                networks
                    .create(Some(DEFAULT_NETWORK_NAME), Some(DEFAULT_NETWORK_CIDR))
                    .await?
            }
        };

        let subnet = self
            .create(&network.id, DEFAULT_SUBNET_CIDR, Some(DEFAULT_SUBNET_NAME), None)
            .await?;

        let routers = OpenStackRouterService::new(self.ctx.clone());
        let router = match routers
            .find(DEFAULT_ROUTER_NAME, PageRequest::new())
            .await?
            .into_iter()
            .next()
        {
            Some(router) => router,
            None => routers.create(Some(DEFAULT_ROUTER_NAME), &network.id).await?,
        };
        routers.attach_subnet(&router.id, subnet.id.as_str()).await?;

        let gateways = OpenStackGatewayService::new(self.ctx.clone());
        match gateways
            .get_or_create_inet_gateway(&network.id, Some(DEFAULT_GATEWAY_NAME))
            .await
        {
            Ok(gateway) => routers.attach_gateway(&router.id, &gateway).await?,
            Err(e) if e.is_not_found() => {
                warn!(router = %router.id, "No external network, default subnet is not routed: {}", e);
            }
            Err(e) => return Err(e),
        }

        Ok(subnet)
    }
}

#[derive(Clone)]
pub struct OpenStackRouterService {
    ctx: OpenStackContext,
}

impl OpenStackRouterService {
    pub fn new(ctx: OpenStackContext) -> Self {
        Self { ctx }
    }

    async fn all(&self) -> Result<Vec<Router>> {
        debug!(kind = %ResourceKind::Router, "Listing routers");
        let neutron = &self.ctx.clients.neutron;
        let routers = neutron
            .list_routers()
            .await
            .context(ResourceKind::Router, "*")?;
        let interfaces = neutron
            .list_ports(&PortQuery {
                device_id: None,
                device_owner: Some(ROUTER_INTERFACE_OWNER.to_string()),
            })
            .await
            .context(ResourceKind::NetworkInterface, ROUTER_INTERFACE_OWNER)?;
        Ok(routers
            .iter()
            .map(|r| normalize::router(r, &interfaces))
            .collect())
    }
}

#[async_trait]
impl RouterService for OpenStackRouterService {
    async fn get(&self, id: &str) -> Result<Option<Router>> {
        Ok(self.all().await?.into_iter().find(|r| r.id == id))
    }

    async fn list(&self, page: PageRequest) -> Result<PagedResult<Router>> {
        Ok(self.ctx.page(self.all().await?, &page))
    }

    async fn find(&self, name: &str, page: PageRequest) -> Result<PagedResult<Router>> {
        let matched = NameFilter::exact(name).retain(self.all().await?);
        Ok(self.ctx.page(matched, &page))
    }

    /// Neutron routers are not tied to a network; `network_id` is only logged
    async fn create(&self, name: Option<&str>, network_id: &str) -> Result<Router> {
        if let Some(name) = name {
            validate_resource_name(ResourceKind::Router, name)?;
        }

        let request = RouterCreate {
            name: name.map(str::to_string),
        };
        info!(kind = %ResourceKind::Router, name, network = network_id, "Creating router");
        let created = self
            .ctx
            .clients
            .neutron
            .create_router(&request)
            .await
            .context(ResourceKind::Router, name.unwrap_or(network_id))?;
        Ok(normalize::router(&created, &[]))
    }

    async fn delete(&self, id: &str) -> Result<bool> {
        info!(kind = %ResourceKind::Router, id, "Deleting router");
        self.ctx
            .clients
            .neutron
            .delete_router(id)
            .await
            .absent(ResourceKind::Router, id)
    }

    async fn attach_subnet(&self, router_id: &str, subnet_id: &str) -> Result<()> {
        info!(kind = %ResourceKind::Router, id = router_id, subnet = subnet_id, "Attaching subnet");
        self.ctx
            .clients
            .neutron
            .add_router_interface(router_id, subnet_id)
            .await
            .context(ResourceKind::Router, router_id)
    }

    async fn detach_subnet(&self, router_id: &str, subnet_id: &str) -> Result<()> {
        info!(kind = %ResourceKind::Router, id = router_id, subnet = subnet_id, "Detaching subnet");
        self.ctx
            .clients
            .neutron
            .remove_router_interface(router_id, subnet_id)
            .await
            .context(ResourceKind::Router, router_id)
    }

    async fn attach_gateway(&self, router_id: &str, gateway: &InternetGateway) -> Result<()> {
        let network_id = gateway.network_id.as_deref().unwrap_or(&gateway.id);
        info!(kind = %ResourceKind::Router, id = router_id, network = network_id, "Setting gateway");
        self.ctx
            .clients
            .neutron
            .set_router_gateway(router_id, Some(network_id))
            .await
            .context(ResourceKind::Router, router_id)?;
        Ok(())
    }

    async fn detach_gateway(&self, router_id: &str) -> Result<()> {
        info!(kind = %ResourceKind::Router, id = router_id, "Clearing gateway");
        self.ctx
            .clients
            .neutron
            .set_router_gateway(router_id, None)
            .await
            .context(ResourceKind::Router, router_id)?;
        Ok(())
    }
}

/// Internet gateways are the cloud's external networks. They belong to
/// the operator and are never created or deleted here.
#[derive(Clone)]
pub struct OpenStackGatewayService {
    ctx: OpenStackContext,
}

impl OpenStackGatewayService {
    pub fn new(ctx: OpenStackContext) -> Self {
        Self { ctx }
    }
}

#[async_trait]
impl GatewayService for OpenStackGatewayService {
    async fn get_or_create_inet_gateway(
        &self,
        network_id: &str,
        name: Option<&str>,
    ) -> Result<InternetGateway> {
        if let Some(name) = name {
            validate_resource_name(ResourceKind::Gateway, name)?;
        }
        debug!(kind = %ResourceKind::Gateway, network = network_id, "Looking up external network");

        external_networks(&self.ctx)
            .await?
            .first()
            .map(normalize::gateway)
            .ok_or_else(|| CloudError::not_found(ResourceKind::Gateway, "external network"))
    }

    async fn list(&self, page: PageRequest) -> Result<PagedResult<InternetGateway>> {
        let gateways = external_networks(&self.ctx)
            .await?
            .iter()
            .map(normalize::gateway)
            .collect();
        Ok(self.ctx.page(gateways, &page))
    }

    async fn delete(&self, id: &str) -> Result<bool> {
        debug!(kind = %ResourceKind::Gateway, id, "External networks are left in place");
        Ok(true)
    }
}
