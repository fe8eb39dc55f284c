//! Virtual networks, subnets, public IPs, routers and gateways

use super::{AzureContext, name_tags, unique_name};
use crate::config::{
    DEFAULT_GATEWAY_NAME, DEFAULT_NETWORK_CIDR, DEFAULT_NETWORK_NAME, DEFAULT_SUBNET_CIDR,
    DEFAULT_SUBNET_NAME,
};
use crate::error::{AzureResultExt, PROVIDER};
use crate::models::{
    AddressSpace, PublicIpAddress, PublicIpAddressProperties, SubnetProperties, VirtualNetwork,
    VirtualNetworkProperties, VirtualNetworkSubnet,
};
use crate::normalize;
use async_trait::async_trait;
use stratus_cloud::{
    CloudError, FloatingIp, GatewayService, InternetGateway, NameFilter, Network, NetworkService,
    PageRequest, PagedResult, ResourceKind, Result, Router, RouterService, Subnet, SubnetId,
    SubnetService,
};
use tracing::{debug, info};

#[derive(Clone)]
pub struct AzureNetworkService {
    ctx: AzureContext,
}

impl AzureNetworkService {
    pub fn new(ctx: AzureContext) -> Self {
        Self { ctx }
    }

    async fn all(&self) -> Result<Vec<Network>> {
        debug!(kind = %ResourceKind::Network, "Listing virtual networks");
        let networks = self
            .ctx
            .client
            .list_networks()
            .await
            .context(ResourceKind::Network, "*")?;
        Ok(networks.iter().map(normalize::network).collect())
    }

    /// PUT a network under an exact ARM name
    async fn put(&self, arm_name: &str, display_name: &str, cidr_block: &str) -> Result<Network> {
        let network = VirtualNetwork {
            location: self.ctx.config.region_name.clone(),
            tags: name_tags(display_name, None),
            properties: VirtualNetworkProperties {
                address_space: AddressSpace {
                    address_prefixes: vec![cidr_block.to_string()],
                },
                ..Default::default()
            },
            ..Default::default()
        };

        info!(kind = %ResourceKind::Network, name = arm_name, cidr = cidr_block, "Creating virtual network");
        let created = self
            .ctx
            .client
            .create_network(arm_name, &network)
            .await
            .context(ResourceKind::Network, arm_name)?;
        Ok(normalize::network(&created))
    }
}

#[async_trait]
impl NetworkService for AzureNetworkService {
    async fn get(&self, id: &str) -> Result<Option<Network>> {
        debug!(kind = %ResourceKind::Network, id, "Getting virtual network");
        let network = self
            .ctx
            .client
            .get_network(id)
            .await
            .optional(ResourceKind::Network, id)?;
        Ok(network.as_ref().map(normalize::network))
    }

    async fn list(&self, page: PageRequest) -> Result<PagedResult<Network>> {
        Ok(self.ctx.page(self.all().await?, &page))
    }

    async fn find(&self, name: &str, page: PageRequest) -> Result<PagedResult<Network>> {
        let matched = NameFilter::glob(name).retain(self.all().await?);
        Ok(self.ctx.page(matched, &page))
    }

    /// Unnamed networks take the library-default name
    async fn create(&self, name: Option<&str>, cidr_block: Option<&str>) -> Result<Network> {
        let cidr_block = cidr_block.unwrap_or(DEFAULT_NETWORK_CIDR);
        match name {
            Some(name) => self.put(&unique_name(name), name, cidr_block).await,
            None => {
                self.put(DEFAULT_NETWORK_NAME, DEFAULT_NETWORK_NAME, cidr_block)
                    .await
            }
        }
    }

    async fn delete(&self, id: &str) -> Result<bool> {
        info!(kind = %ResourceKind::Network, id, "Deleting virtual network");
        self.ctx
            .client
            .delete_network(id)
            .await
            .absent(ResourceKind::Network, id)
    }

    async fn floating_ips(&self, page: PageRequest) -> Result<PagedResult<FloatingIp>> {
        debug!(kind = %ResourceKind::FloatingIp, "Listing public IPs");
        let ips = self
            .ctx
            .client
            .list_public_ips()
            .await
            .context(ResourceKind::FloatingIp, "*")?;
        Ok(self
            .ctx
            .page(ips.iter().map(normalize::floating_ip).collect(), &page))
    }

    async fn create_floating_ip(&self) -> Result<FloatingIp> {
        let name = unique_name("public-ip");
        let ip = PublicIpAddress {
            location: self.ctx.config.region_name.clone(),
            properties: PublicIpAddressProperties {
                public_ip_allocation_method: "Static".to_string(),
                ..Default::default()
            },
            ..Default::default()
        };

        info!(kind = %ResourceKind::FloatingIp, name = %name, "Creating public IP");
        let created = self
            .ctx
            .client
            .create_public_ip(&name, &ip)
            .await
            .context(ResourceKind::FloatingIp, &name)?;
        Ok(normalize::floating_ip(&created))
    }
}

/// Subnets, addressed by composite `<network>|$|<subnet>` ids
#[derive(Clone)]
pub struct AzureSubnetService {
    ctx: AzureContext,
}

impl AzureSubnetService {
    pub fn new(ctx: AzureContext) -> Self {
        Self { ctx }
    }

    /// Location of the parent network, which is the subnet's zone
    async fn network_location(&self, network: &str) -> Result<Option<String>> {
        let network = self
            .ctx
            .client
            .get_network(network)
            .await
            .optional(ResourceKind::Network, network)?;
        Ok(network.map(|n| n.location).filter(|l| !l.is_empty()))
    }

    async fn subnets_of(&self, network: &VirtualNetwork) -> Result<Vec<Subnet>> {
        let location = Some(network.location.as_str()).filter(|l| !l.is_empty());
        let subnets = self
            .ctx
            .client
            .list_subnets(&network.name)
            .await
            .context(ResourceKind::Subnet, &network.name)?;
        Ok(subnets
            .iter()
            .map(|s| normalize::subnet(&network.name, location, s))
            .collect())
    }

    async fn all(&self) -> Result<Vec<Subnet>> {
        debug!(kind = %ResourceKind::Subnet, "Listing subnets of every network");
        let networks = self
            .ctx
            .client
            .list_networks()
            .await
            .context(ResourceKind::Network, "*")?;
        let mut all = Vec::new();
        for network in &networks {
            all.extend(self.subnets_of(network).await?);
        }
        Ok(all)
    }

    async fn put(
        &self,
        network: &str,
        name: &str,
        cidr_block: &str,
        zone: Option<String>,
    ) -> Result<Subnet> {
        let subnet = VirtualNetworkSubnet {
            properties: SubnetProperties {
                address_prefix: Some(cidr_block.to_string()),
                ..Default::default()
            },
            ..Default::default()
        };

        let id = SubnetId::composite(network, name);
        info!(kind = %ResourceKind::Subnet, id = %id, cidr = cidr_block, "Creating subnet");
        let created = self
            .ctx
            .client
            .create_subnet(network, name, &subnet)
            .await
            .context(ResourceKind::Subnet, id.as_str())?;
        Ok(normalize::subnet(network, zone.as_deref(), &created))
    }
}

#[async_trait]
impl SubnetService for AzureSubnetService {
    async fn get(&self, id: &str) -> Result<Option<Subnet>> {
        let id = SubnetId::parse(id);
        let Some(network) = id.network() else {
            debug!(kind = %ResourceKind::Subnet, id = %id, "Subnet id has no network component");
            return Ok(None);
        };

        debug!(kind = %ResourceKind::Subnet, id = %id, "Getting subnet");
        let subnet = self
            .ctx
            .client
            .get_subnet(network, id.subnet())
            .await
            .optional(ResourceKind::Subnet, id.as_str())?;
        let Some(subnet) = subnet else {
            return Ok(None);
        };

        let location = self.network_location(network).await?;
        Ok(Some(normalize::subnet(network, location.as_deref(), &subnet)))
    }

    async fn list(&self, page: PageRequest) -> Result<PagedResult<Subnet>> {
        Ok(self.ctx.page(self.all().await?, &page))
    }

    async fn list_in(&self, network_id: &str, page: PageRequest) -> Result<PagedResult<Subnet>> {
        let network = self
            .ctx
            .client
            .get_network(network_id)
            .await
            .optional(ResourceKind::Network, network_id)?;
        let subnets = match network {
            Some(network) => self.subnets_of(&network).await?,
            None => Vec::new(),
        };
        Ok(self.ctx.page(subnets, &page))
    }

    async fn find(&self, name: &str, page: PageRequest) -> Result<PagedResult<Subnet>> {
        let matched = NameFilter::glob(name).retain(self.all().await?);
        Ok(self.ctx.page(matched, &page))
    }

    async fn create(
        &self,
        network_id: &str,
        cidr_block: &str,
        name: Option<&str>,
        _zone: Option<&str>,
    ) -> Result<Subnet> {
        let location = self.network_location(network_id).await?;
        self.put(
            network_id,
            name.unwrap_or(DEFAULT_SUBNET_NAME),
            cidr_block,
            location,
        )
        .await
    }

    async fn delete(&self, id: &str) -> Result<bool> {
        let id = SubnetId::parse(id);
        let Some(network) = id.network() else {
            // Unresolvable without a network, so it cannot exist
            return Ok(true);
        };
        info!(kind = %ResourceKind::Subnet, id = %id, "Deleting subnet");
        self.ctx
            .client
            .delete_subnet(network, id.subnet())
            .await
            .absent(ResourceKind::Subnet, id.as_str())
    }

    /// ARM PUTs are create-or-update, so a concurrent caller racing through
    /// the same steps converges on the same network and subnet.
    async fn get_or_create_default(&self, _zone: Option<&str>) -> Result<Subnet> {
        let default_id = SubnetId::composite(DEFAULT_NETWORK_NAME, DEFAULT_SUBNET_NAME);
        if let Some(subnet) = self.get(default_id.as_str()).await? {
            return Ok(subnet);
        }

        let location = match self.network_location(DEFAULT_NETWORK_NAME).await? {
            Some(location) => Some(location),
            None => {
                let network = AzureNetworkService::new(self.ctx.clone())
                    .create(None, Some(DEFAULT_NETWORK_CIDR))
                    .await?;
                network.location
            }
        };

        self.put(
            DEFAULT_NETWORK_NAME,
            DEFAULT_SUBNET_NAME,
            DEFAULT_SUBNET_CIDR,
            location,
        )
        .await
    }
}

/// Azure has no router resource; routing between subnets of a virtual
/// network is implicit.
#[derive(Clone)]
pub struct AzureRouterService;

impl AzureRouterService {
    pub fn new() -> Self {
        Self
    }
}

impl Default for AzureRouterService {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl RouterService for AzureRouterService {
    async fn get(&self, _id: &str) -> Result<Option<Router>> {
        Ok(None)
    }

    async fn list(&self, _page: PageRequest) -> Result<PagedResult<Router>> {
        Ok(PagedResult::empty())
    }

    async fn find(&self, _name: &str, _page: PageRequest) -> Result<PagedResult<Router>> {
        Ok(PagedResult::empty())
    }

    async fn create(&self, _name: Option<&str>, _network_id: &str) -> Result<Router> {
        Err(CloudError::unsupported(PROVIDER, "routers"))
    }

    async fn delete(&self, _id: &str) -> Result<bool> {
        Ok(true)
    }

    async fn attach_subnet(&self, _router_id: &str, _subnet_id: &str) -> Result<()> {
        Err(CloudError::unsupported(PROVIDER, "router subnet attachment"))
    }

    async fn detach_subnet(&self, _router_id: &str, _subnet_id: &str) -> Result<()> {
        Err(CloudError::unsupported(PROVIDER, "router subnet attachment"))
    }

    async fn attach_gateway(&self, _router_id: &str, _gateway: &InternetGateway) -> Result<()> {
        Err(CloudError::unsupported(PROVIDER, "router gateway attachment"))
    }

    async fn detach_gateway(&self, _router_id: &str) -> Result<()> {
        Err(CloudError::unsupported(PROVIDER, "router gateway attachment"))
    }
}

/// Virtual networks reach the internet without a gateway resource. The
/// gateway reported here stands for that implicit route.
#[derive(Clone)]
pub struct AzureGatewayService {
    ctx: AzureContext,
}

impl AzureGatewayService {
    pub fn new(ctx: AzureContext) -> Self {
        Self { ctx }
    }
}

#[async_trait]
impl GatewayService for AzureGatewayService {
    async fn get_or_create_inet_gateway(
        &self,
        network_id: &str,
        name: Option<&str>,
    ) -> Result<InternetGateway> {
        // The network has to exist for its implicit gateway to
        self.ctx
            .client
            .get_network(network_id)
            .await
            .context(ResourceKind::Network, network_id)?;

        Ok(InternetGateway {
            id: DEFAULT_GATEWAY_NAME.to_string(),
            name: name.unwrap_or(DEFAULT_GATEWAY_NAME).to_string(),
            network_id: Some(network_id.to_string()),
        })
    }

    async fn list(&self, _page: PageRequest) -> Result<PagedResult<InternetGateway>> {
        Ok(PagedResult::empty())
    }

    async fn delete(&self, _id: &str) -> Result<bool> {
        Ok(true)
    }
}
