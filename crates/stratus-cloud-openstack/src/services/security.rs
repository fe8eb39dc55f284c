//! Nova key pairs and Neutron security groups

use super::OpenStackContext;
use crate::error::OpenStackResultExt;
use crate::models::SecurityGroupCreate;
use crate::normalize;
use async_trait::async_trait;
use stratus_cloud::{
    CloudError, KeyPair, KeyPairService, NameFilter, PageRequest, PagedResult, ResourceKind,
    Result, SecurityGroup, SecurityGroupRule, SecurityGroupService, validate_resource_name,
};
use tracing::{debug, info};

#[derive(Clone)]
pub struct OpenStackKeyPairService {
    ctx: OpenStackContext,
}

impl OpenStackKeyPairService {
    pub fn new(ctx: OpenStackContext) -> Self {
        Self { ctx }
    }

    async fn all(&self) -> Result<Vec<KeyPair>> {
        debug!(kind = %ResourceKind::KeyPair, "Listing key pairs");
        let keypairs = self
            .ctx
            .clients
            .nova
            .list_keypairs()
            .await
            .context(ResourceKind::KeyPair, "*")?;
        Ok(keypairs.iter().map(normalize::key_pair).collect())
    }
}

#[async_trait]
impl KeyPairService for OpenStackKeyPairService {
    async fn get(&self, id: &str) -> Result<Option<KeyPair>> {
        debug!(kind = %ResourceKind::KeyPair, id, "Getting key pair");
        let keypair = self
            .ctx
            .clients
            .nova
            .get_keypair(id)
            .await
            .optional(ResourceKind::KeyPair, id)?;
        Ok(keypair.as_ref().map(normalize::key_pair))
    }

    async fn list(&self, page: PageRequest) -> Result<PagedResult<KeyPair>> {
        Ok(self.ctx.page(self.all().await?, &page))
    }

    async fn find(&self, name: &str, page: PageRequest) -> Result<PagedResult<KeyPair>> {
        let matched = NameFilter::exact(name).retain(self.all().await?);
        Ok(self.ctx.page(matched, &page))
    }

    async fn create(&self, name: &str) -> Result<KeyPair> {
        validate_resource_name(ResourceKind::KeyPair, name)?;

        if self.get(name).await?.is_some() {
            return Err(CloudError::Conflict {
                kind: ResourceKind::KeyPair,
                name: name.to_string(),
            });
        }

        info!(kind = %ResourceKind::KeyPair, name, "Creating key pair");
        let created = self
            .ctx
            .clients
            .nova
            .create_keypair(name)
            .await
            .context(ResourceKind::KeyPair, name)?;
        Ok(normalize::key_pair(&created))
    }

    async fn delete(&self, id: &str) -> Result<bool> {
        info!(kind = %ResourceKind::KeyPair, id, "Deleting key pair");
        self.ctx
            .clients
            .nova
            .delete_keypair(id)
            .await
            .absent(ResourceKind::KeyPair, id)
    }
}

#[derive(Clone)]
pub struct OpenStackSecurityGroupService {
    ctx: OpenStackContext,
}

impl OpenStackSecurityGroupService {
    pub fn new(ctx: OpenStackContext) -> Self {
        Self { ctx }
    }

    async fn all(&self) -> Result<Vec<SecurityGroup>> {
        debug!(kind = %ResourceKind::SecurityGroup, "Listing security groups");
        let groups = self
            .ctx
            .clients
            .neutron
            .list_security_groups()
            .await
            .context(ResourceKind::SecurityGroup, "*")?;
        Ok(groups.iter().map(normalize::security_group).collect())
    }
}

#[async_trait]
impl SecurityGroupService for OpenStackSecurityGroupService {
    async fn get(&self, id: &str) -> Result<Option<SecurityGroup>> {
        debug!(kind = %ResourceKind::SecurityGroup, id, "Getting security group");
        let group = self
            .ctx
            .clients
            .neutron
            .get_security_group(id)
            .await
            .optional(ResourceKind::SecurityGroup, id)?;
        Ok(group.as_ref().map(normalize::security_group))
    }

    async fn list(&self, page: PageRequest) -> Result<PagedResult<SecurityGroup>> {
        Ok(self.ctx.page(self.all().await?, &page))
    }

    async fn find(&self, name: &str, page: PageRequest) -> Result<PagedResult<SecurityGroup>> {
        let matched = NameFilter::exact(name).retain(self.all().await?);
        Ok(self.ctx.page(matched, &page))
    }

    /// Neutron groups are project-wide; `network_id` is not used
    async fn create(
        &self,
        name: &str,
        description: &str,
        network_id: Option<&str>,
    ) -> Result<SecurityGroup> {
        validate_resource_name(ResourceKind::SecurityGroup, name)?;
        if let Some(network_id) = network_id {
            debug!(kind = %ResourceKind::SecurityGroup, name, network_id, "Ignoring network scope");
        }

        let request = SecurityGroupCreate {
            name: name.to_string(),
            description: description.to_string(),
        };
        info!(kind = %ResourceKind::SecurityGroup, name, "Creating security group");
        let created = self
            .ctx
            .clients
            .neutron
            .create_security_group(&request)
            .await
            .context(ResourceKind::SecurityGroup, name)?;
        Ok(normalize::security_group(&created))
    }

    async fn delete(&self, id: &str) -> Result<bool> {
        if self.get(id).await?.is_none() {
            return Ok(true);
        }

        info!(kind = %ResourceKind::SecurityGroup, id, "Deleting security group");
        self.ctx
            .clients
            .neutron
            .delete_security_group(id)
            .await
            .absent(ResourceKind::SecurityGroup, id)
    }

    async fn add_rule(&self, group_id: &str, rule: SecurityGroupRule) -> Result<SecurityGroupRule> {
        let native = normalize::native_security_rule(group_id, &rule);
        info!(
            kind = %ResourceKind::SecurityGroup,
            id = group_id,
            protocol = %rule.protocol,
            "Adding security group rule"
        );
        let created = self
            .ctx
            .clients
            .neutron
            .create_security_group_rule(&native)
            .await
            .context(ResourceKind::SecurityGroup, group_id)?;
        Ok(normalize::security_rule(&created))
    }
}
