//! Key pairs and network security groups

use super::{AzureContext, name_tags};
use crate::config::KEY_PAIR_PARTITION_KEY;
use crate::error::{AzureResultExt, PROVIDER};
use crate::models::{KeyPairEntity, NetworkSecurityGroup, NetworkSecurityGroupProperties};
use crate::normalize;
use async_trait::async_trait;
use ssh_key::{Algorithm, LineEnding, PrivateKey};
use stratus_cloud::{
    CloudError, KeyPair, KeyPairService, NameFilter, PageRequest, PagedResult, ResourceKind,
    Result, SecurityGroup, SecurityGroupRule, SecurityGroupService,
};
use tracing::{debug, info};
use uuid::Uuid;

/// First priority handed to rules added through the service
const FIRST_RULE_PRIORITY: u32 = 100;

/// Freshly generated OpenSSH key material
struct GeneratedKey {
    private: String,
    public: String,
}

fn generate_key(name: &str) -> Result<GeneratedKey> {
    let failure = |e: ssh_key::Error| CloudError::ProviderFailure {
        provider: PROVIDER.to_string(),
        kind: ResourceKind::KeyPair,
        target: name.to_string(),
        message: format!("key generation failed: {}", e),
    };

    let private = PrivateKey::random(&mut ssh_key::rand_core::OsRng, Algorithm::Ed25519)
        .map_err(failure)?;
    let public = private.public_key().to_openssh().map_err(failure)?;
    let private = private.to_openssh(LineEnding::LF).map_err(failure)?;

    Ok(GeneratedKey {
        private: private.to_string(),
        public,
    })
}

/// Key pairs stored as rows of the storage-account key table
#[derive(Clone)]
pub struct AzureKeyPairService {
    ctx: AzureContext,
}

impl AzureKeyPairService {
    pub fn new(ctx: AzureContext) -> Self {
        Self { ctx }
    }

    async fn entities(&self) -> Result<Vec<KeyPairEntity>> {
        debug!(kind = %ResourceKind::KeyPair, "Listing key table");
        self.ctx
            .client
            .list_key_pairs(KEY_PAIR_PARTITION_KEY)
            .await
            .context(ResourceKind::KeyPair, KEY_PAIR_PARTITION_KEY)
    }

    async fn entity(&self, name: &str) -> Result<Option<KeyPairEntity>> {
        Ok(self.entities().await?.into_iter().find(|e| e.name == name))
    }
}

#[async_trait]
impl KeyPairService for AzureKeyPairService {
    /// Key pairs are addressed by name
    async fn get(&self, id: &str) -> Result<Option<KeyPair>> {
        Ok(self.entity(id).await?.as_ref().map(normalize::key_pair))
    }

    async fn list(&self, page: PageRequest) -> Result<PagedResult<KeyPair>> {
        let pairs = self.entities().await?.iter().map(normalize::key_pair).collect();
        Ok(self.ctx.page(pairs, &page))
    }

    async fn find(&self, name: &str, page: PageRequest) -> Result<PagedResult<KeyPair>> {
        let found = self.get(name).await?.into_iter().collect();
        Ok(self.ctx.page(found, &page))
    }

    async fn create(&self, name: &str) -> Result<KeyPair> {
        if self.entity(name).await?.is_some() {
            return Err(CloudError::Conflict {
                kind: ResourceKind::KeyPair,
                name: name.to_string(),
            });
        }

        let key = generate_key(name)?;
        let entity = KeyPairEntity {
            partition_key: KEY_PAIR_PARTITION_KEY.to_string(),
            row_key: Uuid::new_v4().to_string(),
            name: name.to_string(),
            key: key.public,
        };

        info!(kind = %ResourceKind::KeyPair, name, "Creating key pair");
        let stored = self
            .ctx
            .client
            .insert_key_pair(&entity)
            .await
            .context(ResourceKind::KeyPair, name)?;

        let mut pair = normalize::key_pair(&stored);
        pair.material = Some(key.private);
        Ok(pair)
    }

    async fn delete(&self, id: &str) -> Result<bool> {
        let Some(entity) = self.entity(id).await? else {
            debug!(kind = %ResourceKind::KeyPair, id, "Key pair already absent");
            return Ok(true);
        };
        info!(kind = %ResourceKind::KeyPair, id, "Deleting key pair");
        self.ctx
            .client
            .delete_key_pair(&entity.partition_key, &entity.row_key)
            .await
            .absent(ResourceKind::KeyPair, id)
    }
}

/// Network security groups. Azure attaches one group per NIC.
#[derive(Clone)]
pub struct AzureSecurityGroupService {
    ctx: AzureContext,
}

impl AzureSecurityGroupService {
    pub fn new(ctx: AzureContext) -> Self {
        Self { ctx }
    }

    async fn all(&self) -> Result<Vec<SecurityGroup>> {
        debug!(kind = %ResourceKind::SecurityGroup, "Listing security groups");
        let groups = self
            .ctx
            .client
            .list_security_groups()
            .await
            .context(ResourceKind::SecurityGroup, "*")?;
        Ok(groups.iter().map(normalize::security_group).collect())
    }
}

#[async_trait]
impl SecurityGroupService for AzureSecurityGroupService {
    async fn get(&self, id: &str) -> Result<Option<SecurityGroup>> {
        debug!(kind = %ResourceKind::SecurityGroup, id, "Getting security group");
        let group = self
            .ctx
            .client
            .get_security_group(id)
            .await
            .optional(ResourceKind::SecurityGroup, id)?;
        Ok(group.as_ref().map(normalize::security_group))
    }

    async fn list(&self, page: PageRequest) -> Result<PagedResult<SecurityGroup>> {
        Ok(self.ctx.page(self.all().await?, &page))
    }

    async fn find(&self, name: &str, page: PageRequest) -> Result<PagedResult<SecurityGroup>> {
        let matched = NameFilter::glob(name).retain(self.all().await?);
        Ok(self.ctx.page(matched, &page))
    }

    /// `network_id` is ignored; Azure binds groups to NICs and subnets
    async fn create(
        &self,
        name: &str,
        description: &str,
        _network_id: Option<&str>,
    ) -> Result<SecurityGroup> {
        let group = NetworkSecurityGroup {
            location: self.ctx.config.region_name.clone(),
            tags: name_tags(name, Some(description)),
            properties: NetworkSecurityGroupProperties::default(),
            ..Default::default()
        };

        info!(kind = %ResourceKind::SecurityGroup, name, "Creating security group");
        let created = self
            .ctx
            .client
            .create_security_group(name, &group)
            .await
            .context(ResourceKind::SecurityGroup, name)?;
        Ok(normalize::security_group(&created))
    }

    async fn delete(&self, id: &str) -> Result<bool> {
        info!(kind = %ResourceKind::SecurityGroup, id, "Deleting security group");
        self.ctx
            .client
            .delete_security_group(id)
            .await
            .absent(ResourceKind::SecurityGroup, id)
    }

    async fn add_rule(&self, group_id: &str, rule: SecurityGroupRule) -> Result<SecurityGroupRule> {
        let group = self
            .ctx
            .client
            .get_security_group(group_id)
            .await
            .context(ResourceKind::SecurityGroup, group_id)?;

        // Priorities must be unique within a group
        let priority = group
            .properties
            .security_rules
            .iter()
            .map(|r| r.properties.priority + 1)
            .max()
            .unwrap_or(FIRST_RULE_PRIORITY)
            .max(FIRST_RULE_PRIORITY);
        let native = normalize::native_security_rule(&rule, &format!("rule-{}", priority), priority);

        info!(kind = %ResourceKind::SecurityGroup, group = group_id, priority, "Adding security rule");
        let created = self
            .ctx
            .client
            .create_security_rule(group_id, &native)
            .await
            .context(ResourceKind::SecurityGroup, group_id)?;
        Ok(normalize::security_group_rule(&created).unwrap_or(rule))
    }
}
