use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};
use stratus_cloud_azure::models::{
    Container, Disk, DiskSnapshot, Image, KeyPairEntity, Location, NetworkInterface,
    NetworkSecurityGroup, PublicIpAddress, SecurityRule, Tags, VirtualMachine, VirtualMachineSize,
    VirtualNetwork, VirtualNetworkSubnet,
};
use stratus_cloud_azure::normalize::NAME_TAG;
use stratus_cloud_azure::{AzureClient, AzureCloudProvider, AzureConfig, AzureError, Result};

pub const SUBSCRIPTION: &str = "sub-1";
pub const RESOURCE_GROUP: &str = "stratus-rg";
pub const REGION: &str = "eastus";

pub fn config() -> AzureConfig {
    AzureConfig::new(SUBSCRIPTION, RESOURCE_GROUP, REGION)
}

pub fn provider(fake: &Arc<FakeAzure>) -> AzureCloudProvider {
    // Captured per test; shown with --nocapture
    let _ = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .with_test_writer()
        .try_init();
    AzureCloudProvider::new(fake.clone(), config())
}

fn arm_id(resource_type: &str, name: &str) -> String {
    format!(
        "/subscriptions/{}/resourceGroups/{}/providers/{}/{}",
        SUBSCRIPTION, RESOURCE_GROUP, resource_type, name
    )
}

fn last_segment(id: &str) -> &str {
    id.rsplit('/').next().unwrap_or(id)
}

fn not_found(what: &str) -> AzureError {
    AzureError::NotFound(what.to_string())
}

#[derive(Default)]
struct State {
    vms: BTreeMap<String, VirtualMachine>,
    sizes: Vec<VirtualMachineSize>,
    images: BTreeMap<String, Image>,
    disks: BTreeMap<String, Disk>,
    snapshots: BTreeMap<String, DiskSnapshot>,
    networks: BTreeMap<String, VirtualNetwork>,
    subnets: BTreeMap<(String, String), VirtualNetworkSubnet>,
    nics: BTreeMap<String, NetworkInterface>,
    public_ips: BTreeMap<String, PublicIpAddress>,
    groups: BTreeMap<String, NetworkSecurityGroup>,
    containers: BTreeMap<String, Container>,
    key_rows: BTreeMap<(String, String), KeyPairEntity>,
}

/// In-memory ARM and storage account that records every mutating call
#[derive(Default)]
pub struct FakeAzure {
    state: Mutex<State>,
    mutations: Mutex<Vec<String>>,
}

#[allow(dead_code)]
impl FakeAzure {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    fn record(&self, call: String) {
        self.mutations.lock().unwrap().push(call);
    }

    pub fn mutations(&self) -> Vec<String> {
        self.mutations.lock().unwrap().clone()
    }

    pub fn mutation_count(&self) -> usize {
        self.mutations.lock().unwrap().len()
    }

    pub fn count_mutations(&self, prefix: &str) -> usize {
        self.mutations
            .lock()
            .unwrap()
            .iter()
            .filter(|m| m.starts_with(prefix))
            .count()
    }

    pub fn has_disk(&self, name: &str) -> bool {
        self.state.lock().unwrap().disks.contains_key(name)
    }

    pub fn disk(&self, name: &str) -> Option<Disk> {
        self.state.lock().unwrap().disks.get(name).cloned()
    }

    pub fn has_nic(&self, name: &str) -> bool {
        self.state.lock().unwrap().nics.contains_key(name)
    }

    pub fn vm(&self, name: &str) -> Option<VirtualMachine> {
        self.state.lock().unwrap().vms.get(name).cloned()
    }

    pub fn network_count(&self) -> usize {
        self.state.lock().unwrap().networks.len()
    }

    pub fn seed_image(&self, name: &str) {
        let image = Image {
            id: arm_id("Microsoft.Compute/images", name),
            name: name.to_string(),
            location: REGION.to_string(),
            ..Default::default()
        };
        self.state
            .lock()
            .unwrap()
            .images
            .insert(name.to_string(), image);
    }

    pub fn seed_size(&self, name: &str, cores: u32, memory_mb: u64) {
        self.state.lock().unwrap().sizes.push(VirtualMachineSize {
            name: name.to_string(),
            number_of_cores: Some(cores),
            memory_in_mb: Some(memory_mb),
            os_disk_size_in_mb: Some(1_047_552),
            resource_disk_size_in_mb: Some(4096),
            max_data_disk_count: Some(4),
        });
    }

    /// A network and one subnet, bypassing the mutation log
    pub fn seed_subnet(&self, network: &str, location: &str, subnet: &str, cidr: &str) {
        let mut state = self.state.lock().unwrap();
        let network_id = arm_id("Microsoft.Network/virtualNetworks", network);
        state.networks.insert(
            network.to_string(),
            VirtualNetwork {
                id: network_id.clone(),
                name: network.to_string(),
                location: location.to_string(),
                ..Default::default()
            },
        );
        let mut native = VirtualNetworkSubnet {
            id: format!("{}/subnets/{}", network_id, subnet),
            name: subnet.to_string(),
            ..Default::default()
        };
        native.properties.address_prefix = Some(cidr.to_string());
        state
            .subnets
            .insert((network.to_string(), subnet.to_string()), native);
    }

    pub fn seed_security_group(&self, name: &str, rules: Vec<SecurityRule>) {
        let mut group = NetworkSecurityGroup {
            id: arm_id("Microsoft.Network/networkSecurityGroups", name),
            name: name.to_string(),
            location: REGION.to_string(),
            ..Default::default()
        };
        group.tags.insert(NAME_TAG.to_string(), name.to_string());
        group.properties.security_rules = rules;
        self.state
            .lock()
            .unwrap()
            .groups
            .insert(name.to_string(), group);
    }
}

#[async_trait]
impl AzureClient for FakeAzure {
    async fn get_vm(&self, name: &str) -> Result<VirtualMachine> {
        self.vm(name).ok_or_else(|| not_found(name))
    }

    async fn list_vms(&self) -> Result<Vec<VirtualMachine>> {
        Ok(self.state.lock().unwrap().vms.values().cloned().collect())
    }

    async fn create_vm(&self, name: &str, vm: &VirtualMachine) -> Result<VirtualMachine> {
        self.record(format!("create_vm {}", name));
        let mut state = self.state.lock().unwrap();
        let mut created = vm.clone();
        created.id = arm_id("Microsoft.Compute/virtualMachines", name);
        created.name = name.to_string();
        created.properties.provisioning_state = Some("Succeeded".to_string());

        // Azure creates the OS disk from the image alongside the VM
        if let Some(storage) = &created.properties.storage_profile {
            if let Some(os_disk) = &storage.os_disk {
                let mut disk = Disk {
                    id: arm_id("Microsoft.Compute/disks", &os_disk.name),
                    name: os_disk.name.clone(),
                    location: created.location.clone(),
                    managed_by: Some(created.id.clone()),
                    ..Default::default()
                };
                disk.properties.disk_size_gb = os_disk.disk_size_gb.or(Some(30));
                disk.properties.creation_data.create_option = "FromImage".to_string();
                state.disks.insert(os_disk.name.clone(), disk);
            }
            for data_disk in &storage.data_disks {
                let disk = state
                    .disks
                    .get_mut(&data_disk.name)
                    .ok_or_else(|| not_found(&data_disk.name))?;
                disk.managed_by = Some(created.id.clone());
                disk.properties.disk_state = Some("Attached".to_string());
            }
        }

        state.vms.insert(name.to_string(), created.clone());
        Ok(created)
    }

    async fn delete_vm(&self, name: &str) -> Result<()> {
        self.record(format!("delete_vm {}", name));
        let mut state = self.state.lock().unwrap();
        let vm = state.vms.remove(name).ok_or_else(|| not_found(name))?;
        for disk in state.disks.values_mut() {
            if disk.managed_by.as_deref() == Some(vm.id.as_str()) {
                disk.managed_by = None;
                disk.properties.disk_state = Some("Unattached".to_string());
            }
        }
        Ok(())
    }

    async fn list_vm_sizes(&self, _location: &str) -> Result<Vec<VirtualMachineSize>> {
        Ok(self.state.lock().unwrap().sizes.clone())
    }

    async fn get_image(&self, name: &str) -> Result<Image> {
        self.state
            .lock()
            .unwrap()
            .images
            .get(name)
            .cloned()
            .ok_or_else(|| not_found(name))
    }

    async fn list_images(&self) -> Result<Vec<Image>> {
        Ok(self.state.lock().unwrap().images.values().cloned().collect())
    }

    async fn list_locations(&self) -> Result<Vec<Location>> {
        Ok(["eastus", "westeurope"]
            .iter()
            .map(|name| Location {
                id: format!("/subscriptions/{}/locations/{}", SUBSCRIPTION, name),
                name: name.to_string(),
                display_name: None,
            })
            .collect())
    }

    async fn get_disk(&self, name: &str) -> Result<Disk> {
        self.disk(name).ok_or_else(|| not_found(name))
    }

    async fn list_disks(&self) -> Result<Vec<Disk>> {
        Ok(self.state.lock().unwrap().disks.values().cloned().collect())
    }

    async fn create_disk(&self, name: &str, disk: &Disk) -> Result<Disk> {
        self.record(format!("create_disk {}", name));
        let mut state = self.state.lock().unwrap();
        let mut created = disk.clone();
        created.id = arm_id("Microsoft.Compute/disks", name);
        created.name = name.to_string();
        created.properties.provisioning_state = Some("Succeeded".to_string());
        created.properties.disk_state = Some("Unattached".to_string());

        if let Some(source) = &disk.properties.creation_data.source_resource_id {
            let source_name = last_segment(source);
            let source_size = state
                .snapshots
                .get(source_name)
                .and_then(|s| s.properties.disk_size_gb)
                .or_else(|| {
                    state
                        .disks
                        .get(source_name)
                        .and_then(|d| d.properties.disk_size_gb)
                })
                .ok_or_else(|| not_found(source_name))?;
            let requested = disk.properties.disk_size_gb.unwrap_or(0);
            created.properties.disk_size_gb = Some(requested.max(source_size));
        }

        state.disks.insert(name.to_string(), created.clone());
        Ok(created)
    }

    async fn update_disk_tags(&self, name: &str, tags: &Tags) -> Result<Disk> {
        self.record(format!("update_disk_tags {}", name));
        let mut state = self.state.lock().unwrap();
        let disk = state.disks.get_mut(name).ok_or_else(|| not_found(name))?;
        disk.tags = tags.clone();
        Ok(disk.clone())
    }

    async fn delete_disk(&self, name: &str) -> Result<()> {
        self.record(format!("delete_disk {}", name));
        self.state
            .lock()
            .unwrap()
            .disks
            .remove(name)
            .map(|_| ())
            .ok_or_else(|| not_found(name))
    }

    async fn get_snapshot(&self, name: &str) -> Result<DiskSnapshot> {
        self.state
            .lock()
            .unwrap()
            .snapshots
            .get(name)
            .cloned()
            .ok_or_else(|| not_found(name))
    }

    async fn list_snapshots(&self) -> Result<Vec<DiskSnapshot>> {
        Ok(self
            .state
            .lock()
            .unwrap()
            .snapshots
            .values()
            .cloned()
            .collect())
    }

    async fn create_snapshot(&self, name: &str, snapshot: &DiskSnapshot) -> Result<DiskSnapshot> {
        self.record(format!("create_snapshot {}", name));
        let mut state = self.state.lock().unwrap();
        let source = snapshot
            .properties
            .creation_data
            .source_resource_id
            .as_deref()
            .map(last_segment)
            .unwrap_or_default();
        let source_size = state
            .disks
            .get(source)
            .and_then(|d| d.properties.disk_size_gb)
            .ok_or_else(|| not_found(source))?;

        let mut created = snapshot.clone();
        created.id = arm_id("Microsoft.Compute/snapshots", name);
        created.name = name.to_string();
        created.properties.disk_size_gb = Some(source_size);
        created.properties.provisioning_state = Some("Succeeded".to_string());
        state.snapshots.insert(name.to_string(), created.clone());
        Ok(created)
    }

    async fn delete_snapshot(&self, name: &str) -> Result<()> {
        self.record(format!("delete_snapshot {}", name));
        self.state
            .lock()
            .unwrap()
            .snapshots
            .remove(name)
            .map(|_| ())
            .ok_or_else(|| not_found(name))
    }

    async fn get_network(&self, name: &str) -> Result<VirtualNetwork> {
        self.state
            .lock()
            .unwrap()
            .networks
            .get(name)
            .cloned()
            .ok_or_else(|| not_found(name))
    }

    async fn list_networks(&self) -> Result<Vec<VirtualNetwork>> {
        Ok(self.state.lock().unwrap().networks.values().cloned().collect())
    }

    async fn create_network(&self, name: &str, network: &VirtualNetwork) -> Result<VirtualNetwork> {
        self.record(format!("create_network {}", name));
        let mut created = network.clone();
        created.id = arm_id("Microsoft.Network/virtualNetworks", name);
        created.name = name.to_string();
        created.properties.provisioning_state = Some("Succeeded".to_string());
        self.state
            .lock()
            .unwrap()
            .networks
            .insert(name.to_string(), created.clone());
        Ok(created)
    }

    async fn delete_network(&self, name: &str) -> Result<()> {
        self.record(format!("delete_network {}", name));
        let mut state = self.state.lock().unwrap();
        state.networks.remove(name).ok_or_else(|| not_found(name))?;
        state.subnets.retain(|(network, _), _| network != name);
        Ok(())
    }

    async fn get_subnet(&self, network: &str, subnet: &str) -> Result<VirtualNetworkSubnet> {
        self.state
            .lock()
            .unwrap()
            .subnets
            .get(&(network.to_string(), subnet.to_string()))
            .cloned()
            .ok_or_else(|| not_found(subnet))
    }

    async fn list_subnets(&self, network: &str) -> Result<Vec<VirtualNetworkSubnet>> {
        let state = self.state.lock().unwrap();
        if !state.networks.contains_key(network) {
            return Err(not_found(network));
        }
        Ok(state
            .subnets
            .iter()
            .filter(|((n, _), _)| n == network)
            .map(|(_, s)| s.clone())
            .collect())
    }

    async fn create_subnet(
        &self,
        network: &str,
        name: &str,
        subnet: &VirtualNetworkSubnet,
    ) -> Result<VirtualNetworkSubnet> {
        self.record(format!("create_subnet {}/{}", network, name));
        let mut state = self.state.lock().unwrap();
        let network_id = state
            .networks
            .get(network)
            .map(|n| n.id.clone())
            .ok_or_else(|| not_found(network))?;
        let mut created = subnet.clone();
        created.id = format!("{}/subnets/{}", network_id, name);
        created.name = name.to_string();
        created.properties.provisioning_state = Some("Succeeded".to_string());
        state
            .subnets
            .insert((network.to_string(), name.to_string()), created.clone());
        Ok(created)
    }

    async fn delete_subnet(&self, network: &str, subnet: &str) -> Result<()> {
        self.record(format!("delete_subnet {}/{}", network, subnet));
        self.state
            .lock()
            .unwrap()
            .subnets
            .remove(&(network.to_string(), subnet.to_string()))
            .map(|_| ())
            .ok_or_else(|| not_found(subnet))
    }

    async fn get_nic(&self, name: &str) -> Result<NetworkInterface> {
        self.state
            .lock()
            .unwrap()
            .nics
            .get(name)
            .cloned()
            .ok_or_else(|| not_found(name))
    }

    async fn create_nic(&self, name: &str, nic: &NetworkInterface) -> Result<NetworkInterface> {
        self.record(format!("create_nic {}", name));
        let mut state = self.state.lock().unwrap();
        let mut created = nic.clone();
        created.id = arm_id("Microsoft.Network/networkInterfaces", name);
        created.name = name.to_string();

        // Dynamic allocation hands out the next host address
        let host = state.nics.len() + 4;
        for config in &mut created.properties.ip_configurations {
            config
                .properties
                .private_ip_address
                .get_or_insert_with(|| format!("10.1.0.{}", host));
        }
        state.nics.insert(name.to_string(), created.clone());
        Ok(created)
    }

    async fn delete_nic(&self, name: &str) -> Result<()> {
        self.record(format!("delete_nic {}", name));
        self.state
            .lock()
            .unwrap()
            .nics
            .remove(name)
            .map(|_| ())
            .ok_or_else(|| not_found(name))
    }

    async fn list_public_ips(&self) -> Result<Vec<PublicIpAddress>> {
        Ok(self
            .state
            .lock()
            .unwrap()
            .public_ips
            .values()
            .cloned()
            .collect())
    }

    async fn create_public_ip(&self, name: &str, ip: &PublicIpAddress) -> Result<PublicIpAddress> {
        self.record(format!("create_public_ip {}", name));
        let mut state = self.state.lock().unwrap();
        let mut created = ip.clone();
        created.id = arm_id("Microsoft.Network/publicIPAddresses", name);
        created.name = name.to_string();
        created.properties.ip_address = Some(format!("203.0.113.{}", state.public_ips.len() + 10));
        state.public_ips.insert(name.to_string(), created.clone());
        Ok(created)
    }

    async fn get_security_group(&self, name: &str) -> Result<NetworkSecurityGroup> {
        self.state
            .lock()
            .unwrap()
            .groups
            .get(name)
            .cloned()
            .ok_or_else(|| not_found(name))
    }

    async fn list_security_groups(&self) -> Result<Vec<NetworkSecurityGroup>> {
        Ok(self.state.lock().unwrap().groups.values().cloned().collect())
    }

    async fn create_security_group(
        &self,
        name: &str,
        group: &NetworkSecurityGroup,
    ) -> Result<NetworkSecurityGroup> {
        self.record(format!("create_security_group {}", name));
        let mut created = group.clone();
        created.id = arm_id("Microsoft.Network/networkSecurityGroups", name);
        created.name = name.to_string();
        self.state
            .lock()
            .unwrap()
            .groups
            .insert(name.to_string(), created.clone());
        Ok(created)
    }

    async fn delete_security_group(&self, name: &str) -> Result<()> {
        self.record(format!("delete_security_group {}", name));
        self.state
            .lock()
            .unwrap()
            .groups
            .remove(name)
            .map(|_| ())
            .ok_or_else(|| not_found(name))
    }

    async fn create_security_rule(&self, group: &str, rule: &SecurityRule) -> Result<SecurityRule> {
        self.record(format!("create_security_rule {}/{}", group, rule.name));
        let mut state = self.state.lock().unwrap();
        let native = state.groups.get_mut(group).ok_or_else(|| not_found(group))?;
        native
            .properties
            .security_rules
            .retain(|r| r.name != rule.name);
        native.properties.security_rules.push(rule.clone());
        Ok(rule.clone())
    }

    async fn get_container(&self, name: &str) -> Result<Container> {
        self.state
            .lock()
            .unwrap()
            .containers
            .get(name)
            .cloned()
            .ok_or_else(|| not_found(name))
    }

    async fn list_containers(&self, prefix: Option<&str>) -> Result<Vec<Container>> {
        Ok(self
            .state
            .lock()
            .unwrap()
            .containers
            .values()
            .filter(|c| prefix.is_none_or(|p| c.name.starts_with(p)))
            .cloned()
            .collect())
    }

    async fn create_container(&self, name: &str) -> Result<Container> {
        self.record(format!("create_container {}", name));
        let mut state = self.state.lock().unwrap();
        if state.containers.contains_key(name) {
            return Err(AzureError::Conflict(name.to_string()));
        }
        let container = Container {
            name: name.to_string(),
            last_modified: None,
        };
        state.containers.insert(name.to_string(), container.clone());
        Ok(container)
    }

    async fn delete_container(&self, name: &str) -> Result<()> {
        self.record(format!("delete_container {}", name));
        self.state
            .lock()
            .unwrap()
            .containers
            .remove(name)
            .map(|_| ())
            .ok_or_else(|| not_found(name))
    }

    async fn list_key_pairs(&self, partition: &str) -> Result<Vec<KeyPairEntity>> {
        Ok(self
            .state
            .lock()
            .unwrap()
            .key_rows
            .values()
            .filter(|e| e.partition_key == partition)
            .cloned()
            .collect())
    }

    async fn insert_key_pair(&self, entity: &KeyPairEntity) -> Result<KeyPairEntity> {
        self.record(format!("insert_key_pair {}", entity.name));
        let key = (entity.partition_key.clone(), entity.row_key.clone());
        let mut state = self.state.lock().unwrap();
        if state.key_rows.contains_key(&key) {
            return Err(AzureError::Conflict(entity.row_key.clone()));
        }
        state.key_rows.insert(key, entity.clone());
        Ok(entity.clone())
    }

    async fn delete_key_pair(&self, partition: &str, row_key: &str) -> Result<()> {
        self.record(format!("delete_key_pair {}", row_key));
        self.state
            .lock()
            .unwrap()
            .key_rows
            .remove(&(partition.to_string(), row_key.to_string()))
            .map(|_| ())
            .ok_or_else(|| not_found(row_key))
    }
}
