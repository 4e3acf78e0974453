use async_trait::async_trait;
use serde_json::{json, Map, Value};
use tracing::info;

use super::{changed_int, changed_str, found, Resource};
use crate::client::{
    ApiError, BackupSchedule, CreateServerParams, EditNetworkAdapterParams, EditServerParams, GlesysClient,
    ServerDetails, User,
};
use crate::error::ProviderError;
use crate::schema::{Attribute, AttributeFlags, AttributeType, Block, NestedBlock, Schema};
use crate::state::ResourceData;
use crate::wait::{wait_for_state, WaitCondition};

/// `glesys_server`: a KVM or VMware virtual server.
pub struct ServerResource;

#[async_trait]
impl Resource for ServerResource {
    fn name(&self) -> &'static str {
        "glesys_server"
    }

    fn schema(&self) -> Schema {
        Schema::with_id()
            .with_description("A GleSYS virtual server.")
            .with_attribute(
                "bandwidth",
                Attribute::required_int64().with_description("Network adapter bandwidth in Mbit/s."),
            )
            .with_attribute("cpu", Attribute::required_int64().with_description("CPU core count."))
            .with_attribute("memory", Attribute::required_int64().with_description("RAM in MB."))
            .with_attribute("storage", Attribute::required_int64().with_description("Disk size in GB."))
            .with_attribute("hostname", Attribute::required_string().with_ignore_case())
            .with_attribute("datacenter", Attribute::required_string().with_force_new())
            .with_attribute(
                "platform",
                Attribute::optional_string()
                    .with_force_new()
                    .with_description("`KVM` or `VMware`."),
            )
            .with_attribute("template", Attribute::optional_string().with_force_new())
            .with_attribute("description", Attribute::optional_string())
            .with_attribute("campaigncode", Attribute::optional_string())
            .with_attribute("cloudconfig", Attribute::optional_string())
            .with_attribute("cloudconfigparams", Attribute::string_map(AttributeFlags::optional()))
            .with_attribute(
                "ipv4_address",
                Attribute::optional_computed_string().with_description("Set `none` to skip IPv4 allocation."),
            )
            .with_attribute(
                "ipv6_address",
                Attribute::optional_computed_string().with_description("Set `none` to skip IPv6 allocation."),
            )
            .with_attribute(
                "password",
                Attribute::optional_string()
                    .sensitive()
                    .with_description("Root password, VMware only."),
            )
            .with_attribute("publickey", Attribute::optional_string())
            .with_attribute("islocked", Attribute::computed_bool())
            .with_attribute("isrunning", Attribute::computed_bool())
            .with_attribute(
                "extra_disks",
                Attribute::string_list(AttributeFlags::computed())
                    .with_description("Ids of additional disks, managed through `glesys_server_disk`."),
            )
            .with_attribute(
                "primary_networkadapter_network",
                Attribute::optional_computed_string().with_description("Network of the primary adapter (VMware)."),
            )
            .with_attribute(
                "network_adapters",
                Attribute::new(
                    AttributeType::list(AttributeType::object([
                        ("id", AttributeType::String),
                        ("adaptertype", AttributeType::String),
                        ("bandwidth", AttributeType::Int64),
                        ("name", AttributeType::String),
                        ("networkid", AttributeType::String),
                    ])),
                    AttributeFlags::computed(),
                ),
            )
            .with_block(
                "user",
                NestedBlock::set(
                    Block::new()
                        .with_attribute("username", Attribute::required_string())
                        .with_attribute("password", Attribute::optional_string().sensitive())
                        .with_attribute("publickeys", Attribute::string_list(AttributeFlags::required())),
                ),
            )
            .with_block(
                "backups_schedule",
                NestedBlock::set(
                    Block::new()
                        .with_attribute(
                            "frequency",
                            Attribute::required_string().with_allowed_values(["daily", "weekly"]),
                        )
                        .with_attribute("retention", Attribute::required_int64())
                        .with_description("KVM backup schedules."),
                ),
            )
    }

    async fn create(&self, client: &GlesysClient, d: &mut ResourceData) -> Result<(), ProviderError> {
        let params = CreateServerParams {
            hostname: d.get_str("hostname").to_string(),
            datacenter: d.get_opt_str("datacenter"),
            platform: d.get_opt_str("platform"),
            template: d.get_opt_str("template"),
            cpu: d.get_int("cpu"),
            memory: d.get_int("memory"),
            storage: d.get_int("storage"),
            bandwidth: d.get_int("bandwidth"),
            ipv4: d.get_opt_str("ipv4_address"),
            ipv6: d.get_opt_str("ipv6_address"),
            description: d.get_opt_str("description"),
            password: d.get_opt_str("password"),
            publickey: d.get_opt_str("publickey"),
            campaigncode: d.get_opt_str("campaigncode"),
            cloudconfig: d.get_opt_str("cloudconfig"),
            cloudconfigparams: d.get_string_map("cloudconfigparams"),
            users: users(d),
            backup: backup_schedules(d),
        }
        .with_defaults();

        let server = client.servers().create(&params).await?;
        d.set_id(server.serverid);
        info!(id = d.id(), hostname = %params.hostname, "server created");

        let id = d.id().to_string();
        wait_for_server(client, &id, "isrunning", "true", "false").await?;
        wait_for_server(client, &id, "islocked", "false", "true").await?;

        if d.get_opt_str("primary_networkadapter_network").is_some() {
            set_primary_adapter_network(client, d).await?;
        }

        self.read(client, d).await
    }

    async fn read(&self, client: &GlesysClient, d: &mut ResourceData) -> Result<(), ProviderError> {
        let result = client.servers().details(d.id()).await;
        let Some(server) = found(d, result)? else {
            return Ok(());
        };

        // bandwidth is not reported reliably for KVM
        if server.platform != "KVM" {
            d.set("bandwidth", server.bandwidth);
        }
        d.set("cpu", server.cpu);
        d.set("memory", server.memory);
        d.set("storage", server.storage);
        d.set("datacenter", server.datacenter.as_str());
        d.set("description", server.description.as_str());
        d.set("hostname", server.hostname.as_str());
        d.set("platform", server.platform.as_str());
        d.set("islocked", server.islocked);
        d.set("isrunning", server.isrunning);
        if let Some(addr) = server.address(4) {
            d.set("ipv4_address", addr);
        }
        if let Some(addr) = server.address(6) {
            d.set("ipv6_address", addr);
        }
        let template = server.template_for(d.get_str("template"));
        d.set("template", template);

        let disks: Vec<Value> = server
            .additionaldisks
            .iter()
            .map(|disk| Value::String(disk.id.clone()))
            .collect();
        d.set("extra_disks", disks);

        let schedules: Vec<Value> = server
            .backup
            .schedules
            .iter()
            .map(|s| json!({ "frequency": s.frequency, "retention": s.numberofimagestokeep }))
            .collect();
        d.set("backups_schedule", schedules);

        let adapters = client.servers().network_adapters(d.id()).await?;
        let mut listed = Vec::with_capacity(adapters.len());
        for adapter in &adapters {
            if adapter.is_primary() {
                d.set("primary_networkadapter_network", adapter.networkid.as_str());
            }
            listed.push(json!({
                "id": adapter.id,
                "adaptertype": adapter.adaptertype,
                "bandwidth": adapter.bandwidth,
                "name": adapter.name,
                "networkid": adapter.networkid,
            }));
        }
        d.set("network_adapters", listed);

        Ok(())
    }

    async fn update(&self, client: &GlesysClient, d: &mut ResourceData) -> Result<(), ProviderError> {
        let params = EditServerParams {
            hostname: changed_str(d, "hostname"),
            description: changed_str(d, "description"),
            cpu: changed_int(d, "cpu"),
            memory: changed_int(d, "memory"),
            storage: changed_int(d, "storage"),
            bandwidth: changed_int(d, "bandwidth"),
            backup: d.has_change("backups_schedule").then(|| backup_schedules(d)),
            ..EditServerParams::new(d.id())
        };

        if !params.is_empty() {
            client.servers().edit(&params).await?;
        }

        if d.has_change("primary_networkadapter_network") {
            set_primary_adapter_network(client, d).await?;
        }

        self.read(client, d).await
    }

    async fn delete(&self, client: &GlesysClient, d: &mut ResourceData) -> Result<(), ProviderError> {
        let id = d.id().to_string();
        wait_for_server(client, &id, "islocked", "false", "true").await?;
        client.servers().destroy(&id, false).await?;
        d.clear_id();
        Ok(())
    }
}

/// Wait until the server's `attribute` reads `target`.
async fn wait_for_server(
    client: &GlesysClient,
    id: &str,
    attribute: &str,
    target: &str,
    pending: &str,
) -> Result<ServerDetails, ProviderError> {
    let cond = WaitCondition::server(attribute, target, &[pending]);
    let server = wait_for_state(id, &cond, || server_state(client, id, attribute)).await?;
    Ok(server)
}

async fn server_state(
    client: &GlesysClient,
    id: &str,
    attribute: &str,
) -> Result<Option<(ServerDetails, String)>, ApiError> {
    let server = client.servers().details(id).await?;
    let observed = match attribute {
        "islocked" => server.islocked,
        "isrunning" => server.isrunning,
        other => {
            return Err(ApiError::InvalidRequest(format!(
                "server attribute '{}' cannot be waited on",
                other
            )))
        },
    };
    Ok(Some((server, observed.to_string())))
}

/// Point the primary adapter at the configured network.
async fn set_primary_adapter_network(client: &GlesysClient, d: &ResourceData) -> Result<(), ProviderError> {
    let adapters = client.servers().network_adapters(d.id()).await?;
    let primary = adapters.iter().find(|a| a.is_primary()).ok_or_else(|| {
        ProviderError::FailedPrecondition(format!("server {} has no primary network adapter", d.id()))
    })?;

    info!(id = d.id(), adapter = %primary.id, "setting primary adapter network");
    let params = EditNetworkAdapterParams {
        networkadapterid: primary.id.clone(),
        networkid: Some(d.get_str("primary_networkadapter_network").to_string()),
        bandwidth: None,
    };
    client.network_adapters().edit(&params).await?;
    Ok(())
}

fn users(d: &ResourceData) -> Vec<User> {
    d.get_blocks("user")
        .iter()
        .map(|block| User {
            username: block_str(block, "username").unwrap_or_default(),
            password: block_str(block, "password").filter(|p| !p.is_empty()),
            publickeys: block
                .get("publickeys")
                .and_then(Value::as_array)
                .map(|keys| keys.iter().filter_map(Value::as_str).map(str::to_string).collect())
                .unwrap_or_default(),
        })
        .collect()
}

fn backup_schedules(d: &ResourceData) -> Vec<BackupSchedule> {
    d.get_blocks("backups_schedule")
        .iter()
        .map(|block| BackupSchedule {
            frequency: block_str(block, "frequency").unwrap_or_default(),
            numberofimagestokeep: block.get("retention").and_then(Value::as_i64).unwrap_or_default(),
        })
        .collect()
}

fn block_str(block: &Map<String, Value>, key: &str) -> Option<String> {
    block.get(key).and_then(Value::as_str).map(str::to_string)
}
