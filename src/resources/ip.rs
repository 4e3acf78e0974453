use async_trait::async_trait;
use serde_json::json;
use tracing::info;

use super::{found, Resource};
use crate::client::{FreeIpsParams, GlesysClient};
use crate::error::ProviderError;
use crate::schema::{Attribute, AttributeFlags, AttributeType, Schema};
use crate::state::ResourceData;

/// `glesys_ip`: an address reserved to the account. The id is the address.
pub struct IpResource;

#[async_trait]
impl Resource for IpResource {
    fn name(&self) -> &'static str {
        "glesys_ip"
    }

    fn schema(&self) -> Schema {
        Schema::with_id()
            .with_attribute(
                "address",
                Attribute::optional_computed_string()
                    .with_force_new()
                    .with_description("Address to reserve; a free one is picked when unset."),
            )
            .with_attribute("datacenter", Attribute::optional_computed_string().with_force_new())
            .with_attribute("platform", Attribute::optional_computed_string().with_force_new())
            .with_attribute("version", Attribute::optional_computed_int64().with_force_new())
            .with_attribute(
                "ptr",
                Attribute::optional_computed_string().with_description("Reverse record. Empty resets it."),
            )
            .with_attribute("broadcast", Attribute::computed_string())
            .with_attribute("gateway", Attribute::computed_string())
            .with_attribute("netmask", Attribute::computed_string())
            .with_attribute("locked_to_account", Attribute::computed_string())
            .with_attribute("reserved", Attribute::computed_string())
            .with_attribute("server_id", Attribute::computed_string())
            .with_attribute("name_servers", Attribute::string_list(AttributeFlags::computed()))
            .with_attribute("platforms", Attribute::string_list(AttributeFlags::computed()))
            .with_attribute(
                "cost",
                Attribute::new(
                    AttributeType::list(AttributeType::object([
                        ("amount", AttributeType::Float64),
                        ("currency", AttributeType::String),
                        ("time_period", AttributeType::String),
                    ])),
                    AttributeFlags::computed(),
                ),
            )
    }

    async fn create(&self, client: &GlesysClient, d: &mut ResourceData) -> Result<(), ProviderError> {
        let address = match d.get_opt_str("address") {
            Some(address) => address,
            None => {
                let params = FreeIpsParams {
                    ipversion: d.get_int("version").unwrap_or(4),
                    datacenter: d.get_str("datacenter").to_string(),
                    platform: d.get_str("platform").to_string(),
                };
                let free = client.ips().list_free(&params).await?;
                free.into_iter().next().ok_or_else(|| {
                    ProviderError::ResourceExhausted(format!(
                        "no free IPv{} address in {} on {}",
                        params.ipversion, params.datacenter, params.platform
                    ))
                })?
            },
        };

        let ip = client.ips().take(&address).await?;
        info!(address = %ip.ipaddress, "address reserved");

        if let Some(ptr) = d.get_opt_str("ptr") {
            client.ips().set_ptr(&address, &ptr).await?;
        }

        d.set_id(ip.ipaddress);
        self.read(client, d).await
    }

    async fn read(&self, client: &GlesysClient, d: &mut ResourceData) -> Result<(), ProviderError> {
        let result = client.ips().details(d.id()).await;
        let Some(ip) = found(d, result)? else {
            return Ok(());
        };

        d.set("address", ip.ipaddress);
        d.set("broadcast", ip.broadcast);
        d.set("gateway", ip.gateway);
        d.set("netmask", ip.netmask);
        d.set("datacenter", ip.datacenter);
        d.set("platform", ip.platform);
        d.set("platforms", ip.platforms);
        d.set("name_servers", ip.nameservers);
        d.set("version", ip.ipversion);
        d.set("ptr", ip.ptr);
        d.set("locked_to_account", ip.lockedtoaccount);
        d.set("reserved", ip.reserved);
        d.set("server_id", ip.serverid);

        let cost = ip.cost.unwrap_or_default();
        d.set(
            "cost",
            json!([{ "amount": cost.amount, "currency": cost.currency, "time_period": cost.timeperiod }]),
        );
        Ok(())
    }

    async fn update(&self, client: &GlesysClient, d: &mut ResourceData) -> Result<(), ProviderError> {
        if d.has_change("ptr") {
            match d.get_opt_str("ptr") {
                Some(ptr) => client.ips().set_ptr(d.id(), &ptr).await?,
                None => client.ips().reset_ptr(d.id()).await?,
            };
        }
        self.read(client, d).await
    }

    async fn delete(&self, client: &GlesysClient, d: &mut ResourceData) -> Result<(), ProviderError> {
        client.ips().release(d.id()).await?;
        d.clear_id();
        Ok(())
    }
}
