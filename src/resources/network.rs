use async_trait::async_trait;

use super::{changed_int, changed_str, found, Resource};
use crate::client::{CreateNetworkAdapterParams, EditNetworkAdapterParams, GlesysClient};
use crate::error::ProviderError;
use crate::schema::{Attribute, Schema};
use crate::state::ResourceData;

/// `glesys_network`: a private VLAN for VMware servers.
pub struct NetworkResource;

#[async_trait]
impl Resource for NetworkResource {
    fn name(&self) -> &'static str {
        "glesys_network"
    }

    fn schema(&self) -> Schema {
        Schema::with_id()
            .with_attribute("datacenter", Attribute::required_string().with_force_new())
            .with_attribute("description", Attribute::required_string())
            .with_attribute("public", Attribute::computed_string())
    }

    async fn create(&self, client: &GlesysClient, d: &mut ResourceData) -> Result<(), ProviderError> {
        let network = client
            .networks()
            .create(d.get_str("datacenter"), d.get_str("description"))
            .await?;
        d.set_id(network.id);
        self.read(client, d).await
    }

    async fn read(&self, client: &GlesysClient, d: &mut ResourceData) -> Result<(), ProviderError> {
        let result = client.networks().details(d.id()).await;
        if let Some(network) = found(d, result)? {
            d.set("datacenter", network.datacenter);
            d.set("description", network.description);
            d.set("public", network.public);
        }
        Ok(())
    }

    async fn update(&self, client: &GlesysClient, d: &mut ResourceData) -> Result<(), ProviderError> {
        if let Some(description) = changed_str(d, "description") {
            client.networks().edit(d.id(), &description).await?;
        }
        self.read(client, d).await
    }

    async fn delete(&self, client: &GlesysClient, d: &mut ResourceData) -> Result<(), ProviderError> {
        client.networks().delete(d.id()).await?;
        d.clear_id();
        Ok(())
    }
}

/// `glesys_networkadapter`: an extra adapter on a VMware server.
pub struct NetworkAdapterResource;

#[async_trait]
impl Resource for NetworkAdapterResource {
    fn name(&self) -> &'static str {
        "glesys_networkadapter"
    }

    fn schema(&self) -> Schema {
        Schema::with_id()
            .with_attribute("serverid", Attribute::required_string().with_force_new())
            .with_attribute(
                "adaptertype",
                Attribute::optional_computed_string()
                    .with_force_new()
                    .with_description("`VMXNET 3` or `E1000`."),
            )
            .with_attribute("bandwidth", Attribute::optional_computed_int64())
            .with_attribute(
                "networkid",
                Attribute::optional_computed_string().with_description("Network to connect, `internet` by default."),
            )
            .with_attribute("name", Attribute::computed_string())
    }

    async fn create(&self, client: &GlesysClient, d: &mut ResourceData) -> Result<(), ProviderError> {
        let params = CreateNetworkAdapterParams {
            serverid: d.get_str("serverid").to_string(),
            networkid: d.get_opt_str("networkid"),
            adaptertype: d.get_opt_str("adaptertype"),
            bandwidth: d.get_int("bandwidth"),
        };
        let adapter = client.network_adapters().create(&params).await?;
        d.set_id(adapter.id);
        self.read(client, d).await
    }

    async fn read(&self, client: &GlesysClient, d: &mut ResourceData) -> Result<(), ProviderError> {
        let result = client.network_adapters().details(d.id()).await;
        if let Some(adapter) = found(d, result)? {
            d.set("adaptertype", adapter.adaptertype);
            d.set("bandwidth", adapter.bandwidth);
            d.set("name", adapter.name);
            d.set("networkid", adapter.networkid);
            d.set("serverid", adapter.serverid);
        }
        Ok(())
    }

    async fn update(&self, client: &GlesysClient, d: &mut ResourceData) -> Result<(), ProviderError> {
        let params = EditNetworkAdapterParams {
            networkadapterid: d.id().to_string(),
            networkid: changed_str(d, "networkid"),
            bandwidth: changed_int(d, "bandwidth"),
        };
        if params.networkid.is_some() || params.bandwidth.is_some() {
            client.network_adapters().edit(&params).await?;
        }
        self.read(client, d).await
    }

    async fn delete(&self, client: &GlesysClient, d: &mut ResourceData) -> Result<(), ProviderError> {
        client.network_adapters().delete(d.id()).await?;
        d.clear_id();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resources::test_support::client;
    use serde_json::json;

    #[tokio::test]
    async fn test_network_lifecycle_requests() {
        let (mock, client) = client();
        mock.respond("network/create", json!({"network": {"networkid": "vl123"}}));
        mock.respond(
            "network/details",
            json!({"network": {"networkid": "vl123", "datacenter": "Falkenberg", "description": "lan", "public": "no"}}),
        );

        let mut d = ResourceData::new(json!({"datacenter": "Falkenberg", "description": "lan"}));
        NetworkResource.create(&client, &mut d).await.unwrap();
        assert_eq!(d.id(), "vl123");
        assert_eq!(d.get_str("public"), "no");
        assert_eq!(
            mock.requests_to("network/create"),
            vec![json!({"datacenter": "Falkenberg", "description": "lan"})]
        );
    }

    #[tokio::test]
    async fn test_network_update_without_change_skips_edit() {
        let (mock, client) = client();
        mock.respond("network/details", json!({"network": {"networkid": "vl123", "description": "lan"}}));

        let state = json!({"id": "vl123", "datacenter": "Falkenberg", "description": "lan"});
        let mut d = ResourceData::with_prior(state.clone(), state);
        NetworkResource.update(&client, &mut d).await.unwrap();
        assert!(mock.requests_to("network/edit").is_empty());
    }

    #[tokio::test]
    async fn test_adapter_update_sends_only_changed_fields() {
        let (mock, client) = client();
        mock.respond("networkadapter/edit", json!({"networkadapter": {"networkadapterid": "na-2"}}));
        mock.respond(
            "networkadapter/details",
            json!({"networkadapter": {"networkadapterid": "na-2", "serverid": "wps1", "bandwidth": 1000, "networkid": "vl1"}}),
        );

        let mut d = ResourceData::with_prior(
            json!({"id": "na-2", "serverid": "wps1", "bandwidth": 100, "networkid": "vl1"}),
            json!({"id": "na-2", "serverid": "wps1", "bandwidth": 1000, "networkid": "vl1"}),
        );
        NetworkAdapterResource.update(&client, &mut d).await.unwrap();

        assert_eq!(
            mock.requests_to("networkadapter/edit"),
            vec![json!({"networkadapterid": "na-2", "bandwidth": 1000})]
        );
    }

    #[tokio::test]
    async fn test_adapter_read_not_found_clears_id() {
        let (mock, client) = client();
        mock.fail("networkadapter/details", 404, "Network adapter not found");

        let mut d = ResourceData::new(json!({"id": "na-2", "serverid": "wps1"}));
        NetworkAdapterResource.read(&client, &mut d).await.unwrap();
        assert_eq!(d.id(), "");
    }
}
