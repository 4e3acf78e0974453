use async_trait::async_trait;

use super::{changed_str, found, gone, Resource};
use crate::client::{CreateSegmentParams, GlesysClient};
use crate::error::ProviderError;
use crate::schema::{Attribute, Schema};
use crate::state::ResourceData;

/// `glesys_privatenetwork`
pub struct PrivateNetworkResource;

#[async_trait]
impl Resource for PrivateNetworkResource {
    fn name(&self) -> &'static str {
        "glesys_privatenetwork"
    }

    fn schema(&self) -> Schema {
        Schema::with_id()
            .with_attribute("name", Attribute::required_string())
            .with_attribute("ipv6aggregate", Attribute::computed_string())
    }

    async fn create(&self, client: &GlesysClient, d: &mut ResourceData) -> Result<(), ProviderError> {
        let network = client.private_networks().create(d.get_str("name")).await?;
        d.set_id(network.id);
        self.read(client, d).await
    }

    async fn read(&self, client: &GlesysClient, d: &mut ResourceData) -> Result<(), ProviderError> {
        let result = client.private_networks().details(d.id()).await;
        if let Some(network) = found(d, result)? {
            d.set("name", network.name);
            d.set("ipv6aggregate", network.ipv6aggregate);
        }
        Ok(())
    }

    async fn update(&self, client: &GlesysClient, d: &mut ResourceData) -> Result<(), ProviderError> {
        if let Some(name) = changed_str(d, "name") {
            client.private_networks().edit(d.id(), &name).await?;
        }
        self.read(client, d).await
    }

    async fn delete(&self, client: &GlesysClient, d: &mut ResourceData) -> Result<(), ProviderError> {
        client.private_networks().delete(d.id()).await?;
        d.clear_id();
        Ok(())
    }
}

/// `glesys_privatenetwork_segment`: a subnet of a private network in one
/// datacenter. Only the name can change in place.
pub struct PrivateNetworkSegmentResource;

#[async_trait]
impl Resource for PrivateNetworkSegmentResource {
    fn name(&self) -> &'static str {
        "glesys_privatenetwork_segment"
    }

    fn schema(&self) -> Schema {
        Schema::with_id()
            .with_attribute("name", Attribute::required_string())
            .with_attribute("privatenetworkid", Attribute::required_string().with_force_new())
            .with_attribute("platform", Attribute::required_string().with_force_new())
            .with_attribute("datacenter", Attribute::required_string().with_force_new())
            .with_attribute("ipv4subnet", Attribute::required_string().with_force_new())
            .with_attribute("ipv6subnet", Attribute::computed_string())
    }

    async fn create(&self, client: &GlesysClient, d: &mut ResourceData) -> Result<(), ProviderError> {
        let params = CreateSegmentParams {
            privatenetworkid: d.get_str("privatenetworkid").to_string(),
            name: d.get_str("name").to_string(),
            datacenter: d.get_str("datacenter").to_string(),
            platform: d.get_str("platform").to_string(),
            ipv4subnet: d.get_str("ipv4subnet").to_string(),
        };
        let segment = client.private_networks().create_segment(&params).await?;
        d.set_id(segment.id);
        self.read(client, d).await
    }

    async fn read(&self, client: &GlesysClient, d: &mut ResourceData) -> Result<(), ProviderError> {
        let result = client
            .private_networks()
            .list_segments(d.get_str("privatenetworkid"))
            .await;
        let Some(segments) = found(d, result)? else {
            return Ok(());
        };

        let id = d.id().to_string();
        match segments.into_iter().find(|s| s.id == id) {
            Some(segment) => {
                d.set("name", segment.name);
                d.set("datacenter", segment.datacenter);
                d.set("platform", segment.platform);
                d.set("ipv4subnet", segment.ipv4subnet);
                d.set("ipv6subnet", segment.ipv6subnet);
            },
            None => gone(d, "private network segment"),
        }
        Ok(())
    }

    async fn update(&self, client: &GlesysClient, d: &mut ResourceData) -> Result<(), ProviderError> {
        if let Some(name) = changed_str(d, "name") {
            client.private_networks().edit_segment(d.id(), &name).await?;
        }
        self.read(client, d).await
    }

    async fn delete(&self, client: &GlesysClient, d: &mut ResourceData) -> Result<(), ProviderError> {
        client.private_networks().delete_segment(d.id()).await?;
        d.clear_id();
        Ok(())
    }
}
