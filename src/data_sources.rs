//! Read-only lookups of existing objects.
//!
//! A data source reads its configuration, fetches the object and fills in
//! the computed attributes. An object that does not exist is an error, not
//! an empty result.

use async_trait::async_trait;

use crate::client::{ApiError, GlesysClient};
use crate::error::ProviderError;
use crate::schema::{Attribute, Schema};
use crate::state::ResourceData;

/// One data source type.
#[async_trait]
pub trait DataSource: Send + Sync {
    fn name(&self) -> &'static str;

    fn schema(&self) -> Schema;

    async fn read(&self, client: &GlesysClient, d: &mut ResourceData) -> Result<(), ProviderError>;
}

/// Every data source type the provider serves.
pub fn all() -> Vec<Box<dyn DataSource>> {
    vec![
        Box::new(DnsDomainDataSource),
        Box::new(NetworkDataSource),
        Box::new(NetworkAdapterDataSource),
    ]
}

fn lookup<T>(what: &str, key: &str, result: Result<T, ApiError>) -> Result<T, ProviderError> {
    result.map_err(|err| match err {
        err if err.is_not_found() => ProviderError::NotFound(format!("{} '{}' not found", what, key)),
        err => err.into(),
    })
}

/// `glesys_dnsdomain`, looked up by name.
pub struct DnsDomainDataSource;

#[async_trait]
impl DataSource for DnsDomainDataSource {
    fn name(&self) -> &'static str {
        "glesys_dnsdomain"
    }

    fn schema(&self) -> Schema {
        Schema::with_id()
            .with_attribute("name", Attribute::required_string())
            .with_attribute("ttl", Attribute::computed_int64())
            .with_attribute("expire", Attribute::computed_int64())
            .with_attribute("retry", Attribute::computed_int64())
            .with_attribute("refresh", Attribute::computed_int64())
            .with_attribute("minimum", Attribute::computed_int64())
    }

    async fn read(&self, client: &GlesysClient, d: &mut ResourceData) -> Result<(), ProviderError> {
        let name = d.get_str("name").to_string();
        if name.is_empty() {
            return Err(ProviderError::Validation("name must not be empty".to_string()));
        }
        let domain = lookup("domain", &name, client.domains().details(&name).await)?;

        d.set_id(domain.name.as_str());
        d.set("name", domain.name);
        d.set("ttl", domain.ttl);
        d.set("expire", domain.expire);
        d.set("retry", domain.retry);
        d.set("refresh", domain.refresh);
        d.set("minimum", domain.minimum);
        Ok(())
    }
}

/// `glesys_network`, looked up by id.
pub struct NetworkDataSource;

#[async_trait]
impl DataSource for NetworkDataSource {
    fn name(&self) -> &'static str {
        "glesys_network"
    }

    fn schema(&self) -> Schema {
        Schema::v0()
            .with_attribute("id", Attribute::required_string())
            .with_attribute("description", Attribute::computed_string())
            .with_attribute("datacenter", Attribute::computed_string())
            .with_attribute("public", Attribute::computed_string())
    }

    async fn read(&self, client: &GlesysClient, d: &mut ResourceData) -> Result<(), ProviderError> {
        let id = d.id().to_string();
        let network = lookup("network", &id, client.networks().details(&id).await)?;

        d.set_id(network.id);
        d.set("description", network.description);
        d.set("datacenter", network.datacenter);
        d.set("public", network.public);
        Ok(())
    }
}

/// `glesys_networkadapter`, looked up by id.
pub struct NetworkAdapterDataSource;

#[async_trait]
impl DataSource for NetworkAdapterDataSource {
    fn name(&self) -> &'static str {
        "glesys_networkadapter"
    }

    fn schema(&self) -> Schema {
        Schema::v0()
            .with_attribute("id", Attribute::required_string())
            .with_attribute("adaptertype", Attribute::computed_string())
            .with_attribute("bandwidth", Attribute::computed_int64())
            .with_attribute("name", Attribute::computed_string())
    }

    async fn read(&self, client: &GlesysClient, d: &mut ResourceData) -> Result<(), ProviderError> {
        let id = d.id().to_string();
        let adapter = lookup("network adapter", &id, client.network_adapters().details(&id).await)?;

        d.set_id(adapter.id);
        d.set("adaptertype", adapter.adaptertype);
        d.set("bandwidth", adapter.bandwidth);
        d.set("name", adapter.name);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resources::test_support::client;
    use serde_json::json;

    #[tokio::test]
    async fn test_dnsdomain_by_name() {
        let (mock, client) = client();
        mock.respond(
            "domain/details",
            json!({"domain": {"domainname": "example.com", "ttl": 3600, "expire": 1814400, "retry": 900}}),
        );

        let mut d = ResourceData::new(json!({"name": "example.com"}));
        DnsDomainDataSource.read(&client, &mut d).await.unwrap();

        assert_eq!(d.id(), "example.com");
        assert_eq!(d.get_int("ttl"), Some(3600));
        assert_eq!(d.get_int("retry"), Some(900));
    }

    #[tokio::test]
    async fn test_missing_object_is_not_found_error() {
        let (mock, client) = client();
        mock.fail("network/details", 404, "Network not found");

        let mut d = ResourceData::new(json!({"id": "vl404"}));
        let err = NetworkDataSource.read(&client, &mut d).await.unwrap_err();
        assert!(err.is_not_found());
        assert!(err.message().contains("vl404"));
    }

    #[tokio::test]
    async fn test_network_adapter_by_id() {
        let (mock, client) = client();
        mock.respond(
            "networkadapter/details",
            json!({"networkadapter": {
                "networkadapterid": "na-1", "adaptertype": "VMXNET 3", "bandwidth": 100, "name": "Network adapter 1"
            }}),
        );

        let mut d = ResourceData::new(json!({"id": "na-1"}));
        NetworkAdapterDataSource.read(&client, &mut d).await.unwrap();
        assert_eq!(d.get_str("adaptertype"), "VMXNET 3");
        assert_eq!(d.get_int("bandwidth"), Some(100));
    }

    #[tokio::test]
    async fn test_empty_domain_name_is_rejected() {
        let (mock, client) = client();
        let mut d = ResourceData::new(json!({"name": ""}));
        let err = DnsDomainDataSource.read(&client, &mut d).await.unwrap_err();
        assert!(matches!(err, ProviderError::Validation(_)));
        assert!(mock.requests().is_empty());
    }
}
