use async_trait::async_trait;
use serde_json::json;

use super::{changed_int, changed_str, found, gone, split_import_id, Resource};
use crate::client::{AddRecordParams, GlesysClient, UpdateRecordParams};
use crate::error::ProviderError;
use crate::schema::{Attribute, Schema};
use crate::state::ResourceData;

/// `glesys_dnsdomain_record`: one record in a hosted domain. The id is the
/// numeric record id.
pub struct DnsDomainRecordResource;

#[async_trait]
impl Resource for DnsDomainRecordResource {
    fn name(&self) -> &'static str {
        "glesys_dnsdomain_record"
    }

    fn schema(&self) -> Schema {
        Schema::with_id()
            .with_attribute("domain", Attribute::required_string().with_force_new())
            .with_attribute("host", Attribute::required_string())
            .with_attribute("data", Attribute::required_string())
            .with_attribute(
                "type",
                Attribute::optional_string()
                    .with_force_new()
                    .with_description("Record type, A when omitted."),
            )
            .with_attribute("ttl", Attribute::optional_computed_int64())
            .with_attribute("recordid", Attribute::computed_int64())
    }

    async fn create(&self, client: &GlesysClient, d: &mut ResourceData) -> Result<(), ProviderError> {
        let params = AddRecordParams {
            domainname: d.get_str("domain").to_string(),
            host: d.get_str("host").to_string(),
            data: d.get_str("data").to_string(),
            record_type: d.get_opt_str("type"),
            ttl: d.get_int("ttl"),
        };

        let record = client.domains().add_record(&params).await?;
        d.set_id(record.recordid.to_string());
        self.read(client, d).await
    }

    async fn read(&self, client: &GlesysClient, d: &mut ResourceData) -> Result<(), ProviderError> {
        let recordid = d.int_id()?;
        let result = client.domains().list_records(d.get_str("domain")).await;
        let Some(records) = found(d, result)? else {
            return Ok(());
        };

        match records.into_iter().find(|r| r.recordid == recordid) {
            Some(record) => {
                d.set("domain", record.domainname);
                d.set("host", record.host);
                d.set("data", record.data);
                d.set("type", record.record_type);
                d.set("ttl", record.ttl);
                d.set("recordid", record.recordid);
            },
            None => gone(d, "dns record"),
        }
        Ok(())
    }

    async fn update(&self, client: &GlesysClient, d: &mut ResourceData) -> Result<(), ProviderError> {
        let params = UpdateRecordParams {
            recordid: d.int_id()?,
            host: changed_str(d, "host"),
            data: changed_str(d, "data"),
            record_type: changed_str(d, "type"),
            ttl: changed_int(d, "ttl"),
        };

        client.domains().update_record(&params).await?;
        self.read(client, d).await
    }

    async fn delete(&self, client: &GlesysClient, d: &mut ResourceData) -> Result<(), ProviderError> {
        client.domains().delete_record(d.int_id()?).await?;
        d.clear_id();
        Ok(())
    }

    /// Import id format: `<domain>,<recordid>`.
    fn import(&self, id: &str) -> Result<ResourceData, ProviderError> {
        let (domain, recordid) = split_import_id(id, "<domain>,<recordid>")?;
        let d = ResourceData::new(json!({ "id": recordid, "domain": domain }));
        d.int_id()?;
        Ok(d)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resources::test_support::client;

    fn records() -> serde_json::Value {
        json!({"records": [
            {"recordid": 11, "domainname": "example.com", "host": "www", "type": "A", "data": "192.0.2.1", "ttl": 3600},
            {"recordid": "12", "domainname": "example.com", "host": "mail", "type": "MX", "data": "10 mx.example.com.", "ttl": 600}
        ]})
    }

    #[tokio::test]
    async fn test_read_finds_record_in_listing() {
        let (mock, client) = client();
        mock.respond("domain/listrecords", records());

        let mut d = ResourceData::new(json!({"id": "12", "domain": "example.com"}));
        DnsDomainRecordResource.read(&client, &mut d).await.unwrap();

        assert_eq!(d.get_str("host"), "mail");
        assert_eq!(d.get_str("type"), "MX");
        assert_eq!(d.get_int("recordid"), Some(12));
    }

    #[tokio::test]
    async fn test_read_record_missing_from_listing_clears_id() {
        let (mock, client) = client();
        mock.respond("domain/listrecords", records());

        let mut d = ResourceData::new(json!({"id": "99", "domain": "example.com"}));
        DnsDomainRecordResource.read(&client, &mut d).await.unwrap();
        assert_eq!(d.id(), "");
    }

    #[tokio::test]
    async fn test_non_numeric_id_is_validation_error() {
        let (mock, client) = client();

        let mut d = ResourceData::new(json!({"id": "www", "domain": "example.com"}));
        let err = DnsDomainRecordResource.delete(&client, &mut d).await.unwrap_err();
        assert!(matches!(err, ProviderError::Validation(_)));
        assert!(mock.requests().is_empty());
    }

    #[tokio::test]
    async fn test_update_sends_only_changed_fields() {
        let (mock, client) = client();
        mock.respond("domain/updaterecord", json!({"record": {"recordid": 11}}));
        mock.respond("domain/listrecords", records());

        let mut d = ResourceData::with_prior(
            json!({"id": "11", "domain": "example.com", "host": "www", "type": "A", "data": "192.0.2.1", "ttl": 3600}),
            json!({"id": "11", "domain": "example.com", "host": "www", "type": "A", "data": "192.0.2.99", "ttl": 3600}),
        );
        DnsDomainRecordResource.update(&client, &mut d).await.unwrap();

        assert_eq!(
            mock.requests_to("domain/updaterecord"),
            vec![json!({"recordid": 11, "data": "192.0.2.99"})]
        );
    }

    #[test]
    fn test_import_composite_id() {
        let d = DnsDomainRecordResource.import("example.com,11").unwrap();
        assert_eq!(d.id(), "11");
        assert_eq!(d.get_str("domain"), "example.com");

        assert!(DnsDomainRecordResource.import("11").is_err());
        assert!(matches!(
            DnsDomainRecordResource.import("example.com,www"),
            Err(ProviderError::Validation(_))
        ));
    }
}
