use async_trait::async_trait;

use super::{changed_int, changed_str, found, Resource};
use crate::client::{DnsDomain, DnsDomainParams, GlesysClient};
use crate::error::ProviderError;
use crate::schema::{Attribute, Schema};
use crate::state::ResourceData;

/// `glesys_dnsdomain`: a DNS zone hosted at GleSYS. The id is the domain name.
pub struct DnsDomainResource;

#[async_trait]
impl Resource for DnsDomainResource {
    fn name(&self) -> &'static str {
        "glesys_dnsdomain"
    }

    fn schema(&self) -> Schema {
        Schema::with_id()
            .with_description("A DNS domain hosted at GleSYS. Domains are added, not registered.")
            .with_attribute(
                "name",
                Attribute::required_string()
                    .with_force_new()
                    .with_description("Domain name."),
            )
            .with_attribute(
                "createrecords",
                Attribute::optional_string()
                    .with_allowed_values(["yes", "no"])
                    .with_description("Create a default set of records when the domain is added."),
            )
            .with_attribute("expire", Attribute::optional_computed_int64())
            .with_attribute("minimum", Attribute::optional_computed_int64())
            .with_attribute("refresh", Attribute::optional_computed_int64())
            .with_attribute("retry", Attribute::optional_computed_int64())
            .with_attribute("ttl", Attribute::optional_computed_int64())
            .with_attribute("primarynameserver", Attribute::optional_computed_string())
            .with_attribute("responsibleperson", Attribute::optional_computed_string())
            .with_attribute("createtime", Attribute::computed_string())
            .with_attribute("displayname", Attribute::computed_string())
            .with_attribute("recordcount", Attribute::computed_int64())
            .with_attribute("usingglesysnameserver", Attribute::computed_string())
            .with_attribute("registrarinfo_state", Attribute::computed_string())
            .with_attribute("registrarinfo_statedescription", Attribute::computed_string())
            .with_attribute("registrarinfo_expire", Attribute::computed_string())
            .with_attribute("registrarinfo_autorenew", Attribute::computed_string())
            .with_attribute("registrarinfo_tld", Attribute::computed_string())
            .with_attribute("registrarinfo_invoicenumber", Attribute::computed_string())
    }

    async fn create(&self, client: &GlesysClient, d: &mut ResourceData) -> Result<(), ProviderError> {
        let params = DnsDomainParams {
            name: d.get_str("name").to_string(),
            createrecords: d.get_opt_str("createrecords"),
            expire: d.get_int("expire"),
            minimum: d.get_int("minimum"),
            refresh: d.get_int("refresh"),
            retry: d.get_int("retry"),
            ttl: d.get_int("ttl"),
            primarynameserver: d.get_opt_str("primarynameserver"),
            responsibleperson: d.get_opt_str("responsibleperson"),
        };

        let domain = client.domains().add(&params).await?;
        d.set_id(domain.name);
        self.read(client, d).await
    }

    async fn read(&self, client: &GlesysClient, d: &mut ResourceData) -> Result<(), ProviderError> {
        let result = client.domains().details(d.id()).await;
        if let Some(domain) = found(d, result)? {
            set_domain(d, domain);
        }
        Ok(())
    }

    async fn update(&self, client: &GlesysClient, d: &mut ResourceData) -> Result<(), ProviderError> {
        let params = DnsDomainParams {
            name: d.id().to_string(),
            createrecords: None,
            expire: changed_int(d, "expire"),
            minimum: changed_int(d, "minimum"),
            refresh: changed_int(d, "refresh"),
            retry: changed_int(d, "retry"),
            ttl: changed_int(d, "ttl"),
            primarynameserver: changed_str(d, "primarynameserver"),
            responsibleperson: changed_str(d, "responsibleperson"),
        };

        client.domains().edit(&params).await?;
        self.read(client, d).await
    }

    async fn delete(&self, client: &GlesysClient, d: &mut ResourceData) -> Result<(), ProviderError> {
        client.domains().delete(d.id()).await?;
        d.clear_id();
        Ok(())
    }
}

fn set_domain(d: &mut ResourceData, domain: DnsDomain) {
    d.set("name", domain.name);
    d.set("createtime", domain.createtime);
    d.set("displayname", domain.displayname);
    d.set("expire", domain.expire);
    d.set("minimum", domain.minimum);
    d.set("refresh", domain.refresh);
    d.set("retry", domain.retry);
    d.set("ttl", domain.ttl);
    d.set("recordcount", domain.recordcount);
    d.set("primarynameserver", domain.primarynameserver);
    d.set("responsibleperson", domain.responsibleperson);
    d.set("usingglesysnameserver", domain.usingglesysnameserver);

    let registrar = domain.registrarinfo.unwrap_or_default();
    d.set("registrarinfo_state", registrar.state);
    d.set("registrarinfo_statedescription", registrar.statedescription);
    d.set("registrarinfo_expire", registrar.expire);
    d.set("registrarinfo_autorenew", registrar.autorenew);
    d.set("registrarinfo_tld", registrar.tld);
    d.set("registrarinfo_invoicenumber", registrar.invoicenumber);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resources::test_support::client;
    use serde_json::json;

    fn domain_reply(ttl: i64) -> serde_json::Value {
        json!({"domain": {
            "domainname": "example.com",
            "ttl": ttl,
            "expire": 1814400,
            "primarynameserver": "ns1.namesystem.se.",
            "registrarinfo": {"state": "OK", "tld": "com"}
        }})
    }

    #[tokio::test]
    async fn test_create_uses_domain_name_as_id() {
        let (mock, client) = client();
        mock.respond("domain/add", json!({"domain": {"domainname": "example.com"}}));
        mock.respond("domain/details", domain_reply(3600));

        let mut d = ResourceData::new(json!({"name": "example.com", "ttl": 3600}));
        DnsDomainResource.create(&client, &mut d).await.unwrap();

        assert_eq!(d.id(), "example.com");
        assert_eq!(d.get_str("registrarinfo_state"), "OK");
        assert_eq!(d.get_str("registrarinfo_statedescription"), "");
        let sent = &mock.requests_to("domain/add")[0];
        assert_eq!(sent, &json!({"domainname": "example.com", "ttl": 3600}));
    }

    #[tokio::test]
    async fn test_update_sends_only_changed_fields() {
        let (mock, client) = client();
        mock.respond("domain/edit", domain_reply(600));
        mock.respond("domain/details", domain_reply(600));

        let mut d = ResourceData::with_prior(
            json!({"id": "example.com", "name": "example.com", "ttl": 3600, "expire": 1814400, "retry": 900}),
            json!({"id": "example.com", "name": "example.com", "ttl": 600, "expire": 1814400, "retry": 900}),
        );
        DnsDomainResource.update(&client, &mut d).await.unwrap();

        assert_eq!(
            mock.requests_to("domain/edit"),
            vec![json!({"domainname": "example.com", "ttl": 600})]
        );
        assert_eq!(d.get_int("ttl"), Some(600));
    }

    #[tokio::test]
    async fn test_read_missing_domain_clears_id() {
        let (mock, client) = client();
        mock.fail("domain/details", 404, "Domain not found");

        let mut d = ResourceData::new(json!({"id": "example.com", "name": "example.com"}));
        DnsDomainResource.read(&client, &mut d).await.unwrap();
        assert_eq!(d.id(), "");
    }
}
