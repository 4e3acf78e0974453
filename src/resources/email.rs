use async_trait::async_trait;

use super::{changed_int, changed_str, found, gone, Resource};
use crate::client::{EmailAccountParams, GlesysClient};
use crate::error::ProviderError;
use crate::schema::{Attribute, Schema};
use crate::state::ResourceData;

/// `glesys_emailaccount`: a mailbox. The id is the address.
pub struct EmailAccountResource;

#[async_trait]
impl Resource for EmailAccountResource {
    fn name(&self) -> &'static str {
        "glesys_emailaccount"
    }

    fn schema(&self) -> Schema {
        let yes_no = || Attribute::optional_computed_string().with_allowed_values(["yes", "no"]);

        Schema::with_id()
            .with_attribute("emailaccount", Attribute::required_string().with_force_new())
            .with_attribute(
                "password",
                Attribute::computed_string()
                    .sensitive()
                    .with_description("Generated at creation."),
            )
            .with_attribute(
                "antispamlevel",
                Attribute::optional_computed_int64().with_description("0 to 5."),
            )
            .with_attribute("antivirus", yes_no())
            .with_attribute("autorespond", yes_no())
            .with_attribute("autorespondmessage", Attribute::optional_computed_string())
            .with_attribute("rejectspam", yes_no())
            .with_attribute("quotaingib", Attribute::optional_computed_int64())
            .with_attribute("autorespondsaveemail", Attribute::computed_string())
            .with_attribute("created", Attribute::computed_string())
            .with_attribute("modified", Attribute::computed_string())
            .with_attribute("displayname", Attribute::computed_string())
    }

    async fn create(&self, client: &GlesysClient, d: &mut ResourceData) -> Result<(), ProviderError> {
        let params = EmailAccountParams {
            emailaccount: d.get_str("emailaccount").to_string(),
            antispamlevel: d.get_int("antispamlevel"),
            antivirus: d.get_opt_str("antivirus"),
            autorespond: d.get_opt_str("autorespond"),
            autorespondmessage: d.get_opt_str("autorespondmessage"),
            quotaingib: d.get_int("quotaingib"),
            rejectspam: d.get_opt_str("rejectspam"),
        };

        let account = client.email().create_account(&params).await?;
        d.set("password", account.password);
        d.set_id(account.emailaccount);
        self.read(client, d).await
    }

    async fn read(&self, client: &GlesysClient, d: &mut ResourceData) -> Result<(), ProviderError> {
        let result = client.email().list(d.id()).await;
        let Some(list) = found(d, result)? else {
            return Ok(());
        };

        let id = d.id().to_string();
        match list.emailaccounts.into_iter().find(|a| a.emailaccount == id) {
            Some(account) => {
                d.set("emailaccount", account.emailaccount);
                d.set("antispamlevel", account.antispamlevel);
                d.set("antivirus", account.antivirus);
                d.set("autorespond", account.autorespond);
                d.set("autorespondmessage", account.autorespondmessage);
                d.set("autorespondsaveemail", account.autorespondsaveemail);
                d.set("rejectspam", account.rejectspam);
                d.set("quotaingib", account.quotaingib);
                d.set("created", account.created);
                d.set("modified", account.modified);
                d.set("displayname", account.displayname);
            },
            None => gone(d, "email account"),
        }
        Ok(())
    }

    async fn update(&self, client: &GlesysClient, d: &mut ResourceData) -> Result<(), ProviderError> {
        let params = EmailAccountParams {
            emailaccount: d.id().to_string(),
            antispamlevel: changed_int(d, "antispamlevel"),
            antivirus: changed_str(d, "antivirus"),
            autorespond: changed_str(d, "autorespond"),
            autorespondmessage: changed_str(d, "autorespondmessage"),
            quotaingib: changed_int(d, "quotaingib"),
            rejectspam: changed_str(d, "rejectspam"),
        };
        client.email().edit_account(&params).await?;
        self.read(client, d).await
    }

    async fn delete(&self, client: &GlesysClient, d: &mut ResourceData) -> Result<(), ProviderError> {
        client.email().delete(d.id()).await?;
        d.clear_id();
        Ok(())
    }
}

/// `glesys_emailalias`: forwards an address to one or more destinations.
pub struct EmailAliasResource;

#[async_trait]
impl Resource for EmailAliasResource {
    fn name(&self) -> &'static str {
        "glesys_emailalias"
    }

    fn schema(&self) -> Schema {
        Schema::with_id()
            .with_attribute("emailalias", Attribute::required_string().with_force_new())
            .with_attribute(
                "goto",
                Attribute::required_string().with_description("Comma separated destination addresses."),
            )
    }

    async fn create(&self, client: &GlesysClient, d: &mut ResourceData) -> Result<(), ProviderError> {
        let alias = client
            .email()
            .create_alias(d.get_str("emailalias"), d.get_str("goto"))
            .await?;
        d.set_id(alias.emailalias);
        self.read(client, d).await
    }

    async fn read(&self, client: &GlesysClient, d: &mut ResourceData) -> Result<(), ProviderError> {
        let result = client.email().list(d.id()).await;
        let Some(list) = found(d, result)? else {
            return Ok(());
        };

        let id = d.id().to_string();
        match list.emailaliases.into_iter().find(|a| a.emailalias == id) {
            Some(alias) => {
                d.set("emailalias", alias.emailalias);
                d.set("goto", alias.destination);
            },
            None => gone(d, "email alias"),
        }
        Ok(())
    }

    async fn update(&self, client: &GlesysClient, d: &mut ResourceData) -> Result<(), ProviderError> {
        if let Some(destination) = changed_str(d, "goto") {
            client.email().edit_alias(d.id(), &destination).await?;
        }
        self.read(client, d).await
    }

    async fn delete(&self, client: &GlesysClient, d: &mut ResourceData) -> Result<(), ProviderError> {
        client.email().delete(d.id()).await?;
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
    async fn test_account_create_keeps_generated_password() {
        let (mock, client) = client();
        mock.respond(
            "email/createaccount",
            json!({"emailaccount": {"emailaccount": "info@example.com", "password": "s3cret"}}),
        );
        mock.respond(
            "email/list",
            json!({"list": {"emailaccounts": [
                {"emailaccount": "info@example.com", "antispamlevel": 3, "quotaingib": 1, "antivirus": "yes"}
            ]}}),
        );

        let mut d = ResourceData::new(json!({"emailaccount": "info@example.com", "quotaingib": 1}));
        EmailAccountResource.create(&client, &mut d).await.unwrap();

        assert_eq!(d.id(), "info@example.com");
        assert_eq!(d.get_str("password"), "s3cret");
        assert_eq!(d.get_int("antispamlevel"), Some(3));
        assert_eq!(
            mock.requests_to("email/list"),
            vec![json!({"domainname": "example.com", "filter": "info@example.com"})]
        );
    }

    #[tokio::test]
    async fn test_account_update_sends_only_changed_fields() {
        let (mock, client) = client();
        mock.respond("email/editaccount", json!({"emailaccount": {"emailaccount": "info@example.com"}}));
        mock.respond(
            "email/list",
            json!({"list": {"emailaccounts": [{"emailaccount": "info@example.com", "rejectspam": "yes"}]}}),
        );

        let mut d = ResourceData::with_prior(
            json!({"id": "info@example.com", "emailaccount": "info@example.com", "rejectspam": "no", "quotaingib": 1}),
            json!({"id": "info@example.com", "emailaccount": "info@example.com", "rejectspam": "yes", "quotaingib": 1}),
        );
        EmailAccountResource.update(&client, &mut d).await.unwrap();

        assert_eq!(
            mock.requests_to("email/editaccount"),
            vec![json!({"emailaccount": "info@example.com", "rejectspam": "yes"})]
        );
    }

    #[tokio::test]
    async fn test_account_filter_match_must_be_exact() {
        let (mock, client) = client();
        mock.respond(
            "email/list",
            json!({"list": {"emailaccounts": [{"emailaccount": "info2@example.com"}]}}),
        );

        let mut d = ResourceData::new(json!({"id": "info@example.com"}));
        EmailAccountResource.read(&client, &mut d).await.unwrap();
        assert_eq!(d.id(), "");
    }

    #[tokio::test]
    async fn test_alias_read_and_update() {
        let (mock, client) = client();
        mock.respond("email/editalias", json!({"emailalias": {"emailalias": "sales@example.com"}}));
        mock.respond(
            "email/list",
            json!({"list": {"emailaliases": [{"emailalias": "sales@example.com", "goto": "bob@example.com"}]}}),
        );

        let mut d = ResourceData::with_prior(
            json!({"id": "sales@example.com", "emailalias": "sales@example.com", "goto": "alice@example.com"}),
            json!({"id": "sales@example.com", "emailalias": "sales@example.com", "goto": "bob@example.com"}),
        );
        EmailAliasResource.update(&client, &mut d).await.unwrap();

        assert_eq!(
            mock.requests_to("email/editalias"),
            vec![json!({"emailalias": "sales@example.com", "goto": "bob@example.com"})]
        );
        assert_eq!(d.get_str("goto"), "bob@example.com");
    }

    #[tokio::test]
    async fn test_malformed_address_is_validation_error() {
        let (mock, client) = client();

        let mut d = ResourceData::new(json!({"id": "example.com"}));
        let err = EmailAliasResource.read(&client, &mut d).await.unwrap_err();
        assert!(matches!(err, ProviderError::Validation(_)));
        assert!(mock.requests().is_empty());
    }
}
