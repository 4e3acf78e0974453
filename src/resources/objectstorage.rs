use async_trait::async_trait;

use super::{changed_str, found, gone, split_import_id, Resource};
use crate::client::GlesysClient;
use crate::error::ProviderError;
use crate::schema::{Attribute, Schema};
use crate::state::ResourceData;

/// `glesys_objectstorage_instance`
///
/// The API only reveals secret keys in the reply to a create call. The
/// secret of the instance's initial credential is stored then and kept
/// from then on.
pub struct ObjectStorageInstanceResource;

#[async_trait]
impl Resource for ObjectStorageInstanceResource {
    fn name(&self) -> &'static str {
        "glesys_objectstorage_instance"
    }

    fn schema(&self) -> Schema {
        Schema::with_id()
            .with_attribute("datacenter", Attribute::required_string().with_force_new())
            .with_attribute("description", Attribute::optional_string())
            .with_attribute("created", Attribute::computed_string())
            .with_attribute("accesskey", Attribute::computed_string())
            .with_attribute("secretkey", Attribute::computed_string().sensitive())
    }

    async fn create(&self, client: &GlesysClient, d: &mut ResourceData) -> Result<(), ProviderError> {
        let description = d.get_opt_str("description");
        let instance = client
            .object_storage()
            .create_instance(d.get_str("datacenter"), description.as_deref())
            .await?;

        if let Some(credential) = instance.credentials.first() {
            d.set("secretkey", credential.secretkey.as_str());
        }
        d.set_id(instance.instanceid);
        self.read(client, d).await
    }

    async fn read(&self, client: &GlesysClient, d: &mut ResourceData) -> Result<(), ProviderError> {
        let result = client.object_storage().instance_details(d.id()).await;
        let Some(instance) = found(d, result)? else {
            return Ok(());
        };

        d.set("datacenter", instance.datacenter);
        d.set("description", instance.description);
        d.set("created", instance.created);
        if let Some(credential) = instance.credentials.into_iter().next() {
            d.set("accesskey", credential.accesskey);
            if d.get_opt_str("secretkey").is_none() && !credential.secretkey.is_empty() {
                d.set("secretkey", credential.secretkey);
            }
        }
        Ok(())
    }

    async fn update(&self, client: &GlesysClient, d: &mut ResourceData) -> Result<(), ProviderError> {
        if let Some(description) = changed_str(d, "description") {
            client.object_storage().edit_instance(d.id(), &description).await?;
        }
        self.read(client, d).await
    }

    async fn delete(&self, client: &GlesysClient, d: &mut ResourceData) -> Result<(), ProviderError> {
        client.object_storage().delete_instance(d.id()).await?;
        d.clear_id();
        Ok(())
    }
}

/// `glesys_objectstorage_credential`: an extra key pair for an instance.
/// Every attribute forces a new credential.
pub struct ObjectStorageCredentialResource;

#[async_trait]
impl Resource for ObjectStorageCredentialResource {
    fn name(&self) -> &'static str {
        "glesys_objectstorage_credential"
    }

    fn schema(&self) -> Schema {
        Schema::with_id()
            .with_attribute("instanceid", Attribute::required_string().with_force_new())
            .with_attribute("description", Attribute::optional_string().with_force_new())
            .with_attribute("accesskey", Attribute::computed_string())
            .with_attribute("secretkey", Attribute::computed_string().sensitive())
            .with_attribute("created", Attribute::computed_string())
    }

    async fn create(&self, client: &GlesysClient, d: &mut ResourceData) -> Result<(), ProviderError> {
        let description = d.get_opt_str("description");
        let credential = client
            .object_storage()
            .create_credential(d.get_str("instanceid"), description.as_deref())
            .await?;

        d.set("secretkey", credential.secretkey);
        d.set_id(credential.credentialid);
        self.read(client, d).await
    }

    async fn read(&self, client: &GlesysClient, d: &mut ResourceData) -> Result<(), ProviderError> {
        let result = client.object_storage().instance_details(d.get_str("instanceid")).await;
        let Some(instance) = found(d, result)? else {
            return Ok(());
        };

        match instance.credential(d.id()) {
            Some(credential) => {
                d.set("accesskey", credential.accesskey.as_str());
                d.set("created", credential.created.as_str());
                d.set("description", credential.description.as_str());
            },
            None => gone(d, "object storage credential"),
        }
        Ok(())
    }

    async fn delete(&self, client: &GlesysClient, d: &mut ResourceData) -> Result<(), ProviderError> {
        client
            .object_storage()
            .delete_credential(d.get_str("instanceid"), d.id())
            .await?;
        d.clear_id();
        Ok(())
    }

    /// Import id format: `<instanceid>,<credentialid>`. The secret key
    /// cannot be recovered.
    fn import(&self, id: &str) -> Result<ResourceData, ProviderError> {
        let (instanceid, credentialid) = split_import_id(id, "<instanceid>,<credentialid>")?;
        Ok(ResourceData::new(
            serde_json::json!({ "id": credentialid, "instanceid": instanceid }),
        ))
    }
}
