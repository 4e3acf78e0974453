use serde::Deserialize;
use serde_json::json;

use super::{de, ApiError, GlesysClient};

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct ObjectStorageInstance {
    #[serde(deserialize_with = "de::string")]
    pub instanceid: String,
    #[serde(default, deserialize_with = "de::string")]
    pub datacenter: String,
    #[serde(default, deserialize_with = "de::string")]
    pub description: String,
    #[serde(default, deserialize_with = "de::string")]
    pub created: String,
    #[serde(default)]
    pub credentials: Vec<ObjectStorageCredential>,
}

impl ObjectStorageInstance {
    pub fn credential(&self, id: &str) -> Option<&ObjectStorageCredential> {
        self.credentials.iter().find(|c| c.credentialid == id)
    }
}

/// Access key pair of an instance. The API only returns the secret key
/// when the credential is created.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct ObjectStorageCredential {
    #[serde(deserialize_with = "de::string")]
    pub credentialid: String,
    #[serde(default, deserialize_with = "de::string")]
    pub accesskey: String,
    #[serde(default, deserialize_with = "de::string")]
    pub secretkey: String,
    #[serde(default, deserialize_with = "de::string")]
    pub description: String,
    #[serde(default, deserialize_with = "de::string")]
    pub created: String,
}

/// The `objectstorage` API module.
pub struct ObjectStorages<'a> {
    pub(super) client: &'a GlesysClient,
}

impl ObjectStorages<'_> {
    pub async fn create_instance(
        &self,
        datacenter: &str,
        description: Option<&str>,
    ) -> Result<ObjectStorageInstance, ApiError> {
        let mut body = json!({ "datacenter": datacenter });
        if let Some(description) = description {
            body["description"] = description.into();
        }
        self.client
            .call("objectstorage/createinstance", &body, "instance")
            .await
    }

    pub async fn instance_details(&self, id: &str) -> Result<ObjectStorageInstance, ApiError> {
        self.client
            .call("objectstorage/instancedetails", &json!({ "instanceid": id }), "instance")
            .await
    }

    pub async fn edit_instance(&self, id: &str, description: &str) -> Result<ObjectStorageInstance, ApiError> {
        self.client
            .call(
                "objectstorage/editinstance",
                &json!({ "instanceid": id, "description": description }),
                "instance",
            )
            .await
    }

    pub async fn delete_instance(&self, id: &str) -> Result<(), ApiError> {
        self.client
            .exec("objectstorage/deleteinstance", &json!({ "instanceid": id }))
            .await
    }

    pub async fn create_credential(
        &self,
        instanceid: &str,
        description: Option<&str>,
    ) -> Result<ObjectStorageCredential, ApiError> {
        let mut body = json!({ "instanceid": instanceid });
        if let Some(description) = description {
            body["description"] = description.into();
        }
        self.client
            .call("objectstorage/createcredential", &body, "credential")
            .await
    }

    pub async fn delete_credential(&self, instanceid: &str, credentialid: &str) -> Result<(), ApiError> {
        self.client
            .exec(
                "objectstorage/deletecredential",
                &json!({ "instanceid": instanceid, "credentialid": credentialid }),
            )
            .await
    }
}
