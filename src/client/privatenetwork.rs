use serde::{Deserialize, Serialize};
use serde_json::json;

use super::{de, ApiError, GlesysClient};

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct PrivateNetwork {
    #[serde(deserialize_with = "de::string")]
    pub id: String,
    #[serde(default, deserialize_with = "de::string")]
    pub name: String,
    #[serde(default, deserialize_with = "de::string")]
    pub ipv6aggregate: String,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct PrivateNetworkSegment {
    #[serde(deserialize_with = "de::string")]
    pub id: String,
    #[serde(default, deserialize_with = "de::string")]
    pub name: String,
    #[serde(default, deserialize_with = "de::string")]
    pub datacenter: String,
    #[serde(default, deserialize_with = "de::string")]
    pub platform: String,
    #[serde(default, deserialize_with = "de::string")]
    pub ipv4subnet: String,
    #[serde(default, deserialize_with = "de::string")]
    pub ipv6subnet: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CreateSegmentParams {
    pub privatenetworkid: String,
    pub name: String,
    pub datacenter: String,
    pub platform: String,
    pub ipv4subnet: String,
}

/// The `privatenetwork` API module.
pub struct PrivateNetworks<'a> {
    pub(super) client: &'a GlesysClient,
}

impl PrivateNetworks<'_> {
    pub async fn create(&self, name: &str) -> Result<PrivateNetwork, ApiError> {
        self.client
            .call("privatenetwork/create", &json!({ "name": name }), "privatenetwork")
            .await
    }

    pub async fn details(&self, id: &str) -> Result<PrivateNetwork, ApiError> {
        self.client
            .call(
                "privatenetwork/details",
                &json!({ "privatenetworkid": id }),
                "privatenetwork",
            )
            .await
    }

    pub async fn edit(&self, id: &str, name: &str) -> Result<PrivateNetwork, ApiError> {
        self.client
            .call(
                "privatenetwork/edit",
                &json!({ "id": id, "name": name }),
                "privatenetwork",
            )
            .await
    }

    pub async fn delete(&self, id: &str) -> Result<(), ApiError> {
        self.client
            .exec("privatenetwork/delete", &json!({ "privatenetworkid": id }))
            .await
    }

    pub async fn create_segment(&self, params: &CreateSegmentParams) -> Result<PrivateNetworkSegment, ApiError> {
        self.client
            .call("privatenetwork/createsegment", params, "privatenetworksegment")
            .await
    }

    pub async fn list_segments(&self, privatenetworkid: &str) -> Result<Vec<PrivateNetworkSegment>, ApiError> {
        self.client
            .call(
                "privatenetwork/listsegments",
                &json!({ "privatenetworkid": privatenetworkid }),
                "privatenetworksegments",
            )
            .await
    }

    pub async fn edit_segment(&self, id: &str, name: &str) -> Result<PrivateNetworkSegment, ApiError> {
        self.client
            .call(
                "privatenetwork/editsegment",
                &json!({ "id": id, "name": name }),
                "privatenetworksegment",
            )
            .await
    }

    pub async fn delete_segment(&self, id: &str) -> Result<(), ApiError> {
        self.client
            .exec("privatenetwork/deletesegment", &json!({ "id": id }))
            .await
    }
}
