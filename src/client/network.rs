use serde::{Deserialize, Serialize};
use serde_json::json;

use super::{de, ApiError, GlesysClient, NetworkAdapter};

/// A VLAN network.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct Network {
    #[serde(rename = "networkid", deserialize_with = "de::string")]
    pub id: String,
    #[serde(default, deserialize_with = "de::string")]
    pub datacenter: String,
    #[serde(default, deserialize_with = "de::string")]
    pub description: String,
    #[serde(default, deserialize_with = "de::string")]
    pub public: String,
}

/// The `network` API module.
pub struct Networks<'a> {
    pub(super) client: &'a GlesysClient,
}

impl Networks<'_> {
    pub async fn create(&self, datacenter: &str, description: &str) -> Result<Network, ApiError> {
        self.client
            .call(
                "network/create",
                &json!({ "datacenter": datacenter, "description": description }),
                "network",
            )
            .await
    }

    pub async fn details(&self, id: &str) -> Result<Network, ApiError> {
        self.client
            .call("network/details", &json!({ "networkid": id }), "network")
            .await
    }

    pub async fn edit(&self, id: &str, description: &str) -> Result<Network, ApiError> {
        self.client
            .call(
                "network/edit",
                &json!({ "networkid": id, "description": description }),
                "network",
            )
            .await
    }

    pub async fn delete(&self, id: &str) -> Result<(), ApiError> {
        self.client
            .exec("network/delete", &json!({ "networkid": id }))
            .await
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CreateNetworkAdapterParams {
    pub serverid: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub networkid: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub adaptertype: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bandwidth: Option<i64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct EditNetworkAdapterParams {
    pub networkadapterid: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub networkid: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bandwidth: Option<i64>,
}

/// The `networkadapter` API module.
pub struct NetworkAdapters<'a> {
    pub(super) client: &'a GlesysClient,
}

impl NetworkAdapters<'_> {
    pub async fn create(&self, params: &CreateNetworkAdapterParams) -> Result<NetworkAdapter, ApiError> {
        self.client
            .call("networkadapter/create", params, "networkadapter")
            .await
    }

    pub async fn details(&self, id: &str) -> Result<NetworkAdapter, ApiError> {
        self.client
            .call(
                "networkadapter/details",
                &json!({ "networkadapterid": id }),
                "networkadapter",
            )
            .await
    }

    pub async fn edit(&self, params: &EditNetworkAdapterParams) -> Result<NetworkAdapter, ApiError> {
        self.client
            .call("networkadapter/edit", params, "networkadapter")
            .await
    }

    pub async fn delete(&self, id: &str) -> Result<(), ApiError> {
        self.client
            .exec("networkadapter/delete", &json!({ "networkadapterid": id }))
            .await
    }
}
