use serde::{Deserialize, Serialize};
use serde_json::json;

use super::{de, ApiError, GlesysClient};

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct IpDetails {
    #[serde(deserialize_with = "de::string")]
    pub ipaddress: String,
    #[serde(default, deserialize_with = "de::string")]
    pub broadcast: String,
    #[serde(default, deserialize_with = "de::string")]
    pub gateway: String,
    #[serde(default, deserialize_with = "de::string")]
    pub netmask: String,
    #[serde(default, deserialize_with = "de::string")]
    pub datacenter: String,
    #[serde(default, deserialize_with = "de::string")]
    pub platform: String,
    #[serde(default)]
    pub platforms: Vec<String>,
    #[serde(default)]
    pub nameservers: Vec<String>,
    #[serde(default, deserialize_with = "de::int")]
    pub ipversion: i64,
    #[serde(default, deserialize_with = "de::string")]
    pub ptr: String,
    #[serde(default, deserialize_with = "de::string")]
    pub lockedtoaccount: String,
    #[serde(default, deserialize_with = "de::string")]
    pub reserved: String,
    #[serde(default, deserialize_with = "de::string")]
    pub serverid: String,
    #[serde(default)]
    pub cost: Option<IpCost>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct IpCost {
    #[serde(default)]
    pub amount: f64,
    #[serde(default, deserialize_with = "de::string")]
    pub currency: String,
    #[serde(default, deserialize_with = "de::string")]
    pub timeperiod: String,
}

/// Filter for `ip/listfree`.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct FreeIpsParams {
    pub ipversion: i64,
    pub datacenter: String,
    pub platform: String,
}

#[derive(Debug, Deserialize)]
struct FreeIps {
    #[serde(default)]
    ipaddresses: Vec<String>,
}

/// The `ip` API module.
pub struct Ips<'a> {
    pub(super) client: &'a GlesysClient,
}

impl Ips<'_> {
    /// Free addresses matching `params`, in the order the API lists them.
    pub async fn list_free(&self, params: &FreeIpsParams) -> Result<Vec<String>, ApiError> {
        let free: FreeIps = self.client.call("ip/listfree", params, "iplist").await?;
        Ok(free.ipaddresses)
    }

    pub async fn details(&self, address: &str) -> Result<IpDetails, ApiError> {
        self.client
            .call("ip/details", &json!({ "ipaddress": address }), "details")
            .await
    }

    /// Reserve an address for the account.
    pub async fn take(&self, address: &str) -> Result<IpDetails, ApiError> {
        self.client
            .call("ip/take", &json!({ "ipaddress": address }), "details")
            .await
    }

    pub async fn release(&self, address: &str) -> Result<(), ApiError> {
        self.client
            .exec("ip/release", &json!({ "ipaddress": address }))
            .await
    }

    pub async fn set_ptr(&self, address: &str, ptr: &str) -> Result<IpDetails, ApiError> {
        self.client
            .call("ip/setptr", &json!({ "ipaddress": address, "data": ptr }), "details")
            .await
    }

    /// Restore the API's default reverse record.
    pub async fn reset_ptr(&self, address: &str) -> Result<IpDetails, ApiError> {
        self.client
            .call("ip/resetptr", &json!({ "ipaddress": address }), "details")
            .await
    }
}
