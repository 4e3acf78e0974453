use serde::{Deserialize, Serialize};
use serde_json::json;

use super::{de, ApiError, GlesysClient};

/// A DNS domain hosted at GleSYS.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct DnsDomain {
    #[serde(rename = "domainname")]
    pub name: String,
    #[serde(default, deserialize_with = "de::string")]
    pub displayname: String,
    #[serde(default, deserialize_with = "de::string")]
    pub createtime: String,
    #[serde(default, deserialize_with = "de::int")]
    pub expire: i64,
    #[serde(default, deserialize_with = "de::int")]
    pub minimum: i64,
    #[serde(default, deserialize_with = "de::int")]
    pub refresh: i64,
    #[serde(default, deserialize_with = "de::int")]
    pub retry: i64,
    #[serde(default, deserialize_with = "de::int")]
    pub ttl: i64,
    #[serde(default, deserialize_with = "de::int")]
    pub recordcount: i64,
    #[serde(default, deserialize_with = "de::string")]
    pub primarynameserver: String,
    #[serde(default, deserialize_with = "de::string")]
    pub responsibleperson: String,
    #[serde(default, deserialize_with = "de::string")]
    pub usingglesysnameserver: String,
    #[serde(default)]
    pub registrarinfo: Option<RegistrarInfo>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct RegistrarInfo {
    #[serde(default, deserialize_with = "de::string")]
    pub state: String,
    #[serde(default, deserialize_with = "de::string")]
    pub statedescription: String,
    #[serde(default, deserialize_with = "de::string")]
    pub expire: String,
    #[serde(default, deserialize_with = "de::string")]
    pub autorenew: String,
    #[serde(default, deserialize_with = "de::string")]
    pub tld: String,
    #[serde(default, deserialize_with = "de::string")]
    pub invoicenumber: String,
}

/// Parameters for `domain/add` and `domain/edit`.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DnsDomainParams {
    #[serde(rename = "domainname")]
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub createrecords: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expire: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub minimum: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub refresh: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub retry: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ttl: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub primarynameserver: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub responsibleperson: Option<String>,
}

/// One record inside a DNS domain.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct DnsRecord {
    #[serde(deserialize_with = "de::int")]
    pub recordid: i64,
    #[serde(default, deserialize_with = "de::string")]
    pub domainname: String,
    #[serde(default, deserialize_with = "de::string")]
    pub host: String,
    #[serde(default, rename = "type", deserialize_with = "de::string")]
    pub record_type: String,
    #[serde(default, deserialize_with = "de::string")]
    pub data: String,
    #[serde(default, deserialize_with = "de::int")]
    pub ttl: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct AddRecordParams {
    pub domainname: String,
    pub host: String,
    pub data: String,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub record_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ttl: Option<i64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct UpdateRecordParams {
    pub recordid: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub host: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<String>,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub record_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ttl: Option<i64>,
}

/// The `domain` API module.
pub struct Domains<'a> {
    pub(super) client: &'a GlesysClient,
}

impl Domains<'_> {
    pub async fn add(&self, params: &DnsDomainParams) -> Result<DnsDomain, ApiError> {
        self.client.call("domain/add", params, "domain").await
    }

    pub async fn details(&self, name: &str) -> Result<DnsDomain, ApiError> {
        self.client
            .call("domain/details", &json!({ "domainname": name }), "domain")
            .await
    }

    pub async fn edit(&self, params: &DnsDomainParams) -> Result<DnsDomain, ApiError> {
        self.client.call("domain/edit", params, "domain").await
    }

    pub async fn delete(&self, name: &str) -> Result<(), ApiError> {
        self.client
            .exec("domain/delete", &json!({ "domainname": name }))
            .await
    }

    pub async fn list_records(&self, name: &str) -> Result<Vec<DnsRecord>, ApiError> {
        self.client
            .call("domain/listrecords", &json!({ "domainname": name }), "records")
            .await
    }

    pub async fn add_record(&self, params: &AddRecordParams) -> Result<DnsRecord, ApiError> {
        self.client.call("domain/addrecord", params, "record").await
    }

    pub async fn update_record(&self, params: &UpdateRecordParams) -> Result<DnsRecord, ApiError> {
        self.client.call("domain/updaterecord", params, "record").await
    }

    pub async fn delete_record(&self, recordid: i64) -> Result<(), ApiError> {
        self.client
            .exec("domain/deleterecord", &json!({ "recordid": recordid }))
            .await
    }
}
