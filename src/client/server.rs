use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

use super::{de, ApiError, GlesysClient};

/// Name the API gives the first adapter of a VMware server.
pub const PRIMARY_ADAPTER_NAME: &str = "Network adapter 1";

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct ServerDetails {
    #[serde(deserialize_with = "de::string")]
    pub serverid: String,
    #[serde(default, deserialize_with = "de::string")]
    pub hostname: String,
    #[serde(default, deserialize_with = "de::string")]
    pub description: String,
    #[serde(default, rename = "cpucores", deserialize_with = "de::int")]
    pub cpu: i64,
    #[serde(default, rename = "memorysize", deserialize_with = "de::int")]
    pub memory: i64,
    #[serde(default, rename = "disksize", deserialize_with = "de::int")]
    pub storage: i64,
    #[serde(default, deserialize_with = "de::int")]
    pub bandwidth: i64,
    #[serde(default, deserialize_with = "de::string")]
    pub datacenter: String,
    #[serde(default, deserialize_with = "de::string")]
    pub platform: String,
    #[serde(default, rename = "templatename", deserialize_with = "de::string")]
    pub template: String,
    #[serde(default)]
    pub initialtemplate: InitialTemplate,
    #[serde(default, deserialize_with = "de::boolean")]
    pub islocked: bool,
    #[serde(default, deserialize_with = "de::boolean")]
    pub isrunning: bool,
    #[serde(default)]
    pub iplist: Vec<ServerIp>,
    #[serde(default)]
    pub additionaldisks: Vec<ServerDisk>,
    #[serde(default)]
    pub backup: ServerBackup,
}

impl ServerDetails {
    /// First address of the given IP version.
    pub fn address(&self, version: i64) -> Option<&str> {
        self.iplist
            .iter()
            .find(|ip| ip.version == version)
            .map(|ip| ip.ipaddress.as_str())
    }

    /// The template string to keep in state.
    ///
    /// The API reports the resolved template name, while the configuration
    /// may name the template by one of its tags or by its id. Keep the
    /// configured value when it still refers to the initial template.
    pub fn template_for(&self, configured: &str) -> String {
        let matches_tag = self.initialtemplate.curenttags.iter().any(|t| t == configured);
        if matches_tag || (!configured.is_empty() && configured == self.initialtemplate.id) {
            configured.to_string()
        } else {
            self.template.clone()
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct InitialTemplate {
    #[serde(default, deserialize_with = "de::string")]
    pub id: String,
    #[serde(default, deserialize_with = "de::string")]
    pub name: String,
    /// Spelled this way by the API.
    #[serde(default)]
    pub curenttags: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct ServerIp {
    #[serde(deserialize_with = "de::string")]
    pub ipaddress: String,
    #[serde(default, deserialize_with = "de::int")]
    pub version: i64,
}

/// An extra disk attached to a server.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct ServerDisk {
    #[serde(deserialize_with = "de::string")]
    pub id: String,
    #[serde(default, deserialize_with = "de::string")]
    pub name: String,
    #[serde(default, deserialize_with = "de::int")]
    pub sizeingib: i64,
    #[serde(default, deserialize_with = "de::int")]
    pub scsiid: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct ServerBackup {
    #[serde(default)]
    pub schedules: Vec<BackupSchedule>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackupSchedule {
    pub frequency: String,
    #[serde(deserialize_with = "de::int")]
    pub numberofimagestokeep: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct User {
    pub username: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    pub publickeys: Vec<String>,
}

/// Parameters for `server/create`. Fields left `None` are filled by
/// [`CreateServerParams::with_defaults`].
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CreateServerParams {
    pub hostname: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub datacenter: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub platform: Option<String>,
    #[serde(rename = "templatename", skip_serializing_if = "Option::is_none")]
    pub template: Option<String>,
    #[serde(rename = "cpucores", skip_serializing_if = "Option::is_none")]
    pub cpu: Option<i64>,
    #[serde(rename = "memorysize", skip_serializing_if = "Option::is_none")]
    pub memory: Option<i64>,
    #[serde(rename = "disksize", skip_serializing_if = "Option::is_none")]
    pub storage: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bandwidth: Option<i64>,
    #[serde(rename = "ip", skip_serializing_if = "Option::is_none")]
    pub ipv4: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ipv6: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub publickey: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub campaigncode: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cloudconfig: Option<String>,
    #[serde(skip_serializing_if = "Map::is_empty")]
    pub cloudconfigparams: Map<String, Value>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub users: Vec<User>,
    #[serde(rename = "backupschedules", skip_serializing_if = "Vec::is_empty")]
    pub backup: Vec<BackupSchedule>,
}

impl CreateServerParams {
    /// Fill unset sizing and placement fields with the API's usual defaults:
    /// a small Debian KVM server in Falkenberg with any free addresses.
    pub fn with_defaults(mut self) -> Self {
        self.bandwidth.get_or_insert(100);
        self.cpu.get_or_insert(2);
        self.memory.get_or_insert(2048);
        self.storage.get_or_insert(20);
        self.datacenter.get_or_insert_with(|| "Falkenberg".to_string());
        self.ipv4.get_or_insert_with(|| "any".to_string());
        self.ipv6.get_or_insert_with(|| "any".to_string());
        self.platform.get_or_insert_with(|| "KVM".to_string());
        self.template.get_or_insert_with(|| "debian-12".to_string());
        self
    }
}

/// Parameters for `server/edit`; only the fields that are `Some` are sent.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct EditServerParams {
    pub serverid: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hostname: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(rename = "cpucores", skip_serializing_if = "Option::is_none")]
    pub cpu: Option<i64>,
    #[serde(rename = "memorysize", skip_serializing_if = "Option::is_none")]
    pub memory: Option<i64>,
    #[serde(rename = "disksize", skip_serializing_if = "Option::is_none")]
    pub storage: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bandwidth: Option<i64>,
    #[serde(rename = "backupschedules", skip_serializing_if = "Option::is_none")]
    pub backup: Option<Vec<BackupSchedule>>,
}

impl EditServerParams {
    pub fn new(serverid: impl Into<String>) -> Self {
        Self {
            serverid: serverid.into(),
            ..Self::default()
        }
    }

    /// True when nothing but the id would be sent.
    pub fn is_empty(&self) -> bool {
        *self == Self::new(self.serverid.clone())
    }
}

/// A network adapter as listed under a server or fetched on its own.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct NetworkAdapter {
    #[serde(rename = "networkadapterid", deserialize_with = "de::string")]
    pub id: String,
    #[serde(default, deserialize_with = "de::string")]
    pub adaptertype: String,
    #[serde(default, deserialize_with = "de::int")]
    pub bandwidth: i64,
    #[serde(default, deserialize_with = "de::string")]
    pub name: String,
    #[serde(default, deserialize_with = "de::string")]
    pub networkid: String,
    #[serde(default, deserialize_with = "de::string")]
    pub serverid: String,
    #[serde(default, deserialize_with = "de::boolean")]
    pub isprimary: bool,
}

impl NetworkAdapter {
    pub fn is_primary(&self) -> bool {
        self.isprimary || self.name == PRIMARY_ADAPTER_NAME
    }
}

/// The `server` API module.
pub struct Servers<'a> {
    pub(super) client: &'a GlesysClient,
}

impl Servers<'_> {
    pub async fn create(&self, params: &CreateServerParams) -> Result<ServerDetails, ApiError> {
        self.client.call("server/create", params, "server").await
    }

    pub async fn details(&self, serverid: &str) -> Result<ServerDetails, ApiError> {
        self.client
            .call("server/details", &json!({ "serverid": serverid }), "server")
            .await
    }

    pub async fn edit(&self, params: &EditServerParams) -> Result<ServerDetails, ApiError> {
        self.client.call("server/edit", params, "server").await
    }

    pub async fn destroy(&self, serverid: &str, keep_ip: bool) -> Result<(), ApiError> {
        self.client
            .exec(
                "server/destroy",
                &json!({ "serverid": serverid, "keepip": if keep_ip { 1 } else { 0 } }),
            )
            .await
    }

    pub async fn network_adapters(&self, serverid: &str) -> Result<Vec<NetworkAdapter>, ApiError> {
        self.client
            .call(
                "server/networkadapters",
                &json!({ "serverid": serverid }),
                "networkadapters",
            )
            .await
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CreateServerDiskParams {
    pub serverid: String,
    pub sizeingib: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

/// The `serverdisk` API module.
pub struct ServerDisks<'a> {
    pub(super) client: &'a GlesysClient,
}

impl ServerDisks<'_> {
    pub async fn create(&self, params: &CreateServerDiskParams) -> Result<ServerDisk, ApiError> {
        self.client.call("serverdisk/create", params, "disk").await
    }

    pub async fn update_name(&self, id: &str, name: &str) -> Result<ServerDisk, ApiError> {
        self.client
            .call("serverdisk/updatename", &json!({ "id": id, "name": name }), "disk")
            .await
    }

    pub async fn reconfigure(&self, id: &str, sizeingib: i64) -> Result<ServerDisk, ApiError> {
        self.client
            .call(
                "serverdisk/reconfigure",
                &json!({ "id": id, "sizeingib": sizeingib }),
                "disk",
            )
            .await
    }

    pub async fn delete(&self, id: &str) -> Result<(), ApiError> {
        self.client.exec("serverdisk/delete", &json!({ "id": id })).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn details() -> ServerDetails {
        serde_json::from_value(json!({
            "serverid": "wps123",
            "hostname": "web01",
            "cpucores": "2",
            "memorysize": 4096,
            "templatename": "Debian 12 64-bit",
            "initialtemplate": {"id": "tpl-1", "name": "Debian 12", "curenttags": ["debian-12", "debian"]},
            "islocked": "no",
            "isrunning": true,
            "iplist": [
                {"ipaddress": "2001:db8::1", "version": 6},
                {"ipaddress": "192.0.2.10", "version": "4"}
            ]
        }))
        .unwrap()
    }

    #[test]
    fn test_details_decoding() {
        let srv = details();
        assert_eq!(srv.cpu, 2);
        assert_eq!(srv.memory, 4096);
        assert!(!srv.islocked);
        assert!(srv.isrunning);
        assert_eq!(srv.address(4), Some("192.0.2.10"));
        assert_eq!(srv.address(6), Some("2001:db8::1"));
        assert!(srv.additionaldisks.is_empty());
    }

    #[test]
    fn test_template_for() {
        let srv = details();
        assert_eq!(srv.template_for("debian-12"), "debian-12");
        assert_eq!(srv.template_for("tpl-1"), "tpl-1");
        assert_eq!(srv.template_for("ubuntu-24-04"), "Debian 12 64-bit");
        assert_eq!(srv.template_for(""), "Debian 12 64-bit");
    }

    #[test]
    fn test_create_defaults_keep_explicit_values() {
        let params = CreateServerParams {
            hostname: "web01".to_string(),
            cpu: Some(4),
            platform: Some("VMware".to_string()),
            ..Default::default()
        }
        .with_defaults();

        assert_eq!(params.cpu, Some(4));
        assert_eq!(params.platform.as_deref(), Some("VMware"));
        assert_eq!(params.memory, Some(2048));
        assert_eq!(params.template.as_deref(), Some("debian-12"));

        let body = serde_json::to_value(&params).unwrap();
        assert_eq!(body["cpucores"], 4);
        assert_eq!(body["ip"], "any");
        assert!(body.get("users").is_none());
        assert!(body.get("cloudconfigparams").is_none());
    }

    #[test]
    fn test_edit_params_skip_unset() {
        let mut params = EditServerParams::new("wps123");
        assert!(params.is_empty());
        params.memory = Some(4096);
        assert!(!params.is_empty());
        assert_eq!(
            serde_json::to_value(&params).unwrap(),
            json!({"serverid": "wps123", "memorysize": 4096})
        );
    }

    #[test]
    fn test_primary_adapter() {
        let adapter: NetworkAdapter =
            serde_json::from_value(json!({"networkadapterid": "na1", "name": "Network adapter 1"})).unwrap();
        assert!(adapter.is_primary());
        let adapter: NetworkAdapter =
            serde_json::from_value(json!({"networkadapterid": "na2", "name": "eth1", "isprimary": false})).unwrap();
        assert!(!adapter.is_primary());
    }
}
