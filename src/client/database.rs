use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use super::{de, ApiError, GlesysClient};

/// Status reported once a database accepts connections.
pub const DATABASE_RUNNING: &str = "RUNNING";

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct Database {
    #[serde(deserialize_with = "de::string")]
    pub id: String,
    #[serde(default, deserialize_with = "de::string")]
    pub name: String,
    #[serde(default, deserialize_with = "de::string")]
    pub engine: String,
    #[serde(default, deserialize_with = "de::string")]
    pub engineversion: String,
    #[serde(default, deserialize_with = "de::string")]
    pub datacenterkey: String,
    #[serde(default, deserialize_with = "de::string")]
    pub fqdn: String,
    #[serde(default, deserialize_with = "de::string")]
    pub status: String,
    #[serde(default)]
    pub allowlist: Vec<String>,
    #[serde(default)]
    pub plan: DatabasePlan,
    #[serde(default)]
    pub maintenancewindow: MaintenanceWindow,
}

impl Database {
    pub fn is_running(&self) -> bool {
        self.status == DATABASE_RUNNING
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct DatabasePlan {
    #[serde(default, deserialize_with = "de::string")]
    pub key: String,
    #[serde(default, deserialize_with = "de::int")]
    pub cpucores: i64,
    #[serde(default, deserialize_with = "de::int")]
    pub memoryingib: i64,
    #[serde(default, deserialize_with = "de::int")]
    pub storageingib: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct MaintenanceWindow {
    #[serde(default, deserialize_with = "de::int")]
    pub durationinminutes: i64,
    #[serde(default, deserialize_with = "de::string")]
    pub starttime: String,
    #[serde(default, deserialize_with = "de::string")]
    pub weekday: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CreateDatabaseParams {
    pub name: String,
    pub engine: String,
    pub engineversion: String,
    pub datacenterkey: String,
    pub plankey: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub allowlist: Vec<String>,
}

/// The `database` API module.
pub struct Databases<'a> {
    pub(super) client: &'a GlesysClient,
}

impl Databases<'_> {
    pub async fn create(&self, params: &CreateDatabaseParams) -> Result<Database, ApiError> {
        self.client.call("database/create", params, "database").await
    }

    pub async fn details(&self, id: &str) -> Result<Database, ApiError> {
        self.client
            .call("database/details", &json!({ "id": id }), "database")
            .await
    }

    /// The connection string, which the API reports either bare or wrapped
    /// in an object.
    pub async fn connection_string(&self, id: &str) -> Result<String, ApiError> {
        let value: Value = self
            .client
            .call("database/connectionstring", &json!({ "id": id }), "connectionstring")
            .await?;
        Ok(match value {
            Value::String(s) => s,
            Value::Object(mut obj) => match obj.remove("connectionstring") {
                Some(Value::String(s)) => s,
                _ => String::new(),
            },
            _ => String::new(),
        })
    }

    pub async fn update_allowlist(&self, id: &str, allowlist: &[String]) -> Result<Database, ApiError> {
        self.client
            .call(
                "database/updateallowlist",
                &json!({ "id": id, "allowlist": allowlist }),
                "database",
            )
            .await
    }

    pub async fn delete(&self, id: &str) -> Result<(), ApiError> {
        self.client.exec("database/delete", &json!({ "id": id })).await
    }
}
