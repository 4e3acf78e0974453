//! Typed client for the GleSYS API.
//!
//! [`GlesysClient`] is a cheap handle around a shared [`Transport`]. Each API
//! module (`server`, `domain`, `loadbalancer`, ...) is exposed as a service
//! borrowed from the client:
//!
//! ```ignore
//! let details = client.servers().details("wps123456").await?;
//! ```
//!
//! Parameter structs for edit calls keep every field optional and skip
//! `None` when serializing, so an edit only sends what changed.

mod database;
mod domain;
mod email;
mod error;
mod http;
mod ip;
mod loadbalancer;
mod network;
mod objectstorage;
mod privatenetwork;
mod server;

use std::sync::Arc;

use serde::de::{DeserializeOwned, Error as _};
use serde::Serialize;
use serde_json::Value;

use crate::config::ProviderConfig;

pub use database::*;
pub use domain::*;
pub use email::*;
pub use error::ApiError;
pub use http::{HttpTransport, Transport};
pub use ip::*;
pub use loadbalancer::*;
pub use network::*;
pub use objectstorage::*;
pub use privatenetwork::*;
pub use server::*;

/// Handle to the GleSYS API.
#[derive(Clone)]
pub struct GlesysClient {
    transport: Arc<dyn Transport>,
}

impl GlesysClient {
    /// Client talking HTTP to the configured endpoint.
    pub fn new(config: &ProviderConfig) -> Result<Self, ApiError> {
        Ok(Self::with_transport(Arc::new(HttpTransport::new(config)?)))
    }

    /// Client over an arbitrary transport, e.g. a scripted one in tests.
    pub fn with_transport(transport: Arc<dyn Transport>) -> Self {
        Self { transport }
    }

    pub fn domains(&self) -> Domains<'_> {
        Domains { client: self }
    }

    pub fn servers(&self) -> Servers<'_> {
        Servers { client: self }
    }

    pub fn server_disks(&self) -> ServerDisks<'_> {
        ServerDisks { client: self }
    }

    pub fn ips(&self) -> Ips<'_> {
        Ips { client: self }
    }

    pub fn networks(&self) -> Networks<'_> {
        Networks { client: self }
    }

    pub fn network_adapters(&self) -> NetworkAdapters<'_> {
        NetworkAdapters { client: self }
    }

    pub fn loadbalancers(&self) -> LoadBalancers<'_> {
        LoadBalancers { client: self }
    }

    pub fn email(&self) -> EmailDomains<'_> {
        EmailDomains { client: self }
    }

    pub fn object_storage(&self) -> ObjectStorages<'_> {
        ObjectStorages { client: self }
    }

    pub fn private_networks(&self) -> PrivateNetworks<'_> {
        PrivateNetworks { client: self }
    }

    pub fn databases(&self) -> Databases<'_> {
        Databases { client: self }
    }

    /// POST `body` to `path` and decode the reply member named `key`.
    pub(crate) async fn call<T, B>(&self, path: &str, body: &B, key: &str) -> Result<T, ApiError>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        let mut reply = self.transport.post(path, serde_json::to_value(body)?).await?;
        let value = reply
            .get_mut(key)
            .map(Value::take)
            .ok_or_else(|| serde_json::Error::custom(format!("missing '{}' in {} reply", key, path)))?;
        Ok(serde_json::from_value(value)?)
    }

    /// POST `body` to `path`, ignoring the reply payload.
    pub(crate) async fn exec<B>(&self, path: &str, body: &B) -> Result<(), ApiError>
    where
        B: Serialize + ?Sized,
    {
        self.transport.post(path, serde_json::to_value(body)?).await?;
        Ok(())
    }
}

impl std::fmt::Debug for GlesysClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GlesysClient").finish_non_exhaustive()
    }
}

/// Serde helpers for the API's loosely typed fields.
pub(crate) mod de {
    use serde::{Deserialize, Deserializer};
    use serde_json::Value;

    /// Accept a string, a number, a bool or null as a string.
    pub fn string<'de, D: Deserializer<'de>>(d: D) -> Result<String, D::Error> {
        Ok(match Value::deserialize(d)? {
            Value::String(s) => s,
            Value::Null => String::new(),
            other => other.to_string(),
        })
    }

    /// Accept a number or a numeric string as an integer; anything else is 0.
    pub fn int<'de, D: Deserializer<'de>>(d: D) -> Result<i64, D::Error> {
        Ok(match Value::deserialize(d)? {
            Value::Number(n) => n.as_i64().unwrap_or_default(),
            Value::String(s) => s.trim().parse().unwrap_or_default(),
            _ => 0,
        })
    }

    /// Accept a bool, `"yes"`/`"no"`, `"true"`/`"false"` or `0`/`1`.
    pub fn boolean<'de, D: Deserializer<'de>>(d: D) -> Result<bool, D::Error> {
        Ok(match Value::deserialize(d)? {
            Value::Bool(b) => b,
            Value::Number(n) => n.as_i64().is_some_and(|n| n != 0),
            Value::String(s) => matches!(s.to_ascii_lowercase().as_str(), "yes" | "true" | "1"),
            _ => false,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MockTransport;
    use serde::Deserialize;
    use serde_json::json;

    #[derive(Debug, Deserialize)]
    struct Loose {
        #[serde(deserialize_with = "de::string")]
        name: String,
        #[serde(deserialize_with = "de::int")]
        ttl: i64,
        #[serde(deserialize_with = "de::boolean")]
        flag: bool,
    }

    #[test]
    fn test_loose_deserializers() {
        let v: Loose = serde_json::from_value(json!({"name": 12, "ttl": "3600", "flag": "yes"})).unwrap();
        assert_eq!(v.name, "12");
        assert_eq!(v.ttl, 3600);
        assert!(v.flag);

        let v: Loose = serde_json::from_value(json!({"name": null, "ttl": 60, "flag": 0})).unwrap();
        assert_eq!(v.name, "");
        assert!(!v.flag);
    }

    #[tokio::test]
    async fn test_call_missing_key_is_decode_error() {
        let mock = Arc::new(MockTransport::new());
        mock.respond("server/details", json!({"other": {}}));
        let client = GlesysClient::with_transport(mock);

        let err = client
            .call::<Value, _>("server/details", &json!({}), "server")
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::Decode(_)));
        assert!(err.to_string().contains("missing 'server'"));
    }
}
