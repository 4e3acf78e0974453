//! Load balancers and their backends, frontends and targets.
//!
//! Sub-objects have no ids of their own; they are addressed by name inside
//! the load balancer and show up in its details.

use serde::{Deserialize, Serialize};
use serde_json::json;

use super::{de, ApiError, GlesysClient};

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct LoadBalancer {
    #[serde(rename = "loadbalancerid", deserialize_with = "de::string")]
    pub id: String,
    #[serde(default, deserialize_with = "de::string")]
    pub name: String,
    #[serde(default, deserialize_with = "de::string")]
    pub datacenter: String,
    #[serde(default, rename = "ipaddress")]
    pub iplist: Vec<LoadBalancerIp>,
    #[serde(default)]
    pub blacklist: Vec<String>,
    #[serde(default)]
    pub backends: Vec<Backend>,
    #[serde(default)]
    pub frontends: Vec<Frontend>,
}

impl LoadBalancer {
    pub fn backend(&self, name: &str) -> Option<&Backend> {
        self.backends.iter().find(|b| b.name == name)
    }

    pub fn frontend(&self, name: &str) -> Option<&Frontend> {
        self.frontends.iter().find(|f| f.name == name)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct LoadBalancerIp {
    #[serde(deserialize_with = "de::string")]
    pub ipaddress: String,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct Backend {
    #[serde(deserialize_with = "de::string")]
    pub name: String,
    #[serde(default, deserialize_with = "de::string")]
    pub mode: String,
    #[serde(default, deserialize_with = "de::string")]
    pub status: String,
    #[serde(default, deserialize_with = "de::string")]
    pub stickysession: String,
    #[serde(default, deserialize_with = "de::int")]
    pub connecttimeout: i64,
    #[serde(default, deserialize_with = "de::int")]
    pub responsetimeout: i64,
    #[serde(default)]
    pub targets: Vec<Target>,
}

impl Backend {
    pub fn target(&self, name: &str) -> Option<&Target> {
        self.targets.iter().find(|t| t.name == name)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct Target {
    #[serde(deserialize_with = "de::string")]
    pub name: String,
    #[serde(default, deserialize_with = "de::string")]
    pub targetip: String,
    #[serde(default, deserialize_with = "de::int")]
    pub port: i64,
    #[serde(default, deserialize_with = "de::int")]
    pub weight: i64,
    #[serde(default, deserialize_with = "de::string")]
    pub status: String,
    #[serde(default, deserialize_with = "de::boolean")]
    pub enabled: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct Frontend {
    #[serde(deserialize_with = "de::string")]
    pub name: String,
    #[serde(default, deserialize_with = "de::string")]
    pub backend: String,
    #[serde(default, deserialize_with = "de::int")]
    pub port: i64,
    #[serde(default, deserialize_with = "de::int")]
    pub clienttimeout: i64,
    #[serde(default, deserialize_with = "de::int")]
    pub maxconnections: i64,
    #[serde(default, deserialize_with = "de::string")]
    pub sslcertificate: String,
    #[serde(default, deserialize_with = "de::string")]
    pub status: String,
}

/// Parameters for `loadbalancer/addbackend` and `editbackend`.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct BackendParams {
    pub loadbalancerid: String,
    #[serde(rename = "backendname")]
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mode: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stickysessions: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub connecttimeout: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub responsetimeout: Option<i64>,
}

/// Parameters for `loadbalancer/addfrontend` and `editfrontend`.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct FrontendParams {
    pub loadbalancerid: String,
    #[serde(rename = "frontendname")]
    pub name: String,
    #[serde(rename = "backendname", skip_serializing_if = "Option::is_none")]
    pub backend: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub port: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub clienttimeout: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub maxconnections: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sslcertificate: Option<String>,
}

/// Parameters for `loadbalancer/addtarget` and `edittarget`.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TargetParams {
    pub loadbalancerid: String,
    #[serde(rename = "backendname")]
    pub backend: String,
    #[serde(rename = "targetname")]
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub targetip: Option<String>,
    #[serde(rename = "targetport", skip_serializing_if = "Option::is_none")]
    pub port: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub weight: Option<i64>,
}

/// The `loadbalancer` API module.
pub struct LoadBalancers<'a> {
    pub(super) client: &'a GlesysClient,
}

impl LoadBalancers<'_> {
    pub async fn create(&self, datacenter: &str, name: &str) -> Result<LoadBalancer, ApiError> {
        self.client
            .call(
                "loadbalancer/create",
                &json!({ "datacenter": datacenter, "name": name }),
                "loadbalancer",
            )
            .await
    }

    pub async fn details(&self, id: &str) -> Result<LoadBalancer, ApiError> {
        self.client
            .call("loadbalancer/details", &json!({ "loadbalancerid": id }), "loadbalancer")
            .await
    }

    pub async fn edit(&self, id: &str, name: &str) -> Result<LoadBalancer, ApiError> {
        self.client
            .call(
                "loadbalancer/edit",
                &json!({ "loadbalancerid": id, "name": name }),
                "loadbalancer",
            )
            .await
    }

    pub async fn destroy(&self, id: &str) -> Result<(), ApiError> {
        self.client
            .exec("loadbalancer/destroy", &json!({ "loadbalancerid": id }))
            .await
    }

    pub async fn add_backend(&self, params: &BackendParams) -> Result<LoadBalancer, ApiError> {
        self.client.call("loadbalancer/addbackend", params, "loadbalancer").await
    }

    pub async fn edit_backend(&self, params: &BackendParams) -> Result<LoadBalancer, ApiError> {
        self.client.call("loadbalancer/editbackend", params, "loadbalancer").await
    }

    pub async fn remove_backend(&self, id: &str, name: &str) -> Result<(), ApiError> {
        self.client
            .exec(
                "loadbalancer/removebackend",
                &json!({ "loadbalancerid": id, "backendname": name }),
            )
            .await
    }

    pub async fn add_frontend(&self, params: &FrontendParams) -> Result<LoadBalancer, ApiError> {
        self.client.call("loadbalancer/addfrontend", params, "loadbalancer").await
    }

    pub async fn edit_frontend(&self, params: &FrontendParams) -> Result<LoadBalancer, ApiError> {
        self.client.call("loadbalancer/editfrontend", params, "loadbalancer").await
    }

    pub async fn remove_frontend(&self, id: &str, name: &str) -> Result<(), ApiError> {
        self.client
            .exec(
                "loadbalancer/removefrontend",
                &json!({ "loadbalancerid": id, "frontendname": name }),
            )
            .await
    }

    pub async fn add_target(&self, params: &TargetParams) -> Result<LoadBalancer, ApiError> {
        self.client.call("loadbalancer/addtarget", params, "loadbalancer").await
    }

    pub async fn edit_target(&self, params: &TargetParams) -> Result<LoadBalancer, ApiError> {
        self.client.call("loadbalancer/edittarget", params, "loadbalancer").await
    }

    /// Enable or disable a target inside a backend.
    pub async fn toggle_target(&self, id: &str, backend: &str, name: &str, enabled: bool) -> Result<(), ApiError> {
        let path = if enabled {
            "loadbalancer/enabletarget"
        } else {
            "loadbalancer/disabletarget"
        };
        self.client
            .exec(
                path,
                &json!({ "loadbalancerid": id, "backendname": backend, "targetname": name }),
            )
            .await
    }

    pub async fn remove_target(&self, id: &str, backend: &str, name: &str) -> Result<(), ApiError> {
        self.client
            .exec(
                "loadbalancer/removetarget",
                &json!({ "loadbalancerid": id, "backendname": backend, "targetname": name }),
            )
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup_sub_objects_by_name() {
        let lb: LoadBalancer = serde_json::from_value(json!({
            "loadbalancerid": "lb1",
            "ipaddress": [{"ipaddress": "192.0.2.1"}],
            "backends": [{
                "name": "web",
                "connecttimeout": "4000",
                "targets": [{"name": "web01", "targetip": "10.0.0.1", "port": 80, "enabled": "true"}]
            }],
            "frontends": [{"name": "http", "backend": "web", "port": 80}]
        }))
        .unwrap();

        let backend = lb.backend("web").unwrap();
        assert_eq!(backend.connecttimeout, 4000);
        assert!(backend.target("web01").unwrap().enabled);
        assert!(backend.target("web02").is_none());
        assert_eq!(lb.frontend("http").unwrap().backend, "web");
        assert!(lb.backend("api").is_none());
    }

    #[test]
    fn test_target_params_wire_names() {
        let params = TargetParams {
            loadbalancerid: "lb1".to_string(),
            backend: "web".to_string(),
            name: "web01".to_string(),
            port: Some(8080),
            ..Default::default()
        };
        assert_eq!(
            serde_json::to_value(&params).unwrap(),
            json!({"loadbalancerid": "lb1", "backendname": "web", "targetname": "web01", "targetport": 8080})
        );
    }
}
