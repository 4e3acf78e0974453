//! The GleSYS provider: routes host calls to resource and data source types.

use std::collections::BTreeMap;

use serde_json::Value;
use tokio::sync::RwLock;
use tracing::{debug, info};

use crate::client::GlesysClient;
use crate::config::ProviderConfig;
use crate::data_sources::{self, DataSource};
use crate::error::ProviderError;
use crate::plan::plan_resource;
use crate::resources::{self, Resource};
use crate::schema::{Diagnostic, ProviderSchema};
use crate::server::ProviderService;
use crate::state::ResourceData;
use crate::types::{ImportedResource, PlanResult};
use crate::validation::validate;

/// Provider serving every `glesys_*` resource and data source type.
///
/// The API client is set by `Configure`. Lifecycle calls made before that
/// fail with a configuration error.
pub struct GlesysProvider {
    client: RwLock<Option<GlesysClient>>,
    resources: BTreeMap<&'static str, Box<dyn Resource>>,
    data_sources: BTreeMap<&'static str, Box<dyn DataSource>>,
}

impl GlesysProvider {
    pub fn new() -> Self {
        Self {
            client: RwLock::new(None),
            resources: resources::all().into_iter().map(|r| (r.name(), r)).collect(),
            data_sources: data_sources::all().into_iter().map(|d| (d.name(), d)).collect(),
        }
    }

    /// A provider that is already configured with `client`.
    pub fn with_client(client: GlesysClient) -> Self {
        Self {
            client: RwLock::new(Some(client)),
            ..Self::new()
        }
    }

    async fn client(&self) -> Result<GlesysClient, ProviderError> {
        self.client.read().await.clone().ok_or_else(|| {
            ProviderError::Configuration("provider is not configured, Configure must run first".to_string())
        })
    }

    fn resource(&self, resource_type: &str) -> Result<&dyn Resource, ProviderError> {
        self.resources
            .get(resource_type)
            .map(Box::as_ref)
            .ok_or_else(|| ProviderError::UnknownResource(resource_type.to_string()))
    }

    fn data_source(&self, data_source_type: &str) -> Result<&dyn DataSource, ProviderError> {
        self.data_sources
            .get(data_source_type)
            .map(Box::as_ref)
            .ok_or_else(|| ProviderError::UnknownResource(format!("data source {}", data_source_type)))
    }
}

impl Default for GlesysProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl ProviderService for GlesysProvider {
    fn schema(&self) -> ProviderSchema {
        let schema = ProviderSchema::new().with_provider_config(ProviderConfig::schema());
        let schema = self
            .resources
            .values()
            .fold(schema, |schema, r| schema.with_resource(r.name(), r.schema()));
        self.data_sources
            .values()
            .fold(schema, |schema, d| schema.with_data_source(d.name(), d.schema()))
    }

    async fn validate_provider_config(&self, config: Value) -> Result<Vec<Diagnostic>, ProviderError> {
        Ok(validate(&ProviderConfig::schema(), &config))
    }

    async fn configure(&self, config: Value) -> Result<Vec<Diagnostic>, ProviderError> {
        let client = ProviderConfig::from_value(&config).and_then(|config| {
            debug!(?config, "resolved provider configuration");
            GlesysClient::new(&config).map_err(|e| ProviderError::Configuration(e.to_string()))
        });

        match client {
            Ok(client) => {
                *self.client.write().await = Some(client);
                info!("provider configured");
                Ok(vec![])
            },
            Err(err) => Ok(vec![
                Diagnostic::error("Invalid provider configuration").with_detail(err.message()),
            ]),
        }
    }

    async fn validate_resource_config(
        &self,
        resource_type: &str,
        config: Value,
    ) -> Result<Vec<Diagnostic>, ProviderError> {
        let resource = self.resource(resource_type)?;
        Ok(validate(&resource.schema(), &config))
    }

    async fn plan(
        &self,
        resource_type: &str,
        prior_state: Option<Value>,
        proposed_state: Value,
        _config: Value,
    ) -> Result<PlanResult, ProviderError> {
        let resource = self.resource(resource_type)?;
        Ok(plan_resource(&resource.schema(), prior_state.as_ref(), proposed_state))
    }

    async fn create(&self, resource_type: &str, planned_state: Value) -> Result<Value, ProviderError> {
        let resource = self.resource(resource_type)?;
        let client = self.client().await?;

        let mut d = ResourceData::new(planned_state);
        resource.create(&client, &mut d).await?;
        if d.id().is_empty() {
            return Err(ProviderError::Internal(format!(
                "{} was created but could not be read back",
                resource_type
            )));
        }
        info!(resource_type, id = d.id(), "created");
        Ok(d.into_state())
    }

    async fn read(&self, resource_type: &str, current_state: Value) -> Result<Value, ProviderError> {
        let resource = self.resource(resource_type)?;
        let mut d = ResourceData::new(current_state);
        if d.id().is_empty() {
            return Ok(Value::Null);
        }

        let client = self.client().await?;
        resource.read(&client, &mut d).await?;
        Ok(d.into_state())
    }

    async fn update(
        &self,
        resource_type: &str,
        prior_state: Value,
        planned_state: Value,
    ) -> Result<Value, ProviderError> {
        let resource = self.resource(resource_type)?;
        let client = self.client().await?;

        let mut d = ResourceData::with_prior(prior_state, planned_state);
        resource.update(&client, &mut d).await?;
        Ok(d.into_state())
    }

    async fn delete(&self, resource_type: &str, current_state: Value) -> Result<(), ProviderError> {
        let resource = self.resource(resource_type)?;
        let mut d = ResourceData::new(current_state);
        if d.id().is_empty() {
            return Ok(());
        }

        let client = self.client().await?;
        match resource.delete(&client, &mut d).await {
            Err(err) if err.is_not_found() => {
                info!(resource_type, id = d.id(), "already deleted");
                Ok(())
            },
            result => result,
        }
    }

    async fn import_resource(&self, resource_type: &str, id: &str) -> Result<Vec<ImportedResource>, ProviderError> {
        let resource = self.resource(resource_type)?;
        let client = self.client().await?;

        let mut d = resource.import(id)?;
        resource.read(&client, &mut d).await?;
        if d.id().is_empty() {
            return Err(ProviderError::NotFound(format!("{} '{}' does not exist", resource_type, id)));
        }
        Ok(vec![ImportedResource::new(resource_type, d.into_state())])
    }

    async fn validate_data_source_config(
        &self,
        data_source_type: &str,
        config: Value,
    ) -> Result<Vec<Diagnostic>, ProviderError> {
        let data_source = self.data_source(data_source_type)?;
        Ok(validate(&data_source.schema(), &config))
    }

    async fn read_data_source(&self, data_source_type: &str, config: Value) -> Result<Value, ProviderError> {
        let data_source = self.data_source(data_source_type)?;
        let client = self.client().await?;

        let mut d = ResourceData::new(config);
        data_source.read(&client, &mut d).await?;
        Ok(Value::Object(d.attributes().clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use serde_json::json;
    use tokio_test::{assert_err, assert_ok};

    use crate::testing::{
        assert_error_contains, assert_plan_changes_attribute, assert_plan_no_changes, assert_plan_replaces,
        MockTransport, ProviderTester, TestError,
    };

    fn tester() -> (Arc<MockTransport>, ProviderTester<GlesysProvider>) {
        let mock = Arc::new(MockTransport::new());
        let client = GlesysClient::with_transport(mock.clone());
        (mock, ProviderTester::new(GlesysProvider::with_client(client)))
    }

    #[test]
    fn test_metadata_lists_all_types() {
        let (_mock, tester) = tester();
        let resources = tester.resource_types();
        assert_eq!(resources.len(), 18);
        assert!(resources.contains(&"glesys_server".to_string()));
        assert!(resources.contains(&"glesys_loadbalancer_target".to_string()));

        let mut data_sources = tester.data_source_types();
        data_sources.sort();
        assert_eq!(
            data_sources,
            vec!["glesys_dnsdomain", "glesys_network", "glesys_networkadapter"]
        );
        assert!(tester.schema().provider.attribute("token").is_some());
    }

    #[tokio::test]
    async fn test_configure_reports_diagnostics() {
        let provider = GlesysProvider::new();
        let diagnostics = provider
            .configure(json!({"userid": "CL12345", "token": "secret", "api_endpoint": "not a url"}))
            .await
            .unwrap();
        assert_error_contains(&diagnostics, "api_endpoint");

        let tester = ProviderTester::new(provider);
        let err = tester.create("glesys_network", json!({})).await.unwrap_err();
        assert!(matches!(err, ProviderError::Configuration(_)));
    }

    #[tokio::test]
    async fn test_configure_success() {
        let tester = ProviderTester::new(GlesysProvider::new());
        assert_ok!(
            tester
                .configure(json!({"userid": "CL12345", "token": "secret", "api_endpoint": "http://127.0.0.1:9"}))
                .await
        );
        assert!(tester.provider().client().await.is_ok());
    }

    #[tokio::test]
    async fn test_validate_rejects_unknown_allowed_value() {
        let (_mock, tester) = tester();
        let result = tester
            .validate_resource_config("glesys_dnsdomain", json!({"name": "example.com", "createrecords": "maybe"}))
            .await;
        match result {
            Err(TestError::Diagnostics(diagnostics)) => assert_error_contains(&diagnostics, "createrecords"),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_unknown_resource_type() {
        let (_mock, tester) = tester();
        let err = tester.read("glesys_teapot", json!({"id": "1"})).await.unwrap_err();
        assert!(matches!(err, ProviderError::UnknownResource(_)));
    }

    #[tokio::test]
    async fn test_network_lifecycle() {
        let (mock, tester) = tester();
        mock.respond("network/create", json!({"network": {"networkid": "vl1"}}));
        mock.respond(
            "network/details",
            json!({"network": {"networkid": "vl1", "datacenter": "Falkenberg", "description": "lan", "public": "no"}}),
        );

        let state = tester
            .lifecycle_create("glesys_network", json!({"datacenter": "Falkenberg", "description": "lan"}))
            .await
            .unwrap();
        assert_eq!(state["id"], "vl1");
        assert_eq!(state["public"], "no");

        let plan = tester.plan_update("glesys_network", state.clone(), state.clone()).await.unwrap();
        assert_plan_no_changes(&plan);

        let mut moved = state.clone();
        moved["datacenter"] = json!("Stockholm");
        let plan = tester.plan_update("glesys_network", state.clone(), moved).await.unwrap();
        assert_plan_replaces(&plan);
        assert_plan_changes_attribute(&plan, "datacenter");
    }

    #[tokio::test]
    async fn test_read_of_vanished_resource_is_null() {
        let (mock, tester) = tester();
        mock.fail("network/details", 404, "Network not found");

        let state = tester.read("glesys_network", json!({"id": "vl1"})).await.unwrap();
        assert_eq!(state, Value::Null);
    }

    #[tokio::test]
    async fn test_delete_not_found_is_success() {
        let (mock, tester) = tester();
        mock.fail("network/delete", 404, "Network not found");
        assert_ok!(tester.delete("glesys_network", json!({"id": "vl1"})).await);

        mock.fail("ip/release", 500, "Internal error");
        assert_err!(tester.delete("glesys_ip", json!({"id": "192.0.2.44"})).await);
    }

    #[tokio::test]
    async fn test_import_composite_id() {
        let (mock, tester) = tester();
        mock.respond(
            "domain/listrecords",
            json!({"records": [{"recordid": 12, "domainname": "example.com", "host": "www", "type": "A", "data": "192.0.2.1", "ttl": 600}]}),
        );

        let imported = tester
            .import_resource("glesys_dnsdomain_record", "example.com,12")
            .await
            .unwrap();
        assert_eq!(imported.len(), 1);
        assert_eq!(imported[0].state["domain"], "example.com");
        assert_eq!(imported[0].state["host"], "www");

        let err = tester
            .import_resource("glesys_dnsdomain_record", "example.com,99")
            .await
            .unwrap_err();
        assert!(err.is_not_found());

        let err = tester
            .import_resource("glesys_dnsdomain_record", "example.com,www")
            .await
            .unwrap_err();
        assert!(matches!(err, ProviderError::Validation(_)));
    }

    #[tokio::test]
    async fn test_read_data_source() {
        let (mock, tester) = tester();
        mock.respond(
            "network/details",
            json!({"network": {"networkid": "internet-fbg", "datacenter": "Falkenberg", "public": "yes"}}),
        );

        let state = tester
            .read_data_source("glesys_network", json!({"id": "internet-fbg"}))
            .await
            .unwrap();
        assert_eq!(state["public"], "yes");
    }
}
