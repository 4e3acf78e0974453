//! Test harness for the provider.
//!
//! [`MockTransport`] stands in for the GleSYS API: replies are scripted per
//! endpoint and every request is recorded. [`ProviderTester`] drives a
//! [`ProviderService`] without a gRPC server.
//!
//! ```ignore
//! let mock = Arc::new(MockTransport::new());
//! mock.respond("network/create", json!({"network": {"networkid": "vl1"}}));
//! mock.respond("network/details", json!({"network": {"networkid": "vl1", "description": "lan"}}));
//!
//! let tester = ProviderTester::new(GlesysProvider::with_client(GlesysClient::with_transport(mock.clone())));
//! let state = tester.create("glesys_network", json!({"datacenter": "Falkenberg", "description": "lan"})).await?;
//! assert_eq!(state["id"], "vl1");
//! ```

use std::collections::{HashMap, VecDeque};
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;

use crate::client::{ApiError, Transport};
use crate::error::ProviderError;
use crate::schema::{Diagnostic, DiagnosticSeverity, ProviderSchema};
use crate::server::ProviderService;
use crate::types::{ImportedResource, PlanResult};

#[derive(Debug, Clone)]
enum Reply {
    Payload(Value),
    Status(u16, String),
}

/// In-memory [`Transport`] with scripted replies.
///
/// Each endpoint path owns a queue of replies. Replies are consumed in
/// order and the last one repeats, so a single `respond` answers every call.
/// A call to an endpoint without a script fails with an
/// [`ApiError::InvalidRequest`] naming the path.
#[derive(Debug, Default)]
pub struct MockTransport {
    replies: Mutex<HashMap<String, VecDeque<Reply>>>,
    requests: Mutex<Vec<(String, Value)>>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a successful reply payload for `path`.
    pub fn respond(&self, path: &str, payload: Value) {
        self.push(path, Reply::Payload(payload));
    }

    /// Queue several successful replies for `path`, answered in order.
    pub fn respond_seq<I>(&self, path: &str, payloads: I)
    where
        I: IntoIterator<Item = Value>,
    {
        for payload in payloads {
            self.respond(path, payload);
        }
    }

    /// Queue an API error status for `path`.
    pub fn fail(&self, path: &str, code: u16, text: &str) {
        self.push(path, Reply::Status(code, text.to_string()));
    }

    /// Every request so far as `(path, body)`, in call order.
    pub fn requests(&self) -> Vec<(String, Value)> {
        lock(&self.requests).clone()
    }

    /// Bodies sent to `path`, in call order.
    pub fn requests_to(&self, path: &str) -> Vec<Value> {
        lock(&self.requests)
            .iter()
            .filter(|(p, _)| p == path)
            .map(|(_, body)| body.clone())
            .collect()
    }

    /// Paths called so far, in call order.
    pub fn paths(&self) -> Vec<String> {
        lock(&self.requests).iter().map(|(p, _)| p.clone()).collect()
    }

    fn push(&self, path: &str, reply: Reply) {
        lock(&self.replies)
            .entry(path.to_string())
            .or_default()
            .push_back(reply);
    }

    fn next_reply(&self, path: &str) -> Option<Reply> {
        let mut replies = lock(&self.replies);
        let queue = replies.get_mut(path)?;
        if queue.len() > 1 {
            queue.pop_front()
        } else {
            queue.front().cloned()
        }
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn post(&self, path: &str, body: Value) -> Result<Value, ApiError> {
        lock(&self.requests).push((path.to_string(), body));
        match self.next_reply(path) {
            Some(Reply::Payload(payload)) => Ok(payload),
            Some(Reply::Status(code, text)) => Err(ApiError::from_status(code, text)),
            None => Err(ApiError::InvalidRequest(format!("no scripted reply for {}", path))),
        }
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Drives a [`ProviderService`] the way the host would, without gRPC.
pub struct ProviderTester<P: ProviderService> {
    provider: P,
}

impl<P: ProviderService> ProviderTester<P> {
    pub fn new(provider: P) -> Self {
        Self { provider }
    }

    pub fn provider(&self) -> &P {
        &self.provider
    }

    pub fn schema(&self) -> ProviderSchema {
        self.provider.schema()
    }

    pub fn resource_types(&self) -> Vec<String> {
        self.provider.metadata().resources
    }

    pub fn data_source_types(&self) -> Vec<String> {
        self.provider.metadata().data_sources
    }

    /// Configure the provider; error diagnostics become [`TestError::Diagnostics`].
    pub async fn configure(&self, config: Value) -> Result<(), TestError> {
        let diagnostics = self.provider.configure(config).await?;
        check_diagnostics(diagnostics)
    }

    pub async fn validate_resource_config(&self, resource_type: &str, config: Value) -> Result<(), TestError> {
        let diagnostics = self
            .provider
            .validate_resource_config(resource_type, config)
            .await?;
        check_diagnostics(diagnostics)
    }

    pub async fn plan_create(&self, resource_type: &str, proposed_state: Value) -> Result<PlanResult, ProviderError> {
        self.provider
            .plan(resource_type, None, proposed_state.clone(), proposed_state)
            .await
    }

    pub async fn plan_update(
        &self,
        resource_type: &str,
        prior_state: Value,
        proposed_state: Value,
    ) -> Result<PlanResult, ProviderError> {
        self.provider
            .plan(resource_type, Some(prior_state), proposed_state.clone(), proposed_state)
            .await
    }

    pub async fn create(&self, resource_type: &str, planned_state: Value) -> Result<Value, ProviderError> {
        self.provider.create(resource_type, planned_state).await
    }

    pub async fn read(&self, resource_type: &str, current_state: Value) -> Result<Value, ProviderError> {
        self.provider.read(resource_type, current_state).await
    }

    pub async fn update(
        &self,
        resource_type: &str,
        prior_state: Value,
        planned_state: Value,
    ) -> Result<Value, ProviderError> {
        self.provider
            .update(resource_type, prior_state, planned_state)
            .await
    }

    pub async fn delete(&self, resource_type: &str, current_state: Value) -> Result<(), ProviderError> {
        self.provider.delete(resource_type, current_state).await
    }

    pub async fn import_resource(&self, resource_type: &str, id: &str) -> Result<Vec<ImportedResource>, ProviderError> {
        self.provider.import_resource(resource_type, id).await
    }

    pub async fn read_data_source(&self, data_source_type: &str, config: Value) -> Result<Value, ProviderError> {
        self.provider.read_data_source(data_source_type, config).await
    }

    /// Plan a create, then create from the planned state.
    pub async fn lifecycle_create(&self, resource_type: &str, config: Value) -> Result<Value, ProviderError> {
        let plan = self.plan_create(resource_type, config).await?;
        self.create(resource_type, plan.planned_state).await
    }

    /// Plan an update, then update from the planned state.
    pub async fn lifecycle_update(
        &self,
        resource_type: &str,
        prior_state: Value,
        proposed_state: Value,
    ) -> Result<Value, ProviderError> {
        let plan = self
            .plan_update(resource_type, prior_state.clone(), proposed_state)
            .await?;
        self.update(resource_type, prior_state, plan.planned_state).await
    }
}

/// Failure of a tester call that reports diagnostics.
#[derive(Debug, Error)]
pub enum TestError {
    #[error("operation failed with diagnostics: {}", summaries(.0))]
    Diagnostics(Vec<Diagnostic>),

    #[error("provider error: {0}")]
    Provider(#[from] ProviderError),
}

fn summaries(diagnostics: &[Diagnostic]) -> String {
    diagnostics
        .iter()
        .map(|d| match (&d.attribute, &d.detail) {
            (Some(attr), Some(detail)) => format!("{} ({}): {}", d.summary, attr, detail),
            (Some(attr), None) => format!("{} ({})", d.summary, attr),
            (None, Some(detail)) => format!("{}: {}", d.summary, detail),
            (None, None) => d.summary.clone(),
        })
        .collect::<Vec<_>>()
        .join("; ")
}

fn check_diagnostics(diagnostics: Vec<Diagnostic>) -> Result<(), TestError> {
    let errors: Vec<_> = diagnostics
        .into_iter()
        .filter(|d| d.severity == DiagnosticSeverity::Error)
        .collect();

    if errors.is_empty() {
        Ok(())
    } else {
        Err(TestError::Diagnostics(errors))
    }
}

/// # Panics
///
/// Panics if the plan has any changes.
pub fn assert_plan_no_changes(plan: &PlanResult) {
    assert!(
        plan.changes.is_empty(),
        "Expected no changes, but got {} change(s): {:?}",
        plan.changes.len(),
        plan.changes.iter().map(|c| &c.path).collect::<Vec<_>>()
    );
}

/// # Panics
///
/// Panics if the plan does not require replacement.
pub fn assert_plan_replaces(plan: &PlanResult) {
    assert!(
        plan.requires_replace,
        "Expected plan to require replacement, but it does not"
    );
}

/// # Panics
///
/// Panics if the plan does not change `path`.
pub fn assert_plan_changes_attribute(plan: &PlanResult, path: &str) {
    assert!(
        plan.changes.iter().any(|c| c.path == path),
        "Expected plan to change attribute '{}'. Changed attributes: {:?}",
        path,
        plan.changes.iter().map(|c| &c.path).collect::<Vec<_>>()
    );
}

/// # Panics
///
/// Panics if no error diagnostic mentions `substring` in its summary or detail.
pub fn assert_error_contains(diagnostics: &[Diagnostic], substring: &str) {
    let matched = diagnostics.iter().any(|d| {
        d.severity == DiagnosticSeverity::Error
            && (d.summary.contains(substring) || d.detail.as_deref().is_some_and(|s| s.contains(substring)))
    });
    assert!(
        matched,
        "Expected an error containing '{}'. Errors: {:?}",
        substring,
        diagnostics
            .iter()
            .filter(|d| d.severity == DiagnosticSeverity::Error)
            .map(|d| &d.summary)
            .collect::<Vec<_>>()
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_mock_transport_replays_last_reply() {
        let mock = MockTransport::new();
        mock.respond_seq(
            "server/details",
            [json!({"server": {"islocked": true}}), json!({"server": {"islocked": false}})],
        );

        let first = mock.post("server/details", json!({"serverid": "wps1"})).await.unwrap();
        let second = mock.post("server/details", json!({"serverid": "wps1"})).await.unwrap();
        let third = mock.post("server/details", json!({"serverid": "wps1"})).await.unwrap();

        assert_eq!(first["server"]["islocked"], true);
        assert_eq!(second["server"]["islocked"], false);
        assert_eq!(third, second);
        assert_eq!(mock.requests_to("server/details").len(), 3);
    }

    #[tokio::test]
    async fn test_mock_transport_failures() {
        let mock = MockTransport::new();
        mock.fail("domain/details", 404, "Domain not found");

        let err = mock.post("domain/details", json!({})).await.unwrap_err();
        assert!(err.is_not_found());

        let err = mock.post("domain/add", json!({})).await.unwrap_err();
        assert!(err.to_string().contains("domain/add"));
        assert_eq!(mock.paths(), vec!["domain/details", "domain/add"]);
    }

    #[test]
    fn test_check_diagnostics_ignores_warnings() {
        assert!(check_diagnostics(vec![Diagnostic::warning("deprecated")]).is_ok());

        let err = check_diagnostics(vec![
            Diagnostic::warning("deprecated"),
            Diagnostic::error("Missing token").with_attribute("token"),
        ])
        .unwrap_err();
        match &err {
            TestError::Diagnostics(errors) => assert_eq!(errors.len(), 1),
            other => panic!("unexpected {:?}", other),
        }
        assert!(err.to_string().contains("Missing token (token)"));
    }

    #[test]
    fn test_assert_error_contains_checks_detail() {
        let diagnostics = vec![Diagnostic::error("Invalid provider configuration").with_detail("userid is required")];
        assert_error_contains(&diagnostics, "configuration");
        assert_error_contains(&diagnostics, "userid");
    }

    #[test]
    #[should_panic(expected = "Expected an error containing")]
    fn test_assert_error_contains_ignores_warnings() {
        assert_error_contains(&[Diagnostic::warning("userid is deprecated")], "userid");
    }
}
