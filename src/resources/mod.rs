//! Managed resource types.
//!
//! Every resource type implements [`Resource`]: a schema plus the four
//! lifecycle handlers working on a [`ResourceData`]. Handlers share a few
//! conventions:
//!
//! - `create` stores the new id and finishes with `read`
//! - `read` clears the id when the remote object is gone, see [`found`]
//! - `update` sends only the attributes whose value changed
//! - `delete` does not need to handle not-found; the provider treats it as
//!   success for every type

mod database;
mod dnsdomain;
mod dnsdomain_record;
mod email;
mod ip;
mod loadbalancer;
mod network;
mod objectstorage;
mod privatenetwork;
mod server;
mod server_disk;

use async_trait::async_trait;
use serde_json::json;
use tracing::info;

use crate::client::{ApiError, GlesysClient};
use crate::error::ProviderError;
use crate::schema::Schema;
use crate::state::ResourceData;

pub use database::DatabaseResource;
pub use dnsdomain::DnsDomainResource;
pub use dnsdomain_record::DnsDomainRecordResource;
pub use email::{EmailAccountResource, EmailAliasResource};
pub use ip::IpResource;
pub use loadbalancer::{
    LoadBalancerBackendResource, LoadBalancerFrontendResource, LoadBalancerResource, LoadBalancerTargetResource,
};
pub use network::{NetworkAdapterResource, NetworkResource};
pub use objectstorage::{ObjectStorageCredentialResource, ObjectStorageInstanceResource};
pub use privatenetwork::{PrivateNetworkResource, PrivateNetworkSegmentResource};
pub use server::ServerResource;
pub use server_disk::ServerDiskResource;

/// One managed resource type.
#[async_trait]
pub trait Resource: Send + Sync {
    /// Type name as used in configurations, e.g. `glesys_server`.
    fn name(&self) -> &'static str;

    fn schema(&self) -> Schema;

    async fn create(&self, client: &GlesysClient, d: &mut ResourceData) -> Result<(), ProviderError>;

    async fn read(&self, client: &GlesysClient, d: &mut ResourceData) -> Result<(), ProviderError>;

    /// Types whose attributes are all force-new never get here.
    async fn update(&self, _client: &GlesysClient, _d: &mut ResourceData) -> Result<(), ProviderError> {
        Err(ProviderError::Unimplemented(format!("{} cannot be updated in place", self.name())))
    }

    async fn delete(&self, client: &GlesysClient, d: &mut ResourceData) -> Result<(), ProviderError>;

    /// State to `read` for an imported object. The import id becomes the
    /// resource id as-is.
    fn import(&self, id: &str) -> Result<ResourceData, ProviderError> {
        Ok(ResourceData::new(json!({ "id": id })))
    }
}

/// Every resource type the provider serves.
pub fn all() -> Vec<Box<dyn Resource>> {
    vec![
        Box::new(DatabaseResource),
        Box::new(DnsDomainResource),
        Box::new(DnsDomainRecordResource),
        Box::new(EmailAccountResource),
        Box::new(EmailAliasResource),
        Box::new(IpResource),
        Box::new(LoadBalancerResource),
        Box::new(LoadBalancerBackendResource),
        Box::new(LoadBalancerFrontendResource),
        Box::new(LoadBalancerTargetResource),
        Box::new(NetworkResource),
        Box::new(NetworkAdapterResource),
        Box::new(ObjectStorageInstanceResource),
        Box::new(ObjectStorageCredentialResource),
        Box::new(PrivateNetworkResource),
        Box::new(PrivateNetworkSegmentResource),
        Box::new(ServerResource),
        Box::new(ServerDiskResource),
    ]
}

/// Outcome of a lookup in `read`: a not-found answer clears the id and
/// gives `None`, other errors propagate.
pub(crate) fn found<T>(d: &mut ResourceData, result: Result<T, ApiError>) -> Result<Option<T>, ProviderError> {
    match result {
        Ok(value) => Ok(Some(value)),
        Err(err) if err.is_not_found() => {
            info!(id = d.id(), "remote object gone, removing from state");
            d.clear_id();
            Ok(None)
        },
        Err(err) => Err(err.into()),
    }
}

/// Mark a sub-object that disappeared from its parent's listing as gone.
pub(crate) fn gone(d: &mut ResourceData, what: &str) {
    info!(id = d.id(), what, "not found in parent, removing from state");
    d.clear_id();
}

/// Split a composite import id `a,b`.
pub(crate) fn split_import_id<'a>(id: &'a str, format: &str) -> Result<(&'a str, &'a str), ProviderError> {
    match id.split_once(',') {
        Some((a, b)) if !a.is_empty() && !b.is_empty() && !b.contains(',') => Ok((a, b)),
        _ => Err(ProviderError::Validation(format!(
            "invalid import id '{}', expected {}",
            id, format
        ))),
    }
}

/// The changed value of an attribute, `None` when unchanged.
pub(crate) fn changed_str(d: &ResourceData, key: &str) -> Option<String> {
    d.has_change(key).then(|| d.get_str(key).to_string())
}

pub(crate) fn changed_int(d: &ResourceData, key: &str) -> Option<i64> {
    if d.has_change(key) {
        d.get_int(key)
    } else {
        None
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use std::sync::Arc;

    use crate::client::GlesysClient;
    use crate::testing::MockTransport;

    pub fn client() -> (Arc<MockTransport>, GlesysClient) {
        let mock = Arc::new(MockTransport::new());
        let client = GlesysClient::with_transport(mock.clone());
        (mock, client)
    }
}
