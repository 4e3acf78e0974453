//! Load balancers and the named objects inside them.
//!
//! Backends, frontends and targets have no ids of their own: they are
//! addressed by name within their load balancer (and, for targets, within
//! their backend). Their resource id is that name, and `read` looks them up
//! in the load balancer details.

use async_trait::async_trait;
use serde_json::Value;

use super::{changed_int, changed_str, found, gone, Resource};
use crate::client::{BackendParams, FrontendParams, GlesysClient, LoadBalancer, TargetParams};
use crate::error::ProviderError;
use crate::schema::{Attribute, AttributeFlags, Schema};
use crate::state::ResourceData;

/// `glesys_loadbalancer`
pub struct LoadBalancerResource;

#[async_trait]
impl Resource for LoadBalancerResource {
    fn name(&self) -> &'static str {
        "glesys_loadbalancer"
    }

    fn schema(&self) -> Schema {
        Schema::with_id()
            .with_attribute("datacenter", Attribute::required_string().with_force_new())
            .with_attribute("name", Attribute::required_string())
            .with_attribute("iplist", Attribute::string_list(AttributeFlags::computed()))
            .with_attribute("blacklist", Attribute::string_list(AttributeFlags::computed()))
    }

    async fn create(&self, client: &GlesysClient, d: &mut ResourceData) -> Result<(), ProviderError> {
        let lb = client
            .loadbalancers()
            .create(d.get_str("datacenter"), d.get_str("name"))
            .await?;
        d.set_id(lb.id);
        self.read(client, d).await
    }

    async fn read(&self, client: &GlesysClient, d: &mut ResourceData) -> Result<(), ProviderError> {
        let result = client.loadbalancers().details(d.id()).await;
        let Some(lb) = found(d, result)? else {
            return Ok(());
        };

        let ips: Vec<Value> = lb.iplist.into_iter().map(|ip| ip.ipaddress.into()).collect();
        d.set("datacenter", lb.datacenter);
        d.set("name", lb.name);
        d.set("iplist", ips);
        d.set("blacklist", lb.blacklist);
        Ok(())
    }

    async fn update(&self, client: &GlesysClient, d: &mut ResourceData) -> Result<(), ProviderError> {
        if let Some(name) = changed_str(d, "name") {
            client.loadbalancers().edit(d.id(), &name).await?;
        }
        self.read(client, d).await
    }

    async fn delete(&self, client: &GlesysClient, d: &mut ResourceData) -> Result<(), ProviderError> {
        client.loadbalancers().destroy(d.id()).await?;
        d.clear_id();
        Ok(())
    }
}

/// Details of the load balancer named by the `loadbalancerid` attribute;
/// `None` (and a cleared id) when it is gone.
async fn parent(client: &GlesysClient, d: &mut ResourceData) -> Result<Option<LoadBalancer>, ProviderError> {
    let result = client.loadbalancers().details(d.get_str("loadbalancerid")).await;
    found(d, result)
}

/// `glesys_loadbalancer_backend`
pub struct LoadBalancerBackendResource;

#[async_trait]
impl Resource for LoadBalancerBackendResource {
    fn name(&self) -> &'static str {
        "glesys_loadbalancer_backend"
    }

    fn schema(&self) -> Schema {
        Schema::with_id()
            .with_attribute("loadbalancerid", Attribute::required_string().with_force_new())
            .with_attribute("name", Attribute::required_string().with_force_new())
            .with_attribute(
                "mode",
                Attribute::optional_computed_string().with_description("`tcp` or `http`."),
            )
            .with_attribute("stickysessions", Attribute::optional_computed_string())
            .with_attribute("connecttimeout", Attribute::optional_computed_int64())
            .with_attribute("responsetimeout", Attribute::optional_computed_int64())
            .with_attribute("status", Attribute::computed_string())
            .with_attribute("targets", Attribute::string_list(AttributeFlags::computed()))
    }

    async fn create(&self, client: &GlesysClient, d: &mut ResourceData) -> Result<(), ProviderError> {
        let params = BackendParams {
            loadbalancerid: d.get_str("loadbalancerid").to_string(),
            name: d.get_str("name").to_string(),
            mode: d.get_opt_str("mode"),
            stickysessions: d.get_opt_str("stickysessions"),
            connecttimeout: d.get_int("connecttimeout"),
            responsetimeout: d.get_int("responsetimeout"),
        };
        client.loadbalancers().add_backend(&params).await?;
        d.set_id(params.name);
        self.read(client, d).await
    }

    async fn read(&self, client: &GlesysClient, d: &mut ResourceData) -> Result<(), ProviderError> {
        let Some(lb) = parent(client, d).await? else {
            return Ok(());
        };

        match lb.backend(d.id()) {
            Some(backend) => {
                let targets: Vec<Value> = backend.targets.iter().map(|t| t.name.clone().into()).collect();
                d.set("name", backend.name.as_str());
                d.set("mode", backend.mode.as_str());
                d.set("stickysessions", backend.stickysession.as_str());
                d.set("connecttimeout", backend.connecttimeout);
                d.set("responsetimeout", backend.responsetimeout);
                d.set("status", backend.status.as_str());
                d.set("targets", targets);
            },
            None => gone(d, "load balancer backend"),
        }
        Ok(())
    }

    async fn update(&self, client: &GlesysClient, d: &mut ResourceData) -> Result<(), ProviderError> {
        let params = BackendParams {
            loadbalancerid: d.get_str("loadbalancerid").to_string(),
            name: d.id().to_string(),
            mode: changed_str(d, "mode"),
            stickysessions: changed_str(d, "stickysessions"),
            connecttimeout: changed_int(d, "connecttimeout"),
            responsetimeout: changed_int(d, "responsetimeout"),
        };
        client.loadbalancers().edit_backend(&params).await?;
        self.read(client, d).await
    }

    async fn delete(&self, client: &GlesysClient, d: &mut ResourceData) -> Result<(), ProviderError> {
        client
            .loadbalancers()
            .remove_backend(d.get_str("loadbalancerid"), d.id())
            .await?;
        d.clear_id();
        Ok(())
    }
}

/// `glesys_loadbalancer_frontend`
pub struct LoadBalancerFrontendResource;

#[async_trait]
impl Resource for LoadBalancerFrontendResource {
    fn name(&self) -> &'static str {
        "glesys_loadbalancer_frontend"
    }

    fn schema(&self) -> Schema {
        Schema::with_id()
            .with_attribute("loadbalancerid", Attribute::required_string().with_force_new())
            .with_attribute("name", Attribute::required_string().with_force_new())
            .with_attribute("backend", Attribute::required_string().with_force_new())
            .with_attribute("port", Attribute::required_int64())
            .with_attribute("clienttimeout", Attribute::optional_computed_int64())
            .with_attribute("maxconnections", Attribute::optional_computed_int64())
            .with_attribute("sslcertificate", Attribute::optional_string().with_force_new())
            .with_attribute("status", Attribute::computed_string())
    }

    async fn create(&self, client: &GlesysClient, d: &mut ResourceData) -> Result<(), ProviderError> {
        let params = FrontendParams {
            loadbalancerid: d.get_str("loadbalancerid").to_string(),
            name: d.get_str("name").to_string(),
            backend: d.get_opt_str("backend"),
            port: d.get_int("port"),
            clienttimeout: d.get_int("clienttimeout"),
            maxconnections: d.get_int("maxconnections"),
            sslcertificate: d.get_opt_str("sslcertificate"),
        };
        client.loadbalancers().add_frontend(&params).await?;
        d.set_id(params.name);
        self.read(client, d).await
    }

    async fn read(&self, client: &GlesysClient, d: &mut ResourceData) -> Result<(), ProviderError> {
        let Some(lb) = parent(client, d).await? else {
            return Ok(());
        };

        match lb.frontend(d.id()) {
            Some(frontend) => {
                d.set("name", frontend.name.as_str());
                d.set("backend", frontend.backend.as_str());
                d.set("port", frontend.port);
                d.set("clienttimeout", frontend.clienttimeout);
                d.set("maxconnections", frontend.maxconnections);
                d.set("status", frontend.status.as_str());
                if !frontend.sslcertificate.is_empty() {
                    d.set("sslcertificate", frontend.sslcertificate.as_str());
                }
            },
            None => gone(d, "load balancer frontend"),
        }
        Ok(())
    }

    async fn update(&self, client: &GlesysClient, d: &mut ResourceData) -> Result<(), ProviderError> {
        let params = FrontendParams {
            loadbalancerid: d.get_str("loadbalancerid").to_string(),
            name: d.id().to_string(),
            port: changed_int(d, "port"),
            clienttimeout: changed_int(d, "clienttimeout"),
            maxconnections: changed_int(d, "maxconnections"),
            ..FrontendParams::default()
        };
        client.loadbalancers().edit_frontend(&params).await?;
        self.read(client, d).await
    }

    async fn delete(&self, client: &GlesysClient, d: &mut ResourceData) -> Result<(), ProviderError> {
        client
            .loadbalancers()
            .remove_frontend(d.get_str("loadbalancerid"), d.id())
            .await?;
        d.clear_id();
        Ok(())
    }
}

/// `glesys_loadbalancer_target`: a server behind a backend.
pub struct LoadBalancerTargetResource;

#[async_trait]
impl Resource for LoadBalancerTargetResource {
    fn name(&self) -> &'static str {
        "glesys_loadbalancer_target"
    }

    fn schema(&self) -> Schema {
        Schema::with_id()
            .with_attribute("loadbalancerid", Attribute::required_string().with_force_new())
            .with_attribute("backend", Attribute::required_string().with_force_new())
            .with_attribute("name", Attribute::required_string().with_force_new())
            .with_attribute("targetip", Attribute::optional_string())
            .with_attribute("port", Attribute::required_int64())
            .with_attribute("weight", Attribute::required_int64())
            .with_attribute("enabled", Attribute::optional_computed_bool())
            .with_attribute("status", Attribute::computed_string())
    }

    async fn create(&self, client: &GlesysClient, d: &mut ResourceData) -> Result<(), ProviderError> {
        let params = TargetParams {
            loadbalancerid: d.get_str("loadbalancerid").to_string(),
            backend: d.get_str("backend").to_string(),
            name: d.get_str("name").to_string(),
            targetip: d.get_opt_str("targetip"),
            port: d.get_int("port"),
            weight: d.get_int("weight"),
        };
        client.loadbalancers().add_target(&params).await?;

        // targets start out enabled
        if d.get_bool("enabled") == Some(false) {
            client
                .loadbalancers()
                .toggle_target(&params.loadbalancerid, &params.backend, &params.name, false)
                .await?;
        }

        d.set_id(params.name);
        self.read(client, d).await
    }

    async fn read(&self, client: &GlesysClient, d: &mut ResourceData) -> Result<(), ProviderError> {
        let Some(lb) = parent(client, d).await? else {
            return Ok(());
        };

        let target = lb
            .backend(d.get_str("backend"))
            .and_then(|backend| backend.target(d.id()));
        match target {
            Some(target) => {
                d.set("name", target.name.as_str());
                d.set("targetip", target.targetip.as_str());
                d.set("port", target.port);
                d.set("weight", target.weight);
                d.set("enabled", target.enabled);
                d.set("status", target.status.as_str());
            },
            None => gone(d, "load balancer target"),
        }
        Ok(())
    }

    async fn update(&self, client: &GlesysClient, d: &mut ResourceData) -> Result<(), ProviderError> {
        let params = TargetParams {
            loadbalancerid: d.get_str("loadbalancerid").to_string(),
            backend: d.get_str("backend").to_string(),
            name: d.id().to_string(),
            targetip: changed_str(d, "targetip"),
            port: changed_int(d, "port"),
            weight: changed_int(d, "weight"),
        };

        if d.has_change("enabled") {
            if let Some(enabled) = d.get_bool("enabled") {
                client
                    .loadbalancers()
                    .toggle_target(&params.loadbalancerid, &params.backend, &params.name, enabled)
                    .await?;
            }
        }

        if params.targetip.is_some() || params.port.is_some() || params.weight.is_some() {
            client.loadbalancers().edit_target(&params).await?;
        }
        self.read(client, d).await
    }

    async fn delete(&self, client: &GlesysClient, d: &mut ResourceData) -> Result<(), ProviderError> {
        client
            .loadbalancers()
            .remove_target(d.get_str("loadbalancerid"), d.get_str("backend"), d.id())
            .await?;
        d.clear_id();
        Ok(())
    }
}
