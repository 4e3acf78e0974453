use async_trait::async_trait;
use serde_json::json;

use super::{found, gone, split_import_id, Resource};
use crate::client::{ApiError, CreateServerDiskParams, GlesysClient, ServerDetails};
use crate::error::ProviderError;
use crate::schema::{Attribute, Schema};
use crate::state::ResourceData;
use crate::wait::{wait_for_state, WaitCondition};

/// `glesys_server_disk`: an additional disk attached to a server.
pub struct ServerDiskResource;

#[async_trait]
impl Resource for ServerDiskResource {
    fn name(&self) -> &'static str {
        "glesys_server_disk"
    }

    fn schema(&self) -> Schema {
        Schema::with_id()
            .with_description("An additional disk of a `glesys_server`.")
            .with_attribute("name", Attribute::optional_string())
            .with_attribute("size", Attribute::required_int64().with_description("Size in GiB."))
            .with_attribute("serverid", Attribute::required_string().with_force_new())
            .with_attribute("scsiid", Attribute::computed_int64())
    }

    async fn create(&self, client: &GlesysClient, d: &mut ResourceData) -> Result<(), ProviderError> {
        let params = CreateServerDiskParams {
            serverid: d.get_str("serverid").to_string(),
            sizeingib: d.get_int("size").unwrap_or_default(),
            name: d.get_opt_str("name"),
        };

        // a server created in the same run may not be visible yet
        let cond = WaitCondition::server_disk_parent_unlocked();
        let serverid = params.serverid.as_str();
        wait_for_state(serverid, &cond, || parent_lock_state(client, serverid)).await?;

        let disk = client.server_disks().create(&params).await?;
        d.set_id(disk.id);
        self.read(client, d).await
    }

    async fn read(&self, client: &GlesysClient, d: &mut ResourceData) -> Result<(), ProviderError> {
        let result = client.servers().details(d.get_str("serverid")).await;
        let Some(server) = found(d, result)? else {
            return Ok(());
        };

        match server.additionaldisks.into_iter().find(|disk| disk.id == d.id()) {
            Some(disk) => {
                d.set("name", disk.name);
                d.set("size", disk.sizeingib);
                d.set("scsiid", disk.scsiid);
            },
            None => gone(d, "server disk"),
        }
        Ok(())
    }

    async fn update(&self, client: &GlesysClient, d: &mut ResourceData) -> Result<(), ProviderError> {
        if d.has_change("name") {
            client.server_disks().update_name(d.id(), d.get_str("name")).await?;
        }
        if d.has_change("size") {
            let size = d.get_int("size").unwrap_or_default();
            client.server_disks().reconfigure(d.id(), size).await?;
        }
        self.read(client, d).await
    }

    async fn delete(&self, client: &GlesysClient, d: &mut ResourceData) -> Result<(), ProviderError> {
        client.server_disks().delete(d.id()).await?;
        d.clear_id();
        Ok(())
    }

    /// Import id format: `<serverid>,<diskid>`.
    fn import(&self, id: &str) -> Result<ResourceData, ProviderError> {
        let (serverid, diskid) = split_import_id(id, "<serverid>,<diskid>")?;
        Ok(ResourceData::new(json!({ "id": diskid, "serverid": serverid })))
    }
}

async fn parent_lock_state(
    client: &GlesysClient,
    serverid: &str,
) -> Result<Option<(ServerDetails, String)>, ApiError> {
    match client.servers().details(serverid).await {
        Ok(server) => {
            let locked = server.islocked.to_string();
            Ok(Some((server, locked)))
        },
        Err(err) if err.is_not_found() => Ok(None),
        Err(err) => Err(err),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resources::test_support::client;
    use serde_json::Value;

    fn server(locked: bool) -> Value {
        json!({"server": {
            "serverid": "kvm1",
            "islocked": locked,
            "additionaldisks": [{"id": "disk-9", "name": "data", "sizeingib": 50, "scsiid": 2}]
        }})
    }

    #[tokio::test(start_paused = true)]
    async fn test_create_waits_for_parent_through_not_found() {
        let (mock, client) = client();
        mock.fail("server/details", 404, "Server not found");
        mock.respond_seq("server/details", [server(true), server(false)]);
        mock.respond("serverdisk/create", json!({"disk": {"id": "disk-9"}}));

        let mut d = ResourceData::new(json!({"serverid": "kvm1", "size": 50, "name": "data"}));
        ServerDiskResource.create(&client, &mut d).await.unwrap();

        assert_eq!(d.id(), "disk-9");
        assert_eq!(d.get_int("scsiid"), Some(2));
        assert_eq!(
            mock.paths(),
            vec![
                "server/details",
                "server/details",
                "server/details",
                "serverdisk/create",
                "server/details",
            ]
        );
        assert_eq!(
            mock.requests_to("serverdisk/create"),
            vec![json!({"serverid": "kvm1", "sizeingib": 50, "name": "data"})]
        );
    }

    #[tokio::test]
    async fn test_update_calls_only_changed_endpoints() {
        let (mock, client) = client();
        mock.respond("serverdisk/reconfigure", json!({"disk": {"id": "disk-9"}}));
        mock.respond("server/details", server(false));

        let mut d = ResourceData::with_prior(
            json!({"id": "disk-9", "serverid": "kvm1", "size": 20, "name": "data"}),
            json!({"id": "disk-9", "serverid": "kvm1", "size": 50, "name": "data"}),
        );
        ServerDiskResource.update(&client, &mut d).await.unwrap();

        assert!(mock.requests_to("serverdisk/updatename").is_empty());
        assert_eq!(
            mock.requests_to("serverdisk/reconfigure"),
            vec![json!({"id": "disk-9", "sizeingib": 50})]
        );
    }

    #[tokio::test]
    async fn test_read_disk_missing_from_server_clears_id() {
        let (mock, client) = client();
        mock.respond("server/details", server(false));

        let mut d = ResourceData::new(json!({"id": "disk-1", "serverid": "kvm1"}));
        ServerDiskResource.read(&client, &mut d).await.unwrap();
        assert_eq!(d.id(), "");
    }

    #[test]
    fn test_import() {
        let d = ServerDiskResource.import("kvm1,disk-9").unwrap();
        assert_eq!(d.id(), "disk-9");
        assert_eq!(d.get_str("serverid"), "kvm1");
        assert!(ServerDiskResource.import("disk-9").is_err());
    }
}
