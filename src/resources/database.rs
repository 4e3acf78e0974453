use async_trait::async_trait;

use super::{found, Resource};
use crate::client::{ApiError, CreateDatabaseParams, Database, GlesysClient};
use crate::error::ProviderError;
use crate::schema::{Attribute, AttributeFlags, Schema};
use crate::state::ResourceData;
use crate::wait::{wait_for_state, WaitCondition};

/// `glesys_database`: a managed database instance. Everything but the
/// allowlist forces a new instance.
pub struct DatabaseResource;

#[async_trait]
impl Resource for DatabaseResource {
    fn name(&self) -> &'static str {
        "glesys_database"
    }

    fn schema(&self) -> Schema {
        Schema::with_id()
            .with_attribute("name", Attribute::required_string().with_force_new())
            .with_attribute(
                "engine",
                Attribute::required_string()
                    .with_force_new()
                    .with_ignore_case()
                    .with_description("e.g. `mysql`, `postgresql`, `redis`."),
            )
            .with_attribute("engineversion", Attribute::required_string().with_force_new())
            .with_attribute("datacenterkey", Attribute::required_string().with_force_new())
            .with_attribute("plankey", Attribute::required_string().with_force_new())
            .with_attribute(
                "allowlist",
                Attribute::string_list(AttributeFlags::optional())
                    .with_description("Addresses or networks allowed to connect."),
            )
            .with_attribute("fqdn", Attribute::computed_string())
            .with_attribute("status", Attribute::computed_string())
            .with_attribute("connectionstring", Attribute::computed_string().sensitive())
            .with_attribute("plan_cpucores", Attribute::computed_int64())
            .with_attribute("plan_memoryingib", Attribute::computed_int64())
            .with_attribute("plan_storageingib", Attribute::computed_int64())
            .with_attribute("maintenancewindow_durationinminutes", Attribute::computed_int64())
            .with_attribute("maintenancewindow_starttime", Attribute::computed_string())
            .with_attribute("maintenancewindow_weekday", Attribute::computed_string())
    }

    async fn create(&self, client: &GlesysClient, d: &mut ResourceData) -> Result<(), ProviderError> {
        let params = CreateDatabaseParams {
            name: d.get_str("name").to_string(),
            engine: d.get_str("engine").to_string(),
            engineversion: d.get_str("engineversion").to_string(),
            datacenterkey: d.get_str("datacenterkey").to_string(),
            plankey: d.get_str("plankey").to_string(),
            allowlist: d.get_string_list("allowlist"),
        };

        let database = client.databases().create(&params).await?;
        d.set_id(database.id);
        wait_until_running(client, d.id()).await?;
        self.read(client, d).await
    }

    async fn read(&self, client: &GlesysClient, d: &mut ResourceData) -> Result<(), ProviderError> {
        let result = client.databases().details(d.id()).await;
        let Some(database) = found(d, result)? else {
            return Ok(());
        };
        let result = client.databases().connection_string(d.id()).await;
        let Some(connectionstring) = found(d, result)? else {
            return Ok(());
        };

        d.set("name", database.name);
        d.set("engine", database.engine.to_lowercase());
        d.set("engineversion", database.engineversion);
        d.set("datacenterkey", database.datacenterkey);
        d.set("fqdn", database.fqdn);
        d.set("status", database.status);
        d.set("allowlist", database.allowlist);
        d.set("connectionstring", connectionstring);
        if !database.plan.key.is_empty() {
            d.set("plankey", database.plan.key);
        }
        d.set("plan_cpucores", database.plan.cpucores);
        d.set("plan_memoryingib", database.plan.memoryingib);
        d.set("plan_storageingib", database.plan.storageingib);

        let window = database.maintenancewindow;
        d.set("maintenancewindow_durationinminutes", window.durationinminutes);
        d.set("maintenancewindow_starttime", window.starttime);
        d.set("maintenancewindow_weekday", window.weekday);
        Ok(())
    }

    async fn update(&self, client: &GlesysClient, d: &mut ResourceData) -> Result<(), ProviderError> {
        if d.has_change("allowlist") {
            client
                .databases()
                .update_allowlist(d.id(), &d.get_string_list("allowlist"))
                .await?;
            wait_until_running(client, d.id()).await?;
        }
        self.read(client, d).await
    }

    async fn delete(&self, client: &GlesysClient, d: &mut ResourceData) -> Result<(), ProviderError> {
        client.databases().delete(d.id()).await?;
        d.clear_id();
        Ok(())
    }
}

async fn wait_until_running(client: &GlesysClient, id: &str) -> Result<Database, ProviderError> {
    let cond = WaitCondition::database_running();
    let database = wait_for_state(id, &cond, || async move {
        let database = client.databases().details(id).await?;
        let running = database.is_running().to_string();
        Ok::<_, ApiError>(Some((database, running)))
    })
    .await?;
    Ok(database)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resources::test_support::client;
    use serde_json::{json, Value};

    fn details(status: &str) -> Value {
        json!({"database": {
            "id": "db-1",
            "name": "orders",
            "engine": "MySQL",
            "engineversion": "8.0",
            "datacenterkey": "dc-fbg1",
            "fqdn": "db-1.example.glesys.net",
            "status": status,
            "allowlist": ["192.0.2.0/24"],
            "plan": {"key": "plan-1core-4gib-25gib", "cpucores": 1, "memoryingib": 4, "storageingib": 25},
            "maintenancewindow": {"durationinminutes": 60, "starttime": "03:00", "weekday": "Sunday"}
        }})
    }

    #[tokio::test(start_paused = true)]
    async fn test_create_waits_until_running() {
        let (mock, client) = client();
        mock.respond("database/create", json!({"database": {"id": "db-1"}}));
        mock.respond("database/details", details("CREATING"));
        mock.respond("database/details", details("CREATING"));
        mock.respond("database/details", details("RUNNING"));
        mock.respond(
            "database/connectionstring",
            json!({"connectionstring": "mysql://orders@db-1.example.glesys.net:3306"}),
        );

        let mut d = ResourceData::new(json!({
            "name": "orders", "engine": "mysql", "engineversion": "8.0",
            "datacenterkey": "dc-fbg1", "plankey": "plan-1core-4gib-25gib",
            "allowlist": ["192.0.2.0/24"]
        }));
        DatabaseResource.create(&client, &mut d).await.unwrap();

        assert_eq!(d.id(), "db-1");
        assert_eq!(d.get_str("engine"), "mysql");
        assert_eq!(d.get_str("status"), "RUNNING");
        assert_eq!(d.get_str("connectionstring"), "mysql://orders@db-1.example.glesys.net:3306");
        assert_eq!(d.get_int("plan_memoryingib"), Some(4));
        assert_eq!(d.get_str("maintenancewindow_weekday"), "Sunday");
        assert_eq!(
            mock.paths(),
            vec![
                "database/create",
                "database/details",
                "database/details",
                "database/details",
                "database/details",
                "database/connectionstring",
            ]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_allowlist_update_waits() {
        let (mock, client) = client();
        mock.respond("database/updateallowlist", details("UPDATING"));
        mock.respond("database/details", details("RUNNING"));
        mock.respond("database/connectionstring", json!({"connectionstring": {"connectionstring": "x"}}));

        let mut d = ResourceData::with_prior(
            json!({"id": "db-1", "allowlist": ["192.0.2.0/24"]}),
            json!({"id": "db-1", "allowlist": ["192.0.2.0/24", "198.51.100.7"]}),
        );
        DatabaseResource.update(&client, &mut d).await.unwrap();

        assert_eq!(
            mock.requests_to("database/updateallowlist"),
            vec![json!({"id": "db-1", "allowlist": ["192.0.2.0/24", "198.51.100.7"]})]
        );
        assert_eq!(d.get_str("connectionstring"), "x");
    }

    #[tokio::test]
    async fn test_read_not_found_clears_id() {
        let (mock, client) = client();
        mock.fail("database/details", 404, "Database not found");

        let mut d = ResourceData::new(json!({"id": "db-1"}));
        DatabaseResource.read(&client, &mut d).await.unwrap();
        assert_eq!(d.id(), "");
        assert!(mock.requests_to("database/connectionstring").is_empty());
    }
}
