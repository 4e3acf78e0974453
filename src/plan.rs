//! Schema-driven planning.
//!
//! Compares the prior state with the proposed state and decides what the
//! host should show and do:
//!
//! - unset attributes with a schema default receive it
//! - computed attributes left unset keep their prior value
//! - `ignore_case` attributes that only differ in case keep their prior value
//! - a change to any `force_new` attribute requires replacement

use std::collections::BTreeSet;

use serde_json::{Map, Value};

use crate::schema::Schema;
use crate::state::is_unset;
use crate::types::{AttributeChange, PlanResult};

/// Plan one resource. `prior` is `None` on create; a `null` proposed state
/// plans a destroy.
pub fn plan_resource(schema: &Schema, prior: Option<&Value>, proposed: Value) -> PlanResult {
    let prior = prior.and_then(Value::as_object);

    let proposed = match proposed {
        Value::Object(map) => map,
        _ => return plan_destroy(prior),
    };

    match prior {
        None => plan_create(schema, proposed),
        Some(prior) => plan_update(schema, prior, proposed),
    }
}

fn plan_destroy(prior: Option<&Map<String, Value>>) -> PlanResult {
    let changes = prior
        .map(|p| {
            sorted_keys(p.keys())
                .into_iter()
                .filter_map(|k| present(p, &k).map(|v| AttributeChange::removed(k.clone(), v.clone())))
                .collect()
        })
        .unwrap_or_default();
    PlanResult::with_changes(Value::Null, changes, false)
}

fn plan_create(schema: &Schema, mut planned: Map<String, Value>) -> PlanResult {
    apply_defaults(schema, &mut planned);
    for (name, attr) in &schema.block.attributes {
        if attr.flags.computed && !attr.flags.optional && !attr.flags.required {
            planned.insert(name.clone(), Value::Null);
        }
    }

    let changes = sorted_keys(planned.keys())
        .into_iter()
        .filter_map(|k| present(&planned, &k).map(|v| AttributeChange::added(k.clone(), v.clone())))
        .collect();

    PlanResult::with_changes(Value::Object(planned), changes, false)
}

fn plan_update(schema: &Schema, prior: &Map<String, Value>, mut planned: Map<String, Value>) -> PlanResult {
    apply_defaults(schema, &mut planned);

    for (name, attr) in &schema.block.attributes {
        let before = present(prior, name);
        let after = present(&planned, name);

        if attr.flags.computed && after.is_none() {
            if let Some(before) = before {
                planned.insert(name.clone(), before.clone());
            }
            continue;
        }

        if attr.ignore_case {
            if let (Some(Value::String(b)), Some(Value::String(a))) = (before, after) {
                if a != b && a.eq_ignore_ascii_case(b) {
                    planned.insert(name.clone(), Value::String(b.clone()));
                }
            }
        }
    }

    if let Some(id) = present(prior, "id") {
        planned.insert("id".to_string(), id.clone());
    }

    let mut changes = Vec::new();
    let mut requires_replace = false;
    let keys = sorted_keys(
        schema
            .block
            .attributes
            .keys()
            .chain(schema.block.blocks.keys()),
    );

    for key in keys {
        let change = match (present(prior, &key), present(&planned, &key)) {
            (Some(b), Some(a)) if a != b => AttributeChange::modified(key.clone(), b.clone(), a.clone()),
            (None, Some(a)) => AttributeChange::added(key.clone(), a.clone()),
            (Some(b), None) => AttributeChange::removed(key.clone(), b.clone()),
            _ => continue,
        };
        if schema.attribute(&key).is_some_and(|a| a.force_new) {
            requires_replace = true;
        }
        changes.push(change);
    }

    PlanResult::with_changes(Value::Object(planned), changes, requires_replace)
}

fn apply_defaults(schema: &Schema, planned: &mut Map<String, Value>) {
    for (name, attr) in &schema.block.attributes {
        if let Some(default) = &attr.default {
            if present(planned, name).is_none() {
                planned.insert(name.clone(), default.clone());
            }
        }
    }
}

fn present<'a>(map: &'a Map<String, Value>, key: &str) -> Option<&'a Value> {
    map.get(key).filter(|v| !is_unset(v))
}

fn sorted_keys<'a>(keys: impl Iterator<Item = &'a String>) -> BTreeSet<String> {
    keys.cloned().collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{Attribute, Block, NestedBlock};
    use serde_json::json;

    fn schema() -> Schema {
        Schema::with_id()
            .with_attribute("hostname", Attribute::required_string().with_ignore_case())
            .with_attribute("datacenter", Attribute::required_string().with_force_new())
            .with_attribute("memory", Attribute::required_int64())
            .with_attribute("ipv4_address", Attribute::optional_computed_string())
            .with_attribute("islocked", Attribute::computed_bool())
            .with_attribute("platform", Attribute::optional_string().with_default(json!("KVM")))
            .with_block(
                "user",
                NestedBlock::set(Block::new().with_attribute("username", Attribute::required_string())),
            )
    }

    fn prior() -> Value {
        json!({
            "id": "wps1",
            "hostname": "web01",
            "datacenter": "Falkenberg",
            "memory": 2048,
            "ipv4_address": "192.0.2.10",
            "islocked": false,
            "platform": "KVM"
        })
    }

    #[test]
    fn test_create_fills_defaults_and_unknowns() {
        let plan = plan_resource(
            &schema(),
            None,
            json!({"hostname": "web01", "datacenter": "Falkenberg", "memory": 2048, "islocked": true}),
        );
        assert_eq!(plan.planned_state["platform"], "KVM");
        assert!(plan.planned_state["islocked"].is_null());
        assert!(!plan.requires_replace);

        let paths: Vec<_> = plan.changes.iter().map(|c| c.path.as_str()).collect();
        assert_eq!(paths, vec!["datacenter", "hostname", "memory", "platform"]);
        assert!(plan.changes.iter().all(|c| c.before.is_none()));
    }

    #[test]
    fn test_update_only_changed_attribute() {
        let plan = plan_resource(
            &schema(),
            Some(&prior()),
            json!({"hostname": "web01", "datacenter": "Falkenberg", "memory": 4096}),
        );
        assert_eq!(plan.changes.len(), 1);
        assert_eq!(plan.changes[0].path, "memory");
        assert_eq!(plan.changes[0].before, Some(json!(2048)));
        assert!(!plan.requires_replace);

        // computed values carried over
        assert_eq!(plan.planned_state["ipv4_address"], "192.0.2.10");
        assert_eq!(plan.planned_state["islocked"], false);
        assert_eq!(plan.planned_state["id"], "wps1");
    }

    #[test]
    fn test_hostname_case_difference_suppressed() {
        let plan = plan_resource(
            &schema(),
            Some(&prior()),
            json!({"hostname": "WEB01", "datacenter": "Falkenberg", "memory": 2048}),
        );
        assert!(!plan.has_changes());
        assert_eq!(plan.planned_state["hostname"], "web01");
    }

    #[test]
    fn test_force_new_requires_replace() {
        let plan = plan_resource(
            &schema(),
            Some(&prior()),
            json!({"hostname": "web01", "datacenter": "Stockholm", "memory": 2048}),
        );
        assert!(plan.requires_replace);
        assert_eq!(plan.changes[0].path, "datacenter");
    }

    #[test]
    fn test_block_changes_are_reported() {
        let plan = plan_resource(
            &schema(),
            Some(&prior()),
            json!({
                "hostname": "web01",
                "datacenter": "Falkenberg",
                "memory": 2048,
                "user": [{"username": "alice"}]
            }),
        );
        assert_eq!(plan.changes.len(), 1);
        assert_eq!(plan.changes[0].path, "user");
        assert!(plan.changes[0].before.is_none());
    }

    #[test]
    fn test_empty_block_list_is_no_change() {
        let mut prior = prior();
        prior["user"] = json!([]);
        let plan = plan_resource(
            &schema(),
            Some(&prior),
            json!({"hostname": "web01", "datacenter": "Falkenberg", "memory": 2048}),
        );
        assert!(!plan.has_changes());
    }

    #[test]
    fn test_destroy() {
        let plan = plan_resource(&schema(), Some(&prior()), Value::Null);
        assert!(plan.planned_state.is_null());
        assert!(plan.changes.iter().all(|c| c.after.is_none()));
        assert!(plan.changes.iter().any(|c| c.path == "id"));
    }
}
