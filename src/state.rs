//! Attribute mapping handed to the resource handlers.
//!
//! [`ResourceData`] wraps the flat JSON object the host stores for one
//! resource instance. During an update it also keeps the prior state so
//! handlers can ask which attributes changed and send only those.

use serde_json::{Map, Value};

use crate::error::ProviderError;

/// Attribute store of one resource instance.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResourceData {
    id: String,
    attrs: Map<String, Value>,
    prior: Map<String, Value>,
}

impl ResourceData {
    /// Wrap a state or configuration object. Non-object values give an empty store.
    pub fn new(state: Value) -> Self {
        let attrs = into_map(state);
        let id = attrs
            .get("id")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();
        Self {
            id,
            attrs,
            prior: Map::new(),
        }
    }

    /// Planned values on top of the prior state, as seen by `update`.
    pub fn with_prior(prior: Value, planned: Value) -> Self {
        let prior = into_map(prior);
        let mut data = Self::new(planned);
        if data.id.is_empty() {
            if let Some(id) = prior.get("id").and_then(Value::as_str) {
                data.set_id(id);
            }
        }
        data.prior = prior;
        data
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn set_id(&mut self, id: impl Into<String>) {
        self.id = id.into();
        self.attrs.insert("id".to_string(), Value::String(self.id.clone()));
    }

    /// Mark the remote object as gone.
    pub fn clear_id(&mut self) {
        self.id.clear();
        self.attrs.insert("id".to_string(), Value::String(String::new()));
    }

    /// Value of `key`; `null` and empty lists read as unset.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.attrs.get(key).filter(|v| !is_unset(v))
    }

    /// String value, empty when unset.
    pub fn get_str(&self, key: &str) -> &str {
        self.get(key).and_then(Value::as_str).unwrap_or_default()
    }

    /// String value, `None` when unset or empty.
    pub fn get_opt_str(&self, key: &str) -> Option<String> {
        self.get(key)
            .and_then(Value::as_str)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
    }

    /// Integer value, `None` when unset. Whole floats are accepted.
    pub fn get_int(&self, key: &str) -> Option<i64> {
        self.get(key).and_then(|v| {
            v.as_i64()
                .or_else(|| v.as_f64().filter(|f| f.fract() == 0.0).map(|f| f as i64))
        })
    }

    pub fn get_bool(&self, key: &str) -> Option<bool> {
        self.get(key).and_then(Value::as_bool)
    }

    /// List of strings; non-string elements are skipped.
    pub fn get_string_list(&self, key: &str) -> Vec<String> {
        self.get(key)
            .and_then(Value::as_array)
            .map(|items| {
                items
                    .iter()
                    .filter_map(Value::as_str)
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Map of strings; non-string values are skipped.
    pub fn get_string_map(&self, key: &str) -> Map<String, Value> {
        self.get(key)
            .and_then(Value::as_object)
            .map(|obj| {
                obj.iter()
                    .filter(|(_, v)| v.is_string())
                    .map(|(k, v)| (k.clone(), v.clone()))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Nested blocks stored as a list of objects.
    pub fn get_blocks(&self, key: &str) -> Vec<Map<String, Value>> {
        self.get(key)
            .and_then(Value::as_array)
            .map(|items| items.iter().filter_map(|v| v.as_object().cloned()).collect())
            .unwrap_or_default()
    }

    /// Value recorded before this update, if any.
    pub fn prior_value(&self, key: &str) -> Option<&Value> {
        self.prior.get(key).filter(|v| !is_unset(v))
    }

    /// Whether `key` differs between the prior and the planned state.
    /// Missing, `null` and `[]` count as the same thing.
    pub fn has_change(&self, key: &str) -> bool {
        self.get(key) != self.prior_value(key)
    }

    pub fn set(&mut self, key: &str, value: impl Into<Value>) {
        self.attrs.insert(key.to_string(), value.into());
    }

    /// Set `key` only when `value` is `Some`; otherwise store `null`.
    pub fn set_opt<V: Into<Value>>(&mut self, key: &str, value: Option<V>) {
        let value = value.map(Into::into).unwrap_or(Value::Null);
        self.attrs.insert(key.to_string(), value);
    }

    /// Parse the id as an integer, as record-style resources require.
    pub fn int_id(&self) -> Result<i64, ProviderError> {
        self.id
            .parse()
            .map_err(|_| ProviderError::Validation(format!("id '{}' is not an integer", self.id)))
    }

    /// State to hand back to the host; `null` once the id was cleared.
    pub fn into_state(self) -> Value {
        if self.id.is_empty() {
            Value::Null
        } else {
            Value::Object(self.attrs)
        }
    }

    pub fn attributes(&self) -> &Map<String, Value> {
        &self.attrs
    }
}

/// `null` or an empty list.
pub(crate) fn is_unset(value: &Value) -> bool {
    value.is_null() || value.as_array().is_some_and(Vec::is_empty)
}

fn into_map(value: Value) -> Map<String, Value> {
    match value {
        Value::Object(map) => map,
        _ => Map::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_new_picks_up_id() {
        let d = ResourceData::new(json!({"id": "wps123", "hostname": "web01", "cpu": 2}));
        assert_eq!(d.id(), "wps123");
        assert_eq!(d.get_str("hostname"), "web01");
        assert_eq!(d.get_int("cpu"), Some(2));
        assert_eq!(d.get_str("missing"), "");
        assert_eq!(d.get_opt_str("missing"), None);
    }

    #[test]
    fn test_non_object_is_empty() {
        let d = ResourceData::new(Value::Null);
        assert_eq!(d.id(), "");
        assert!(d.attributes().is_empty());
    }

    #[test]
    fn test_has_change() {
        let d = ResourceData::with_prior(
            json!({"id": "wps1", "cpu": 2, "memory": 2048, "description": null}),
            json!({"cpu": 4, "memory": 2048}),
        );
        assert_eq!(d.id(), "wps1");
        assert!(d.has_change("cpu"));
        assert!(!d.has_change("memory"));
        // null and missing are the same
        assert!(!d.has_change("description"));
        assert_eq!(d.prior_value("cpu"), Some(&json!(2)));
    }

    #[test]
    fn test_empty_list_matches_missing() {
        let d = ResourceData::with_prior(
            json!({"id": "wps1", "backups_schedule": [], "allowlist": ["192.0.2.0/24"]}),
            json!({"allowlist": []}),
        );
        assert!(!d.has_change("backups_schedule"));
        assert!(d.get("allowlist").is_none());
        assert!(d.has_change("allowlist"));
        assert!(d.get_string_list("allowlist").is_empty());
    }

    #[test]
    fn test_clear_id_gives_null_state() {
        let mut d = ResourceData::new(json!({"id": "wps1", "cpu": 2}));
        d.clear_id();
        assert_eq!(d.id(), "");
        assert_eq!(d.into_state(), Value::Null);
    }

    #[test]
    fn test_set_and_into_state() {
        let mut d = ResourceData::new(json!({"hostname": "web01"}));
        d.set_id("wps9");
        d.set("isrunning", true);
        d.set_opt::<String>("password", None);
        let state = d.into_state();
        assert_eq!(state["id"], "wps9");
        assert_eq!(state["isrunning"], true);
        assert!(state["password"].is_null());
    }

    #[test]
    fn test_collections() {
        let d = ResourceData::new(json!({
            "publickeys": ["a", 1, "b"],
            "params": {"balance": "roundrobin", "n": 1},
            "user": [{"username": "alice"}, "junk"]
        }));
        assert_eq!(d.get_string_list("publickeys"), vec!["a", "b"]);
        assert_eq!(d.get_string_map("params").len(), 1);
        assert_eq!(d.get_blocks("user").len(), 1);
    }

    #[test]
    fn test_int_id() {
        let d = ResourceData::new(json!({"id": "1234"}));
        assert_eq!(d.int_id().unwrap(), 1234);

        let d = ResourceData::new(json!({"id": "abc"}));
        assert!(matches!(d.int_id(), Err(ProviderError::Validation(_))));
    }
}
