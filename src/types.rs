//! Plan, import and metadata types exchanged with the host, plus the
//! handshake constants.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// The protocol version announced in the handshake.
pub const PROTOCOL_VERSION: u32 = 1;

/// First field of the handshake line printed on stdout.
pub const HANDSHAKE_PREFIX: &str = "GLESYS_PROVIDER";

/// A change to a single attribute during a plan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttributeChange {
    pub path: String,
    /// `None` when the attribute is being created.
    pub before: Option<Value>,
    /// `None` when the attribute is being removed.
    pub after: Option<Value>,
}

impl AttributeChange {
    pub fn added(path: impl Into<String>, value: Value) -> Self {
        Self {
            path: path.into(),
            before: None,
            after: Some(value),
        }
    }

    pub fn removed(path: impl Into<String>, value: Value) -> Self {
        Self {
            path: path.into(),
            before: Some(value),
            after: None,
        }
    }

    pub fn modified(path: impl Into<String>, before: Value, after: Value) -> Self {
        Self {
            path: path.into(),
            before: Some(before),
            after: Some(after),
        }
    }
}

impl From<AttributeChange> for crate::generated::AttributeChange {
    fn from(change: AttributeChange) -> Self {
        let encode = |v: Option<Value>| {
            v.and_then(|v| serde_json::to_vec(&v).ok())
                .unwrap_or_default()
        };
        Self {
            path: change.path,
            before: encode(change.before),
            after: encode(change.after),
        }
    }
}

/// Outcome of planning one resource.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlanResult {
    pub planned_state: Value,
    pub changes: Vec<AttributeChange>,
    /// A force-new attribute changed; the host must destroy and recreate.
    pub requires_replace: bool,
}

impl PlanResult {
    pub fn no_change(state: Value) -> Self {
        Self {
            planned_state: state,
            changes: Vec::new(),
            requires_replace: false,
        }
    }

    pub fn with_changes(planned_state: Value, changes: Vec<AttributeChange>, requires_replace: bool) -> Self {
        Self {
            planned_state,
            changes,
            requires_replace,
        }
    }

    pub fn has_changes(&self) -> bool {
        !self.changes.is_empty()
    }
}

/// A resource produced by `ImportResourceState`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImportedResource {
    pub resource_type: String,
    pub state: Value,
}

impl ImportedResource {
    pub fn new(resource_type: impl Into<String>, state: Value) -> Self {
        Self {
            resource_type: resource_type.into(),
            state,
        }
    }
}

/// Provider metadata returned by `GetMetadata`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct ProviderMetadata {
    pub resources: Vec<String>,
    pub data_sources: Vec<String>,
    pub capabilities: ServerCapabilities,
}

/// Server capability flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct ServerCapabilities {
    /// The provider plans destroy operations itself.
    pub plan_destroy: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_attribute_change_to_proto() {
        let proto: crate::generated::AttributeChange =
            AttributeChange::modified("memory", json!(2048), json!(4096)).into();
        assert_eq!(proto.path, "memory");
        assert_eq!(proto.before, b"2048".to_vec());
        assert_eq!(proto.after, b"4096".to_vec());

        let proto: crate::generated::AttributeChange =
            AttributeChange::added("hostname", json!("web01")).into();
        assert!(proto.before.is_empty());
        assert_eq!(proto.after, b"\"web01\"".to_vec());
    }

    #[test]
    fn test_plan_result() {
        let plan = PlanResult::no_change(json!({"id": "wps1"}));
        assert!(!plan.has_changes());
        assert!(!plan.requires_replace);

        let plan = PlanResult::with_changes(
            json!({"id": "wps1", "datacenter": "Stockholm"}),
            vec![AttributeChange::modified("datacenter", json!("Falkenberg"), json!("Stockholm"))],
            true,
        );
        assert!(plan.has_changes());
        assert!(plan.requires_replace);
    }

    #[test]
    fn test_handshake_constants() {
        assert_eq!(format!("{}|{}", HANDSHAKE_PREFIX, PROTOCOL_VERSION), "GLESYS_PROVIDER|1");
    }
}
