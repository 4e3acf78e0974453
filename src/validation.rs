//! Configuration validation against a [`Schema`].
//!
//! Runs before any API call is made, so a malformed configuration never
//! reaches GleSYS.
//!
//! ```
//! use glesys_provider::schema::{Attribute, Schema};
//! use glesys_provider::validation::validate;
//! use serde_json::json;
//!
//! let schema = Schema::with_id()
//!     .with_attribute("hostname", Attribute::required_string())
//!     .with_attribute("cpu", Attribute::required_int64());
//!
//! assert!(validate(&schema, &json!({"hostname": "web01", "cpu": 2})).is_empty());
//!
//! let diagnostics = validate(&schema, &json!({"hostname": "web01", "cpu": "two"}));
//! assert_eq!(diagnostics[0].attribute.as_deref(), Some("cpu"));
//! ```

use crate::schema::{Attribute, AttributeType, Block, BlockNestingMode, Diagnostic, NestedBlock, Schema};
use serde_json::Value;

/// Validate a JSON value against a schema.
///
/// Returns one diagnostic per problem; an empty list means the value is valid.
/// Computed-only attributes are skipped, required attributes must be present
/// and non-null, types must match, string values must be among the allowed
/// values when the attribute declares them, and nested blocks are checked
/// recursively including their item counts.
pub fn validate(schema: &Schema, value: &Value) -> Vec<Diagnostic> {
    let mut diagnostics = Vec::new();
    validate_block(&schema.block, value, "", &mut diagnostics);
    diagnostics
}

/// [`validate`] as a `Result`.
pub fn validate_result(schema: &Schema, value: &Value) -> Result<(), Vec<Diagnostic>> {
    let diagnostics = validate(schema, value);
    if diagnostics.is_empty() {
        Ok(())
    } else {
        Err(diagnostics)
    }
}

pub fn is_valid(schema: &Schema, value: &Value) -> bool {
    validate(schema, value).is_empty()
}

fn validate_block(block: &Block, value: &Value, path: &str, diagnostics: &mut Vec<Diagnostic>) {
    let obj = match value {
        Value::Object(map) => map,
        Value::Null => return,
        _ => {
            let mut diag = Diagnostic::error("Expected object")
                .with_detail(format!("Got {}", value_type_name(value)));
            if !path.is_empty() {
                diag = diag.with_attribute(path);
            }
            diagnostics.push(diag);
            return;
        },
    };

    for (name, attr) in &block.attributes {
        validate_attribute(attr, obj.get(name), &join_path(path, name), diagnostics);
    }

    for (name, nested) in &block.blocks {
        validate_nested_block(nested, obj.get(name), &join_path(path, name), diagnostics);
    }
}

fn validate_attribute(
    attr: &Attribute,
    value: Option<&Value>,
    path: &str,
    diagnostics: &mut Vec<Diagnostic>,
) {
    if attr.flags.computed && !attr.flags.optional && !attr.flags.required {
        return;
    }

    let value = match value {
        None | Some(Value::Null) => {
            if attr.flags.required {
                diagnostics.push(
                    Diagnostic::error(format!("Missing required attribute '{}'", path))
                        .with_detail("This attribute is required and must be provided")
                        .with_attribute(path),
                );
            }
            return;
        },
        Some(v) => v,
    };

    let before = diagnostics.len();
    validate_attribute_type(&attr.attr_type, value, path, diagnostics);

    if diagnostics.len() == before {
        if let (Some(allowed), Some(s)) = (&attr.allowed_values, value.as_str()) {
            if !allowed.iter().any(|a| a == s) {
                diagnostics.push(
                    Diagnostic::error(format!("Invalid value for attribute '{}'", path))
                        .with_detail(format!(
                            "Expected one of [{}], got \"{}\"",
                            allowed.join(", "),
                            s
                        ))
                        .with_attribute(path),
                );
            }
        }
    }
}

fn validate_attribute_type(
    attr_type: &AttributeType,
    value: &Value,
    path: &str,
    diagnostics: &mut Vec<Diagnostic>,
) {
    match attr_type {
        AttributeType::String if !value.is_string() => {
            diagnostics.push(type_error(path, "string", value));
        },
        AttributeType::Int64 if !is_int64(value) => {
            diagnostics.push(type_error(path, "int64", value));
        },
        AttributeType::Float64 if !value.is_number() => {
            diagnostics.push(type_error(path, "float64", value));
        },
        AttributeType::Bool if !value.is_boolean() => {
            diagnostics.push(type_error(path, "bool", value));
        },
        AttributeType::List(element_type) | AttributeType::Set(element_type) => {
            match value.as_array() {
                Some(arr) => {
                    for (i, elem) in arr.iter().enumerate() {
                        let elem_path = format!("{}.{}", path, i);
                        validate_attribute_type(element_type, elem, &elem_path, diagnostics);
                    }
                },
                None => diagnostics.push(type_error(path, "list", value)),
            }
        },
        AttributeType::Map(value_type) => match value.as_object() {
            Some(obj) => {
                for (key, val) in obj {
                    let key_path = format!("{}.{}", path, key);
                    validate_attribute_type(value_type, val, &key_path, diagnostics);
                }
            },
            None => diagnostics.push(type_error(path, "map", value)),
        },
        AttributeType::Object(fields) => match value.as_object() {
            Some(obj) => {
                for (name, field_type) in fields {
                    if let Some(field) = obj.get(name) {
                        validate_attribute_type(
                            field_type,
                            field,
                            &join_path(path, name),
                            diagnostics,
                        );
                    }
                }
            },
            None => diagnostics.push(type_error(path, "object", value)),
        },
        _ => {},
    }
}

fn validate_nested_block(
    nested: &NestedBlock,
    value: Option<&Value>,
    path: &str,
    diagnostics: &mut Vec<Diagnostic>,
) {
    let value = match value {
        None | Some(Value::Null) => {
            if nested.min_items > 0 {
                diagnostics.push(
                    Diagnostic::error(format!(
                        "Block '{}' requires at least {} item(s)",
                        path, nested.min_items
                    ))
                    .with_attribute(path),
                );
            }
            return;
        },
        Some(v) => v,
    };

    match (nested.nesting_mode, value) {
        (BlockNestingMode::Single, v) => validate_block(&nested.block, v, path, diagnostics),
        (BlockNestingMode::List | BlockNestingMode::Set, Value::Array(items)) => {
            check_item_count(nested, items.len(), path, diagnostics);
            for (i, item) in items.iter().enumerate() {
                validate_block(&nested.block, item, &format!("{}.{}", path, i), diagnostics);
            }
        },
        (BlockNestingMode::Map, Value::Object(items)) => {
            check_item_count(nested, items.len(), path, diagnostics);
            for (key, item) in items {
                validate_block(&nested.block, item, &format!("{}.{}", path, key), diagnostics);
            }
        },
        (mode, v) => {
            let expected = if mode == BlockNestingMode::Map { "map" } else { "list" };
            diagnostics.push(
                Diagnostic::error(format!("Expected {} for block '{}'", expected, path))
                    .with_detail(format!("Got {}", value_type_name(v)))
                    .with_attribute(path),
            );
        },
    }
}

fn check_item_count(nested: &NestedBlock, len: usize, path: &str, diagnostics: &mut Vec<Diagnostic>) {
    let len = len as u32;
    if len < nested.min_items {
        diagnostics.push(
            Diagnostic::error(format!(
                "Block '{}' requires at least {} item(s), got {}",
                path, nested.min_items, len
            ))
            .with_attribute(path),
        );
    }
    // max_items of 0 means unlimited
    if nested.max_items > 0 && len > nested.max_items {
        diagnostics.push(
            Diagnostic::error(format!(
                "Block '{}' allows at most {} item(s), got {}",
                path, nested.max_items, len
            ))
            .with_attribute(path),
        );
    }
}

fn join_path(base: &str, name: &str) -> String {
    if base.is_empty() {
        name.to_string()
    } else {
        format!("{}.{}", base, name)
    }
}

fn value_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

fn is_int64(value: &Value) -> bool {
    match value {
        Value::Number(n) if n.is_i64() || n.is_u64() => n.as_i64().is_some(),
        Value::Number(n) => n
            .as_f64()
            .is_some_and(|f| f.fract() == 0.0 && f >= i64::MIN as f64 && f <= i64::MAX as f64),
        _ => false,
    }
}

fn type_error(path: &str, expected: &str, got: &Value) -> Diagnostic {
    Diagnostic::error(format!("Invalid type for attribute '{}'", path))
        .with_detail(format!("Expected {}, got {}", expected, value_type_name(got)))
        .with_attribute(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{Attribute, AttributeFlags, Block, NestedBlock, Schema};
    use serde_json::json;

    fn server_like_schema() -> Schema {
        Schema::with_id()
            .with_attribute("hostname", Attribute::required_string())
            .with_attribute("cpu", Attribute::required_int64())
            .with_attribute("description", Attribute::optional_string())
            .with_attribute("islocked", Attribute::computed_bool())
            .with_block(
                "backups_schedule",
                NestedBlock::set(
                    Block::new()
                        .with_attribute(
                            "frequency",
                            Attribute::required_string().with_allowed_values(["daily", "weekly"]),
                        )
                        .with_attribute("retention", Attribute::required_int64()),
                ),
            )
    }

    #[test]
    fn test_valid_config() {
        let config = json!({
            "hostname": "web01",
            "cpu": 2,
            "backups_schedule": [{"frequency": "daily", "retention": 7}]
        });
        assert!(validate(&server_like_schema(), &config).is_empty());
    }

    #[test]
    fn test_missing_required() {
        let diagnostics = validate(&server_like_schema(), &json!({"cpu": 2}));
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].attribute.as_deref(), Some("hostname"));

        let diagnostics = validate(&server_like_schema(), &json!({"hostname": null, "cpu": 2}));
        assert_eq!(diagnostics.len(), 1);
    }

    #[test]
    fn test_optional_may_be_absent_or_null() {
        let schema = server_like_schema();
        assert!(is_valid(&schema, &json!({"hostname": "a", "cpu": 1})));
        assert!(is_valid(&schema, &json!({"hostname": "a", "cpu": 1, "description": null})));
        assert!(!is_valid(&schema, &json!({"hostname": "a", "cpu": 1, "description": 5})));
    }

    #[test]
    fn test_computed_only_is_skipped() {
        let config = json!({"hostname": "a", "cpu": 1, "islocked": "yes", "id": 7});
        assert!(validate(&server_like_schema(), &config).is_empty());
    }

    #[test]
    fn test_int64_accepts_whole_floats() {
        let schema = Schema::v0().with_attribute("storage", Attribute::required_int64());
        assert!(is_valid(&schema, &json!({"storage": 20})));
        assert!(is_valid(&schema, &json!({"storage": 20.0})));
        assert!(!is_valid(&schema, &json!({"storage": 20.5})));
        assert!(!is_valid(&schema, &json!({"storage": "20"})));
    }

    #[test]
    fn test_allowed_values() {
        let config = json!({
            "hostname": "a",
            "cpu": 1,
            "backups_schedule": [{"frequency": "hourly", "retention": 7}]
        });
        let diagnostics = validate(&server_like_schema(), &config);
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(
            diagnostics[0].attribute.as_deref(),
            Some("backups_schedule.0.frequency")
        );
        assert!(diagnostics[0]
            .detail
            .as_deref()
            .is_some_and(|d| d.contains("daily, weekly")));
    }

    #[test]
    fn test_list_and_map_elements() {
        let schema = Schema::v0()
            .with_attribute("publickeys", Attribute::string_list(AttributeFlags::required()))
            .with_attribute("cloudconfigparams", Attribute::string_map(AttributeFlags::optional()));

        let diagnostics = validate(
            &schema,
            &json!({"publickeys": ["ssh-ed25519 AAA", 3], "cloudconfigparams": {"a": 1}}),
        );
        let paths: Vec<_> = diagnostics.iter().filter_map(|d| d.attribute.clone()).collect();
        assert_eq!(diagnostics.len(), 2);
        assert!(paths.contains(&"publickeys.1".to_string()));
        assert!(paths.contains(&"cloudconfigparams.a".to_string()));

        assert!(!is_valid(&schema, &json!({"publickeys": "not a list"})));
    }

    #[test]
    fn test_object_type() {
        let schema = Schema::v0().with_attribute(
            "adapter",
            Attribute::new(
                AttributeType::object([("bandwidth", AttributeType::Int64)]),
                AttributeFlags::optional(),
            ),
        );
        let diagnostics = validate(&schema, &json!({"adapter": {"bandwidth": "fast"}}));
        assert_eq!(diagnostics[0].attribute.as_deref(), Some("adapter.bandwidth"));
    }

    #[test]
    fn test_block_item_counts() {
        let schema = Schema::v0().with_block(
            "user",
            NestedBlock::list(Block::new().with_attribute("username", Attribute::required_string()))
                .with_min_items(1)
                .with_max_items(2),
        );

        let diagnostics = validate(&schema, &json!({"user": []}));
        assert!(diagnostics[0].summary.contains("at least 1"));

        let diagnostics = validate(
            &schema,
            &json!({"user": [{"username": "a"}, {"username": "b"}, {"username": "c"}]}),
        );
        assert!(diagnostics[0].summary.contains("at most 2"));

        let diagnostics = validate(&schema, &json!({"user": [{"username": 1}]}));
        assert_eq!(diagnostics[0].attribute.as_deref(), Some("user.0.username"));

        let diagnostics = validate(&schema, &json!({"user": "alice"}));
        assert!(diagnostics[0].summary.contains("Expected list"));
    }

    #[test]
    fn test_map_block() {
        let schema = Schema::v0().with_block(
            "targets",
            NestedBlock::map(Block::new().with_attribute("port", Attribute::required_int64())),
        );
        assert!(is_valid(&schema, &json!({"targets": {"web1": {"port": 80}}})));

        let diagnostics = validate(&schema, &json!({"targets": {"web1": {"port": "80"}}}));
        assert_eq!(diagnostics[0].attribute.as_deref(), Some("targets.web1.port"));
    }

    #[test]
    fn test_root_not_object() {
        let diagnostics = validate(&server_like_schema(), &json!("web01"));
        assert_eq!(diagnostics.len(), 1);
        assert!(diagnostics[0].summary.contains("Expected object"));
        assert!(diagnostics[0].attribute.is_none());
    }

    #[test]
    fn test_validate_result() {
        let schema = server_like_schema();
        assert!(validate_result(&schema, &json!({"hostname": "a", "cpu": 1})).is_ok());
        let errors = validate_result(&schema, &json!({})).unwrap_err();
        assert_eq!(errors.len(), 2);
    }
}
