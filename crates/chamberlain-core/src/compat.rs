//! Schema compatibility checking.
//!
//! [`compare`] diffs the direct `properties` and `required` lists of an old
//! schema against a candidate and reports changes that could break existing
//! Configs:
//!
//! 1. a property present before is gone
//! 2. a property's `type` changed (strict structural equality; `"string"` and
//!    `["string"]` differ)
//! 3. a field became required
//!
//! Nested object schemas are not diffed, and added optional properties,
//! relaxed `required` lists or changed patterns/formats/bounds are not
//! reported. The check is advisory and never fails; whether warnings block an
//! update is decided by the caller.

use std::fmt;

use serde::Serialize;
use serde_json::{Map, Value};

use crate::errors::{ChamberlainError, ChamberlainResult};

/// The `type` keyword of a property schema.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SchemaType {
    Scalar(String),
    Union(Vec<String>),
    /// Anything else found under `type`; compared by JSON equality.
    Other(Value),
}

impl SchemaType {
    pub fn from_value(v: &Value) -> Self {
        match v {
            Value::String(s) => Self::Scalar(s.clone()),
            Value::Array(items) => {
                let names: Option<Vec<String>> =
                    items.iter().map(|i| i.as_str().map(str::to_string)).collect();
                match names {
                    Some(names) => Self::Union(names),
                    None => Self::Other(v.clone()),
                }
            }
            other => Self::Other(other.clone()),
        }
    }

    /// Read the `type` of a property schema, if declared.
    pub fn of(property: &Value) -> Option<Self> {
        property.get("type").map(Self::from_value)
    }
}

impl fmt::Display for SchemaType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Scalar(s) => f.write_str(s),
            Self::Union(items) => write!(f, "[{}]", items.join(", ")),
            Self::Other(v) => write!(f, "{v}"),
        }
    }
}

fn type_label(t: &Option<SchemaType>) -> String {
    match t {
        Some(t) => t.to_string(),
        None => "unspecified".to_string(),
    }
}

/// One potentially breaking change between two schemas.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SchemaChange {
    FieldRemoved {
        field: String,
    },
    TypeChanged {
        field: String,
        from: Option<SchemaType>,
        to: Option<SchemaType>,
    },
    NewlyRequired {
        field: String,
    },
}

impl SchemaChange {
    pub fn field(&self) -> &str {
        match self {
            Self::FieldRemoved { field }
            | Self::TypeChanged { field, .. }
            | Self::NewlyRequired { field } => field,
        }
    }
}

impl fmt::Display for SchemaChange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::FieldRemoved { field } => write!(f, "field \"{field}\" removed"),
            Self::TypeChanged { field, from, to } => write!(
                f,
                "field \"{field}\" type changed from \"{}\" to \"{}\"",
                type_label(from),
                type_label(to)
            ),
            Self::NewlyRequired { field } => write!(f, "field \"{field}\" newly required"),
        }
    }
}

/// Outcome of a compatibility check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CompatibilityReport {
    pub valid: bool,
    pub warnings: Vec<String>,
}

impl CompatibilityReport {
    pub fn from_changes(changes: &[SchemaChange]) -> Self {
        Self {
            valid: changes.is_empty(),
            warnings: changes.iter().map(ToString::to_string).collect(),
        }
    }
}

fn properties(schema: &Value) -> Option<&Map<String, Value>> {
    schema.get("properties").and_then(Value::as_object)
}

fn required(schema: &Value) -> Vec<&str> {
    schema
        .get("required")
        .and_then(Value::as_array)
        .map(|items| items.iter().filter_map(Value::as_str).collect())
        .unwrap_or_default()
}

/// Structured diff of `old` against `new`.
///
/// Changes are grouped by rule (removals, then type changes, then newly
/// required fields) and ordered by property name within each group. A missing
/// `properties` object counts as empty.
pub fn diff(old: &Value, new: &Value) -> Vec<SchemaChange> {
    let empty = Map::new();
    let old_props = properties(old).unwrap_or(&empty);
    let new_props = properties(new).unwrap_or(&empty);

    let mut changes = Vec::new();

    for key in old_props.keys() {
        if !new_props.contains_key(key) {
            changes.push(SchemaChange::FieldRemoved { field: key.clone() });
        }
    }

    for (key, old_prop) in old_props {
        if let Some(new_prop) = new_props.get(key) {
            let from = SchemaType::of(old_prop);
            let to = SchemaType::of(new_prop);
            if from != to {
                changes.push(SchemaChange::TypeChanged {
                    field: key.clone(),
                    from,
                    to,
                });
            }
        }
    }

    let old_required = required(old);
    let mut seen = Vec::new();
    for field in required(new) {
        if !old_required.contains(&field) && !seen.contains(&field) {
            seen.push(field);
            changes.push(SchemaChange::NewlyRequired {
                field: field.to_string(),
            });
        }
    }

    changes
}

/// Human-readable warnings for `old` → `new`. Empty means compatible.
pub fn compare(old: &Value, new: &Value) -> Vec<String> {
    diff(old, new).iter().map(ToString::to_string).collect()
}

/// Run the check and wrap the result in a report.
pub fn check(old: &Value, new: &Value) -> CompatibilityReport {
    CompatibilityReport::from_changes(&diff(old, new))
}

/// Verify that `schema` has the shape the checker and validator rely on.
///
/// - the schema is a JSON object
/// - `properties`, if present, is an object whose members are objects
/// - `required`, if present, is an array of strings
/// - `type`, if present (top level or per property), is a string or an array of strings
pub fn check_schema_shape(schema: &Value) -> ChamberlainResult<()> {
    let obj = schema
        .as_object()
        .ok_or_else(|| ChamberlainError::invalid_scheme("scheme must be a JSON object"))?;

    check_type_keyword(obj.get("type"), "type")?;

    if let Some(props) = obj.get("properties") {
        let props = props
            .as_object()
            .ok_or_else(|| ChamberlainError::invalid_scheme("properties must be an object"))?;
        for (name, prop) in props {
            let prop = prop.as_object().ok_or_else(|| {
                ChamberlainError::invalid_scheme(format!("properties.{name} must be an object"))
            })?;
            check_type_keyword(prop.get("type"), &format!("properties.{name}.type"))?;
        }
    }

    if let Some(req) = obj.get("required") {
        let items = req
            .as_array()
            .ok_or_else(|| ChamberlainError::invalid_scheme("required must be an array"))?;
        if let Some(idx) = items.iter().position(|i| !i.is_string()) {
            return Err(ChamberlainError::invalid_scheme(format!(
                "required[{idx}] must be a string"
            )));
        }
    }

    Ok(())
}

fn check_type_keyword(v: Option<&Value>, path: &str) -> ChamberlainResult<()> {
    match v.map(SchemaType::from_value) {
        None | Some(SchemaType::Scalar(_)) | Some(SchemaType::Union(_)) => Ok(()),
        Some(SchemaType::Other(_)) => Err(ChamberlainError::invalid_scheme(format!(
            "{path} must be a string or an array of strings"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn schema_against_itself_is_clean() {
        let s = json!({
            "type": "object",
            "properties": {
                "host": {"type": "string"},
                "port": {"type": ["integer", "null"]}
            },
            "required": ["host"]
        });
        assert!(compare(&s, &s).is_empty());
        assert!(check(&s, &s).valid);
    }

    #[test]
    fn removed_field() {
        let w = compare(
            &json!({"properties": {"x": {"type": "string"}}}),
            &json!({"properties": {}}),
        );
        assert_eq!(w.len(), 1);
        assert!(w[0].contains("\"x\"") && w[0].contains("removed"));
    }

    #[test]
    fn missing_properties_counts_as_empty() {
        let changes = diff(&json!({"properties": {"x": {}}}), &json!({}));
        assert_eq!(
            changes,
            vec![SchemaChange::FieldRemoved { field: "x".into() }]
        );
    }

    #[test]
    fn type_change_is_strict() {
        let old = json!({"properties": {"a": {"type": "string"}}});
        let new = json!({"properties": {"a": {"type": ["string"]}}});
        let changes = diff(&old, &new);
        assert_eq!(changes.len(), 1);
        assert_eq!(
            changes[0].to_string(),
            "field \"a\" type changed from \"string\" to \"[string]\""
        );
    }

    #[test]
    fn union_order_matters() {
        let old = json!({"properties": {"a": {"type": ["string", "null"]}}});
        let new = json!({"properties": {"a": {"type": ["null", "string"]}}});
        assert_eq!(compare(&old, &new).len(), 1);
    }

    #[test]
    fn type_added_to_untyped_property() {
        let old = json!({"properties": {"a": {}}});
        let new = json!({"properties": {"a": {"type": "integer"}}});
        assert_eq!(
            compare(&old, &new),
            vec!["field \"a\" type changed from \"unspecified\" to \"integer\""]
        );
    }

    #[test]
    fn newly_required() {
        let old = json!({"properties": {"a": {}, "b": {}}, "required": ["a"]});
        let new = json!({"properties": {"a": {}, "b": {}}, "required": ["a", "b", "b"]});
        assert_eq!(compare(&old, &new), vec!["field \"b\" newly required"]);
    }

    #[test]
    fn relaxations_are_silent() {
        let old = json!({
            "properties": {"a": {"type": "string", "pattern": "^x"}},
            "required": ["a"]
        });
        let new = json!({
            "properties": {
                "a": {"type": "string", "pattern": "^y", "maxLength": 3},
                "b": {"type": "number"}
            }
        });
        assert!(compare(&old, &new).is_empty());
    }

    #[test]
    fn nested_objects_not_diffed() {
        let old = json!({"properties": {"db": {"type": "object", "properties": {"host": {"type": "string"}}}}});
        let new = json!({"properties": {"db": {"type": "object", "properties": {}}}});
        assert!(compare(&old, &new).is_empty());
    }

    #[test]
    fn rules_are_grouped_in_order() {
        let old = json!({"properties": {"a": {"type": "string"}, "z": {}}});
        let new = json!({"properties": {"a": {"type": "number"}}, "required": ["a"]});
        let w = compare(&old, &new);
        assert_eq!(w.len(), 3);
        assert!(w[0].contains("\"z\" removed"));
        assert!(w[1].contains("type changed"));
        assert!(w[2].contains("newly required"));
    }

    #[test]
    fn shape_checks() {
        assert!(check_schema_shape(&json!({"properties": {"a": {"type": "string"}}})).is_ok());
        assert!(check_schema_shape(&json!([])).is_err());
        assert!(check_schema_shape(&json!({"properties": []})).is_err());
        assert!(check_schema_shape(&json!({"properties": {"a": 1}})).is_err());
        assert!(check_schema_shape(&json!({"required": ["a", 2]})).is_err());
        assert!(check_schema_shape(&json!({"type": 5})).is_err());
        let err = check_schema_shape(&json!({"properties": {"a": {"type": [1]}}})).unwrap_err();
        assert_eq!(err.code(), "INVALID_SCHEME");
    }
}
