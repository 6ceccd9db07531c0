//! Schema → data validation capability.
//!
//! Full JSON Schema semantics are delegated to whatever engine a deployment
//! plugs in behind [`SchemaValidator`]. The built-in [`StructuralValidator`]
//! is a pragmatic subset that covers what config payloads usually need:
//!
//! - `type` (scalar or union) at every level that declares one
//! - `required` members of objects
//! - `enum` membership
//! - `additionalProperties: false`
//! - recursion into declared `properties` and array `items`
//!
//! Validation never mutates its inputs and produces stable error ordering for
//! identical inputs.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::compat::SchemaType;

/// One validation failure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationError {
    /// Dotted path to the offending value (`"database.host"`), `"root"` for the document.
    pub field: String,
    pub message: String,
    /// The schema keyword that failed (`type`, `required`, ...).
    #[serde(rename = "type")]
    pub kind: String,
}

/// Outcome of validating a payload.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ValidationReport {
    pub valid: bool,
    pub errors: Vec<ValidationError>,
}

impl ValidationReport {
    pub fn ok() -> Self {
        Self {
            valid: true,
            errors: Vec::new(),
        }
    }

    pub fn from_errors(errors: Vec<ValidationError>) -> Self {
        Self {
            valid: errors.is_empty(),
            errors,
        }
    }

    /// Flatten errors to `field: message` lines.
    pub fn messages(&self) -> Vec<String> {
        self.errors
            .iter()
            .map(|e| format!("{}: {}", e.field, e.message))
            .collect()
    }
}

/// Capability: check `data` against `schema`.
pub trait SchemaValidator: Send + Sync {
    fn validate(&self, schema: &Value, data: &Value) -> ValidationReport;
}

/// Built-in validator covering the structural keywords listed in the module docs.
#[derive(Debug, Clone, Copy, Default)]
pub struct StructuralValidator;

impl SchemaValidator for StructuralValidator {
    fn validate(&self, schema: &Value, data: &Value) -> ValidationReport {
        let mut errors = Vec::new();
        validate_node(schema, data, "", &mut errors);
        ValidationReport::from_errors(errors)
    }
}

fn path_label(path: &str) -> String {
    if path.is_empty() {
        "root".to_string()
    } else {
        path.to_string()
    }
}

fn join_path(path: &str, seg: &str) -> String {
    if path.is_empty() {
        seg.to_string()
    } else {
        format!("{path}.{seg}")
    }
}

fn push(errors: &mut Vec<ValidationError>, path: &str, kind: &str, message: String) {
    errors.push(ValidationError {
        field: path_label(path),
        message,
        kind: kind.to_string(),
    });
}

fn value_matches_type(name: &str, v: &Value) -> bool {
    match name {
        "string" => v.is_string(),
        "number" => v.is_number(),
        "integer" => v.is_i64() || v.is_u64() || v.as_f64().is_some_and(|f| f.fract() == 0.0),
        "boolean" => v.is_boolean(),
        "object" => v.is_object(),
        "array" => v.is_array(),
        "null" => v.is_null(),
        // unknown type names are not ours to judge
        _ => true,
    }
}

fn validate_node(schema: &Value, data: &Value, path: &str, errors: &mut Vec<ValidationError>) {
    let Some(schema) = schema.as_object() else {
        return;
    };

    if let Some(t) = schema.get("type") {
        let ok = match SchemaType::from_value(t) {
            SchemaType::Scalar(name) => value_matches_type(&name, data),
            SchemaType::Union(names) => names.iter().any(|n| value_matches_type(n, data)),
            SchemaType::Other(_) => true,
        };
        if !ok {
            push(
                errors,
                path,
                "type",
                format!("must be of type {}", SchemaType::from_value(t)),
            );
            return;
        }
    }

    if let Some(allowed) = schema.get("enum").and_then(Value::as_array) {
        if !allowed.contains(data) {
            push(errors, path, "enum", "must be one of the allowed values".to_string());
        }
    }

    if let Some(obj) = data.as_object() {
        if let Some(required) = schema.get("required").and_then(Value::as_array) {
            for field in required.iter().filter_map(Value::as_str) {
                if !obj.contains_key(field) {
                    push(
                        errors,
                        &join_path(path, field),
                        "required",
                        "is required".to_string(),
                    );
                }
            }
        }

        let props = schema.get("properties").and_then(Value::as_object);
        if let Some(props) = props {
            for (name, prop_schema) in props {
                if let Some(child) = obj.get(name) {
                    validate_node(prop_schema, child, &join_path(path, name), errors);
                }
            }
        }

        if schema.get("additionalProperties") == Some(&Value::Bool(false)) {
            for key in obj.keys() {
                if !props.is_some_and(|p| p.contains_key(key)) {
                    push(
                        errors,
                        &join_path(path, key),
                        "additionalProperties",
                        "is not allowed".to_string(),
                    );
                }
            }
        }
    }

    if let (Some(items), Some(arr)) = (schema.get("items"), data.as_array()) {
        for (idx, item) in arr.iter().enumerate() {
            validate_node(items, item, &join_path(path, &idx.to_string()), errors);
        }
    }
}
