//! Chamberlain data models.
//!
//! This module defines the strongly-typed Rust representations of the two
//! persisted entities, [`Scene`] and [`Config`], plus their supporting types.
//!
//! Design goals:
//! - **Stable wire names:** fields serialize in camelCase so records written by
//!   other implementations of the protocol load unchanged.
//! - **Minimal policy:** models are mostly "dumb" data. Stores and the facade
//!   apply uniqueness, ledger and validation policy.
//!
//! The identifiers `Scene::id`, `Config::id` and `SchemeVersion::version` are the
//! only values that must stay stable across implementations.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use time::OffsetDateTime;

use crate::condition::ConditionSet;
use crate::ledger::SchemeVersionLedger;

/// A single key/value discriminator, e.g. `environment=prod`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Condition {
    pub key: String,
    pub value: String,
}

impl Condition {
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }
}

/// A condition definition a Scene makes available to its Configs.
///
/// Once added to a Scene, a definition is immutable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AvailableCondition {
    pub key: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Value type hint for form rendering (`string`, `number`, `enum`, ...).
    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub value_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub values: Option<Vec<String>>,
}

impl AvailableCondition {
    pub fn new(key: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            name: name.into(),
            description: None,
            value_type: None,
            values: None,
        }
    }
}

/// Activation state of a scheme version.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SchemeStatus {
    Active,
    Inactive,
}

impl SchemeStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Inactive => "inactive",
        }
    }
}

/// One versioned JSON Schema snapshot of a Scene.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SchemeVersion {
    pub scheme: Value,
    pub version: u32,
    pub status: SchemeStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub change_description: Option<String>,
    /// True when the compatibility check produced warnings at append time.
    #[serde(default)]
    pub breaking: bool,
}

impl SchemeVersion {
    pub fn is_active(&self) -> bool {
        self.status == SchemeStatus::Active
    }
}

/// A named, schema-governed configuration template.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Scene {
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub available_conditions: Vec<AvailableCondition>,
    pub scheme_list: SchemeVersionLedger,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

impl Scene {
    /// Look up a condition definition by key.
    pub fn condition(&self, key: &str) -> Option<&AvailableCondition> {
        self.available_conditions.iter().find(|c| c.key == key)
    }
}

/// A concrete configuration instance bound to a Scene and a condition set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    /// Derived from `(scene_id, condition_list)`; never assigned by callers.
    pub id: String,
    pub scene_id: String,
    pub scheme_version: u32,
    pub condition_list: ConditionSet,
    /// SHA-256 of the canonical condition key string.
    pub condition_hash: String,
    pub config: Value,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

/// Partial update for a Scene. Absent fields are left untouched.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScenePatch {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    /// Full desired list; existing entries must be carried over unchanged.
    #[serde(default)]
    pub available_conditions: Option<Vec<AvailableCondition>>,
}

/// Partial update for a Config. Absent fields are left untouched.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigPatch {
    #[serde(default)]
    pub scheme_version: Option<u32>,
    #[serde(default, alias = "conditions")]
    pub condition_list: Option<Vec<Condition>>,
    #[serde(default)]
    pub config: Option<Value>,
}

impl ConfigPatch {
    pub fn is_empty(&self) -> bool {
        self.scheme_version.is_none() && self.condition_list.is_none() && self.config.is_none()
    }
}

/// Identifier and key validation helpers.
pub mod validate {
    use crate::errors::{ChamberlainError, ChamberlainResult};

    pub const SCENE_ID_PATTERN: &str = "^[a-z][a-z0-9_]*$";
    pub const CONDITION_KEY_PATTERN: &str = "^[a-zA-Z_][a-zA-Z0-9_]*$";

    /// Returns true if `id` matches `^[a-z][a-z0-9_]*$`.
    pub fn is_valid_scene_id(id: &str) -> bool {
        let mut chars = id.chars();
        match chars.next() {
            Some(c) if c.is_ascii_lowercase() => {}
            _ => return false,
        }
        chars.all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_')
    }

    /// Returns true if `key` matches `^[a-zA-Z_][a-zA-Z0-9_]*$`.
    pub fn is_valid_condition_key(key: &str) -> bool {
        let mut chars = key.chars();
        match chars.next() {
            Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
            _ => return false,
        }
        chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
    }

    pub fn validate_scene_id(id: &str) -> ChamberlainResult<()> {
        if is_valid_scene_id(id) {
            Ok(())
        } else {
            Err(ChamberlainError::InvalidIdentifier {
                field: "scene id",
                value: id.to_string(),
                pattern: SCENE_ID_PATTERN,
            })
        }
    }

    pub fn validate_condition_key(key: &str) -> ChamberlainResult<()> {
        if is_valid_condition_key(key) {
            Ok(())
        } else {
            Err(ChamberlainError::InvalidIdentifier {
                field: "condition key",
                value: key.to_string(),
                pattern: CONDITION_KEY_PATTERN,
            })
        }
    }
}
