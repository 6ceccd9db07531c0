//! Config identity derivation.
//!
//! A Config's id is a pure function of its scene id and normalized condition set:
//!
//! - no conditions: `{sceneId}:default`
//! - otherwise: `{sceneId}:{k1}:{v1},{k2}:{v2}...` with keys ascending
//!
//! Two Configs of the same scene therefore collide exactly when their condition
//! sets are equal, which is how per-scene uniqueness is enforced.

use crate::condition::ConditionSet;
use crate::determinism::escape::unescape_component;
use crate::errors::{ChamberlainError, ChamberlainResult};
use crate::model::Condition;

/// Suffix used for the condition-free config of a scene.
pub const DEFAULT_SUFFIX: &str = "default";

/// Separator between the scene id and the condition part.
pub const SCENE_SEPARATOR: char = ':';

/// Separator between condition pairs.
pub const CONDITION_SEPARATOR: char = ',';

/// The decoded parts of a config id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedIdentity {
    pub scene_id: String,
    pub conditions: ConditionSet,
}

/// Derive the config id for `(scene_id, conditions)`. Never fails.
pub fn generate(scene_id: &str, conditions: &ConditionSet) -> String {
    if conditions.is_empty() {
        format!("{scene_id}{SCENE_SEPARATOR}{DEFAULT_SUFFIX}")
    } else {
        format!("{scene_id}{SCENE_SEPARATOR}{}", conditions.to_key_string())
    }
}

/// Decode a config id back into scene id and conditions.
///
/// Splits on the first `:`; a remainder of exactly `default` means no
/// conditions. Otherwise the remainder splits on `,` and each pair on its first
/// `:`; a pair without `:` is a key with an empty value. Fails with
/// `MalformedIdentity` when no `:` is present, when the scene part is empty, or
/// when the same key appears twice.
pub fn parse(id: &str) -> ChamberlainResult<ParsedIdentity> {
    let (scene_id, rest) = id
        .split_once(SCENE_SEPARATOR)
        .ok_or_else(|| ChamberlainError::malformed_identity(id, "missing ':' separator"))?;

    if scene_id.is_empty() {
        return Err(ChamberlainError::malformed_identity(id, "empty scene id"));
    }

    if rest == DEFAULT_SUFFIX {
        return Ok(ParsedIdentity {
            scene_id: scene_id.to_string(),
            conditions: ConditionSet::empty(),
        });
    }

    let conditions = rest.split(CONDITION_SEPARATOR).map(|part| {
        let (k, v) = part.split_once(SCENE_SEPARATOR).unwrap_or((part, ""));
        Condition {
            key: unescape_component(k),
            value: unescape_component(v),
        }
    });
    let conditions = ConditionSet::normalize(conditions)
        .map_err(|e| ChamberlainError::malformed_identity(id, e.to_string()))?;

    Ok(ParsedIdentity {
        scene_id: scene_id.to_string(),
        conditions,
    })
}
