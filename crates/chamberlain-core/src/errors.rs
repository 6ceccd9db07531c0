//! Error type shared by every Chamberlain crate.
//!
//! Each variant maps to a stable machine-readable code (see [`ChamberlainError::code`])
//! so that transports wrapping the core can surface the same codes regardless of
//! the backend in use. Every error is recoverable: operations are self-contained
//! units of work and may be retried by the caller.

use std::fmt;

use thiserror::Error;

/// Result alias used throughout the workspace.
pub type ChamberlainResult<T> = Result<T, ChamberlainError>;

/// The kind of entity an error refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityKind {
    Scene,
    Config,
    SchemeVersion,
    Condition,
}

impl EntityKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Scene => "scene",
            Self::Config => "config",
            Self::SchemeVersion => "scheme version",
            Self::Condition => "condition",
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error)]
pub enum ChamberlainError {
    #[error("{kind} not found: {id}")]
    NotFound { kind: EntityKind, id: String },

    #[error("{kind} already exists: {id}")]
    AlreadyExists { kind: EntityKind, id: String },

    #[error("malformed config id {id:?}: {reason}")]
    MalformedIdentity { id: String, reason: String },

    #[error("invalid {field} {value:?}: must match {pattern}")]
    InvalidIdentifier {
        field: &'static str,
        value: String,
        pattern: &'static str,
    },

    #[error("invalid condition set: {0}")]
    InvalidConditionSet(String),

    #[error("scheme is not compatible with the active version: {}", .warnings.join("; "))]
    IncompatibleSchema { warnings: Vec<String> },

    #[error("config does not conform to scheme version {version}: {}", .errors.join("; "))]
    ValidationFailed { version: u32, errors: Vec<String> },

    #[error("scene {scene_id} still has {count} config(s)")]
    SceneHasConfigs { scene_id: String, count: usize },

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("invalid scheme: {0}")]
    InvalidScheme(String),

    #[error("invariant violated: {0}")]
    Invariant(String),

    #[error("storage error: {0}")]
    Storage(String),

    #[error("serialization error: {0}")]
    Serialization(String),
}

impl ChamberlainError {
    pub fn not_found(kind: EntityKind, id: impl Into<String>) -> Self {
        Self::NotFound {
            kind,
            id: id.into(),
        }
    }

    pub fn already_exists(kind: EntityKind, id: impl Into<String>) -> Self {
        Self::AlreadyExists {
            kind,
            id: id.into(),
        }
    }

    pub fn malformed_identity(id: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::MalformedIdentity {
            id: id.into(),
            reason: reason.into(),
        }
    }

    pub fn invalid_condition_set(msg: impl Into<String>) -> Self {
        Self::InvalidConditionSet(msg.into())
    }

    pub fn invalid_argument(msg: impl Into<String>) -> Self {
        Self::InvalidArgument(msg.into())
    }

    pub fn invalid_scheme(msg: impl Into<String>) -> Self {
        Self::InvalidScheme(msg.into())
    }

    pub fn invariant(msg: impl Into<String>) -> Self {
        Self::Invariant(msg.into())
    }

    pub fn storage(msg: impl Into<String>) -> Self {
        Self::Storage(msg.into())
    }

    pub fn serialization(msg: impl Into<String>) -> Self {
        Self::Serialization(msg.into())
    }

    /// Stable error code for transports and CLI output.
    pub fn code(&self) -> &'static str {
        match self {
            Self::NotFound { kind, .. } => match kind {
                EntityKind::Scene => "SCENE_NOT_FOUND",
                EntityKind::Config => "CONFIG_NOT_FOUND",
                EntityKind::SchemeVersion => "SCHEME_VERSION_NOT_FOUND",
                EntityKind::Condition => "NOT_FOUND",
            },
            Self::AlreadyExists { kind, .. } => match kind {
                EntityKind::Scene => "SCENE_EXISTS",
                EntityKind::Config => "CONFIG_EXISTS",
                EntityKind::Condition => "CONDITION_EXISTS",
                EntityKind::SchemeVersion => "INTERNAL_ERROR",
            },
            Self::MalformedIdentity { .. } => "MALFORMED_CONFIG_ID",
            Self::InvalidIdentifier { field, .. } => match *field {
                "scene id" => "INVALID_SCENE_ID_FORMAT",
                _ => "INVALID_CONDITION_KEY",
            },
            Self::InvalidConditionSet(_) => "INVALID_CONDITION_SET",
            Self::IncompatibleSchema { .. } => "SCHEME_NOT_COMPATIBLE",
            Self::ValidationFailed { .. } => "CONFIG_VALIDATION_FAILED",
            Self::SceneHasConfigs { .. } => "SCENE_HAS_CONFIGS",
            Self::InvalidArgument(_) => "INVALID_PARAMETER",
            Self::InvalidScheme(_) => "INVALID_SCHEME",
            Self::Invariant(_) => "INTERNAL_ERROR",
            Self::Storage(_) => "STORAGE_ERROR",
            Self::Serialization(_) => "SERIALIZATION_ERROR",
        }
    }

    /// Returns true for the `NotFound` family.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    /// Returns true for the `AlreadyExists` family.
    pub fn is_conflict(&self) -> bool {
        matches!(self, Self::AlreadyExists { .. })
    }
}

impl From<serde_json::Error> for ChamberlainError {
    fn from(e: serde_json::Error) -> Self {
        Self::serialization(e.to_string())
    }
}
