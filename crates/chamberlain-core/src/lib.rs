//! chamberlain-core
//!
//! Core primitives for Chamberlain:
//! - Scene / Config / SchemeVersion models
//! - Canonical condition sets and deterministic config identities
//! - Per-scene scheme version ledger
//! - Schema compatibility checks and a structural payload validator
//! - Sorting and pagination for list views

pub mod clock;
pub mod compat;
pub mod condition;
pub mod config;
pub mod determinism;
pub mod errors;
pub mod identity;
pub mod ledger;
pub mod model;
pub mod query;
pub mod validator;

pub use crate::errors::{ChamberlainError, ChamberlainResult, EntityKind};

/// Convenience re-exports.
pub mod prelude {
    pub use crate::clock::{Clock, FixedClock, SystemClock};
    pub use crate::compat::{check, compare, CompatibilityReport, SchemaChange, SchemaType};
    pub use crate::condition::{conditions_equal, parse_condition_filter, ConditionSet};
    pub use crate::config::{Capabilities, CoreConfig, PagingConfig, PolicyConfig};
    pub use crate::identity::ParsedIdentity;
    pub use crate::ledger::SchemeVersionLedger;
    pub use crate::model::{
        AvailableCondition, Condition, Config, ConfigPatch, Scene, ScenePatch, SchemeStatus,
        SchemeVersion,
    };
    pub use crate::query::{
        ConfigSortField, PageRequest, PageResult, SceneSortField, SortOrder, SortRule,
    };
    pub use crate::validator::{SchemaValidator, StructuralValidator, ValidationReport};
    pub use crate::{ChamberlainError, ChamberlainResult, EntityKind};
}
