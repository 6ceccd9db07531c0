//! Per-scene scheme version ledger.
//!
//! The ledger is an append-only list of [`SchemeVersion`]s. Version numbers are
//! assigned in creation order as `max + 1` and are never reused. Appending a
//! version always deactivates every prior version, so after any append exactly
//! one version is active. [`SchemeVersionLedger::set_status`] is a lower-level
//! primitive that flips one version without touching the others.
//!
//! The ledger itself is not synchronized; callers serialize mutations per scene.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::determinism::stable_sort::ensure_strictly_increasing;
use crate::errors::{ChamberlainError, ChamberlainResult, EntityKind};
use crate::model::{SchemeStatus, SchemeVersion};

/// First version number of every ledger.
pub const INITIAL_VERSION: u32 = 1;

/// Stored as a plain list of versions. Decoding goes through
/// [`SchemeVersionLedger::from_versions`], so a stored ledger with repeated
/// version numbers or none at all is rejected on load.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Vec<SchemeVersion>", into = "Vec<SchemeVersion>")]
pub struct SchemeVersionLedger {
    versions: Vec<SchemeVersion>,
}

impl SchemeVersionLedger {
    /// Seed a ledger with `scheme` as version 1, active.
    pub fn initialize(scheme: Value) -> Self {
        Self {
            versions: vec![SchemeVersion {
                scheme,
                version: INITIAL_VERSION,
                status: SchemeStatus::Active,
                change_description: Some("initial version".to_string()),
                breaking: false,
            }],
        }
    }

    /// Rebuild a ledger from stored versions, checking ordering.
    pub fn from_versions(mut versions: Vec<SchemeVersion>) -> ChamberlainResult<Self> {
        if versions.is_empty() {
            return Err(ChamberlainError::invariant("scheme ledger has no versions"));
        }
        versions.sort_by_key(|v| v.version);
        ensure_strictly_increasing(&versions, |v| v.version)?;
        if versions.first().is_some_and(|v| v.version < INITIAL_VERSION) {
            return Err(ChamberlainError::invariant("scheme versions start at 1"));
        }
        Ok(Self { versions })
    }

    /// Append `scheme` as the new active version and return its number.
    pub fn append_version(&mut self, scheme: Value) -> u32 {
        self.append_version_with(scheme, None, false)
    }

    /// Like [`Self::append_version`], recording a change note and whether the
    /// compatibility check reported warnings.
    pub fn append_version_with(
        &mut self,
        scheme: Value,
        change_description: Option<String>,
        breaking: bool,
    ) -> u32 {
        let next = self.latest_version().map_or(INITIAL_VERSION, |v| v + 1);
        for v in &mut self.versions {
            v.status = SchemeStatus::Inactive;
        }
        self.versions.push(SchemeVersion {
            scheme,
            version: next,
            status: SchemeStatus::Active,
            change_description,
            breaking,
        });
        next
    }

    /// Explicitly set the status of one version.
    ///
    /// Other versions are not touched; keeping at most one version active is
    /// the caller's responsibility.
    pub fn set_status(&mut self, version: u32, status: SchemeStatus) -> ChamberlainResult<()> {
        let v = self
            .versions
            .iter_mut()
            .find(|v| v.version == version)
            .ok_or_else(|| ChamberlainError::not_found(EntityKind::SchemeVersion, version.to_string()))?;
        v.status = status;
        Ok(())
    }

    /// The currently active version, if any.
    ///
    /// When several versions were activated through [`Self::set_status`] the
    /// highest-numbered one is returned.
    pub fn active(&self) -> Option<&SchemeVersion> {
        self.versions.iter().rev().find(|v| v.is_active())
    }

    /// The highest-numbered version regardless of status.
    pub fn latest(&self) -> Option<&SchemeVersion> {
        self.versions.last()
    }

    pub fn latest_version(&self) -> Option<u32> {
        self.versions.iter().map(|v| v.version).max()
    }

    pub fn get(&self, version: u32) -> Option<&SchemeVersion> {
        self.versions.iter().find(|v| v.version == version)
    }

    pub fn require(&self, version: u32) -> ChamberlainResult<&SchemeVersion> {
        self.get(version)
            .ok_or_else(|| ChamberlainError::not_found(EntityKind::SchemeVersion, version.to_string()))
    }

    pub fn contains(&self, version: u32) -> bool {
        self.get(version).is_some()
    }

    /// Baseline for compatibility checks: the active version, falling back to
    /// the latest one when every version has been deactivated.
    pub fn baseline(&self) -> Option<&SchemeVersion> {
        self.active().or_else(|| self.latest())
    }

    pub fn active_count(&self) -> usize {
        self.versions.iter().filter(|v| v.is_active()).count()
    }

    /// Versions in ascending order.
    pub fn versions(&self) -> &[SchemeVersion] {
        &self.versions
    }

    pub fn len(&self) -> usize {
        self.versions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.versions.is_empty()
    }
}

impl TryFrom<Vec<SchemeVersion>> for SchemeVersionLedger {
    type Error = ChamberlainError;

    fn try_from(v: Vec<SchemeVersion>) -> Result<Self, Self::Error> {
        Self::from_versions(v)
    }
}

impl From<SchemeVersionLedger> for Vec<SchemeVersion> {
    fn from(l: SchemeVersionLedger) -> Self {
        l.versions
    }
}
