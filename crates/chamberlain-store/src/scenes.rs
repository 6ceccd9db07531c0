//! Scene storage.
//!
//! A scene owns its scheme version ledger and its catalog of available
//! conditions. Every ledger mutation is a read-modify-write of the whole scene
//! record and runs inside the backend's write section, so the "at most one
//! active version" rule holds for every caller sharing the storage.

use std::sync::Arc;

use chamberlain_core::clock::Clock;
use chamberlain_core::compat::{self, CompatibilityReport};
use chamberlain_core::ledger::SchemeVersionLedger;
use chamberlain_core::model::{
    validate, AvailableCondition, Scene, ScenePatch, SchemeStatus, SchemeVersion,
};
use chamberlain_core::query::{
    apply_sort, format_sort, paginate, PageRequest, PageResult, SceneSortField, SortRule,
};
use chamberlain_core::{ChamberlainError, ChamberlainResult, EntityKind};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::backend::{KvBackend, Namespace, WriteLock};
use crate::table::Table;

/// Input for [`SceneStore::create_scene`].
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewScene {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    /// Initial JSON Schema, stored as version 1.
    pub scheme: Value,
    #[serde(default)]
    pub available_conditions: Vec<AvailableCondition>,
}

/// Input for [`SceneStore::update_scheme`].
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SchemeUpdate {
    pub scheme: Value,
    /// Accept the candidate even when the compatibility check warns.
    #[serde(default)]
    pub overwrite: bool,
    #[serde(default)]
    pub change_description: Option<String>,
}

/// Result of appending a scheme version.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SchemeUpdateOutcome {
    pub version: u32,
    /// Warnings accepted through `overwrite`.
    pub warnings: Vec<String>,
}

pub struct SceneStore {
    table: Table<Scene>,
    clock: Arc<dyn Clock>,
    reject_incompatible: bool,
}

impl SceneStore {
    pub fn new(backend: Arc<dyn KvBackend>, clock: Arc<dyn Clock>) -> Self {
        Self {
            table: Table::new(backend, Namespace::Scenes),
            clock,
            reject_incompatible: true,
        }
    }

    /// Whether scheme updates with warnings fail unless `overwrite` is set.
    pub fn reject_incompatible_schemes(mut self, reject: bool) -> Self {
        self.reject_incompatible = reject;
        self
    }

    pub fn create_scene(&self, req: NewScene) -> ChamberlainResult<Scene> {
        validate::validate_scene_id(&req.id)?;
        let name = require_name(&req.name)?;
        compat::check_schema_shape(&req.scheme)?;
        check_new_conditions(&[], &req.available_conditions)?;

        let now = self.clock.now();
        let scene = Scene {
            id: req.id,
            name,
            description: req.description,
            available_conditions: req.available_conditions,
            scheme_list: SchemeVersionLedger::initialize(req.scheme),
            created_at: now,
            updated_at: now,
        };
        if !self.table.insert(&scene.id, &scene)? {
            return Err(ChamberlainError::already_exists(EntityKind::Scene, scene.id));
        }

        info!(scene_id = %scene.id, "scene created");
        Ok(scene)
    }

    pub fn get_scene(&self, id: &str) -> ChamberlainResult<Scene> {
        self.table
            .get(id)?
            .ok_or_else(|| ChamberlainError::not_found(EntityKind::Scene, id))
    }

    pub fn exists(&self, id: &str) -> ChamberlainResult<bool> {
        self.table.contains(id)
    }

    /// Keyword search (case-insensitive substring of id or name), sort and page.
    pub fn list_scenes(
        &self,
        keyword: Option<&str>,
        sort: &[SortRule<SceneSortField>],
        page: PageRequest,
    ) -> ChamberlainResult<PageResult<Scene>> {
        let needle = keyword
            .map(str::trim)
            .filter(|k| !k.is_empty())
            .map(str::to_lowercase);

        let mut items: Vec<Scene> = self
            .table
            .list()?
            .into_iter()
            .filter(|s| match &needle {
                Some(k) => s.id.to_lowercase().contains(k) || s.name.to_lowercase().contains(k),
                None => true,
            })
            .collect();
        apply_sort(&mut items, sort);
        debug!(sort = %format_sort(sort), matched = items.len(), "scenes listed");
        Ok(paginate(items, page))
    }

    /// Update name, description and the condition catalog.
    ///
    /// `available_conditions`, when present, is the full desired list. Every
    /// existing definition must appear in it unchanged; new keys are appended
    /// in the order given.
    pub fn update_scene(&self, id: &str, patch: ScenePatch) -> ChamberlainResult<Scene> {
        let _lock = self.table.lock()?;
        let mut scene = self.get_scene(id)?;

        if let Some(name) = patch.name {
            scene.name = require_name(&name)?;
        }
        if let Some(description) = patch.description {
            scene.description = Some(description);
        }
        if let Some(desired) = patch.available_conditions {
            scene.available_conditions = merge_conditions(&scene.available_conditions, desired)?;
        }
        scene.updated_at = self.clock.now();

        self.table.put(id, &scene)?;
        info!(scene_id = %id, "scene updated");
        Ok(scene)
    }

    pub fn delete_scene(&self, id: &str) -> ChamberlainResult<()> {
        let lock = self.table.lock()?;
        self.delete_scene_locked(&lock, id)
    }

    pub(crate) fn delete_scene_locked(
        &self,
        _lock: &WriteLock<'_>,
        id: &str,
    ) -> ChamberlainResult<()> {
        if !self.table.delete(id)? {
            return Err(ChamberlainError::not_found(EntityKind::Scene, id));
        }
        info!(scene_id = %id, "scene deleted");
        Ok(())
    }

    /// Append one condition definition to the catalog.
    pub fn add_condition(
        &self,
        id: &str,
        condition: AvailableCondition,
    ) -> ChamberlainResult<Scene> {
        let _lock = self.table.lock()?;
        let mut scene = self.get_scene(id)?;

        check_new_conditions(&scene.available_conditions, std::slice::from_ref(&condition))?;
        let key = condition.key.clone();
        scene.available_conditions.push(condition);
        scene.updated_at = self.clock.now();

        self.table.put(id, &scene)?;
        info!(scene_id = %id, condition_key = %key, "condition added");
        Ok(scene)
    }

    /// Dry-run compatibility check of `candidate` against the scene's baseline
    /// version (active, else latest).
    pub fn validate_scheme(
        &self,
        id: &str,
        candidate: &Value,
    ) -> ChamberlainResult<CompatibilityReport> {
        compat::check_schema_shape(candidate)?;
        let scene = self.get_scene(id)?;
        Ok(baseline_report(&scene, candidate))
    }

    /// Append `update.scheme` as the new active version.
    ///
    /// With the reject policy on, a candidate producing warnings fails with
    /// `IncompatibleSchema` unless `overwrite` is set. Accepted warnings are
    /// recorded on the new version as `breaking`.
    pub fn update_scheme(
        &self,
        id: &str,
        update: SchemeUpdate,
    ) -> ChamberlainResult<SchemeUpdateOutcome> {
        compat::check_schema_shape(&update.scheme)?;

        let _lock = self.table.lock()?;
        let mut scene = self.get_scene(id)?;

        let report = baseline_report(&scene, &update.scheme);
        if !report.valid {
            debug!(scene_id = %id, warnings = ?report.warnings, "scheme compatibility warnings");
            if self.reject_incompatible && !update.overwrite {
                return Err(ChamberlainError::IncompatibleSchema {
                    warnings: report.warnings,
                });
            }
            warn!(
                scene_id = %id,
                count = report.warnings.len(),
                "scheme update forced through with warnings"
            );
        }

        let version = scene.scheme_list.append_version_with(
            update.scheme,
            update.change_description,
            !report.valid,
        );
        scene.updated_at = self.clock.now();

        self.table.put(id, &scene)?;
        info!(scene_id = %id, version, "scheme version appended");
        Ok(SchemeUpdateOutcome {
            version,
            warnings: report.warnings,
        })
    }

    /// Set the status of one version.
    ///
    /// Activating a version deactivates every other one, keeping at most one
    /// version active. Deactivating may leave the scene with none.
    pub fn set_scheme_status(
        &self,
        id: &str,
        version: u32,
        status: SchemeStatus,
    ) -> ChamberlainResult<Scene> {
        let _lock = self.table.lock()?;
        let mut scene = self.get_scene(id)?;

        scene.scheme_list.require(version)?;
        if status == SchemeStatus::Active {
            let others: Vec<u32> = scene
                .scheme_list
                .versions()
                .iter()
                .filter(|v| v.version != version && v.is_active())
                .map(|v| v.version)
                .collect();
            for other in others {
                scene.scheme_list.set_status(other, SchemeStatus::Inactive)?;
            }
        }
        scene.scheme_list.set_status(version, status)?;
        scene.updated_at = self.clock.now();

        self.table.put(id, &scene)?;
        info!(scene_id = %id, version, status = status.as_str(), "scheme status changed");
        Ok(scene)
    }

    /// All versions, newest first.
    pub fn scheme_versions(&self, id: &str) -> ChamberlainResult<Vec<SchemeVersion>> {
        let scene = self.get_scene(id)?;
        Ok(scene.scheme_list.versions().iter().rev().cloned().collect())
    }

    pub fn active_scheme(&self, id: &str) -> ChamberlainResult<Option<SchemeVersion>> {
        Ok(self.get_scene(id)?.scheme_list.active().cloned())
    }
}

fn baseline_report(scene: &Scene, candidate: &Value) -> CompatibilityReport {
    match scene.scheme_list.baseline() {
        Some(base) => compat::check(&base.scheme, candidate),
        None => CompatibilityReport::from_changes(&[]),
    }
}

fn require_name(name: &str) -> ChamberlainResult<String> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(ChamberlainError::invalid_argument("scene name must not be empty"));
    }
    Ok(trimmed.to_string())
}

/// Validate definitions about to be added next to `existing`.
fn check_new_conditions(
    existing: &[AvailableCondition],
    added: &[AvailableCondition],
) -> ChamberlainResult<()> {
    let mut seen: Vec<&str> = existing.iter().map(|c| c.key.as_str()).collect();
    for cond in added {
        validate::validate_condition_key(&cond.key)?;
        if seen.contains(&cond.key.as_str()) {
            return Err(ChamberlainError::already_exists(
                EntityKind::Condition,
                cond.key.clone(),
            ));
        }
        seen.push(&cond.key);
    }
    Ok(())
}

/// Merge a desired catalog into the current one. Existing entries must be
/// carried over verbatim.
fn merge_conditions(
    current: &[AvailableCondition],
    desired: Vec<AvailableCondition>,
) -> ChamberlainResult<Vec<AvailableCondition>> {
    for existing in current {
        match desired.iter().find(|d| d.key == existing.key) {
            None => {
                return Err(ChamberlainError::invalid_argument(format!(
                    "condition {} cannot be removed",
                    existing.key
                )))
            }
            Some(d) if d != existing => {
                return Err(ChamberlainError::invalid_argument(format!(
                    "condition {} is immutable once added",
                    existing.key
                )))
            }
            Some(_) => {}
        }
    }

    let added: Vec<AvailableCondition> = desired
        .into_iter()
        .filter(|d| !current.iter().any(|c| c.key == d.key))
        .collect();
    check_new_conditions(current, &added)?;

    let mut merged = current.to_vec();
    merged.extend(added);
    Ok(merged)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::MemoryBackend;
    use assert_matches::assert_matches;
    use chamberlain_core::clock::FixedClock;
    use serde_json::json;

    fn store() -> (SceneStore, Arc<FixedClock>) {
        let clock = Arc::new(FixedClock::at_unix(1_700_000_000));
        let s = SceneStore::new(Arc::new(MemoryBackend::new()), clock.clone());
        (s, clock)
    }

    fn new_scene(id: &str) -> NewScene {
        NewScene {
            id: id.into(),
            name: format!("Scene {id}"),
            description: None,
            scheme: json!({"type": "object", "properties": {"host": {"type": "string"}}}),
            available_conditions: vec![AvailableCondition::new("env", "Environment")],
        }
    }

    fn page() -> PageRequest {
        PageRequest::new(1, 10).unwrap()
    }

    #[test]
    fn create_seeds_active_v1() {
        let (s, _) = store();
        let scene = s.create_scene(new_scene("env_db")).unwrap();
        let active = scene.scheme_list.active().unwrap();
        assert_eq!(active.version, 1);
        assert_eq!(scene.scheme_list.len(), 1);

        assert_matches!(
            s.create_scene(new_scene("env_db")),
            Err(ChamberlainError::AlreadyExists { kind: EntityKind::Scene, .. })
        );
    }

    #[test]
    fn stored_ledger_with_repeated_versions_fails_to_load() {
        let backend = Arc::new(MemoryBackend::new());
        let s = SceneStore::new(backend.clone(), Arc::new(FixedClock::at_unix(1_700_000_000)));
        s.create_scene(new_scene("env_db")).unwrap();

        let mut raw = backend.get(Namespace::Scenes, "env_db").unwrap().unwrap();
        let v1 = raw["schemeList"][0].clone();
        raw["schemeList"] = json!([v1.clone(), v1]);
        backend.put(Namespace::Scenes, "env_db", &raw).unwrap();

        let err = s.get_scene("env_db").unwrap_err();
        assert_eq!(err.code(), "SERIALIZATION_ERROR");
        let update = SchemeUpdate {
            scheme: json!({}),
            overwrite: true,
            change_description: None,
        };
        assert!(s.update_scheme("env_db", update).is_err());
    }

    #[test]
    fn create_rejects_bad_input() {
        let (s, _) = store();
        let err = s.create_scene(new_scene("Env-DB")).unwrap_err();
        assert_eq!(err.code(), "INVALID_SCENE_ID_FORMAT");

        let mut req = new_scene("ok");
        req.scheme = json!("not a schema");
        assert_eq!(s.create_scene(req).unwrap_err().code(), "INVALID_SCHEME");

        let mut req = new_scene("ok");
        req.available_conditions = vec![AvailableCondition::new("1bad", "Bad")];
        assert_eq!(s.create_scene(req).unwrap_err().code(), "INVALID_CONDITION_KEY");

        let mut req = new_scene("ok");
        req.name = "  ".into();
        assert_matches!(s.create_scene(req), Err(ChamberlainError::InvalidArgument(_)));
    }

    #[test]
    fn compatible_update_appends_and_deactivates() {
        let (s, _) = store();
        s.create_scene(new_scene("app")).unwrap();
        let out = s
            .update_scheme(
                "app",
                SchemeUpdate {
                    scheme: json!({"properties": {"host": {"type": "string"}, "port": {"type": "integer"}}}),
                    overwrite: false,
                    change_description: Some("add port".into()),
                },
            )
            .unwrap();
        assert_eq!(out.version, 2);
        assert!(out.warnings.is_empty());

        let versions = s.scheme_versions("app").unwrap();
        assert_eq!(versions.iter().map(|v| v.version).collect::<Vec<_>>(), vec![2, 1]);
        assert!(versions[0].is_active());
        assert!(!versions[1].is_active());
        assert!(!versions[0].breaking);
        assert_eq!(s.active_scheme("app").unwrap().map(|v| v.version), Some(2));
    }

    #[test]
    fn incompatible_update_needs_overwrite() {
        let (s, _) = store();
        s.create_scene(new_scene("app")).unwrap();
        let candidate = json!({"properties": {}});

        let report = s.validate_scheme("app", &candidate).unwrap();
        assert!(!report.valid);
        assert_eq!(report.warnings.len(), 1);

        let err = s
            .update_scheme(
                "app",
                SchemeUpdate {
                    scheme: candidate.clone(),
                    overwrite: false,
                    change_description: None,
                },
            )
            .unwrap_err();
        assert_matches!(err, ChamberlainError::IncompatibleSchema { ref warnings } if warnings.len() == 1);
        assert_eq!(s.scheme_versions("app").unwrap().len(), 1);

        let out = s
            .update_scheme(
                "app",
                SchemeUpdate {
                    scheme: candidate,
                    overwrite: true,
                    change_description: None,
                },
            )
            .unwrap();
        assert_eq!(out.version, 2);
        assert_eq!(out.warnings.len(), 1);
        assert!(s.active_scheme("app").unwrap().unwrap().breaking);
    }

    #[test]
    fn permissive_policy_accepts_warnings() {
        let clock = Arc::new(FixedClock::default());
        let s = SceneStore::new(Arc::new(MemoryBackend::new()), clock)
            .reject_incompatible_schemes(false);
        s.create_scene(new_scene("app")).unwrap();
        let out = s
            .update_scheme(
                "app",
                SchemeUpdate {
                    scheme: json!({}),
                    overwrite: false,
                    change_description: None,
                },
            )
            .unwrap();
        assert_eq!(out.version, 2);
    }

    #[test]
    fn activating_an_old_version_deactivates_the_rest() {
        let (s, _) = store();
        s.create_scene(new_scene("app")).unwrap();
        let update = SchemeUpdate {
            scheme: json!({"properties": {"host": {"type": "string"}}}),
            overwrite: false,
            change_description: None,
        };
        s.update_scheme("app", update.clone()).unwrap();
        s.update_scheme("app", update).unwrap();

        let scene = s.set_scheme_status("app", 1, SchemeStatus::Active).unwrap();
        assert_eq!(scene.scheme_list.active_count(), 1);
        assert_eq!(scene.scheme_list.active().unwrap().version, 1);

        let scene = s.set_scheme_status("app", 1, SchemeStatus::Inactive).unwrap();
        assert!(scene.scheme_list.active().is_none());
        assert_eq!(scene.scheme_list.baseline().unwrap().version, 3);

        let err = s.set_scheme_status("app", 9, SchemeStatus::Active).unwrap_err();
        assert_eq!(err.code(), "SCHEME_VERSION_NOT_FOUND");
    }

    #[test]
    fn condition_catalog_only_grows() {
        let (s, clock) = store();
        let created = s.create_scene(new_scene("app")).unwrap();
        clock.advance(10);

        let scene = s
            .add_condition("app", AvailableCondition::new("region", "Region"))
            .unwrap();
        assert_eq!(scene.available_conditions.len(), 2);
        assert!(scene.updated_at > created.updated_at);

        let err = s
            .add_condition("app", AvailableCondition::new("env", "Again"))
            .unwrap_err();
        assert_eq!(err.code(), "CONDITION_EXISTS");

        let removal = ScenePatch {
            available_conditions: Some(vec![AvailableCondition::new("env", "Environment")]),
            ..ScenePatch::default()
        };
        assert_matches!(s.update_scene("app", removal), Err(ChamberlainError::InvalidArgument(_)));

        let mutation = ScenePatch {
            available_conditions: Some(vec![
                AvailableCondition::new("env", "Renamed"),
                AvailableCondition::new("region", "Region"),
            ]),
            ..ScenePatch::default()
        };
        assert_matches!(s.update_scene("app", mutation), Err(ChamberlainError::InvalidArgument(_)));

        let growth = ScenePatch {
            name: Some("Application".into()),
            available_conditions: Some(vec![
                AvailableCondition::new("tier", "Tier"),
                AvailableCondition::new("env", "Environment"),
                AvailableCondition::new("region", "Region"),
            ]),
            ..ScenePatch::default()
        };
        let scene = s.update_scene("app", growth).unwrap();
        let keys: Vec<_> = scene.available_conditions.iter().map(|c| c.key.as_str()).collect();
        assert_eq!(keys, vec!["env", "region", "tier"]);
        assert_eq!(scene.name, "Application");
    }

    #[test]
    fn list_searches_id_and_name() {
        let (s, clock) = store();
        s.create_scene(new_scene("alpha")).unwrap();
        clock.advance(1);
        let mut beta = new_scene("beta");
        beta.name = "Payments".into();
        s.create_scene(beta).unwrap();

        let hits = s.list_scenes(Some("PAY"), &[], page()).unwrap();
        assert_eq!(hits.total, 1);
        assert_eq!(hits.list[0].id, "beta");

        let all = s
            .list_scenes(None, &[SortRule::desc(SceneSortField::CreatedAt)], page())
            .unwrap();
        let ids: Vec<_> = all.list.iter().map(|s| s.id.as_str()).collect();
        assert_eq!(ids, vec!["beta", "alpha"]);
    }

    #[test]
    fn delete_missing_scene() {
        let (s, _) = store();
        assert_eq!(s.delete_scene("ghost").unwrap_err().code(), "SCENE_NOT_FOUND");
        s.create_scene(new_scene("ghost")).unwrap();
        s.delete_scene("ghost").unwrap();
        assert!(!s.exists("ghost").unwrap());
    }
}
