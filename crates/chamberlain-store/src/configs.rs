//! Config storage.
//!
//! Configs are keyed by their derived identity, so uniqueness of
//! `(scene_id, conditions)` comes down to an insert-only write of the id.
//! Every mutation runs inside the backend's write section, which the facade
//! also holds across its own scene checks. Methods taking a [`WriteLock`]
//! expect the caller to hold it already.

use std::sync::Arc;

use chamberlain_core::clock::Clock;
use chamberlain_core::condition::ConditionSet;
use chamberlain_core::identity;
use chamberlain_core::model::{validate, Condition, Config, ConfigPatch};
use chamberlain_core::query::{
    apply_sort, format_sort, paginate, ConfigSortField, PageRequest, PageResult, SortRule,
};
use chamberlain_core::{ChamberlainError, ChamberlainResult, EntityKind};
use serde_json::Value;
use tracing::{debug, info};

use crate::backend::{KvBackend, Namespace, WriteLock};
use crate::table::Table;

/// Filter for [`ConfigStore::list`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConfigQuery {
    pub scene_id: String,
    pub scheme_version: Option<u32>,
    /// Subset match against each config's condition list. Empty matches all.
    pub conditions: Vec<Condition>,
    /// Case-insensitive substring of the config id.
    pub keyword: Option<String>,
}

impl ConfigQuery {
    pub fn scene(scene_id: impl Into<String>) -> Self {
        Self {
            scene_id: scene_id.into(),
            ..Self::default()
        }
    }

    pub fn matches(&self, config: &Config) -> bool {
        if config.scene_id != self.scene_id {
            return false;
        }
        if self
            .scheme_version
            .is_some_and(|v| v != config.scheme_version)
        {
            return false;
        }
        if !config.condition_list.matches(&self.conditions) {
            return false;
        }
        match self.keyword.as_deref().map(str::trim) {
            Some(k) if !k.is_empty() => config
                .id
                .to_lowercase()
                .contains(&k.to_lowercase()),
            _ => true,
        }
    }
}

pub struct ConfigStore {
    table: Table<Config>,
    clock: Arc<dyn Clock>,
}

impl ConfigStore {
    pub fn new(backend: Arc<dyn KvBackend>, clock: Arc<dyn Clock>) -> Self {
        Self {
            table: Table::new(backend, Namespace::Configs),
            clock,
        }
    }

    /// Persist a new config under its derived id.
    ///
    /// Fails with `AlreadyExists` when a config with an equal condition set
    /// already exists for the scene, regardless of the order `conditions` were
    /// supplied in.
    pub fn create(
        &self,
        scene_id: &str,
        scheme_version: u32,
        conditions: Vec<Condition>,
        data: Value,
    ) -> ChamberlainResult<Config> {
        let lock = self.table.lock()?;
        self.create_locked(&lock, scene_id, scheme_version, conditions, data)
    }

    pub(crate) fn create_locked(
        &self,
        _lock: &WriteLock<'_>,
        scene_id: &str,
        scheme_version: u32,
        conditions: Vec<Condition>,
        data: Value,
    ) -> ChamberlainResult<Config> {
        validate::validate_scene_id(scene_id)?;
        let set = ConditionSet::normalize(conditions)?;
        let id = identity::generate(scene_id, &set);

        let now = self.clock.now();
        let config = Config {
            id: id.clone(),
            scene_id: scene_id.to_string(),
            scheme_version,
            condition_hash: set.digest(),
            condition_list: set,
            config: data,
            created_at: now,
            updated_at: now,
        };
        if !self.table.insert(&id, &config)? {
            return Err(ChamberlainError::already_exists(EntityKind::Config, id));
        }

        info!(config_id = %id, scene_id, scheme_version, "config created");
        Ok(config)
    }

    pub fn get(&self, id: &str) -> ChamberlainResult<Config> {
        self.table
            .get(id)?
            .ok_or_else(|| ChamberlainError::not_found(EntityKind::Config, id))
    }

    /// Look up the config of `scene_id` whose condition set equals `conditions`.
    pub fn find(
        &self,
        scene_id: &str,
        conditions: Vec<Condition>,
    ) -> ChamberlainResult<Option<Config>> {
        let set = ConditionSet::normalize(conditions)?;
        self.table.get(&identity::generate(scene_id, &set))
    }

    /// Apply the fields present in `patch` and refresh `updated_at`.
    ///
    /// The identity-defining fields are immutable: a `condition_list` in the
    /// patch must normalize to the stored set, otherwise the update fails with
    /// `InvalidArgument`. Use [`Self::copy`] to re-key a config.
    pub fn update(&self, id: &str, patch: ConfigPatch) -> ChamberlainResult<Config> {
        let lock = self.table.lock()?;
        self.update_locked(&lock, id, patch)
    }

    pub(crate) fn update_locked(
        &self,
        _lock: &WriteLock<'_>,
        id: &str,
        patch: ConfigPatch,
    ) -> ChamberlainResult<Config> {
        let mut config = self.get(id)?;

        if let Some(list) = patch.condition_list {
            let set = ConditionSet::normalize(list)?;
            if set != config.condition_list {
                return Err(ChamberlainError::invalid_argument(format!(
                    "conditions of config {id} cannot change (requested {set}); copy it to the new conditions instead"
                )));
            }
        }
        if let Some(version) = patch.scheme_version {
            config.scheme_version = version;
        }
        if let Some(data) = patch.config {
            config.config = data;
        }
        config.condition_hash = config.condition_list.digest();
        config.updated_at = self.clock.now();

        self.table.put(id, &config)?;
        info!(config_id = %id, scheme_version = config.scheme_version, "config updated");
        Ok(config)
    }

    /// Duplicate `source_id` under `to_conditions`, keeping its scene, scheme
    /// version and payload.
    pub fn copy(
        &self,
        source_id: &str,
        to_conditions: Vec<Condition>,
    ) -> ChamberlainResult<Config> {
        let set = ConditionSet::normalize(to_conditions)?;

        let _lock = self.table.lock()?;
        let source = self.get(source_id)?;
        let id = identity::generate(&source.scene_id, &set);

        let now = self.clock.now();
        let config = Config {
            id: id.clone(),
            scene_id: source.scene_id,
            scheme_version: source.scheme_version,
            condition_hash: set.digest(),
            condition_list: set,
            config: source.config,
            created_at: now,
            updated_at: now,
        };
        if !self.table.insert(&id, &config)? {
            return Err(ChamberlainError::already_exists(EntityKind::Config, id));
        }

        info!(config_id = %id, source_id, "config copied");
        Ok(config)
    }

    pub fn delete(&self, id: &str) -> ChamberlainResult<()> {
        let _lock = self.table.lock()?;
        if !self.table.delete(id)? {
            return Err(ChamberlainError::not_found(EntityKind::Config, id));
        }
        info!(config_id = %id, "config deleted");
        Ok(())
    }

    /// Filter, sort and page the configs of one scene.
    pub fn list(
        &self,
        query: &ConfigQuery,
        sort: &[SortRule<ConfigSortField>],
        page: PageRequest,
    ) -> ChamberlainResult<PageResult<Config>> {
        let mut items: Vec<Config> = self
            .table
            .list()?
            .into_iter()
            .filter(|c| query.matches(c))
            .collect();
        apply_sort(&mut items, sort);
        debug!(
            scene_id = %query.scene_id,
            sort = %format_sort(sort),
            matched = items.len(),
            "configs listed"
        );
        Ok(paginate(items, page))
    }

    pub fn count_for_scene(&self, scene_id: &str) -> ChamberlainResult<usize> {
        Ok(self
            .table
            .list()?
            .iter()
            .filter(|c| c.scene_id == scene_id)
            .count())
    }

    /// Remove every config of `scene_id`. Returns how many were removed.
    pub fn delete_for_scene(&self, scene_id: &str) -> ChamberlainResult<usize> {
        let lock = self.table.lock()?;
        self.delete_for_scene_locked(&lock, scene_id)
    }

    pub(crate) fn delete_for_scene_locked(
        &self,
        _lock: &WriteLock<'_>,
        scene_id: &str,
    ) -> ChamberlainResult<usize> {
        let mut removed = 0;
        for config in self.table.list()? {
            if config.scene_id == scene_id && self.table.delete(&config.id)? {
                removed += 1;
            }
        }
        if removed > 0 {
            info!(scene_id, removed, "scene configs deleted");
        }
        Ok(removed)
    }
}
