//! Orchestration facade.
//!
//! [`Chamberlain`] wires a [`SceneStore`] and a [`ConfigStore`] over one
//! backend and applies the cross-entity policy from [`CoreConfig`]:
//! - a config can only be created for an existing scene and scheme version
//! - payloads are validated against their scheme version (policy)
//! - a scene that still owns configs cannot be deleted (policy); with the
//!   policy off, deleting a scene removes its configs
//! - list parameters are resolved against paging limits and capabilities
//!
//! Checks that span both stores run inside the backend's write section
//! together with the write they guard, so a config cannot be created for a
//! scene that is being deleted.

use std::sync::Arc;

use chamberlain_core::clock::{Clock, SystemClock};
use chamberlain_core::compat::CompatibilityReport;
use chamberlain_core::config::{validate_config, Capabilities, CoreConfig};
use chamberlain_core::model::{
    AvailableCondition, Condition, Config, ConfigPatch, Scene, ScenePatch, SchemeStatus,
    SchemeVersion,
};
use chamberlain_core::query::{parse_sort, PageRequest, PageResult};
use chamberlain_core::validator::{SchemaValidator, StructuralValidator, ValidationReport};
use chamberlain_core::{ChamberlainError, ChamberlainResult};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info};

use crate::backend::KvBackend;
use crate::configs::{ConfigQuery, ConfigStore};
use crate::scenes::{NewScene, SceneStore, SchemeUpdate, SchemeUpdateOutcome};

/// Input for [`Chamberlain::create_config`].
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewConfig {
    pub scene_id: String,
    /// Defaults to the scene's active version.
    #[serde(default)]
    pub scheme_version: Option<u32>,
    #[serde(default, alias = "conditionList")]
    pub conditions: Vec<Condition>,
    pub config: Value,
}

/// Raw list parameters as received from a caller.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListParams {
    pub page: Option<usize>,
    pub page_size: Option<usize>,
    pub keyword: Option<String>,
    /// `field:order,...`
    pub sort: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConfigListParams {
    pub scene_id: String,
    pub scheme_version: Option<u32>,
    pub conditions: Vec<Condition>,
    pub list: ListParams,
}

pub struct Chamberlain {
    backend: Arc<dyn KvBackend>,
    scenes: SceneStore,
    configs: ConfigStore,
    validator: Arc<dyn SchemaValidator>,
    config: CoreConfig,
}

impl Chamberlain {
    /// System clock and the built-in structural validator.
    pub fn new(backend: Arc<dyn KvBackend>, config: CoreConfig) -> ChamberlainResult<Self> {
        Self::with_parts(
            backend,
            Arc::new(SystemClock),
            Arc::new(StructuralValidator),
            config,
        )
    }

    pub fn with_parts(
        backend: Arc<dyn KvBackend>,
        clock: Arc<dyn Clock>,
        validator: Arc<dyn SchemaValidator>,
        config: CoreConfig,
    ) -> ChamberlainResult<Self> {
        validate_config(&config)?;
        let scenes = SceneStore::new(Arc::clone(&backend), Arc::clone(&clock))
            .reject_incompatible_schemes(config.policy.reject_incompatible_schemes);
        let configs = ConfigStore::new(Arc::clone(&backend), clock);
        Ok(Self {
            backend,
            scenes,
            configs,
            validator,
            config,
        })
    }

    pub fn config(&self) -> &CoreConfig {
        &self.config
    }

    pub fn capabilities(&self) -> &Capabilities {
        &self.config.capabilities
    }

    pub fn scenes(&self) -> &SceneStore {
        &self.scenes
    }

    pub fn configs(&self) -> &ConfigStore {
        &self.configs
    }

    // ---- scenes ----

    pub fn create_scene(&self, req: NewScene) -> ChamberlainResult<Scene> {
        self.scenes.create_scene(req)
    }

    pub fn get_scene(&self, id: &str) -> ChamberlainResult<Scene> {
        self.scenes.get_scene(id)
    }

    pub fn list_scenes(&self, params: &ListParams) -> ChamberlainResult<PageResult<Scene>> {
        let caps = &self.config.capabilities;
        let keyword = gated(params.keyword.as_deref(), caps.scenes_search, "scenes.search")?;
        let sort = gated(params.sort.as_deref(), caps.scenes_sort, "scenes.sort")?;
        let rules = parse_sort(sort.unwrap_or(""))?;
        let page = self.page_request(params)?;
        self.scenes.list_scenes(keyword, &rules, page)
    }

    pub fn update_scene(&self, id: &str, patch: ScenePatch) -> ChamberlainResult<Scene> {
        self.scenes.update_scene(id, patch)
    }

    /// Delete a scene, honoring `block_scene_delete_with_configs`.
    pub fn delete_scene(&self, id: &str) -> ChamberlainResult<()> {
        let lock = self.backend.lock()?;
        self.scenes.get_scene(id)?;
        let count = self.configs.count_for_scene(id)?;
        if count > 0 {
            if self.config.policy.block_scene_delete_with_configs {
                return Err(ChamberlainError::SceneHasConfigs {
                    scene_id: id.to_string(),
                    count,
                });
            }
            self.configs.delete_for_scene_locked(&lock, id)?;
        }
        self.scenes.delete_scene_locked(&lock, id)
    }

    pub fn add_condition(
        &self,
        id: &str,
        condition: AvailableCondition,
    ) -> ChamberlainResult<Scene> {
        self.scenes.add_condition(id, condition)
    }

    pub fn validate_scheme(
        &self,
        id: &str,
        candidate: &Value,
    ) -> ChamberlainResult<CompatibilityReport> {
        self.scenes.validate_scheme(id, candidate)
    }

    pub fn update_scheme(
        &self,
        id: &str,
        update: SchemeUpdate,
    ) -> ChamberlainResult<SchemeUpdateOutcome> {
        self.scenes.update_scheme(id, update)
    }

    pub fn set_scheme_status(
        &self,
        id: &str,
        version: u32,
        status: SchemeStatus,
    ) -> ChamberlainResult<Scene> {
        self.scenes.set_scheme_status(id, version, status)
    }

    pub fn scheme_versions(&self, id: &str) -> ChamberlainResult<Vec<SchemeVersion>> {
        self.scenes.scheme_versions(id)
    }

    pub fn active_scheme(&self, id: &str) -> ChamberlainResult<Option<SchemeVersion>> {
        self.scenes.active_scheme(id)
    }

    // ---- configs ----

    /// Create a config after checking its scene and scheme version exist and,
    /// when the policy asks for it, that the payload conforms.
    pub fn create_config(&self, req: NewConfig) -> ChamberlainResult<Config> {
        let lock = self.backend.lock()?;
        let scene = self.scenes.get_scene(&req.scene_id)?;
        let version = match req.scheme_version {
            Some(v) => scene.scheme_list.require(v)?,
            None => scene.scheme_list.active().ok_or_else(|| {
                ChamberlainError::invalid_argument(format!(
                    "scene {} has no active scheme version; pass schemeVersion explicitly",
                    scene.id
                ))
            })?,
        };
        self.enforce_payload(version, &req.config)?;
        self.configs
            .create_locked(&lock, &scene.id, version.version, req.conditions, req.config)
    }

    pub fn get_config(&self, id: &str) -> ChamberlainResult<Config> {
        self.configs.get(id)
    }

    pub fn find_config(
        &self,
        scene_id: &str,
        conditions: Vec<Condition>,
    ) -> ChamberlainResult<Option<Config>> {
        self.configs.find(scene_id, conditions)
    }

    /// Update a config. A new scheme version must exist on the scene, and the
    /// resulting payload is validated against the resulting version.
    pub fn update_config(&self, id: &str, patch: ConfigPatch) -> ChamberlainResult<Config> {
        let lock = self.backend.lock()?;
        if patch.scheme_version.is_some() || patch.config.is_some() {
            let current = self.configs.get(id)?;
            let scene = self.scenes.get_scene(&current.scene_id)?;
            let target = patch.scheme_version.unwrap_or(current.scheme_version);
            let version = scene.scheme_list.require(target)?;
            let data = patch.config.as_ref().unwrap_or(&current.config);
            self.enforce_payload(version, data)?;
        }
        self.configs.update_locked(&lock, id, patch)
    }

    pub fn copy_config(
        &self,
        source_id: &str,
        to_conditions: Vec<Condition>,
    ) -> ChamberlainResult<Config> {
        self.configs.copy(source_id, to_conditions)
    }

    pub fn delete_config(&self, id: &str) -> ChamberlainResult<()> {
        self.configs.delete(id)
    }

    pub fn list_configs(
        &self,
        params: &ConfigListParams,
    ) -> ChamberlainResult<PageResult<Config>> {
        let caps = &self.config.capabilities;
        let keyword = gated(
            params.list.keyword.as_deref(),
            caps.configs_search,
            "configs.search",
        )?;
        let sort = gated(params.list.sort.as_deref(), caps.configs_sort, "configs.sort")?;
        if !params.conditions.is_empty() && !caps.configs_filter {
            return Err(capability_disabled("configs.filter"));
        }

        let rules = parse_sort(sort.unwrap_or(""))?;
        let page = self.page_request(&params.list)?;
        let query = ConfigQuery {
            scene_id: params.scene_id.clone(),
            scheme_version: params.scheme_version,
            conditions: params.conditions.clone(),
            keyword: keyword.map(str::to_string),
        };
        self.configs.list(&query, &rules, page)
    }

    /// Check `data` against one scheme version of a scene without storing it.
    pub fn validate_payload(
        &self,
        scene_id: &str,
        version: Option<u32>,
        data: &Value,
    ) -> ChamberlainResult<ValidationReport> {
        let scene = self.scenes.get_scene(scene_id)?;
        let version = match version {
            Some(v) => scene.scheme_list.require(v)?,
            None => scene
                .scheme_list
                .baseline()
                .ok_or_else(|| ChamberlainError::invariant("scene has no scheme versions"))?,
        };
        Ok(self.validator.validate(&version.scheme, data))
    }

    fn enforce_payload(&self, version: &SchemeVersion, data: &Value) -> ChamberlainResult<()> {
        if !self.config.policy.validate_payloads {
            return Ok(());
        }
        let report = self.validator.validate(&version.scheme, data);
        if report.valid {
            return Ok(());
        }
        let errors = report.messages();
        debug!(version = version.version, ?errors, "config payload rejected");
        Err(ChamberlainError::ValidationFailed {
            version: version.version,
            errors,
        })
    }

    /// Resolve page parameters; the page size is capped at `max_page_size`.
    fn page_request(&self, params: &ListParams) -> ChamberlainResult<PageRequest> {
        let paging = &self.config.paging;
        let requested = params.page_size.unwrap_or(paging.default_page_size);
        let size = requested.min(paging.max_page_size);
        if size != requested {
            info!(requested, capped = size, "page size capped");
        }
        PageRequest::new(params.page.unwrap_or(1), size)
    }
}

fn capability_disabled(name: &str) -> ChamberlainError {
    ChamberlainError::invalid_argument(format!("capability {name} is disabled"))
}

/// Pass `value` through when its capability is on; a non-empty value for a
/// disabled capability is an error.
fn gated<'a>(
    value: Option<&'a str>,
    enabled: bool,
    name: &str,
) -> ChamberlainResult<Option<&'a str>> {
    match value.filter(|v| !v.trim().is_empty()) {
        Some(_) if !enabled => Err(capability_disabled(name)),
        other => Ok(other),
    }
}
