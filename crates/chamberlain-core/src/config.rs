//! Configuration structures for chamberlain-core.
//!
//! This module defines explicit, serializable configuration objects used by
//! higher-level components (store facade, CLI) to control paging limits,
//! write-time policy, and the capabilities advertised to collaborators.
//!
//! The core crate itself does not read environment variables or files. All
//! configuration must be provided explicitly by the caller.

use serde::{Deserialize, Serialize};

use crate::errors::{ChamberlainError, ChamberlainResult};

/// Global configuration container.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct CoreConfig {
    pub paging: PagingConfig,
    pub policy: PolicyConfig,
    pub capabilities: Capabilities,
}

/// List paging limits.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct PagingConfig {
    pub default_page_size: usize,
    pub max_page_size: usize,
}

impl Default for PagingConfig {
    fn default() -> Self {
        Self {
            default_page_size: 10,
            max_page_size: 100,
        }
    }
}

/// Write-time policy applied by the store facade.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct PolicyConfig {
    /// Scheme updates with compatibility warnings fail unless `overwrite` is set.
    pub reject_incompatible_schemes: bool,
    /// Config payloads are validated against their scheme version on write.
    pub validate_payloads: bool,
    /// A scene that still owns configs cannot be deleted.
    pub block_scene_delete_with_configs: bool,
}

impl Default for PolicyConfig {
    fn default() -> Self {
        Self {
            reject_incompatible_schemes: true,
            validate_payloads: true,
            block_scene_delete_with_configs: true,
        }
    }
}

/// Feature flags reported to UI and API collaborators.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Capabilities {
    #[serde(rename = "scenes.search")]
    pub scenes_search: bool,
    #[serde(rename = "scenes.sort")]
    pub scenes_sort: bool,
    #[serde(rename = "configs.search")]
    pub configs_search: bool,
    #[serde(rename = "configs.sort")]
    pub configs_sort: bool,
    #[serde(rename = "configs.filter")]
    pub configs_filter: bool,
}

impl Default for Capabilities {
    fn default() -> Self {
        Self {
            scenes_search: true,
            scenes_sort: true,
            configs_search: true,
            configs_sort: true,
            configs_filter: true,
        }
    }
}

/// Validate a full configuration object.
pub fn validate_config(cfg: &CoreConfig) -> ChamberlainResult<()> {
    if cfg.paging.default_page_size == 0 {
        return Err(ChamberlainError::invalid_argument(
            "default_page_size must be greater than zero",
        ));
    }

    if cfg.paging.max_page_size == 0 {
        return Err(ChamberlainError::invalid_argument(
            "max_page_size must be greater than zero",
        ));
    }

    if cfg.paging.default_page_size > cfg.paging.max_page_size {
        return Err(ChamberlainError::invalid_argument(
            "default_page_size must not exceed max_page_size",
        ));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        let cfg = CoreConfig::default();
        validate_config(&cfg).unwrap();
    }

    #[test]
    fn invalid_limits_detected() {
        let mut cfg = CoreConfig::default();
        cfg.paging.default_page_size = cfg.paging.max_page_size + 1;
        assert!(validate_config(&cfg).is_err());
    }

    #[test]
    fn zero_page_size_detected() {
        let mut cfg = CoreConfig::default();
        cfg.paging.default_page_size = 0;
        assert!(validate_config(&cfg).is_err());
    }

    #[test]
    fn partial_json_fills_defaults() {
        let cfg: CoreConfig =
            serde_json::from_str(r#"{"policy":{"validatePayloads":false}}"#).unwrap();
        assert!(!cfg.policy.validate_payloads);
        assert!(cfg.policy.reject_incompatible_schemes);
        assert_eq!(cfg.paging, PagingConfig::default());
    }

    #[test]
    fn capabilities_use_dotted_names() {
        let v = serde_json::to_value(Capabilities::default()).unwrap();
        assert_eq!(v["configs.filter"], true);
    }
}
