use std::fs;
use std::path::Path;

use anyhow::{anyhow, Context, Result};
use serde::de::DeserializeOwned;
use serde_json::Value;

use chamberlain_core::condition::parse_condition_filter;
use chamberlain_core::config::{validate_config, CoreConfig};
use chamberlain_core::model::Condition;

/// Resolve a JSON argument: `@path` reads a file, anything else is parsed inline.
pub fn read_json_arg(arg: &str) -> Result<Value> {
    match arg.strip_prefix('@') {
        Some(path) => read_json_file(path),
        None => serde_json::from_str(arg).map_err(|e| anyhow!("invalid json argument: {e}")),
    }
}

/// Like [`read_json_arg`], decoding into `T`.
pub fn read_typed_arg<T: DeserializeOwned>(arg: &str) -> Result<T> {
    let v = read_json_arg(arg)?;
    serde_json::from_value(v).map_err(|e| anyhow!("unexpected json shape: {e}"))
}

pub fn read_json_file<P: AsRef<Path>>(path: P) -> Result<Value> {
    let path = path.as_ref();
    let raw = fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
    let v: Value = serde_json::from_str(&raw)
        .map_err(|e| anyhow!("invalid json in {}: {e}", path.display()))?;
    Ok(v)
}

/// Load `CoreConfig` from an optional JSON file; missing fields take defaults.
pub fn load_core_config(path: Option<&str>) -> Result<CoreConfig> {
    let cfg = match path {
        Some(p) => {
            let v = read_json_file(p)?;
            serde_json::from_value(v).map_err(|e| anyhow!("invalid config file {p}: {e}"))?
        }
        None => CoreConfig::default(),
    };
    validate_config(&cfg)?;
    Ok(cfg)
}

/// Parse `key:value,key:value`; absent means no conditions.
pub fn parse_conditions(arg: Option<&str>) -> Result<Vec<Condition>> {
    Ok(parse_condition_filter(arg.unwrap_or(""))?)
}
