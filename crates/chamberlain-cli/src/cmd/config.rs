use anyhow::{anyhow, Result};

use chamberlain_core::model::ConfigPatch;
use chamberlain_store::{Chamberlain, ConfigListParams, NewConfig};

use crate::args::ConfigCmd;
use crate::io::input;
use crate::output;

use super::scene::DeletedOut;

pub fn run(ch: &Chamberlain, cmd: ConfigCmd) -> Result<()> {
    match cmd {
        ConfigCmd::Create {
            scene_id,
            scheme_version,
            conditions,
            data,
        } => {
            let config = ch.create_config(NewConfig {
                scene_id,
                scheme_version,
                conditions: input::parse_conditions(conditions.as_deref())?,
                config: input::read_json_arg(&data)?,
            })?;
            output::note(&format!("created config {}", config.id));
            output::print(&config)
        }
        ConfigCmd::Get { id } => output::print(&ch.get_config(&id)?),
        ConfigCmd::Find {
            scene_id,
            conditions,
        } => {
            let conditions = input::parse_conditions(conditions.as_deref())?;
            let config = ch.find_config(&scene_id, conditions)?.ok_or_else(|| {
                anyhow!("no config of scene {scene_id} has exactly these conditions")
            })?;
            output::print(&config)
        }
        ConfigCmd::List {
            scene_id,
            scheme_version,
            conditions,
            list,
        } => {
            let params = ConfigListParams {
                scene_id,
                scheme_version,
                conditions: input::parse_conditions(conditions.as_deref())?,
                list: super::list_params(list),
            };
            output::print(&ch.list_configs(&params)?)
        }
        ConfigCmd::Update {
            id,
            scheme_version,
            data,
        } => {
            let patch = ConfigPatch {
                scheme_version,
                condition_list: None,
                config: data.as_deref().map(input::read_json_arg).transpose()?,
            };
            if patch.is_empty() {
                return Err(anyhow!("nothing to update; pass --scheme-version and/or --data"));
            }
            output::print(&ch.update_config(&id, patch)?)
        }
        ConfigCmd::Copy { id, to } => {
            let to = input::parse_conditions(to.as_deref())?;
            let config = ch.copy_config(&id, to)?;
            output::note(&format!("copied {id} to {}", config.id));
            output::print(&config)
        }
        ConfigCmd::Delete { id } => {
            ch.delete_config(&id)?;
            output::print(&DeletedOut { deleted: &id })
        }
        ConfigCmd::Validate {
            scene_id,
            scheme_version,
            data,
        } => {
            let data = input::read_json_arg(&data)?;
            output::print(&ch.validate_payload(&scene_id, scheme_version, &data)?)
        }
    }
}
