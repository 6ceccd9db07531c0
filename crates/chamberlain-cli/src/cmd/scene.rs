use anyhow::Result;
use serde::Serialize;

use chamberlain_core::model::{AvailableCondition, ScenePatch};
use chamberlain_store::{Chamberlain, NewScene};

use crate::args::SceneCmd;
use crate::io::input;
use crate::output;

#[derive(Debug, Serialize)]
pub struct DeletedOut<'a> {
    pub deleted: &'a str,
}

pub fn run(ch: &Chamberlain, cmd: SceneCmd) -> Result<()> {
    match cmd {
        SceneCmd::Create {
            id,
            name,
            description,
            scheme,
            conditions,
        } => {
            let available_conditions: Vec<AvailableCondition> = match conditions {
                Some(arg) => input::read_typed_arg(&arg)?,
                None => Vec::new(),
            };
            let scene = ch.create_scene(NewScene {
                id,
                name,
                description,
                scheme: input::read_json_arg(&scheme)?,
                available_conditions,
            })?;
            output::note(&format!("created scene {}", scene.id));
            output::print(&scene)
        }
        SceneCmd::Get { id } => output::print(&ch.get_scene(&id)?),
        SceneCmd::List { list } => output::print(&ch.list_scenes(&super::list_params(list))?),
        SceneCmd::Update {
            id,
            name,
            description,
            conditions,
        } => {
            let available_conditions = conditions
                .map(|arg| input::read_typed_arg::<Vec<AvailableCondition>>(&arg))
                .transpose()?;
            let scene = ch.update_scene(
                &id,
                ScenePatch {
                    name,
                    description,
                    available_conditions,
                },
            )?;
            output::print(&scene)
        }
        SceneCmd::Delete { id } => {
            ch.delete_scene(&id)?;
            output::print(&DeletedOut { deleted: &id })
        }
        SceneCmd::AddCondition {
            id,
            key,
            name,
            description,
            value_type,
            values,
        } => {
            let condition = AvailableCondition {
                key,
                name,
                description,
                value_type,
                values,
            };
            output::print(&ch.add_condition(&id, condition)?)
        }
    }
}
