use anyhow::Result;

use chamberlain_store::{Chamberlain, SchemeUpdate};

use crate::args::SchemeCmd;
use crate::io::input;
use crate::output;

pub fn run(ch: &Chamberlain, cmd: SchemeCmd) -> Result<()> {
    match cmd {
        SchemeCmd::Validate { scene_id, scheme } => {
            let candidate = input::read_json_arg(&scheme)?;
            let report = ch.validate_scheme(&scene_id, &candidate)?;
            if !report.valid {
                output::note(
                    "scheme has compatibility warnings; `scheme update --overwrite` accepts them",
                );
            }
            output::print(&report)
        }
        SchemeCmd::Update {
            scene_id,
            scheme,
            overwrite,
            change_description,
        } => {
            let outcome = ch.update_scheme(
                &scene_id,
                SchemeUpdate {
                    scheme: input::read_json_arg(&scheme)?,
                    overwrite,
                    change_description,
                },
            )?;
            output::note(&format!(
                "scene {scene_id} now at scheme version {}",
                outcome.version
            ));
            output::print(&outcome)
        }
        SchemeCmd::Status {
            scene_id,
            number,
            status,
        } => {
            ch.set_scheme_status(&scene_id, number, status.into())?;
            output::print(&ch.scheme_versions(&scene_id)?)
        }
        SchemeCmd::List { scene_id } => output::print(&ch.scheme_versions(&scene_id)?),
    }
}
