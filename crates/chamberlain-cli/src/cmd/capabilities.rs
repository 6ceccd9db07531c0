use anyhow::Result;

use chamberlain_store::Chamberlain;

use crate::output;

pub fn run(ch: &Chamberlain) -> Result<()> {
    output::print(ch.capabilities())
}
