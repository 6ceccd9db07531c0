use std::sync::Arc;

use anyhow::Result;
use tracing::debug;

use chamberlain_store::{Chamberlain, FsBackend, ListParams};

use crate::args::{Cli, Command, ListArgs};
use crate::io::input;

mod capabilities;
mod config;
mod scene;
mod scheme;

pub fn dispatch(cli: Cli) -> Result<()> {
    let cfg = input::load_core_config(cli.config.as_deref())?;
    let backend = FsBackend::open(&cli.store_root)?;
    debug!(root = %cli.store_root, "store opened");
    let ch = Chamberlain::new(Arc::new(backend), cfg)?;

    match cli.command {
        Command::Scene(c) => scene::run(&ch, c),
        Command::Scheme(c) => scheme::run(&ch, c),
        Command::Config(c) => config::run(&ch, c),
        Command::Capabilities => capabilities::run(&ch),
    }
}

fn list_params(args: ListArgs) -> ListParams {
    ListParams {
        page: args.page,
        page_size: args.page_size,
        keyword: args.keyword,
        sort: args.sort,
    }
}
