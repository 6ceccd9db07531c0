use std::process::ExitCode;

use clap::Parser;

mod args;
mod cmd;
mod io;
mod logging;
mod output;

fn main() -> ExitCode {
    let cli = args::Cli::parse();
    output::init(cli.json);
    logging::init(cli.log_level.as_deref());

    match cmd::dispatch(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            output::print_error(&e);
            ExitCode::FAILURE
        }
    }
}
