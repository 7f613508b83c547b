use std::process::ExitCode;

use clap::Parser;

use rastercore::cli::{self, CliArgs};
use rastercore::logger;

fn main() -> ExitCode {
    // Session log (overwrites the previous session's log).
    logger::init();

    let args = CliArgs::parse();
    cli::run(args)
}
