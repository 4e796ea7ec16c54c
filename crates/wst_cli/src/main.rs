//! wst - workstation batch tools.
//!
//! Thin front end over `wst_core`: parses arguments, loads settings,
//! installs logging and maps the result of a subcommand to an exit code.
//!
//! Exit codes: 0 done or nothing to do, 1 missing program / config / input,
//! 2 at least one item failed, 3 invalid argument.

mod cli;
mod commands;

use std::process::ExitCode;

use clap::Parser;
use wst_core::report::RunExit;

fn main() -> ExitCode {
    let cli = match cli::Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            // --help and --version also arrive here
            let exit = if e.use_stderr() {
                RunExit::InvalidArgument
            } else {
                RunExit::Success
            };
            let _ = e.print();
            return exit.into();
        }
    };

    match commands::execute(cli) {
        Ok(exit) => exit.into(),
        Err(e) => {
            eprintln!("wst: {:#}", e);
            commands::classify(&e).into()
        }
    }
}
