//! `grc` command-line entry point.
//!
//! # Responsibility
//! - Resolve configuration, start logging and open the session database.
//! - Dispatch to `commands` and map failures to exit codes.

mod commands;

use commands::CliError;
use grc_core::{init_logging, ConsoleConfig};
use std::process::ExitCode;

fn main() -> ExitCode {
    let args: Vec<String> = std::env::args().skip(1).collect();
    let mut stdout = std::io::stdout().lock();

    match run(&args, &mut stdout) {
        Ok(()) => ExitCode::SUCCESS,
        Err(CliError::Usage(message)) => {
            eprintln!("{message}\n\n{}", commands::USAGE);
            ExitCode::from(2)
        }
        Err(err) => {
            eprintln!("error: {err}");
            ExitCode::from(1)
        }
    }
}

fn run(args: &[String], out: &mut impl std::io::Write) -> Result<(), CliError> {
    // probes must work without a data dir
    if commands::run_probe(args, out)? {
        return Ok(());
    }

    let config = ConsoleConfig::from_env()?;
    if let Err(message) = init_logging(&config.log_level, config.log_dir()) {
        eprintln!("warning: logging disabled: {message}");
    }

    let conn = grc_core::db::open_db(config.db_path())?;
    commands::run_command(&config, &conn, args, out)
}
