//! Rechecks CLI entrypoint reporting CI failure statistics.

mod cli;

use std::io::{self, IsTerminal, Write};
use std::process::ExitCode;

use ortho_config::OrthoConfig;
use rechecks::{QueryError, RechecksConfig};
use tracing::Level;

fn main() -> ExitCode {
    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) => {
            // Nothing useful remains to do when stderr itself is gone.
            writeln!(io::stderr().lock(), "{error}").ok();
            ExitCode::from(error.exit_code())
        }
    }
}

fn run() -> Result<(), QueryError> {
    let config = load_config()?;
    init_logging(config.verbose);

    if config.migrate_db {
        return cli::migrations::run(&config);
    }
    cli::report::run(&config)
}

/// Loads configuration from CLI, environment, and files.
///
/// # Errors
///
/// Returns [`QueryError::Configuration`] when ortho-config fails to parse
/// arguments or load configuration files.
fn load_config() -> Result<RechecksConfig, QueryError> {
    RechecksConfig::load().map_err(|error| QueryError::Configuration {
        message: error.to_string(),
    })
}

/// Sends log records to stderr so stdout only carries the report.
///
/// Colour codes are only emitted when stderr is a terminal.
fn init_logging(verbose: bool) {
    let level = if verbose { Level::DEBUG } else { Level::WARN };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(io::stderr)
        .with_ansi(io::stderr().is_terminal())
        .init();
}
