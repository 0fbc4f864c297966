//! `personbook` command-line entry point.
//!
//! # Responsibility
//! - Resolve configuration, start logging, open the store.
//! - Run exactly one selected operation and report its outcome on stdout.
//!
//! # Invariants
//! - Startup and operation failures are reported, never propagated as panics.
//! - The process exits non-zero when the reported outcome is an error.

mod commands;
mod fixtures;

use clap::Parser;
use commands::{execute, write_outcome, Cli, CliError};
use log::{error, info, warn};
use personbook_core::{init_logging, PersonStore, StoreConfig};
use std::process::ExitCode;
use std::time::Instant;

fn main() -> ExitCode {
    let cli = Cli::parse();
    let outcome = run(&cli);
    let failed = outcome.is_err();

    let mut stdout = std::io::stdout().lock();
    if let Err(err) = write_outcome(&mut stdout, &outcome) {
        eprintln!("error: output_error: {err}");
        return ExitCode::FAILURE;
    }

    if failed {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    }
}

fn run(cli: &Cli) -> Result<serde_json::Value, CliError> {
    let config = StoreConfig::load(cli.env_file.as_deref(), cli.db.as_deref())?;

    if let Err(message) = init_logging(config.log_level, &config.log_target) {
        eprintln!("warning: logging disabled: {message}");
    }

    let store = PersonStore::open(&config)?;

    let started_at = Instant::now();
    let event = cli.command.event_name();
    let outcome = execute(&cli.command, &store);
    match &outcome {
        Ok(_) => info!(
            "event={event} module=cli status=ok duration_ms={}",
            started_at.elapsed().as_millis()
        ),
        Err(err) => error!(
            "event={event} module=cli status=error duration_ms={} error_code={}",
            started_at.elapsed().as_millis(),
            err.error_code()
        ),
    }

    if let Err(err) = store.close() {
        warn!(
            "event=store_close module=cli status=error error_code={}",
            err.error_code()
        );
    }

    outcome
}
