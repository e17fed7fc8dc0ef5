//! Pipeline runner binary.
//!
//! Loads the configuration, runs the pipeline for the configured duration and prints the log of
//! completed items to stdout, one item per line.

use clap::Parser;
use std::process::ExitCode;

use crate::config::{CliArgs, load_runner_config};
use crate::core::run_pipeline;
use crate::error::RunnerResult;

mod config;
mod core;
mod error;

fn main() -> ExitCode {
    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprint!("{}", err.render_report());
            ExitCode::FAILURE
        }
    }
}

fn run() -> RunnerResult<()> {
    let args = CliArgs::parse();
    let runner_config = load_runner_config(&args)?;

    telemetry::tracing::init_tracing(env!("CARGO_BIN_NAME"))
        .map_err(error::RunnerError::config)?;

    let log = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?
        .block_on(run_pipeline(runner_config))?;

    if !log.is_empty() {
        println!("{log}");
    }

    Ok(())
}
