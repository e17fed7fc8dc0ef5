use clap::Parser;
use ::config::load_config;
use ::config::shared::{RemoteConfig, RunnerConfig};

use crate::error::{RunnerError, RunnerResult};

/// Command line overrides, applied on top of the loaded configuration.
#[derive(Debug, Parser)]
#[command(version, about = "Runs the work item pipeline and prints completed items")]
pub struct CliArgs {
    /// Port of the remote service hosting remote item twins.
    #[arg(long)]
    pub port: Option<u16>,

    /// Total run duration in milliseconds.
    #[arg(long)]
    pub duration_ms: Option<u64>,
}

/// Loads the runner configuration, applies the command line overrides and validates the result.
pub fn load_runner_config(args: &CliArgs) -> RunnerResult<RunnerConfig> {
    let mut config = load_config::<RunnerConfig>().map_err(RunnerError::config)?;
    apply_overrides(&mut config, args);
    config.validate().map_err(RunnerError::config)?;

    Ok(config)
}

fn apply_overrides(config: &mut RunnerConfig, args: &CliArgs) {
    if let Some(port) = args.port {
        match &mut config.remote {
            Some(remote) => remote.port = port,
            None => {
                config.remote = Some(RemoteConfig {
                    host: RemoteConfig::DEFAULT_HOST.to_owned(),
                    port,
                })
            }
        }
    }

    if let Some(duration_ms) = args.duration_ms {
        config.run_duration_ms = duration_ms;
    }
}
