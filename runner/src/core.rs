use ::config::shared::RunnerConfig;
use flow::pipeline::Pipeline;
use flow::source::FileSource;
use flow::workers::collector::CompletionLog;
use tracing::{debug, info, warn};

use crate::error::RunnerResult;

/// Runs the pipeline described by `runner_config` and returns the log of completed items.
///
/// The pipeline stops once the run duration elapses, on ctrl+c, or as soon as one of its units
/// fails.
pub async fn run_pipeline(runner_config: RunnerConfig) -> RunnerResult<CompletionLog> {
    info!("starting runner");

    log_config(&runner_config);

    let run_duration = runner_config.run_duration();
    let source = FileSource::from_config(&runner_config.source);
    let mut pipeline = Pipeline::new(runner_config.pipeline, runner_config.remote, source);

    pipeline.start().await?;

    tokio::select! {
        _ = tokio::time::sleep(run_duration) => {
            info!("run duration elapsed, shutting down pipeline");
        }
        _ = tokio::signal::ctrl_c() => {
            info!("sigint (ctrl+c) received, shutting down pipeline");
        }
        _ = pipeline.wait_for_failure() => {
            warn!("a pipeline unit failed, shutting down pipeline");
        }
    }

    let log = pipeline.shutdown_and_wait().await?;
    info!(entries = log.len(), "runner completed");

    Ok(log)
}

fn log_config(config: &RunnerConfig) {
    let pipeline = &config.pipeline;
    debug!(
        queue_capacity = pipeline.queue_capacity,
        producers = pipeline.producers,
        remote_producers = pipeline.remote_producers,
        managers = pipeline.managers,
        workers = pipeline.workers,
        shutdown_mode = ?pipeline.shutdown_mode,
        "using pipeline config"
    );

    debug!(
        path = %config.source.path.display(),
        size = config.source.size,
        "using source config"
    );

    match &config.remote {
        Some(remote) => debug!(address = %remote.address(), "using remote config"),
        None => debug!("no remote service configured"),
    }

    debug!(run_duration_ms = config.run_duration_ms, "using run duration");
}
