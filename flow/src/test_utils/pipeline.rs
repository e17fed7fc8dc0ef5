use config::shared::{PipelineConfig, RemoteConfig, ShutdownMode};
use std::net::SocketAddr;

use crate::pipeline::Pipeline;
use crate::source::MemorySource;
use crate::test_utils::source::sample_source;
use crate::workers::collector::CompletionLog;

/// Reference topology: `K = 5`, two producers, two managers, four workers and no remote producer.
pub fn test_pipeline_config() -> PipelineConfig {
    PipelineConfig {
        queue_capacity: 5,
        producers: 2,
        managers: 2,
        workers: 4,
        remote_producers: 0,
        max_pending_transforms: 5,
        shutdown_mode: ShutdownMode::LogCompleted,
        drain_timeout_ms: 2_000,
    }
}

pub fn remote_config(address: SocketAddr) -> RemoteConfig {
    RemoteConfig {
        host: address.ip().to_string(),
        port: address.port(),
    }
}

/// Creates a pipeline over the sample source.
pub fn create_local_pipeline(config: PipelineConfig) -> Pipeline<MemorySource> {
    Pipeline::new(config, None, sample_source())
}

/// Creates a pipeline over the sample source whose remote producers talk to `address`.
pub fn create_remote_pipeline(
    config: PipelineConfig,
    address: SocketAddr,
) -> Pipeline<MemorySource> {
    Pipeline::new(config, Some(remote_config(address)), sample_source())
}

/// Splits a rendered entry into its record text and its number of applied steps.
pub fn parse_entry(entry: &str) -> Option<(&str, usize)> {
    let (record, steps) = entry.rsplit_once(" (")?;
    let steps = steps.strip_suffix(" steps)")?.parse().ok()?;

    Some((record, steps))
}

/// Asserts that every entry of `log` is a rendered item with at most `max_steps` steps.
pub fn assert_rendered_entries(log: &CompletionLog, max_steps: usize) {
    for entry in log.entries() {
        let (record, steps) =
            parse_entry(entry).unwrap_or_else(|| panic!("malformed log entry: {entry:?}"));

        assert!(!record.is_empty(), "empty record in entry {entry:?}");
        assert!(steps <= max_steps, "too many steps in entry {entry:?}");
    }
}
