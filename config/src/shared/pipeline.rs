use serde::{Deserialize, Serialize};

use crate::shared::ValidationError;

/// What happens to items still inside managers and workers when the pipeline shuts down.
#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize, Eq, PartialEq)]
#[serde(rename_all = "snake_case")]
pub enum ShutdownMode {
    /// Every unit stops at once and the log only holds items completed in time.
    #[default]
    LogCompleted,
    /// Producers stop first and the pipeline waits for in-flight items to complete.
    Drain,
}

/// Configuration of the pipeline topology and flow control.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct PipelineConfig {
    /// Capacity `K` of every manager queue.
    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,
    /// Number of local producers.
    #[serde(default = "default_producers")]
    pub producers: usize,
    /// Number of managers.
    #[serde(default = "default_managers")]
    pub managers: usize,
    /// Number of workers.
    #[serde(default = "default_workers")]
    pub workers: usize,
    /// Number of remote producers, each remote item is backed by a twin on the remote service.
    #[serde(default)]
    pub remote_producers: usize,
    /// Upper bound (inclusive) of the random number of transforms rolled by `initialize`.
    #[serde(default = "default_max_pending_transforms")]
    pub max_pending_transforms: usize,
    /// Policy applied to in-flight items at shutdown.
    #[serde(default)]
    pub shutdown_mode: ShutdownMode,
    /// Upper bound on the time spent draining when [`ShutdownMode::Drain`] is selected.
    #[serde(default = "default_drain_timeout_ms")]
    pub drain_timeout_ms: u64,
}

impl PipelineConfig {
    pub const DEFAULT_QUEUE_CAPACITY: usize = 5;
    pub const DEFAULT_PRODUCERS: usize = 2;
    pub const DEFAULT_MANAGERS: usize = 2;
    pub const DEFAULT_WORKERS: usize = 4;
    pub const DEFAULT_MAX_PENDING_TRANSFORMS: usize = 5;
    pub const DEFAULT_DRAIN_TIMEOUT_MS: u64 = 5_000;

    /// Validates the pipeline topology.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.queue_capacity < 2 {
            return Err(ValidationError::QueueCapacityTooSmall(self.queue_capacity));
        }

        if self.managers == 0 {
            return Err(ValidationError::ManagersZero);
        }

        if self.workers == 0 {
            return Err(ValidationError::WorkersZero);
        }

        if self.shutdown_mode == ShutdownMode::Drain && self.drain_timeout_ms == 0 {
            return Err(ValidationError::InvalidFieldValue {
                field: "drain_timeout_ms".to_owned(),
                constraint: "must be greater than 0 when draining".to_owned(),
            });
        }

        Ok(())
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            queue_capacity: default_queue_capacity(),
            producers: default_producers(),
            managers: default_managers(),
            workers: default_workers(),
            remote_producers: 0,
            max_pending_transforms: default_max_pending_transforms(),
            shutdown_mode: ShutdownMode::default(),
            drain_timeout_ms: default_drain_timeout_ms(),
        }
    }
}

fn default_queue_capacity() -> usize {
    PipelineConfig::DEFAULT_QUEUE_CAPACITY
}

fn default_producers() -> usize {
    PipelineConfig::DEFAULT_PRODUCERS
}

fn default_managers() -> usize {
    PipelineConfig::DEFAULT_MANAGERS
}

fn default_workers() -> usize {
    PipelineConfig::DEFAULT_WORKERS
}

fn default_max_pending_transforms() -> usize {
    PipelineConfig::DEFAULT_MAX_PENDING_TRANSFORMS
}

fn default_drain_timeout_ms() -> u64 {
    PipelineConfig::DEFAULT_DRAIN_TIMEOUT_MS
}
