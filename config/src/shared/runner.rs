use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::Config;
use crate::shared::{PipelineConfig, RemoteConfig, SourceConfig, ValidationError};

/// Complete configuration for the runner binary.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct RunnerConfig {
    #[serde(default)]
    pub pipeline: PipelineConfig,
    pub source: SourceConfig,
    /// Remote service, only required when remote producers are configured.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub remote: Option<RemoteConfig>,
    /// Total time the pipeline runs before the collector is told to stop.
    pub run_duration_ms: u64,
}

impl RunnerConfig {
    pub fn run_duration(&self) -> Duration {
        Duration::from_millis(self.run_duration_ms)
    }

    /// Validates every section and the cross-section constraints.
    pub fn validate(&self) -> Result<(), ValidationError> {
        self.pipeline.validate()?;
        self.source.validate()?;

        match &self.remote {
            Some(remote) => remote.validate()?,
            None if self.pipeline.remote_producers > 0 => {
                return Err(ValidationError::MissingRemoteConfig);
            }
            None => {}
        }

        Ok(())
    }
}

impl Config for RunnerConfig {
    fn validate_loaded(&self) -> Result<(), ValidationError> {
        self.validate()
    }
}
