use serde::{Deserialize, Serialize};

use crate::shared::ValidationError;

/// Address of the remote service hosting the twins of remote items.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct RemoteConfig {
    #[serde(default = "default_host")]
    pub host: String,
    pub port: u16,
}

impl RemoteConfig {
    pub const DEFAULT_HOST: &'static str = "localhost";

    /// Returns the `host:port` address the proxy dials.
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.host.trim().is_empty() {
            return Err(ValidationError::RemoteHostEmpty);
        }

        Ok(())
    }
}

fn default_host() -> String {
    RemoteConfig::DEFAULT_HOST.to_owned()
}
