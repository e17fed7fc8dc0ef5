use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::shared::ValidationError;

/// Configuration of the row-oriented text source local items are materialized from.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct SourceConfig {
    /// Path of the text file. The first line is a header and is never returned as a row.
    pub path: PathBuf,
    /// Number of data rows producers pick from, rows are drawn uniformly in `[0, size)`.
    pub size: usize,
    /// Field delimiter of every row.
    #[serde(default = "default_delimiter")]
    pub delimiter: char,
}

impl SourceConfig {
    pub const DEFAULT_DELIMITER: char = '\t';

    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.path.as_os_str().is_empty() {
            return Err(ValidationError::SourcePathEmpty);
        }

        if self.size == 0 {
            return Err(ValidationError::SourceSizeZero);
        }

        Ok(())
    }
}

fn default_delimiter() -> char {
    SourceConfig::DEFAULT_DELIMITER
}
