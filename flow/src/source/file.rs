use config::shared::SourceConfig;
use std::path::{Path, PathBuf};
use tokio::fs::File;
use tokio::io::{AsyncBufReadExt, BufReader};

use crate::error::{ErrorKind, FlowResult};
use crate::source::Source;
use crate::{bail, flow_error};

/// A text file whose first line is a header followed by one row per line.
///
/// The file is opened again for every read, so edits to the file are picked up by later reads.
#[derive(Debug, Clone)]
pub struct FileSource {
    path: PathBuf,
    size: usize,
    delimiter: char,
}

impl FileSource {
    pub fn new(path: impl Into<PathBuf>, size: usize, delimiter: char) -> Self {
        Self {
            path: path.into(),
            size,
            delimiter,
        }
    }

    pub fn from_config(config: &SourceConfig) -> Self {
        Self::new(config.path.clone(), config.size, config.delimiter)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Source for FileSource {
    fn size(&self) -> usize {
        self.size
    }

    fn delimiter(&self) -> char {
        self.delimiter
    }

    async fn read_row(&self, index: usize) -> FlowResult<String> {
        let file = File::open(&self.path).await.map_err(|err| {
            flow_error!(
                ErrorKind::SourceIoError,
                "Could not open the source file",
                self.path.display(),
                source: err
            )
        })?;

        let mut lines = BufReader::new(file).lines();
        let source_io_error = |err: std::io::Error| {
            flow_error!(
                ErrorKind::SourceIoError,
                "Could not read the source file",
                self.path.display(),
                source: err
            )
        };

        // Header first, then every row before the requested one.
        for _ in 0..=index {
            if lines.next_line().await.map_err(source_io_error)?.is_none() {
                bail!(
                    ErrorKind::SourceRowMissing,
                    "Source row does not exist",
                    format!("row {index} of {}", self.path.display())
                );
            }
        }

        match lines.next_line().await.map_err(source_io_error)? {
            Some(row) => Ok(row),
            None => bail!(
                ErrorKind::SourceRowMissing,
                "Source row does not exist",
                format!("row {index} of {}", self.path.display())
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write_source(name: &str, contents: &str) -> PathBuf {
        let path = std::env::temp_dir().join(format!("flow-{}-{name}.tsv", std::process::id()));
        std::fs::write(&path, contents).unwrap();
        path
    }

    #[tokio::test]
    async fn skips_header_and_returns_requested_row() {
        let path = write_source("rows", "header\nfirst\nsecond\n");
        let source = FileSource::new(&path, 2, '\t');

        assert_eq!(source.read_row(0).await.unwrap(), "first");
        assert_eq!(source.read_row(1).await.unwrap(), "second");

        std::fs::remove_file(path).unwrap();
    }

    #[tokio::test]
    async fn missing_row_is_reported() {
        let path = write_source("short", "header\nonly\n");
        let source = FileSource::new(&path, 5, '\t');

        let err = source.read_row(1).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::SourceRowMissing);

        std::fs::remove_file(path).unwrap();
    }

    #[tokio::test]
    async fn missing_file_is_reported() {
        let source = FileSource::new("/nonexistent/flow/rows.tsv", 1, '\t');

        let err = source.read_row(0).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::SourceIoError);
    }
}
