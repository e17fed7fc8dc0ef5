use crate::bail;
use crate::error::{ErrorKind, FlowResult};
use crate::source::Source;

/// In-memory rows, used by tests and for running without a data file.
#[derive(Debug, Clone, Default)]
pub struct MemorySource {
    rows: Vec<String>,
    delimiter: char,
}

impl MemorySource {
    /// Creates a tab delimited source from data rows, without header.
    pub fn new(rows: Vec<String>) -> Self {
        Self {
            rows,
            delimiter: '\t',
        }
    }

    /// Parses the same layout a file source reads: one header line followed by one row per line.
    pub fn from_text(text: &str, delimiter: char) -> Self {
        let rows = text.lines().skip(1).map(str::to_owned).collect();

        Self { rows, delimiter }
    }

    pub fn with_delimiter(mut self, delimiter: char) -> Self {
        self.delimiter = delimiter;
        self
    }
}

impl Source for MemorySource {
    fn size(&self) -> usize {
        self.rows.len()
    }

    fn delimiter(&self) -> char {
        self.delimiter
    }

    async fn read_row(&self, index: usize) -> FlowResult<String> {
        match self.rows.get(index) {
            Some(row) => Ok(row.clone()),
            None => bail!(
                ErrorKind::SourceRowMissing,
                "Source row does not exist",
                format!("row {index} of {} in-memory rows", self.rows.len())
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn from_text_skips_the_header() {
        let source = MemorySource::from_text("city,name\nLyon,Ada\nNice,Alan\n", ',');

        assert_eq!(source.size(), 2);
        assert_eq!(source.delimiter(), ',');
        assert_eq!(source.read_row(0).await.unwrap(), "Lyon,Ada");
    }
}
