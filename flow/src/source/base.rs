use std::future::Future;

use crate::error::FlowResult;

/// A row-oriented text source.
pub trait Source {
    /// Number of data rows producers may pick from.
    fn size(&self) -> usize;

    /// Delimiter separating the fields of a row.
    fn delimiter(&self) -> char;

    /// Returns the text of the data row at `index`.
    ///
    /// Fails with [`crate::error::ErrorKind::SourceIoError`] if the source cannot be read and with
    /// [`crate::error::ErrorKind::SourceRowMissing`] if the row does not exist. Both are fatal for
    /// the pipeline.
    fn read_row(&self, index: usize) -> impl Future<Output = FlowResult<String>> + Send;
}
