use std::collections::VecDeque;

use crate::bail;
use crate::error::{ErrorKind, FlowResult};
use crate::item::{Item, ItemStatus};
use crate::payload::{Record, Transform};
use crate::source::SourceReader;

/// An item materialized from a source row and transformed in-process.
#[derive(Debug)]
pub struct LocalItem {
    row: usize,
    status: ItemStatus,
    record: Record,
    pending: VecDeque<Transform>,
    applied: usize,
    max_pending_transforms: usize,
    reader: SourceReader,
}

impl LocalItem {
    /// Creates a [`ItemStatus::Void`] item that will be materialized from source row `row`.
    pub fn new(row: usize, reader: SourceReader, max_pending_transforms: usize) -> Self {
        Self {
            row,
            status: ItemStatus::Void,
            record: Record::default(),
            pending: VecDeque::new(),
            applied: 0,
            max_pending_transforms,
            reader,
        }
    }

    pub fn row(&self) -> usize {
        self.row
    }

    pub fn record(&self) -> &Record {
        &self.record
    }

    /// Number of transforms still to apply.
    pub fn pending(&self) -> usize {
        self.pending.len()
    }

    /// Number of transforms applied so far.
    pub fn applied(&self) -> usize {
        self.applied
    }
}

impl Item for LocalItem {
    async fn initialize(&mut self) -> FlowResult<()> {
        if self.status != ItemStatus::Void {
            bail!(
                ErrorKind::InvalidState,
                "Only a void item can be initialized",
                format!("row {} is {:?}", self.row, self.status)
            );
        }

        let row = self.reader.read_row(self.row).await?;
        self.record = Record::parse(&row, self.reader.delimiter());

        // The thread local rng is not `Send`, so it must not live across an await point.
        self.pending = {
            let mut rng = rand::thread_rng();
            Transform::roll(&mut rng, self.max_pending_transforms).into()
        };

        self.status = if self.pending.is_empty() {
            ItemStatus::Complete
        } else {
            ItemStatus::Ready
        };

        Ok(())
    }

    async fn advance(&mut self) -> FlowResult<()> {
        if self.status != ItemStatus::Ready {
            bail!(
                ErrorKind::InvalidState,
                "Only a ready item can be advanced",
                format!("row {} is {:?}", self.row, self.status)
            );
        }

        let Some(transform) = self.pending.pop_front() else {
            bail!(
                ErrorKind::InvalidState,
                "Ready item has no pending work",
                format!("row {}", self.row)
            );
        };

        self.record = transform.apply(std::mem::take(&mut self.record));
        self.applied += 1;

        if self.pending.is_empty() {
            self.status = ItemStatus::Complete;
        }

        Ok(())
    }

    async fn render(&self) -> FlowResult<String> {
        Ok(format!("{} ({} steps)", self.record, self.applied))
    }

    async fn status(&self) -> FlowResult<ItemStatus> {
        Ok(self.status)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::concurrency::shutdown::create_shutdown_channel;
    use crate::source::MemorySource;
    use crate::workers::base::Worker;

    fn reader() -> SourceReader {
        let (shutdown_tx, shutdown_rx) = create_shutdown_channel();
        let source = MemorySource::new(vec!["jeanne\tdupont".to_owned()]);
        let (reader, worker) = SourceReader::new(source, shutdown_rx);
        tokio::spawn(async move {
            let _shutdown_tx = shutdown_tx;
            worker.run().await
        });

        reader
    }

    #[tokio::test]
    async fn item_without_work_completes_on_initialize() {
        let mut item = LocalItem::new(0, reader(), 0);

        item.initialize().await.unwrap();

        assert_eq!(item.status().await.unwrap(), ItemStatus::Complete);
        assert_eq!(item.render().await.unwrap(), "jeanne dupont (0 steps)");
    }

    #[tokio::test]
    async fn advance_performs_one_step_at_a_time() {
        let mut item = LocalItem::new(0, reader(), 4);
        item.initialize().await.unwrap();
        let rolled = item.pending();

        let mut steps = 0;
        while item.status().await.unwrap() == ItemStatus::Ready {
            let before = item.pending();
            item.advance().await.unwrap();
            assert_eq!(item.pending(), before - 1);
            steps += 1;
        }

        assert_eq!(steps, rolled);
        assert_eq!(item.applied(), rolled);
        assert_eq!(item.pending(), 0);
        assert_eq!(item.status().await.unwrap(), ItemStatus::Complete);
    }

    #[tokio::test]
    async fn lifecycle_misuse_is_rejected() {
        let mut item = LocalItem::new(0, reader(), 0);

        let err = item.advance().await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidState);

        item.initialize().await.unwrap();
        let err = item.initialize().await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidState);
        assert_eq!(item.status().await.unwrap(), ItemStatus::Complete);
    }

    #[tokio::test]
    async fn missing_row_fails_initialize() {
        let mut item = LocalItem::new(3, reader(), 2);

        let err = item.initialize().await.unwrap_err();

        assert_eq!(err.kind(), ErrorKind::SourceRowMissing);
        assert_eq!(item.status().await.unwrap(), ItemStatus::Void);
    }
}
