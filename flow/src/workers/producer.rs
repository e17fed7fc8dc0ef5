use rand::Rng;
use tracing::{debug, info};

use crate::concurrency::handoff::HandoffTx;
use crate::concurrency::shutdown::{ShutdownResult, ShutdownRx};
use crate::error::FlowResult;
use crate::item::{LocalItem, WorkItem};
use crate::source::SourceReader;
use crate::workers::base::{Worker, WorkerType};

/// Publishes void local items for random source rows as fast as managers accept them.
pub struct Producer {
    id: usize,
    reader: SourceReader,
    source_size: usize,
    max_pending_transforms: usize,
    intake: HandoffTx<WorkItem>,
    shutdown_rx: ShutdownRx,
}

impl Producer {
    pub fn new(
        id: usize,
        reader: SourceReader,
        source_size: usize,
        max_pending_transforms: usize,
        intake: HandoffTx<WorkItem>,
        shutdown_rx: ShutdownRx,
    ) -> Self {
        Self {
            id,
            reader,
            source_size,
            max_pending_transforms,
            intake,
            shutdown_rx,
        }
    }
}

impl Worker for Producer {
    fn worker_type(&self) -> WorkerType {
        WorkerType::Producer { id: self.id }
    }

    async fn run(mut self) -> FlowResult<()> {
        info!(producer_id = self.id, "starting producer");

        let mut published = 0u64;
        loop {
            let row = rand::thread_rng().gen_range(0..self.source_size);
            let item = LocalItem::new(row, self.reader.clone(), self.max_pending_transforms);

            match self
                .shutdown_rx
                .until_shutdown(self.intake.send(item.into()))
                .await
            {
                ShutdownResult::Ok(sent) => {
                    sent?;
                    published += 1;
                    debug!(producer_id = self.id, row, "item published");
                }
                ShutdownResult::Shutdown(()) => break,
            }
        }

        info!(producer_id = self.id, published, "producer stopped");

        Ok(())
    }
}
