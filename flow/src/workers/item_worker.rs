use tracing::{debug, info};

use crate::concurrency::handoff::{DispatchSink, HandoffTx};
use crate::concurrency::shutdown::{ShutdownResult, ShutdownRx};
use crate::error::FlowResult;
use crate::item::{Item, ItemStatus};
use crate::workers::base::{Worker, WorkerType};

/// Where an item goes once a worker is done with it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Route {
    Feedback,
    Collector,
}

/// Performs exactly one lifecycle step on `item`.
async fn step<I: Item>(item: &mut I) -> FlowResult<Route> {
    match item.status().await? {
        ItemStatus::Void => {
            item.initialize().await?;
            Ok(Route::Feedback)
        }
        ItemStatus::Ready => {
            item.advance().await?;
            Ok(Route::Feedback)
        }
        ItemStatus::Complete => Ok(Route::Collector),
    }
}

/// Takes items from managers and performs a single step on each before passing it on.
///
/// Items still in progress go back to the managers, complete items go to the collector.
pub struct ItemWorker<I> {
    id: usize,
    dispatch: DispatchSink<I>,
    feedback: HandoffTx<I>,
    collector: HandoffTx<I>,
    shutdown_rx: ShutdownRx,
}

impl<I> ItemWorker<I> {
    pub fn new(
        id: usize,
        dispatch: DispatchSink<I>,
        feedback: HandoffTx<I>,
        collector: HandoffTx<I>,
        shutdown_rx: ShutdownRx,
    ) -> Self {
        Self {
            id,
            dispatch,
            feedback,
            collector,
            shutdown_rx,
        }
    }
}

impl<I> Worker for ItemWorker<I>
where
    I: Item + Send + Sync + 'static,
{
    fn worker_type(&self) -> WorkerType {
        WorkerType::ItemWorker { id: self.id }
    }

    async fn run(mut self) -> FlowResult<()> {
        info!(worker_id = self.id, "starting worker");

        loop {
            let mut item = match self.shutdown_rx.until_shutdown(self.dispatch.take()).await {
                ShutdownResult::Ok(item) => item?,
                ShutdownResult::Shutdown(()) => break,
            };

            let route = match self.shutdown_rx.until_shutdown(step(&mut item)).await {
                ShutdownResult::Ok(route) => route?,
                ShutdownResult::Shutdown(()) => break,
            };

            let target = match route {
                Route::Feedback => &self.feedback,
                Route::Collector => &self.collector,
            };

            match self.shutdown_rx.until_shutdown(target.send(item)).await {
                ShutdownResult::Ok(sent) => {
                    sent?;
                    debug!(worker_id = self.id, ?route, "item handed on");
                }
                ShutdownResult::Shutdown(()) => break,
            }
        }

        info!(worker_id = self.id, "worker stopped");

        Ok(())
    }
}
