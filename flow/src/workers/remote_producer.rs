use tracing::{debug, info};

use crate::concurrency::handoff::HandoffTx;
use crate::concurrency::shutdown::{ShutdownResult, ShutdownRx};
use crate::error::FlowResult;
use crate::item::{RemoteItem, WorkItem};
use crate::remote::{IdSupply, ProxyClient, RemoteOperation};
use crate::workers::base::{Worker, WorkerType};

/// Creates twins on the remote service and publishes a remote item for each of them.
///
/// The twin is created before its item is published, so every call made through the item targets
/// an existing twin.
pub struct RemoteProducer {
    id: usize,
    ids: IdSupply,
    proxy: ProxyClient,
    intake: HandoffTx<WorkItem>,
    shutdown_rx: ShutdownRx,
}

impl RemoteProducer {
    pub fn new(
        id: usize,
        ids: IdSupply,
        proxy: ProxyClient,
        intake: HandoffTx<WorkItem>,
        shutdown_rx: ShutdownRx,
    ) -> Self {
        Self {
            id,
            ids,
            proxy,
            intake,
            shutdown_rx,
        }
    }
}

impl Worker for RemoteProducer {
    fn worker_type(&self) -> WorkerType {
        WorkerType::RemoteProducer { id: self.id }
    }

    async fn run(mut self) -> FlowResult<()> {
        info!(producer_id = self.id, "starting remote producer");

        loop {
            let remote_id = match self.shutdown_rx.until_shutdown(self.ids.next_id()).await {
                ShutdownResult::Ok(remote_id) => remote_id?,
                ShutdownResult::Shutdown(()) => break,
            };

            match self
                .shutdown_rx
                .until_shutdown(self.proxy.call(remote_id, RemoteOperation::Create))
                .await
            {
                ShutdownResult::Ok(reply) => {
                    reply?;
                }
                ShutdownResult::Shutdown(()) => break,
            }

            let item = RemoteItem::new(remote_id, self.proxy.clone());

            match self
                .shutdown_rx
                .until_shutdown(self.intake.send(item.into()))
                .await
            {
                ShutdownResult::Ok(sent) => {
                    sent?;
                    debug!(producer_id = self.id, %remote_id, "remote item published");
                }
                ShutdownResult::Shutdown(()) => break,
            }
        }

        info!(producer_id = self.id, "remote producer stopped");

        Ok(())
    }
}
