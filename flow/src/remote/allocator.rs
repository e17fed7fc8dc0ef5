use tracing::info;

use crate::concurrency::handoff::{RequestRx, RequestTx, request_channel};
use crate::concurrency::shutdown::{ShutdownResult, ShutdownRx};
use crate::error::{ErrorKind, FlowResult};
use crate::flow_error;
use crate::remote::protocol::RemoteId;
use crate::workers::base::{Worker, WorkerType};

/// Hands out twin ids from a counter starting at zero.
///
/// An id is only consumed once a requester took it, so ids are never skipped or reused.
pub struct IdAllocator {
    next: u64,
    ids: RequestTx<RemoteId>,
    shutdown_rx: ShutdownRx,
}

/// Requesting side of the [`IdAllocator`], shared by remote producers.
#[derive(Debug, Clone)]
pub struct IdSupply {
    ids: RequestRx<RemoteId>,
}

impl IdSupply {
    pub async fn next_id(&self) -> FlowResult<RemoteId> {
        self.ids.recv_async().await.map_err(|_| {
            flow_error!(
                ErrorKind::IdAllocatorStopped,
                "Id allocator is no longer running"
            )
        })
    }
}

impl IdAllocator {
    pub fn new(shutdown_rx: ShutdownRx) -> (IdSupply, IdAllocator) {
        let (ids_tx, ids_rx) = request_channel();

        (
            IdSupply { ids: ids_rx },
            IdAllocator {
                next: 0,
                ids: ids_tx,
                shutdown_rx,
            },
        )
    }
}

impl Worker for IdAllocator {
    fn worker_type(&self) -> WorkerType {
        WorkerType::IdAllocator
    }

    async fn run(mut self) -> FlowResult<()> {
        loop {
            let id = RemoteId(self.next);
            match self.shutdown_rx.until_shutdown(self.ids.send_async(id)).await {
                ShutdownResult::Ok(Ok(())) => self.next += 1,
                ShutdownResult::Ok(Err(_)) | ShutdownResult::Shutdown(()) => break,
            }
        }

        info!(allocated = self.next, "id allocator stopped");

        Ok(())
    }
}
