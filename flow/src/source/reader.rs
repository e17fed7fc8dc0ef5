use tokio::sync::oneshot;
use tracing::{debug, error, info};

use crate::concurrency::handoff::{RequestRx, RequestTx, request_channel};
use crate::concurrency::shutdown::{ShutdownResult, ShutdownRx};
use crate::error::{ErrorKind, FlowResult};
use crate::flow_error;
use crate::source::Source;
use crate::workers::base::{Worker, WorkerType};

/// A request for one row, answered on its own reply channel.
#[derive(Debug)]
struct ReadRequest {
    index: usize,
    reply: oneshot::Sender<FlowResult<String>>,
}

/// Shared handle through which local items read rows from the source.
///
/// Every read goes through a single [`SourceReaderWorker`], so the underlying source is never
/// accessed concurrently.
#[derive(Debug, Clone)]
pub struct SourceReader {
    requests: RequestTx<ReadRequest>,
    delimiter: char,
}

impl SourceReader {
    /// Creates the handle together with the worker that serves it.
    pub fn new<S>(source: S, shutdown_rx: ShutdownRx) -> (Self, SourceReaderWorker<S>)
    where
        S: Source,
    {
        let (requests_tx, requests_rx) = request_channel();
        let reader = Self {
            requests: requests_tx,
            delimiter: source.delimiter(),
        };
        let worker = SourceReaderWorker {
            source,
            requests: requests_rx,
            shutdown_rx,
        };

        (reader, worker)
    }

    pub fn delimiter(&self) -> char {
        self.delimiter
    }

    /// Reads the data row at `index`.
    pub async fn read_row(&self, index: usize) -> FlowResult<String> {
        let (reply_tx, reply_rx) = oneshot::channel();

        self.requests
            .send_async(ReadRequest {
                index,
                reply: reply_tx,
            })
            .await
            .map_err(|_| {
                flow_error!(
                    ErrorKind::ChannelClosed,
                    "Source reader is no longer running"
                )
            })?;

        reply_rx.await.map_err(|_| {
            flow_error!(
                ErrorKind::ChannelClosed,
                "Source reader stopped before replying"
            )
        })?
    }
}

/// Unit of execution serving [`SourceReader`] requests one at a time.
pub struct SourceReaderWorker<S> {
    source: S,
    requests: RequestRx<ReadRequest>,
    shutdown_rx: ShutdownRx,
}

impl<S> Worker for SourceReaderWorker<S>
where
    S: Source + Send + Sync + 'static,
{
    fn worker_type(&self) -> WorkerType {
        WorkerType::SourceReader
    }

    async fn run(mut self) -> FlowResult<()> {
        info!(rows = self.source.size(), "starting source reader");

        loop {
            let request = match self.shutdown_rx.until_shutdown(self.requests.recv_async()).await {
                ShutdownResult::Ok(Ok(request)) => request,
                // Every handle is gone, nobody can ask for rows anymore.
                ShutdownResult::Ok(Err(_)) | ShutdownResult::Shutdown(()) => break,
            };

            let result = self.source.read_row(request.index).await;
            match &result {
                Ok(_) => debug!(index = request.index, "row read"),
                Err(err) => error!(index = request.index, error = %err, "row could not be read"),
            }

            // The requester might have been cancelled by a shutdown in the meantime.
            let _ = request.reply.send(result);
        }

        info!("source reader stopped");

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::concurrency::shutdown::create_shutdown_channel;
    use crate::source::MemorySource;

    #[tokio::test]
    async fn rows_are_served_through_the_reader() {
        let (shutdown_tx, shutdown_rx) = create_shutdown_channel();
        let source = MemorySource::new(vec!["a\tb".to_owned(), "c\td".to_owned()]);
        let (reader, worker) = SourceReader::new(source, shutdown_rx);
        let handle = tokio::spawn(worker.run());

        assert_eq!(reader.read_row(1).await.unwrap(), "c\td");
        assert_eq!(
            reader.read_row(2).await.unwrap_err().kind(),
            ErrorKind::SourceRowMissing
        );

        shutdown_tx.shutdown();
        handle.await.unwrap().unwrap();

        assert_eq!(
            reader.read_row(0).await.unwrap_err().kind(),
            ErrorKind::ChannelClosed
        );
    }
}
