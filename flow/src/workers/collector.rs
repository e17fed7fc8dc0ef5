use std::fmt;
use tokio::sync::oneshot;
use tracing::{debug, info};

use crate::concurrency::handoff::HandoffRx;
use crate::concurrency::inflight::InFlight;
use crate::concurrency::shutdown::{ShutdownResult, ShutdownRx};
use crate::error::{ErrorKind, FlowResult};
use crate::flow_error;
use crate::item::Item;
use crate::workers::base::{Worker, WorkerType};

/// Rendered complete items, in the order the collector received them.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CompletionLog {
    entries: Vec<String>,
}

impl CompletionLog {
    pub fn entries(&self) -> &[String] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Renders the log as one line per entry.
    pub fn render(&self) -> String {
        self.entries.join("\n")
    }

    fn push(&mut self, entry: String) {
        self.entries.push(entry);
    }
}

impl fmt::Display for CompletionLog {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render())
    }
}

/// Receives the [`CompletionLog`] once the collector stops.
#[derive(Debug)]
pub struct CollectorHandle {
    log: oneshot::Receiver<CompletionLog>,
}

impl CollectorHandle {
    pub async fn log(self) -> FlowResult<CompletionLog> {
        self.log.await.map_err(|_| {
            flow_error!(
                ErrorKind::ChannelClosed,
                "Collector stopped without emitting its log"
            )
        })
    }
}

/// Terminal sink logging every complete item.
///
/// On shutdown it stops accepting items and emits the log through its [`CollectorHandle`].
pub struct Collector<I> {
    items: HandoffRx<I>,
    inflight: InFlight,
    log: oneshot::Sender<CompletionLog>,
    shutdown_rx: ShutdownRx,
}

impl<I> Collector<I> {
    pub fn new(
        items: HandoffRx<I>,
        inflight: InFlight,
        shutdown_rx: ShutdownRx,
    ) -> (CollectorHandle, Self) {
        let (log_tx, log_rx) = oneshot::channel();

        (
            CollectorHandle { log: log_rx },
            Self {
                items,
                inflight,
                log: log_tx,
                shutdown_rx,
            },
        )
    }
}

impl<I> Worker for Collector<I>
where
    I: Item + Send + Sync + 'static,
{
    fn worker_type(&self) -> WorkerType {
        WorkerType::Collector
    }

    async fn run(mut self) -> FlowResult<()> {
        info!("starting collector");

        let mut log = CompletionLog::default();
        let result = self.collect(&mut log).await;

        info!(collected = log.len(), "collector stopped");

        // The log collected so far is emitted even when rendering an item failed. The initiator
        // might not be interested in it anymore.
        let _ = self.log.send(log);

        result
    }
}

impl<I> Collector<I>
where
    I: Item,
{
    async fn collect(&mut self, log: &mut CompletionLog) -> FlowResult<()> {
        loop {
            let offer = match self.shutdown_rx.until_shutdown(self.items.recv()).await {
                ShutdownResult::Ok(Some(offer)) => offer,
                ShutdownResult::Ok(None) | ShutdownResult::Shutdown(()) => return Ok(()),
            };
            let Some(item) = offer.accept() else {
                continue;
            };

            let rendered = match self.shutdown_rx.until_shutdown(item.render()).await {
                ShutdownResult::Ok(rendered) => rendered?,
                ShutdownResult::Shutdown(()) => return Ok(()),
            };

            debug!(entry = %rendered, "item collected");
            log.push(rendered);
            self.inflight.leave();
        }
    }
}
