use tokio::sync::watch;
use tokio::task::JoinSet;
use tracing::{Instrument, debug, error, info_span};

use crate::error::{ErrorKind, FlowResult};
use crate::flow_error;
use crate::workers::base::{Worker, WorkerType};

/// Owns a group of spawned workers and collects their results.
#[derive(Debug)]
pub struct WorkerPool {
    join_set: JoinSet<(WorkerType, FlowResult<()>)>,
    failed: watch::Sender<bool>,
}

impl WorkerPool {
    pub fn new() -> Self {
        let (failed, _) = watch::channel(false);

        Self {
            join_set: JoinSet::new(),
            failed,
        }
    }

    /// Spawns `worker` inside a span named after its [`WorkerType`].
    pub fn spawn<W>(&mut self, worker: W)
    where
        W: Worker + Send + 'static,
    {
        let worker_type = worker.worker_type();
        let failed = self.failed.clone();
        let span = info_span!("worker", %worker_type);

        self.join_set.spawn(
            async move {
                let result = worker.run().await;
                if let Err(err) = &result {
                    error!(error = %err, "worker failed");
                    failed.send_replace(true);
                }

                (worker_type, result)
            }
            .instrument(span),
        );

        debug!(%worker_type, "spawned worker");
    }

    pub fn len(&self) -> usize {
        self.join_set.len()
    }

    pub fn is_empty(&self) -> bool {
        self.join_set.is_empty()
    }

    /// Observes whether any worker of the pool has failed.
    pub fn failures(&self) -> watch::Receiver<bool> {
        self.failed.subscribe()
    }

    pub fn has_failed(&self) -> bool {
        *self.failed.borrow()
    }

    /// Resolves once any worker of the pool has failed.
    pub async fn wait_for_failure(&self) {
        let mut failed = self.failures();
        // The sender lives as long as the pool, so the wait cannot end with an error.
        let _ = failed.wait_for(|failed| *failed).await;
    }

    /// Waits for every worker of the pool to finish.
    ///
    /// Failures, including panics, are aggregated into a single error.
    pub async fn wait_all(&mut self) -> FlowResult<()> {
        let mut errors = Vec::new();

        while let Some(result) = self.join_set.join_next().await {
            match result {
                Ok((worker_type, Ok(()))) => {
                    debug!(%worker_type, "worker completed");
                }
                Ok((worker_type, Err(err))) => {
                    debug!(%worker_type, "worker completed with an error");
                    errors.push(err);
                }
                Err(join_err) if join_err.is_cancelled() => {
                    debug!("worker task was cancelled");
                }
                Err(join_err) => {
                    errors.push(flow_error!(
                        ErrorKind::WorkerPanic,
                        "Worker panicked",
                        join_err
                    ));
                }
            }
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors.into())
        }
    }
}

impl Default for WorkerPool {
    fn default() -> Self {
        Self::new()
    }
}
