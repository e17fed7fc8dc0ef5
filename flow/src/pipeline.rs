use config::shared::{PipelineConfig, RemoteConfig, ShutdownMode};
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

use crate::bail;
use crate::concurrency::handoff::{dispatch_channel, rendezvous};
use crate::concurrency::inflight::InFlight;
use crate::concurrency::shutdown::{ShutdownTx, create_shutdown_channel};
use crate::error::{ErrorKind, FlowResult};
use crate::item::WorkItem;
use crate::remote::{IdAllocator, Proxy};
use crate::source::{Source, SourceReader};
use crate::workers::collector::{Collector, CollectorHandle, CompletionLog};
use crate::workers::item_worker::ItemWorker;
use crate::workers::manager::{Manager, ManagerHandle};
use crate::workers::pool::WorkerPool;
use crate::workers::producer::Producer;
use crate::workers::remote_producer::RemoteProducer;

#[derive(Debug)]
enum PipelineState {
    NotStarted,
    Started {
        /// Local and remote producers, stopped first when draining.
        producers: WorkerPool,
        /// Every other unit, including the collector.
        units: WorkerPool,
        collector: CollectorHandle,
        managers: Vec<ManagerHandle>,
        inflight: InFlight,
        failure_watcher: JoinHandle<()>,
    },
}

/// Wires producers, managers, workers and the collector together and controls their lifetime.
#[derive(Debug)]
pub struct Pipeline<S> {
    config: PipelineConfig,
    remote: Option<RemoteConfig>,
    source: Option<S>,
    state: PipelineState,
    producers_shutdown_tx: ShutdownTx,
    shutdown_tx: ShutdownTx,
}

impl<S> Pipeline<S>
where
    S: Source + Send + Sync + 'static,
{
    pub fn new(config: PipelineConfig, remote: Option<RemoteConfig>, source: S) -> Self {
        // Receivers are created on demand through `subscribe`.
        let (producers_shutdown_tx, _) = create_shutdown_channel();
        let (shutdown_tx, _) = create_shutdown_channel();

        Self {
            config,
            remote,
            source: Some(source),
            state: PipelineState::NotStarted,
            producers_shutdown_tx,
            shutdown_tx,
        }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Handles of the running managers, empty before [`Pipeline::start`].
    pub fn managers(&self) -> &[ManagerHandle] {
        match &self.state {
            PipelineState::Started { managers, .. } => managers,
            PipelineState::NotStarted => &[],
        }
    }

    /// Number of admitted items not logged yet.
    pub fn in_flight(&self) -> usize {
        match &self.state {
            PipelineState::Started { inflight, .. } => inflight.count(),
            PipelineState::NotStarted => 0,
        }
    }

    /// Number of items accepted by managers from producers so far.
    pub fn admitted(&self) -> u64 {
        match &self.state {
            PipelineState::Started { inflight, .. } => inflight.admitted(),
            PipelineState::NotStarted => 0,
        }
    }

    /// Number of items logged by the collector so far.
    pub fn logged(&self) -> u64 {
        match &self.state {
            PipelineState::Started { inflight, .. } => inflight.logged(),
            PipelineState::NotStarted => 0,
        }
    }

    pub async fn start(&mut self) -> FlowResult<()> {
        if let PipelineState::Started { .. } = self.state {
            bail!(ErrorKind::InvalidState, "Pipeline was already started");
        }

        self.config.validate()?;

        let Some(source) = self.source.take() else {
            bail!(ErrorKind::InvalidState, "Pipeline source was already consumed");
        };

        let source_size = source.size();
        if source_size == 0 && self.config.producers > 0 {
            bail!(
                ErrorKind::ConfigError,
                "Source has no rows to produce items from"
            );
        }

        info!(
            queue_capacity = self.config.queue_capacity,
            producers = self.config.producers,
            remote_producers = self.config.remote_producers,
            managers = self.config.managers,
            workers = self.config.workers,
            "starting pipeline"
        );

        // We connect to the remote service before spawning anything, so an unreachable service
        // fails the start without leaving units behind.
        let remote = if self.config.remote_producers > 0 {
            let Some(remote) = &self.remote else {
                bail!(
                    ErrorKind::ConfigError,
                    "Remote producers require a remote service configuration"
                );
            };

            Some(Proxy::connect(remote.address(), self.shutdown_tx.subscribe()).await?)
        } else {
            None
        };

        let inflight = InFlight::new();
        let mut producers = WorkerPool::new();
        let mut units = WorkerPool::new();

        let (intake_tx, intake_rx) = rendezvous::<WorkItem>();
        let (feedback_tx, feedback_rx) = rendezvous::<WorkItem>();
        let (collected_tx, collected_rx) = rendezvous::<WorkItem>();
        let (dispatch_sink, dispatch_source) = dispatch_channel::<WorkItem>();

        let (reader, reader_worker) = SourceReader::new(source, self.shutdown_tx.subscribe());
        units.spawn(reader_worker);

        let (collector, collector_worker) =
            Collector::new(collected_rx, inflight.clone(), self.shutdown_tx.subscribe());
        units.spawn(collector_worker);

        let mut managers = Vec::with_capacity(self.config.managers);
        for id in 0..self.config.managers {
            let (handle, manager) = Manager::new(
                id,
                self.config.queue_capacity,
                intake_rx.clone(),
                feedback_rx.clone(),
                dispatch_source.clone(),
                inflight.clone(),
                self.shutdown_tx.subscribe(),
            );
            managers.push(handle);
            units.spawn(manager);
        }

        for id in 0..self.config.workers {
            units.spawn(ItemWorker::new(
                id,
                dispatch_sink.clone(),
                feedback_tx.clone(),
                collected_tx.clone(),
                self.shutdown_tx.subscribe(),
            ));
        }

        if let Some((proxy_client, proxy)) = remote {
            units.spawn(proxy);

            let (ids, allocator) = IdAllocator::new(self.shutdown_tx.subscribe());
            units.spawn(allocator);

            for id in 0..self.config.remote_producers {
                producers.spawn(RemoteProducer::new(
                    id,
                    ids.clone(),
                    proxy_client.clone(),
                    intake_tx.clone(),
                    self.producers_shutdown_tx.subscribe(),
                ));
            }
        }

        for id in 0..self.config.producers {
            producers.spawn(Producer::new(
                id,
                reader.clone(),
                source_size,
                self.config.max_pending_transforms,
                intake_tx.clone(),
                self.producers_shutdown_tx.subscribe(),
            ));
        }

        let failure_watcher = self.shutdown_on_failure(producers.failures(), units.failures());

        self.state = PipelineState::Started {
            producers,
            units,
            collector,
            managers,
            inflight,
            failure_watcher,
        };

        Ok(())
    }

    /// Resolves once any unit of the pipeline has failed. Never resolves before the pipeline starts.
    pub async fn wait_for_failure(&self) {
        let PipelineState::Started {
            producers, units, ..
        } = &self.state
        else {
            return std::future::pending().await;
        };

        tokio::select! {
            _ = producers.wait_for_failure() => {}
            _ = units.wait_for_failure() => {}
        }
    }

    /// Signals every unit to stop.
    pub fn shutdown(&self) {
        info!("shutting down pipeline");

        self.producers_shutdown_tx.shutdown();
        self.shutdown_tx.shutdown();
    }

    /// Waits for every unit to stop and returns the log emitted by the collector.
    ///
    /// Units only stop on their own when one of them fails, so this is normally preceded by
    /// [`Pipeline::shutdown`].
    pub async fn wait(self) -> FlowResult<CompletionLog> {
        let PipelineState::Started {
            mut producers,
            mut units,
            collector,
            failure_watcher,
            ..
        } = self.state
        else {
            info!("pipeline was not started, nothing to wait for");

            return Ok(CompletionLog::default());
        };

        let mut errors = Vec::new();

        if let Err(err) = producers.wait_all().await {
            errors.push(err);
        }

        if let Err(err) = units.wait_all().await {
            // We naively use the `kinds` as number of errors.
            info!("{} units failed with an error", err.kinds().len());
            errors.push(err);
        }

        failure_watcher.abort();

        if !errors.is_empty() {
            return Err(errors.into());
        }

        let log = collector.log().await?;
        info!(entries = log.len(), "pipeline stopped");

        Ok(log)
    }

    /// Stops the pipeline according to its [`ShutdownMode`] and waits for it.
    pub async fn shutdown_and_wait(mut self) -> FlowResult<CompletionLog> {
        let mut errors = Vec::new();

        if self.config.shutdown_mode == ShutdownMode::Drain {
            if let Err(err) = self.drain().await {
                errors.push(err);
            }
        }

        self.shutdown();

        match self.wait().await {
            Ok(log) if errors.is_empty() => Ok(log),
            Ok(_) => Err(errors.into()),
            Err(err) => {
                errors.push(err);
                Err(errors.into())
            }
        }
    }

    /// Starts the pipeline, lets it run for `duration` and stops it.
    ///
    /// The pipeline is stopped early if any unit fails.
    pub async fn run_for(mut self, duration: Duration) -> FlowResult<CompletionLog> {
        self.start().await?;

        tokio::select! {
            _ = tokio::time::sleep(duration) => {
                info!(duration_ms = duration.as_millis() as u64, "run duration elapsed");
            }
            _ = self.wait_for_failure() => {
                warn!("a unit failed, stopping the pipeline early");
            }
        }

        self.shutdown_and_wait().await
    }

    /// Stops the producers and waits, up to the drain timeout, for every admitted item to be
    /// logged.
    ///
    /// Every other unit keeps running, [`Pipeline::shutdown_and_wait`] stops them afterwards.
    pub async fn drain(&mut self) -> FlowResult<()> {
        let PipelineState::Started {
            producers,
            units,
            inflight,
            ..
        } = &mut self.state
        else {
            return Ok(());
        };

        if producers.has_failed() || units.has_failed() {
            info!("pipeline has failed, skipping drain");
            self.producers_shutdown_tx.shutdown();

            return Ok(());
        }

        info!(in_flight = inflight.count(), "draining pipeline");

        self.producers_shutdown_tx.shutdown();
        let result = producers.wait_all().await;

        let drain_timeout = Duration::from_millis(self.config.drain_timeout_ms);
        tokio::select! {
            idle = tokio::time::timeout(drain_timeout, inflight.wait_idle()) => {
                match idle {
                    Ok(()) => info!("every published item was logged"),
                    Err(_) => warn!(
                        in_flight = inflight.count(),
                        "drain timed out, dropping items still in flight"
                    ),
                }
            }
            _ = units.wait_for_failure() => {
                warn!(in_flight = inflight.count(), "a unit failed while draining");
            }
        }

        result
    }

    /// Shuts every unit down as soon as any of them fails, so that waiting never hangs on units
    /// whose peers are gone.
    fn shutdown_on_failure(
        &self,
        mut producer_failures: watch::Receiver<bool>,
        mut unit_failures: watch::Receiver<bool>,
    ) -> JoinHandle<()> {
        let producers_shutdown_tx = self.producers_shutdown_tx.clone();
        let shutdown_tx = self.shutdown_tx.clone();

        tokio::spawn(async move {
            tokio::select! {
                Ok(_) = producer_failures.wait_for(|failed| *failed) => {}
                Ok(_) = unit_failures.wait_for(|failed| *failed) => {}
                else => return,
            }

            error!("a pipeline unit failed, shutting down the pipeline");

            producers_shutdown_tx.shutdown();
            shutdown_tx.shutdown();
        })
    }
}
