#![cfg(feature = "test-utils")]

use config::shared::ShutdownMode;
use flow::concurrency::handoff::{dispatch_channel, rendezvous};
use flow::concurrency::inflight::InFlight;
use flow::concurrency::shutdown::create_shutdown_channel;
use flow::error::{ErrorKind, FlowResult};
use flow::item::{Item, ItemStatus};
use flow::pipeline::Pipeline;
use flow::source::FileSource;
use flow::test_utils::pipeline::{
    assert_rendered_entries, create_local_pipeline, test_pipeline_config,
};
use flow::test_utils::source::{SAMPLE_SIZE, write_sample_file};
use flow::workers::base::Worker;
use flow::workers::collector::Collector;
use flow::workers::item_worker::ItemWorker;
use flow::workers::manager::Manager;
use flow::workers::pool::WorkerPool;
use std::collections::HashSet;
use std::time::{Duration, Instant};
use telemetry::tracing::init_test_tracing;
use tokio::time::timeout;

/// Item with a fixed number of steps that renders whether it was fully drained.
#[derive(Debug)]
struct CountedItem {
    id: usize,
    steps: usize,
    status: ItemStatus,
}

impl CountedItem {
    fn new(id: usize) -> Self {
        Self {
            id,
            steps: 0,
            status: ItemStatus::Void,
        }
    }
}

impl Item for CountedItem {
    async fn initialize(&mut self) -> FlowResult<()> {
        assert_eq!(self.status, ItemStatus::Void);
        self.steps = self.id % 4;
        self.status = if self.steps == 0 {
            ItemStatus::Complete
        } else {
            ItemStatus::Ready
        };
        Ok(())
    }

    async fn advance(&mut self) -> FlowResult<()> {
        assert_eq!(self.status, ItemStatus::Ready);
        assert!(self.steps > 0);
        self.steps -= 1;
        if self.steps == 0 {
            self.status = ItemStatus::Complete;
        }
        Ok(())
    }

    async fn render(&self) -> FlowResult<String> {
        Ok(format!("{}:{}", self.id, self.steps))
    }

    async fn status(&self) -> FlowResult<ItemStatus> {
        Ok(self.status)
    }
}

#[tokio::test(flavor = "multi_thread")]
async fn reference_pipeline_stops_shortly_after_its_run_duration() {
    init_test_tracing();

    let config = test_pipeline_config();
    let max_steps = config.max_pending_transforms;
    let pipeline = create_local_pipeline(config);

    let started = Instant::now();
    let log = timeout(
        Duration::from_secs(5),
        pipeline.run_for(Duration::from_millis(200)),
    )
    .await
    .expect("pipeline should stop shortly after its run duration")
    .unwrap();
    let elapsed = started.elapsed();

    assert!(elapsed >= Duration::from_millis(200));
    assert!(elapsed < Duration::from_millis(1_200), "took {elapsed:?}");
    assert!(!log.is_empty());
    assert_rendered_entries(&log, max_steps);
}

#[tokio::test(flavor = "multi_thread")]
async fn every_completed_item_is_logged_exactly_once() {
    init_test_tracing();

    const ITEMS: usize = 200;

    let (shutdown_tx, shutdown_rx) = create_shutdown_channel();
    let (intake_tx, intake_rx) = rendezvous::<CountedItem>();
    let (feedback_tx, feedback_rx) = rendezvous();
    let (collected_tx, collected_rx) = rendezvous();
    let (sink, source) = dispatch_channel();
    let inflight = InFlight::new();
    let mut pool = WorkerPool::new();

    let (collector, collector_worker) =
        Collector::new(collected_rx, inflight.clone(), shutdown_rx.clone());
    pool.spawn(collector_worker);

    for id in 0..2 {
        let (_, manager) = Manager::new(
            id,
            5,
            intake_rx.clone(),
            feedback_rx.clone(),
            source.clone(),
            inflight.clone(),
            shutdown_rx.clone(),
        );
        pool.spawn(manager);
    }

    for id in 0..4 {
        pool.spawn(ItemWorker::new(
            id,
            sink.clone(),
            feedback_tx.clone(),
            collected_tx.clone(),
            shutdown_rx.clone(),
        ));
    }

    for id in 0..ITEMS {
        intake_tx.send(CountedItem::new(id)).await.unwrap();
    }
    assert_eq!(inflight.admitted(), ITEMS as u64);

    timeout(Duration::from_secs(5), inflight.wait_idle())
        .await
        .expect("every published item should reach the collector");

    shutdown_tx.shutdown();
    pool.wait_all().await.unwrap();
    let log = collector.log().await.unwrap();

    assert_eq!(log.len(), ITEMS);
    let mut seen = HashSet::new();
    for entry in log.entries() {
        let (id, remaining) = entry.split_once(':').unwrap();
        assert_eq!(remaining, "0", "item {id} was logged with pending work");
        assert!(seen.insert(id.to_owned()), "item {id} was logged twice");
    }
}

#[tokio::test(flavor = "multi_thread")]
async fn reference_pipeline_keeps_logging_items() {
    init_test_tracing();

    let mut pipeline = create_local_pipeline(test_pipeline_config());
    pipeline.start().await.unwrap();

    let mut occupancies = pipeline
        .managers()
        .iter()
        .map(|manager| manager.occupancy())
        .collect::<Vec<_>>();

    let mut last = 0;
    for _ in 0..6 {
        tokio::time::sleep(Duration::from_millis(100)).await;

        let logged = pipeline.logged();
        let occupancy = occupancies
            .iter()
            .map(|occupancy| *occupancy.borrow())
            .collect::<Vec<_>>();
        assert!(
            logged > last,
            "nothing logged in 100ms, in flight {}, occupancy {occupancy:?}",
            pipeline.in_flight()
        );
        for (id, occupancy) in occupancies.iter_mut().enumerate() {
            assert!(
                occupancy.has_changed().unwrap(),
                "manager {id} stayed at {} for 100ms",
                *occupancy.borrow()
            );
            occupancy.borrow_and_update();
        }
        last = logged;
    }

    let log = pipeline.shutdown_and_wait().await.unwrap();
    assert!(log.len() as u64 >= last);
}

#[tokio::test(flavor = "multi_thread")]
async fn drain_logs_every_admitted_item_before_its_timeout() {
    init_test_tracing();

    let mut config = test_pipeline_config();
    config.shutdown_mode = ShutdownMode::Drain;
    config.drain_timeout_ms = 5_000;
    let mut pipeline = create_local_pipeline(config);
    pipeline.start().await.unwrap();

    tokio::time::sleep(Duration::from_millis(200)).await;

    let started = Instant::now();
    pipeline.drain().await.unwrap();
    let elapsed = started.elapsed();

    assert!(elapsed < Duration::from_secs(2), "drain took {elapsed:?}");
    assert_eq!(pipeline.in_flight(), 0);
    let admitted = pipeline.admitted();
    assert!(admitted > 0);

    let log = timeout(Duration::from_secs(5), pipeline.shutdown_and_wait())
        .await
        .expect("drained pipeline should stop")
        .unwrap();

    assert_eq!(log.len() as u64, admitted);
    assert_rendered_entries(&log, test_pipeline_config().max_pending_transforms);
}

#[tokio::test(flavor = "multi_thread")]
async fn drain_mode_run_stops_well_before_its_timeout() {
    init_test_tracing();

    let mut config = test_pipeline_config();
    config.shutdown_mode = ShutdownMode::Drain;
    config.drain_timeout_ms = 5_000;
    config.max_pending_transforms = 2;
    let pipeline = create_local_pipeline(config);

    let started = Instant::now();
    let log = timeout(
        Duration::from_secs(10),
        pipeline.run_for(Duration::from_millis(100)),
    )
    .await
    .expect("drained pipeline should stop")
    .unwrap();

    assert!(started.elapsed() < Duration::from_secs(3));
    assert!(!log.is_empty());
    assert_rendered_entries(&log, 2);
}

#[tokio::test(flavor = "multi_thread")]
async fn file_source_feeds_the_pipeline() {
    init_test_tracing();

    let path = write_sample_file("pipeline");
    let source = FileSource::new(&path, SAMPLE_SIZE, '\t');
    let pipeline = Pipeline::new(test_pipeline_config(), None, source);

    let log = timeout(
        Duration::from_secs(5),
        pipeline.run_for(Duration::from_millis(100)),
    )
    .await
    .unwrap()
    .unwrap();

    assert!(!log.is_empty());
    assert_rendered_entries(&log, test_pipeline_config().max_pending_transforms);

    std::fs::remove_file(path).unwrap();
}

#[tokio::test(flavor = "multi_thread")]
async fn missing_source_row_is_fatal() {
    init_test_tracing();

    let path = write_sample_file("missing-rows");
    // Producers pick rows the file does not have.
    let source = FileSource::new(&path, SAMPLE_SIZE * 10, '\t');
    let pipeline = Pipeline::new(test_pipeline_config(), None, source);

    let err = timeout(
        Duration::from_secs(5),
        pipeline.run_for(Duration::from_secs(30)),
    )
    .await
    .expect("a fatal source error should stop the pipeline early")
    .unwrap_err();

    assert!(err.kinds().contains(&ErrorKind::SourceRowMissing));

    std::fs::remove_file(path).unwrap();
}

#[tokio::test(flavor = "multi_thread")]
async fn invalid_topology_is_rejected_at_start() {
    init_test_tracing();

    let mut config = test_pipeline_config();
    config.queue_capacity = 1;
    let mut pipeline = create_local_pipeline(config);

    let err = pipeline.start().await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::ConfigError);
}

#[tokio::test(flavor = "multi_thread")]
async fn pipeline_cannot_start_twice() {
    init_test_tracing();

    let mut pipeline = create_local_pipeline(test_pipeline_config());
    pipeline.start().await.unwrap();
    assert_eq!(pipeline.managers().len(), 2);

    let err = pipeline.start().await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidState);

    pipeline.shutdown_and_wait().await.unwrap();
}
