use std::collections::VecDeque;
use tokio::sync::watch;
use tracing::{debug, info};

use crate::concurrency::handoff::{DispatchSource, HandoffRx};
use crate::concurrency::inflight::InFlight;
use crate::concurrency::shutdown::ShutdownRx;
use crate::error::FlowResult;
use crate::workers::admission::Occupancy;
use crate::workers::base::{Worker, WorkerType};

/// Observes a running manager.
#[derive(Debug, Clone)]
pub struct ManagerHandle {
    id: usize,
    occupancy: watch::Receiver<usize>,
}

impl ManagerHandle {
    pub fn id(&self) -> usize {
        self.id
    }

    /// Number of items currently queued, updated after every accepted or dispatched item.
    pub fn occupancy(&self) -> watch::Receiver<usize> {
        self.occupancy.clone()
    }
}

/// Bounded queue between producers, workers handing items back and workers taking new items.
///
/// Each iteration waits for any action allowed by the current [`Occupancy`] and serves whichever is
/// ready first. Ties are broken at random. The queue is strictly FIFO. Intake and feedback offers
/// are only accepted while the occupancy admits them, and every item accepted from intake enters
/// the [`InFlight`] count.
pub struct Manager<T> {
    id: usize,
    capacity: usize,
    queue: VecDeque<T>,
    intake: HandoffRx<T>,
    feedback: HandoffRx<T>,
    dispatch: DispatchSource<T>,
    inflight: InFlight,
    occupancy: watch::Sender<usize>,
    shutdown_rx: ShutdownRx,
}

impl<T> Manager<T> {
    pub fn new(
        id: usize,
        capacity: usize,
        intake: HandoffRx<T>,
        feedback: HandoffRx<T>,
        dispatch: DispatchSource<T>,
        inflight: InFlight,
        shutdown_rx: ShutdownRx,
    ) -> (ManagerHandle, Self) {
        let (occupancy_tx, occupancy_rx) = watch::channel(0);

        let handle = ManagerHandle {
            id,
            occupancy: occupancy_rx,
        };
        let manager = Self {
            id,
            capacity,
            queue: VecDeque::with_capacity(capacity),
            intake,
            feedback,
            dispatch,
            inflight,
            occupancy: occupancy_tx,
            shutdown_rx,
        };

        (handle, manager)
    }

    fn enqueue(&mut self, item: T, from: &'static str) {
        self.queue.push_back(item);
        self.occupancy.send_replace(self.queue.len());

        debug!(manager_id = self.id, from, occupancy = self.queue.len(), "item accepted");
    }
}

impl<T> Worker for Manager<T>
where
    T: Send + 'static,
{
    fn worker_type(&self) -> WorkerType {
        WorkerType::Manager { id: self.id }
    }

    async fn run(mut self) -> FlowResult<()> {
        info!(manager_id = self.id, capacity = self.capacity, "starting manager");

        // A closed channel stays ready forever, so its branch is disabled once it closes.
        let mut intake_open = true;
        let mut feedback_open = true;
        let mut dispatch_open = true;

        loop {
            let admission = Occupancy::classify(self.queue.len(), self.capacity).admission();

            tokio::select! {
                _ = self.shutdown_rx.changed() => break,

                offer = self.intake.recv(), if admission.intake && intake_open => {
                    match offer {
                        Some(offer) => {
                            // A withdrawn offer belongs to a producer that stopped.
                            if let Some(item) = offer.accept() {
                                self.inflight.enter();
                                self.enqueue(item, "intake");
                            }
                        }
                        None => {
                            debug!(manager_id = self.id, "intake closed");
                            intake_open = false;
                        }
                    }
                }

                offer = self.feedback.recv(), if admission.feedback && feedback_open => {
                    match offer {
                        Some(offer) => {
                            if let Some(item) = offer.accept() {
                                self.enqueue(item, "feedback");
                            }
                        }
                        None => {
                            debug!(manager_id = self.id, "feedback closed");
                            feedback_open = false;
                        }
                    }
                }

                slot = self.dispatch.ready_worker(), if admission.dispatch && dispatch_open => {
                    let Some(slot) = slot else {
                        debug!(manager_id = self.id, "no worker left to dispatch to");
                        dispatch_open = false;
                        continue;
                    };

                    let Some(item) = self.queue.pop_front() else {
                        continue;
                    };

                    match slot.fill(item) {
                        Ok(()) => {
                            self.occupancy.send_replace(self.queue.len());
                            debug!(
                                manager_id = self.id,
                                occupancy = self.queue.len(),
                                "item dispatched"
                            );
                        }
                        // The worker stopped waiting, the item keeps its place at the head.
                        Err(item) => self.queue.push_front(item),
                    }
                }
            }
        }

        info!(
            manager_id = self.id,
            dropped = self.queue.len(),
            "manager stopped"
        );

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::concurrency::handoff::{dispatch_channel, rendezvous};
    use crate::concurrency::shutdown::create_shutdown_channel;
    use std::time::Duration;
    use tokio::time::timeout;

    #[tokio::test]
    async fn items_are_dispatched_in_arrival_order() {
        let (shutdown_tx, shutdown_rx) = create_shutdown_channel();
        let (intake_tx, intake_rx) = rendezvous::<u32>();
        let (_feedback_tx, feedback_rx) = rendezvous::<u32>();
        let (sink, source) = dispatch_channel::<u32>();
        let inflight = InFlight::new();
        let (handle, manager) = Manager::new(
            0,
            4,
            intake_rx,
            feedback_rx,
            source,
            inflight.clone(),
            shutdown_rx,
        );
        let manager = tokio::spawn(manager.run());

        for item in 1..=3 {
            intake_tx.send(item).await.unwrap();
        }
        let mut occupancy = handle.occupancy();
        timeout(Duration::from_secs(1), occupancy.wait_for(|n| *n == 3))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(inflight.count(), 3);

        for expected in 1..=3 {
            assert_eq!(sink.take().await.unwrap(), expected);
        }

        shutdown_tx.shutdown();
        manager.await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn stops_on_shutdown_with_closed_channels() {
        let (shutdown_tx, shutdown_rx) = create_shutdown_channel();
        let (_, intake_rx) = rendezvous::<u32>();
        let (_, feedback_rx) = rendezvous::<u32>();
        let (_, source) = dispatch_channel::<u32>();
        let (_, manager) = Manager::new(
            0,
            2,
            intake_rx,
            feedback_rx,
            source,
            InFlight::new(),
            shutdown_rx,
        );
        let manager = tokio::spawn(manager.run());

        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!manager.is_finished());

        shutdown_tx.shutdown();
        timeout(Duration::from_secs(1), manager)
            .await
            .unwrap()
            .unwrap()
            .unwrap();
    }
}
