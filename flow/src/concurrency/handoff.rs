//! Rendezvous hand-off between units of execution.
//!
//! Items are never buffered in transit. A [`HandoffTx::send`] only completes once a receiver
//! accepted the value through [`Offer::accept`], so a value that is queued in the underlying
//! channel because a receiver stopped polling still counts as held by its sender. Receivers only
//! accept while they are able to store the value, which keeps the manager queue the only place
//! items wait.
//!
//! Dispatching is driven by demand. A worker offers a [`Slot`] through a [`DispatchSink`] and blocks
//! until a manager holding work accepts the offer from its [`DispatchSource`] and fills it. A
//! manager therefore only gives up an item to a worker that is ready for it, and an item a worker
//! can no longer accept comes back to the manager.
//!
//! Request channels ([`request_channel`]) carry requests to a task serving a handle. Requests hold
//! their own reply channel, so they need no acknowledgement.

use tokio::sync::oneshot;

use crate::error::{ErrorKind, FlowResult};
use crate::flow_error;

/// Sending half of a request channel.
pub type RequestTx<T> = flume::Sender<T>;

/// Receiving half of a request channel.
pub type RequestRx<T> = flume::Receiver<T>;

/// Creates a multi-producer multi-consumer channel without capacity.
pub fn request_channel<T>() -> (RequestTx<T>, RequestRx<T>) {
    flume::bounded(0)
}

/// A value waiting for a receiver to accept it.
pub struct Offer<T> {
    value: T,
    accepted: oneshot::Sender<()>,
}

impl<T> Offer<T> {
    /// Takes the value and releases its sender.
    ///
    /// Returns [`None`] if the sender stopped waiting, the value is then dropped.
    pub fn accept(self) -> Option<T> {
        self.accepted.send(()).ok().map(|()| self.value)
    }
}

/// Sending half of a rendezvous channel.
pub struct HandoffTx<T> {
    offers: flume::Sender<Offer<T>>,
}

impl<T> HandoffTx<T> {
    /// Offers `value` and waits until a receiver accepted it.
    ///
    /// Dropping the future withdraws the offer, a receiver finding it afterwards drops the value.
    pub async fn send(&self, value: T) -> FlowResult<()> {
        let (accepted_tx, accepted_rx) = oneshot::channel();

        self.offers
            .send_async(Offer {
                value,
                accepted: accepted_tx,
            })
            .await
            .map_err(|_| {
                flow_error!(
                    ErrorKind::ChannelClosed,
                    "No receiver is left to take the value"
                )
            })?;

        accepted_rx.await.map_err(|_| {
            flow_error!(
                ErrorKind::ChannelClosed,
                "Receiver dropped the value without accepting it"
            )
        })
    }
}

impl<T> Clone for HandoffTx<T> {
    fn clone(&self) -> Self {
        Self {
            offers: self.offers.clone(),
        }
    }
}

/// Receiving half of a rendezvous channel.
pub struct HandoffRx<T> {
    offers: flume::Receiver<Offer<T>>,
}

impl<T> HandoffRx<T> {
    /// Waits for the next offer.
    ///
    /// Returns [`None`] once every sender is gone. Cancel safe, an offer is never lost when the
    /// future is dropped and its sender keeps waiting until some receiver accepts it.
    pub async fn recv(&self) -> Option<Offer<T>> {
        self.offers.recv_async().await.ok()
    }
}

impl<T> Clone for HandoffRx<T> {
    fn clone(&self) -> Self {
        Self {
            offers: self.offers.clone(),
        }
    }
}

/// Creates a rendezvous channel shared by any number of senders and receivers.
pub fn rendezvous<T>() -> (HandoffTx<T>, HandoffRx<T>) {
    let (offers_tx, offers_rx) = flume::bounded(0);

    (
        HandoffTx { offers: offers_tx },
        HandoffRx { offers: offers_rx },
    )
}

/// A ready worker's offer to receive exactly one value.
pub struct Slot<T>(oneshot::Sender<T>);

impl<T> Slot<T> {
    /// Hands `value` to the worker, giving it back if the worker stopped waiting.
    pub fn fill(self, value: T) -> Result<(), T> {
        self.0.send(value)
    }
}

/// Worker side of the dispatch channel.
pub struct DispatchSink<T> {
    offers: flume::Sender<Slot<T>>,
}

impl<T> DispatchSink<T> {
    /// Offers a slot and waits until a manager fills it.
    pub async fn take(&self) -> FlowResult<T> {
        let (slot_tx, slot_rx) = oneshot::channel();

        self.offers.send_async(Slot(slot_tx)).await.map_err(|_| {
            flow_error!(
                ErrorKind::ChannelClosed,
                "No manager is left to dispatch items"
            )
        })?;

        slot_rx.await.map_err(|_| {
            flow_error!(
                ErrorKind::ChannelClosed,
                "Manager dropped the dispatch slot without filling it"
            )
        })
    }
}

impl<T> Clone for DispatchSink<T> {
    fn clone(&self) -> Self {
        Self {
            offers: self.offers.clone(),
        }
    }
}

/// Manager side of the dispatch channel.
pub struct DispatchSource<T> {
    offers: flume::Receiver<Slot<T>>,
}

impl<T> DispatchSource<T> {
    /// Waits for a worker ready to take an item.
    ///
    /// Returns [`None`] once every worker is gone. Cancel safe, an offer is never lost when the
    /// future is dropped.
    pub async fn ready_worker(&self) -> Option<Slot<T>> {
        self.offers.recv_async().await.ok()
    }
}

impl<T> Clone for DispatchSource<T> {
    fn clone(&self) -> Self {
        Self {
            offers: self.offers.clone(),
        }
    }
}

/// Creates a dispatch channel shared by any number of managers and workers.
pub fn dispatch_channel<T>() -> (DispatchSink<T>, DispatchSource<T>) {
    let (offers_tx, offers_rx) = flume::bounded(0);

    (
        DispatchSink { offers: offers_tx },
        DispatchSource { offers: offers_rx },
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tokio::time::timeout;

    #[tokio::test]
    async fn send_completes_only_once_the_value_is_accepted() {
        let (tx, rx) = rendezvous::<u32>();

        let send = tokio::spawn(async move { tx.send(1).await });
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!send.is_finished());

        // Receiving the offer is not enough, the receiver has to accept it.
        let offer = rx.recv().await.unwrap();
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!send.is_finished());

        assert_eq!(offer.accept(), Some(1));
        timeout(Duration::from_millis(100), send)
            .await
            .unwrap()
            .unwrap()
            .unwrap();
    }

    #[tokio::test]
    async fn offer_stays_pending_when_the_receiver_gives_up() {
        let (tx, rx) = rendezvous::<u32>();

        // The receiver is registered and woken by the send, but never polled again.
        let mut abandoned = Box::pin(rx.recv());
        assert!(
            timeout(Duration::from_millis(10), &mut abandoned)
                .await
                .is_err()
        );
        let send = tokio::spawn(async move { tx.send(1).await });
        tokio::time::sleep(Duration::from_millis(20)).await;
        drop(abandoned);

        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!send.is_finished());

        let offer = timeout(Duration::from_millis(100), rx.recv())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(offer.accept(), Some(1));
        send.await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn withdrawn_offer_is_not_accepted() {
        let (tx, rx) = rendezvous::<u32>();

        // A waiting receiver lets the offer reach the channel before it is withdrawn.
        let mut abandoned = Box::pin(rx.recv());
        assert!(
            timeout(Duration::from_millis(10), &mut abandoned)
                .await
                .is_err()
        );
        let send = tokio::spawn(async move { tx.send(1).await });
        tokio::time::sleep(Duration::from_millis(20)).await;
        drop(abandoned);
        send.abort();
        let _ = send.await;

        let offer = timeout(Duration::from_millis(100), rx.recv())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(offer.accept(), None);
    }

    #[tokio::test]
    async fn filled_slot_reaches_the_worker() {
        let (sink, source) = dispatch_channel::<&'static str>();

        let worker = tokio::spawn(async move { sink.take().await });
        let slot = source.ready_worker().await.unwrap();
        assert!(slot.fill("item").is_ok());

        assert_eq!(worker.await.unwrap().unwrap(), "item");
    }

    #[tokio::test]
    async fn value_comes_back_when_worker_is_gone() {
        let (sink, source) = dispatch_channel::<u32>();

        let worker = tokio::spawn(async move { sink.take().await });
        let slot = source.ready_worker().await.unwrap();
        worker.abort();
        let _ = worker.await;

        assert_eq!(slot.fill(7), Err(7));
    }

    #[tokio::test]
    async fn take_fails_without_managers() {
        let (sink, source) = dispatch_channel::<u32>();
        drop(source);

        let err = timeout(Duration::from_millis(100), sink.take())
            .await
            .unwrap()
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ChannelClosed);
    }
}
