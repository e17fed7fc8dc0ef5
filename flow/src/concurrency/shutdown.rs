//! Broadcast shutdown signal.
//!
//! A single [`ShutdownTx`] is shared by the pipeline and any number of [`ShutdownRx`] are handed to
//! the units it spawns. Once triggered the signal stays triggered, so a unit that checks it late
//! still observes it.

use tokio::sync::watch;

/// Result of an operation that can be interrupted by a shutdown request.
#[derive(Debug, PartialEq, Eq)]
pub enum ShutdownResult<T, I> {
    /// The operation completed.
    Ok(T),
    /// A shutdown was requested first, carrying whatever was gathered so far.
    Shutdown(I),
}

/// Sending half of the shutdown signal.
#[derive(Debug, Clone)]
pub struct ShutdownTx(watch::Sender<bool>);

impl ShutdownTx {
    /// Triggers the shutdown for every current and future subscriber.
    pub fn shutdown(&self) {
        self.0.send_replace(true);
    }

    /// Returns a new receiver observing this signal.
    pub fn subscribe(&self) -> ShutdownRx {
        ShutdownRx(self.0.subscribe())
    }

    pub fn is_shutdown(&self) -> bool {
        *self.0.borrow()
    }
}

/// Receiving half of the shutdown signal.
#[derive(Debug, Clone)]
pub struct ShutdownRx(watch::Receiver<bool>);

impl ShutdownRx {
    /// Waits until shutdown is requested.
    ///
    /// Resolves immediately if it already was, and also when the sending half is gone since no one
    /// is left to keep the unit running. Cancel safe, so it can be used as a `select!` branch.
    pub async fn changed(&mut self) {
        let _ = self.0.wait_for(|shutdown| *shutdown).await;
    }

    pub fn is_shutdown(&self) -> bool {
        *self.0.borrow()
    }

    /// Drives `future` to completion unless shutdown is requested first.
    ///
    /// Shutdown is checked before the future on every poll, so a unit never starts new work once
    /// it has been asked to stop. The future is dropped when shutdown wins.
    pub async fn until_shutdown<F>(&mut self, future: F) -> ShutdownResult<F::Output, ()>
    where
        F: Future,
    {
        tokio::select! {
            biased;

            _ = self.changed() => ShutdownResult::Shutdown(()),
            output = future => ShutdownResult::Ok(output),
        }
    }
}

/// Creates a shutdown channel in the running state.
pub fn create_shutdown_channel() -> (ShutdownTx, ShutdownRx) {
    let (tx, rx) = watch::channel(false);
    (ShutdownTx(tx), ShutdownRx(rx))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tokio::time::timeout;

    #[tokio::test]
    async fn late_subscribers_observe_shutdown() {
        let (tx, _rx) = create_shutdown_channel();
        tx.shutdown();

        let mut late = tx.subscribe();
        assert!(late.is_shutdown());
        timeout(Duration::from_millis(100), late.changed())
            .await
            .expect("shutdown should already be observed");
    }

    #[tokio::test]
    async fn changed_stays_pending_while_running() {
        let (_tx, mut rx) = create_shutdown_channel();

        assert!(!rx.is_shutdown());
        assert!(
            timeout(Duration::from_millis(20), rx.changed())
                .await
                .is_err()
        );
    }

    #[tokio::test]
    async fn until_shutdown_prefers_the_signal() {
        let (tx, mut rx) = create_shutdown_channel();

        assert_eq!(rx.until_shutdown(async { 1 }).await, ShutdownResult::Ok(1));

        tx.shutdown();
        assert_eq!(
            rx.until_shutdown(async { 2 }).await,
            ShutdownResult::Shutdown(())
        );
    }

    #[tokio::test]
    async fn dropping_the_sender_releases_receivers() {
        let (tx, mut rx) = create_shutdown_channel();
        drop(tx);

        timeout(Duration::from_millis(100), rx.changed())
            .await
            .expect("receivers should stop waiting once the sender is gone");
    }
}
