use tokio::sync::watch;

#[derive(Debug, Clone, Copy, Default)]
struct Counts {
    admitted: u64,
    logged: u64,
}

impl Counts {
    fn in_flight(&self) -> usize {
        self.admitted.saturating_sub(self.logged) as usize
    }
}

/// Counts items admitted into the pipeline and not yet logged by the collector.
///
/// A manager enters an item once it accepted it from a producer, the collector leaves it once the
/// item is logged. Items a producer withdrew before any manager accepted them are never counted.
#[derive(Debug, Clone)]
pub struct InFlight {
    counts: watch::Sender<Counts>,
}

impl InFlight {
    pub fn new() -> Self {
        let (counts, _) = watch::channel(Counts::default());

        Self { counts }
    }

    pub fn enter(&self) {
        self.counts.send_modify(|counts| counts.admitted += 1);
    }

    pub fn leave(&self) {
        self.counts.send_modify(|counts| counts.logged += 1);
    }

    /// Number of items admitted and not logged yet.
    pub fn count(&self) -> usize {
        self.counts.borrow().in_flight()
    }

    /// Total number of items admitted since the pipeline started.
    pub fn admitted(&self) -> u64 {
        self.counts.borrow().admitted
    }

    /// Total number of items logged since the pipeline started.
    pub fn logged(&self) -> u64 {
        self.counts.borrow().logged
    }

    /// Waits until no item is in flight.
    pub async fn wait_idle(&self) {
        let mut rx = self.counts.subscribe();
        // The sender lives in `self`, so the wait cannot fail.
        let _ = rx.wait_for(|counts| counts.in_flight() == 0).await;
    }
}

impl Default for InFlight {
    fn default() -> Self {
        Self::new()
    }
}
