//! Admission policy of a manager queue.
//!
//! The actions a manager may take only depend on the occupancy of its queue. Once a single free
//! slot is left, fresh items from producers are refused so the slot stays available to workers
//! handing back items in progress. Without it producers could fill the queue while every worker is
//! blocked handing back, and no one would be left to drain it.

/// Occupancy class of a queue of capacity `K`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Occupancy {
    /// No item queued.
    Empty,
    /// Between one item and `K - 2` items queued.
    PartiallyFull,
    /// Exactly `K - 1` items queued.
    NearFull,
    /// `K` items queued.
    Full,
}

/// Channels a manager is allowed to serve in a given [`Occupancy`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Admission {
    /// Accept fresh items from producers.
    pub intake: bool,
    /// Accept items handed back by workers.
    pub feedback: bool,
    /// Hand the queue head to a ready worker.
    pub dispatch: bool,
}

impl Occupancy {
    /// Classifies `len` queued items against `capacity`, which must be at least 2.
    pub fn classify(len: usize, capacity: usize) -> Self {
        if len >= capacity {
            Occupancy::Full
        } else if len == 0 {
            Occupancy::Empty
        } else if len == capacity - 1 {
            Occupancy::NearFull
        } else {
            Occupancy::PartiallyFull
        }
    }

    pub fn admission(self) -> Admission {
        match self {
            Occupancy::Empty => Admission {
                intake: true,
                feedback: true,
                dispatch: false,
            },
            Occupancy::PartiallyFull => Admission {
                intake: true,
                feedback: true,
                dispatch: true,
            },
            Occupancy::NearFull => Admission {
                intake: false,
                feedback: true,
                dispatch: true,
            },
            Occupancy::Full => Admission {
                intake: false,
                feedback: false,
                dispatch: true,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classify_covers_every_occupancy() {
        let classes = (0..=5)
            .map(|len| Occupancy::classify(len, 5))
            .collect::<Vec<_>>();

        assert_eq!(
            classes,
            vec![
                Occupancy::Empty,
                Occupancy::PartiallyFull,
                Occupancy::PartiallyFull,
                Occupancy::PartiallyFull,
                Occupancy::NearFull,
                Occupancy::Full,
            ]
        );
    }

    #[test]
    fn smallest_capacity_has_no_partial_state() {
        assert_eq!(Occupancy::classify(0, 2), Occupancy::Empty);
        assert_eq!(Occupancy::classify(1, 2), Occupancy::NearFull);
        assert_eq!(Occupancy::classify(2, 2), Occupancy::Full);
    }

    #[test]
    fn near_full_refuses_producers_only() {
        let admission = Occupancy::NearFull.admission();

        assert!(!admission.intake);
        assert!(admission.feedback);
        assert!(admission.dispatch);
    }

    #[test]
    fn full_only_dispatches() {
        assert_eq!(
            Occupancy::Full.admission(),
            Admission {
                intake: false,
                feedback: false,
                dispatch: true,
            }
        );
    }

    #[test]
    fn empty_never_dispatches() {
        let admission = Occupancy::Empty.admission();

        assert!(admission.intake && admission.feedback);
        assert!(!admission.dispatch);
    }
}
