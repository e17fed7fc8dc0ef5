//! Concurrency primitives coordinating the units of execution of the pipeline.
//!
//! Every unit (producers, managers, workers, proxy, id allocator, source reader and collector)
//! runs as its own task and talks to the others only through the primitives of this module:
//!
//! - [`shutdown`] broadcasts a stop request that every unit observes in its main loop.
//! - [`handoff`] provides rendezvous channels, a send completes only once a receiver accepted the
//!   value, so the only buffering of items in the system is the manager queue. Dispatching to
//!   workers is demand driven: a worker offers a slot and a manager fills it.
//! - [`inflight`] counts items admitted by managers and not yet logged, which lets a draining
//!   shutdown wait for the pipeline to empty.

pub mod handoff;
pub mod inflight;
pub mod shutdown;
