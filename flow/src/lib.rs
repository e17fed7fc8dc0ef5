//! Multi-stage work item pipeline with starvation free flow control.
//!
//! Producers publish items to bounded managers, workers take one item at a time from the managers,
//! perform a single lifecycle step on it and hand it back, and complete items end up in the
//! collector's log. Items are either local, transformed in-process from a source row, or remote,
//! with every operation forwarded to a twin hosted by a remote service through a single
//! serializing proxy.
//!
//! The entry point is [`pipeline::Pipeline`].

mod macros;

pub mod concurrency;
pub mod error;
pub mod item;
pub mod payload;
pub mod pipeline;
pub mod remote;
pub mod source;
#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;
pub mod workers;
