//! Units of execution moving items through the pipeline.

pub mod admission;
pub mod base;
pub mod collector;
pub mod item_worker;
pub mod manager;
pub mod pool;
pub mod producer;
pub mod remote_producer;
