use std::fmt;
use std::future::Future;

use crate::error::FlowResult;

/// Classification of the units of execution, used to label their spans and failures.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum WorkerType {
    Producer { id: usize },
    RemoteProducer { id: usize },
    Manager { id: usize },
    ItemWorker { id: usize },
    Collector,
    Proxy,
    IdAllocator,
    SourceReader,
}

impl fmt::Display for WorkerType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WorkerType::Producer { id } => write!(f, "producer-{id}"),
            WorkerType::RemoteProducer { id } => write!(f, "remote-producer-{id}"),
            WorkerType::Manager { id } => write!(f, "manager-{id}"),
            WorkerType::ItemWorker { id } => write!(f, "worker-{id}"),
            WorkerType::Collector => f.write_str("collector"),
            WorkerType::Proxy => f.write_str("proxy"),
            WorkerType::IdAllocator => f.write_str("id-allocator"),
            WorkerType::SourceReader => f.write_str("source-reader"),
        }
    }
}

/// A long running unit of execution.
///
/// [`Worker::run`] drives the unit until its shutdown signal fires or one of the channels it depends
/// on is closed. An error ends the unit and is reported when its pool is awaited.
pub trait Worker {
    fn worker_type(&self) -> WorkerType;

    fn run(self) -> impl Future<Output = FlowResult<()>> + Send;
}
