//! Work items and their lifecycle.
//!
//! Every item moves through `Void -> Ready -> Complete`, or directly from `Void` to `Complete`
//! when it has nothing to do. [`LocalItem`] runs each step in-process while [`RemoteItem`]
//! forwards it to a twin hosted by the remote service. Pipeline units only see [`WorkItem`].

mod local;
mod remote;
mod status;

use std::future::Future;

pub use local::LocalItem;
pub use remote::RemoteItem;
pub use status::ItemStatus;

use crate::error::FlowResult;

/// Lifecycle operations shared by every kind of item.
pub trait Item {
    /// Materializes the item. Only valid on a [`ItemStatus::Void`] item.
    fn initialize(&mut self) -> impl Future<Output = FlowResult<()>> + Send;

    /// Performs exactly one pending step. Only valid on a [`ItemStatus::Ready`] item.
    fn advance(&mut self) -> impl Future<Output = FlowResult<()>> + Send;

    /// Describes the item, meaningful once it is complete.
    fn render(&self) -> impl Future<Output = FlowResult<String>> + Send;

    /// Current lifecycle state, without side effects.
    fn status(&self) -> impl Future<Output = FlowResult<ItemStatus>> + Send;
}

/// An item flowing through the pipeline, either local or remote.
#[derive(Debug)]
pub enum WorkItem {
    Local(LocalItem),
    Remote(RemoteItem),
}

impl Item for WorkItem {
    async fn initialize(&mut self) -> FlowResult<()> {
        match self {
            WorkItem::Local(item) => item.initialize().await,
            WorkItem::Remote(item) => item.initialize().await,
        }
    }

    async fn advance(&mut self) -> FlowResult<()> {
        match self {
            WorkItem::Local(item) => item.advance().await,
            WorkItem::Remote(item) => item.advance().await,
        }
    }

    async fn render(&self) -> FlowResult<String> {
        match self {
            WorkItem::Local(item) => item.render().await,
            WorkItem::Remote(item) => item.render().await,
        }
    }

    async fn status(&self) -> FlowResult<ItemStatus> {
        match self {
            WorkItem::Local(item) => item.status().await,
            WorkItem::Remote(item) => item.status().await,
        }
    }
}

impl From<LocalItem> for WorkItem {
    fn from(item: LocalItem) -> Self {
        WorkItem::Local(item)
    }
}

impl From<RemoteItem> for WorkItem {
    fn from(item: RemoteItem) -> Self {
        WorkItem::Remote(item)
    }
}
