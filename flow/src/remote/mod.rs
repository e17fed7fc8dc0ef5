//! Access to the remote service hosting item twins.
//!
//! A single [`Proxy`] owns the connection and performs one request/reply round trip at a time on
//! behalf of every [`ProxyClient`]. Twin ids come from the [`IdAllocator`].

mod allocator;
mod protocol;
mod proxy;

pub use allocator::{IdAllocator, IdSupply};
pub use protocol::{RemoteId, RemoteOperation, Request};
pub use proxy::{Proxy, ProxyClient};
