use crate::error::{ErrorKind, FlowResult};
use crate::flow_error;
use crate::item::{Item, ItemStatus};
use crate::remote::{ProxyClient, RemoteId, RemoteOperation};

/// An item whose state lives in a twin on the remote service.
///
/// Every operation is one round trip through the proxy, nothing is computed or cached locally.
#[derive(Debug)]
pub struct RemoteItem {
    id: RemoteId,
    proxy: ProxyClient,
}

impl RemoteItem {
    /// Wraps a twin that was already created on the remote service.
    pub fn new(id: RemoteId, proxy: ProxyClient) -> Self {
        Self { id, proxy }
    }

    pub fn id(&self) -> RemoteId {
        self.id
    }
}

impl Item for RemoteItem {
    async fn initialize(&mut self) -> FlowResult<()> {
        self.proxy
            .call(self.id, RemoteOperation::Initialize)
            .await
            .map(|_| ())
    }

    async fn advance(&mut self) -> FlowResult<()> {
        self.proxy
            .call(self.id, RemoteOperation::Advance)
            .await
            .map(|_| ())
    }

    async fn render(&self) -> FlowResult<String> {
        self.proxy.call(self.id, RemoteOperation::Render).await
    }

    async fn status(&self) -> FlowResult<ItemStatus> {
        let reply = self.proxy.call(self.id, RemoteOperation::Status).await?;

        ItemStatus::from_code(reply.trim()).ok_or_else(|| {
            flow_error!(
                ErrorKind::RemoteProtocolError,
                "Remote service sent an unknown status",
                format!("twin {}: {reply:?}", self.id)
            )
        })
    }
}
