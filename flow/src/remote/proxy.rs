use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::sync::oneshot;
use tracing::{debug, error, info, warn};

use crate::concurrency::handoff::{RequestRx, RequestTx, request_channel};
use crate::concurrency::shutdown::{ShutdownResult, ShutdownRx};
use crate::error::{ErrorKind, FlowResult};
use crate::remote::protocol::{RemoteId, RemoteOperation, Request, trim_line};
use crate::workers::base::{Worker, WorkerType};
use crate::{bail, flow_error};

#[derive(Debug)]
struct ProxyRequest {
    request: Request,
    reply: oneshot::Sender<FlowResult<String>>,
}

/// Handle used by remote items and remote producers to call the remote service.
#[derive(Debug, Clone)]
pub struct ProxyClient {
    requests: RequestTx<ProxyRequest>,
}

impl ProxyClient {
    /// Performs one round trip and returns the reply line without its terminator.
    pub async fn call(&self, id: RemoteId, operation: RemoteOperation) -> FlowResult<String> {
        let (reply_tx, reply_rx) = oneshot::channel();
        let request = ProxyRequest {
            request: Request::new(id, operation),
            reply: reply_tx,
        };

        self.requests.send_async(request).await.map_err(|_| {
            flow_error!(
                ErrorKind::RemoteUnavailable,
                "Remote proxy is no longer running",
                format!("{operation} on twin {id}")
            )
        })?;

        reply_rx.await.map_err(|_| {
            flow_error!(
                ErrorKind::RemoteUnavailable,
                "Remote proxy stopped before replying",
                format!("{operation} on twin {id}")
            )
        })?
    }
}

struct Connection {
    reader: BufReader<OwnedReadHalf>,
    writer: OwnedWriteHalf,
}

impl Connection {
    async fn exchange(&mut self, request: &Request) -> std::io::Result<Option<String>> {
        self.writer.write_all(request.encode().as_bytes()).await?;
        self.writer.flush().await?;

        let mut line = String::new();
        if self.reader.read_line(&mut line).await? == 0 {
            return Ok(None);
        }

        Ok(Some(trim_line(&line).to_owned()))
    }
}

/// Unit of execution owning the single connection to the remote service.
///
/// Requests are served strictly one at a time in arrival order. Once a round trip fails the
/// connection is dropped, since the reply framing can no longer be trusted, and every later request
/// fails with [`ErrorKind::RemoteUnavailable`].
pub struct Proxy {
    address: String,
    connection: Option<Connection>,
    requests: RequestRx<ProxyRequest>,
    shutdown_rx: ShutdownRx,
}

impl Proxy {
    /// Connects to the remote service at `address`.
    ///
    /// Fails with [`ErrorKind::RemoteUnavailable`] when the service cannot be reached.
    pub async fn connect(
        address: impl Into<String>,
        shutdown_rx: ShutdownRx,
    ) -> FlowResult<(ProxyClient, Proxy)> {
        let address = address.into();
        let stream = TcpStream::connect(&address).await.map_err(|err| {
            flow_error!(
                ErrorKind::RemoteUnavailable,
                "Could not connect to the remote service",
                address,
                source: err
            )
        })?;
        let (read_half, write_half) = stream.into_split();

        info!(%address, "connected to remote service");

        let (requests_tx, requests_rx) = request_channel();
        let proxy = Proxy {
            address,
            connection: Some(Connection {
                reader: BufReader::new(read_half),
                writer: write_half,
            }),
            requests: requests_rx,
            shutdown_rx,
        };

        Ok((
            ProxyClient {
                requests: requests_tx,
            },
            proxy,
        ))
    }
}

async fn round_trip(
    connection: &mut Option<Connection>,
    address: &str,
    request: &Request,
) -> FlowResult<String> {
    let Some(active) = connection.as_mut() else {
        bail!(
            ErrorKind::RemoteUnavailable,
            "Connection to the remote service was lost",
            address
        );
    };

    let outcome = active.exchange(request).await;
    match outcome {
        Ok(Some(reply)) => Ok(reply),
        Ok(None) => {
            *connection = None;
            bail!(
                ErrorKind::RemoteUnavailable,
                "Remote service closed the connection",
                format!("{address} while waiting for {}", request.operation)
            );
        }
        Err(err) => {
            *connection = None;
            bail!(
                ErrorKind::RemoteUnavailable,
                "Round trip with the remote service failed",
                address,
                source: err
            );
        }
    }
}

impl Worker for Proxy {
    fn worker_type(&self) -> WorkerType {
        WorkerType::Proxy
    }

    async fn run(mut self) -> FlowResult<()> {
        loop {
            let ProxyRequest { request, reply } =
                match self.shutdown_rx.until_shutdown(self.requests.recv_async()).await {
                    ShutdownResult::Ok(Ok(pending)) => pending,
                    ShutdownResult::Ok(Err(_)) | ShutdownResult::Shutdown(()) => break,
                };

            let result = match self
                .shutdown_rx
                .until_shutdown(round_trip(&mut self.connection, &self.address, &request))
                .await
            {
                ShutdownResult::Ok(result) => result,
                ShutdownResult::Shutdown(()) => {
                    // The reply of the interrupted request would be read by the next one.
                    self.connection = None;
                    break;
                }
            };

            match &result {
                Ok(line) => debug!(
                    remote_id = %request.id,
                    operation = %request.operation,
                    reply = %line,
                    "remote reply received"
                ),
                Err(err) => error!(
                    remote_id = %request.id,
                    operation = %request.operation,
                    error = %err,
                    "remote round trip failed"
                ),
            }

            if reply.send(result).is_err() {
                warn!(remote_id = %request.id, "remote caller went away before the reply");
            }
        }

        info!(address = %self.address, "remote proxy stopped");

        Ok(())
    }
}
