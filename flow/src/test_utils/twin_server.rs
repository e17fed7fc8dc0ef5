use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, TcpStream};
use tokio::task::JoinHandle;

use crate::concurrency::shutdown::{ShutdownTx, create_shutdown_channel};
use crate::item::{Item, LocalItem};
use crate::remote::{RemoteOperation, Request};
use crate::source::{Source, SourceReader};
use crate::test_utils::source::sample_source;
use crate::workers::base::Worker;

/// Reply to every call whose result is not used by the caller.
pub const ACK: &str = "OK";

/// Remote service hosting one local item per id, materialized from the sample source.
pub struct TwinServer {
    address: SocketAddr,
    created: Arc<AtomicUsize>,
    shutdown_tx: ShutdownTx,
    handle: JoinHandle<()>,
}

impl TwinServer {
    pub fn address(&self) -> SocketAddr {
        self.address
    }

    /// Number of twins created so far.
    pub fn created(&self) -> usize {
        self.created.load(Ordering::SeqCst)
    }
}

impl Drop for TwinServer {
    fn drop(&mut self) {
        self.shutdown_tx.shutdown();
        self.handle.abort();
    }
}

/// Spawns a twin server on a random local port.
///
/// Twin `id` is materialized from sample row `id % 9` and rolls at most `max_pending_transforms`
/// transforms.
pub async fn spawn_twin_server(max_pending_transforms: usize) -> TwinServer {
    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("failed to bind twin server");
    let address = listener
        .local_addr()
        .expect("failed to read twin server address");

    let (shutdown_tx, shutdown_rx) = create_shutdown_channel();
    let source = sample_source();
    let rows = source.size();
    let (reader, reader_worker) = SourceReader::new(source, shutdown_rx);
    tokio::spawn(reader_worker.run());

    let created = Arc::new(AtomicUsize::new(0));
    let handle = {
        let created = created.clone();
        tokio::spawn(async move {
            while let Ok((stream, _)) = listener.accept().await {
                let twins = Twins {
                    items: HashMap::new(),
                    reader: reader.clone(),
                    rows,
                    max_pending_transforms,
                    created: created.clone(),
                };
                tokio::spawn(serve(stream, twins));
            }
        })
    };

    TwinServer {
        address,
        created,
        shutdown_tx,
        handle,
    }
}

struct Twins {
    items: HashMap<u64, LocalItem>,
    reader: SourceReader,
    rows: usize,
    max_pending_transforms: usize,
    created: Arc<AtomicUsize>,
}

impl Twins {
    async fn handle(&mut self, line: &str) -> String {
        let request = match Request::parse(line) {
            Ok(request) => request,
            Err(err) => return format!("ERR {err}"),
        };

        let id = request.id.0;
        if request.operation == RemoteOperation::Create {
            let row = (id % self.rows as u64) as usize;
            self.items.insert(
                id,
                LocalItem::new(row, self.reader.clone(), self.max_pending_transforms),
            );
            self.created.fetch_add(1, Ordering::SeqCst);

            return ACK.to_owned();
        }

        let Some(item) = self.items.get_mut(&id) else {
            return format!("ERR unknown twin {id}");
        };

        let result = match request.operation {
            RemoteOperation::Initialize => item.initialize().await.map(|_| ACK.to_owned()),
            RemoteOperation::Advance => item.advance().await.map(|_| ACK.to_owned()),
            RemoteOperation::Render => item.render().await,
            RemoteOperation::Status => item.status().await.map(|status| status.code().to_owned()),
            RemoteOperation::Create => unreachable!("create is handled above"),
        };

        result.unwrap_or_else(|err| format!("ERR {:?}", err.kind()))
    }
}

async fn serve(stream: TcpStream, mut twins: Twins) {
    let (read_half, mut write_half) = stream.into_split();
    let mut lines = BufReader::new(read_half).lines();

    while let Ok(Some(line)) = lines.next_line().await {
        let reply = twins.handle(&line).await;
        if write_half
            .write_all(format!("{reply}\n").as_bytes())
            .await
            .is_err()
        {
            break;
        }
    }
}
