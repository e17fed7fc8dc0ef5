use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

/// Remote service answering every request line with a scripted reply.
pub struct StubServer {
    address: SocketAddr,
    requests: Arc<Mutex<Vec<String>>>,
    handle: JoinHandle<()>,
}

impl StubServer {
    pub fn address(&self) -> SocketAddr {
        self.address
    }

    /// Request lines received so far, without terminators.
    pub fn requests(&self) -> Vec<String> {
        self.requests.lock().expect("stub server lock poisoned").clone()
    }
}

impl Drop for StubServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

/// Spawns a server replying with `respond(request)` to each request line.
///
/// When `respond` returns [`None`] the connection is closed without a reply.
pub async fn spawn_stub_server<F>(respond: F) -> StubServer
where
    F: Fn(&str) -> Option<String> + Send + Sync + 'static,
{
    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("failed to bind stub server");
    let address = listener
        .local_addr()
        .expect("failed to read stub server address");
    let requests = Arc::new(Mutex::new(Vec::new()));
    let respond = Arc::new(respond);

    let handle = {
        let requests = requests.clone();
        tokio::spawn(async move {
            while let Ok((stream, _)) = listener.accept().await {
                let requests = requests.clone();
                let respond = respond.clone();

                tokio::spawn(async move {
                    let (read_half, mut write_half) = stream.into_split();
                    let mut lines = BufReader::new(read_half).lines();

                    while let Ok(Some(line)) = lines.next_line().await {
                        requests
                            .lock()
                            .expect("stub server lock poisoned")
                            .push(line.clone());

                        let Some(reply) = respond(&line) else {
                            break;
                        };
                        if write_half
                            .write_all(format!("{reply}\n").as_bytes())
                            .await
                            .is_err()
                        {
                            break;
                        }
                    }
                });
            }
        })
    };

    StubServer {
        address,
        requests,
        handle,
    }
}
