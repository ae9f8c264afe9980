//! In-process gateway server for end-to-end tests.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use groundline::config::Config;
use groundline::gateway::{HandlerState, create_router_with_state};
use groundline::generation::EchoGenerator;
use groundline::pipeline::Pipeline;
use groundline::retrieval::{Chunk, InMemorySearchBackend};
use groundline::telemetry::MemoryLogSink;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::oneshot;
use tokio::task::JoinHandle;

use super::fixtures::{TEST_EMBEDDING_DIM, embedder, faq_corpus};

const READY_TIMEOUT: Duration = Duration::from_secs(5);
const READY_POLL: Duration = Duration::from_millis(50);

/// What the spawned server searches over.
#[derive(Debug, Clone)]
pub struct TestServerConfig {
    pub corpus: Vec<Chunk>,
}

impl Default for TestServerConfig {
    fn default() -> Self {
        Self {
            corpus: faq_corpus(),
        }
    }
}

impl TestServerConfig {
    pub fn empty_corpus() -> Self {
        Self { corpus: Vec::new() }
    }
}

/// Running server; shuts down when dropped.
pub struct TestServer {
    pub addr: SocketAddr,
    pub log_sink: Arc<MemoryLogSink>,
    stop: Option<oneshot::Sender<()>>,
    _task: JoinHandle<()>,
}

impl TestServer {
    pub fn url(&self) -> String {
        format!("http://{}", self.addr)
    }

    pub async fn shutdown(mut self) {
        self.stop_server();
    }

    fn stop_server(&mut self) {
        if let Some(stop) = self.stop.take() {
            let _ = stop.send(());
        }
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.stop_server();
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ServerStartupError {
    #[error("server did not accept connections within {0:?}")]
    Timeout(Duration),
    #[error("bind failed: {0}")]
    Bind(#[from] std::io::Error),
}

/// Polls until `addr` accepts a TCP connection.
pub async fn wait_for_server_ready(addr: SocketAddr) -> Result<(), ServerStartupError> {
    let connect = async {
        while TcpStream::connect(addr).await.is_err() {
            tokio::time::sleep(READY_POLL).await;
        }
    };
    tokio::time::timeout(READY_TIMEOUT, connect)
        .await
        .map_err(|_| ServerStartupError::Timeout(READY_TIMEOUT))
}

/// Serves the gateway on an ephemeral port with the in-memory backend, the hash
/// embedder, the echo generator and a [`MemoryLogSink`] the test can inspect.
pub async fn spawn_test_server(config: TestServerConfig) -> Result<TestServer, ServerStartupError> {
    let listener = TcpListener::bind(SocketAddr::from(([127, 0, 0, 1], 0))).await?;
    let addr = listener.local_addr()?;

    let log_sink = Arc::new(MemoryLogSink::new());
    let pipeline = Pipeline::new(
        &Config {
            embedding_dim: TEST_EMBEDDING_DIM,
            ..Default::default()
        },
        Arc::new(InMemorySearchBackend::with_chunks(config.corpus)),
        Arc::new(embedder()),
        Arc::new(EchoGenerator),
        log_sink.clone(),
    );
    let router = create_router_with_state(HandlerState::new(pipeline));

    let (stop, stopped) = oneshot::channel::<()>();
    let task = tokio::spawn(async move {
        let _ = axum::serve(listener, router)
            .with_graceful_shutdown(async {
                let _ = stopped.await;
            })
            .await;
    });

    wait_for_server_ready(addr).await?;

    Ok(TestServer {
        addr,
        log_sink,
        stop: Some(stop),
        _task: task,
    })
}
