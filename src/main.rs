//! Groundline HTTP server entrypoint.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use mimalloc::MiMalloc;
use tokio::net::TcpListener;
use tokio::signal;

use groundline::config::Config;
use groundline::embedding::{EmbeddingProvider, HashEmbedder, HttpEmbeddingClient};
use groundline::gateway::{HandlerState, create_router_with_state};
use groundline::generation::{EchoGenerator, GenaiGenerator, GenerationProvider};
use groundline::pipeline::Pipeline;
use groundline::retrieval::QdrantSearchBackend;
use groundline::telemetry::{JsonlLogSink, LogSink, TracingLogSink};

#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    if std::env::args().any(|arg| arg == "--health-check") {
        std::process::exit(run_health_check().await);
    }

    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let config = Config::from_env()?;
    config.validate()?;
    let addr: SocketAddr = config.socket_addr().parse()?;

    tracing::info!(
        bind_addr = %config.bind_addr,
        port = config.port,
        collection = %config.collection_name,
        embedding_dim = config.embedding_dim,
        "Groundline starting"
    );

    let embedder: Arc<dyn EmbeddingProvider> = match &config.embedding_url {
        Some(url) => Arc::new(HttpEmbeddingClient::new(
            url,
            &config.embedding_model,
            config.embedding_api_key.as_deref(),
            config.embedding_dim,
        )?),
        None => {
            tracing::warn!(
                "No GROUNDLINE_EMBEDDING_URL configured, running embedder in stub mode"
            );
            Arc::new(HashEmbedder::new(config.embedding_dim))
        }
    };

    let backend = Arc::new(QdrantSearchBackend::new(
        &config.qdrant_url,
        &config.collection_name,
        config.embedding_dim,
    )?);
    backend.ensure_collection().await?;

    let generator: Arc<dyn GenerationProvider> = if config.mock_provider {
        tracing::warn!("Mock provider enabled, answers are echoed from retrieved context");
        Arc::new(EchoGenerator)
    } else {
        Arc::new(GenaiGenerator::new(config.generation_model.clone()))
    };

    let log_sink: Arc<dyn LogSink> = match &config.query_log_path {
        Some(path) => {
            tracing::info!(path = %path.display(), "Writing query log records to file");
            Arc::new(JsonlLogSink::open(path).await?)
        }
        None => Arc::new(TracingLogSink),
    };

    let pipeline = Pipeline::new(&config, backend, embedder, generator, log_sink);
    let app = create_router_with_state(HandlerState::new(pipeline));

    let listener = TcpListener::bind(addr).await?;
    tracing::info!(addr = %addr, "Server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Groundline shutdown complete");
    Ok(())
}

async fn run_health_check() -> i32 {
    let port = std::env::var(Config::ENV_PORT)
        .ok()
        .and_then(|p| p.parse::<u16>().ok())
        .unwrap_or(8080);

    let url = format!("http://127.0.0.1:{}/healthz", port);

    let Ok(client) = reqwest::Client::builder()
        .timeout(Duration::from_secs(1))
        .build()
    else {
        return 1;
    };

    match client.get(&url).send().await {
        Ok(res) if res.status().is_success() => 0,
        _ => 1,
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C, initiating graceful shutdown");
        }
        _ = terminate => {
            tracing::info!("Received SIGTERM, initiating graceful shutdown");
        }
    }
}
