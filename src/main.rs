use anyhow::Context;
use ragpipe::api::{self, AppState};
use ragpipe::llm::LlmClient;
use ragpipe::processing::PipelineService;
use ragpipe::{config, logging};
use std::net::Ipv4Addr;
use std::sync::Arc;
use tokio::net::TcpListener;

const DEFAULT_PORT: u16 = 8000;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Arc::new(config::load().context("Failed to load configuration")?);
    logging::init_tracing();

    let service = PipelineService::connect(config.clone())
        .await
        .context("Failed to connect to MongoDB")?;
    let generation: Arc<dyn LlmClient> = Arc::from(
        ragpipe::llm::build_generation_client(&config)
            .context("Failed to build the generation backend")?,
    );
    let embedding: Arc<dyn LlmClient> = Arc::from(
        ragpipe::llm::build_embedding_client(&config)
            .context("Failed to build the embedding backend")?,
    );

    let app = api::create_router(AppState::new(
        config.clone(),
        Arc::new(service),
        generation,
        embedding,
    ));

    let port = config.server_port.unwrap_or(DEFAULT_PORT);
    let listener = TcpListener::bind((Ipv4Addr::UNSPECIFIED, port))
        .await
        .with_context(|| format!("Failed to bind port {port}"))?;
    tracing::info!("Listening on http://0.0.0.0:{port}");
    axum::serve(listener, app).await.context("Server exited")?;
    Ok(())
}
