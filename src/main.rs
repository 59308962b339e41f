use std::sync::Arc;

use anyhow::Result;
use tracing_subscriber::EnvFilter;

use docchat::chat::ChatService;
use docchat::documents::MemoryDocumentStore;
use docchat::gateway::InferenceGateway;
use docchat::ingest::pdf::PdfExtractor;
use docchat::ingest::Ingestor;
use docchat::ollama::OllamaClient;
use docchat::sessions::MemorySessionStore;
use docchat::{run_server, AppConfig};

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();

    let config = AppConfig::from_env();
    tracing::info!(
        model = %config.inference.model,
        workers = config.inference.workers,
        timeout = ?config.inference.timeout,
        "using ollama at {}",
        config.ollama_base_url
    );

    let sessions = Arc::new(MemorySessionStore::new());
    let documents = Arc::new(MemoryDocumentStore::new());

    let ollama = OllamaClient::new(
        config.ollama_base_url.clone(),
        config.inference.model.clone(),
    );
    let gateway = InferenceGateway::new(
        Arc::new(ollama),
        config.inference.workers,
        config.inference.timeout,
    );

    let chat = ChatService::new(sessions, documents.clone(), gateway);
    let ingestor = Ingestor::new(Arc::new(PdfExtractor), documents);

    run_server(config, chat, ingestor).await
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}
