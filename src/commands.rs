use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, warn};

use crate::config::{Config, IndexBackend};
use crate::embeddings::Embedder;
use crate::index::VectorIndexClient;
use crate::index::lancedb::LanceIndexClient;
use crate::index::pinecone::PineconeClient;
use crate::ollama::OllamaClient;
use crate::pipeline::SearchService;
use crate::server::RouteServer;

const PINECONE_API_KEY_VAR: &str = "PINECONE_API_KEY";

/// Open the vector index client selected in the configuration
#[inline]
pub async fn build_index_client(config: &Config) -> Result<Arc<dyn VectorIndexClient>> {
    match config.index.backend {
        IndexBackend::LanceDb => {
            let client = LanceIndexClient::connect(&config.vector_database_path())
                .await
                .context("Failed to open the local vector database")?;
            Ok(Arc::new(client))
        }
        IndexBackend::Pinecone => {
            let api_key = config
                .pinecone
                .resolve_api_key(std::env::var(PINECONE_API_KEY_VAR).ok())?;
            let client = PineconeClient::new(&config.pinecone, api_key)
                .context("Failed to create Pinecone client")?;
            Ok(Arc::new(client))
        }
    }
}

/// Wire the configured index and Ollama into a search service
#[inline]
pub async fn build_service(config: &Config) -> Result<Arc<SearchService>> {
    let client = build_index_client(config).await?;
    let ollama = Arc::new(
        OllamaClient::new(&config.ollama).context("Failed to create Ollama client")?,
    );

    Ok(Arc::new(SearchService::from_config(
        config,
        client,
        Arc::clone(&ollama) as Arc<dyn Embedder>,
        ollama,
    )))
}

fn load_config(config_dir: &Path) -> Result<Config> {
    Config::load(config_dir).context("Failed to load configuration")
}

/// Ensure the index exists and ingest the documents directory
#[inline]
pub async fn run_setup(config_dir: &Path, documents: Option<PathBuf>) -> Result<()> {
    let config = load_config(config_dir)?;
    let service = build_service(&config).await?;
    let directory = documents.unwrap_or_else(|| service.documents_dir().to_path_buf());

    info!(
        "Setting up index '{}' from {}",
        service.index_name(),
        directory.display()
    );

    let summary = service
        .setup_from(&directory)
        .await
        .context("Setup failed")?;

    if summary.created {
        println!("Created index '{}'", summary.index);
    } else {
        println!("Using existing index '{}'", summary.index);
    }
    println!("  Documents ingested: {}", summary.documents);
    println!("  Chunks written: {}", summary.chunks);
    println!("  Upsert requests: {}", summary.upserts);

    Ok(())
}

/// Answer one question and print the result
#[inline]
pub async fn ask(config_dir: &Path, question: &str) -> Result<()> {
    let config = load_config(config_dir)?;
    let service = build_service(&config).await?;

    match service.ask(question).await.context("Query failed")? {
        Some(answer) => println!("{answer}"),
        None => println!("No relevant documents found."),
    }

    Ok(())
}

/// Serve the setup and read routes over stdio
#[inline]
pub async fn serve(config_dir: &Path) -> Result<()> {
    let config = load_config(config_dir)?;

    match OllamaClient::new(&config.ollama).and_then(|client| client.health_check()) {
        Ok(()) => info!("Ollama is ready at {}", config.ollama.host),
        Err(e) => warn!("Ollama may not be ready, requests may fail: {:#}", e),
    }

    let service = build_service(&config).await?;
    RouteServer::for_service(&service).serve_stdio().await
}
