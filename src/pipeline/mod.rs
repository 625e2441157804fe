// Pipelines module
// Ingestion and query flows, plus the service that wires them to an index

pub mod ingest;
pub mod query;

#[cfg(test)]
mod tests;

use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::info;

use crate::Result;
use crate::config::Config;
use crate::documents::{DirectoryLoader, DocumentSource};
use crate::embeddings::Embedder;
use crate::index::{EnsureOutcome, IndexManager, Metric, VectorIndexClient};

pub use ingest::{IngestionPipeline, IngestionStats};
pub use query::{AnswerGenerator, QueryPipeline, build_context};

/// Result of a setup run, reported back to callers
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SetupSummary {
    pub index: String,
    pub created: bool,
    pub documents: usize,
    pub chunks: usize,
    pub upserts: usize,
}

/// Everything needed to set up and query one named index
pub struct SearchService {
    client: Arc<dyn VectorIndexClient>,
    manager: IndexManager,
    index_name: String,
    dimension: u32,
    metric: Metric,
    documents_dir: PathBuf,
    source: Box<dyn DocumentSource + Send + Sync>,
    ingestion: IngestionPipeline,
    query: QueryPipeline,
}

impl SearchService {
    #[inline]
    pub fn from_config(
        config: &Config,
        client: Arc<dyn VectorIndexClient>,
        embedder: Arc<dyn Embedder>,
        generator: Arc<dyn AnswerGenerator>,
    ) -> Self {
        let ingestion = IngestionPipeline::new(
            Arc::clone(&embedder),
            config.chunking.clone(),
            config.ingest.upsert_batch_size,
        );
        let query = QueryPipeline::new(embedder, generator, config.query.top_k)
            .with_context_warning(config.query.context_warning_chars);

        Self {
            client,
            manager: IndexManager::new(config.index.ready_delay()),
            index_name: config.index.name.clone(),
            dimension: config.index.dimension,
            metric: config.index.metric,
            documents_dir: config.ingest.documents_dir.clone(),
            source: Box::new(DirectoryLoader::new()),
            ingestion,
            query,
        }
    }

    #[inline]
    pub fn with_source(mut self, source: Box<dyn DocumentSource + Send + Sync>) -> Self {
        self.source = source;
        self
    }

    #[inline]
    pub fn documents_dir(&self) -> &Path {
        &self.documents_dir
    }

    #[inline]
    pub fn index_name(&self) -> &str {
        &self.index_name
    }

    /// Ensure the index, then ingest the configured documents directory
    #[inline]
    pub async fn setup(&self) -> Result<SetupSummary> {
        self.setup_from(&self.documents_dir).await
    }

    /// Ensure the index, then ingest every document under `directory`
    pub async fn setup_from(&self, directory: &Path) -> Result<SetupSummary> {
        let outcome = self
            .manager
            .ensure_index(
                self.client.as_ref(),
                &self.index_name,
                self.dimension,
                self.metric,
            )
            .await?;

        let documents = self.source.load_all(directory)?;
        let stats = self
            .ingestion
            .ingest(self.client.as_ref(), &self.index_name, &documents)
            .await?;

        info!("Setup of '{}' finished", self.index_name);
        Ok(SetupSummary {
            index: self.index_name.clone(),
            created: outcome == EnsureOutcome::Created,
            documents: stats.documents,
            chunks: stats.chunks,
            upserts: stats.upserts,
        })
    }

    /// Answer a question from the index, `None` when nothing matches
    #[inline]
    pub async fn ask(&self, question: &str) -> Result<Option<String>> {
        self.query
            .answer(self.client.as_ref(), &self.index_name, question)
            .await
    }
}
