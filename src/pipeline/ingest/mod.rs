
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, info};

use crate::documents::Document;
use crate::embeddings::{Chunk, Chunker, ChunkingConfig, Embedder};
use crate::index::{IndexRecord, RecordMetadata, VectorIndexClient};
use crate::{Result, SearchError};

/// Totals reported after a successful ingestion run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct IngestionStats {
    pub documents: usize,
    pub chunks: usize,
    pub upserts: usize,
}

/// Chunks, embeds and writes documents into a vector index
pub struct IngestionPipeline {
    embedder: Arc<dyn Embedder>,
    chunker: Chunker,
    upsert_batch_size: usize,
}

impl IngestionPipeline {
    #[inline]
    pub fn new(
        embedder: Arc<dyn Embedder>,
        chunking: ChunkingConfig,
        upsert_batch_size: usize,
    ) -> Self {
        Self {
            embedder,
            chunker: Chunker::new(chunking),
            upsert_batch_size: upsert_batch_size.max(1),
        }
    }

    /// Ingest documents one after another.
    ///
    /// The first failure stops the run. Batches already written stay in the
    /// index; ids are deterministic so running again overwrites them.
    pub async fn ingest(
        &self,
        client: &dyn VectorIndexClient,
        index_name: &str,
        documents: &[Document],
    ) -> Result<IngestionStats> {
        let mut stats = IngestionStats::default();
        let mut batch: Vec<IndexRecord> = Vec::with_capacity(self.upsert_batch_size);

        for document in documents {
            let chunks = self.chunker.split(document);
            info!(
                "Ingesting {} ({} chunks)",
                document.source_path,
                chunks.len()
            );

            if chunks.is_empty() {
                stats.documents += 1;
                continue;
            }

            let texts: Vec<String> = chunks
                .iter()
                .map(|chunk| normalize_newlines(&chunk.text))
                .collect();
            let vectors = self
                .embedder
                .embed_batch(&texts)
                .await
                .map_err(|e| SearchError::ingestion(&document.source_path, 0, e))?;

            if vectors.len() != chunks.len() {
                return Err(SearchError::ingestion(
                    &document.source_path,
                    0,
                    SearchError::Embedding(format!(
                        "Expected {} embeddings, got {}",
                        chunks.len(),
                        vectors.len()
                    )),
                ));
            }

            let last = chunks.len() - 1;
            for (chunk, vector) in chunks.into_iter().zip(vectors) {
                let position = chunk.index;
                batch.push(build_record(chunk, vector));

                if batch.len() >= self.upsert_batch_size || position == last {
                    let first_chunk = position + 1 - batch.len();
                    flush(
                        client,
                        index_name,
                        &mut batch,
                        &document.source_path,
                        first_chunk,
                    )
                    .await?;
                    stats.upserts += 1;
                }
            }

            stats.documents += 1;
            stats.chunks += last + 1;
        }

        info!(
            "Ingested {} documents ({} chunks, {} upserts) into '{}'",
            stats.documents, stats.chunks, stats.upserts, index_name
        );
        Ok(stats)
    }
}

async fn flush(
    client: &dyn VectorIndexClient,
    index_name: &str,
    batch: &mut Vec<IndexRecord>,
    source_path: &str,
    first_chunk: usize,
) -> Result<()> {
    client
        .upsert(index_name, batch)
        .await
        .map_err(|e| SearchError::ingestion(source_path, first_chunk, e))?;

    debug!("Flushed {} records for {}", batch.len(), source_path);
    batch.clear();
    Ok(())
}

/// Newlines become spaces before text is sent to the embedder
#[inline]
pub fn normalize_newlines(text: &str) -> String {
    text.replace('\n', " ")
}

fn build_record(chunk: Chunk, vector: Vec<f32>) -> IndexRecord {
    IndexRecord {
        id: IndexRecord::record_id(&chunk.source_path, chunk.index),
        vector,
        metadata: RecordMetadata {
            source_path: chunk.source_path,
            location: chunk.location,
            chunk_text: chunk.text,
            extra: chunk.metadata,
        },
    }
}
