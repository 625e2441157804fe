// Embeddings module
// Chunking plus the capability that turns text into vectors

pub mod chunking;

use async_trait::async_trait;

use crate::Result;

pub use chunking::{Chunk, ChunkLocation, Chunker, ChunkingConfig};

/// Turns text into fixed-dimension vectors
///
/// Implementations must return vectors whose length matches the index
/// dimension; nothing downstream checks it before the write.
#[async_trait]
pub trait Embedder: Send + Sync {
    /// Embed many texts, preserving input order
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>>;

    /// Embed a single text
    async fn embed_one(&self, text: &str) -> Result<Vec<f32>> {
        let mut vectors = self.embed_batch(&[text.to_string()]).await?;
        vectors
            .pop()
            .ok_or_else(|| crate::SearchError::Embedding("No embedding returned".to_string()))
    }
}
