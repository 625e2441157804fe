
use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::Result;
use crate::embeddings::Embedder;
use crate::index::{QueryMatch, QueryRequest, VectorIndexClient};

/// Produces answer text from a question and retrieved context
#[async_trait]
pub trait AnswerGenerator: Send + Sync {
    async fn generate(&self, question: &str, context: &str) -> Result<String>;
}

/// Retrieves context for a question and hands it to the generator
pub struct QueryPipeline {
    embedder: Arc<dyn Embedder>,
    generator: Arc<dyn AnswerGenerator>,
    top_k: usize,
    context_warning_chars: usize,
}

impl QueryPipeline {
    #[inline]
    pub fn new(
        embedder: Arc<dyn Embedder>,
        generator: Arc<dyn AnswerGenerator>,
        top_k: usize,
    ) -> Self {
        Self {
            embedder,
            generator,
            top_k,
            context_warning_chars: usize::MAX,
        }
    }

    /// Log a warning when the assembled context is longer than `chars`
    #[inline]
    pub fn with_context_warning(mut self, chars: usize) -> Self {
        self.context_warning_chars = chars;
        self
    }

    /// Answer `question`, or `None` when the index has nothing similar
    pub async fn answer(
        &self,
        client: &dyn VectorIndexClient,
        index_name: &str,
        question: &str,
    ) -> Result<Option<String>> {
        let vector = self.embedder.embed_one(question).await?;

        let result = client
            .query(
                index_name,
                QueryRequest {
                    vector: &vector,
                    top_k: self.top_k,
                    include_metadata: true,
                    include_values: true,
                },
            )
            .await?;

        info!(
            "Query matched {} records in '{}'",
            result.matches.len(),
            index_name
        );
        if result.is_empty() {
            return Ok(None);
        }

        let context = build_context(&result.matches);
        let context_chars = context.chars().count();
        if context_chars > self.context_warning_chars {
            warn!(
                "Context is {} chars, above the {} char threshold; the model may truncate it",
                context_chars, self.context_warning_chars
            );
        }

        debug!("Generating answer from {} chars of context", context_chars);
        let answer = self.generator.generate(question, &context).await?;
        Ok(Some(answer))
    }
}

/// Chunk texts in match order, joined by single spaces
#[inline]
pub fn build_context(matches: &[QueryMatch]) -> String {
    matches
        .iter()
        .filter_map(|m| m.metadata.as_ref())
        .map(|metadata| metadata.chunk_text.as_str())
        .collect::<Vec<_>>()
        .join(" ")
}
