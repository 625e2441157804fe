// In-memory stand-ins for the external services, shared by unit tests

use async_trait::async_trait;
use std::collections::HashSet;
use std::sync::Mutex;

use crate::embeddings::Embedder;
use crate::index::{IndexRecord, Metric, QueryMatch, QueryRequest, QueryResult, VectorIndexClient};
use crate::pipeline::query::AnswerGenerator;
use crate::{Result, SearchError};

/// Deterministic embedder: `[chars, words, 1.0]` per text
#[derive(Debug, Default)]
pub struct FakeEmbedder {
    pub seen: Mutex<Vec<String>>,
    /// Any text containing this marker fails to embed
    pub fail_on: Option<String>,
}

impl FakeEmbedder {
    pub fn failing_on(marker: &str) -> Self {
        Self {
            fail_on: Some(marker.to_string()),
            ..Self::default()
        }
    }

    pub fn vector_for(text: &str) -> Vec<f32> {
        vec![
            text.chars().count() as f32,
            text.split_whitespace().count() as f32,
            1.0,
        ]
    }

    pub fn seen(&self) -> Vec<String> {
        self.seen.lock().expect("lock").clone()
    }
}

#[async_trait]
impl Embedder for FakeEmbedder {
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        if let Some(marker) = &self.fail_on {
            if texts.iter().any(|t| t.contains(marker.as_str())) {
                return Err(SearchError::Embedding("embedding service down".to_string()));
            }
        }
        self.seen.lock().expect("lock").extend(texts.iter().cloned());
        Ok(texts.iter().map(|t| Self::vector_for(t)).collect())
    }
}

/// Records every call; answers queries from a canned result
#[derive(Debug, Default)]
pub struct FakeIndexClient {
    pub existing: Mutex<HashSet<String>>,
    pub created: Mutex<Vec<(String, u32, Metric)>>,
    pub upserts: Mutex<Vec<Vec<IndexRecord>>>,
    pub queries: Mutex<Vec<(String, Vec<f32>, usize, bool, bool)>>,
    pub list_calls: Mutex<usize>,
    pub matches: Vec<QueryMatch>,
    /// Upsert call (1-based) that fails
    pub fail_upsert_at: Option<usize>,
}

impl FakeIndexClient {
    pub fn with_index(name: &str) -> Self {
        let client = Self::default();
        client.existing.lock().expect("lock").insert(name.to_string());
        client
    }

    pub fn with_matches(matches: Vec<QueryMatch>) -> Self {
        Self {
            matches,
            ..Self::default()
        }
    }

    pub fn created(&self) -> Vec<(String, u32, Metric)> {
        self.created.lock().expect("lock").clone()
    }

    pub fn upserts(&self) -> Vec<Vec<IndexRecord>> {
        self.upserts.lock().expect("lock").clone()
    }

    pub fn upsert_sizes(&self) -> Vec<usize> {
        self.upserts().iter().map(Vec::len).collect()
    }

    pub fn list_calls(&self) -> usize {
        *self.list_calls.lock().expect("lock")
    }

    pub fn query_count(&self) -> usize {
        self.queries.lock().expect("lock").len()
    }
}

#[async_trait]
impl VectorIndexClient for FakeIndexClient {
    async fn list_index_names(&self) -> Result<HashSet<String>> {
        *self.list_calls.lock().expect("lock") += 1;
        Ok(self.existing.lock().expect("lock").clone())
    }

    async fn create_index(&self, name: &str, dimension: u32, metric: Metric) -> Result<()> {
        self.created
            .lock()
            .expect("lock")
            .push((name.to_string(), dimension, metric));
        self.existing.lock().expect("lock").insert(name.to_string());
        Ok(())
    }

    async fn upsert(&self, _index_name: &str, records: &[IndexRecord]) -> Result<()> {
        let mut upserts = self.upserts.lock().expect("lock");
        if self.fail_upsert_at == Some(upserts.len() + 1) {
            return Err(SearchError::IndexService("write rejected".to_string()));
        }
        upserts.push(records.to_vec());
        Ok(())
    }

    async fn query(&self, index_name: &str, request: QueryRequest<'_>) -> Result<QueryResult> {
        self.queries.lock().expect("lock").push((
            index_name.to_string(),
            request.vector.to_vec(),
            request.top_k,
            request.include_metadata,
            request.include_values,
        ));
        Ok(QueryResult {
            matches: self.matches.iter().take(request.top_k).cloned().collect(),
        })
    }
}

/// Echoes the context back so tests can see what reached the generator
#[derive(Debug, Default)]
pub struct FakeGenerator {
    pub calls: Mutex<Vec<(String, String)>>,
}

impl FakeGenerator {
    pub fn calls(&self) -> Vec<(String, String)> {
        self.calls.lock().expect("lock").clone()
    }
}

#[async_trait]
impl AnswerGenerator for FakeGenerator {
    async fn generate(&self, question: &str, context: &str) -> Result<String> {
        self.calls
            .lock()
            .expect("lock")
            .push((question.to_string(), context.to_string()));
        Ok(format!("answer from: {context}"))
    }
}
