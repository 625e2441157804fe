// Vector index module
// Records, queries and the client capability shared by every backend

pub mod lancedb;
pub mod manager;
pub mod pinecone;


use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};
use std::collections::HashSet;
use std::fmt;

use crate::embeddings::ChunkLocation;
use crate::{Result, SearchError};

pub use manager::{EnsureOutcome, IndexManager};

/// Similarity metric an index is created with
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Metric {
    #[default]
    Cosine,
    Euclidean,
    DotProduct,
}

impl Metric {
    #[inline]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Cosine => "cosine",
            Self::Euclidean => "euclidean",
            Self::DotProduct => "dotproduct",
        }
    }

    #[inline]
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "cosine" => Some(Self::Cosine),
            "euclidean" => Some(Self::Euclidean),
            "dotproduct" => Some(Self::DotProduct),
            _ => None,
        }
    }
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

const SOURCE_PATH_KEY: &str = "source_path";
const CHUNK_TEXT_KEY: &str = "chunk_text";
const LOCATION_KEY: &str = "loc";

/// Metadata stored next to every vector
#[derive(Debug, Clone, PartialEq)]
pub struct RecordMetadata {
    pub source_path: String,
    pub location: ChunkLocation,
    /// The exact chunk text, used to rebuild the answer context
    pub chunk_text: String,
    /// Metadata inherited from the source document
    pub extra: Map<String, Value>,
}

impl RecordMetadata {
    /// Flatten into string-valued fields, nesting encoded as JSON text
    #[inline]
    pub fn to_flat_map(&self) -> Map<String, Value> {
        let mut map = Map::new();
        for (key, value) in &self.extra {
            let flat = match value {
                Value::Object(_) | Value::Array(_) => Value::String(value.to_string()),
                other => other.clone(),
            };
            map.insert(key.clone(), flat);
        }

        map.insert(SOURCE_PATH_KEY.to_string(), json!(self.source_path));
        map.insert(CHUNK_TEXT_KEY.to_string(), json!(self.chunk_text));
        map.insert(
            LOCATION_KEY.to_string(),
            Value::String(json!(self.location).to_string()),
        );
        map
    }

    /// Rebuild from a flat map produced by [`RecordMetadata::to_flat_map`]
    #[inline]
    pub fn from_flat_map(mut map: Map<String, Value>) -> Result<Self> {
        let source_path = take_string(&mut map, SOURCE_PATH_KEY)?;
        let chunk_text = take_string(&mut map, CHUNK_TEXT_KEY)?;
        let location_json = take_string(&mut map, LOCATION_KEY)?;
        let location = serde_json::from_str(&location_json).map_err(|e| {
            SearchError::IndexService(format!("Invalid chunk location metadata: {e}"))
        })?;

        Ok(Self {
            source_path,
            location,
            chunk_text,
            extra: map,
        })
    }
}

fn take_string(map: &mut Map<String, Value>, key: &str) -> Result<String> {
    match map.remove(key) {
        Some(Value::String(value)) => Ok(value),
        _ => Err(SearchError::IndexService(format!(
            "Missing metadata field '{key}'"
        ))),
    }
}

/// One unit written to an index
#[derive(Debug, Clone, PartialEq)]
pub struct IndexRecord {
    /// `<source_path>_<chunk_index>`
    pub id: String,
    pub vector: Vec<f32>,
    pub metadata: RecordMetadata,
}

impl IndexRecord {
    #[inline]
    pub fn record_id(source_path: &str, chunk_index: usize) -> String {
        format!("{source_path}_{chunk_index}")
    }
}

/// Nearest-neighbour request
#[derive(Debug, Clone, Copy)]
pub struct QueryRequest<'a> {
    pub vector: &'a [f32],
    pub top_k: usize,
    pub include_metadata: bool,
    pub include_values: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct QueryMatch {
    pub id: String,
    /// Higher is more similar
    pub score: f32,
    pub values: Option<Vec<f32>>,
    pub metadata: Option<RecordMetadata>,
}

/// Matches ordered from most to least similar
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueryResult {
    pub matches: Vec<QueryMatch>,
}

impl QueryResult {
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.matches.is_empty()
    }
}

/// Operations a vector index service must offer
#[async_trait]
pub trait VectorIndexClient: Send + Sync {
    async fn list_index_names(&self) -> Result<HashSet<String>>;

    async fn create_index(&self, name: &str, dimension: u32, metric: Metric) -> Result<()>;

    /// Insert or overwrite records by id
    async fn upsert(&self, index_name: &str, records: &[IndexRecord]) -> Result<()>;

    async fn query(&self, index_name: &str, request: QueryRequest<'_>) -> Result<QueryResult>;
}
