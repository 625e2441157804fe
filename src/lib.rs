use thiserror::Error;

pub type Result<T> = std::result::Result<T, SearchError>;

#[derive(Error, Debug)]
pub enum SearchError {
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Embedding error: {0}")]
    Embedding(String),

    #[error("Index service error: {0}")]
    IndexService(String),

    #[error("Generation error: {0}")]
    Generation(String),

    #[error("Ingestion failed for {source_path} at chunk {chunk_index}: {source}")]
    Ingestion {
        source_path: String,
        chunk_index: usize,
        #[source]
        source: Box<SearchError>,
    },

    #[error("Document loading error: {0}")]
    DocumentLoad(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Other error: {0}")]
    Other(#[from] anyhow::Error),
}

impl SearchError {
    /// Status code reported at the route boundary
    #[inline]
    pub fn status_code(&self) -> u16 {
        match self {
            Self::BadRequest(_) => 400,
            _ => 500,
        }
    }

    /// Wrap a failure that interrupted ingestion of a document
    #[inline]
    pub fn ingestion(source_path: &str, chunk_index: usize, source: Self) -> Self {
        Self::Ingestion {
            source_path: source_path.to_string(),
            chunk_index,
            source: Box::new(source),
        }
    }
}

impl From<config::ConfigError> for SearchError {
    #[inline]
    fn from(error: config::ConfigError) -> Self {
        Self::Configuration(error.to_string())
    }
}

pub mod commands;
pub mod config;
pub mod documents;
pub mod embeddings;
pub mod index;
pub mod ollama;
pub mod pipeline;
pub mod server;

#[cfg(test)]
pub(crate) mod testing;
