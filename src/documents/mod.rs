// Document source module
// Loads raw documents from disk; parsing per format is delegated


use anyhow::Context;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};
use std::fs;
use std::path::Path;
use tracing::{debug, info};
use walkdir::WalkDir;

use crate::{Result, SearchError};

/// Raw text produced by a loader, immutable once created
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub content: String,
    /// Where the text came from, usually a file path
    pub source_path: String,
    pub metadata: Map<String, Value>,
}

impl Document {
    #[inline]
    pub fn new(source_path: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            source_path: source_path.into(),
            metadata: Map::new(),
        }
    }

    #[inline]
    pub fn with_metadata(mut self, key: &str, value: Value) -> Self {
        self.metadata.insert(key.to_string(), value);
        self
    }
}

/// Anything able to produce documents from a directory
pub trait DocumentSource {
    fn load_all(&self, directory: &Path) -> Result<Vec<Document>>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DocumentFormat {
    Text,
    Pdf,
}

impl DocumentFormat {
    fn from_extension(extension: &str) -> Option<Self> {
        match extension.to_ascii_lowercase().as_str() {
            "txt" | "md" => Some(Self::Text),
            "pdf" => Some(Self::Pdf),
            _ => None,
        }
    }
}

/// Recursively loads `.txt`, `.md` and `.pdf` files in file-name order
#[derive(Debug, Clone, Default)]
pub struct DirectoryLoader;

impl DirectoryLoader {
    #[inline]
    pub fn new() -> Self {
        Self
    }

    fn load_file(path: &Path, format: DocumentFormat) -> anyhow::Result<String> {
        match format {
            DocumentFormat::Text => fs::read_to_string(path)
                .with_context(|| format!("Failed to read text file: {}", path.display())),
            DocumentFormat::Pdf => pdf_extract::extract_text(path).map_err(|e| {
                anyhow::anyhow!("Failed to extract PDF text: {}: {}", path.display(), e)
            }),
        }
    }
}

impl DocumentSource for DirectoryLoader {
    #[inline]
    fn load_all(&self, directory: &Path) -> Result<Vec<Document>> {
        if !directory.is_dir() {
            return Err(SearchError::DocumentLoad(format!(
                "Not a directory: {}",
                directory.display()
            )));
        }

        let mut documents = Vec::new();

        for entry in WalkDir::new(directory).sort_by_file_name() {
            let entry = entry.map_err(|e| SearchError::DocumentLoad(e.to_string()))?;
            if !entry.file_type().is_file() {
                continue;
            }

            let path = entry.path();
            let Some(extension) = path.extension().and_then(|ext| ext.to_str()) else {
                debug!("Skipping file without extension: {}", path.display());
                continue;
            };
            let Some(format) = DocumentFormat::from_extension(extension) else {
                debug!("Skipping unsupported file: {}", path.display());
                continue;
            };

            let content = Self::load_file(path, format)
                .map_err(|e| SearchError::DocumentLoad(format!("{e:#}")))?;
            let source_path = path.display().to_string();

            debug!(
                "Loaded {} ({} chars)",
                source_path,
                content.chars().count()
            );

            documents.push(
                Document::new(source_path.clone(), content)
                    .with_metadata("source", json!(source_path))
                    .with_metadata("extension", json!(extension.to_ascii_lowercase())),
            );
        }

        info!(
            "Loaded {} documents from {}",
            documents.len(),
            directory.display()
        );
        Ok(documents)
    }
}
