
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::debug;

use crate::documents::Document;

/// Position of a chunk inside its source document
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkLocation {
    /// Char offset of the first char
    pub start: usize,
    /// Char offset one past the last char
    pub end: usize,
    /// 1-based line of the first char
    pub line_from: usize,
    /// 1-based line of the last char
    pub line_to: usize,
}

/// A bounded slice of one document, the unit of embedding
#[derive(Debug, Clone, PartialEq)]
pub struct Chunk {
    pub text: String,
    /// Ordinal within the source document, starting at 0
    pub index: usize,
    pub source_path: String,
    pub location: ChunkLocation,
    /// Metadata inherited from the document
    pub metadata: Map<String, Value>,
}

/// Configuration for document chunking, measured in chars
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChunkingConfig {
    /// Maximum chunk size
    pub chunk_size: usize,
    /// Chars repeated at the start of the next chunk
    pub chunk_overlap: usize,
}

impl Default for ChunkingConfig {
    #[inline]
    fn default() -> Self {
        Self {
            chunk_size: 1000,
            chunk_overlap: 200,
        }
    }
}

/// Splits documents on natural boundaries, falling back to hard cuts
#[derive(Debug, Clone, Default)]
pub struct Chunker {
    config: ChunkingConfig,
}

impl Chunker {
    #[inline]
    pub fn new(config: ChunkingConfig) -> Self {
        Self { config }
    }

    #[inline]
    pub fn config(&self) -> &ChunkingConfig {
        &self.config
    }

    /// Split a document into ordered chunks
    #[inline]
    pub fn split(&self, document: &Document) -> Vec<Chunk> {
        let chars: Vec<char> = document.content.chars().collect();
        let spans = split_spans(&chars, &self.config);
        let newlines: Vec<usize> = chars
            .iter()
            .enumerate()
            .filter(|(_, c)| **c == '\n')
            .map(|(i, _)| i)
            .collect();

        let chunks: Vec<Chunk> = spans
            .into_iter()
            .enumerate()
            .map(|(index, (start, end))| Chunk {
                text: chars[start..end].iter().collect(),
                index,
                source_path: document.source_path.clone(),
                location: ChunkLocation {
                    start,
                    end,
                    line_from: line_of(&newlines, start),
                    line_to: line_of(&newlines, end - 1),
                },
                metadata: document.metadata.clone(),
            })
            .collect();

        debug!(
            "Split '{}' into {} chunks (chunk size {}, overlap {})",
            document.source_path,
            chunks.len(),
            self.config.chunk_size,
            self.config.chunk_overlap
        );

        chunks
    }
}

/// Char ranges of every chunk, trimmed of surrounding whitespace
fn split_spans(chars: &[char], config: &ChunkingConfig) -> Vec<(usize, usize)> {
    let total = chars.len();
    let size = config.chunk_size.max(1);
    let mut spans = Vec::new();
    let mut start = skip_whitespace(chars, 0);
    let mut covered = 0;

    while start < total {
        let limit = start + size;
        let end = if limit >= total {
            total
        } else {
            find_break(chars, start, limit, covered)
        };
        covered = end;

        let (trimmed_start, trimmed_end) = trim(chars, start, end);
        let previous_end = spans.last().map_or(0, |(_, e)| *e);
        if trimmed_start < trimmed_end && trimmed_end > previous_end {
            spans.push((trimmed_start, trimmed_end));
        }

        if end >= total {
            break;
        }

        let next = overlap_start(chars, start, end, config.chunk_overlap);
        start = skip_whitespace(chars, next);
    }

    spans
}

/// Best cut in `(start, limit]`: blank line, line break, sentence end, word gap, hard cut.
///
/// The cut always lands past `covered` so an overlapping window never
/// reproduces a slice of the previous chunk.
fn find_break(chars: &[char], start: usize, limit: usize, covered: usize) -> usize {
    let Some(fresh) = (start.max(covered)..limit).find(|&i| !chars[i].is_whitespace()) else {
        return limit;
    };
    let lower = fresh + 1;
    let candidates = || (lower..=limit).rev();

    let paragraph =
        candidates().find(|&i| chars[i] == '\n' && chars.get(i + 1).is_some_and(|c| *c == '\n'));
    let line = || candidates().find(|&i| chars[i] == '\n');
    let sentence = || {
        candidates()
            .find(|&i| chars[i].is_whitespace() && matches!(chars[i - 1], '.' | '!' | '?'))
    };
    let word = || candidates().find(|&i| chars[i].is_whitespace());

    paragraph
        .or_else(line)
        .or_else(sentence)
        .or_else(word)
        .unwrap_or(limit)
}

/// Where the next window begins so that it repeats up to `overlap` chars
fn overlap_start(chars: &[char], start: usize, end: usize, overlap: usize) -> usize {
    if overlap == 0 {
        return end;
    }

    let candidate = end.saturating_sub(overlap).max(start + 1);
    if candidate >= end || chars[candidate - 1].is_whitespace() {
        return candidate.min(end);
    }

    // Snap forward so the overlap never starts mid-word
    (candidate..end)
        .find(|&i| chars[i].is_whitespace())
        .unwrap_or(candidate)
}

fn skip_whitespace(chars: &[char], from: usize) -> usize {
    (from..chars.len())
        .find(|&i| !chars[i].is_whitespace())
        .unwrap_or(chars.len())
}

fn trim(chars: &[char], start: usize, end: usize) -> (usize, usize) {
    let trimmed_start = (start..end)
        .find(|&i| !chars[i].is_whitespace())
        .unwrap_or(end);
    let trimmed_end = (trimmed_start..end)
        .rev()
        .find(|&i| !chars[i].is_whitespace())
        .map_or(trimmed_start, |i| i + 1);
    (trimmed_start, trimmed_end)
}

fn line_of(newlines: &[usize], position: usize) -> usize {
    newlines.partition_point(|&n| n < position) + 1
}
