//! Domain types shared by the loader, chunker, vector store and QA engine.

use serde::{Deserialize, Serialize};
use std::ops::Range;
use std::path::{Path, PathBuf};

pub type ChunkId = String;

/// A loaded source document.
///
/// - `id`: the source file name, stable across runs
/// - `source_path`: where the text was read from
/// - `raw_text`: whitespace-normalized text of the document
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Document {
    pub id: String,
    pub source_path: PathBuf,
    pub raw_text: String,
}

impl Document {
    pub fn new(source_path: impl Into<PathBuf>, raw_text: String) -> Self {
        let source_path = source_path.into();
        let id = document_id_for(&source_path);
        Self { id, source_path, raw_text }
    }
}

/// Identity of the document read from `path`: its file name.
pub fn document_id_for(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

/// A bounded, contiguous segment of a document's text.
///
/// `char_range` is a half-open range of character offsets into the
/// document's normalized text, and `text` is exactly that slice.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chunk {
    pub document_id: String,
    pub sequence_index: usize,
    pub text: String,
    pub char_range: Range<usize>,
}

impl Chunk {
    /// Globally unique id, `"{document_id}:{sequence_index}"`.
    pub fn id(&self) -> ChunkId {
        format!("{}:{}", self.document_id, self.sequence_index)
    }

    pub fn char_len(&self) -> usize {
        self.char_range.len()
    }
}

/// One ranked hit. `score` is cosine similarity; higher is better.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredChunk {
    pub chunk: Chunk,
    pub score: f32,
}

/// Hits in non-increasing score order, at most `k` long.
pub type RetrievalResult = Vec<ScoredChunk>;
