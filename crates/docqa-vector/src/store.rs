//! In-memory exact nearest-neighbour index over chunk embeddings.
//!
//! Entries keep insertion order; queries score every entry by cosine
//! similarity and sort stably, so equal scores come back in insertion order.
//! Persistence lives in `persist.rs`.

use std::collections::HashMap;

use tracing::debug;

use docqa_core::types::{Chunk, ChunkId, RetrievalResult, ScoredChunk};

use crate::error::{Result, StoreError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreState {
    /// Fresh store, nothing inserted or loaded yet.
    NotCreated,
    /// Entries are being added; queries are refused.
    Building,
    /// Loaded, persisted or explicitly finished; queries are served.
    Ready,
}

#[derive(Debug, Clone, PartialEq)]
pub struct IndexEntry {
    pub chunk: Chunk,
    pub vector: Vec<f32>,
}

#[derive(Debug, Clone)]
pub struct VectorStore {
    entries: Vec<IndexEntry>,
    positions: HashMap<ChunkId, usize>,
    dimension: Option<usize>,
    embedder_id: Option<String>,
    state: StoreState,
}

impl Default for VectorStore {
    fn default() -> Self { Self::new() }
}

impl VectorStore {
    pub fn new() -> Self {
        Self { entries: Vec::new(), positions: HashMap::new(), dimension: None, embedder_id: None, state: StoreState::NotCreated }
    }

    pub(crate) fn from_loaded(entries: Vec<IndexEntry>, dimension: Option<usize>, embedder_id: Option<String>) -> Self {
        let mut store = Self { entries, positions: HashMap::new(), dimension, embedder_id, state: StoreState::Ready };
        store.reindex();
        store
    }

    pub fn state(&self) -> StoreState { self.state }

    pub fn is_ready(&self) -> bool { self.state == StoreState::Ready }

    /// Ready and holding at least one entry; an empty index still needs a build.
    pub fn is_built(&self) -> bool { self.is_ready() && !self.entries.is_empty() }

    pub fn len(&self) -> usize { self.entries.len() }

    pub fn is_empty(&self) -> bool { self.entries.is_empty() }

    /// Dimensionality fixed by the first insertion, if any.
    pub fn dimension(&self) -> Option<usize> { self.dimension }

    pub fn embedder_id(&self) -> Option<&str> { self.embedder_id.as_deref() }

    /// Record which embedder produced the vectors; persisted with the index.
    pub fn set_embedder_id(&mut self, embedder_id: impl Into<String>) {
        self.embedder_id = Some(embedder_id.into());
    }

    pub fn entries(&self) -> &[IndexEntry] { &self.entries }

    pub fn get(&self, chunk_id: &str) -> Option<&IndexEntry> {
        self.positions.get(chunk_id).map(|&i| &self.entries[i])
    }

    /// Add or replace the entry for `chunk`.
    pub fn insert(&mut self, chunk: Chunk, vector: Vec<f32>) -> Result<()> {
        let dim = check_vector(&chunk, &vector, self.dimension)?;
        self.dimension = Some(dim);
        self.upsert(IndexEntry { chunk, vector });
        self.state = StoreState::Building;
        Ok(())
    }

    /// Insert every entry or none of them.
    pub fn insert_batch(&mut self, batch: Vec<(Chunk, Vec<f32>)>) -> Result<usize> {
        let mut dim = self.dimension;
        for (chunk, vector) in &batch {
            dim = Some(check_vector(chunk, vector, dim)?);
        }
        if batch.is_empty() {
            return Ok(0);
        }
        self.dimension = dim;
        let inserted = batch.len();
        for (chunk, vector) in batch {
            self.upsert(IndexEntry { chunk, vector });
        }
        self.state = StoreState::Building;
        debug!(inserted, total = self.entries.len(), "inserted batch");
        Ok(inserted)
    }

    pub fn remove_chunk(&mut self, chunk_id: &str) -> bool {
        let Some(pos) = self.positions.get(chunk_id).copied() else {
            return false;
        };
        self.entries.remove(pos);
        self.reindex();
        true
    }

    /// Remove every entry of `document_id`, returning how many were dropped.
    pub fn remove_document(&mut self, document_id: &str) -> usize {
        let before = self.entries.len();
        self.entries.retain(|e| e.chunk.document_id != document_id);
        let removed = before - self.entries.len();
        if removed > 0 {
            self.reindex();
        }
        removed
    }

    /// Mark an in-memory build complete so it can be queried without a persist.
    pub fn finish_build(&mut self) {
        self.state = StoreState::Ready;
    }

    pub(crate) fn mark_ready(&mut self) {
        self.state = StoreState::Ready;
    }

    /// The `k` entries most similar to `vector`, best first.
    pub fn query(&self, vector: &[f32], k: usize) -> Result<RetrievalResult> {
        if self.entries.is_empty() {
            return Err(StoreError::EmptyIndex);
        }
        if self.state != StoreState::Ready {
            return Err(StoreError::NotReady);
        }
        if let Some(expected) = self.dimension {
            if vector.len() != expected {
                return Err(StoreError::DimensionMismatch { expected, actual: vector.len() });
            }
        }
        let mut scored: Vec<(usize, f32)> =
            self.entries.iter().enumerate().map(|(i, e)| (i, cosine_similarity(vector, &e.vector))).collect();
        scored.sort_by(|a, b| b.1.total_cmp(&a.1));
        scored.truncate(k.min(self.entries.len()));
        Ok(scored
            .into_iter()
            .map(|(i, score)| ScoredChunk { chunk: self.entries[i].chunk.clone(), score })
            .collect())
    }

    /// Fails when the index was built by a different embedder than `embedder_id`.
    pub fn ensure_compatible(&self, embedder_id: &str) -> Result<()> {
        match self.embedder_id.as_deref() {
            Some(found) if found != embedder_id => {
                Err(StoreError::IncompatibleIndex { expected: embedder_id.to_string(), found: found.to_string() })
            }
            _ => Ok(()),
        }
    }

    fn upsert(&mut self, entry: IndexEntry) {
        let id = entry.chunk.id();
        match self.positions.get(&id) {
            Some(&pos) => self.entries[pos] = entry,
            None => {
                self.positions.insert(id, self.entries.len());
                self.entries.push(entry);
            }
        }
    }

    fn reindex(&mut self) {
        self.positions = self.entries.iter().enumerate().map(|(i, e)| (e.chunk.id(), i)).collect();
    }
}

fn check_vector(chunk: &Chunk, vector: &[f32], expected: Option<usize>) -> Result<usize> {
    if vector.is_empty() {
        return Err(StoreError::EmptyVector { chunk_id: chunk.id() });
    }
    match expected {
        Some(expected) if expected != vector.len() => Err(StoreError::DimensionMismatch { expected, actual: vector.len() }),
        _ => Ok(vector.len()),
    }
}

/// Dot product over the product of magnitudes; 0 when either side is a zero vector
/// or the result is not a number.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let mut dot = 0f32;
    let mut na = 0f32;
    let mut nb = 0f32;
    for (x, y) in a.iter().zip(b) {
        dot += x * y;
        na += x * x;
        nb += y * y;
    }
    if na == 0.0 || nb == 0.0 {
        return 0.0;
    }
    let score = dot / (na.sqrt() * nb.sqrt());
    if score.is_nan() { 0.0 } else { score }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chunk(doc: &str, idx: usize, text: &str) -> Chunk {
        Chunk { document_id: doc.to_string(), sequence_index: idx, text: text.to_string(), char_range: 0..text.chars().count() }
    }

    fn ready(entries: Vec<(Chunk, Vec<f32>)>) -> VectorStore {
        let mut s = VectorStore::new();
        s.insert_batch(entries).unwrap();
        s.finish_build();
        s
    }

    #[test]
    fn cosine_basics() {
        assert!((cosine_similarity(&[1.0, 0.0], &[2.0, 0.0]) - 1.0).abs() < 1e-6);
        assert!(cosine_similarity(&[1.0, 0.0], &[0.0, 3.0]).abs() < 1e-6);
        assert!((cosine_similarity(&[1.0, 0.0], &[-1.0, 0.0]) + 1.0).abs() < 1e-6);
        assert_eq!(cosine_similarity(&[0.0, 0.0], &[1.0, 1.0]), 0.0);
        assert_eq!(cosine_similarity(&[f32::NAN, 1.0], &[1.0, 1.0]), 0.0);
    }

    #[test]
    fn nan_vectors_rank_below_real_matches() {
        let s = ready(vec![
            (chunk("d", 0, "broken"), vec![f32::NAN, 0.0]),
            (chunk("d", 1, "near"), vec![1.0, 0.1]),
            (chunk("d", 2, "opposite"), vec![-1.0, 0.0]),
        ]);
        let hits = s.query(&[1.0, 0.0], 3).unwrap();
        let texts: Vec<&str> = hits.iter().map(|h| h.chunk.text.as_str()).collect();
        assert_eq!(texts, vec!["near", "broken", "opposite"]);
        assert!(hits.iter().all(|h| !h.score.is_nan()));
    }

    #[test]
    fn state_transitions() {
        let mut s = VectorStore::new();
        assert_eq!(s.state(), StoreState::NotCreated);
        s.insert(chunk("a", 0, "x"), vec![1.0, 0.0]).unwrap();
        assert_eq!(s.state(), StoreState::Building);
        assert!(matches!(s.query(&[1.0, 0.0], 1), Err(StoreError::NotReady)));
        s.finish_build();
        assert!(s.is_ready());
        s.insert(chunk("a", 1, "y"), vec![0.0, 1.0]).unwrap();
        assert_eq!(s.state(), StoreState::Building, "insert after ready reopens the build");
    }

    #[test]
    fn empty_store_query_is_empty_index() {
        let mut s = VectorStore::new();
        assert!(matches!(s.query(&[1.0], 1), Err(StoreError::EmptyIndex)));
        s.finish_build();
        assert!(matches!(s.query(&[1.0], 1), Err(StoreError::EmptyIndex)));
    }

    #[test]
    fn dimension_mismatch_leaves_store_unchanged() {
        let mut s = ready(vec![(chunk("a", 0, "x"), vec![1.0, 0.0, 0.0])]);
        let err = s.insert(chunk("a", 1, "y"), vec![1.0, 0.0]).unwrap_err();
        assert!(matches!(err, StoreError::DimensionMismatch { expected: 3, actual: 2 }));
        assert_eq!(s.len(), 1);
        assert!(s.is_ready());
        assert!(matches!(s.query(&[1.0], 1), Err(StoreError::DimensionMismatch { expected: 3, actual: 1 })));
    }

    #[test]
    fn batch_is_all_or_nothing() {
        let mut s = VectorStore::new();
        let err = s
            .insert_batch(vec![(chunk("a", 0, "x"), vec![1.0, 0.0]), (chunk("a", 1, "y"), vec![1.0, 0.0, 0.0])])
            .unwrap_err();
        assert!(matches!(err, StoreError::DimensionMismatch { expected: 2, actual: 3 }));
        assert!(s.is_empty());
        assert_eq!(s.dimension(), None);
        assert_eq!(s.state(), StoreState::NotCreated);
        assert!(matches!(s.insert(chunk("a", 0, "x"), vec![]), Err(StoreError::EmptyVector { .. })));
    }

    #[test]
    fn ranking_and_clamping() {
        let s = ready(vec![
            (chunk("d", 0, "far"), vec![0.0, 1.0]),
            (chunk("d", 1, "near"), vec![1.0, 0.1]),
            (chunk("d", 2, "mid"), vec![1.0, 1.0]),
        ]);
        let hits = s.query(&[1.0, 0.0], 10).unwrap();
        assert_eq!(hits.len(), 3, "k clamps to entry count");
        let texts: Vec<&str> = hits.iter().map(|h| h.chunk.text.as_str()).collect();
        assert_eq!(texts, vec!["near", "mid", "far"]);
        assert!(hits.windows(2).all(|w| w[0].score >= w[1].score));
        assert!(s.query(&[1.0, 0.0], 0).unwrap().is_empty());
    }

    #[test]
    fn ties_keep_insertion_order() {
        let s = ready(vec![
            (chunk("d", 0, "first"), vec![1.0, 0.0]),
            (chunk("d", 1, "second"), vec![2.0, 0.0]),
            (chunk("d", 2, "third"), vec![3.0, 0.0]),
        ]);
        let hits = s.query(&[1.0, 0.0], 3).unwrap();
        let texts: Vec<&str> = hits.iter().map(|h| h.chunk.text.as_str()).collect();
        assert_eq!(texts, vec!["first", "second", "third"]);
    }

    #[test]
    fn upsert_and_removal() {
        let mut s = VectorStore::new();
        s.insert(chunk("a", 0, "old"), vec![1.0, 0.0]).unwrap();
        s.insert(chunk("b", 0, "other"), vec![0.0, 1.0]).unwrap();
        s.insert(chunk("a", 0, "new"), vec![1.0, 0.0]).unwrap();
        assert_eq!(s.len(), 2);
        assert_eq!(s.entries()[0].chunk.text, "new", "replaced in place");

        s.insert(chunk("a", 1, "more"), vec![1.0, 1.0]).unwrap();
        assert!(s.remove_chunk("b:0"));
        assert!(!s.remove_chunk("b:0"));
        assert_eq!(s.get("a:1").map(|e| e.chunk.text.as_str()), Some("more"));
        assert_eq!(s.remove_document("a"), 2);
        assert!(s.is_empty());
    }

    #[test]
    fn compatibility_by_embedder_id() {
        let mut s = VectorStore::new();
        assert!(s.ensure_compatible("hash:xxh64:d8").is_ok());
        s.set_embedder_id("openai:text-embedding-ada-002");
        assert!(s.ensure_compatible("openai:text-embedding-ada-002").is_ok());
        assert!(matches!(s.ensure_compatible("hash:xxh64:d8"), Err(StoreError::IncompatibleIndex { .. })));
    }
}
