//! Recursive separator-based text chunking.
//!
//! Text is split on the first separator of a prioritized list that occurs in
//! it, pieces that are still too long are split again with the remaining
//! separators, and the resulting pieces are merged greedily back up to
//! `max_chunk_size` characters, carrying at most `overlap` characters of the
//! previous chunk into the next one. Separators stay attached to the piece
//! they end, so the pieces tile the input exactly and every chunk is a slice
//! of the source text.

use std::collections::VecDeque;
use std::ops::Range;

use serde::{Deserialize, Serialize};

use crate::error::ChunkError;
use crate::types::{Chunk, Document};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChunkingConfig {
    /// Upper bound on a chunk's length in characters.
    pub max_chunk_size: usize,
    /// Characters shared by adjacent chunks, at most.
    pub overlap: usize,
    /// Tried in order; `""` splits between characters.
    pub separators: Vec<String>,
}

impl ChunkingConfig {
    pub fn new(max_chunk_size: usize, overlap: usize) -> Self {
        Self { max_chunk_size, overlap, ..Self::default() }
    }
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self { max_chunk_size: 1000, overlap: 0, separators: default_separators() }
    }
}

pub fn default_separators() -> Vec<String> {
    ["\n\n", "\n", ". ", " ", ""].iter().map(|s| (*s).to_string()).collect()
}

#[derive(Debug, Clone)]
pub struct TextChunker {
    config: ChunkingConfig,
}

impl TextChunker {
    pub fn new(config: ChunkingConfig) -> Result<Self, ChunkError> {
        if config.max_chunk_size == 0 {
            return Err(ChunkError::InvalidConfig("max_chunk_size must be > 0".into()));
        }
        if config.overlap >= config.max_chunk_size {
            return Err(ChunkError::InvalidConfig(format!(
                "overlap ({}) must be smaller than max_chunk_size ({})",
                config.overlap, config.max_chunk_size
            )));
        }
        Ok(Self { config })
    }

    pub fn config(&self) -> &ChunkingConfig { &self.config }

    /// Chunk a document. Sequence indices start at 0 and follow text order.
    pub fn chunk(&self, document: &Document) -> Vec<Chunk> {
        let text = document.raw_text.as_str();
        let byte_ranges = self.chunk_ranges(text);
        let mut offsets = CharOffsets::new(text);
        byte_ranges
            .into_iter()
            .enumerate()
            .map(|(sequence_index, range)| {
                let char_range = offsets.char_offset(range.start)..offsets.char_offset(range.end);
                Chunk { document_id: document.id.clone(), sequence_index, text: text[range].to_string(), char_range }
            })
            .collect()
    }

    /// Chunk texts only, for callers that have no document identity.
    pub fn split_text(&self, text: &str) -> Vec<String> {
        self.chunk_ranges(text).into_iter().map(|r| text[r].to_string()).collect()
    }

    fn chunk_ranges(&self, text: &str) -> Vec<Range<usize>> {
        if text.is_empty() {
            return Vec::new();
        }
        let mut pieces = Vec::new();
        self.split_recursive(text, 0..text.len(), &self.config.separators, &mut pieces);
        self.merge(text, pieces)
    }

    fn split_recursive(&self, text: &str, range: Range<usize>, separators: &[String], out: &mut Vec<Range<usize>>) {
        if char_len(text, &range) <= self.config.max_chunk_size {
            out.push(range);
            return;
        }
        let segment = &text[range.clone()];
        let Some(pos) = separators.iter().position(|s| s.is_empty() || segment.contains(s.as_str())) else {
            // Nothing left to split on: emit it oversized.
            out.push(range);
            return;
        };
        let remaining = &separators[pos + 1..];
        for piece in split_keeping_separator(text, range, &separators[pos]) {
            if char_len(text, &piece) <= self.config.max_chunk_size {
                out.push(piece);
            } else {
                self.split_recursive(text, piece, remaining, out);
            }
        }
    }

    fn merge(&self, text: &str, pieces: Vec<Range<usize>>) -> Vec<Range<usize>> {
        let max = self.config.max_chunk_size;
        let overlap = self.config.overlap;
        let mut chunks = Vec::new();
        let mut window: VecDeque<(Range<usize>, usize)> = VecDeque::new();
        let mut window_len = 0usize;

        for piece in pieces {
            let len = char_len(text, &piece);
            if !window.is_empty() && window_len + len > max {
                chunks.push(span(&window));
                while let Some((_, front_len)) = window.front() {
                    if window_len > overlap || window_len + len > max {
                        window_len -= front_len;
                        window.pop_front();
                    } else {
                        break;
                    }
                }
            }
            window_len += len;
            window.push_back((piece, len));
        }
        if !window.is_empty() {
            chunks.push(span(&window));
        }
        chunks
    }
}

fn char_len(text: &str, range: &Range<usize>) -> usize {
    text[range.clone()].chars().count()
}

fn span(window: &VecDeque<(Range<usize>, usize)>) -> Range<usize> {
    match (window.front(), window.back()) {
        (Some((first, _)), Some((last, _))) => first.start..last.end,
        _ => 0..0,
    }
}

fn split_keeping_separator(text: &str, range: Range<usize>, separator: &str) -> Vec<Range<usize>> {
    let base = range.start;
    let segment = &text[range.clone()];
    if separator.is_empty() {
        return segment.char_indices().map(|(i, c)| base + i..base + i + c.len_utf8()).collect();
    }
    let mut pieces = Vec::new();
    let mut start = 0;
    for (idx, matched) in segment.match_indices(separator) {
        let end = idx + matched.len();
        pieces.push(base + start..base + end);
        start = end;
    }
    if start < segment.len() {
        pieces.push(base + start..range.end);
    }
    pieces
}

/// Byte to char offset translation for monotonically increasing queries.
struct CharOffsets<'a> {
    text: &'a str,
    byte: usize,
    chars: usize,
}

impl<'a> CharOffsets<'a> {
    fn new(text: &'a str) -> Self { Self { text, byte: 0, chars: 0 } }

    fn char_offset(&mut self, byte: usize) -> usize {
        if byte < self.byte {
            self.byte = 0;
            self.chars = 0;
        }
        self.chars += self.text[self.byte..byte].chars().count();
        self.byte = byte;
        self.chars
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doc(text: &str) -> Document {
        Document::new("doc.txt", text.to_string())
    }

    fn reconstruct(chunks: &[Chunk]) -> String {
        let mut out = String::new();
        let mut covered = 0usize;
        for c in chunks {
            assert!(c.char_range.start <= covered, "gap before chunk {}", c.sequence_index);
            out.extend(c.text.chars().skip(covered - c.char_range.start));
            covered = c.char_range.end;
        }
        out
    }

    fn sample_text() -> String {
        let mut s = String::new();
        for i in 0..60 {
            s.push_str(&format!("Sentence number {i} talks about warranties and storage. "));
            if i % 7 == 0 {
                s.push_str("Averyveryverylongtokenwithoutanybreaksthatkeepsgoingandgoingforeverandever ");
            }
        }
        s.trim_end().to_string()
    }

    #[test]
    fn rejects_bad_config() {
        assert!(TextChunker::new(ChunkingConfig::new(0, 0)).is_err());
        assert!(TextChunker::new(ChunkingConfig::new(10, 10)).is_err());
        assert!(TextChunker::new(ChunkingConfig::new(10, 9)).is_ok());
    }

    #[test]
    fn short_text_is_one_chunk() {
        let chunker = TextChunker::new(ChunkingConfig::new(1000, 0)).unwrap();
        let chunks = chunker.chunk(&doc("The warranty expires in June."));
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].text, "The warranty expires in June.");
        assert_eq!(chunks[0].char_range, 0..29);
        assert_eq!(chunks[0].id(), "doc.txt:0");
    }

    #[test]
    fn empty_text_has_no_chunks() {
        let chunker = TextChunker::new(ChunkingConfig::default()).unwrap();
        assert!(chunker.chunk(&doc("")).is_empty());
    }

    #[test]
    fn chunks_respect_bound_and_cover_text() {
        let text = sample_text();
        for (max, overlap) in [(40, 0), (40, 10), (100, 30), (17, 5), (1, 0)] {
            let chunker = TextChunker::new(ChunkingConfig::new(max, overlap)).unwrap();
            let chunks = chunker.chunk(&doc(&text));
            assert!(!chunks.is_empty());
            for (i, c) in chunks.iter().enumerate() {
                assert_eq!(c.sequence_index, i);
                assert!(c.text.chars().count() <= max, "chunk {i} too long for max={max}");
                assert_eq!(c.text.chars().count(), c.char_len());
            }
            for pair in chunks.windows(2) {
                let shared = pair[0].char_range.end.saturating_sub(pair[1].char_range.start);
                assert!(shared <= overlap, "overlap {shared} exceeds {overlap}");
                assert!(pair[1].char_range.end > pair[0].char_range.end);
            }
            assert_eq!(reconstruct(&chunks), text, "coverage for max={max} overlap={overlap}");
        }
    }

    #[test]
    fn overlap_repeats_trailing_words() {
        let chunker = TextChunker::new(ChunkingConfig::new(12, 6)).unwrap();
        let chunks = chunker.split_text("aaa bbb ccc ddd eee");
        assert_eq!(chunks, vec!["aaa bbb ccc ", "ccc ddd eee"]);
    }

    #[test]
    fn prefers_sentence_breaks_over_words() {
        let chunker = TextChunker::new(ChunkingConfig::new(30, 0)).unwrap();
        let chunks = chunker.split_text("First sentence here. Second one follows.");
        assert_eq!(chunks, vec!["First sentence here. ", "Second one follows."]);
    }

    #[test]
    fn unsplittable_token_is_emitted_oversized() {
        let config = ChunkingConfig { max_chunk_size: 5, overlap: 0, separators: vec![" ".to_string()] };
        let chunker = TextChunker::new(config).unwrap();
        let chunks = chunker.split_text("ab abcdefghij cd");
        assert_eq!(chunks, vec!["ab ", "abcdefghij ", "cd"]);
    }

    #[test]
    fn char_fallback_splits_long_tokens() {
        let chunker = TextChunker::new(ChunkingConfig::new(4, 0)).unwrap();
        let chunks = chunker.split_text("abcdefghij");
        assert_eq!(chunks, vec!["abcd", "efgh", "ij"]);
    }

    #[test]
    fn multibyte_ranges_are_in_chars() {
        let chunker = TextChunker::new(ChunkingConfig::new(6, 0)).unwrap();
        let chunks = chunker.chunk(&doc("héllo wörld ünïcode"));
        assert!(chunks.iter().all(|c| c.text.chars().count() <= 6));
        assert_eq!(chunks[1].char_range.start, 6);
        assert_eq!(reconstruct(&chunks), "héllo wörld ünïcode");
    }

    #[test]
    fn deterministic() {
        let text = sample_text();
        let chunker = TextChunker::new(ChunkingConfig::new(64, 16)).unwrap();
        assert_eq!(chunker.chunk(&doc(&text)), chunker.chunk(&doc(&text)));
    }
}
