//! Durable per-document summaries.
//!
//! Records live in a pretty-printed JSON array rewritten in full on every
//! addition (temp file in the same directory, then rename). A summary is
//! generated at most once per file name, concurrent callers included.

use std::collections::HashMap;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use docqa_core::chunker::{ChunkingConfig, TextChunker};
use docqa_core::config::RetrievalConfig;
use docqa_core::loader::{DocumentLoader, DEFAULT_SUMMARY_PAGES};
use docqa_core::traits::GenerationProvider;
use docqa_core::types::document_id_for;

use crate::error::SummaryError;
use crate::prompt::summary_prompt;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SummaryRecord {
    pub file_name: String,
    pub summary: String,
}

pub struct SummaryCache {
    path: PathBuf,
    records: Mutex<Vec<SummaryRecord>>,
    in_flight: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl SummaryCache {
    /// Read the cache at `path`; a missing file is an empty cache.
    pub fn load(path: impl Into<PathBuf>) -> Result<Self, SummaryError> {
        let path = path.into();
        let records = if path.exists() {
            let content = fs::read_to_string(&path)
                .map_err(|e| SummaryError::Load { path: path.clone(), message: e.to_string() })?;
            if content.trim().is_empty() {
                Vec::new()
            } else {
                let parsed: Vec<SummaryRecord> = serde_json::from_str(&content)
                    .map_err(|e| SummaryError::Load { path: path.clone(), message: e.to_string() })?;
                dedupe(parsed)
            }
        } else {
            Vec::new()
        };
        debug!(path = %path.display(), records = records.len(), "loaded summaries");
        Ok(Self { path, records: Mutex::new(records), in_flight: Mutex::new(HashMap::new()) })
    }

    pub fn path(&self) -> &Path { &self.path }

    pub fn get(&self, file_name: &str) -> Option<SummaryRecord> {
        lock(&self.records).iter().find(|r| r.file_name == file_name).cloned()
    }

    /// Snapshot of every record, in insertion order.
    pub fn records(&self) -> Vec<SummaryRecord> { lock(&self.records).clone() }

    pub fn len(&self) -> usize { lock(&self.records).len() }

    pub fn is_empty(&self) -> bool { lock(&self.records).is_empty() }

    /// The cached record for `file_name`, or a new one from `generate`, stored durably before returning.
    ///
    /// If `generate` fails nothing is stored and the error is returned.
    pub fn get_or_generate<F>(&self, file_name: &str, generate: F) -> Result<SummaryRecord, SummaryError>
    where
        F: FnOnce() -> Result<String, SummaryError>,
    {
        if let Some(existing) = self.get(file_name) {
            return Ok(existing);
        }
        let key_lock = lock(&self.in_flight).entry(file_name.to_string()).or_default().clone();
        let _generating = lock(&key_lock);
        if let Some(existing) = self.get(file_name) {
            return Ok(existing);
        }

        let summary = generate()?;
        let record = SummaryRecord { file_name: file_name.to_string(), summary };

        let mut records = lock(&self.records);
        let mut next = records.clone();
        next.push(record.clone());
        write_atomic(&self.path, &next)?;
        *records = next;
        info!(file = file_name, total = records.len(), "stored summary");
        drop(records);
        // Later callers hit the record before reaching the lock table.
        lock(&self.in_flight).remove(file_name);
        Ok(record)
    }
}

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(PoisonError::into_inner)
}

fn dedupe(records: Vec<SummaryRecord>) -> Vec<SummaryRecord> {
    let mut out: Vec<SummaryRecord> = Vec::with_capacity(records.len());
    for r in records {
        if out.iter().any(|o| o.file_name == r.file_name) {
            warn!(file = %r.file_name, "dropping duplicate summary record");
        } else {
            out.push(r);
        }
    }
    out
}

fn write_atomic(path: &Path, records: &[SummaryRecord]) -> Result<(), SummaryError> {
    let fail = |message: String| SummaryError::Persist { path: path.to_path_buf(), message };
    let dir = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
        _ => PathBuf::from("."),
    };
    fs::create_dir_all(&dir).map_err(|e| fail(e.to_string()))?;
    let mut tmp = tempfile::NamedTempFile::new_in(&dir).map_err(|e| fail(e.to_string()))?;
    serde_json::to_writer_pretty(&mut tmp, records).map_err(|e| fail(e.to_string()))?;
    tmp.write_all(b"\n").map_err(|e| fail(e.to_string()))?;
    tmp.persist(path).map_err(|e| fail(e.error.to_string()))?;
    Ok(())
}

/// Summarizes the opening pages of a document with the passive-voice prompt.
pub struct Summarizer {
    generator: Arc<dyn GenerationProvider>,
    loader: DocumentLoader,
    splitter: TextChunker,
    num_pages: usize,
    max_tokens: u32,
    temperature: f32,
}

impl Summarizer {
    pub fn new(generator: Arc<dyn GenerationProvider>, config: &RetrievalConfig) -> Result<Self, SummaryError> {
        Ok(Self {
            generator,
            loader: DocumentLoader::new(),
            splitter: TextChunker::new(ChunkingConfig::new(4000, 200))?,
            num_pages: if config.summary_pages == 0 { DEFAULT_SUMMARY_PAGES } else { config.summary_pages },
            max_tokens: config.summary_max_tokens,
            temperature: config.temperature,
        })
    }

    /// Generate a fresh summary of `path`.
    pub fn summarize(&self, path: &Path) -> Result<String, SummaryError> {
        let text = self.loader.load_pages(path, 0, self.num_pages)?;
        let stuffed = self.splitter.split_text(&text).join("\n\n");
        let summary = self.generator.generate(&summary_prompt(&stuffed), self.max_tokens, self.temperature)?;
        Ok(summary.trim().to_string())
    }

    /// The cached summary of `path`, generating and storing it on first use.
    pub fn summary_for(&self, cache: &SummaryCache, path: &Path) -> Result<SummaryRecord, SummaryError> {
        cache.get_or_generate(&document_id_for(path), || self.summarize(path))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn missing_file_is_empty_cache() {
        let tmp = TempDir::new().unwrap();
        let cache = SummaryCache::load(tmp.path().join("summaries.json")).unwrap();
        assert!(cache.is_empty());
        assert!(!cache.path().exists());
    }

    #[test]
    fn duplicate_records_on_disk_are_collapsed() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("summaries.json");
        fs::write(
            &path,
            r#"[{"file_name":"a.pdf","summary":"one"},{"file_name":"b.pdf","summary":"two"},{"file_name":"a.pdf","summary":"three"}]"#,
        )
        .unwrap();
        let cache = SummaryCache::load(&path).unwrap();
        assert_eq!(cache.len(), 2);
        assert_eq!(cache.get("a.pdf").unwrap().summary, "one");
    }

    #[test]
    fn key_locks_are_released_after_storing() {
        let tmp = TempDir::new().unwrap();
        let cache = SummaryCache::load(tmp.path().join("summaries.json")).unwrap();
        for name in ["a.pdf", "b.pdf", "a.pdf"] {
            cache.get_or_generate(name, || Ok(format!("summary of {name}"))).unwrap();
        }
        assert_eq!(cache.len(), 2);
        assert!(lock(&cache.in_flight).is_empty());
    }

    #[test]
    fn malformed_file_is_a_load_error() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("summaries.json");
        fs::write(&path, "{not json").unwrap();
        assert!(matches!(SummaryCache::load(&path), Err(SummaryError::Load { .. })));
    }
}
