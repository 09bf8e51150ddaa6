//! Corpus ingestion: list the PDFs of a source directory, load and chunk each.
//!
//! A document that fails to load is recorded in the report and skipped; the
//! rest of the corpus is still processed.

use std::path::{Path, PathBuf};

use tracing::{info, warn};

use crate::chunker::{ChunkingConfig, TextChunker};
use crate::error::{ChunkError, IngestionError};
use crate::loader::{DocumentLoader, SourceKind};
use crate::types::{document_id_for, Chunk};

/// Chunks produced from one source document.
#[derive(Debug, Clone)]
pub struct IngestedDocument {
    pub document_id: String,
    pub source_path: PathBuf,
    pub chunks: Vec<Chunk>,
}

#[derive(Debug, Default)]
pub struct IngestionReport {
    pub documents: Vec<IngestedDocument>,
    pub failures: Vec<(PathBuf, IngestionError)>,
}

impl IngestionReport {
    pub fn chunk_count(&self) -> usize {
        self.documents.iter().map(|d| d.chunks.len()).sum()
    }

    pub fn chunks(&self) -> impl Iterator<Item = &Chunk> {
        self.documents.iter().flat_map(|d| d.chunks.iter())
    }
}

pub struct DataProcessor {
    loader: DocumentLoader,
    chunker: TextChunker,
}

impl DataProcessor {
    pub fn new(chunking: ChunkingConfig) -> Result<Self, ChunkError> {
        Ok(Self { loader: DocumentLoader::new(), chunker: TextChunker::new(chunking)? })
    }

    pub fn process_directory(&self, data_dir: &Path) -> Result<IngestionReport, IngestionError> {
        let files = self.list_source_files(data_dir)?;
        Ok(self.process_files(data_dir, &files))
    }

    pub fn process_directory_limited(&self, data_dir: &Path, limit: usize) -> Result<IngestionReport, IngestionError> {
        let mut files = self.list_source_files(data_dir)?;
        if files.len() > limit {
            files.truncate(limit);
            info!(limit, "limited ingestion to the first files");
        }
        Ok(self.process_files(data_dir, &files))
    }

    /// Load and chunk a single file of any supported kind.
    pub fn process_file(&self, path: &Path) -> Result<IngestedDocument, IngestionError> {
        let document = self.loader.load(path)?;
        let chunks = self.chunker.chunk(&document);
        Ok(IngestedDocument { document_id: document.id, source_path: document.source_path, chunks })
    }

    /// PDF files directly inside `root`, sorted by path. Sub-directories are not searched.
    pub fn list_source_files(&self, root: &Path) -> Result<Vec<PathBuf>, IngestionError> {
        if !root.is_dir() {
            return Err(IngestionError::Unreadable {
                path: root.to_path_buf(),
                source: std::io::Error::new(std::io::ErrorKind::NotFound, "source directory not found"),
            });
        }
        let mut pdf_files = Vec::new();
        for entry in walkdir::WalkDir::new(root)
            .min_depth(1)
            .max_depth(1)
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().is_file())
        {
            let path = entry.path();
            if SourceKind::from_path(path) == Some(SourceKind::Pdf) {
                pdf_files.push(path.to_path_buf());
            }
        }
        pdf_files.sort();
        Ok(pdf_files)
    }

    fn process_files(&self, data_dir: &Path, files: &[PathBuf]) -> IngestionReport {
        let mut report = IngestionReport::default();
        if files.is_empty() {
            info!(dir = %data_dir.display(), "no PDF files found");
            return report;
        }
        for (file_index, file_path) in files.iter().enumerate() {
            info!(file = file_index + 1, total = files.len(), doc = %document_id_for(file_path), "processing");
            match self.process_file(file_path) {
                Ok(doc) => report.documents.push(doc),
                Err(e) => {
                    warn!(path = %file_path.display(), error = %e, "skipping document");
                    report.failures.push((file_path.clone(), e));
                }
            }
        }
        info!(documents = report.documents.len(), chunks = report.chunk_count(), failed = report.failures.len(), "ingestion finished");
        report
    }
}
