use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("vector dimension mismatch: index holds {expected}-d vectors, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("cannot index an empty vector for chunk {chunk_id}")]
    EmptyVector { chunk_id: String },

    #[error("the index is empty; run the index build first")]
    EmptyIndex,

    #[error("the index is still being built; finish the build before querying")]
    NotReady,

    #[error("no index found at {}; run the index build first", .path.display())]
    IndexNotFound { path: PathBuf },

    #[error("index was built with embedder {found}, but {expected} is configured; rebuild the index")]
    IncompatibleIndex { expected: String, found: String },

    #[error("corrupt index at {}: {message}", .path.display())]
    CorruptIndex { path: PathBuf, message: String },

    #[error("failed to persist index to {}: {message}", .path.display())]
    Persist { path: PathBuf, message: String },
}

pub type Result<T> = std::result::Result<T, StoreError>;
