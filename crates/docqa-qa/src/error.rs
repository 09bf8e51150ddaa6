use std::path::PathBuf;
use thiserror::Error;

use docqa_core::error::{ChunkError, IngestionError, ProviderError};
use docqa_vector::StoreError;

/// Shown to the user whenever answering fails for an internal reason.
pub const ANSWER_FAILED_MESSAGE: &str = "AI Assistant encountered an error. Please try again later.";

const NO_INDEX_MESSAGE: &str = "No documents have been indexed yet. Run docqa-index first.";
const BLANK_QUESTION_MESSAGE: &str = "Please enter a question.";

/// What went wrong underneath a failed answer.
#[derive(Debug, Error)]
pub enum QaCause {
    #[error(transparent)]
    Provider(#[from] ProviderError),
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// A failed `answer`/`retrieve`. Displays only the user-facing message; the
/// cause stays reachable through `source()`.
#[derive(Debug, Error)]
#[error("{message}")]
pub struct QaError {
    message: &'static str,
    #[source]
    cause: Option<QaCause>,
}

impl QaError {
    pub(crate) fn blank_question() -> Self {
        Self { message: BLANK_QUESTION_MESSAGE, cause: None }
    }

    pub fn message(&self) -> &str { self.message }

    pub fn cause(&self) -> Option<&QaCause> { self.cause.as_ref() }
}

impl From<QaCause> for QaError {
    fn from(cause: QaCause) -> Self {
        let message = match &cause {
            QaCause::Store(StoreError::EmptyIndex | StoreError::IndexNotFound { .. }) => NO_INDEX_MESSAGE,
            _ => ANSWER_FAILED_MESSAGE,
        };
        Self { message, cause: Some(cause) }
    }
}

#[derive(Debug, Error)]
pub enum SummaryError {
    #[error(transparent)]
    Ingestion(#[from] IngestionError),

    #[error("summary generation failed: {0}")]
    Generation(#[from] ProviderError),

    #[error(transparent)]
    Config(#[from] ChunkError),

    #[error("cannot read summaries from {}: {message}", .path.display())]
    Load { path: PathBuf, message: String },

    #[error("cannot write summaries to {}: {message}", .path.display())]
    Persist { path: PathBuf, message: String },
}

#[derive(Debug, Error)]
pub enum BuildError {
    #[error("embedding {document_id} failed: {source}")]
    Embedding {
        document_id: String,
        #[source]
        source: ProviderError,
    },

    #[error("embedder returned {actual} vectors for {expected} chunks of {document_id}")]
    EmbeddingCount { document_id: String, expected: usize, actual: usize },

    #[error(transparent)]
    Store(#[from] StoreError),
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as _;

    #[test]
    fn display_hides_cause() {
        let err = QaError::from(QaCause::Provider(ProviderError::Api { status: 401, message: "invalid key sk-123".into() }));
        assert_eq!(err.to_string(), ANSWER_FAILED_MESSAGE);
        assert!(err.source().is_some_and(|s| s.to_string().contains("401")));
    }

    #[test]
    fn missing_index_has_its_own_message() {
        let err = QaError::from(QaCause::Store(StoreError::EmptyIndex));
        assert_eq!(err.message(), NO_INDEX_MESSAGE);
        assert!(matches!(err.cause(), Some(QaCause::Store(StoreError::EmptyIndex))));
    }
}
