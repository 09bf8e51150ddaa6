//! Question answering over an indexed paper collection: retrieval-augmented
//! answers, cached per-document summaries and the index build.

pub mod builder;
pub mod engine;
pub mod error;
pub mod prompt;
pub mod summary;

pub use builder::IndexBuilder;
pub use engine::{RetrievalQaEngine, DEFAULT_TOP_K};
pub use error::{BuildError, QaCause, QaError, SummaryError, ANSWER_FAILED_MESSAGE};
pub use summary::{SummaryCache, SummaryRecord, Summarizer};
