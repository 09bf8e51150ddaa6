//! Retrieval-augmented question answering over a [`VectorStore`].

use std::sync::Arc;

use tracing::{debug, warn};

use docqa_core::config::RetrievalConfig;
use docqa_core::traits::{EmbeddingProvider, GenerationProvider};
use docqa_core::types::RetrievalResult;
use docqa_vector::VectorStore;

use crate::error::{QaCause, QaError};
use crate::prompt::qa_prompt;

pub const DEFAULT_TOP_K: usize = 2;
pub const DEFAULT_ANSWER_MAX_TOKENS: u32 = 400;

pub struct RetrievalQaEngine {
    embedder: Arc<dyn EmbeddingProvider>,
    generator: Arc<dyn GenerationProvider>,
    max_tokens: u32,
    temperature: f32,
}

impl RetrievalQaEngine {
    pub fn new(embedder: Arc<dyn EmbeddingProvider>, generator: Arc<dyn GenerationProvider>) -> Self {
        Self { embedder, generator, max_tokens: DEFAULT_ANSWER_MAX_TOKENS, temperature: 0.0 }
    }

    pub fn from_config(
        embedder: Arc<dyn EmbeddingProvider>,
        generator: Arc<dyn GenerationProvider>,
        config: &RetrievalConfig,
    ) -> Self {
        Self::new(embedder, generator).with_generation(config.answer_max_tokens, config.temperature)
    }

    pub fn with_generation(mut self, max_tokens: u32, temperature: f32) -> Self {
        self.max_tokens = max_tokens;
        self.temperature = temperature;
        self
    }

    pub fn embedder_id(&self) -> &str { self.embedder.embedder_id() }

    /// Embed the question and fetch its `k` nearest chunks.
    pub fn retrieve(&self, question: &str, store: &VectorStore, k: usize) -> Result<RetrievalResult, QaError> {
        let question = question.trim();
        if question.is_empty() {
            return Err(QaError::blank_question());
        }
        self.retrieve_inner(question, store, k).map_err(log_failure)
    }

    /// Answer `question` from the `k` most relevant chunks. Never returns a partial answer.
    pub fn answer(&self, question: &str, store: &VectorStore, k: usize) -> Result<String, QaError> {
        let question = question.trim();
        if question.is_empty() {
            return Err(QaError::blank_question());
        }
        let run = || -> Result<String, QaCause> {
            let hits = self.retrieve_inner(question, store, k)?;
            let prompt = qa_prompt(&hits, question);
            let completion = self.generator.generate(&prompt, self.max_tokens, self.temperature)?;
            Ok(completion.trim().to_string())
        };
        run().map_err(log_failure)
    }

    fn retrieve_inner(&self, question: &str, store: &VectorStore, k: usize) -> Result<RetrievalResult, QaCause> {
        let vector = self.embedder.embed(question)?;
        let hits = store.query(&vector, k)?;
        debug!(k, hits = hits.len(), top = ?hits.first().map(|h| h.score), "retrieved context");
        Ok(hits)
    }
}

fn log_failure(cause: QaCause) -> QaError {
    warn!(error = %cause, "question answering failed");
    QaError::from(cause)
}
