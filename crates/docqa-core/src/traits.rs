//! Capability boundaries for the external embedding and generation models.

use std::sync::Arc;

use crate::error::ProviderError;

pub trait EmbeddingProvider: Send + Sync {
    /// Stable identifier for the provider/model (e.g. `openai:text-embedding-ada-002`).
    fn embedder_id(&self) -> &str;
    fn embed(&self, text: &str) -> Result<Vec<f32>, ProviderError>;
    fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, ProviderError> {
        texts.iter().map(|t| self.embed(t)).collect()
    }
}

pub trait GenerationProvider: Send + Sync {
    fn generate(&self, prompt: &str, max_tokens: u32, temperature: f32) -> Result<String, ProviderError>;
}

impl<T: EmbeddingProvider + ?Sized> EmbeddingProvider for Box<T> {
    fn embedder_id(&self) -> &str { (**self).embedder_id() }
    fn embed(&self, text: &str) -> Result<Vec<f32>, ProviderError> { (**self).embed(text) }
    fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, ProviderError> { (**self).embed_batch(texts) }
}

impl<T: EmbeddingProvider + ?Sized> EmbeddingProvider for Arc<T> {
    fn embedder_id(&self) -> &str { (**self).embedder_id() }
    fn embed(&self, text: &str) -> Result<Vec<f32>, ProviderError> { (**self).embed(text) }
    fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, ProviderError> { (**self).embed_batch(texts) }
}

impl<T: GenerationProvider + ?Sized> GenerationProvider for Box<T> {
    fn generate(&self, prompt: &str, max_tokens: u32, temperature: f32) -> Result<String, ProviderError> {
        (**self).generate(prompt, max_tokens, temperature)
    }
}

impl<T: GenerationProvider + ?Sized> GenerationProvider for Arc<T> {
    fn generate(&self, prompt: &str, max_tokens: u32, temperature: f32) -> Result<String, ProviderError> {
        (**self).generate(prompt, max_tokens, temperature)
    }
}
