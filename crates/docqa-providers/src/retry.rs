//! Bounded retry with exponential backoff around any provider.

use std::thread;
use std::time::Duration;

use tracing::warn;

use docqa_core::config::ProviderConfig;
use docqa_core::error::ProviderError;
use docqa_core::traits::{EmbeddingProvider, GenerationProvider};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Attempts after the first one.
    pub max_retries: u32,
    pub initial_backoff: Duration,
}

impl RetryPolicy {
    pub fn from_config(config: &ProviderConfig) -> Self {
        Self { max_retries: config.max_retries, initial_backoff: Duration::from_millis(config.backoff_ms) }
    }

    pub fn none() -> Self {
        Self { max_retries: 0, initial_backoff: Duration::ZERO }
    }

    fn run<T>(&self, op: &str, mut f: impl FnMut() -> Result<T, ProviderError>) -> Result<T, ProviderError> {
        let mut attempt = 0u32;
        let mut delay = self.initial_backoff;
        loop {
            match f() {
                Ok(v) => return Ok(v),
                Err(e) if e.is_transient() && attempt < self.max_retries => {
                    attempt += 1;
                    warn!(op, attempt, max = self.max_retries, delay_ms = delay.as_millis() as u64, error = %e, "retrying provider call");
                    thread::sleep(delay);
                    delay = delay.saturating_mul(2);
                }
                Err(e) => return Err(e),
            }
        }
    }
}

/// Wraps a provider so transient failures are retried per `policy`.
pub struct Retrying<P> {
    inner: P,
    policy: RetryPolicy,
}

impl<P> Retrying<P> {
    pub fn new(inner: P, policy: RetryPolicy) -> Self {
        Self { inner, policy }
    }

    pub fn into_inner(self) -> P { self.inner }
}

impl<P: EmbeddingProvider> EmbeddingProvider for Retrying<P> {
    fn embedder_id(&self) -> &str { self.inner.embedder_id() }

    fn embed(&self, text: &str) -> Result<Vec<f32>, ProviderError> {
        self.policy.run("embed", || self.inner.embed(text))
    }

    fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, ProviderError> {
        self.policy.run("embed_batch", || self.inner.embed_batch(texts))
    }
}

impl<P: GenerationProvider> GenerationProvider for Retrying<P> {
    fn generate(&self, prompt: &str, max_tokens: u32, temperature: f32) -> Result<String, ProviderError> {
        self.policy.run("generate", || self.inner.generate(prompt, max_tokens, temperature))
    }
}
