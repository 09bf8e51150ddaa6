//! Embedding and generation providers.
//!
//! `build_embedder` honours `APP_USE_FAKE_EMBEDDINGS=1` to switch to the
//! offline [`HashEmbedder`] for fast, deterministic runs in tests and
//! development; otherwise both factories return the OpenAI-compatible HTTP
//! providers wrapped in [`Retrying`].

pub mod hash;
pub mod openai;
pub mod retry;

use tracing::info;

use docqa_core::config::{fake_embeddings_enabled, ProviderConfig};
use docqa_core::error::ProviderError;
use docqa_core::traits::{EmbeddingProvider, GenerationProvider};

pub use hash::{HashEmbedder, DEFAULT_HASH_DIM};
pub use openai::{OpenAiEmbedder, OpenAiGenerator};
pub use retry::{RetryPolicy, Retrying};

pub fn build_embedder(config: &ProviderConfig) -> Result<Box<dyn EmbeddingProvider>, ProviderError> {
    if fake_embeddings_enabled() {
        info!("using HashEmbedder (APP_USE_FAKE_EMBEDDINGS)");
        return Ok(Box::new(HashEmbedder::default()));
    }
    let embedder = OpenAiEmbedder::new(config)?;
    info!(id = embedder.embedder_id(), "using remote embedder");
    Ok(Box::new(Retrying::new(embedder, RetryPolicy::from_config(config))))
}

pub fn build_generator(config: &ProviderConfig) -> Result<Box<dyn GenerationProvider>, ProviderError> {
    let generator = OpenAiGenerator::new(config)?;
    info!(model = %config.generation_model, "using remote generator");
    Ok(Box::new(Retrying::new(generator, RetryPolicy::from_config(config))))
}
