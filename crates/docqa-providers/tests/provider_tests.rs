use docqa_core::config::ProviderConfig;
use docqa_core::error::ProviderError;
use docqa_core::traits::EmbeddingProvider;
use docqa_providers::{build_generator, HashEmbedder, RetryPolicy, Retrying};

#[test]
fn generator_requires_api_key() {
    let config = ProviderConfig { api_key: None, ..ProviderConfig::default() };
    assert!(matches!(build_generator(&config), Err(ProviderError::MissingApiKey { .. })));
}

#[test]
fn generator_builds_with_key() {
    let config = ProviderConfig { api_key: Some("sk-test".into()), ..ProviderConfig::default() };
    assert!(build_generator(&config).is_ok());
}

#[test]
fn retrying_preserves_embedder_identity_and_output() {
    let plain = HashEmbedder::new(32);
    let wrapped = Retrying::new(HashEmbedder::new(32), RetryPolicy::none());
    assert_eq!(wrapped.embedder_id(), plain.embedder_id());
    let texts = vec!["alpha beta".to_string(), "gamma".to_string()];
    assert_eq!(wrapped.embed_batch(&texts).unwrap(), plain.embed_batch(&texts).unwrap());
}
