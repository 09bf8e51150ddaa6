//! Deterministic offline embedder.
//!
//! Each whitespace token is hashed into one of `dim` buckets and the result
//! is L2-normalized. Texts that share words land close together, which is
//! enough for development runs and tests without network access.

use std::hash::{Hash, Hasher};

use twox_hash::XxHash64;

use docqa_core::error::ProviderError;
use docqa_core::traits::EmbeddingProvider;

pub const DEFAULT_HASH_DIM: usize = 1024;

#[derive(Debug, Clone)]
pub struct HashEmbedder {
    dim: usize,
    id: String,
}

impl HashEmbedder {
    pub fn new(dim: usize) -> Self {
        let dim = dim.max(1);
        Self { dim, id: format!("hash:xxh64:d{dim}") }
    }

    pub fn dim(&self) -> usize { self.dim }
}

impl Default for HashEmbedder {
    fn default() -> Self { Self::new(DEFAULT_HASH_DIM) }
}

impl EmbeddingProvider for HashEmbedder {
    fn embedder_id(&self) -> &str { &self.id }

    fn embed(&self, text: &str) -> Result<Vec<f32>, ProviderError> {
        let mut v = vec![0f32; self.dim];
        for token in text.split_whitespace() {
            let token = token.to_lowercase();
            let mut hasher = XxHash64::with_seed(0);
            token.hash(&mut hasher);
            let h = hasher.finish();
            let idx = (h % self.dim as u64) as usize;
            let val = 0.5 + ((h >> 32) as u32) as f32 / u32::MAX as f32;
            v[idx] += val;
        }
        let norm = v.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm > 0.0 {
            for x in &mut v {
                *x /= norm;
            }
        }
        Ok(v)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dot(a: &[f32], b: &[f32]) -> f32 {
        a.iter().zip(b).map(|(x, y)| x * y).sum()
    }

    #[test]
    fn deterministic_and_normalized() {
        let e = HashEmbedder::new(64);
        let a = e.embed("The warranty expires in June.").unwrap();
        let b = e.embed("The warranty expires in June.").unwrap();
        assert_eq!(a, b);
        assert_eq!(a.len(), 64);
        assert!((dot(&a, &a) - 1.0).abs() < 1e-4);
    }

    #[test]
    fn shared_words_score_higher() {
        let e = HashEmbedder::default();
        let q = e.embed("when does the warranty expire").unwrap();
        let near = e.embed("the warranty expires in june").unwrap();
        let far = e.embed("bananas grow in tropical climates").unwrap();
        assert!(dot(&q, &near) > dot(&q, &far));
    }

    #[test]
    fn empty_text_is_zero_vector() {
        let e = HashEmbedder::new(8);
        assert_eq!(e.embed("   ").unwrap(), vec![0.0; 8]);
        assert_eq!(e.embedder_id(), "hash:xxh64:d8");
    }
}
