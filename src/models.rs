//! Model collaborator traits
//!
//! The pipeline talks to two external models: an embedding model that maps
//! text to fixed-dimension vectors, and a generative model used for
//! structured entity extraction. Both are behind traits so deployments can
//! plug in hosted APIs while tests use scripted implementations.
//!
//! A model call failing is never fatal to extraction: the caller degrades
//! that strategy's contribution to empty and continues.

use anyhow::Result;
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

/// Trait for embedding generation
pub trait Embedder: Send + Sync {
    /// Generate an embedding for text
    fn embed(&self, text: &str) -> Result<Vec<f32>>;

    /// Get embedding dimension
    fn dimension(&self) -> usize;
}

/// Trait for generative completion
///
/// `complete` is expected to return text containing a JSON array of
/// `{text, type, relevance}` objects; no schema is enforced beyond
/// best-effort parsing on the caller's side.
pub trait GenerativeModel: Send + Sync {
    /// Run a completion for the given prompt
    fn complete(&self, prompt: &str) -> Result<String>;
}

/// Deterministic token-hash embedder
///
/// Offline fallback when no hosted embedding model is configured. Each
/// whitespace token is hashed into a bucket of the output vector, which is
/// then L2-normalized. Not semantically meaningful, but stable across runs
/// and good enough for exact/near-duplicate lookup and for tests.
pub struct HashEmbedder {
    dimension: usize,
}

impl HashEmbedder {
    pub fn new(dimension: usize) -> Self {
        Self { dimension }
    }
}

impl Embedder for HashEmbedder {
    fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let mut vector = vec![0.0f32; self.dimension];

        for token in text.to_lowercase().split_whitespace() {
            let mut hasher = DefaultHasher::new();
            token.hash(&mut hasher);
            let h = hasher.finish();

            let bucket = (h % self.dimension as u64) as usize;
            // Sign bit from a high bit of the hash spreads tokens across
            // both directions, reducing collisions into pure magnitude.
            let sign = if h & (1 << 63) == 0 { 1.0 } else { -1.0 };
            vector[bucket] += sign;
        }

        let norm: f32 = vector.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm > 0.0 {
            for x in &mut vector {
                *x /= norm;
            }
        }

        Ok(vector)
    }

    fn dimension(&self) -> usize {
        self.dimension
    }
}
