use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

use crate::error::AppError;

/// `embed_batch(texts) -> [vector]`: returns vectors of uniform length `D`,
/// deterministic up to numeric tolerance.
pub trait Embedder: Send + Sync {
    /// Output vector length `D`. Fixed for the lifetime of the embedder.
    fn dims(&self) -> usize;

    fn embed(&self, text: &str) -> Result<Vec<f32>, AppError>;

    /// Default batch implementation calls `embed` once per text; real
    /// network-backed embedders should override this to issue one request.
    fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, AppError> {
        texts.iter().map(|text| self.embed(text)).collect()
    }
}

/// Deterministic hash-based stand-in for a real embedding model: a fixed
/// function of the input text, not a trained model. Two calls with the same
/// text always produce the same vector.
#[derive(Debug, Clone, Copy)]
pub struct HashingEmbedder {
    dims: usize,
}

impl HashingEmbedder {
    pub fn new(dims: usize) -> Self {
        Self { dims }
    }
}

impl Default for HashingEmbedder {
    fn default() -> Self {
        Self::new(16)
    }
}

impl Embedder for HashingEmbedder {
    fn dims(&self) -> usize {
        self.dims
    }

    fn embed(&self, text: &str) -> Result<Vec<f32>, AppError> {
        let mut out = Vec::with_capacity(self.dims);
        for i in 0..self.dims {
            let mut hasher = DefaultHasher::new();
            text.hash(&mut hasher);
            i.hash(&mut hasher);
            let bits = hasher.finish();
            let unit = bits as f64 / u64::MAX as f64;
            out.push((unit * 2.0 - 1.0) as f32);
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_text_same_vector() {
        let embedder = HashingEmbedder::new(8);
        assert_eq!(embedder.embed("alpha").unwrap(), embedder.embed("alpha").unwrap());
    }

    #[test]
    fn different_text_different_vector() {
        let embedder = HashingEmbedder::new(8);
        assert_ne!(embedder.embed("alpha").unwrap(), embedder.embed("beta").unwrap());
    }

    #[test]
    fn vectors_have_configured_dims() {
        let embedder = HashingEmbedder::new(5);
        assert_eq!(embedder.embed("x").unwrap().len(), 5);
    }
}
