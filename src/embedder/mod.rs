//! Embedding capability: the `Embedder` trait plus vector math shared
//! across the crate (link-building, retrieval, dedupe all compare
//! embeddings the same way).

mod local;

pub use local::LocalEmbedder;

use crate::error::{MemoryError, Result};

/// Capability trait for turning text into a fixed-dimension embedding.
///
/// Out of scope as a concrete model choice; [`LocalEmbedder`] is the
/// offline default, but production deployments are expected to supply
/// their own implementation (a remote embedding API, a different local
/// model, etc).
pub trait Embedder: Send + Sync {
    fn embed(&self, text: &str) -> Result<Vec<f32>>;
    fn dimensions(&self) -> usize;
}

/// Truncate a Matryoshka-capable embedding to `target_dims` and re-normalize.
///
/// The first N dimensions of a Matryoshka-trained embedding ARE a valid
/// N-dimensional representation; truncating and renormalizing loses very
/// little quality relative to the storage saved.
#[inline]
pub fn truncate_to_dims(mut vector: Vec<f32>, target_dims: usize) -> Vec<f32> {
    if vector.len() > target_dims {
        vector.truncate(target_dims);
    }
    let norm = vector.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm > 0.0 {
        for x in &mut vector {
            *x /= norm;
        }
    }
    vector
}

#[inline]
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() {
        return 0.0;
    }
    let mut dot = 0.0_f32;
    let mut norm_a = 0.0_f32;
    let mut norm_b = 0.0_f32;
    for (x, y) in a.iter().zip(b.iter()) {
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }
    let denom = (norm_a * norm_b).sqrt();
    if denom > 0.0 {
        dot / denom
    } else {
        0.0
    }
}

pub fn validate_dimensions(vector: &[f32], expected: usize) -> Result<()> {
    if vector.len() != expected {
        return Err(MemoryError::InvalidInput(format!(
            "embedding dimension mismatch: expected {expected}, got {}",
            vector.len()
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cosine_identical() {
        let a = vec![1.0, 2.0, 3.0];
        assert!((cosine_similarity(&a, &a) - 1.0).abs() < 1e-4);
    }

    #[test]
    fn cosine_orthogonal() {
        let a = vec![1.0, 0.0];
        let b = vec![0.0, 1.0];
        assert!(cosine_similarity(&a, &b).abs() < 1e-4);
    }

    #[test]
    fn truncate_renormalizes() {
        let v = vec![3.0, 4.0, 0.0, 0.0];
        let t = truncate_to_dims(v, 2);
        assert_eq!(t.len(), 2);
        let norm = t.iter().map(|x| x * x).sum::<f32>().sqrt();
        assert!((norm - 1.0).abs() < 1e-4);
    }
}
