//! Deterministic feature-hashing embedder.
//!
//! Maps character trigrams of the normalized text into a fixed-dimension
//! vector with a stable FNV-1a hash, then L2-normalizes. Not a learned
//! model, but deterministic across processes and Rust versions, which is
//! what a content-addressed artifact cache needs from its default backend.

use ndarray::Array1;

use spanseek_core::Result;

use crate::backend::EmbedderBackend;

/// Character n-gram width.
const NGRAM: usize = 3;

pub struct HashEmbedder {
    dim: usize,
    name: String,
}

impl HashEmbedder {
    pub fn new(dim: usize) -> Self {
        Self {
            name: format!("hash-{dim}"),
            dim,
        }
    }
}

impl EmbedderBackend for HashEmbedder {
    fn embed(&self, text: &str) -> Result<Array1<f32>> {
        let mut vector = Array1::<f32>::zeros(self.dim);
        let chars: Vec<char> = text.to_lowercase().chars().collect();

        if chars.len() >= NGRAM {
            let mut buf = String::with_capacity(NGRAM * 4);
            for window in chars.windows(NGRAM) {
                buf.clear();
                buf.extend(window.iter());
                let h = fnv1a_64(buf.as_bytes());
                let idx = (h % self.dim as u64) as usize;
                // One hash bit decides the sign so features roughly cancel
                // instead of all accumulating positive mass.
                let sign = if h & (1 << 63) == 0 { 1.0 } else { -1.0 };
                vector[idx] += sign;
            }
        }

        let norm = vector.dot(&vector).sqrt();
        if norm > 0.0 {
            vector.mapv_inplace(|v| v / norm);
        }
        Ok(vector)
    }

    fn dimension(&self) -> usize {
        self.dim
    }

    fn model_name(&self) -> &str {
        &self.name
    }
}

/// 64-bit FNV-1a. Stable across platforms and versions, unlike the std
/// `DefaultHasher`.
fn fnv1a_64(bytes: &[u8]) -> u64 {
    const OFFSET: u64 = 0xcbf2_9ce4_8422_2325;
    const PRIME: u64 = 0x0000_0100_0000_01b3;
    let mut hash = OFFSET;
    for &b in bytes {
        hash ^= b as u64;
        hash = hash.wrapping_mul(PRIME);
    }
    hash
}
