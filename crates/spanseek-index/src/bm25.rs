//! Okapi BM25 over tokenized chunks.
//!
//! Built once over the entire token collection — idf needs corpus-wide
//! document frequencies, so the index cannot be grown incrementally.
//! `scores` returns a relevance score for *every* indexed chunk; top-K
//! selection happens at the query layer.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

const K1: f32 = 1.5;
const B: f32 = 0.75;
/// Floor factor for terms so common their raw idf goes negative.
const EPSILON: f32 = 0.25;

#[derive(Debug, Serialize, Deserialize)]
pub struct Bm25Index {
    /// Term frequencies per chunk.
    term_freqs: Vec<HashMap<String, u32>>,
    /// Token count per chunk.
    doc_lens: Vec<u32>,
    avg_doc_len: f32,
    idf: HashMap<String, f32>,
}

impl Bm25Index {
    /// Build the index over one token sequence per chunk, in chunk-ID
    /// order (chunk `i` of the collection is scored at position `i`).
    pub fn build(token_seqs: &[Vec<String>]) -> Self {
        let corpus_size = token_seqs.len();
        let mut term_freqs = Vec::with_capacity(corpus_size);
        let mut doc_lens = Vec::with_capacity(corpus_size);
        let mut doc_freqs: HashMap<String, u32> = HashMap::new();

        for tokens in token_seqs {
            doc_lens.push(tokens.len() as u32);
            let mut tf: HashMap<String, u32> = HashMap::new();
            for token in tokens {
                *tf.entry(token.clone()).or_insert(0) += 1;
            }
            for term in tf.keys() {
                *doc_freqs.entry(term.clone()).or_insert(0) += 1;
            }
            term_freqs.push(tf);
        }

        let total_len: u64 = doc_lens.iter().map(|&l| l as u64).sum();
        let avg_doc_len = if corpus_size > 0 {
            total_len as f32 / corpus_size as f32
        } else {
            0.0
        };

        // Okapi idf, with negative values floored to epsilon * average idf
        // (the rank-bm25 convention).
        let n = corpus_size as f32;
        let mut idf: HashMap<String, f32> = HashMap::with_capacity(doc_freqs.len());
        let mut idf_sum = 0.0f32;
        let mut negative: Vec<String> = Vec::new();
        for (term, df) in &doc_freqs {
            let df = *df as f32;
            let value = ((n - df + 0.5) / (df + 0.5)).ln();
            idf_sum += value;
            if value < 0.0 {
                negative.push(term.clone());
            }
            idf.insert(term.clone(), value);
        }
        let average_idf = if idf.is_empty() {
            0.0
        } else {
            idf_sum / idf.len() as f32
        };
        for term in negative {
            idf.insert(term, EPSILON * average_idf);
        }

        Self {
            term_freqs,
            doc_lens,
            avg_doc_len,
            idf,
        }
    }

    /// BM25 scores for the query against every indexed chunk, in chunk-ID
    /// order.
    pub fn scores(&self, query_tokens: &[String]) -> Vec<f32> {
        let mut scores = vec![0.0f32; self.term_freqs.len()];
        if self.avg_doc_len <= 0.0 {
            return scores;
        }

        for term in query_tokens {
            let Some(&idf) = self.idf.get(term) else {
                continue;
            };
            for (i, tf_map) in self.term_freqs.iter().enumerate() {
                let Some(&tf) = tf_map.get(term) else {
                    continue;
                };
                let tf = tf as f32;
                let len_norm = 1.0 - B + B * self.doc_lens[i] as f32 / self.avg_doc_len;
                scores[i] += idf * tf * (K1 + 1.0) / (tf + K1 * len_norm);
            }
        }
        scores
    }

    pub fn len(&self) -> usize {
        self.term_freqs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.term_freqs.is_empty()
    }
}
