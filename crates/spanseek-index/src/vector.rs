//! Vector index over chunk embeddings, angular distance metric.
//!
//! Lifecycle is insert → build → query: `build()` must be called once
//! after all adds, and querying an unbuilt index is a state error rather
//! than a silent empty result. `save`/`load` persist the index under the
//! fingerprint directory.

use std::path::Path;

use ndarray::Array1;
use serde::{Deserialize, Serialize};

use spanseek_core::{ChunkId, Error, Result};

#[derive(Debug, Serialize, Deserialize)]
pub struct VectorIndex {
    dim: usize,
    ids: Vec<ChunkId>,
    vectors: Vec<Vec<f32>>,
    built: bool,
}

impl VectorIndex {
    pub fn new(dim: usize) -> Self {
        Self {
            dim,
            ids: Vec::new(),
            vectors: Vec::new(),
            built: false,
        }
    }

    /// Insert an embedding. Fails after `build()` — the index is
    /// immutable once finalized.
    pub fn add(&mut self, id: ChunkId, vector: &Array1<f32>) -> Result<()> {
        if self.built {
            return Err(Error::State("cannot add to a built vector index".into()));
        }
        if vector.len() != self.dim {
            return Err(Error::Index(format!(
                "dimension mismatch: index is {}, vector is {}",
                self.dim,
                vector.len()
            )));
        }
        self.ids.push(id);
        self.vectors.push(vector.to_vec());
        Ok(())
    }

    /// Finalize the index. Vectors are L2-normalized in place so angular
    /// distance reduces to a dot product at query time.
    pub fn build(&mut self) {
        for v in &mut self.vectors {
            let norm = v.iter().map(|x| x * x).sum::<f32>().sqrt();
            if norm > 0.0 {
                for x in v.iter_mut() {
                    *x /= norm;
                }
            }
        }
        self.built = true;
    }

    /// K nearest chunks by angular distance, closest first. Ties break on
    /// ascending chunk ID for determinism.
    pub fn query_knn(&self, query: &Array1<f32>, k: usize) -> Result<(Vec<ChunkId>, Vec<f32>)> {
        if !self.built {
            return Err(Error::State(
                "vector index queried before build() was called".into(),
            ));
        }
        if query.len() != self.dim {
            return Err(Error::Index(format!(
                "dimension mismatch: index is {}, query is {}",
                self.dim,
                query.len()
            )));
        }

        let qnorm = query.dot(query).sqrt();
        let mut hits: Vec<(ChunkId, f32)> = self
            .ids
            .iter()
            .zip(&self.vectors)
            .map(|(&id, v)| {
                let cos = if qnorm > 0.0 {
                    v.iter().zip(query.iter()).map(|(a, b)| a * b).sum::<f32>() / qnorm
                } else {
                    0.0
                };
                // Angular distance: sqrt(2 - 2cos), clamped against float
                // noise pushing 2-2cos slightly negative.
                (id, (2.0 - 2.0 * cos).max(0.0).sqrt())
            })
            .collect();

        hits.sort_by(|a, b| {
            a.1.partial_cmp(&b.1)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then(a.0.cmp(&b.0))
        });
        hits.truncate(k);

        Ok(hits.into_iter().unzip())
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let file = std::fs::File::create(path)?;
        serde_json::to_writer(std::io::BufWriter::new(file), self)?;
        Ok(())
    }

    pub fn load(path: &Path) -> Result<Self> {
        let file = std::fs::File::open(path)?;
        let index: Self = serde_json::from_reader(std::io::BufReader::new(file))?;
        Ok(index)
    }

    pub fn dimension(&self) -> usize {
        self.dim
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// IDs in insertion order.
    pub fn ids(&self) -> &[ChunkId] {
        &self.ids
    }
}
