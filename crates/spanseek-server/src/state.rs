//! Shared application state.

use std::collections::{BTreeMap, BTreeSet};

use spanseek_core::{ChunkId, ChunkMeta, Fingerprint, RunConfig};
use spanseek_query::QueryRunner;

/// Shared application state accessible from all route handlers.
pub struct AppState {
    pub dataset_name: String,
    pub config: RunConfig,
    pub fingerprint: Fingerprint,
    pub runner: QueryRunner,
    /// Chunk metadata mapping for hydrating search results.
    pub chunks: BTreeMap<ChunkId, ChunkMeta>,
}

impl AppState {
    pub fn new(
        dataset_name: String,
        config: RunConfig,
        fingerprint: Fingerprint,
        runner: QueryRunner,
        chunks: BTreeMap<ChunkId, ChunkMeta>,
    ) -> Self {
        Self {
            dataset_name,
            config,
            fingerprint,
            runner,
            chunks,
        }
    }

    pub fn document_count(&self) -> usize {
        self.chunks
            .values()
            .map(|meta| meta.location.as_str())
            .collect::<BTreeSet<_>>()
            .len()
    }
}
