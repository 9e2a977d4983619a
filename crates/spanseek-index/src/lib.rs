//! spanseek Index — dual indexing and the processed-corpus artifact store.
//!
//! The processor turns a corpus into four persisted artifacts keyed by the
//! processing fingerprint: the chunk metadata mapping, run metadata, a
//! vector index over chunk embeddings, and a BM25 index over tokenized
//! chunk text. All three structures share one dense chunk-ID space.

pub mod artifacts;
pub mod bm25;
pub mod processor;
pub mod vector;

pub use artifacts::{ArtifactStore, RunMetadata};
pub use bm25::Bm25Index;
pub use processor::CorpusProcessor;
pub use vector::VectorIndex;
