//! spanseek Query — hybrid retrieval with weighted score fusion.
//!
//! A query runs both streams against one artifact set: the vector index
//! for semantic similarity and BM25 for lexical match. The ranker
//! normalizes each stream to `[0, 1]`, outer-joins by chunk ID, and sorts
//! by the weighted sum.

pub mod ranker;
pub mod runner;

pub use ranker::{rank, RankedHit};
pub use runner::{HitStream, QueryRunner};
