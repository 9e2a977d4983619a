//! spanseek Embed — embedding backends and the query-embedding cache.
//!
//! `EmbedderBackend` abstracts over embedding generation. The default
//! `HashEmbedder` is fully deterministic and needs no model files; with
//! the `onnx` feature enabled, `all-MiniLM-L6-v2` can be loaded from a
//! model directory. The same backend (identified by its model name, which
//! feeds the processing fingerprint) must be used at index and query time.

pub mod backend;
pub mod cache;
pub mod hashing;
pub mod onnx;

pub use backend::{create_backend, EmbedderBackend};
pub use cache::EmbedCache;
pub use hashing::HashEmbedder;

#[cfg(feature = "onnx")]
pub use onnx::OnnxEmbedder;
