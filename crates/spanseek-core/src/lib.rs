//! spanseek Core — shared types, configuration, fingerprinting, tokenization.

pub mod config;
pub mod error;
pub mod fingerprint;
pub mod tokenize;
pub mod types;

pub use config::{DataPaths, RunConfig};
pub use error::{Error, Result};
pub use fingerprint::Fingerprint;
pub use tokenize::{LexicalTokenizer, TokenizerConfig};
pub use types::{Chunk, ChunkId, ChunkMeta, Document, Granularity};
