//! Embedding backend trait and model registry.

use ndarray::Array1;

use spanseek_core::{Error, Result};

use crate::hashing::HashEmbedder;

/// Trait for embedding backends.
///
/// Contract with the rest of the pipeline: `embed` is a pure function of
/// the input text for a given model, and the backend used at query time
/// must be the one (by `model_name`) used at index time.
pub trait EmbedderBackend: Send + Sync {
    /// Generate a fixed-dimension embedding for a text string.
    fn embed(&self, text: &str) -> Result<Array1<f32>>;

    /// Generate embeddings for a batch of texts.
    fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Array1<f32>>> {
        texts.iter().map(|t| self.embed(t)).collect()
    }

    /// The embedding dimension.
    fn dimension(&self) -> usize;

    /// Model name as used in processing fingerprints.
    fn model_name(&self) -> &str;
}

/// Look up an embedding backend by model name.
///
/// Unsupported names fail fast: silently substituting a different model
/// would change index content without changing the fingerprint.
pub fn create_backend(model_name: &str) -> Result<Box<dyn EmbedderBackend>> {
    match model_name {
        "hash-384" => {
            tracing::debug!(model = model_name, "using feature-hashing embedder");
            Ok(Box::new(HashEmbedder::new(384)))
        }
        #[cfg(feature = "onnx")]
        "all-MiniLM-L6-v2" => {
            let model_dir = std::env::var("SPANSEEK_MODEL_DIR").map_err(|_| {
                Error::Config("SPANSEEK_MODEL_DIR must point at the ONNX model directory".into())
            })?;
            let embedder = crate::onnx::OnnxEmbedder::load(std::path::Path::new(&model_dir))?;
            Ok(Box::new(embedder))
        }
        other => Err(Error::Config(format!("unsupported embedding model: {other}"))),
    }
}
