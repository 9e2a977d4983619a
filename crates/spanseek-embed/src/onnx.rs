//! ONNX-based embedding backend using all-MiniLM-L6-v2.
//!
//! Loads a SentenceTransformers ONNX export plus its HuggingFace tokenizer
//! and produces 384-dimensional float32 embeddings. Requires the `onnx`
//! feature; with `load-dynamic`, `ORT_DYLIB_PATH` must point at
//! `libonnxruntime`.

#[cfg(feature = "onnx")]
mod inner {
    use std::path::Path;
    use std::sync::Arc;

    use ndarray::Array1;
    use ort::session::Session;
    use ort::value::Tensor;
    use parking_lot::Mutex;
    use tokenizers::Tokenizer;
    use tracing::info;

    use spanseek_core::{Error, Result};

    use crate::backend::EmbedderBackend;

    /// Maximum sequence length for the model.
    const MAX_SEQ_LEN: usize = 512;

    /// Embedding dimension of all-MiniLM-L6-v2.
    const DIM: usize = 384;

    const MODEL_NAME: &str = "all-MiniLM-L6-v2";

    pub struct OnnxEmbedder {
        session: Arc<Mutex<Session>>,
        tokenizer: Tokenizer,
    }

    impl OnnxEmbedder {
        /// Load `model.onnx` and `tokenizer.json` from a model directory.
        pub fn load(model_dir: &Path) -> Result<Self> {
            let model_path = model_dir.join("model.onnx");
            let tokenizer_path = model_dir.join("tokenizer.json");

            if !model_path.exists() {
                return Err(Error::Embedding(format!(
                    "model not found: {}",
                    model_path.display()
                )));
            }
            if !tokenizer_path.exists() {
                return Err(Error::Embedding(format!(
                    "tokenizer not found: {}",
                    tokenizer_path.display()
                )));
            }

            ort::init().commit();

            let session = Session::builder()
                .map_err(|e| Error::Embedding(format!("session builder: {e}")))?
                .with_intra_threads(2)
                .map_err(|e| Error::Embedding(format!("set threads: {e}")))?
                .commit_from_file(&model_path)
                .map_err(|e| Error::Embedding(format!("load model: {e}")))?;

            let tokenizer = Tokenizer::from_file(&tokenizer_path)
                .map_err(|e| Error::Embedding(format!("load tokenizer: {e}")))?;

            info!(dim = DIM, model = %model_path.display(), "ONNX embedder loaded");

            Ok(Self {
                session: Arc::new(Mutex::new(session)),
                tokenizer,
            })
        }

        fn infer(&self, text: &str) -> Result<Array1<f32>> {
            let encoding = self
                .tokenizer
                .encode(text, true)
                .map_err(|e| Error::Embedding(format!("tokenization failed: {e}")))?;

            let input_ids = encoding.get_ids();
            let attention_mask = encoding.get_attention_mask();

            let seq_len = input_ids.len().min(MAX_SEQ_LEN);
            let input_ids = &input_ids[..seq_len];
            let attention_mask = &attention_mask[..seq_len];

            let ids_data: Vec<i64> = input_ids.iter().map(|&id| id as i64).collect();
            let mask_data: Vec<i64> = attention_mask.iter().map(|&m| m as i64).collect();
            let type_ids_data: Vec<i64> = vec![0i64; seq_len];

            let ids_tensor = Tensor::from_array(([1usize, seq_len], ids_data))
                .map_err(|e| Error::Embedding(format!("ids tensor: {e}")))?;
            let mask_tensor = Tensor::from_array(([1usize, seq_len], mask_data))
                .map_err(|e| Error::Embedding(format!("mask tensor: {e}")))?;
            let type_ids_tensor = Tensor::from_array(([1usize, seq_len], type_ids_data))
                .map_err(|e| Error::Embedding(format!("type_ids tensor: {e}")))?;

            let mut session = self.session.lock();
            let outputs = session
                .run(ort::inputs![ids_tensor, mask_tensor, type_ids_tensor])
                .map_err(|e| Error::Embedding(format!("inference failed: {e}")))?;

            // SentenceTransformers exports output either token embeddings
            // [1, seq_len, dim] (need mean pooling) or an already pooled
            // sentence embedding [1, dim].
            let (shape, data) = outputs[0]
                .try_extract_tensor::<f32>()
                .map_err(|e| Error::Embedding(format!("extract output: {e}")))?;
            let dims: Vec<i64> = shape.iter().copied().collect();

            let embedding = if dims.len() == 3 {
                let dim = dims[2] as usize;
                let mask_f32: Vec<f32> = attention_mask.iter().map(|&m| m as f32).collect();
                let mask_sum: f32 = mask_f32.iter().sum();
                if mask_sum < 1e-9 {
                    return Err(Error::Embedding("empty attention mask".into()));
                }

                let mut pooled = Array1::zeros(dim);
                for (i, &m) in mask_f32.iter().enumerate() {
                    if m > 0.0 {
                        let offset = i * dim;
                        for d in 0..dim {
                            pooled[d] += data[offset + d] * m;
                        }
                    }
                }
                pooled / mask_sum
            } else if dims.len() == 2 {
                let dim = dims[1] as usize;
                Array1::from_vec(data[..dim].to_vec())
            } else {
                return Err(Error::Embedding(format!("unexpected output shape: {dims:?}")));
            };

            let norm = embedding.dot(&embedding).sqrt();
            Ok(if norm > 0.0 { embedding / norm } else { embedding })
        }
    }

    impl EmbedderBackend for OnnxEmbedder {
        fn embed(&self, text: &str) -> Result<Array1<f32>> {
            self.infer(text)
        }

        fn dimension(&self) -> usize {
            DIM
        }

        fn model_name(&self) -> &str {
            MODEL_NAME
        }
    }
}

#[cfg(feature = "onnx")]
pub use inner::OnnxEmbedder;
