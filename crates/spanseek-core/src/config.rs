//! Configuration and data directory management.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::tokenize::TokenizerConfig;

/// Paths to all spanseek data directories.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DataPaths {
    /// Root data directory (e.g., `data/`).
    pub root: PathBuf,
    /// Raw datasets, one subdirectory per dataset (`data/datasets/`).
    pub datasets: PathBuf,
    /// Processed artifact sets keyed by fingerprint (`data/processed/`).
    pub processed: PathBuf,
    /// Ground truth files, one per dataset (`data/ground_truth/`).
    pub ground_truth: PathBuf,
    /// Evaluation run reports (`data/results/`).
    pub results: PathBuf,
}

impl DataPaths {
    /// Create data paths from a root directory. Creates directories if needed.
    pub fn new(root: impl AsRef<Path>) -> std::io::Result<Self> {
        let root = root.as_ref().to_path_buf();
        let paths = Self {
            datasets: root.join("datasets"),
            processed: root.join("processed"),
            ground_truth: root.join("ground_truth"),
            results: root.join("results"),
            root,
        };
        paths.ensure_dirs()?;
        Ok(paths)
    }

    /// Directory holding the artifact set for one fingerprint.
    pub fn fingerprint_dir(&self, fingerprint: &str) -> PathBuf {
        self.processed.join(fingerprint)
    }

    /// Append-only fingerprint → config-string trace record.
    pub fn trace_record_file(&self) -> PathBuf {
        self.processed.join("fingerprints.json")
    }

    /// Ground truth file for a dataset.
    pub fn ground_truth_file(&self, dataset: &str) -> PathBuf {
        self.ground_truth.join(format!("{dataset}.json"))
    }

    /// Create all required directories.
    fn ensure_dirs(&self) -> std::io::Result<()> {
        std::fs::create_dir_all(&self.datasets)?;
        std::fs::create_dir_all(&self.processed)?;
        std::fs::create_dir_all(&self.ground_truth)?;
        std::fs::create_dir_all(&self.results)?;
        Ok(())
    }
}

fn default_weights() -> [f32; 2] {
    [0.5, 0.5]
}

fn default_top_k() -> usize {
    5
}

/// Configuration for one processing + retrieval run.
///
/// `splitting_method`, `embedding_model`, `cleaning_method`, and
/// `split_filtering` determine index content and feed the fingerprint.
/// `semantic_vs_keyword_weights` and `top_k` are query-time parameters and
/// never trigger reprocessing.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RunConfig {
    /// Chunking strategies, applied independently and concatenated
    /// (`by_sentence`, `recursive_split`).
    pub splitting_method: Vec<String>,
    /// Embedding model name (e.g., `hash-384`, `all-MiniLM-L6-v2`).
    pub embedding_model: String,
    /// Lexical cleaning steps (`no_cleaning`, `stopword_removal`, `stemming`).
    #[serde(default)]
    pub cleaning_method: Vec<String>,
    /// Chunk filtering steps (`no_filtering`, `usefulness_filter`).
    #[serde(default)]
    pub split_filtering: Vec<String>,
    /// `[semantic, keyword]` fusion weights.
    #[serde(default = "default_weights")]
    pub semantic_vs_keyword_weights: [f32; 2],
    /// Results fetched from each index per query.
    #[serde(default = "default_top_k")]
    pub top_k: usize,
}

impl RunConfig {
    /// Load a config from a JSON file, validating required fields.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let raw = std::fs::read_to_string(path.as_ref())?;
        let config: Self = serde_json::from_str(&raw)?;
        config.validate()?;
        Ok(config)
    }

    /// Fail fast on configurations that would silently change the
    /// fingerprint or skip whole pipeline stages.
    pub fn validate(&self) -> Result<()> {
        if self.embedding_model.trim().is_empty() {
            return Err(Error::Config(
                "embedding_model is required and may not be empty".into(),
            ));
        }
        if self.splitting_method.is_empty() {
            return Err(Error::Config(
                "splitting_method requires at least one strategy".into(),
            ));
        }
        Ok(())
    }

    pub fn semantic_weight(&self) -> f32 {
        self.semantic_vs_keyword_weights[0]
    }

    pub fn keyword_weight(&self) -> f32 {
        self.semantic_vs_keyword_weights[1]
    }

    /// Whether the post-split usefulness filter is active.
    pub fn filtering_enabled(&self) -> bool {
        !self
            .split_filtering
            .iter()
            .any(|f| f == "no_filtering")
    }

    /// Derive the lexical tokenizer configuration from `cleaning_method`.
    ///
    /// The tokenizer is constructed once per run from this value and
    /// injected into both indexing and querying, so the two sides can
    /// never drift apart.
    pub fn tokenizer_config(&self) -> TokenizerConfig {
        if self.cleaning_method.iter().any(|c| c == "no_cleaning") {
            return TokenizerConfig {
                remove_stopwords: false,
                stem: false,
            };
        }
        TokenizerConfig {
            remove_stopwords: self.cleaning_method.iter().any(|c| c == "stopword_removal"),
            stem: self.cleaning_method.iter().any(|c| c == "stemming"),
        }
    }
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            splitting_method: vec!["recursive_split".into()],
            embedding_model: "hash-384".into(),
            cleaning_method: vec!["no_cleaning".into()],
            split_filtering: vec!["no_filtering".into()],
            semantic_vs_keyword_weights: default_weights(),
            top_k: default_top_k(),
        }
    }
}
