//! Processing fingerprints — content-addressed cache keys.
//!
//! A fingerprint hashes exactly the configuration subset that determines
//! index content: dataset name, splitting methods, embedding model,
//! cleaning method, and split filtering. Fusion weights and `top_k` are
//! query-time parameters and deliberately excluded, so tuning them never
//! triggers a rebuild.

use sha2::{Digest, Sha256};

use crate::config::RunConfig;

/// A deterministic hash of the config subset that affects processing output.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Fingerprint {
    hash: String,
    canonical: String,
}

impl Fingerprint {
    /// Compute the fingerprint for a dataset + config pair.
    ///
    /// Pure and deterministic: list-valued fields are sorted before
    /// hashing, so equivalent configs expressed in different orders
    /// collapse to the same fingerprint.
    pub fn compute(dataset_name: &str, config: &RunConfig) -> Self {
        let canonical = Self::canonical_string(dataset_name, config);
        let mut hasher = Sha256::new();
        hasher.update(canonical.as_bytes());
        let hash = hex::encode(hasher.finalize());
        Self { hash, canonical }
    }

    /// The human-readable string the hash was derived from, kept for
    /// traceability records.
    pub fn canonical(&self) -> &str {
        &self.canonical
    }

    pub fn as_str(&self) -> &str {
        &self.hash
    }

    fn canonical_string(dataset_name: &str, config: &RunConfig) -> String {
        let mut methods = config.splitting_method.clone();
        methods.sort();
        let mut cleaning = config.cleaning_method.clone();
        cleaning.sort();
        let mut filtering = config.split_filtering.clone();
        filtering.sort();

        [
            dataset_name.to_string(),
            methods.join(","),
            config.embedding_model.clone(),
            cleaning.join(","),
            filtering.join(","),
        ]
        .join("__")
    }
}

impl std::fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.hash)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fingerprint_is_deterministic() {
        let config = RunConfig::default();
        let a = Fingerprint::compute("squad", &config);
        let b = Fingerprint::compute("squad", &config);
        assert_eq!(a, b);
    }

    #[test]
    fn test_list_order_is_canonicalized() {
        let mut a = RunConfig::default();
        a.splitting_method = vec!["recursive_split".into(), "by_sentence".into()];
        let mut b = RunConfig::default();
        b.splitting_method = vec!["by_sentence".into(), "recursive_split".into()];

        assert_eq!(
            Fingerprint::compute("squad", &a),
            Fingerprint::compute("squad", &b)
        );
    }

    #[test]
    fn test_fusion_weights_do_not_change_fingerprint() {
        let a = RunConfig::default();
        let b = RunConfig {
            semantic_vs_keyword_weights: [0.9, 0.1],
            top_k: 20,
            ..a.clone()
        };
        assert_eq!(
            Fingerprint::compute("squad", &a),
            Fingerprint::compute("squad", &b)
        );
    }

    #[test]
    fn test_different_dataset_changes_fingerprint() {
        let config = RunConfig::default();
        assert_ne!(
            Fingerprint::compute("squad", &config),
            Fingerprint::compute("mitosis", &config)
        );
    }

    #[test]
    fn test_embedding_model_changes_fingerprint() {
        let a = RunConfig::default();
        let b = RunConfig {
            embedding_model: "all-MiniLM-L6-v2".into(),
            ..a.clone()
        };
        assert_ne!(
            Fingerprint::compute("squad", &a),
            Fingerprint::compute("squad", &b)
        );
    }
}
