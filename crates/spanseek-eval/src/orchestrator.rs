//! Configuration-grid expansion and batch evaluation.

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use spanseek_core::{DataPaths, Error, Result, RunConfig};
use spanseek_embed::create_backend;
use spanseek_index::{ArtifactStore, CorpusProcessor};
use spanseek_ingest::Corpus;
use spanseek_query::QueryRunner;

use crate::ground_truth::GroundTruthCase;
use crate::runner::{result_file_path, EvalRunner};

/// Default cap on combinable-option subset size. The power set is
/// exponential in the number of values, so the bound is explicit rather
/// than implied by the value count.
pub const DEFAULT_MAX_SUBSET_SIZE: usize = 3;

/// The space of configurations to sweep. Combinable options
/// (`splitting_method`, `cleaning_method`, `split_filtering`) expand to
/// every non-empty subset up to `max_subset_size`; the remaining options
/// contribute one value at a time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GridSpace {
    pub splitting_method: Vec<String>,
    pub embedding_model: Vec<String>,
    pub cleaning_method: Vec<String>,
    pub split_filtering: Vec<String>,
    pub semantic_vs_keyword_weights: Vec<[f32; 2]>,
    pub top_k: Vec<usize>,
    #[serde(default = "default_max_subset_size")]
    pub max_subset_size: usize,
}

fn default_max_subset_size() -> usize {
    DEFAULT_MAX_SUBSET_SIZE
}

/// Non-empty subsets of `values` with at most `max_size` elements, in a
/// deterministic order (by bitmask, so smaller indices vary fastest).
fn bounded_subsets(values: &[String], max_size: usize) -> Vec<Vec<String>> {
    let mut subsets = Vec::new();
    for mask in 1u32..(1u32 << values.len()) {
        if mask.count_ones() as usize > max_size {
            continue;
        }
        let subset: Vec<String> = values
            .iter()
            .enumerate()
            .filter(|(i, _)| mask & (1 << i) != 0)
            .map(|(_, v)| v.clone())
            .collect();
        subsets.push(subset);
    }
    subsets
}

impl GridSpace {
    /// Expand the space into concrete configurations via Cartesian
    /// product over all axes.
    pub fn expand(&self) -> Result<Vec<RunConfig>> {
        if self.splitting_method.is_empty()
            || self.embedding_model.is_empty()
            || self.cleaning_method.is_empty()
            || self.split_filtering.is_empty()
            || self.semantic_vs_keyword_weights.is_empty()
            || self.top_k.is_empty()
        {
            return Err(Error::Config("grid space has an empty option axis".into()));
        }
        if self.max_subset_size == 0 {
            return Err(Error::Config(
                "max_subset_size must be at least 1, a zero bound expands to no configs".into(),
            ));
        }
        if self
            .splitting_method
            .len()
            .max(self.cleaning_method.len())
            .max(self.split_filtering.len())
            > 16
        {
            return Err(Error::Config(
                "combinable option has too many values to expand".into(),
            ));
        }

        let splitting = bounded_subsets(&self.splitting_method, self.max_subset_size);
        let cleaning = bounded_subsets(&self.cleaning_method, self.max_subset_size);
        let filtering = bounded_subsets(&self.split_filtering, self.max_subset_size);

        let mut configs = Vec::new();
        for split in &splitting {
            for model in &self.embedding_model {
                for clean in &cleaning {
                    for filter in &filtering {
                        for weights in &self.semantic_vs_keyword_weights {
                            for k in &self.top_k {
                                configs.push(RunConfig {
                                    splitting_method: split.clone(),
                                    embedding_model: model.clone(),
                                    cleaning_method: clean.clone(),
                                    split_filtering: filter.clone(),
                                    semantic_vs_keyword_weights: *weights,
                                    top_k: *k,
                                });
                            }
                        }
                    }
                }
            }
        }
        Ok(configs)
    }
}

pub struct GridOrchestrator {
    paths: DataPaths,
}

impl GridOrchestrator {
    pub fn new(paths: DataPaths) -> Self {
        Self { paths }
    }

    /// Run every configuration in the space against the corpus and
    /// ground truth set. Configurations whose result file already exists
    /// are skipped, so re-invocation resumes an interrupted sweep.
    /// Returns the number of runs executed (not skipped).
    pub fn run(
        &self,
        corpus: &Corpus,
        cases: &[GroundTruthCase],
        space: &GridSpace,
    ) -> Result<usize> {
        let configs = space.expand()?;
        info!(configs = configs.len(), dataset = %corpus.dataset_name, "grid sweep starting");

        let store = ArtifactStore::new(self.paths.clone());
        let mut executed = 0usize;

        for config in &configs {
            let result_path = result_file_path(&self.paths, config);
            if result_path.exists() {
                continue;
            }
            if let Err(err) = self.run_one(&store, corpus, cases, config) {
                // One broken configuration must not sink the sweep.
                warn!(error = %err, ?config, "grid run failed, continuing");
                continue;
            }
            executed += 1;
        }

        info!(executed, skipped = configs.len() - executed, "grid sweep complete");
        Ok(executed)
    }

    fn run_one(
        &self,
        store: &ArtifactStore,
        corpus: &Corpus,
        cases: &[GroundTruthCase],
        config: &RunConfig,
    ) -> Result<()> {
        let embedder = create_backend(&config.embedding_model)?;
        let tokenizer = spanseek_core::LexicalTokenizer::new(config.tokenizer_config());

        let processor = CorpusProcessor::new(store, embedder.as_ref(), &tokenizer);
        let fingerprint = processor.process(corpus, config)?;

        let runner = QueryRunner::open(store, &fingerprint, config, embedder)?;
        let eval = EvalRunner::new(store, &runner);
        let report = eval.run(&corpus.dataset_name, config, &fingerprint, cases)?;
        eval.persist(&report)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    fn values(names: &[&str]) -> Vec<String> {
        names.iter().map(|n| n.to_string()).collect()
    }

    fn space() -> GridSpace {
        GridSpace {
            splitting_method: values(&["by_sentence", "recursive_split"]),
            embedding_model: values(&["hash-384"]),
            cleaning_method: values(&["no_cleaning"]),
            split_filtering: values(&["no_filtering"]),
            semantic_vs_keyword_weights: vec![[0.5, 0.5]],
            top_k: vec![5],
            max_subset_size: DEFAULT_MAX_SUBSET_SIZE,
        }
    }

    #[test]
    fn test_bounded_subsets_are_non_empty_and_capped() {
        let subsets = bounded_subsets(&values(&["a", "b", "c"]), 2);
        assert_eq!(subsets.len(), 6);
        assert!(subsets.iter().all(|s| !s.is_empty() && s.len() <= 2));
        assert!(subsets.contains(&values(&["a", "c"])));
        assert!(!subsets.contains(&values(&["a", "b", "c"])));
    }

    #[test]
    fn test_expand_combines_splitting_subsets() {
        let configs = space().expand().unwrap();
        // Subsets of two splitting methods: {a}, {b}, {a,b}.
        assert_eq!(configs.len(), 3);
        assert!(configs
            .iter()
            .any(|c| c.splitting_method == values(&["by_sentence", "recursive_split"])));
    }

    #[test]
    fn test_expand_cartesian_over_weights_and_top_k() {
        let mut grid = space();
        grid.semantic_vs_keyword_weights = vec![[0.5, 0.5], [0.8, 0.2]];
        grid.top_k = vec![3, 5];
        let configs = grid.expand().unwrap();
        assert_eq!(configs.len(), 3 * 2 * 2);
    }

    #[test]
    fn test_expand_rejects_empty_axes() {
        let mut grid = space();
        grid.embedding_model.clear();
        assert!(grid.expand().is_err());
    }

    #[test]
    fn test_expand_rejects_zero_subset_bound() {
        // A zero bound would pass the axis checks but expand to nothing,
        // making the sweep a silent no-op.
        let mut grid = space();
        grid.max_subset_size = 0;
        assert!(grid.expand().is_err());
    }

    #[test]
    fn test_grid_run_skips_completed_configs() {
        let dir = tempfile::tempdir().unwrap();
        let paths = DataPaths::new(dir.path()).unwrap();

        let mut docs = BTreeMap::new();
        docs.insert(
            "bio/anaphase.md".to_string(),
            "Sister chromatids separate during anaphase. Spindle fibers shorten."
                .to_string(),
        );
        let corpus = Corpus::from_documents("cells", docs);
        let cases = vec![GroundTruthCase {
            query: "when do chromatids separate?".into(),
            answer_doc: "bio/anaphase.md".into(),
            answer_position: Some((0, 43)),
            answer_text: None,
        }];

        let mut grid = space();
        grid.splitting_method = values(&["by_sentence"]);
        grid.embedding_model = values(&["hash-384"]);

        let orchestrator = GridOrchestrator::new(paths);
        let first = orchestrator.run(&corpus, &cases, &grid).unwrap();
        assert_eq!(first, 1);

        let second = orchestrator.run(&corpus, &cases, &grid).unwrap();
        assert_eq!(second, 0);
    }
}
