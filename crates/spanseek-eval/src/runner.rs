//! Running a full evaluation pass for one processed configuration.

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::{info, warn};

use spanseek_core::{DataPaths, Error, Fingerprint, Result, RunConfig};
use spanseek_index::ArtifactStore;
use spanseek_query::QueryRunner;

use crate::evaluate::{evaluate, QueryEvaluation, RetrievedHit};
use crate::ground_truth::GroundTruthCase;

/// Evaluation summary for one dataset + config run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunReport {
    pub dataset_name: String,
    pub config: RunConfig,
    pub fingerprint: String,
    pub created_at: DateTime<Utc>,
    pub query_count: usize,
    pub skipped_count: usize,
    /// Fraction of evaluated queries whose top-ranked hit overlaps the
    /// ground truth answer range.
    pub top_hit_overlap_ratio: f64,
    pub evaluations: Vec<QueryEvaluation>,
}

/// Deterministic name for a config's result file. The hash covers the
/// full config, fusion weights and `top_k` included, so query-time tuning
/// produces distinct result files even when the fingerprint is shared.
pub fn result_file_name(config: &RunConfig) -> String {
    let serialized = serde_json::to_string(config).unwrap_or_default();
    let mut hasher = Sha256::new();
    hasher.update(serialized.as_bytes());
    format!("config_{}.json", hex::encode(hasher.finalize()))
}

pub fn result_file_path(paths: &DataPaths, config: &RunConfig) -> PathBuf {
    paths.results.join(result_file_name(config))
}

pub struct EvalRunner<'a> {
    store: &'a ArtifactStore,
    runner: &'a QueryRunner,
}

impl<'a> EvalRunner<'a> {
    pub fn new(store: &'a ArtifactStore, runner: &'a QueryRunner) -> Self {
        Self { store, runner }
    }

    /// Evaluate every ground truth case and assemble the run report.
    ///
    /// Cases with an empty query string are skipped with a warning, they
    /// count toward `skipped_count` rather than failing the run.
    pub fn run(
        &self,
        dataset_name: &str,
        config: &RunConfig,
        fingerprint: &Fingerprint,
        cases: &[GroundTruthCase],
    ) -> Result<RunReport> {
        let chunks = self.store.load_chunks(fingerprint)?;
        let mut evaluations = Vec::with_capacity(cases.len());
        let mut skipped = 0usize;

        for case in cases {
            if case.query.trim().is_empty() {
                warn!(answer_doc = %case.answer_doc, "skipping ground truth case with empty query");
                skipped += 1;
                continue;
            }

            let ranked = self.runner.search(&case.query)?;
            let mut hits = Vec::with_capacity(ranked.len());
            for hit in &ranked {
                let meta = chunks.get(&hit.chunk_id).ok_or_else(|| {
                    Error::Evaluation(format!(
                        "chunk {} missing from metadata mapping",
                        hit.chunk_id
                    ))
                })?;
                hits.push(RetrievedHit {
                    chunk_id: hit.chunk_id,
                    location: meta.location.clone(),
                    char_range: meta.char_range,
                    text: meta.text.clone(),
                    splitting_method: meta.splitting_method.clone(),
                    combined_score: hit.combined_score,
                    semantic_score: hit.semantic_score,
                    keyword_score: hit.keyword_score,
                });
            }
            evaluations.push(evaluate(&hits, case));
        }

        let top_overlaps = evaluations
            .iter()
            .filter(|record| {
                record
                    .hits
                    .first()
                    .is_some_and(|h| h.overlap_range.is_some())
            })
            .count();
        let top_hit_overlap_ratio = if evaluations.is_empty() {
            0.0
        } else {
            top_overlaps as f64 / evaluations.len() as f64
        };

        info!(
            dataset = dataset_name,
            queries = evaluations.len(),
            skipped,
            top_hit_overlap_ratio,
            "evaluation run complete"
        );

        Ok(RunReport {
            dataset_name: dataset_name.to_string(),
            config: config.clone(),
            fingerprint: fingerprint.as_str().to_string(),
            created_at: Utc::now(),
            query_count: evaluations.len(),
            skipped_count: skipped,
            top_hit_overlap_ratio,
            evaluations,
        })
    }

    /// Persist a report to its deterministic result file.
    pub fn persist(&self, report: &RunReport) -> Result<PathBuf> {
        let path = result_file_path(self.store.paths(), &report.config);
        let serialized = serde_json::to_string_pretty(report)?;
        std::fs::write(&path, serialized)?;
        Ok(path)
    }
}
