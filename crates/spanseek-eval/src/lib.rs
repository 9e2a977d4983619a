//! spanseek Eval — retrieval quality evaluation and grid sweeps.
//!
//! Ranked results are scored against ground truth with partial credit:
//! document identity, character-range overlap, and subset containment,
//! aggregated per query and per run. The orchestrator sweeps a
//! configuration grid, reusing processed artifacts by fingerprint and
//! completed runs by result file.

pub mod evaluate;
pub mod ground_truth;
pub mod orchestrator;
pub mod runner;

pub use evaluate::{evaluate, HitEvaluation, QueryEvaluation, RetrievedHit};
pub use ground_truth::{load_cases, GroundTruthCase};
pub use orchestrator::{GridOrchestrator, GridSpace};
pub use runner::{result_file_name, result_file_path, EvalRunner, RunReport};
