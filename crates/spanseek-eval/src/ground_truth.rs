//! Ground truth cases for retrieval evaluation.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::debug;

use spanseek_core::{DataPaths, Error, Result};

/// One labeled retrieval case: a query and where its answer lives.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GroundTruthCase {
    pub query: String,
    /// Relative path of the document containing the answer.
    pub answer_doc: String,
    /// Character range of the answer within the document, if annotated.
    #[serde(default)]
    pub answer_position: Option<(usize, usize)>,
    /// The answer text itself, if annotated.
    #[serde(default)]
    pub answer_text: Option<String>,
}

/// Load the ground truth set for a dataset from
/// `ground_truth/<dataset>.json`.
pub fn load_cases(paths: &DataPaths, dataset: &str) -> Result<Vec<GroundTruthCase>> {
    let path = paths.ground_truth_file(dataset);
    load_cases_from(&path)
}

pub fn load_cases_from(path: &Path) -> Result<Vec<GroundTruthCase>> {
    if !path.exists() {
        return Err(Error::NotFound(format!(
            "ground truth file {} does not exist",
            path.display()
        )));
    }
    let raw = fs::read_to_string(path)?;
    let cases: Vec<GroundTruthCase> = serde_json::from_str(&raw)?;
    debug!(path = %path.display(), cases = cases.len(), "loaded ground truth");
    Ok(cases)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_load_cases_parses_optional_fields() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cells.json");
        std::fs::write(
            &path,
            r#"[
                {"query": "when do chromatids separate?",
                 "answer_doc": "bio/anaphase.md",
                 "answer_position": [10, 52],
                 "answer_text": "Sister chromatids separate during anaphase"},
                {"query": "what is prophase?",
                 "answer_doc": "bio/prophase.md"}
            ]"#,
        )
        .unwrap();

        let cases = load_cases_from(&path).unwrap();
        assert_eq!(cases.len(), 2);
        assert_eq!(cases[0].answer_position, Some((10, 52)));
        assert!(cases[1].answer_position.is_none());
        assert!(cases[1].answer_text.is_none());
    }

    #[test]
    fn test_load_cases_missing_file_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let err = load_cases_from(&dir.path().join("absent.json")).unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));
    }
}
