//! Corpus loading: crawl a dataset directory into id → text.

use std::collections::BTreeMap;
use std::path::Path;

use tracing::{info, warn};
use walkdir::WalkDir;

use spanseek_core::{Error, Result};

/// A loaded text corpus: stable document id (path) → raw text.
///
/// Documents are held in a `BTreeMap` so iteration order is fixed, which
/// keeps chunk ID assignment deterministic across runs. Only markdown
/// files are crawled for now.
pub struct Corpus {
    /// Name of the dataset directory, used in fingerprints and reports.
    pub dataset_name: String,
    data: BTreeMap<String, String>,
}

impl Corpus {
    /// Crawl `*.md` files under `path` into a corpus.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.is_dir() {
            return Err(Error::Corpus(format!(
                "invalid data path: {}",
                path.display()
            )));
        }

        let dataset_name = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("dataset")
            .to_string();

        let mut data = BTreeMap::new();
        for entry in WalkDir::new(path).into_iter().filter_map(|e| e.ok()) {
            if !entry.file_type().is_file() {
                continue;
            }
            if entry.path().extension().and_then(|e| e.to_str()) != Some("md") {
                continue;
            }
            match std::fs::read_to_string(entry.path()) {
                Ok(text) => {
                    data.insert(entry.path().to_string_lossy().into_owned(), text);
                }
                Err(e) => warn!("Error reading {}: {}", entry.path().display(), e),
            }
        }

        info!(dataset = %dataset_name, documents = data.len(), "Corpus loaded");
        Ok(Self { dataset_name, data })
    }

    /// Build a corpus from in-memory documents (used by tests and tools).
    pub fn from_documents(dataset_name: impl Into<String>, docs: BTreeMap<String, String>) -> Self {
        Self {
            dataset_name: dataset_name.into(),
            data: docs,
        }
    }

    /// Documents in stable (sorted-by-id) order.
    pub fn documents(&self) -> impl Iterator<Item = (&String, &String)> {
        self.data.iter()
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Extract the passage at a half-open char range of a document.
    pub fn find_passage(&self, doc_id: &str, range: (usize, usize)) -> Result<String> {
        let text = self
            .data
            .get(doc_id)
            .ok_or_else(|| Error::NotFound(format!("document {doc_id}")))?;
        Ok(slice_chars(text, range.0, range.1))
    }
}

/// Slice a string by char offsets, clamping to its length.
pub fn slice_chars(text: &str, start: usize, end: usize) -> String {
    text.chars().skip(start).take(end.saturating_sub(start)).collect()
}
