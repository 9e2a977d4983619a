//! Processed-corpus artifact store.
//!
//! Each fingerprint owns one directory under `processed/` holding four
//! artifacts: the chunk metadata mapping, run metadata, the vector index,
//! and the BM25 index. A directory missing or corrupting any of the four
//! is treated as absent — never partially trusted. A root-level trace
//! record maps each fingerprint to the human-readable config string that
//! produced it.

use std::collections::BTreeMap;
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use spanseek_core::{ChunkId, ChunkMeta, DataPaths, Fingerprint, Result, RunConfig};

use crate::bm25::Bm25Index;
use crate::vector::VectorIndex;

pub const CHUNKS_FILE: &str = "chunks.json";
pub const META_FILE: &str = "meta.json";
pub const VECTOR_FILE: &str = "vector.json";
pub const BM25_FILE: &str = "bm25.json";

/// Metadata persisted alongside the indexes for one processing run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunMetadata {
    pub dataset_name: String,
    pub config: RunConfig,
    pub processing_secs: f64,
    pub chunk_count: usize,
    pub embedding_dim: usize,
    pub created_at: DateTime<Utc>,
}

/// Filesystem layout and persistence for fingerprint artifact sets.
pub struct ArtifactStore {
    paths: DataPaths,
}

impl ArtifactStore {
    pub fn new(paths: DataPaths) -> Self {
        Self { paths }
    }

    pub fn paths(&self) -> &DataPaths {
        &self.paths
    }

    pub fn dir(&self, fingerprint: &Fingerprint) -> PathBuf {
        self.paths.fingerprint_dir(fingerprint.as_str())
    }

    /// True iff all four artifacts exist and parse.
    ///
    /// A corrupted or empty file demotes the whole directory to absent so
    /// callers rebuild instead of loading a half-written set.
    pub fn is_complete(&self, fingerprint: &Fingerprint) -> bool {
        let dir = self.dir(fingerprint);
        for name in [CHUNKS_FILE, META_FILE, VECTOR_FILE, BM25_FILE] {
            let path = dir.join(name);
            match std::fs::metadata(&path) {
                Ok(m) if m.len() > 0 => {}
                _ => {
                    debug!(fingerprint = fingerprint.as_str(), artifact = name, "artifact missing or empty");
                    return false;
                }
            }
        }

        // All four must parse. A garbled index file that stayed
        // "complete" would short-circuit every rebuild while every
        // subsequent load fails.
        if self.load_metadata(fingerprint).is_err() {
            warn!(fingerprint = fingerprint.as_str(), "corrupt run metadata, directory treated as absent");
            return false;
        }
        if self.load_chunks(fingerprint).is_err() {
            warn!(fingerprint = fingerprint.as_str(), "corrupt chunk mapping, directory treated as absent");
            return false;
        }
        if self.load_vector(fingerprint).is_err() {
            warn!(fingerprint = fingerprint.as_str(), "corrupt vector index, directory treated as absent");
            return false;
        }
        if self.load_bm25(fingerprint).is_err() {
            warn!(fingerprint = fingerprint.as_str(), "corrupt lexical index, directory treated as absent");
            return false;
        }
        true
    }

    pub fn save(
        &self,
        fingerprint: &Fingerprint,
        chunks: &BTreeMap<ChunkId, ChunkMeta>,
        metadata: &RunMetadata,
        vector: &VectorIndex,
        bm25: &Bm25Index,
    ) -> Result<()> {
        let dir = self.dir(fingerprint);
        std::fs::create_dir_all(&dir)?;

        write_json(&dir.join(CHUNKS_FILE), chunks)?;
        write_json(&dir.join(META_FILE), metadata)?;
        vector.save(&dir.join(VECTOR_FILE))?;
        write_json(&dir.join(BM25_FILE), bm25)?;
        Ok(())
    }

    pub fn load_chunks(&self, fingerprint: &Fingerprint) -> Result<BTreeMap<ChunkId, ChunkMeta>> {
        read_json(&self.dir(fingerprint).join(CHUNKS_FILE))
    }

    pub fn load_metadata(&self, fingerprint: &Fingerprint) -> Result<RunMetadata> {
        read_json(&self.dir(fingerprint).join(META_FILE))
    }

    pub fn load_vector(&self, fingerprint: &Fingerprint) -> Result<VectorIndex> {
        VectorIndex::load(&self.dir(fingerprint).join(VECTOR_FILE))
    }

    pub fn load_bm25(&self, fingerprint: &Fingerprint) -> Result<Bm25Index> {
        read_json(&self.dir(fingerprint).join(BM25_FILE))
    }

    /// Record fingerprint → canonical config string for later auditing.
    ///
    /// Append-only: an existing entry for the same fingerprint is left
    /// untouched, so a (theoretical) hash collision is a no-op rather
    /// than an overwrite.
    pub fn record_trace(&self, fingerprint: &Fingerprint) -> Result<()> {
        let path = self.paths.trace_record_file();
        let mut record: BTreeMap<String, String> = if path.exists() {
            read_json(&path).unwrap_or_default()
        } else {
            BTreeMap::new()
        };

        if record.contains_key(fingerprint.as_str()) {
            return Ok(());
        }
        record.insert(
            fingerprint.as_str().to_string(),
            fingerprint.canonical().to_string(),
        );
        write_json(&path, &record)
    }

    pub fn load_trace(&self) -> Result<BTreeMap<String, String>> {
        let path = self.paths.trace_record_file();
        if !path.exists() {
            return Ok(BTreeMap::new());
        }
        read_json(&path)
    }
}

fn write_json<T: Serialize>(path: &std::path::Path, value: &T) -> Result<()> {
    let file = std::fs::File::create(path)?;
    serde_json::to_writer_pretty(std::io::BufWriter::new(file), value)?;
    Ok(())
}

fn read_json<T: for<'de> Deserialize<'de>>(path: &std::path::Path) -> Result<T> {
    let file = std::fs::File::open(path)?;
    Ok(serde_json::from_reader(std::io::BufReader::new(file))?)
}
