//! Core data types: documents, chunks, chunk metadata.

use serde::{Deserialize, Serialize};

/// Dense chunk identifier, assigned in emission order during processing.
///
/// The same ID resolves to the same chunk in the vector index, the BM25
/// index, and the chunk metadata mapping.
pub type ChunkId = usize;

/// A raw document: stable identifier (its path within the dataset) and text.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Document {
    pub id: String,
    pub text: String,
}

/// Whether a chunk is a coarse or fine unit of the multi-granularity
/// recursive strategy, or a single-tier split.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Granularity {
    Flat,
    Large,
    Small,
}

/// A contiguous character span of a document, the unit of indexing.
///
/// `range` is a half-open `[start, end)` pair of char offsets into the
/// source document. Small chunks carry the range of their enclosing large
/// chunk in `parent_range`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Chunk {
    pub text: String,
    pub range: (usize, usize),
    pub method: String,
    pub granularity: Granularity,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent_range: Option<(usize, usize)>,
}

impl Chunk {
    /// True if this chunk's span sits inside its parent's span.
    /// Chunks without a parent are trivially contained.
    pub fn contained_in_parent(&self) -> bool {
        match self.parent_range {
            Some((ps, pe)) => ps <= self.range.0 && self.range.1 <= pe,
            None => true,
        }
    }
}

/// Persisted per-chunk metadata, keyed by [`ChunkId`] in the chunk mapping.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChunkMeta {
    /// Source document identifier.
    pub location: String,
    pub text: String,
    pub char_range: (usize, usize),
    pub splitting_method: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent_chunk_range: Option<(usize, usize)>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parent_containment() {
        let chunk = Chunk {
            text: "abc".into(),
            range: (10, 13),
            method: "recursive_split".into(),
            granularity: Granularity::Small,
            parent_range: Some((0, 100)),
        };
        assert!(chunk.contained_in_parent());

        let escaped = Chunk {
            range: (10, 120),
            ..chunk.clone()
        };
        assert!(!escaped.contained_in_parent());
    }

    #[test]
    fn test_granularity_serializes_lowercase() {
        let json = serde_json::to_string(&Granularity::Large).unwrap();
        assert_eq!(json, "\"large\"");
    }
}
