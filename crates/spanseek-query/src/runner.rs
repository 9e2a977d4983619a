//! Query execution over a processed artifact set.

use tracing::debug;

use spanseek_core::{ChunkId, Fingerprint, LexicalTokenizer, Result, RunConfig};
use spanseek_embed::{EmbedCache, EmbedderBackend};
use spanseek_index::{ArtifactStore, Bm25Index, VectorIndex};

use crate::ranker::{rank, RankedHit};

/// One retrieval stream: parallel ID and score vectors.
pub type HitStream = (Vec<ChunkId>, Vec<f32>);

/// Executes hybrid queries against one fingerprint's indexes.
///
/// The tokenizer must be configured identically to the one used at
/// indexing time, otherwise lexical scores are meaningless. Callers get
/// it from `RunConfig::tokenizer_config()` in both places.
pub struct QueryRunner {
    vector: VectorIndex,
    bm25: Bm25Index,
    embedder: Box<dyn EmbedderBackend>,
    tokenizer: LexicalTokenizer,
    cache: EmbedCache,
    semantic_weight: f32,
    keyword_weight: f32,
    top_k: usize,
}

impl QueryRunner {
    /// Load the indexes for a processed fingerprint.
    pub fn open(
        store: &ArtifactStore,
        fingerprint: &Fingerprint,
        config: &RunConfig,
        embedder: Box<dyn EmbedderBackend>,
    ) -> Result<Self> {
        let vector = store.load_vector(fingerprint)?;
        let bm25 = store.load_bm25(fingerprint)?;
        debug!(
            fingerprint = fingerprint.as_str(),
            vectors = vector.len(),
            "query runner ready"
        );
        Ok(Self {
            vector,
            bm25,
            embedder,
            tokenizer: LexicalTokenizer::new(config.tokenizer_config()),
            cache: EmbedCache::default_cache(),
            semantic_weight: config.semantic_weight(),
            keyword_weight: config.keyword_weight(),
            top_k: config.top_k,
        })
    }

    /// Run both retrieval streams for a query text.
    ///
    /// Returns `(vector hits, lexical hits)`. Vector scores are
    /// similarities (`1 - angular distance`), lexical scores are raw BM25.
    pub fn query(&self, text: &str) -> Result<(HitStream, HitStream)> {
        Ok((self.vector_hits(text)?, self.lexical_hits(text)))
    }

    /// Run both streams and fuse them into a single ranking using the
    /// configured weights.
    pub fn search(&self, text: &str) -> Result<Vec<RankedHit>> {
        let (vector_hits, lexical_hits) = self.query(text)?;
        Ok(rank(
            &vector_hits,
            &lexical_hits,
            self.semantic_weight,
            self.keyword_weight,
        ))
    }

    fn vector_hits(&self, text: &str) -> Result<HitStream> {
        let embedding = match self.cache.get(text) {
            Some(hit) => hit,
            None => {
                let fresh = self.embedder.embed(text)?;
                self.cache.put(text.to_string(), fresh.clone());
                fresh
            }
        };
        let (ids, distances) = self.vector.query_knn(&embedding, self.top_k)?;
        let similarities = distances.iter().map(|d| 1.0 - d).collect();
        Ok((ids, similarities))
    }

    /// BM25 scores every chunk; keep the top K, score descending with
    /// ties broken by ascending ID.
    fn lexical_hits(&self, text: &str) -> HitStream {
        let tokens = self.tokenizer.tokenize(text);
        let scores = self.bm25.scores(&tokens);

        let mut ranked: Vec<(ChunkId, f32)> = scores.into_iter().enumerate().collect();
        ranked.sort_by(|a, b| {
            b.1.partial_cmp(&a.1)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then(a.0.cmp(&b.0))
        });
        ranked.truncate(self.top_k);
        ranked.into_iter().unzip()
    }

    pub fn top_k(&self) -> usize {
        self.top_k
    }

    pub fn chunk_count(&self) -> usize {
        self.vector.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    use spanseek_core::{DataPaths, TokenizerConfig};
    use spanseek_embed::HashEmbedder;
    use spanseek_index::CorpusProcessor;
    use spanseek_ingest::Corpus;

    fn prepared_runner(dir: &std::path::Path) -> QueryRunner {
        let mut docs = BTreeMap::new();
        docs.insert(
            "bio/anaphase.md".to_string(),
            "Sister chromatids separate during anaphase. Spindle fibers shorten."
                .to_string(),
        );
        docs.insert(
            "bio/prophase.md".to_string(),
            "Chromosomes condense during prophase. The nuclear envelope breaks down."
                .to_string(),
        );
        docs.insert(
            "geo/rivers.md".to_string(),
            "The Danube flows through ten countries. It empties into the Black Sea."
                .to_string(),
        );
        let corpus = Corpus::from_documents("mixed", docs);

        let config = RunConfig {
            splitting_method: vec!["by_sentence".into()],
            embedding_model: "hash-64".into(),
            ..Default::default()
        };
        let store = ArtifactStore::new(DataPaths::new(dir).unwrap());
        let embedder = HashEmbedder::new(64);
        let tokenizer = LexicalTokenizer::new(TokenizerConfig::default());
        let processor = CorpusProcessor::new(&store, &embedder, &tokenizer);
        let fp = processor.process(&corpus, &config).unwrap();

        QueryRunner::open(&store, &fp, &config, Box::new(HashEmbedder::new(64))).unwrap()
    }

    #[test]
    fn test_query_returns_both_streams() {
        let dir = tempfile::tempdir().unwrap();
        let runner = prepared_runner(dir.path());

        let (vector_hits, lexical_hits) = runner.query("anaphase chromatids").unwrap();
        assert!(!vector_hits.0.is_empty());
        assert_eq!(vector_hits.0.len(), vector_hits.1.len());
        assert_eq!(lexical_hits.0.len(), runner.top_k().min(runner.chunk_count()));
    }

    #[test]
    fn test_lexical_stream_ranks_matching_chunk_first() {
        let dir = tempfile::tempdir().unwrap();
        let runner = prepared_runner(dir.path());

        let (_, (ids, scores)) = runner.query("Danube countries").unwrap();
        assert!(scores[0] > scores[scores.len() - 1]);
        // The Danube sentence is the only one containing the query terms.
        assert_eq!(ids[0], 4);
    }

    #[test]
    fn test_lexical_stream_sorted_descending() {
        let dir = tempfile::tempdir().unwrap();
        let runner = prepared_runner(dir.path());

        let (_, (_, scores)) = runner.query("nuclear envelope").unwrap();
        for pair in scores.windows(2) {
            assert!(pair[0] >= pair[1]);
        }
    }

    #[test]
    fn test_search_fuses_streams() {
        let dir = tempfile::tempdir().unwrap();
        let runner = prepared_runner(dir.path());

        let ranked = runner.search("spindle fibers anaphase").unwrap();
        assert!(!ranked.is_empty());
        for pair in ranked.windows(2) {
            assert!(pair[0].combined_score >= pair[1].combined_score);
        }
    }

    #[test]
    fn test_repeat_query_hits_embedding_cache() {
        let dir = tempfile::tempdir().unwrap();
        let runner = prepared_runner(dir.path());

        let first = runner.query("prophase").unwrap();
        let second = runner.query("prophase").unwrap();
        assert_eq!(first.0 .0, second.0 .0);
        assert_eq!(runner.cache.len(), 1);
    }
}
