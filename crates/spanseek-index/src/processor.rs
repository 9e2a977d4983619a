//! Corpus processing: chunk → embed → index → persist, at most once per
//! fingerprint.
//!
//! `process()` is idempotent: a complete artifact set for the computed
//! fingerprint short-circuits without re-chunking, re-embedding, or
//! re-indexing. The check-then-build sequence is guarded by an exclusive
//! advisory file lock keyed by fingerprint, so a concurrent loser blocks
//! on the lock and then reuses the winner's completed artifacts instead
//! of rebuilding over them.

use std::collections::BTreeMap;
use std::fs::OpenOptions;
use std::time::Instant;

use chrono::Utc;
use fs2::FileExt;
use tracing::{debug, info};

use spanseek_core::{ChunkId, ChunkMeta, Fingerprint, LexicalTokenizer, Result, RunConfig};
use spanseek_embed::EmbedderBackend;
use spanseek_ingest::{Corpus, RuleSegmenter, TextSplitter};

use crate::artifacts::{ArtifactStore, RunMetadata};
use crate::bm25::Bm25Index;
use crate::vector::VectorIndex;

pub struct CorpusProcessor<'a> {
    store: &'a ArtifactStore,
    embedder: &'a dyn EmbedderBackend,
    tokenizer: &'a LexicalTokenizer,
}

impl<'a> CorpusProcessor<'a> {
    pub fn new(
        store: &'a ArtifactStore,
        embedder: &'a dyn EmbedderBackend,
        tokenizer: &'a LexicalTokenizer,
    ) -> Self {
        Self {
            store,
            embedder,
            tokenizer,
        }
    }

    /// Process a corpus under the given config, returning the fingerprint
    /// of the (new or reused) artifact set.
    pub fn process(&self, corpus: &Corpus, config: &RunConfig) -> Result<Fingerprint> {
        config.validate()?;
        let fingerprint = Fingerprint::compute(&corpus.dataset_name, config);
        self.store.record_trace(&fingerprint)?;

        // Fast path without taking the lock.
        if self.store.is_complete(&fingerprint) {
            debug!(fingerprint = fingerprint.as_str(), "artifact set already complete");
            return Ok(fingerprint);
        }

        let lock_path = self
            .store
            .paths()
            .processed
            .join(format!("{}.lock", fingerprint.as_str()));
        let lock_file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(false)
            .open(&lock_path)?;
        // Blocks until any concurrent builder of this fingerprint is done.
        lock_file.lock_exclusive()?;

        let result = self.build_locked(corpus, config, &fingerprint);
        let _ = FileExt::unlock(&lock_file);
        result?;
        Ok(fingerprint)
    }

    fn build_locked(
        &self,
        corpus: &Corpus,
        config: &RunConfig,
        fingerprint: &Fingerprint,
    ) -> Result<()> {
        // Re-check under the lock: a concurrent winner may have finished
        // while we were waiting.
        if self.store.is_complete(fingerprint) {
            info!(fingerprint = fingerprint.as_str(), "reusing artifacts built while waiting for lock");
            return Ok(());
        }

        info!(
            dataset = %corpus.dataset_name,
            fingerprint = fingerprint.as_str(),
            "processing corpus"
        );
        let started = Instant::now();

        let splitter = TextSplitter::new(
            &config.splitting_method,
            Box::new(RuleSegmenter::new()),
            config.filtering_enabled(),
        )?;

        let mut chunk_metadata: BTreeMap<ChunkId, ChunkMeta> = BTreeMap::new();
        let mut token_seqs: Vec<Vec<String>> = Vec::new();
        let mut vector = VectorIndex::new(self.embedder.dimension());
        let mut next_id: ChunkId = 0;

        // Corpus iteration order is stable, so chunk IDs are deterministic
        // for a given config.
        for (doc_id, doc_text) in corpus.documents() {
            let chunks = splitter.split(doc_text)?;
            for chunk in chunks {
                let embedding = self.embedder.embed(&chunk.text)?;
                vector.add(next_id, &embedding)?;
                token_seqs.push(self.tokenizer.tokenize(&chunk.text));
                chunk_metadata.insert(
                    next_id,
                    ChunkMeta {
                        location: doc_id.clone(),
                        text: chunk.text,
                        char_range: chunk.range,
                        splitting_method: chunk.method,
                        parent_chunk_range: chunk.parent_range,
                    },
                );
                next_id += 1;
            }
        }

        // Hard ordering requirement: all inserts land before the build,
        // and BM25 sees the whole token collection at once.
        vector.build();
        let bm25 = Bm25Index::build(&token_seqs);

        let metadata = RunMetadata {
            dataset_name: corpus.dataset_name.clone(),
            config: config.clone(),
            processing_secs: started.elapsed().as_secs_f64(),
            chunk_count: chunk_metadata.len(),
            embedding_dim: self.embedder.dimension(),
            created_at: Utc::now(),
        };

        self.store
            .save(fingerprint, &chunk_metadata, &metadata, &vector, &bm25)?;
        info!(
            fingerprint = fingerprint.as_str(),
            chunks = metadata.chunk_count,
            secs = metadata.processing_secs,
            "processing complete"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap as DocMap;

    use spanseek_core::{DataPaths, TokenizerConfig};
    use spanseek_embed::HashEmbedder;

    fn test_corpus() -> Corpus {
        let mut docs = DocMap::new();
        docs.insert(
            "a/anaphase.md".to_string(),
            "Sister chromatids separate during anaphase. The spindle pulls them apart."
                .to_string(),
        );
        docs.insert(
            "b/prophase.md".to_string(),
            "Chromosomes condense during prophase. The nuclear envelope breaks down."
                .to_string(),
        );
        Corpus::from_documents("mitosis", docs)
    }

    fn harness(dir: &std::path::Path) -> (ArtifactStore, HashEmbedder, LexicalTokenizer) {
        (
            ArtifactStore::new(DataPaths::new(dir).unwrap()),
            HashEmbedder::new(16),
            LexicalTokenizer::new(TokenizerConfig::default()),
        )
    }

    fn config() -> RunConfig {
        RunConfig {
            splitting_method: vec!["by_sentence".into()],
            embedding_model: "hash-16".into(),
            ..Default::default()
        }
    }

    fn artifact_bytes(store: &ArtifactStore, fp: &Fingerprint) -> Vec<Vec<u8>> {
        use crate::artifacts::{BM25_FILE, CHUNKS_FILE, META_FILE, VECTOR_FILE};
        [CHUNKS_FILE, META_FILE, VECTOR_FILE, BM25_FILE]
            .iter()
            .map(|name| std::fs::read(store.dir(fp).join(name)).unwrap())
            .collect()
    }

    #[test]
    fn test_process_builds_complete_artifact_set() {
        let dir = tempfile::tempdir().unwrap();
        let (store, embedder, tokenizer) = harness(dir.path());
        let processor = CorpusProcessor::new(&store, &embedder, &tokenizer);

        let fp = processor.process(&test_corpus(), &config()).unwrap();
        assert!(store.is_complete(&fp));

        let metadata = store.load_metadata(&fp).unwrap();
        assert_eq!(metadata.dataset_name, "mitosis");
        assert_eq!(metadata.chunk_count, 4);
        assert!(metadata.processing_secs >= 0.0);
    }

    #[test]
    fn test_chunk_ids_consistent_across_structures() {
        let dir = tempfile::tempdir().unwrap();
        let (store, embedder, tokenizer) = harness(dir.path());
        let processor = CorpusProcessor::new(&store, &embedder, &tokenizer);
        let fp = processor.process(&test_corpus(), &config()).unwrap();

        let chunks = store.load_chunks(&fp).unwrap();
        let vector = store.load_vector(&fp).unwrap();
        let bm25 = store.load_bm25(&fp).unwrap();

        let mapping_ids: Vec<ChunkId> = chunks.keys().copied().collect();
        assert_eq!(mapping_ids, (0..chunks.len()).collect::<Vec<_>>());
        assert_eq!(vector.ids(), mapping_ids.as_slice());
        assert_eq!(bm25.len(), chunks.len());
    }

    #[test]
    fn test_process_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let (store, embedder, tokenizer) = harness(dir.path());
        let processor = CorpusProcessor::new(&store, &embedder, &tokenizer);
        let corpus = test_corpus();

        let fp1 = processor.process(&corpus, &config()).unwrap();
        let before = artifact_bytes(&store, &fp1);

        let fp2 = processor.process(&corpus, &config()).unwrap();
        assert_eq!(fp1, fp2);
        assert_eq!(before, artifact_bytes(&store, &fp2), "second call must not rewrite artifacts");
    }

    #[test]
    fn test_corrupted_index_artifact_triggers_rebuild() {
        let dir = tempfile::tempdir().unwrap();
        let (store, embedder, tokenizer) = harness(dir.path());
        let processor = CorpusProcessor::new(&store, &embedder, &tokenizer);
        let corpus = test_corpus();

        let fp = processor.process(&corpus, &config()).unwrap();
        let vector_path = store.dir(&fp).join(crate::artifacts::VECTOR_FILE);
        std::fs::write(&vector_path, "{corrupt garbage").unwrap();
        assert!(!store.is_complete(&fp));

        processor.process(&corpus, &config()).unwrap();
        assert!(store.is_complete(&fp));
        assert!(store.load_vector(&fp).is_ok());
    }

    #[test]
    fn test_fusion_weight_change_reuses_artifacts() {
        let dir = tempfile::tempdir().unwrap();
        let (store, embedder, tokenizer) = harness(dir.path());
        let processor = CorpusProcessor::new(&store, &embedder, &tokenizer);
        let corpus = test_corpus();

        let fp1 = processor.process(&corpus, &config()).unwrap();
        let retuned = RunConfig {
            semantic_vs_keyword_weights: [0.8, 0.2],
            ..config()
        };
        let fp2 = processor.process(&corpus, &retuned).unwrap();
        assert_eq!(fp1, fp2);
    }

    /// Delegates to [`HashEmbedder`] while counting `embed` calls across
    /// threads, to pin down how many builds actually ran.
    struct CountingEmbedder {
        inner: HashEmbedder,
        calls: std::sync::Arc<std::sync::atomic::AtomicUsize>,
    }

    impl EmbedderBackend for CountingEmbedder {
        fn embed(&self, text: &str) -> spanseek_core::Result<ndarray::Array1<f32>> {
            self.calls
                .fetch_add(1, std::sync::atomic::Ordering::SeqCst);
            self.inner.embed(text)
        }

        fn dimension(&self) -> usize {
            self.inner.dimension()
        }

        fn model_name(&self) -> &str {
            self.inner.model_name()
        }
    }

    #[test]
    fn test_concurrent_processing_single_build() {
        let dir = tempfile::tempdir().unwrap();
        let paths = DataPaths::new(dir.path()).unwrap();
        let embed_calls = std::sync::Arc::new(std::sync::atomic::AtomicUsize::new(0));

        let handles: Vec<_> = (0..2)
            .map(|_| {
                let paths = paths.clone();
                let calls = embed_calls.clone();
                std::thread::spawn(move || {
                    let store = ArtifactStore::new(paths);
                    let embedder = CountingEmbedder {
                        inner: HashEmbedder::new(16),
                        calls,
                    };
                    let tokenizer = LexicalTokenizer::new(TokenizerConfig::default());
                    let processor = CorpusProcessor::new(&store, &embedder, &tokenizer);
                    processor.process(&test_corpus(), &config()).unwrap()
                })
            })
            .collect();

        let fingerprints: Vec<Fingerprint> =
            handles.into_iter().map(|h| h.join().unwrap()).collect();
        assert_eq!(fingerprints[0], fingerprints[1]);

        let store = ArtifactStore::new(DataPaths::new(dir.path()).unwrap());
        assert!(store.is_complete(&fingerprints[0]));

        // One embed call per chunk, for exactly one of the two racers. The
        // loser must reuse the winner's artifacts, not rebuild over them.
        assert_eq!(
            embed_calls.load(std::sync::atomic::Ordering::SeqCst),
            4,
            "expected exactly one build across both threads"
        );
    }

    #[test]
    fn test_unknown_splitting_method_fails() {
        let dir = tempfile::tempdir().unwrap();
        let (store, embedder, tokenizer) = harness(dir.path());
        let processor = CorpusProcessor::new(&store, &embedder, &tokenizer);

        let bad = RunConfig {
            splitting_method: vec!["by_paragraph".into()],
            ..config()
        };
        assert!(processor.process(&test_corpus(), &bad).is_err());
    }
}
