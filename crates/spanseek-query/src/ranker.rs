//! Score fusion: min-max normalization and weighted outer join of the
//! semantic and lexical hit streams.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use spanseek_core::ChunkId;

/// Denominator guard for constant score streams. A stream where every
/// score is equal normalizes to all zeros rather than dividing by zero.
const NORM_EPSILON: f32 = 1e-9;

/// A single fused hit with its component scores preserved for reporting.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankedHit {
    pub chunk_id: ChunkId,
    pub combined_score: f32,
    pub semantic_score: f32,
    pub keyword_score: f32,
}

/// Min-max normalize scores into `[0, 1]`.
fn normalize(scores: &[f32]) -> Vec<f32> {
    let min = scores.iter().copied().fold(f32::INFINITY, f32::min);
    let max = scores.iter().copied().fold(f32::NEG_INFINITY, f32::max);
    let span = (max - min) + NORM_EPSILON;
    scores.iter().map(|s| (s - min) / span).collect()
}

/// Fuse the two hit streams into a single ranking.
///
/// Each stream is min-max normalized independently, then outer-joined by
/// chunk ID with 0.0 standing in for the side a chunk is missing from.
/// Combined score is `semantic_weight * s + keyword_weight * k`. The sort
/// is stable and descending, so equal-scored chunks keep ascending-ID
/// order from the join.
pub fn rank(
    vector_hits: &(Vec<ChunkId>, Vec<f32>),
    lexical_hits: &(Vec<ChunkId>, Vec<f32>),
    semantic_weight: f32,
    keyword_weight: f32,
) -> Vec<RankedHit> {
    let semantic = normalize(&vector_hits.1);
    let keyword = normalize(&lexical_hits.1);

    // BTreeMap keeps the join in ascending-ID order ahead of the stable
    // sort.
    let mut joined: BTreeMap<ChunkId, (f32, f32)> = BTreeMap::new();
    for (id, score) in vector_hits.0.iter().zip(&semantic) {
        joined.entry(*id).or_insert((0.0, 0.0)).0 = *score;
    }
    for (id, score) in lexical_hits.0.iter().zip(&keyword) {
        joined.entry(*id).or_insert((0.0, 0.0)).1 = *score;
    }

    let mut ranked: Vec<RankedHit> = joined
        .into_iter()
        .map(|(chunk_id, (s, k))| RankedHit {
            chunk_id,
            combined_score: semantic_weight * s + keyword_weight * k,
            semantic_score: s,
            keyword_score: k,
        })
        .collect();
    ranked.sort_by(|a, b| {
        b.combined_score
            .partial_cmp(&a.combined_score)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    ranked
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_bounds() {
        let normed = normalize(&[3.0, 7.0, 5.0]);
        assert!(normed.iter().all(|s| (0.0..=1.0).contains(s)));
        assert!(normed[0] < 1e-6);
        assert!((normed[1] - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_normalize_constant_stream_is_zeros() {
        let normed = normalize(&[4.2, 4.2, 4.2]);
        assert!(normed.iter().all(|s| *s == 0.0));
    }

    #[test]
    fn test_rank_outer_join_fills_missing_side_with_zero() {
        let vector = (vec![0, 1], vec![0.9, 0.1]);
        let lexical = (vec![1, 2], vec![5.0, 1.0]);
        let ranked = rank(&vector, &lexical, 0.5, 0.5);

        assert_eq!(ranked.len(), 3);
        let by_id = |id| ranked.iter().find(|h| h.chunk_id == id).unwrap();
        assert_eq!(by_id(0).keyword_score, 0.0);
        assert_eq!(by_id(2).semantic_score, 0.0);
    }

    #[test]
    fn test_rank_orders_by_combined_descending() {
        let vector = (vec![0, 1, 2], vec![0.2, 0.9, 0.5]);
        let lexical = (vec![0, 1, 2], vec![1.0, 8.0, 3.0]);
        let ranked = rank(&vector, &lexical, 0.5, 0.5);

        let ids: Vec<ChunkId> = ranked.iter().map(|h| h.chunk_id).collect();
        assert_eq!(ids, vec![1, 2, 0]);
        for pair in ranked.windows(2) {
            assert!(pair[0].combined_score >= pair[1].combined_score);
        }
    }

    #[test]
    fn test_rank_ties_keep_ascending_id_order() {
        // Both streams constant, so every combined score is 0.0.
        let vector = (vec![3, 1, 2], vec![0.5, 0.5, 0.5]);
        let lexical = (vec![2, 3, 1], vec![2.0, 2.0, 2.0]);
        let ranked = rank(&vector, &lexical, 0.5, 0.5);

        let ids: Vec<ChunkId> = ranked.iter().map(|h| h.chunk_id).collect();
        assert_eq!(ids, vec![1, 2, 3]);
    }

    #[test]
    fn test_rank_weights_shift_winner() {
        let vector = (vec![0, 1], vec![1.0, 0.0]);
        let lexical = (vec![0, 1], vec![0.0, 1.0]);

        let semantic_heavy = rank(&vector, &lexical, 0.9, 0.1);
        assert_eq!(semantic_heavy[0].chunk_id, 0);

        let keyword_heavy = rank(&vector, &lexical, 0.1, 0.9);
        assert_eq!(keyword_heavy[0].chunk_id, 1);
    }

    #[test]
    fn test_rank_empty_streams() {
        let ranked = rank(&(vec![], vec![]), &(vec![], vec![]), 0.5, 0.5);
        assert!(ranked.is_empty());
    }
}
