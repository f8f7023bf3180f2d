//! Vector similarity and brute-force ranking.

use pokerag_core::store::{ScoredPoint, SearchQuery, VectorPoint};

/// Compute cosine similarity between two vectors.
///
/// Returns a value in [-1, 1] where 1 = identical, 0 = orthogonal, -1 = opposite.
/// Returns 0.0 if the lengths differ or either vector is empty or all zeros.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let (mut dot, mut norm_a, mut norm_b) = (0.0f64, 0.0f64, 0.0f64);
    for (x, y) in a.iter().zip(b) {
        let (x, y) = (*x as f64, *y as f64);
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }

    let denom = norm_a.sqrt() * norm_b.sqrt();
    if denom < 1e-10 {
        return 0.0;
    }

    (dot / denom) as f32
}

/// Score every point against the query, keep those at or above the
/// threshold, and return the best `query.limit` in descending order.
/// Ties keep insertion order.
pub fn rank_points(points: &[VectorPoint], query: &SearchQuery) -> Vec<ScoredPoint> {
    let mut scored: Vec<ScoredPoint> = points
        .iter()
        .filter_map(|p| {
            let score = cosine_similarity(&p.vector, &query.vector);
            match query.score_threshold {
                Some(min) if score < min => None,
                _ => Some(ScoredPoint {
                    id: p.id.clone(),
                    score,
                    payload: p.payload.clone(),
                }),
            }
        })
        .collect();

    scored.sort_by(|a, b| b.score.total_cmp(&a.score));
    scored.truncate(query.limit);
    scored
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn point(id: &str, vector: Vec<f32>) -> VectorPoint {
        VectorPoint {
            id: id.into(),
            vector,
            payload: HashMap::new(),
        }
    }

    fn query(vector: Vec<f32>, limit: usize, score_threshold: Option<f32>) -> SearchQuery {
        SearchQuery {
            vector,
            limit,
            score_threshold,
        }
    }

    #[test]
    fn cosine_identical_vectors() {
        let v = vec![1.0, 2.0, 3.0];
        assert!((cosine_similarity(&v, &v) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn cosine_orthogonal_and_opposite() {
        assert!(cosine_similarity(&[1.0, 0.0], &[0.0, 1.0]).abs() < 1e-6);
        assert!((cosine_similarity(&[1.0, 0.0], &[-1.0, 0.0]) + 1.0).abs() < 1e-6);
    }

    #[test]
    fn cosine_degenerate_inputs() {
        assert_eq!(cosine_similarity(&[], &[]), 0.0);
        assert_eq!(cosine_similarity(&[1.0, 2.0], &[1.0, 2.0, 3.0]), 0.0);
        assert_eq!(cosine_similarity(&[0.0, 0.0], &[1.0, 2.0]), 0.0);
    }

    #[test]
    fn cosine_known_value() {
        // 1 / sqrt(2)
        assert!((cosine_similarity(&[1.0, 1.0], &[1.0, 0.0]) - 0.7071).abs() < 0.001);
    }

    #[test]
    fn ranks_by_similarity() {
        let points = vec![
            point("a", vec![0.0, 1.0, 0.0]),
            point("b", vec![1.0, 0.0, 0.0]),
            point("c", vec![0.5, 0.5, 0.0]),
        ];
        let ranked = rank_points(&points, &query(vec![1.0, 0.0, 0.0], 10, None));
        let ids: Vec<_> = ranked.iter().map(|p| p.id.as_str()).collect();
        assert_eq!(ids, vec!["b", "c", "a"]);
    }

    #[test]
    fn threshold_is_inclusive() {
        let points = vec![point("a", vec![1.0, 0.0]), point("b", vec![0.0, 1.0])];
        let ranked = rank_points(&points, &query(vec![1.0, 0.0], 10, Some(1.0)));
        assert_eq!(ranked.len(), 1);
        assert_eq!(ranked[0].id, "a");
    }

    #[test]
    fn respects_limit() {
        let points: Vec<_> = (0..10)
            .map(|i| point(&format!("e{i}"), vec![1.0, i as f32 * 0.1]))
            .collect();
        assert_eq!(rank_points(&points, &query(vec![1.0, 0.0], 3, None)).len(), 3);
    }
}
