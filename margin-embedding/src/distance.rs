//! Euclidean distance and relevance scoring

use ndarray::ArrayView1;

/// Euclidean (L2) distance between two embeddings
///
/// Panics if the vectors have different dimensions; the store only ever
/// compares vectors produced by the same embedder.
pub fn l2_distance(a: &[f32], b: &[f32]) -> f64 {
    assert_eq!(
        a.len(),
        b.len(),
        "Embeddings must have same dimension (got {} and {})",
        a.len(),
        b.len()
    );

    let a_view = ArrayView1::from(a);
    let b_view = ArrayView1::from(b);

    let diff = &a_view - &b_view;
    (diff.dot(&diff) as f64).sqrt()
}

/// Convert an L2 distance to a relevance score in [0, 1]
///
/// `score = 1 - min(d/2, 1)`: monotonically decreasing in distance, clamped
/// so far-away hits bottom out at 0 rather than going negative.
pub fn distance_to_relevance(distance: f64) -> f64 {
    1.0 - (distance / 2.0).min(1.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn distance_between_identical_vectors_is_zero() {
        let a = vec![1.0, 2.0, 3.0];
        assert!(l2_distance(&a, &a).abs() < 1e-9);
    }

    #[test]
    fn distance_matches_euclidean_formula() {
        let a = vec![0.0, 0.0];
        let b = vec![3.0, 4.0];
        assert!((l2_distance(&a, &b) - 5.0).abs() < 1e-6);
    }

    #[test]
    fn zero_distance_maps_to_full_relevance() {
        assert!((distance_to_relevance(0.0) - 1.0).abs() < 1e-9);
    }

    #[test]
    fn distance_two_maps_to_zero_relevance() {
        assert!(distance_to_relevance(2.0).abs() < 1e-9);
    }

    #[test]
    fn relevance_is_clamped_never_negative() {
        assert_eq!(distance_to_relevance(4.0), 0.0);
        assert_eq!(distance_to_relevance(100.0), 0.0);
    }

    #[test]
    fn relevance_decreases_monotonically() {
        assert!(distance_to_relevance(0.5) > distance_to_relevance(1.0));
        assert!(distance_to_relevance(1.0) > distance_to_relevance(1.5));
    }
}
