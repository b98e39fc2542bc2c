use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::{Category, Transaction};

/// A transaction returned by nearest-neighbor search.
///
/// `distance` is cosine distance: ascending, smaller = more similar.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct TransactionMatch {
    pub transaction: Transaction,
    pub distance: f32,
}

impl TransactionMatch {
    pub fn new(transaction: Transaction, distance: f32) -> Self {
        Self {
            transaction,
            distance,
        }
    }
}

/// A category returned by nearest-neighbor search.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CategoryMatch {
    pub category: Category,
    pub distance: f32,
}

impl CategoryMatch {
    pub fn new(category: Category, distance: f32) -> Self {
        Self { category, distance }
    }
}

/// Cosine distance between two vectors: `1 - cosine_similarity`.
///
/// Mismatched or zero-magnitude vectors yield the maximum distance so they
/// sort last instead of poisoning the ordering.
pub fn cosine_distance(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() {
        return 1.0;
    }

    let dot_product: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        return 1.0;
    }

    1.0 - dot_product / (norm_a * norm_b)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identical_vectors_have_zero_distance() {
        let v = vec![0.6, 0.8];
        assert!(cosine_distance(&v, &v).abs() < 1e-6);
    }

    #[test]
    fn orthogonal_vectors_have_unit_distance() {
        let a = vec![1.0, 0.0];
        let b = vec![0.0, 1.0];
        assert!((cosine_distance(&a, &b) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn degenerate_vectors_sort_last() {
        let a = vec![1.0, 0.0];
        assert_eq!(cosine_distance(&a, &[]), 1.0);
        assert_eq!(cosine_distance(&a, &[0.0, 0.0]), 1.0);
    }
}
