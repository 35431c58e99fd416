//! Pluggable similarity strategies over sparse rating vectors.
//!
//! Neighborhood models are parameterized by a [`Similarity`] value rather
//! than hardcoding a metric; a new metric is added by implementing the trait.
//! All strategies compare two vectors over their co-rated support only and
//! return a value in `[-1, 1]`, with `0.0` as the neutral sentinel whenever
//! the metric is undefined (tiny support, zero variance, zero norm). No
//! strategy ever returns NaN.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Sparse rating vector: dimension id -> rating.
///
/// Ordered storage keeps iteration deterministic across runs.
///
/// # Examples
///
/// ```
/// use sugerir::similarity::RatingVector;
///
/// let mut v = RatingVector::new();
/// v.insert(10, 4.0);
/// v.insert(11, 2.0);
/// assert_eq!(v.get(10), Some(4.0));
/// assert_eq!(v.len(), 2);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RatingVector(BTreeMap<u32, f32>);

impl RatingVector {
    /// Create an empty vector.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the rating for a dimension.
    pub fn insert(&mut self, dim: u32, rating: f32) {
        self.0.insert(dim, rating);
    }

    /// Rating observed for a dimension, if any.
    #[must_use]
    pub fn get(&self, dim: u32) -> Option<f32> {
        self.0.get(&dim).copied()
    }

    /// Number of observed dimensions.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether no dimension is observed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterate over `(dimension, rating)` pairs in ascending dimension order.
    pub fn iter(&self) -> impl Iterator<Item = (u32, f32)> + '_ {
        self.0.iter().map(|(&d, &r)| (d, r))
    }

    /// Rating pairs over the co-rated support of `self` and `other`.
    #[must_use]
    pub fn co_rated(&self, other: &Self) -> Vec<(f32, f32)> {
        self.iter()
            .filter_map(|(dim, a)| other.get(dim).map(|b| (a, b)))
            .collect()
    }
}

impl FromIterator<(u32, f32)> for RatingVector {
    fn from_iter<I: IntoIterator<Item = (u32, f32)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// Strategy comparing two sparse rating vectors.
pub trait Similarity {
    /// Similarity in `[-1, 1]` over the co-rated support of `a` and `b`.
    ///
    /// Must return a finite value; `0.0` stands in wherever the metric is
    /// undefined.
    fn similarity(&self, a: &RatingVector, b: &RatingVector) -> f32;

    /// Stable strategy name, persisted alongside trained neighborhood state
    /// so a model cannot silently reload under a different metric.
    fn name(&self) -> &'static str;
}

/// Pearson correlation over co-rated support, mean-centered per vector.
///
/// Support of fewer than two dimensions, or a vector with zero variance on
/// the support, yields `0.0`.
///
/// # Examples
///
/// ```
/// use sugerir::similarity::{PearsonCorrelation, RatingVector, Similarity};
///
/// let a: RatingVector = [(1, 1.0), (2, 2.0), (3, 3.0)].into_iter().collect();
/// let b: RatingVector = [(1, 2.0), (2, 4.0), (3, 6.0)].into_iter().collect();
/// let sim = PearsonCorrelation.similarity(&a, &b);
/// assert!((sim - 1.0).abs() < 1e-6);
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PearsonCorrelation;

impl Similarity for PearsonCorrelation {
    fn similarity(&self, a: &RatingVector, b: &RatingVector) -> f32 {
        let pairs = a.co_rated(b);
        if pairs.len() < 2 {
            return 0.0;
        }

        let n = pairs.len() as f32;
        let mean_a: f32 = pairs.iter().map(|p| p.0).sum::<f32>() / n;
        let mean_b: f32 = pairs.iter().map(|p| p.1).sum::<f32>() / n;

        let mut cov = 0.0;
        let mut var_a = 0.0;
        let mut var_b = 0.0;
        for (ra, rb) in pairs {
            let da = ra - mean_a;
            let db = rb - mean_b;
            cov += da * db;
            var_a += da * da;
            var_b += db * db;
        }

        if var_a == 0.0 || var_b == 0.0 {
            return 0.0;
        }
        (cov / (var_a.sqrt() * var_b.sqrt())).clamp(-1.0, 1.0)
    }

    fn name(&self) -> &'static str {
        "pearson"
    }
}

/// Cosine similarity over co-rated support.
///
/// Empty support or a zero-norm restriction yields `0.0`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CosineSimilarity;

impl Similarity for CosineSimilarity {
    fn similarity(&self, a: &RatingVector, b: &RatingVector) -> f32 {
        let pairs = a.co_rated(b);
        if pairs.is_empty() {
            return 0.0;
        }

        let mut dot = 0.0;
        let mut norm_a = 0.0;
        let mut norm_b = 0.0;
        for (ra, rb) in pairs {
            dot += ra * rb;
            norm_a += ra * ra;
            norm_b += rb * rb;
        }

        if norm_a == 0.0 || norm_b == 0.0 {
            return 0.0;
        }
        (dot / (norm_a.sqrt() * norm_b.sqrt())).clamp(-1.0, 1.0)
    }

    fn name(&self) -> &'static str {
        "cosine"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vector(pairs: &[(u32, f32)]) -> RatingVector {
        pairs.iter().copied().collect()
    }

    #[test]
    fn test_pearson_perfect_positive() {
        let a = vector(&[(1, 1.0), (2, 2.0), (3, 3.0)]);
        let b = vector(&[(1, 3.0), (2, 5.0), (3, 7.0)]);
        assert!((PearsonCorrelation.similarity(&a, &b) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_pearson_perfect_negative() {
        let a = vector(&[(1, 1.0), (2, 2.0), (3, 3.0)]);
        let b = vector(&[(1, 3.0), (2, 2.0), (3, 1.0)]);
        assert!((PearsonCorrelation.similarity(&a, &b) + 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_pearson_self_similarity_is_one() {
        let a = vector(&[(1, 1.0), (2, 5.0), (3, 3.0)]);
        assert!((PearsonCorrelation.similarity(&a, &a) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_pearson_symmetric() {
        let a = vector(&[(1, 1.0), (2, 4.0), (3, 2.0), (5, 5.0)]);
        let b = vector(&[(1, 2.0), (3, 3.0), (5, 1.0), (7, 4.0)]);
        let ab = PearsonCorrelation.similarity(&a, &b);
        let ba = PearsonCorrelation.similarity(&b, &a);
        assert!((ab - ba).abs() < 1e-6);
    }

    #[test]
    fn test_pearson_tiny_support_is_neutral() {
        let a = vector(&[(1, 1.0), (2, 2.0)]);
        let b = vector(&[(2, 5.0), (3, 1.0)]);
        // Only dimension 2 is shared.
        assert_eq!(PearsonCorrelation.similarity(&a, &b), 0.0);

        let empty = RatingVector::new();
        assert_eq!(PearsonCorrelation.similarity(&a, &empty), 0.0);
    }

    #[test]
    fn test_pearson_zero_variance_is_neutral() {
        let flat = vector(&[(1, 3.0), (2, 3.0), (3, 3.0)]);
        let b = vector(&[(1, 1.0), (2, 2.0), (3, 3.0)]);
        assert_eq!(PearsonCorrelation.similarity(&flat, &b), 0.0);
        assert_eq!(PearsonCorrelation.similarity(&b, &flat), 0.0);
    }

    #[test]
    fn test_pearson_never_nan() {
        let cases = [
            (vector(&[]), vector(&[])),
            (vector(&[(1, 0.0)]), vector(&[(1, 0.0)])),
            (vector(&[(1, 2.0), (2, 2.0)]), vector(&[(1, 2.0), (2, 2.0)])),
        ];
        for (a, b) in &cases {
            assert!(PearsonCorrelation.similarity(a, b).is_finite());
        }
    }

    #[test]
    fn test_cosine_identical_direction() {
        let a = vector(&[(1, 1.0), (2, 2.0)]);
        let b = vector(&[(1, 2.0), (2, 4.0)]);
        assert!((CosineSimilarity.similarity(&a, &b) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_cosine_empty_support_is_neutral() {
        let a = vector(&[(1, 1.0)]);
        let b = vector(&[(2, 1.0)]);
        assert_eq!(CosineSimilarity.similarity(&a, &b), 0.0);
    }

    #[test]
    fn test_cosine_zero_norm_is_neutral() {
        let a = vector(&[(1, 0.0), (2, 0.0)]);
        let b = vector(&[(1, 1.0), (2, 2.0)]);
        assert_eq!(CosineSimilarity.similarity(&a, &b), 0.0);
    }

    #[test]
    fn test_strategy_names() {
        assert_eq!(PearsonCorrelation.name(), "pearson");
        assert_eq!(CosineSimilarity.name(), "cosine");
    }

    #[test]
    fn test_co_rated_support() {
        let a = vector(&[(1, 1.0), (2, 2.0), (4, 4.0)]);
        let b = vector(&[(2, 5.0), (4, 1.0), (9, 2.0)]);
        assert_eq!(a.co_rated(&b), vec![(2.0, 5.0), (4.0, 1.0)]);
    }
}
