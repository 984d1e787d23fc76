//! Clustering evaluation metrics.
//!
//! External metrics compare predicted clusters to ground-truth classes;
//! the silhouette coefficient needs only the geometry.
//!
//! # Metrics Overview
//!
//! | Metric | Range | Best | Properties |
//! |--------|-------|------|------------|
//! | [`homogeneity`] | [0, 1] | 1 | Each cluster has one class |
//! | [`completeness`] | [0, 1] | 1 | Each class in one cluster |
//! | [`v_measure`] | [0, 1] | 1 | Harmonic mean of above two |
//! | [`ari`] | [-1, 1] | 1 | Adjusted Rand Index, chance-corrected |
//! | [`silhouette_score`] | [-1, 1] | 1 | Separation vs cohesion, label-free |
//!
//! All label metrics are invariant to renaming clusters: a bijective
//! relabeling of the truth scores 1 everywhere.
//!
//! # Example
//!
//! ```rust
//! use textcluster::metrics::{ari, homogeneity, completeness};
//!
//! let pred = [1, 1, 0, 0];
//! let truth = [0, 0, 1, 1];
//! assert!((ari(&pred, &truth) - 1.0).abs() < 1e-12);
//! assert!((homogeneity(&pred, &truth) - 1.0).abs() < 1e-12);
//! assert!((completeness(&pred, &truth) - 1.0).abs() < 1e-12);
//! ```
//!
//! # References
//!
//! - Hubert & Arabie (1985). "Comparing partitions" (ARI)
//! - Rosenberg & Hirschberg (2007). "V-Measure"
//! - Rousseeuw (1987). "Silhouettes: a graphical aid to the interpretation
//!   and validation of cluster analysis"

use std::collections::HashMap;

use rand::rngs::StdRng;
use rand::seq::index;
use rand::SeedableRng;

use crate::error::{Error, Result};
use crate::parallel::map_range;
use crate::points::Points;

/// Adjusted Rand Index between two clusterings.
///
/// ARI is the corrected-for-chance version of the Rand Index.
/// A value of 0 indicates random clustering, 1 indicates perfect agreement.
///
/// # Arguments
///
/// * `pred` - Predicted cluster assignments
/// * `truth` - Ground truth cluster assignments
///
/// # Returns
///
/// ARI score in [-1, 1]. Higher is better. 0 = random, 1 = perfect.
pub fn ari(pred: &[usize], truth: &[usize]) -> f64 {
    if pred.len() != truth.len() || pred.is_empty() {
        return 0.0;
    }

    let (joint, n) = build_contingency_table(pred, truth);
    if n < 2 {
        return 1.0;
    }

    // Row sums (a_i) and column sums (b_j)
    let mut row_sums = HashMap::new();
    let mut col_sums = HashMap::new();

    for (&(p, t), &count) in &joint {
        *row_sums.entry(p).or_insert(0usize) += count;
        *col_sums.entry(t).or_insert(0usize) += count;
    }

    // Sum of C(n_ij, 2)
    let sum_comb_ij: f64 = joint.values().map(|&c| comb2(c) as f64).sum();

    // Sum of C(a_i, 2) and C(b_j, 2)
    let sum_comb_a: f64 = row_sums.values().map(|&a| comb2(a) as f64).sum();
    let sum_comb_b: f64 = col_sums.values().map(|&b| comb2(b) as f64).sum();

    let comb_n = comb2(n) as f64;

    // ARI = (index - expected) / (max - expected)
    let expected = sum_comb_a * sum_comb_b / comb_n;
    let max_index = (sum_comb_a + sum_comb_b) / 2.0;

    let denom = max_index - expected;
    if denom.abs() < 1e-10 {
        // Both partitions are trivial (one block, or all singletons).
        return 1.0;
    }

    (sum_comb_ij - expected) / denom
}

/// Homogeneity: each cluster contains only members of a single class.
///
/// H = 1 - H(C|K) / H(C)
///
/// where C is classes (truth) and K is clusters (pred).
pub fn homogeneity(pred: &[usize], truth: &[usize]) -> f64 {
    if pred.len() != truth.len() || pred.is_empty() {
        return 0.0;
    }

    let (h_c, h_c_given_k) = conditional_entropies(truth, pred);

    if h_c < 1e-10 {
        return 1.0; // All same class
    }

    (1.0 - h_c_given_k / h_c).clamp(0.0, 1.0)
}

/// Completeness: all members of a given class are assigned to the same cluster.
///
/// C = 1 - H(K|C) / H(K)
///
/// where K is clusters (pred) and C is classes (truth).
pub fn completeness(pred: &[usize], truth: &[usize]) -> f64 {
    if pred.len() != truth.len() || pred.is_empty() {
        return 0.0;
    }

    let (h_k, h_k_given_c) = conditional_entropies(pred, truth);

    if h_k < 1e-10 {
        return 1.0; // All same cluster
    }

    (1.0 - h_k_given_c / h_k).clamp(0.0, 1.0)
}

/// V-Measure: harmonic mean of homogeneity and completeness.
///
/// V = 2 * (homogeneity * completeness) / (homogeneity + completeness)
pub fn v_measure(pred: &[usize], truth: &[usize]) -> f64 {
    let h = homogeneity(pred, truth);
    let c = completeness(pred, truth);

    if h + c < 1e-10 {
        return 0.0;
    }

    2.0 * h * c / (h + c)
}

/// Mean silhouette coefficient.
///
/// For each point, `a` is its mean distance to the other members of its
/// cluster and `b` the smallest mean distance to the members of another
/// cluster:
///
/// ```text
/// s = (b - a) / max(a, b)
/// ```
///
/// Points alone in their cluster score 0. When `sample_size` is below the
/// number of rows, the score is computed on a random subset of that size
/// (drawn without replacement, seeded by `seed`), distances included.
///
/// Rows may be dense or sparse; sparse distances come from row dot
/// products.
///
/// Returns `Ok(None)` when the (sampled) labels form fewer than two clusters
/// or one cluster per point, where the score is undefined.
pub fn silhouette_score<'a>(
    data: impl Into<Points<'a>>,
    labels: &[usize],
    sample_size: Option<usize>,
    seed: u64,
) -> Result<Option<f64>> {
    let data = data.into();
    if !data.is_row_major() {
        return Err(Error::invalid("data", "sparse input must be in CSR layout"));
    }
    let n = data.nrows();
    if labels.len() != n {
        return Err(Error::DimensionMismatch {
            expected: n,
            found: labels.len(),
        });
    }

    let idx: Vec<usize> = match sample_size {
        Some(s) if s < n => {
            let mut rng = StdRng::seed_from_u64(seed);
            index::sample(&mut rng, n, s).into_vec()
        }
        _ => (0..n).collect(),
    };
    let m = idx.len();

    let mut sizes: HashMap<usize, usize> = HashMap::new();
    for &i in &idx {
        *sizes.entry(labels[i]).or_insert(0) += 1;
    }
    if sizes.len() < 2 || sizes.len() == m {
        return Ok(None);
    }

    let scores = map_range(m, |p| {
        let i = idx[p];
        let own = labels[i];
        if sizes[&own] == 1 {
            return 0.0;
        }

        let mut totals: HashMap<usize, f64> = HashMap::new();
        for &j in &idx {
            if j == i {
                continue;
            }
            let dist = data.squared_distance_between(i, j).sqrt();
            *totals.entry(labels[j]).or_insert(0.0) += dist;
        }

        let a = totals.get(&own).copied().unwrap_or(0.0) / (sizes[&own] - 1) as f64;
        let b = sizes
            .iter()
            .filter(|(&c, _)| c != own)
            .map(|(c, &size)| totals.get(c).copied().unwrap_or(0.0) / size as f64)
            .fold(f64::INFINITY, f64::min);

        let denom = a.max(b);
        if denom > 0.0 {
            (b - a) / denom
        } else {
            0.0
        }
    });

    Ok(Some(scores.iter().sum::<f64>() / m as f64))
}

// Helper functions

fn build_contingency_table(
    pred: &[usize],
    truth: &[usize],
) -> (HashMap<(usize, usize), usize>, usize) {
    let mut table = HashMap::new();
    for (&p, &t) in pred.iter().zip(truth.iter()) {
        *table.entry((p, t)).or_insert(0) += 1;
    }
    (table, pred.len())
}

fn comb2(n: usize) -> usize {
    if n < 2 {
        0
    } else {
        n * (n - 1) / 2
    }
}

/// Returns `(H(A), H(A|B))`.
fn conditional_entropies(a: &[usize], b: &[usize]) -> (f64, f64) {
    let n = a.len() as f64;

    // Count a values
    let mut count_a = HashMap::new();
    for &v in a {
        *count_a.entry(v).or_insert(0usize) += 1;
    }

    // H(A)
    let h_a: f64 = count_a
        .values()
        .map(|&c| {
            let p = c as f64 / n;
            if p > 0.0 {
                -p * p.ln()
            } else {
                0.0
            }
        })
        .sum();

    // H(A|B) = Σ_b P(b) H(A|B=b)
    let mut count_b = HashMap::new();
    let mut joint = HashMap::new();

    for (&va, &vb) in a.iter().zip(b.iter()) {
        *count_b.entry(vb).or_insert(0usize) += 1;
        *joint.entry((va, vb)).or_insert(0usize) += 1;
    }

    let mut h_a_given_b = 0.0;
    for (&(_, vb), &n_ab) in &joint {
        let nb = count_b[&vb];
        let p_ab = n_ab as f64 / n;
        let p_a_given_b = n_ab as f64 / nb as f64;
        h_a_given_b -= p_ab * p_a_given_b.ln();
    }

    (h_a, h_a_given_b)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_ari_perfect() {
        let pred = [0, 0, 1, 1];
        let truth = [0, 0, 1, 1];
        assert!((ari(&pred, &truth) - 1.0).abs() < 0.01);
    }

    #[test]
    fn test_ari_permuted() {
        let pred = [2, 2, 0, 0, 1, 1];
        let truth = [0, 0, 1, 1, 2, 2];
        assert!((ari(&pred, &truth) - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_ari_disagreement_below_zero_or_small() {
        let pred = [0, 1, 0, 1];
        let truth = [0, 0, 1, 1];
        assert!(ari(&pred, &truth) < 0.1);
    }

    #[test]
    fn test_homogeneity_completeness() {
        let pred = [0, 0, 1, 1];
        let truth = [0, 0, 1, 1];
        assert!((homogeneity(&pred, &truth) - 1.0).abs() < 0.01);
        assert!((completeness(&pred, &truth) - 1.0).abs() < 0.01);
        assert!((v_measure(&pred, &truth) - 1.0).abs() < 0.01);
    }

    #[test]
    fn test_overclustering_is_homogeneous_not_complete() {
        // Each point is its own cluster: every cluster is pure.
        let pred = [0, 1, 2, 3];
        let truth = [0, 0, 1, 1];
        assert!((homogeneity(&pred, &truth) - 1.0).abs() < 1e-12);
        assert!((completeness(&pred, &truth) - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_single_cluster_is_complete_not_homogeneous() {
        let pred = [0, 0, 0, 0];
        let truth = [0, 0, 1, 1];
        assert!(homogeneity(&pred, &truth) < 1e-12);
        assert!((completeness(&pred, &truth) - 1.0).abs() < 1e-12);
        assert!(v_measure(&pred, &truth) < 1e-12);
    }

    #[test]
    fn test_silhouette_well_separated() {
        let data = array![[0.0, 0.0], [0.0, 0.1], [10.0, 10.0], [10.0, 10.1]];
        let s = silhouette_score(data.view(), &[0, 0, 1, 1], None, 0)
            .unwrap()
            .unwrap();
        assert!(s > 0.95 && s <= 1.0);

        let swapped = silhouette_score(data.view(), &[0, 1, 0, 1], None, 0)
            .unwrap()
            .unwrap();
        assert!(swapped < 0.0 && swapped >= -1.0);
    }

    #[test]
    fn test_silhouette_undefined() {
        let data = array![[0.0], [1.0], [2.0]];
        assert_eq!(silhouette_score(data.view(), &[0, 0, 0], None, 0).unwrap(), None);
        assert_eq!(silhouette_score(data.view(), &[0, 1, 2], None, 0).unwrap(), None);
        assert!(silhouette_score(data.view(), &[0, 1], None, 0).is_err());
    }

    #[test]
    fn test_silhouette_sparse_matches_dense() {
        let dense = array![[1.0, 0.0, 0.0], [0.8, 0.6, 0.0], [0.0, 0.0, 1.0], [0.0, 0.6, 0.8]];
        let sparse = sprs::CsMat::new(
            (4, 3),
            vec![0, 1, 3, 4, 6],
            vec![0, 0, 1, 2, 1, 2],
            vec![1.0, 0.8, 0.6, 1.0, 0.6, 0.8],
        );
        let labels = [0, 0, 1, 1];
        let a = silhouette_score(dense.view(), &labels, None, 0).unwrap().unwrap();
        let b = silhouette_score(&sparse, &labels, None, 0).unwrap().unwrap();
        assert!((a - b).abs() < 1e-12);
        assert!(a > 0.0);
    }

    #[test]
    fn test_silhouette_sampled_is_bounded() {
        let data = ndarray::Array2::from_shape_fn((60, 2), |(i, j)| ((i * 13 + j * 7) % 17) as f64);
        let labels: Vec<usize> = (0..60).map(|i| i % 3).collect();
        let s = silhouette_score(data.view(), &labels, Some(20), 4).unwrap().unwrap();
        assert!((-1.0..=1.0).contains(&s));
        let again = silhouette_score(data.view(), &labels, Some(20), 4).unwrap().unwrap();
        assert_eq!(s, again);
    }
}
