//! Full-batch k-means (Lloyd's algorithm).
//!
//! Partitions data into k clusters by minimizing **within-cluster sum of squares**
//! (WCSS, or inertia).
//!
//! # The Objective
//!
//! ```text
//! WCSS = Σₖ Σᵢ∈Cₖ ||xᵢ - μₖ||²
//! ```
//!
//! # Lloyd's Algorithm
//!
//! 1. Initialize k centroids with greedy k-means++
//! 2. **Assign**: Each point → nearest centroid (ties → lowest index)
//! 3. **Update**: Each centroid → mean of assigned points
//! 4. Repeat until no point changes cluster, or `max_iter` updates
//!
//! **Why it converges**: WCSS decreases monotonically. Each step either
//! decreases WCSS or leaves it unchanged, and there are finitely many
//! partitions.
//!
//! Assignment is independent per point and runs in parallel with the
//! `parallel` feature. The update is a barrier: it reads the complete
//! assignment of the current iteration.
//!
//! # Empty clusters
//!
//! A cluster that loses every point is re-seeded at the point currently
//! farthest from its own centroid (taken from a cluster that keeps at least
//! one other member). This never raises WCSS.
//!
//! # Restarts
//!
//! `n_init` independent seedings are run and the lowest-inertia fit is kept.
//! The default is a single attempt.

use std::time::Instant;

use ndarray::Array2;
use rand::prelude::*;
use tracing::{debug, info, warn};

use super::result::{assign, validate_input, ClusteringResult};
use super::seeding::kmeans_plus_plus;
use super::traits::Clustering;
use crate::error::{Error, Result};
use crate::points::Points;

/// Full-batch k-means clustering algorithm.
#[derive(Debug, Clone)]
pub struct Kmeans {
    /// Number of clusters.
    k: usize,
    /// Maximum update steps per attempt.
    max_iter: usize,
    /// Independent seeding attempts.
    n_init: usize,
    /// Random seed.
    seed: Option<u64>,
}

impl Kmeans {
    /// Create a new K-means clusterer.
    pub fn new(k: usize) -> Self {
        Self {
            k,
            max_iter: 100,
            n_init: 1,
            seed: None,
        }
    }

    /// Set maximum iterations.
    pub fn with_max_iter(mut self, max_iter: usize) -> Self {
        self.max_iter = max_iter.max(1);
        self
    }

    /// Set the number of seeding attempts.
    pub fn with_n_init(mut self, n_init: usize) -> Self {
        self.n_init = n_init.max(1);
        self
    }

    /// Set random seed for reproducibility.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    fn fit_once(&self, data: Points<'_>, all: &[usize], rng: &mut StdRng) -> ClusteringResult {
        let mut centroids = kmeans_plus_plus(data, all, self.k, rng);
        let (mut labels, mut dists) = assign(data, centroids.view());
        let mut history = vec![dists.iter().sum::<f64>()];
        let mut converged = false;
        let mut n_iter = 0;

        while n_iter < self.max_iter {
            n_iter += 1;
            centroids = self.update_centroids(data, &labels, &dists);

            let (new_labels, new_dists) = assign(data, centroids.view());
            let inertia: f64 = new_dists.iter().sum();
            debug!(iteration = n_iter, inertia, "k-means step");
            history.push(inertia);

            let changed = new_labels != labels;
            labels = new_labels;
            dists = new_dists;
            if !changed {
                converged = true;
                break;
            }
        }

        ClusteringResult {
            centroids,
            labels,
            inertia: dists.iter().sum(),
            n_iter,
            inertia_history: history,
            converged,
        }
    }

    /// Means of the current assignment, re-seeding empty clusters.
    fn update_centroids(&self, data: Points<'_>, labels: &[usize], dists: &[f64]) -> Array2<f64> {
        let d = data.ncols();
        let mut sums = Array2::<f64>::zeros((self.k, d));
        let mut counts = vec![0usize; self.k];
        for (i, &k) in labels.iter().enumerate() {
            data.add_row_to(i, sums.row_mut(k), 1.0);
            counts[k] += 1;
        }

        let empty: Vec<usize> = (0..self.k).filter(|&k| counts[k] == 0).collect();
        if !empty.is_empty() {
            let mut labels = labels.to_vec();
            let mut dists = dists.to_vec();
            for k in empty {
                let far = (0..labels.len())
                    .filter(|&i| counts[labels[i]] > 1)
                    .fold(None, |best: Option<usize>, i| match best {
                        Some(b) if dists[b] >= dists[i] => Some(b),
                        _ => Some(i),
                    });
                let Some(far) = far else { continue };
                let old = labels[far];
                warn!(cluster = k, point = far, "re-seeding empty cluster");
                data.add_row_to(far, sums.row_mut(old), -1.0);
                counts[old] -= 1;
                sums.row_mut(k).fill(0.0);
                data.add_row_to(far, sums.row_mut(k), 1.0);
                counts[k] = 1;
                labels[far] = k;
                dists[far] = 0.0;
            }
        }

        for (mut row, &count) in sums.rows_mut().into_iter().zip(&counts) {
            if count > 0 {
                row.mapv_inplace(|v| v / count as f64);
            }
        }
        sums
    }
}

impl Clustering for Kmeans {
    fn fit(&self, data: Points<'_>) -> Result<ClusteringResult> {
        validate_input(data, self.k)?;
        let start = Instant::now();
        let all: Vec<usize> = (0..data.nrows()).collect();

        let mut master = StdRng::seed_from_u64(self.seed.unwrap_or_else(rand::random));
        let mut best: Option<ClusteringResult> = None;
        for attempt in 0..self.n_init {
            let mut rng = StdRng::seed_from_u64(master.random());
            let result = self.fit_once(data, &all, &mut rng);
            debug!(
                attempt,
                inertia = result.inertia,
                n_iter = result.n_iter,
                "k-means attempt finished"
            );
            if best.as_ref().map_or(true, |b| result.inertia < b.inertia) {
                best = Some(result);
            }
        }

        let best = best.ok_or_else(|| Error::invalid("n_init", "must be positive"))?;
        info!(
            k = self.k,
            n_samples = data.nrows(),
            inertia = best.inertia,
            n_iter = best.n_iter,
            converged = best.converged,
            elapsed_ms = start.elapsed().as_millis() as u64,
            "k-means fitted"
        );
        Ok(best)
    }

    fn n_clusters(&self) -> usize {
        self.k
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::{array, Array2};
    use proptest::prelude::*;
    use sprs::CsMat;

    fn blobs() -> Array2<f64> {
        array![[0.0, 0.0], [0.1, 0.1], [10.0, 10.0], [10.1, 10.1]]
    }

    #[test]
    fn test_kmeans_basic() {
        let kmeans = Kmeans::new(2).with_seed(42);
        let labels = kmeans.fit_predict(blobs().view().into()).unwrap();

        // Points 0,1 should be in same cluster, points 2,3 in another
        assert_eq!(labels[0], labels[1]);
        assert_eq!(labels[2], labels[3]);
        assert_ne!(labels[0], labels[2]);
    }

    #[test]
    fn test_kmeans_all_points_assigned() {
        let data = Array2::from_shape_fn((50, 2), |(i, j)| {
            if j == 0 {
                i as f64 * 0.1
            } else {
                (i % 5) as f64
            }
        });

        let result = Kmeans::new(5).with_seed(123).fit(data.view().into()).unwrap();

        assert_eq!(result.labels().len(), 50);
        for &label in result.labels() {
            assert!(label < 5, "label {} out of range", label);
        }
        assert_eq!(result.cluster_sizes().iter().sum::<usize>(), 50);
    }

    #[test]
    fn test_kmeans_k_equals_n() {
        let data = array![[0.0, 0.0], [1.0, 0.0], [0.0, 1.0]];
        let labels = Kmeans::new(3).with_seed(42).fit_predict(data.view().into()).unwrap();

        let unique: std::collections::HashSet<_> = labels.iter().collect();
        assert_eq!(unique.len(), 3);
    }

    #[test]
    fn test_kmeans_deterministic_with_seed() {
        let data = Array2::from_shape_fn((40, 3), |(i, j)| ((i * 7 + j * 3) % 11) as f64);
        let a = Kmeans::new(4).with_seed(42).with_n_init(3).fit(data.view().into()).unwrap();
        let b = Kmeans::new(4).with_seed(42).with_n_init(3).fit(data.view().into()).unwrap();
        assert_eq!(a.labels(), b.labels());
        assert_eq!(a.centroids(), b.centroids());
    }

    #[test]
    fn test_kmeans_converges_and_reports_inertia() {
        let result = Kmeans::new(2).with_seed(1).fit(blobs().view().into()).unwrap();
        assert!(result.converged());
        // Each blob contributes 2 × (0.05² + 0.05²).
        assert!((result.inertia() - 0.02).abs() < 1e-9);
        let c = result.centroids();
        let k = result.labels()[0];
        assert!((c[[k, 0]] - 0.05).abs() < 1e-12);
    }

    #[test]
    fn test_kmeans_empty_input_error() {
        let data = Array2::<f64>::zeros((0, 2));
        assert!(Kmeans::new(2).fit(data.view().into()).unwrap_err().is_configuration());
    }

    #[test]
    fn test_kmeans_k_larger_than_n_error() {
        let data = array![[0.0, 0.0], [1.0, 1.0]];
        let err = Kmeans::new(5).fit(data.view().into()).unwrap_err();
        assert!(err.is_configuration());
        assert!(Kmeans::new(0).fit(data.view().into()).is_err());
    }

    #[test]
    fn test_reseed_empty_cluster() {
        // Clusters 1 and 2 both sit on the same far point, so one of them
        // ends up empty after the first assignment.
        let data = array![[0.0], [0.2], [5.0], [10.0]];
        let kmeans = Kmeans::new(3);
        let labels = vec![0, 0, 1, 0];
        let dists = vec![0.0, 0.04, 0.0, 100.0];
        let centroids = kmeans.update_centroids(data.view().into(), &labels, &dists);
        // Point 3 is farthest from its centroid and moves into cluster 2.
        assert_eq!(centroids[[2, 0]], 10.0);
        assert!((centroids[[0, 0]] - 0.1).abs() < 1e-12);
        assert_eq!(centroids[[1, 0]], 5.0);
    }

    #[test]
    fn test_sparse_rows_cluster_like_dense() {
        // Two groups of unit rows over disjoint terms.
        let dense = array![
            [1.0, 0.0, 0.0, 0.0],
            [0.8, 0.6, 0.0, 0.0],
            [0.0, 0.0, 0.6, 0.8],
            [0.0, 0.0, 1.0, 0.0],
        ];
        let sparse = CsMat::new(
            (4, 4),
            vec![0, 1, 3, 5, 6],
            vec![0, 0, 1, 2, 3, 2],
            vec![1.0, 0.8, 0.6, 0.6, 0.8, 1.0],
        );
        let a = Kmeans::new(2).with_seed(3).fit(dense.view().into()).unwrap();
        let b = Kmeans::new(2).with_seed(3).fit((&sparse).into()).unwrap();
        assert_eq!(a.labels(), b.labels());
        assert!((a.inertia() - b.inertia()).abs() < 1e-9);
        assert_eq!(b.labels()[0], b.labels()[1]);
        assert_ne!(b.labels()[0], b.labels()[2]);

        let csc = sparse.to_csc();
        assert!(Kmeans::new(2).fit((&csc).into()).unwrap_err().is_configuration());
    }

    proptest! {
        #[test]
        fn prop_inertia_non_increasing(
            values in prop::collection::vec(-5.0f64..5.0, 60),
            k in 1usize..6,
            seed in any::<u64>(),
        ) {
            let data = Array2::from_shape_vec((20, 3), values).unwrap();
            let result = Kmeans::new(k).with_seed(seed).fit(data.view().into()).unwrap();
            for w in result.inertia_history().windows(2) {
                prop_assert!(w[1] <= w[0] + 1e-9 * w[0].abs().max(1.0));
            }
            prop_assert!(result.labels().iter().all(|&l| l < k));
        }
    }
}
