//! Mini-batch k-means.
//!
//! Same objective as [`Kmeans`](super::Kmeans), but each step looks at a
//! random batch of `batch_size` points (drawn with replacement) instead of
//! the whole data set.
//!
//! # Update rule
//!
//! Every centroid keeps a running count `nₖ` of the points it has absorbed.
//! For a batch contributing `bₖ` points with sum `sₖ` to centroid `k`:
//!
//! ```text
//! μₖ ← (nₖ μₖ + sₖ) / (nₖ + bₖ)        nₖ ← nₖ + bₖ
//! ```
//!
//! so later batches move a centroid less as it accumulates points. Batches
//! are applied strictly one after another; only the assignment inside a batch
//! runs in parallel.
//!
//! # Initialization
//!
//! Seeding runs greedy k-means++ on a random sample of `init_size` points
//! rather than on the full data. `n_init` samples are tried and the seeding
//! with the lowest inertia on its own sample wins. The full-batch variant
//! seeds once on all points instead.
//!
//! # Stopping
//!
//! At most `ceil(max_iter × n / batch_size)` steps (`max_iter` epochs). The
//! run stops early once the exponentially weighted average of the per-point
//! batch inertia has not improved for `max_no_improvement` consecutive steps.
//!
//! The result is an approximate local optimum; the final labels and inertia
//! come from one full assignment pass against the final centroids.

use std::time::Instant;

use ndarray::Array2;
use rand::prelude::*;
use rand::seq::index;
use tracing::{debug, info};

use super::result::{assign, assign_rows, validate_input, ClusteringResult};
use super::seeding::kmeans_plus_plus;
use super::traits::Clustering;
use crate::error::Result;
use crate::points::Points;

/// Mini-batch k-means clustering.
#[derive(Debug, Clone)]
pub struct MiniBatchKmeans {
    k: usize,
    batch_size: usize,
    init_size: Option<usize>,
    max_iter: usize,
    n_init: usize,
    max_no_improvement: usize,
    seed: Option<u64>,
}

impl MiniBatchKmeans {
    /// Create a mini-batch clusterer with batches of 1000 points.
    pub fn new(k: usize) -> Self {
        Self {
            k,
            batch_size: 1000,
            init_size: None,
            max_iter: 100,
            n_init: 1,
            max_no_improvement: 10,
            seed: None,
        }
    }

    /// Points per batch.
    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }

    /// Seeding sample size. Defaults to `3 × batch_size`.
    pub fn with_init_size(mut self, init_size: usize) -> Self {
        self.init_size = Some(init_size.max(1));
        self
    }

    /// Maximum number of epochs.
    pub fn with_max_iter(mut self, max_iter: usize) -> Self {
        self.max_iter = max_iter.max(1);
        self
    }

    /// Number of seeding samples tried.
    pub fn with_n_init(mut self, n_init: usize) -> Self {
        self.n_init = n_init.max(1);
        self
    }

    /// Early-stop patience in steps; 0 disables early stopping.
    pub fn with_max_no_improvement(mut self, steps: usize) -> Self {
        self.max_no_improvement = steps;
        self
    }

    /// Set random seed for reproducibility.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    fn effective_init_size(&self, n: usize) -> usize {
        let mut size = self.init_size.unwrap_or(3 * self.batch_size);
        if size < self.k {
            size = 3 * self.k;
        }
        size.min(n)
    }

    /// Best seeding over `n_init` random samples.
    fn init_centroids(&self, data: Points<'_>, rng: &mut StdRng) -> Array2<f64> {
        let n = data.nrows();
        let init_size = self.effective_init_size(n);
        let mut best: Option<(Array2<f64>, f64)> = None;
        for _ in 0..self.n_init {
            let sample = index::sample(rng, n, init_size).into_vec();
            let centroids = kmeans_plus_plus(data, &sample, self.k, rng);
            let inertia: f64 = assign_rows(data, &sample, centroids.view()).1.iter().sum();
            if best.as_ref().map_or(true, |(_, b)| inertia < *b) {
                best = Some((centroids, inertia));
            }
        }
        match best {
            Some((centroids, _)) => centroids,
            None => {
                let all: Vec<usize> = (0..n).collect();
                kmeans_plus_plus(data, &all, self.k, rng)
            }
        }
    }
}

/// Fold one batch into the running means.
///
/// `sums[k]` and `batch_counts[k]` are the sum and number of batch points
/// assigned to centroid `k`; `counts[k]` is how many points the centroid has
/// absorbed before this batch. Centroids that received nothing are left
/// untouched.
fn absorb_batch(
    centroids: &mut Array2<f64>,
    counts: &mut [f64],
    sums: &Array2<f64>,
    batch_counts: &[usize],
) {
    for (k, &b) in batch_counts.iter().enumerate() {
        if b == 0 {
            continue;
        }
        let old = counts[k];
        let new = old + b as f64;
        let mut centroid = centroids.row_mut(k);
        centroid.mapv_inplace(|v| v * old);
        centroid += &sums.row(k);
        centroid.mapv_inplace(|v| v / new);
        counts[k] = new;
    }
}

impl Clustering for MiniBatchKmeans {
    fn fit(&self, data: Points<'_>) -> Result<ClusteringResult> {
        validate_input(data, self.k)?;
        let start = Instant::now();
        let n = data.nrows();
        let mut rng = StdRng::seed_from_u64(self.seed.unwrap_or_else(rand::random));

        let mut centroids = self.init_centroids(data, &mut rng);
        let mut counts = vec![0.0f64; self.k];

        let batch_size = self.batch_size.min(n);
        let n_steps = (self.max_iter * n).div_ceil(batch_size).max(1);
        let alpha = (2.0 * batch_size as f64 / (n as f64 + 1.0)).min(1.0);

        let mut ewa: Option<f64> = None;
        let mut best_ewa = f64::INFINITY;
        let mut no_improvement = 0;
        let mut history = Vec::new();
        let mut converged = false;
        let mut steps = 0;

        for step in 0..n_steps {
            steps = step + 1;
            let batch: Vec<usize> = (0..batch_size).map(|_| rng.random_range(0..n)).collect();
            let (labels, dists) = assign_rows(data, &batch, centroids.view());

            let mut sums = Array2::<f64>::zeros(centroids.raw_dim());
            let mut batch_counts = vec![0usize; self.k];
            for (&i, &k) in batch.iter().zip(&labels) {
                data.add_row_to(i, sums.row_mut(k), 1.0);
                batch_counts[k] += 1;
            }
            absorb_batch(&mut centroids, &mut counts, &sums, &batch_counts);

            let batch_inertia = dists.iter().sum::<f64>() / batch_size as f64;
            let smoothed = match ewa {
                Some(prev) => prev * (1.0 - alpha) + batch_inertia * alpha,
                None => batch_inertia,
            };
            ewa = Some(smoothed);
            history.push(smoothed);
            debug!(step, batch_inertia, ewa = smoothed, "mini-batch step");

            if smoothed < best_ewa {
                best_ewa = smoothed;
                no_improvement = 0;
            } else {
                no_improvement += 1;
                if self.max_no_improvement > 0 && no_improvement >= self.max_no_improvement {
                    converged = true;
                    break;
                }
            }
        }

        let (labels, dists) = assign(data, centroids.view());
        let inertia: f64 = dists.iter().sum();
        info!(
            k = self.k,
            n_samples = n,
            batch_size,
            steps,
            inertia,
            converged,
            elapsed_ms = start.elapsed().as_millis() as u64,
            "mini-batch k-means fitted"
        );

        Ok(ClusteringResult {
            centroids,
            labels,
            inertia,
            n_iter: steps,
            inertia_history: history,
            converged,
        })
    }

    fn n_clusters(&self) -> usize {
        self.k
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::{array, Array2};
    use sprs::CsMat;

    fn two_blobs(n_per: usize) -> Array2<f64> {
        Array2::from_shape_fn((2 * n_per, 2), |(i, j)| {
            let base = if i < n_per { 0.0 } else { 20.0 };
            base + ((i * 31 + j * 17) % 10) as f64 * 0.1
        })
    }

    #[test]
    fn test_separates_blobs() {
        let data = two_blobs(100);
        let result = MiniBatchKmeans::new(2)
            .with_batch_size(32)
            .with_seed(5)
            .fit(data.view().into())
            .unwrap();
        let labels = result.labels();
        assert_eq!(labels.len(), 200);
        assert!(labels[..100].iter().all(|&l| l == labels[0]));
        assert!(labels[100..].iter().all(|&l| l == labels[100]));
        assert_ne!(labels[0], labels[100]);
    }

    #[test]
    fn test_deterministic_with_seed() {
        let data = two_blobs(50);
        let a = MiniBatchKmeans::new(3).with_batch_size(16).with_seed(9).fit(data.view().into()).unwrap();
        let b = MiniBatchKmeans::new(3).with_batch_size(16).with_seed(9).fit(data.view().into()).unwrap();
        assert_eq!(a.labels(), b.labels());
        assert_eq!(a.centroids(), b.centroids());
    }

    #[test]
    fn test_batch_update_is_a_running_mean() {
        // Centroid 0 has absorbed 2 points with mean 0; a batch brings 2
        // points at 3. Centroid 1 gets nothing this batch.
        let mut centroids = array![[0.0], [7.0]];
        let mut counts = vec![2.0, 5.0];
        let sums = array![[6.0], [0.0]];
        absorb_batch(&mut centroids, &mut counts, &sums, &[2, 0]);
        assert_eq!(centroids, array![[1.5], [7.0]]);
        assert_eq!(counts, vec![4.0, 5.0]);

        // A second identical batch moves it less: (4 × 1.5 + 6) / 6 = 2.
        absorb_batch(&mut centroids, &mut counts, &sums, &[2, 0]);
        assert_eq!(centroids[[0, 0]], 2.0);
        assert_eq!(counts[0], 6.0);
    }

    #[test]
    fn test_first_batch_replaces_the_seed() {
        let mut centroids = array![[10.0, -4.0]];
        let mut counts = vec![0.0];
        let sums = array![[3.0, 6.0]];
        absorb_batch(&mut centroids, &mut counts, &sums, &[3]);
        assert_eq!(centroids, array![[1.0, 2.0]]);
        assert_eq!(counts, vec![3.0]);
    }

    #[test]
    fn test_sparse_input() {
        // Two groups of unit rows over disjoint terms, 20 rows each.
        let mut indptr = vec![0];
        let mut indices = Vec::new();
        let mut data = Vec::new();
        for i in 0..40 {
            let base = if i < 20 { 0 } else { 2 };
            let t = (i % 5) as f64 * 0.1;
            let (a, b) = ((1.0 - t * t).sqrt(), t);
            indices.extend([base, base + 1]);
            data.extend([a, b]);
            indptr.push(indices.len());
        }
        let x = CsMat::new((40, 4), indptr, indices, data);
        let result = MiniBatchKmeans::new(2)
            .with_batch_size(8)
            .with_seed(2)
            .fit((&x).into())
            .unwrap();
        let labels = result.labels();
        assert!(labels[..20].iter().all(|&l| l == labels[0]));
        assert!(labels[20..].iter().all(|&l| l == labels[20]));
        assert_ne!(labels[0], labels[20]);
    }

    #[test]
    fn test_init_size_raised_to_k() {
        let m = MiniBatchKmeans::new(10).with_init_size(4);
        assert_eq!(m.effective_init_size(1000), 30);
        assert_eq!(m.effective_init_size(12), 12);
    }

    #[test]
    fn test_invalid_k() {
        let data = two_blobs(2);
        assert!(MiniBatchKmeans::new(5).fit(data.view().into()).unwrap_err().is_configuration());
    }

    #[test]
    fn test_step_cap() {
        let data = two_blobs(10);
        let result = MiniBatchKmeans::new(2)
            .with_batch_size(5)
            .with_max_iter(1)
            .with_max_no_improvement(0)
            .with_seed(1)
            .fit(data.view().into())
            .unwrap();
        // One epoch over 20 points in batches of 5.
        assert_eq!(result.n_iter(), 4);
        assert!(!result.converged());
    }
}
