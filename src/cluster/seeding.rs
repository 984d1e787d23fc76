//! Greedy k-means++ seeding.
//!
//! 1. Choose the first centroid uniformly at random.
//! 2. For each further centroid, draw `2 + ⌊ln K⌋` candidates with
//!    probability proportional to D(x)², the squared distance to the nearest
//!    centroid chosen so far, and keep the candidate that leaves the smallest
//!    total potential Σ D(x)².
//!
//! Plain k-means++ is the single-candidate case.
//!
//! Candidates are drawn from a subset of rows (all of them for full-batch,
//! an `init_size` sample for mini-batch). Chosen centroids are dense copies
//! of their rows, so the data itself may stay sparse.

use ndarray::{Array1, Array2};
use rand::Rng;

use crate::parallel::map_ordered;
use crate::points::Points;

/// Pick `k` of the listed `rows` of `data` as initial centroids.
///
/// `rows` must hold at least `k` entries.
pub(crate) fn kmeans_plus_plus<R: Rng>(
    data: Points<'_>,
    rows: &[usize],
    k: usize,
    rng: &mut R,
) -> Array2<f64> {
    let n = rows.len();
    let mut centroids = Array2::zeros((k, data.ncols()));
    let n_trials = 2 + (k as f64).ln().floor() as usize;

    let first = rows[rng.random_range(0..n)];
    let center = data.row_to_dense(first);
    let mut closest = distances_to(data, rows, &center);
    centroids.row_mut(0).assign(&center);
    let mut potential: f64 = closest.iter().sum();

    for c in 1..k {
        if potential <= 0.0 {
            // Every point coincides with a chosen centroid.
            let idx = rows[rng.random_range(0..n)];
            centroids.row_mut(c).assign(&data.row_to_dense(idx));
            continue;
        }

        let mut best: Option<(Array1<f64>, Vec<f64>, f64)> = None;
        for _ in 0..n_trials {
            let candidate = data.row_to_dense(rows[sample_weighted(&closest, potential, rng)]);
            let to_candidate = distances_to(data, rows, &candidate);
            let merged: Vec<f64> = closest
                .iter()
                .zip(&to_candidate)
                .map(|(a, b)| a.min(*b))
                .collect();
            let candidate_potential: f64 = merged.iter().sum();
            let better = match &best {
                Some((_, _, p)) => candidate_potential < *p,
                None => true,
            };
            if better {
                best = Some((candidate, merged, candidate_potential));
            }
        }

        if let Some((center, merged, p)) = best {
            centroids.row_mut(c).assign(&center);
            closest = merged;
            potential = p;
        }
    }

    centroids
}

/// Squared distance from each listed row to `center`.
fn distances_to(data: Points<'_>, rows: &[usize], center: &Array1<f64>) -> Vec<f64> {
    let norm = center.dot(center);
    map_ordered(rows, |&i| data.squared_distance_to(i, center.view(), norm))
}

/// Index drawn with probability proportional to `weights[i]`.
fn sample_weighted<R: Rng>(weights: &[f64], total: f64, rng: &mut R) -> usize {
    let threshold = rng.random::<f64>() * total;
    let mut cumsum = 0.0;
    let mut last_positive = 0;
    for (i, &w) in weights.iter().enumerate() {
        if w > 0.0 {
            last_positive = i;
        }
        cumsum += w;
        if cumsum > threshold && w > 0.0 {
            return i;
        }
    }
    last_positive
}
