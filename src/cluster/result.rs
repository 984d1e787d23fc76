//! Fitted clustering and nearest-centroid assignment.

use ndarray::{Array2, ArrayView1, ArrayView2, Axis};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::parallel::{map_ordered, map_range};
use crate::points::Points;

/// Output of one fit call. Never mutated after construction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClusteringResult {
    pub(crate) centroids: Array2<f64>,
    pub(crate) labels: Vec<usize>,
    pub(crate) inertia: f64,
    pub(crate) n_iter: usize,
    pub(crate) inertia_history: Vec<f64>,
    pub(crate) converged: bool,
}

impl ClusteringResult {
    /// `K × d` centroids, in the space the clustering was fit on.
    pub fn centroids(&self) -> ArrayView2<'_, f64> {
        self.centroids.view()
    }

    /// Cluster id of every input row, in `[0, K)`.
    pub fn labels(&self) -> &[usize] {
        &self.labels
    }

    /// Number of clusters.
    pub fn n_clusters(&self) -> usize {
        self.centroids.nrows()
    }

    /// Sum of squared distances from each row to its centroid.
    pub fn inertia(&self) -> f64 {
        self.inertia
    }

    /// Iterations (full-batch) or mini-batch steps run.
    pub fn n_iter(&self) -> usize {
        self.n_iter
    }

    /// Inertia after each full-batch assignment step, or the smoothed batch
    /// inertia after each mini-batch step.
    pub fn inertia_history(&self) -> &[f64] {
        &self.inertia_history
    }

    /// Whether the fit stopped before its iteration cap.
    pub fn converged(&self) -> bool {
        self.converged
    }

    /// Number of rows assigned to each cluster.
    pub fn cluster_sizes(&self) -> Vec<usize> {
        let mut sizes = vec![0; self.n_clusters()];
        for &l in &self.labels {
            sizes[l] += 1;
        }
        sizes
    }

    /// Nearest centroid for a new point.
    pub fn predict(&self, point: ArrayView1<'_, f64>) -> Result<usize> {
        if point.len() != self.centroids.ncols() {
            return Err(Error::DimensionMismatch {
                expected: self.centroids.ncols(),
                found: point.len(),
            });
        }
        Ok(nearest(point, self.centroids.view()).0)
    }

    /// Nearest centroid for every row.
    pub fn predict_many<'a>(&self, data: impl Into<Points<'a>>) -> Result<Vec<usize>> {
        let data = data.into();
        if data.ncols() != self.centroids.ncols() {
            return Err(Error::DimensionMismatch {
                expected: self.centroids.ncols(),
                found: data.ncols(),
            });
        }
        if !data.is_row_major() {
            return Err(Error::invalid("data", "sparse input must be in CSR layout"));
        }
        Ok(assign(data, self.centroids.view()).0)
    }

    /// Reject a deserialized result whose labels or centroids are unusable.
    pub(crate) fn check(&self) -> Result<()> {
        let k = self.n_clusters();
        if k == 0 {
            return Err(Error::InvalidClusterCount {
                requested: 0,
                n_items: self.labels.len(),
            });
        }
        if let Some(&label) = self.labels.iter().find(|&&l| l >= k) {
            return Err(Error::DimensionMismatch {
                expected: k,
                found: label + 1,
            });
        }
        if self.centroids.iter().any(|v| !v.is_finite()) {
            return Err(Error::invalid("centroids", "contain non-finite values"));
        }
        Ok(())
    }
}

/// Squared Euclidean distance.
pub(crate) fn squared_distance(a: ArrayView1<'_, f64>, b: ArrayView1<'_, f64>) -> f64 {
    a.iter().zip(b.iter()).map(|(x, y)| (x - y).powi(2)).sum()
}

/// Closest centroid and its squared distance. Exact ties go to the lowest
/// index.
pub(crate) fn nearest(point: ArrayView1<'_, f64>, centroids: ArrayView2<'_, f64>) -> (usize, f64) {
    let mut best_cluster = 0;
    let mut best_dist = f64::INFINITY;
    for (k, centroid) in centroids.axis_iter(Axis(0)).enumerate() {
        let dist = squared_distance(point, centroid);
        if dist < best_dist {
            best_dist = dist;
            best_cluster = k;
        }
    }
    (best_cluster, best_dist)
}

/// `‖μₖ‖²` for every centroid row.
pub(crate) fn squared_norms(centroids: ArrayView2<'_, f64>) -> Vec<f64> {
    centroids.rows().into_iter().map(|c| c.dot(&c)).collect()
}

/// Closest centroid to row `i` of `data`, with the same tie rule as
/// [`nearest`].
fn nearest_row(
    data: Points<'_>,
    i: usize,
    centroids: ArrayView2<'_, f64>,
    norms: &[f64],
) -> (usize, f64) {
    let mut best_cluster = 0;
    let mut best_dist = f64::INFINITY;
    for (k, centroid) in centroids.axis_iter(Axis(0)).enumerate() {
        let dist = data.squared_distance_to(i, centroid, norms[k]);
        if dist < best_dist {
            best_dist = dist;
            best_cluster = k;
        }
    }
    (best_cluster, best_dist)
}

/// Assign every row to its nearest centroid. Rows are independent, so this
/// fans out when `parallel` is enabled.
pub(crate) fn assign(data: Points<'_>, centroids: ArrayView2<'_, f64>) -> (Vec<usize>, Vec<f64>) {
    let norms = squared_norms(centroids);
    map_range(data.nrows(), |i| nearest_row(data, i, centroids, &norms))
        .into_iter()
        .unzip()
}

/// Assign the listed rows only, in the order given.
pub(crate) fn assign_rows(
    data: Points<'_>,
    rows: &[usize],
    centroids: ArrayView2<'_, f64>,
) -> (Vec<usize>, Vec<f64>) {
    let norms = squared_norms(centroids);
    map_ordered(rows, |&i| nearest_row(data, i, centroids, &norms))
        .into_iter()
        .unzip()
}

/// Reject cluster counts outside `[1, n]`, non-finite input and sparse input
/// that is not row-major.
pub(crate) fn validate_input(data: Points<'_>, k: usize) -> Result<()> {
    let n = data.nrows();
    if k == 0 || k > n {
        return Err(Error::InvalidClusterCount {
            requested: k,
            n_items: n,
        });
    }
    if data.ncols() == 0 {
        return Err(Error::invalid("data", "rows have zero dimensions"));
    }
    if !data.is_row_major() {
        return Err(Error::invalid("data", "sparse input must be in CSR layout"));
    }
    if !data.is_finite() {
        return Err(Error::invalid("data", "contains non-finite values"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;
    use sprs::CsMat;

    #[test]
    fn test_nearest_ties_lowest_index() {
        let centroids = array![[1.0, 0.0], [-1.0, 0.0]];
        let (k, d) = nearest(array![0.0, 0.0].view(), centroids.view());
        assert_eq!(k, 0);
        assert!((d - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_predict_dimension_mismatch() {
        let result = ClusteringResult {
            centroids: array![[0.0, 0.0], [5.0, 5.0]],
            labels: vec![0, 1],
            inertia: 0.0,
            n_iter: 1,
            inertia_history: vec![0.0],
            converged: true,
        };
        assert_eq!(result.predict(array![4.0, 4.5].view()).unwrap(), 1);
        assert!(result.predict(array![1.0].view()).is_err());
        assert_eq!(result.cluster_sizes(), vec![1, 1]);
    }

    #[test]
    fn test_validate_input() {
        let data = array![[0.0], [1.0]];
        assert!(validate_input((&data).into(), 0).is_err());
        assert!(validate_input((&data).into(), 3).is_err());
        assert!(validate_input((&data).into(), 2).is_ok());
        let bad = array![[f64::NAN], [1.0]];
        assert!(validate_input((&bad).into(), 1).is_err());
    }

    #[test]
    fn test_sparse_assignment_matches_dense() {
        let dense = array![[1.0, 0.0, 0.0], [0.0, 0.0, 2.0], [0.9, 0.1, 0.0]];
        let sparse = CsMat::new(
            (3, 3),
            vec![0, 1, 2, 4],
            vec![0, 2, 0, 1],
            vec![1.0, 2.0, 0.9, 0.1],
        );
        let centroids = array![[1.0, 0.0, 0.0], [0.0, 0.0, 1.5]];
        let (dense_labels, dense_dists) = assign((&dense).into(), centroids.view());
        let (sparse_labels, sparse_dists) = assign((&sparse).into(), centroids.view());
        assert_eq!(dense_labels, vec![0, 1, 0]);
        assert_eq!(dense_labels, sparse_labels);
        for (a, b) in dense_dists.iter().zip(&sparse_dists) {
            assert!((a - b).abs() < 1e-12);
        }

        let (labels, _) = assign_rows((&sparse).into(), &[2, 1], centroids.view());
        assert_eq!(labels, vec![0, 1]);
    }

    #[test]
    fn test_check_rejects_out_of_range_labels() {
        let mut result = ClusteringResult {
            centroids: array![[0.0], [1.0]],
            labels: vec![0, 1],
            inertia: 0.0,
            n_iter: 1,
            inertia_history: vec![0.0],
            converged: true,
        };
        assert!(result.check().is_ok());
        result.labels[1] = 2;
        assert!(matches!(
            result.check().unwrap_err(),
            Error::DimensionMismatch { expected: 2, found: 3 }
        ));
    }
}
