//! Clustering traits.

use super::ClusteringResult;
use crate::error::Result;
use crate::points::Points;

/// Trait for centroid-based clustering algorithms.
pub trait Clustering {
    /// Fit the model to `n × d` data, dense or sparse.
    ///
    /// Fails with a configuration error unless `1 ≤ K ≤ n`. The input is
    /// never modified.
    fn fit(&self, data: Points<'_>) -> Result<ClusteringResult>;

    /// Fit and return only the cluster labels, one per input row.
    fn fit_predict(&self, data: Points<'_>) -> Result<Vec<usize>> {
        Ok(self.fit(data)?.labels)
    }

    /// Get the number of clusters.
    fn n_clusters(&self) -> usize;
}
