//! Top terms per cluster.
//!
//! Centroids of a term-weighted clustering are weights over the vocabulary,
//! so their largest coordinates name what the cluster is about. When LSA was
//! applied the centroids live in the reduced space and are first mapped back
//! with the stored basis (`μ Vᵣᵀ`).

use ndarray::Array2;
use serde::{Deserialize, Serialize};

use crate::cluster::ClusteringResult;
use crate::error::{Error, Result};
use crate::transform::FeatureTransform;

/// Ranked terms for one cluster.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClusterTerms {
    /// Cluster id.
    pub cluster: usize,
    /// `(term, centroid weight)`, heaviest first.
    pub terms: Vec<(String, f64)>,
}

/// The `n_terms` heaviest terms of every centroid.
///
/// Ties in weight go to the lower feature index. Fails with
/// [`Error::Unsupported`] for a hashed transform, which has no
/// index-to-term mapping.
pub fn top_terms(
    transform: &FeatureTransform,
    result: &ClusteringResult,
    n_terms: usize,
) -> Result<Vec<ClusterTerms>> {
    let vocabulary = transform
        .vectorizer()
        .vocabulary()
        .ok_or(Error::Unsupported("hashed features cannot be mapped back to terms"))?;

    let centroids: Array2<f64> = match transform.lsa() {
        Some(lsa) => lsa.inverse_transform(result.centroids())?,
        None => result.centroids().to_owned(),
    };
    if centroids.ncols() != vocabulary.len() {
        return Err(Error::DimensionMismatch {
            expected: vocabulary.len(),
            found: centroids.ncols(),
        });
    }

    let take = n_terms.min(vocabulary.len());
    let clusters = centroids
        .rows()
        .into_iter()
        .enumerate()
        .map(|(cluster, row)| {
            let mut order: Vec<usize> = (0..row.len()).collect();
            order.sort_by(|&a, &b| row[b].total_cmp(&row[a]).then(a.cmp(&b)));
            let terms = order
                .into_iter()
                .take(take)
                .filter_map(|i| vocabulary.term(i).map(|t| (t.to_string(), row[i])))
                .collect();
            ClusterTerms { cluster, terms }
        })
        .collect();
    Ok(clusters)
}
