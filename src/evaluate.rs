//! Quality report for a fitted clustering.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::cluster::ClusteringResult;
use crate::error::{Error, Result};
use crate::metrics::{ari, completeness, homogeneity, silhouette_score, v_measure};
use crate::points::Points;

/// Scalar metrics computed once from a clustering.
///
/// Label metrics are `None` when no ground truth was supplied; the silhouette
/// is `None` when it is undefined for the assignment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QualityReport {
    /// Each cluster holds a single class.
    pub homogeneity: Option<f64>,
    /// Each class sits in a single cluster.
    pub completeness: Option<f64>,
    /// Harmonic mean of homogeneity and completeness.
    pub v_measure: Option<f64>,
    /// Chance-corrected pair agreement.
    pub adjusted_rand_index: Option<f64>,
    /// Mean silhouette over at most `sample_size` points.
    pub silhouette: Option<f64>,
    /// Final inertia of the clustering.
    pub inertia: f64,
}

impl QualityReport {
    /// Evaluate `result`, fit on `data`, against optional class ids.
    pub fn evaluate<'a>(
        data: impl Into<Points<'a>>,
        result: &ClusteringResult,
        truth: Option<&[usize]>,
        sample_size: usize,
        seed: u64,
    ) -> Result<Self> {
        let pred = result.labels();
        if let Some(truth) = truth {
            if truth.len() != pred.len() {
                return Err(Error::LabelMismatch {
                    documents: pred.len(),
                    labels: truth.len(),
                });
            }
        }

        let silhouette = silhouette_score(data, pred, Some(sample_size), seed)?;
        Ok(Self {
            homogeneity: truth.map(|t| homogeneity(pred, t)),
            completeness: truth.map(|t| completeness(pred, t)),
            v_measure: truth.map(|t| v_measure(pred, t)),
            adjusted_rand_index: truth.map(|t| ari(pred, t)),
            silhouette,
            inertia: result.inertia(),
        })
    }

    /// Available metrics keyed by name.
    pub fn to_map(&self) -> BTreeMap<&'static str, f64> {
        [
            ("homogeneity", self.homogeneity),
            ("completeness", self.completeness),
            ("v_measure", self.v_measure),
            ("adjusted_rand_index", self.adjusted_rand_index),
            ("silhouette", self.silhouette),
            ("inertia", Some(self.inertia)),
        ]
        .into_iter()
        .filter_map(|(name, value)| value.map(|v| (name, v)))
        .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cluster::{Clustering, Kmeans};
    use ndarray::array;

    #[test]
    fn test_report_with_and_without_labels() {
        let data = array![[0.0, 0.0], [0.0, 0.2], [5.0, 5.0], [5.0, 5.2]];
        let result = Kmeans::new(2).with_seed(3).fit(data.view().into()).unwrap();

        let truth: [usize; 4] = [1, 1, 0, 0];
        let report = QualityReport::evaluate(data.view(), &result, Some(&truth[..]), 1000, 0).unwrap();
        assert!((report.homogeneity.unwrap() - 1.0).abs() < 1e-12);
        assert!((report.adjusted_rand_index.unwrap() - 1.0).abs() < 1e-12);
        assert!(report.silhouette.unwrap() > 0.9);
        assert_eq!(report.to_map().len(), 6);

        let unlabeled = QualityReport::evaluate(data.view(), &result, None, 1000, 0).unwrap();
        assert!(unlabeled.homogeneity.is_none());
        assert!(unlabeled.adjusted_rand_index.is_none());
        assert_eq!(
            unlabeled.to_map().keys().copied().collect::<Vec<_>>(),
            vec!["inertia", "silhouette"]
        );
    }

    #[test]
    fn test_label_length_mismatch() {
        let data = array![[0.0], [1.0]];
        let result = Kmeans::new(2).with_seed(0).fit(data.view().into()).unwrap();
        let err = QualityReport::evaluate(data.view(), &result, Some(&[0usize][..]), 10, 0).unwrap_err();
        assert!(matches!(err, Error::LabelMismatch { .. }));
    }
}
