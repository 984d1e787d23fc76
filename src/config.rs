//! Pipeline configuration.
//!
//! Every option has a default matching the classic 20-newsgroups clustering
//! setup: 10k TF-IDF features, mini-batch k-means, no LSA. Configs can be read
//! from JSON; missing fields take their defaults.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::text::TermFrequency;

/// Options recognized by [`Pipeline`](crate::pipeline::Pipeline).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Hash terms into `n_features` buckets instead of building a vocabulary.
    pub use_hashing: bool,
    /// Apply inverse document frequency weighting.
    pub use_idf: bool,
    /// Vocabulary cap (term-weighted) or bucket count (hashed).
    pub n_features: usize,
    /// Target rank for LSA; `None` skips reduction.
    pub n_components: Option<usize>,
    /// Use mini-batch k-means instead of full-batch Lloyd iterations.
    pub minibatch: bool,
    /// Mini-batch sample size per step.
    pub batch_size: usize,
    /// Mini-batch seeding sample size.
    pub init_size: Option<usize>,
    /// Iteration cap (full-batch) or epoch cap (mini-batch).
    pub max_iterations: usize,
    /// Independent seeding attempts.
    pub n_init: usize,
    /// Number of clusters. Derived from the label set when absent.
    pub n_clusters: Option<usize>,
    /// Silhouette sampling cap.
    pub sample_size: usize,
    /// Terms reported per cluster.
    pub n_terms: usize,
    /// Terms in fewer documents are dropped.
    pub min_doc_freq: usize,
    /// Terms in more than this fraction of documents are dropped.
    pub max_doc_fraction: f64,
    /// Term frequency scheme.
    pub term_frequency: TermFrequency,
    /// L2-normalize document vectors.
    pub normalize: bool,
    /// Signed hashing (hashed mode only).
    pub alternate_sign: bool,
    /// Mini-batch early stop patience, in steps.
    pub max_no_improvement: usize,
    /// Seed for every random choice in the pipeline.
    pub random_state: Option<u64>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            use_hashing: false,
            use_idf: true,
            n_features: 10_000,
            n_components: None,
            minibatch: true,
            batch_size: 1000,
            init_size: Some(1000),
            max_iterations: 100,
            n_init: 1,
            n_clusters: None,
            sample_size: 1000,
            n_terms: 10,
            min_doc_freq: 2,
            max_doc_fraction: 0.5,
            term_frequency: TermFrequency::Raw,
            normalize: true,
            alternate_sign: false,
            max_no_improvement: 10,
            random_state: None,
        }
    }
}

impl PipelineConfig {
    /// Read a JSON config file. Absent fields keep their defaults.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&raw)?;
        config.validate()?;
        Ok(config)
    }

    /// Reject parameter values no stage can run with.
    pub fn validate(&self) -> Result<()> {
        if self.n_features == 0 {
            return Err(Error::invalid("n_features", "must be positive"));
        }
        if self.batch_size == 0 {
            return Err(Error::invalid("batch_size", "must be positive"));
        }
        if self.n_init == 0 {
            return Err(Error::invalid("n_init", "must be positive"));
        }
        if self.max_iterations == 0 {
            return Err(Error::invalid("max_iterations", "must be positive"));
        }
        if !(self.max_doc_fraction > 0.0 && self.max_doc_fraction <= 1.0) {
            return Err(Error::invalid(
                "max_doc_fraction",
                format!("must lie in (0, 1], got {}", self.max_doc_fraction),
            ));
        }
        if self.n_components == Some(0) {
            return Err(Error::invalid("n_components", "must be positive"));
        }
        if self.n_clusters == Some(0) {
            return Err(Error::InvalidClusterCount {
                requested: 0,
                n_items: 0,
            });
        }
        if self.init_size == Some(0) {
            return Err(Error::invalid("init_size", "must be positive"));
        }
        Ok(())
    }

    /// Seed used when `random_state` is unset.
    pub(crate) fn seed(&self) -> u64 {
        self.random_state.unwrap_or_else(rand::random)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults_validate() {
        PipelineConfig::default().validate().unwrap();
    }

    #[test]
    fn test_rejects_zero_clusters() {
        let config = PipelineConfig {
            n_clusters: Some(0),
            ..Default::default()
        };
        assert!(config.validate().unwrap_err().is_configuration());
    }

    #[test]
    fn test_rejects_bad_fraction() {
        let config = PipelineConfig {
            max_doc_fraction: 1.5,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_partial_json_keeps_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"use_hashing": true, "n_components": 50}}"#).unwrap();

        let config = PipelineConfig::from_path(file.path()).unwrap();
        assert!(config.use_hashing);
        assert_eq!(config.n_components, Some(50));
        assert_eq!(config.n_features, 10_000);
        assert_eq!(config.term_frequency, TermFrequency::Raw);
    }
}
