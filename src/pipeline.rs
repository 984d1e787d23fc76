//! End-to-end pipeline: features, optional LSA, clustering, evaluation and
//! interpretation.
//!
//! Stages run one after another, each consuming the fitted output of the one
//! before. The products of a run are a [`FittedModel`] (the only state needed
//! to place new documents) and read-only diagnostics.
//!
//! ```rust
//! use textcluster::{Corpus, Pipeline, PipelineConfig};
//!
//! let corpus = Corpus::new([
//!     "goal keeper football",
//!     "football goal striker",
//!     "compiler borrow checker",
//!     "borrow checker lifetimes",
//! ])
//! .with_labels(["sport", "sport", "rust", "rust"])
//! .unwrap();
//!
//! let config = PipelineConfig {
//!     min_doc_freq: 1,
//!     minibatch: false,
//!     random_state: Some(0),
//!     ..Default::default()
//! };
//! let run = Pipeline::new(config).fit(&corpus).unwrap();
//! let cluster = run.model.transform_and_predict("striker football").unwrap();
//! assert_eq!(cluster, run.model.clustering().labels()[0]);
//! ```

use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;
use std::time::Instant;

use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, info};

use crate::cluster::{self, ClusteringResult};
use crate::config::PipelineConfig;
use crate::corpus::Corpus;
use crate::error::{Error, Result};
use crate::evaluate::QualityReport;
use crate::interpret::{top_terms, ClusterTerms};
use crate::points::Points;
use crate::reduce::TruncatedSvd;
use crate::text::{SkippedDocument, Vectorizer};
use crate::transform::FeatureTransform;

const TRANSFORM_FILE: &str = "transform.json";
const CLUSTERING_FILE: &str = "clustering.json";

/// Configured, unfitted pipeline.
#[derive(Debug, Clone, Default)]
pub struct Pipeline {
    config: PipelineConfig,
}

/// Everything one [`Pipeline::fit`] call produces.
#[derive(Debug, Clone)]
pub struct PipelineRun {
    /// Fitted transform and clustering.
    pub model: FittedModel,
    /// Metrics over the surviving documents.
    pub report: QualityReport,
    /// Top terms per cluster; `None` in hashed mode.
    pub top_terms: Option<Vec<ClusterTerms>>,
    /// Documents left out of the feature set.
    pub skipped: Vec<SkippedDocument>,
    /// Corpus index of each clustered row.
    pub doc_indices: Vec<usize>,
    /// Energy captured by LSA, when applied.
    pub explained_variance: Option<f64>,
}

impl Pipeline {
    /// Pipeline with the given options.
    pub fn new(config: PipelineConfig) -> Self {
        Self { config }
    }

    /// Options in use.
    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Fit every stage on `corpus`.
    pub fn fit(&self, corpus: &Corpus) -> Result<PipelineRun> {
        let config = &self.config;
        config.validate()?;
        let start = Instant::now();
        let seed = config.seed();

        let (vectorizer, features) = Vectorizer::from_config(config).fit_transform(corpus)?;

        let k = config
            .n_clusters
            .or_else(|| corpus.n_categories())
            .ok_or_else(|| {
                Error::invalid("n_clusters", "not configured and the corpus has no labels")
            })?;

        let (lsa, reduced) = match config.n_components {
            Some(r) => {
                let (lsa, reduced) = TruncatedSvd::new(r)
                    .with_normalize(config.normalize)
                    .with_seed(seed)
                    .fit_transform(&features)?;
                (Some(lsa), Some(reduced))
            }
            None => (None, None),
        };
        // Without LSA the sparse document-term rows are clustered directly.
        let data: Points<'_> = match &reduced {
            Some(reduced) => reduced.into(),
            None => features.points(),
        };
        let explained_variance = lsa.as_ref().map(|l| l.explained_variance());
        let transform = FeatureTransform::new(vectorizer, lsa);

        let clustering = cluster::from_config(config, k, seed).fit(data)?;

        let truth: Option<Vec<usize>> = corpus
            .label_ids()
            .map(|ids| features.doc_indices().iter().map(|&i| ids[i]).collect());
        let report = QualityReport::evaluate(
            data,
            &clustering,
            truth.as_deref(),
            config.sample_size,
            seed,
        )?;
        debug!(?report, "clustering evaluated");

        let top_terms = if transform.vectorizer().is_hashed() {
            None
        } else {
            Some(top_terms(&transform, &clustering, config.n_terms)?)
        };

        info!(
            n_documents = corpus.len(),
            n_clustered = features.len(),
            k,
            elapsed_ms = start.elapsed().as_millis() as u64,
            "pipeline fitted"
        );

        Ok(PipelineRun {
            model: FittedModel {
                transform,
                clustering,
            },
            report,
            top_terms,
            skipped: features.skipped().to_vec(),
            doc_indices: features.doc_indices().to_vec(),
            explained_variance,
        })
    }
}

/// Fitted transform and clustering: the state a serving layer needs.
#[derive(Debug, Clone, PartialEq)]
pub struct FittedModel {
    transform: FeatureTransform,
    clustering: ClusteringResult,
}

impl FittedModel {
    /// Pair a transform with a clustering fit in its output space.
    ///
    /// Fails with [`Error::DimensionMismatch`] when the parts disagree: IDF
    /// weights or LSA basis sized for another feature space, centroids of
    /// another width, or labels outside `[0, K)`.
    pub fn new(transform: FeatureTransform, clustering: ClusteringResult) -> Result<Self> {
        transform.check()?;
        clustering.check()?;
        if clustering.centroids().ncols() != transform.dim() {
            return Err(Error::DimensionMismatch {
                expected: transform.dim(),
                found: clustering.centroids().ncols(),
            });
        }
        Ok(Self {
            transform,
            clustering,
        })
    }

    /// Feature transform.
    pub fn transform(&self) -> &FeatureTransform {
        &self.transform
    }

    /// Clustering result.
    pub fn clustering(&self) -> &ClusteringResult {
        &self.clustering
    }

    /// Cluster id of a new document.
    pub fn transform_and_predict(&self, document: &str) -> Result<usize> {
        let x = self.transform.transform(document)?;
        self.clustering.predict(x.view())
    }

    /// Top terms per cluster.
    pub fn top_terms(&self, n_terms: usize) -> Result<Vec<ClusterTerms>> {
        top_terms(&self.transform, &self.clustering, n_terms)
    }

    /// Write `transform.json` and `clustering.json` under `dir`.
    pub fn save(&self, dir: impl AsRef<Path>) -> Result<()> {
        let dir = dir.as_ref();
        std::fs::create_dir_all(dir)?;
        write_json(&dir.join(TRANSFORM_FILE), &self.transform)?;
        write_json(&dir.join(CLUSTERING_FILE), &self.clustering)?;
        info!(path = %dir.display(), "model saved");
        Ok(())
    }

    /// Read a model written by [`FittedModel::save`]. The parts are checked
    /// for consistency as in [`FittedModel::new`].
    pub fn load(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref();
        let transform: FeatureTransform = read_json(&dir.join(TRANSFORM_FILE))?;
        let clustering: ClusteringResult = read_json(&dir.join(CLUSTERING_FILE))?;
        Self::new(transform, clustering)
    }
}

fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let mut writer = BufWriter::new(File::create(path)?);
    serde_json::to_writer(&mut writer, value)?;
    writer.flush()?;
    Ok(())
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let reader = BufReader::new(File::open(path)?);
    Ok(serde_json::from_reader(reader)?)
}
