//! # textcluster
//!
//! Unsupervised topic clustering of text corpora.
//!
//! Documents become sparse TF-IDF (or hashed) vectors, are optionally
//! compressed with LSA, and are partitioned with full-batch or mini-batch
//! k-means. A run also reports clustering quality against known categories
//! and the top terms of every cluster. The fitted feature transform and
//! clustering persist together and place new documents with
//! [`FittedModel::transform_and_predict`].
//!
//! | Stage | Module |
//! |-------|--------|
//! | Feature space | [`text`] |
//! | Row access, dense or sparse | [`points`] |
//! | Reduction (optional) | [`reduce`] |
//! | Clustering | [`cluster`] |
//! | Evaluation | [`metrics`], [`evaluate`] |
//! | Interpretation | [`interpret`] |
//! | Orchestration and persistence | [`pipeline`] |

pub mod cluster;
pub mod config;
pub mod corpus;
/// Error types used across `textcluster`.
pub mod error;
pub mod evaluate;
pub mod interpret;
pub mod metrics;
mod parallel;
pub mod pipeline;
pub mod points;
pub mod reduce;
pub mod text;
pub mod transform;

pub use cluster::{Clustering, ClusteringResult, Kmeans, MiniBatchKmeans};
pub use config::PipelineConfig;
pub use corpus::{Corpus, CorpusFile};
pub use error::{Error, ErrorKind, Result};
pub use evaluate::QualityReport;
pub use interpret::{top_terms, ClusterTerms};
pub use metrics::{ari, completeness, homogeneity, silhouette_score, v_measure};
pub use pipeline::{FittedModel, Pipeline, PipelineRun};
pub use points::Points;
pub use reduce::{Lsa, TruncatedSvd};
pub use transform::FeatureTransform;
