//! Centroid-based clustering of document vectors.
//!
//! Both algorithms minimize the within-cluster sum of squares:
//!
//! ```text
//! J = Σ_k Σ_{x ∈ C_k} ||x - μ_k||²
//! ```
//!
//! On unit-length inputs (TF-IDF rows, re-normalized LSA rows) squared
//! Euclidean distance is `2 - 2 cos θ`, so this is spherical k-means in
//! effect.
//!
//! Input is a [`Points`](crate::points::Points) view: sparse TF-IDF rows are
//! clustered as they are, with dense centroids, so the document-term matrix
//! is never densified.
//!
//! ## Algorithms
//!
//! ### Full-batch k-means ([`Kmeans`])
//!
//! Lloyd iterations over the whole data set until no point changes cluster.
//! Exact local optimum; cost per iteration is O(n·k·d).
//!
//! ### Mini-batch k-means ([`MiniBatchKmeans`])
//!
//! Each step updates centroids from a random batch with a per-centroid
//! running count. Cost per step depends on the batch size, not on n, at the
//! price of an approximate optimum. Use it when a full pass is too slow.
//!
//! | | Full-batch | Mini-batch |
//! |---|---|---|
//! | Seeding | greedy k-means++ on all points | greedy k-means++ on an `init_size` sample |
//! | Step | all points | `batch_size` points |
//! | Stop | assignment unchanged | epoch cap or no EWA improvement |
//! | Optimum | exact local | approximate |
//!
//! ## Usage
//!
//! ```rust
//! use ndarray::array;
//! use textcluster::cluster::{Clustering, Kmeans};
//!
//! let data = array![
//!     [0.0, 0.0],
//!     [0.1, 0.1],
//!     [10.0, 10.0],
//!     [10.1, 10.1],
//! ];
//!
//! let result = Kmeans::new(2).with_seed(7).fit(data.view().into()).unwrap();
//! let labels = result.labels();
//! assert_eq!(labels[0], labels[1]);
//! assert_ne!(labels[0], labels[2]);
//! ```

mod kmeans;
mod minibatch;
mod result;
mod seeding;
mod traits;

pub use kmeans::Kmeans;
pub use minibatch::MiniBatchKmeans;
pub use result::ClusteringResult;
pub use traits::Clustering;

use crate::config::PipelineConfig;

/// Clusterer selected by a pipeline config.
pub fn from_config(config: &PipelineConfig, k: usize, seed: u64) -> Box<dyn Clustering> {
    if config.minibatch {
        let mut m = MiniBatchKmeans::new(k)
            .with_batch_size(config.batch_size)
            .with_max_iter(config.max_iterations)
            .with_n_init(config.n_init)
            .with_max_no_improvement(config.max_no_improvement)
            .with_seed(seed);
        if let Some(init_size) = config.init_size {
            m = m.with_init_size(init_size);
        }
        Box::new(m)
    } else {
        Box::new(
            Kmeans::new(k)
                .with_max_iter(config.max_iterations)
                .with_n_init(config.n_init)
                .with_seed(seed),
        )
    }
}
