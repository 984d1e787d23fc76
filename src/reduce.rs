//! Latent semantic analysis: truncated SVD of the document-term matrix.
//!
//! For an `n × d` matrix `X` with singular value decomposition `X = U Σ Vᵀ`,
//! keeping the `r` largest singular values gives the best rank-`r`
//! approximation in Frobenius norm. Documents are projected onto the top `r`
//! right singular vectors:
//!
//! ```text
//! X_r = X V_r          (n × r)
//! ```
//!
//! # Randomized range finder
//!
//! `X` stays sparse. Only the top `r` directions are computed (Halko,
//! Martinsson & Tropp 2011):
//!
//! 1. Draw a Gaussian `d × k` matrix `Ω` with `k = r + oversamples`, capped
//!    at `min(n, d)`, and orthonormalize `Y = X Ω` into `Q`.
//! 2. Run `n_iter` power iterations `Q ← orth(X orth(Xᵀ Q))`, which sharpen
//!    the decay of the spectrum seen by `Q`.
//! 3. Take the thin SVD of the small `d × k` matrix `Xᵀ Q = (Qᵀ X)ᵀ`. Its
//!    left singular vectors approximate the right singular vectors of `X`.
//!
//! Every product with `X` costs O(nnz · k). When `k` reaches the rank of `X`
//! the decomposition is exact.
//!
//! # Explained variance
//!
//! The fraction of `‖X‖²_F` captured by component `i` is `σᵢ² / ‖X‖²_F`.
//! The total over the retained components lies in `[0, 1]`.
//!
//! # Re-normalization
//!
//! The projected rows are not unit length even when the input rows are. Each
//! projected row is scaled back to unit length; a row that projects to zero
//! is a [`ZeroNorm`](crate::Error::ZeroNorm) failure.
//!
//! # Inverse mapping
//!
//! `y V_rᵀ` maps a reduced-space point (e.g. a centroid) back to feature
//! space, which is what makes centroids interpretable as term weights.

use std::time::Instant;

use faer::Mat;
use ndarray::{Array1, Array2, ArrayView2, Axis};
use rand::prelude::*;
use rand_distr::StandardNormal;
use serde::{Deserialize, Serialize};
use sprs::CsVec;
use tracing::{debug, info};

use crate::error::{Error, Result};
use crate::points::Points;

/// Unfitted truncated SVD.
#[derive(Debug, Clone)]
pub struct TruncatedSvd {
    n_components: usize,
    normalize: bool,
    n_oversamples: usize,
    n_iter: usize,
    seed: Option<u64>,
}

impl TruncatedSvd {
    /// Reduce to `n_components` dimensions.
    pub fn new(n_components: usize) -> Self {
        Self {
            n_components,
            normalize: true,
            n_oversamples: 10,
            n_iter: 5,
            seed: None,
        }
    }

    /// Toggle unit re-normalization of projected rows.
    pub fn with_normalize(mut self, normalize: bool) -> Self {
        self.normalize = normalize;
        self
    }

    /// Extra random directions sampled beyond `n_components`.
    pub fn with_oversamples(mut self, n_oversamples: usize) -> Self {
        self.n_oversamples = n_oversamples;
        self
    }

    /// Number of power iterations.
    pub fn with_n_iter(mut self, n_iter: usize) -> Self {
        self.n_iter = n_iter;
        self
    }

    /// Set random seed for reproducibility.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Fit the basis on `n × d` rows and return the projected rows.
    ///
    /// Fails with [`Error::InvalidReductionRank`] unless `1 ≤ r < d` and
    /// `r ≤ n`.
    pub fn fit_transform<'a>(&self, x: impl Into<Points<'a>>) -> Result<(Lsa, Array2<f64>)> {
        let x = x.into();
        let (n, d) = (x.nrows(), x.ncols());
        let r = self.n_components;
        if r == 0 || r >= d || r > n {
            return Err(Error::InvalidReductionRank {
                requested: r,
                n_features: d,
                n_samples: n,
            });
        }
        if !x.is_row_major() {
            return Err(Error::invalid("data", "sparse input must be in CSR layout"));
        }
        let start = Instant::now();

        let total = x.squared_frobenius();
        if !(total > 0.0) || !total.is_finite() {
            return Err(Error::Decomposition(
                "document matrix has no finite non-zero energy".to_string(),
            ));
        }

        let k = (r + self.n_oversamples).min(n).min(d);
        let mut rng = StdRng::seed_from_u64(self.seed.unwrap_or_else(rand::random));
        let omega = Array2::from_shape_simple_fn((d, k), || rng.sample::<f64, _>(StandardNormal));

        let mut q = orthonormal_basis(x.dot_dense(omega.view()).view());
        for step in 0..self.n_iter {
            let z = orthonormal_basis(x.transpose_dot_dense(q.view()).view());
            q = orthonormal_basis(x.dot_dense(z.view()).view());
            debug!(step, "power iteration");
        }

        // (Qᵀ X)ᵀ, d × k: its left singular vectors are the right singular
        // vectors of X restricted to span(Q).
        let bt = x.transpose_dot_dense(q.view());
        let svd = to_faer(bt.view()).thin_svd();
        let s = svd.s_diagonal();
        let u = svd.u();

        let mut order: Vec<usize> = (0..k).collect();
        order.sort_by(|&a, &b| s.read(b).total_cmp(&s.read(a)));
        let sigma: Vec<f64> = order[..r].iter().map(|&c| s.read(c)).collect();
        if sigma.iter().any(|s| !s.is_finite()) {
            return Err(Error::Decomposition(
                "singular values are not finite".to_string(),
            ));
        }

        let mut components = Array2::<f64>::zeros((r, d));
        for (mut row, &c) in components.axis_iter_mut(Axis(0)).zip(&order[..r]) {
            for j in 0..d {
                row[j] = u.read(j, c);
            }
            // Fix the sign so the largest-magnitude loading is positive.
            let pivot = row
                .iter()
                .copied()
                .fold(0.0f64, |best, a| if a.abs() > best.abs() { a } else { best });
            if pivot < 0.0 {
                row.mapv_inplace(|a| -a);
            }
        }

        let explained_variance_ratio: Vec<f64> = sigma
            .iter()
            .map(|s| (s * s / total).clamp(0.0, 1.0))
            .collect();

        let lsa = Lsa {
            components,
            singular_values: sigma,
            explained_variance_ratio,
            normalize: self.normalize,
        };

        let reduced = lsa.transform_rows(x)?;
        info!(
            n_components = r,
            n_samples = n,
            n_features = d,
            explained_variance = lsa.explained_variance(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "dimensionality reduced"
        );
        Ok((lsa, reduced))
    }
}

fn to_faer(x: ArrayView2<'_, f64>) -> Mat<f64> {
    Mat::<f64>::from_fn(x.nrows(), x.ncols(), |i, j| x[[i, j]])
}

/// Orthonormal basis of the column span of a tall `m × k` matrix (`m ≥ k`).
fn orthonormal_basis(y: ArrayView2<'_, f64>) -> Array2<f64> {
    let q = to_faer(y).qr().compute_thin_q();
    Array2::from_shape_fn((q.nrows(), q.ncols()), |(i, j)| q.read(i, j))
}

/// Fitted LSA basis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Lsa {
    /// `r × d`, rows are right singular vectors.
    components: Array2<f64>,
    singular_values: Vec<f64>,
    explained_variance_ratio: Vec<f64>,
    normalize: bool,
}

impl Lsa {
    /// Reduced dimensionality `r`.
    pub fn n_components(&self) -> usize {
        self.components.nrows()
    }

    /// Input dimensionality `d`.
    pub fn n_features(&self) -> usize {
        self.components.ncols()
    }

    /// Projection basis, `r × d`.
    pub fn components(&self) -> ArrayView2<'_, f64> {
        self.components.view()
    }

    /// Retained singular values, descending.
    pub fn singular_values(&self) -> &[f64] {
        &self.singular_values
    }

    /// Fraction of total energy per retained component.
    pub fn explained_variance_ratio(&self) -> &[f64] {
        &self.explained_variance_ratio
    }

    /// Total fraction captured by the retained components.
    pub fn explained_variance(&self) -> f64 {
        self.explained_variance_ratio.iter().sum::<f64>().min(1.0)
    }

    /// Reject a deserialized basis with inconsistent parts.
    pub(crate) fn check(&self) -> Result<()> {
        let r = self.n_components();
        if r == 0 {
            return Err(Error::invalid("lsa", "basis has no components"));
        }
        for len in [self.singular_values.len(), self.explained_variance_ratio.len()] {
            if len != r {
                return Err(Error::DimensionMismatch {
                    expected: r,
                    found: len,
                });
            }
        }
        if self.components.iter().any(|v| !v.is_finite()) {
            return Err(Error::invalid("lsa", "basis contains non-finite values"));
        }
        Ok(())
    }

    /// Project every row of `x`.
    pub fn transform_rows<'a>(&self, x: impl Into<Points<'a>>) -> Result<Array2<f64>> {
        let x = x.into();
        if x.ncols() != self.n_features() {
            return Err(Error::DimensionMismatch {
                expected: self.n_features(),
                found: x.ncols(),
            });
        }
        let mut out = x.dot_dense(self.components.t());
        if self.normalize {
            for (i, mut row) in out.axis_iter_mut(Axis(0)).enumerate() {
                let norm = row.dot(&row).sqrt();
                if norm <= f64::EPSILON {
                    return Err(Error::ZeroNorm {
                        context: format!("row {i} projects to zero in the reduced space"),
                    });
                }
                row.mapv_inplace(|a| a / norm);
            }
        }
        Ok(out)
    }

    /// Project one sparse vector.
    pub fn transform(&self, x: &CsVec<f64>) -> Result<Array1<f64>> {
        if x.dim() != self.n_features() {
            return Err(Error::DimensionMismatch {
                expected: self.n_features(),
                found: x.dim(),
            });
        }
        let mut out = Array1::<f64>::zeros(self.n_components());
        for (j, &value) in x.iter() {
            out.scaled_add(value, &self.components.column(j));
        }
        if self.normalize {
            let norm = out.dot(&out).sqrt();
            if norm <= f64::EPSILON {
                return Err(Error::ZeroNorm {
                    context: "document projects to zero in the reduced space".to_string(),
                });
            }
            out.mapv_inplace(|a| a / norm);
        }
        Ok(out)
    }

    /// Map reduced-space rows back to feature space.
    pub fn inverse_transform(&self, y: ArrayView2<'_, f64>) -> Result<Array2<f64>> {
        if y.ncols() != self.n_components() {
            return Err(Error::DimensionMismatch {
                expected: self.n_components(),
                found: y.ncols(),
            });
        }
        Ok(y.dot(&self.components))
    }
}
