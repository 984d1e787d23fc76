//! Row access over the matrices the pipeline works on.
//!
//! Term-weighted and hashed features stay in compressed sparse row form
//! ([`sprs::CsMat`]); LSA output is a dense `ndarray` matrix. The SVD,
//! k-means, seeding and the silhouette only need a few row operations, and
//! [`Points`] provides them for both layouts without converting one into the
//! other.
//!
//! Distances to a dense centroid `c` from a sparse row `x` use
//!
//! ```text
//! ‖x - c‖² = ‖x‖² - 2 x·c + ‖c‖²
//! ```
//!
//! so the cost per row is proportional to its stored entries, plus one
//! `‖c‖²` per centroid that callers compute once per pass.

use ndarray::{Array1, Array2, ArrayView1, ArrayView2, ArrayViewMut1};
use sprs::CsMat;

use crate::parallel::map_range;

/// Borrowed `n × d` matrix, dense or CSR.
#[derive(Debug, Clone, Copy)]
pub enum Points<'a> {
    /// Row-major dense rows.
    Dense(ArrayView2<'a, f64>),
    /// Compressed sparse rows. Must be CSR.
    Sparse(&'a CsMat<f64>),
}

impl<'a> From<ArrayView2<'a, f64>> for Points<'a> {
    fn from(x: ArrayView2<'a, f64>) -> Self {
        Points::Dense(x)
    }
}

impl<'a> From<&'a Array2<f64>> for Points<'a> {
    fn from(x: &'a Array2<f64>) -> Self {
        Points::Dense(x.view())
    }
}

impl<'a> From<&'a CsMat<f64>> for Points<'a> {
    fn from(x: &'a CsMat<f64>) -> Self {
        Points::Sparse(x)
    }
}

impl Points<'_> {
    /// Number of rows.
    pub fn nrows(&self) -> usize {
        match self {
            Points::Dense(x) => x.nrows(),
            Points::Sparse(x) => x.rows(),
        }
    }

    /// Number of columns.
    pub fn ncols(&self) -> usize {
        match self {
            Points::Dense(x) => x.ncols(),
            Points::Sparse(x) => x.cols(),
        }
    }

    /// Whether this is a row-major layout the row operations can use.
    pub(crate) fn is_row_major(&self) -> bool {
        match self {
            Points::Dense(_) => true,
            Points::Sparse(x) => x.is_csr(),
        }
    }

    /// Whether every stored value is finite.
    pub fn is_finite(&self) -> bool {
        match self {
            Points::Dense(x) => x.iter().all(|v| v.is_finite()),
            Points::Sparse(x) => x.data().iter().all(|v| v.is_finite()),
        }
    }

    /// `‖X‖²_F`.
    pub fn squared_frobenius(&self) -> f64 {
        match self {
            Points::Dense(x) => x.iter().map(|v| v * v).sum(),
            Points::Sparse(x) => x.data().iter().map(|v| v * v).sum(),
        }
    }

    /// `‖xᵢ‖²`.
    pub fn row_squared_norm(&self, i: usize) -> f64 {
        match self {
            Points::Dense(x) => {
                let row = x.row(i);
                row.dot(&row)
            }
            Points::Sparse(x) => x
                .outer_view(i)
                .map_or(0.0, |row| row.data().iter().map(|v| v * v).sum()),
        }
    }

    /// `xᵢ · v`.
    pub fn row_dot(&self, i: usize, v: ArrayView1<'_, f64>) -> f64 {
        match self {
            Points::Dense(x) => x.row(i).dot(&v),
            Points::Sparse(x) => x
                .outer_view(i)
                .map_or(0.0, |row| row.iter().map(|(j, &a)| a * v[j]).sum()),
        }
    }

    /// `target += scale × xᵢ`.
    pub fn add_row_to(&self, i: usize, mut target: ArrayViewMut1<'_, f64>, scale: f64) {
        match self {
            Points::Dense(x) => target.scaled_add(scale, &x.row(i)),
            Points::Sparse(x) => {
                if let Some(row) = x.outer_view(i) {
                    for (j, &a) in row.iter() {
                        target[j] += scale * a;
                    }
                }
            }
        }
    }

    /// Row `i` as an owned dense vector.
    pub fn row_to_dense(&self, i: usize) -> Array1<f64> {
        match self {
            Points::Dense(x) => x.row(i).to_owned(),
            Points::Sparse(_) => {
                let mut out = Array1::zeros(self.ncols());
                self.add_row_to(i, out.view_mut(), 1.0);
                out
            }
        }
    }

    /// `‖xᵢ - c‖²`, given `c_sq_norm = ‖c‖²`.
    ///
    /// Dense rows are differenced directly; sparse rows use the norm
    /// expansion, clamped at zero.
    pub fn squared_distance_to(
        &self,
        i: usize,
        c: ArrayView1<'_, f64>,
        c_sq_norm: f64,
    ) -> f64 {
        match self {
            Points::Dense(x) => x
                .row(i)
                .iter()
                .zip(c.iter())
                .map(|(a, b)| (a - b).powi(2))
                .sum(),
            Points::Sparse(_) => {
                (self.row_squared_norm(i) - 2.0 * self.row_dot(i, c) + c_sq_norm).max(0.0)
            }
        }
    }

    /// `‖xᵢ - xⱼ‖²`.
    pub fn squared_distance_between(&self, i: usize, j: usize) -> f64 {
        match self {
            Points::Dense(x) => x
                .row(i)
                .iter()
                .zip(x.row(j).iter())
                .map(|(a, b)| (a - b).powi(2))
                .sum(),
            Points::Sparse(x) => match (x.outer_view(i), x.outer_view(j)) {
                (Some(a), Some(b)) => {
                    let cross = a.dot(&b);
                    (self.row_squared_norm(i) + self.row_squared_norm(j) - 2.0 * cross).max(0.0)
                }
                _ => 0.0,
            },
        }
    }

    /// `X M` for a dense `d × k` matrix `M`.
    pub fn dot_dense(&self, m: ArrayView2<'_, f64>) -> Array2<f64> {
        match self {
            Points::Dense(x) => x.dot(&m),
            Points::Sparse(x) => {
                let k = m.ncols();
                let rows = map_range(x.rows(), |i| {
                    let mut out = Array1::<f64>::zeros(k);
                    if let Some(row) = x.outer_view(i) {
                        for (j, &a) in row.iter() {
                            out.scaled_add(a, &m.row(j));
                        }
                    }
                    out
                });
                let mut out = Array2::zeros((x.rows(), k));
                for (mut dst, src) in out.rows_mut().into_iter().zip(rows) {
                    dst.assign(&src);
                }
                out
            }
        }
    }

    /// `Xᵀ M` for a dense `n × k` matrix `M`.
    pub fn transpose_dot_dense(&self, m: ArrayView2<'_, f64>) -> Array2<f64> {
        match self {
            Points::Dense(x) => x.t().dot(&m),
            Points::Sparse(x) => {
                let mut out = Array2::zeros((x.cols(), m.ncols()));
                for (i, row) in x.outer_iterator().enumerate() {
                    let src = m.row(i);
                    for (j, &a) in row.iter() {
                        out.row_mut(j).scaled_add(a, &src);
                    }
                }
                out
            }
        }
    }
}
