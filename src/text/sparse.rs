//! Construction of `sprs` document vectors and the document-term matrix.

use sprs::{CsMat, CsVec};

/// Sparse vector of width `dim` from `(index, value)` pairs. Duplicate
/// indices are summed and exact zeros dropped.
pub(crate) fn from_pairs(dim: usize, mut pairs: Vec<(usize, f64)>) -> CsVec<f64> {
    pairs.sort_unstable_by_key(|&(i, _)| i);
    let mut indices: Vec<usize> = Vec::with_capacity(pairs.len());
    let mut data: Vec<f64> = Vec::with_capacity(pairs.len());
    for (i, v) in pairs {
        if indices.last() == Some(&i) {
            if let Some(last) = data.last_mut() {
                *last += v;
            }
        } else {
            indices.push(i);
            data.push(v);
        }
    }
    let (indices, data): (Vec<usize>, Vec<f64>) = indices
        .into_iter()
        .zip(data)
        .filter(|&(_, v)| v != 0.0)
        .unzip();
    CsVec::new(dim, indices, data)
}

/// Scale to unit length. Returns `false` and leaves the vector untouched
/// when its norm is zero.
pub(crate) fn normalize(v: &mut CsVec<f64>) -> bool {
    let norm = v.l2_norm();
    if norm <= f64::EPSILON {
        return false;
    }
    v.map_inplace(|a| a / norm);
    true
}

/// Stack rows of width `dim` into an `n × dim` CSR matrix.
pub(crate) fn stack_rows(rows: Vec<CsVec<f64>>, dim: usize) -> CsMat<f64> {
    let n = rows.len();
    let nnz = rows.iter().map(|r| r.nnz()).sum();
    let mut indptr = Vec::with_capacity(n + 1);
    let mut indices = Vec::with_capacity(nnz);
    let mut data = Vec::with_capacity(nnz);
    indptr.push(0);
    for row in rows {
        indices.extend_from_slice(row.indices());
        data.extend_from_slice(row.data());
        indptr.push(indices.len());
    }
    CsMat::new((n, dim), indptr, indices, data)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_pairs_merges_duplicates() {
        let v = from_pairs(8, vec![(3, 1.0), (1, 2.0), (3, 2.0), (5, 0.0)]);
        assert_eq!(v.dim(), 8);
        assert_eq!(v.indices(), &[1, 3]);
        assert_eq!(v.data(), &[2.0, 3.0]);
    }

    #[test]
    fn test_signed_collision_cancels() {
        let v = from_pairs(4, vec![(2, 1.0), (2, -1.0)]);
        assert_eq!(v.nnz(), 0);
    }

    #[test]
    fn test_normalize() {
        let mut v = from_pairs(5, vec![(0, 3.0), (4, 4.0)]);
        assert!(normalize(&mut v));
        assert!((v.l2_norm() - 1.0).abs() < 1e-12);
        assert_eq!(v.data(), &[0.6, 0.8]);

        let mut zero = from_pairs(5, Vec::new());
        assert!(!normalize(&mut zero));
    }

    #[test]
    fn test_stack_rows() {
        let rows = vec![
            from_pairs(3, vec![(1, 1.0)]),
            from_pairs(3, vec![(0, 2.0), (2, 3.0)]),
        ];
        let m = stack_rows(rows, 3);
        assert!(m.is_csr());
        assert_eq!((m.rows(), m.cols(), m.nnz()), (2, 3, 3));
        assert_eq!(m.get(0, 1), Some(&1.0));
        assert_eq!(m.get(1, 2), Some(&3.0));
        assert_eq!(m.get(1, 1), None);
    }
}
