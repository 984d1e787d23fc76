//! Feature hashing.
//!
//! Terms are mapped to one of `n_features` buckets by a stable 64-bit hash
//! (xxh64, seed 0), so a persisted hasher produces identical vectors in any
//! process. Distinct terms may collide; no bucket can be traced back to a
//! term.
//!
//! With `alternate_sign`, each term contributes `±1` depending on a second
//! hash bit, so collisions tend to cancel instead of accumulate.

use serde::{Deserialize, Serialize};
use sprs::CsVec;
use xxhash_rust::xxh64::xxh64;

use super::sparse;

/// Stateless term → bucket mapper.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeatureHasher {
    n_features: usize,
    alternate_sign: bool,
}

impl FeatureHasher {
    /// Hasher with `n_features` buckets and unsigned accumulation.
    pub fn new(n_features: usize) -> Self {
        Self {
            n_features: n_features.max(1),
            alternate_sign: false,
        }
    }

    /// Toggle signed accumulation.
    pub fn with_alternate_sign(mut self, alternate_sign: bool) -> Self {
        self.alternate_sign = alternate_sign;
        self
    }

    /// Output dimensionality.
    pub fn n_features(&self) -> usize {
        self.n_features
    }

    /// Bucket and signed unit contribution for `term`.
    pub fn bucket(&self, term: &str) -> (usize, f64) {
        let h = xxh64(term.as_bytes(), 0);
        let idx = (h % self.n_features as u64) as usize;
        let sign = if self.alternate_sign && (h >> 63) == 1 {
            -1.0
        } else {
            1.0
        };
        (idx, sign)
    }

    /// Hashed count vector of a token stream.
    pub fn counts<S: AsRef<str>>(&self, tokens: &[S]) -> CsVec<f64> {
        sparse::from_pairs(
            self.n_features,
            tokens.iter().map(|t| self.bucket(t.as_ref())).collect(),
        )
    }
}
