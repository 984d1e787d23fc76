//! Term frequency schemes and inverse document frequency.

use serde::{Deserialize, Serialize};

/// How a raw in-document count becomes a weight.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TermFrequency {
    /// The count itself.
    #[default]
    Raw,
    /// 1 for present terms.
    Binary,
    /// `1 + ln(count)`.
    Sublinear,
}

impl TermFrequency {
    /// Weight for a count. Signed counts from alternate-sign hashing keep
    /// their sign.
    pub fn apply(self, count: f64) -> f64 {
        match self {
            TermFrequency::Raw => count,
            TermFrequency::Binary => count.signum(),
            TermFrequency::Sublinear => count.signum() * (1.0 + count.abs().ln()),
        }
    }
}

/// Smoothed IDF: `ln((1 + n_docs) / (1 + df)) + 1`.
///
/// Strictly positive even when a term occurs in every document.
pub fn smooth_idf(n_docs: usize, df: usize) -> f64 {
    ((1.0 + n_docs as f64) / (1.0 + df as f64)).ln() + 1.0
}
