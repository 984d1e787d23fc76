//! Term → feature index mapping for term-weighted mode.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{Error, Result};

/// Retained terms, indexed densely in `[0, len)` by lexicographic order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "Vec<String>", into = "Vec<String>")]
pub struct Vocabulary {
    terms: Vec<String>,
    index: HashMap<String, usize>,
}

impl From<Vec<String>> for Vocabulary {
    fn from(terms: Vec<String>) -> Self {
        let index = terms
            .iter()
            .enumerate()
            .map(|(i, t)| (t.clone(), i))
            .collect();
        Self { terms, index }
    }
}

impl From<Vocabulary> for Vec<String> {
    fn from(vocabulary: Vocabulary) -> Self {
        vocabulary.terms
    }
}

impl Vocabulary {
    /// Feature index of `term`.
    pub fn get(&self, term: &str) -> Option<usize> {
        self.index.get(term).copied()
    }

    /// Term at feature index `idx`.
    pub fn term(&self, idx: usize) -> Option<&str> {
        self.terms.get(idx).map(String::as_str)
    }

    /// All terms in index order.
    pub fn terms(&self) -> &[String] {
        &self.terms
    }

    /// Number of terms.
    pub fn len(&self) -> usize {
        self.terms.len()
    }

    /// Whether no term was retained.
    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }

    pub(crate) fn has_unique_terms(&self) -> bool {
        self.index.len() == self.terms.len()
    }
}

/// Document-frequency bounds and size cap applied when building a
/// [`Vocabulary`].
#[derive(Debug, Clone)]
pub(crate) struct VocabularyFilter {
    pub min_doc_freq: usize,
    pub max_doc_fraction: f64,
    pub max_features: usize,
}

/// Per-term corpus statistics.
#[derive(Debug, Default, Clone, Copy)]
pub(crate) struct TermStats {
    /// Documents containing the term.
    pub df: usize,
    /// Total occurrences across the corpus.
    pub tf: usize,
}

impl VocabularyFilter {
    /// Select retained terms and return the vocabulary along with each
    /// retained term's document frequency (parallel to the vocabulary).
    pub fn build(
        &self,
        stats: HashMap<String, TermStats>,
        n_docs: usize,
    ) -> Result<(Vocabulary, Vec<usize>)> {
        let max_doc_count = self.max_doc_fraction * n_docs as f64;
        if max_doc_count < self.min_doc_freq as f64 {
            return Err(Error::invalid(
                "max_doc_fraction",
                format!(
                    "{} of {n_docs} documents is fewer than min_doc_freq = {}",
                    self.max_doc_fraction, self.min_doc_freq
                ),
            ));
        }

        let n_seen = stats.len();
        let mut kept: Vec<(String, TermStats)> = stats
            .into_iter()
            .filter(|(_, s)| s.df >= self.min_doc_freq && s.df as f64 <= max_doc_count)
            .collect();
        let n_after_df = kept.len();

        if kept.len() > self.max_features {
            kept.sort_unstable_by(|a, b| b.1.tf.cmp(&a.1.tf).then_with(|| a.0.cmp(&b.0)));
            kept.truncate(self.max_features);
        }
        kept.sort_unstable_by(|a, b| a.0.cmp(&b.0));

        debug!(
            n_seen,
            n_after_df,
            n_kept = kept.len(),
            "vocabulary filtered"
        );

        if kept.is_empty() {
            return Err(Error::EmptyVocabulary);
        }

        let (terms, dfs): (Vec<String>, Vec<usize>) =
            kept.into_iter().map(|(t, s)| (t, s.df)).unzip();
        Ok((Vocabulary::from(terms), dfs))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stats(entries: &[(&str, usize, usize)]) -> HashMap<String, TermStats> {
        entries
            .iter()
            .map(|&(t, df, tf)| (t.to_string(), TermStats { df, tf }))
            .collect()
    }

    #[test]
    fn test_df_bounds() {
        let filter = VocabularyFilter {
            min_doc_freq: 2,
            max_doc_fraction: 0.5,
            max_features: 100,
        };
        let (vocab, dfs) = filter
            .build(
                stats(&[("rare", 1, 1), ("ok", 2, 4), ("common", 4, 9), ("mid", 3, 3)]),
                6,
            )
            .unwrap();
        assert_eq!(vocab.terms(), &["mid".to_string(), "ok".to_string()]);
        assert_eq!(dfs, vec![3, 2]);
        assert_eq!(vocab.get("ok"), Some(1));
        assert_eq!(vocab.term(0), Some("mid"));
    }

    #[test]
    fn test_max_features_keeps_most_frequent() {
        let filter = VocabularyFilter {
            min_doc_freq: 1,
            max_doc_fraction: 1.0,
            max_features: 2,
        };
        let (vocab, _) = filter
            .build(stats(&[("a", 1, 1), ("b", 1, 5), ("c", 1, 3), ("d", 1, 3)]), 4)
            .unwrap();
        // "c" and "d" tie on frequency; "c" wins on term order.
        assert_eq!(vocab.terms(), &["b".to_string(), "c".to_string()]);
    }

    #[test]
    fn test_empty_vocabulary() {
        let filter = VocabularyFilter {
            min_doc_freq: 2,
            max_doc_fraction: 1.0,
            max_features: 10,
        };
        let err = filter.build(stats(&[("a", 1, 1)]), 3).unwrap_err();
        assert!(matches!(err, Error::EmptyVocabulary));
    }

    #[test]
    fn test_contradictory_bounds() {
        let filter = VocabularyFilter {
            min_doc_freq: 3,
            max_doc_fraction: 0.5,
            max_features: 10,
        };
        assert!(filter.build(stats(&[("a", 3, 3)]), 4).unwrap_err().is_configuration());
    }

    #[test]
    fn test_serde_rebuilds_index() {
        let vocab = Vocabulary::from(vec!["alpha".to_string(), "beta".to_string()]);
        let json = serde_json::to_string(&vocab).unwrap();
        assert_eq!(json, r#"["alpha","beta"]"#);
        let back: Vocabulary = serde_json::from_str(&json).unwrap();
        assert_eq!(back.get("beta"), Some(1));
    }
}
