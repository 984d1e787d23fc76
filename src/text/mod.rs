//! Feature space construction: documents → sparse weighted vectors.
//!
//! ## Modes
//!
//! **Term-weighted** builds a [`Vocabulary`] from the corpus. A term is kept
//! when it is not a stop word, appears in at least `min_doc_freq` documents and
//! in at most `max_doc_fraction` of them. If more terms survive than
//! `max_features`, the most frequent (by total count) are kept.
//!
//! **Hashed** maps every term to one of `n_features` buckets with a
//! [`FeatureHasher`]. No vocabulary exists, so the output dimensionality is
//! fixed and vectors cannot be mapped back to terms.
//!
//! ## Weighting
//!
//! ```text
//! w(t, d) = tf(t, d) × idf(t)        idf(t) = ln((1 + n) / (1 + df(t))) + 1
//! ```
//!
//! followed by L2 normalization. In hashed mode `df` counts documents with a
//! non-zero bucket.
//!
//! ## Skipped documents
//!
//! A document that is not valid UTF-8, or that has no surviving term and so
//! cannot be normalized, is reported as a [`SkippedDocument`] and left out of
//! the [`FeatureSet`]. The remaining vectors keep corpus order.

mod hashing;
mod sparse;
mod stop_words;
mod tokenize;
mod vocabulary;
mod weighting;

use std::collections::HashMap;
use std::time::Instant;

use serde::{Deserialize, Serialize};
use sprs::{CsMat, CsVec};
use tracing::{info, warn};

use crate::config::PipelineConfig;
use crate::corpus::Corpus;
use crate::error::{Error, Result};
use crate::parallel::map_ordered;
use crate::points::Points;

pub use hashing::FeatureHasher;
pub use stop_words::is_english_stop_word;
pub use tokenize::Tokenizer;
pub use vocabulary::Vocabulary;
pub use weighting::{smooth_idf, TermFrequency};

use vocabulary::{TermStats, VocabularyFilter};

/// Why a document produced no vector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    /// The raw bytes were not valid UTF-8.
    InvalidEncoding,
    /// No term survived filtering, leaving a zero vector.
    NoRetainedTerms,
}

/// Diagnostic for a document left out of the feature set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkippedDocument {
    /// Position in the corpus.
    pub index: usize,
    /// Cause.
    pub reason: SkipReason,
}

/// Document-term matrix for every surviving document, rows in corpus order.
#[derive(Debug, Clone)]
pub struct FeatureSet {
    matrix: CsMat<f64>,
    doc_indices: Vec<usize>,
    skipped: Vec<SkippedDocument>,
}

impl FeatureSet {
    /// `n × dim` CSR matrix, one row per clustered document.
    pub fn matrix(&self) -> &CsMat<f64> {
        &self.matrix
    }

    /// Row view for the reduction and clustering stages.
    pub fn points(&self) -> Points<'_> {
        Points::Sparse(&self.matrix)
    }

    /// Corpus index of each vector.
    pub fn doc_indices(&self) -> &[usize] {
        &self.doc_indices
    }

    /// Documents left out.
    pub fn skipped(&self) -> &[SkippedDocument] {
        &self.skipped
    }

    /// Feature dimensionality.
    pub fn dim(&self) -> usize {
        self.matrix.cols()
    }

    /// Number of vectors.
    pub fn len(&self) -> usize {
        self.matrix.rows()
    }

    /// Whether no document survived.
    pub fn is_empty(&self) -> bool {
        self.matrix.rows() == 0
    }
}

impl<'a> From<&'a FeatureSet> for Points<'a> {
    fn from(features: &'a FeatureSet) -> Self {
        features.points()
    }
}

#[derive(Debug, Clone)]
enum Mode {
    TermWeighted {
        min_doc_freq: usize,
        max_doc_fraction: f64,
    },
    Hashed {
        alternate_sign: bool,
    },
}

/// Unfitted feature extractor.
///
/// ```rust
/// use textcluster::{Corpus, text::Vectorizer};
///
/// let corpus = Corpus::new(["red apple", "green apple", "red car", "fast car"]);
/// let (fitted, features) = Vectorizer::tfidf(100)
///     .with_min_doc_freq(1)
///     .with_max_doc_fraction(1.0)
///     .fit_transform(&corpus)
///     .unwrap();
/// assert_eq!(features.dim(), fitted.dim());
/// ```
#[derive(Debug, Clone)]
pub struct Vectorizer {
    tokenizer: Tokenizer,
    mode: Mode,
    n_features: usize,
    use_idf: bool,
    term_frequency: TermFrequency,
    normalize: bool,
}

impl Vectorizer {
    /// Term-weighted extractor capped at `max_features` terms.
    pub fn tfidf(max_features: usize) -> Self {
        Self {
            tokenizer: Tokenizer::default(),
            mode: Mode::TermWeighted {
                min_doc_freq: 2,
                max_doc_fraction: 0.5,
            },
            n_features: max_features,
            use_idf: true,
            term_frequency: TermFrequency::Raw,
            normalize: true,
        }
    }

    /// Hashed extractor with `n_features` buckets.
    pub fn hashing(n_features: usize) -> Self {
        Self {
            tokenizer: Tokenizer::default(),
            mode: Mode::Hashed {
                alternate_sign: false,
            },
            n_features,
            use_idf: true,
            term_frequency: TermFrequency::Raw,
            normalize: true,
        }
    }

    /// Extractor described by a pipeline config.
    pub fn from_config(config: &PipelineConfig) -> Self {
        let base = if config.use_hashing {
            Self::hashing(config.n_features).with_alternate_sign(config.alternate_sign)
        } else {
            Self::tfidf(config.n_features)
                .with_min_doc_freq(config.min_doc_freq)
                .with_max_doc_fraction(config.max_doc_fraction)
        };
        base.with_idf(config.use_idf)
            .with_term_frequency(config.term_frequency)
            .with_normalize(config.normalize)
    }

    /// Replace the tokenizer.
    pub fn with_tokenizer(mut self, tokenizer: Tokenizer) -> Self {
        self.tokenizer = tokenizer;
        self
    }

    /// Toggle IDF weighting.
    pub fn with_idf(mut self, use_idf: bool) -> Self {
        self.use_idf = use_idf;
        self
    }

    /// Set the term frequency scheme.
    pub fn with_term_frequency(mut self, tf: TermFrequency) -> Self {
        self.term_frequency = tf;
        self
    }

    /// Toggle L2 normalization.
    pub fn with_normalize(mut self, normalize: bool) -> Self {
        self.normalize = normalize;
        self
    }

    /// Minimum document frequency (term-weighted mode only).
    pub fn with_min_doc_freq(mut self, n: usize) -> Self {
        if let Mode::TermWeighted { min_doc_freq, .. } = &mut self.mode {
            *min_doc_freq = n;
        }
        self
    }

    /// Maximum document fraction (term-weighted mode only).
    pub fn with_max_doc_fraction(mut self, fraction: f64) -> Self {
        if let Mode::TermWeighted {
            max_doc_fraction, ..
        } = &mut self.mode
        {
            *max_doc_fraction = fraction;
        }
        self
    }

    /// Signed hashing (hashed mode only).
    pub fn with_alternate_sign(mut self, alternate: bool) -> Self {
        if let Mode::Hashed { alternate_sign } = &mut self.mode {
            *alternate_sign = alternate;
        }
        self
    }

    /// Fit on `corpus` and vectorize every document.
    pub fn fit_transform(&self, corpus: &Corpus) -> Result<(FittedVectorizer, FeatureSet)> {
        if self.n_features == 0 {
            return Err(Error::invalid("n_features", "must be positive"));
        }
        let start = Instant::now();

        let mut skipped = Vec::new();
        let mut docs: Vec<(usize, &str)> = Vec::with_capacity(corpus.len());
        for (index, text) in corpus.documents() {
            match text {
                Some(t) => docs.push((index, t)),
                None => skipped.push(SkippedDocument {
                    index,
                    reason: SkipReason::InvalidEncoding,
                }),
            }
        }
        if docs.is_empty() {
            return Err(Error::EmptyCorpus);
        }
        let n_docs = docs.len();

        let tokens: Vec<Vec<String>> =
            map_ordered(&docs, |(_, text)| self.tokenizer.tokenize(text));

        let (fitted, counts) = match &self.mode {
            Mode::TermWeighted {
                min_doc_freq,
                max_doc_fraction,
            } => {
                let filter = VocabularyFilter {
                    min_doc_freq: *min_doc_freq,
                    max_doc_fraction: *max_doc_fraction,
                    max_features: self.n_features,
                };
                let (vocabulary, dfs) = filter.build(term_stats(&tokens), n_docs)?;
                let idf = self
                    .use_idf
                    .then(|| dfs.iter().map(|&df| smooth_idf(n_docs, df)).collect());
                let fitted = self.fitted(Encoding::Vocabulary(vocabulary), idf);
                let counts = map_ordered(&tokens, |t| fitted.count(t));
                (fitted, counts)
            }
            Mode::Hashed { alternate_sign } => {
                let hasher =
                    FeatureHasher::new(self.n_features).with_alternate_sign(*alternate_sign);
                let counts: Vec<CsVec<f64>> = map_ordered(&tokens, |t| hasher.counts(t));
                if counts.iter().all(|c| c.nnz() == 0) {
                    return Err(Error::EmptyVocabulary);
                }
                let idf = self.use_idf.then(|| {
                    let mut df = vec![0usize; self.n_features];
                    for c in &counts {
                        for &i in c.indices() {
                            df[i] += 1;
                        }
                    }
                    df.into_iter().map(|d| smooth_idf(n_docs, d)).collect()
                });
                (self.fitted(Encoding::Hashed(hasher), idf), counts)
            }
        };

        let weighted: Vec<Option<CsVec<f64>>> = map_ordered(&counts, |c| fitted.weigh(c));

        let mut vectors = Vec::with_capacity(n_docs);
        let mut doc_indices = Vec::with_capacity(n_docs);
        for ((index, _), v) in docs.iter().zip(weighted) {
            match v {
                Some(v) => {
                    vectors.push(v);
                    doc_indices.push(*index);
                }
                None => skipped.push(SkippedDocument {
                    index: *index,
                    reason: SkipReason::NoRetainedTerms,
                }),
            }
        }
        skipped.sort_unstable_by_key(|s| s.index);

        if !skipped.is_empty() {
            warn!(n_skipped = skipped.len(), "documents skipped during feature extraction");
        }
        info!(
            n_samples = vectors.len(),
            n_features = fitted.dim(),
            hashed = fitted.is_hashed(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "features extracted"
        );

        let matrix = sparse::stack_rows(vectors, fitted.dim());
        Ok((
            fitted,
            FeatureSet {
                matrix,
                doc_indices,
                skipped,
            },
        ))
    }

    fn fitted(&self, encoding: Encoding, idf: Option<Vec<f64>>) -> FittedVectorizer {
        FittedVectorizer {
            tokenizer: self.tokenizer.clone(),
            encoding,
            term_frequency: self.term_frequency,
            idf,
            normalize: self.normalize,
        }
    }
}

fn term_stats(tokens: &[Vec<String>]) -> HashMap<String, TermStats> {
    let mut stats: HashMap<String, TermStats> = HashMap::new();
    for doc in tokens {
        let mut counts: HashMap<&str, usize> = HashMap::new();
        for t in doc {
            *counts.entry(t.as_str()).or_insert(0) += 1;
        }
        for (term, count) in counts {
            let entry = stats.entry(term.to_string()).or_default();
            entry.df += 1;
            entry.tf += count;
        }
    }
    stats
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
enum Encoding {
    Vocabulary(Vocabulary),
    Hashed(FeatureHasher),
}

/// Fitted feature extractor. Immutable; maps new text into the fitted space.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FittedVectorizer {
    tokenizer: Tokenizer,
    encoding: Encoding,
    term_frequency: TermFrequency,
    idf: Option<Vec<f64>>,
    normalize: bool,
}

impl FittedVectorizer {
    /// Output dimensionality.
    pub fn dim(&self) -> usize {
        match &self.encoding {
            Encoding::Vocabulary(v) => v.len(),
            Encoding::Hashed(h) => h.n_features(),
        }
    }

    /// Vocabulary, in term-weighted mode.
    pub fn vocabulary(&self) -> Option<&Vocabulary> {
        match &self.encoding {
            Encoding::Vocabulary(v) => Some(v),
            Encoding::Hashed(_) => None,
        }
    }

    /// Whether this is a hashed transform.
    pub fn is_hashed(&self) -> bool {
        matches!(self.encoding, Encoding::Hashed(_))
    }

    /// Fitted IDF weights, if enabled.
    pub fn idf(&self) -> Option<&[f64]> {
        self.idf.as_deref()
    }

    /// Vectorize one document.
    pub fn transform(&self, text: &str) -> Result<CsVec<f64>> {
        let tokens = self.tokenizer.tokenize(text);
        self.weigh(&self.count(&tokens))
            .ok_or_else(|| Error::ZeroNorm {
                context: "document has no term in the fitted feature space".to_string(),
            })
    }

    /// Reject a deserialized transform whose parts disagree on the
    /// feature dimensionality.
    pub(crate) fn check(&self) -> Result<()> {
        let dim = self.dim();
        if dim == 0 {
            return Err(Error::EmptyVocabulary);
        }
        if let Encoding::Vocabulary(v) = &self.encoding {
            if !v.has_unique_terms() {
                return Err(Error::invalid("vocabulary", "contains duplicate terms"));
            }
        }
        if let Some(idf) = &self.idf {
            if idf.len() != dim {
                return Err(Error::DimensionMismatch {
                    expected: dim,
                    found: idf.len(),
                });
            }
            if idf.iter().any(|w| !w.is_finite()) {
                return Err(Error::invalid("idf", "contains non-finite weights"));
            }
        }
        Ok(())
    }

    fn count(&self, tokens: &[String]) -> CsVec<f64> {
        match &self.encoding {
            Encoding::Vocabulary(v) => sparse::from_pairs(
                v.len(),
                tokens
                    .iter()
                    .filter_map(|t| v.get(t))
                    .map(|i| (i, 1.0))
                    .collect(),
            ),
            Encoding::Hashed(h) => h.counts(tokens),
        }
    }

    /// Apply tf scheme, IDF and normalization. `None` when normalization was
    /// requested but the vector is zero.
    fn weigh(&self, counts: &CsVec<f64>) -> Option<CsVec<f64>> {
        let tf = self.term_frequency;
        let data = counts
            .iter()
            .map(|(i, &c)| match &self.idf {
                Some(idf) => tf.apply(c) * idf[i],
                None => tf.apply(c),
            })
            .collect();
        let mut v = CsVec::new(counts.dim(), counts.indices().to_vec(), data);
        if self.normalize && !sparse::normalize(&mut v) {
            return None;
        }
        Some(v)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn sports_tech() -> Corpus {
        Corpus::new([
            "football match team goal",
            "basketball team players score",
            "football players goal score",
            "software code compiler bug",
            "hardware chip compiler memory",
            "software memory chip code",
        ])
    }

    #[test]
    fn test_tfidf_unit_norm() {
        let (fitted, features) = Vectorizer::tfidf(1000).fit_transform(&sports_tech()).unwrap();
        assert_eq!(features.len(), 6);
        assert!(features.dim() <= 1000);
        assert_eq!(features.dim(), fitted.vocabulary().unwrap().len());
        for row in features.matrix().outer_iterator() {
            assert!((row.l2_norm() - 1.0).abs() < 1e-9);
        }
    }

    #[test]
    fn test_tfidf_df_filter() {
        let (fitted, _) = Vectorizer::tfidf(1000).fit_transform(&sports_tech()).unwrap();
        let vocab = fitted.vocabulary().unwrap();
        // Appears in one document only.
        assert!(vocab.get("match").is_none());
        assert!(vocab.get("football").is_some());
    }

    #[test]
    fn test_max_features_cap() {
        let (_, features) = Vectorizer::tfidf(3).fit_transform(&sports_tech()).unwrap();
        assert_eq!(features.dim(), 3);
    }

    #[test]
    fn test_idf_disabled_gives_raw_counts() {
        let corpus = Corpus::new(["aa bb bb", "aa cc"]);
        let (fitted, features) = Vectorizer::tfidf(10)
            .with_min_doc_freq(1)
            .with_max_doc_fraction(1.0)
            .with_idf(false)
            .with_normalize(false)
            .fit_transform(&corpus)
            .unwrap();
        assert!(fitted.idf().is_none());
        let bb = fitted.vocabulary().unwrap().get("bb").unwrap();
        assert_eq!(features.matrix().get(0, bb), Some(&2.0));
    }

    #[test]
    fn test_empty_corpus() {
        let err = Vectorizer::tfidf(10).fit_transform(&Corpus::default()).unwrap_err();
        assert!(matches!(err, Error::EmptyCorpus));
        assert!(err.is_configuration());
    }

    #[test]
    fn test_all_filtered_is_empty_vocabulary() {
        let corpus = Corpus::new(["the and of", "a an the"]);
        let err = Vectorizer::tfidf(10)
            .with_min_doc_freq(1)
            .with_max_doc_fraction(1.0)
            .fit_transform(&corpus)
            .unwrap_err();
        assert!(matches!(err, Error::EmptyVocabulary));

        let err = Vectorizer::hashing(16).fit_transform(&corpus).unwrap_err();
        assert!(matches!(err, Error::EmptyVocabulary));
    }

    #[test]
    fn test_skips_undecodable_and_empty_documents() {
        let corpus = Corpus::from_bytes(vec![
            b"rust compiler".to_vec(),
            vec![0xc3, 0x28],
            b"the of".to_vec(),
            b"rust borrow".to_vec(),
        ]);
        let (_, features) = Vectorizer::tfidf(10)
            .with_min_doc_freq(1)
            .with_max_doc_fraction(1.0)
            .fit_transform(&corpus)
            .unwrap();
        assert_eq!(features.doc_indices(), &[0, 3]);
        assert_eq!(
            features.skipped(),
            &[
                SkippedDocument {
                    index: 1,
                    reason: SkipReason::InvalidEncoding
                },
                SkippedDocument {
                    index: 2,
                    reason: SkipReason::NoRetainedTerms
                },
            ]
        );
    }

    #[test]
    fn test_hashing_fixed_dim() {
        let (fitted, features) = Vectorizer::hashing(64).fit_transform(&sports_tech()).unwrap();
        assert!(fitted.is_hashed());
        assert!(fitted.vocabulary().is_none());
        assert_eq!(features.dim(), 64);
        assert_eq!(fitted.idf().unwrap().len(), 64);
    }

    #[test]
    fn test_transform_matches_fit() {
        let corpus = sports_tech();
        let (fitted, features) = Vectorizer::tfidf(1000).fit_transform(&corpus).unwrap();
        let again = fitted.transform(corpus.get(2).unwrap()).unwrap();
        let row = features.matrix().outer_view(2).unwrap();
        assert_eq!(again.indices(), row.indices());
        assert_eq!(again.data(), row.data());
    }

    #[test]
    fn test_check_rejects_inconsistent_idf() {
        let (mut fitted, _) = Vectorizer::tfidf(1000).fit_transform(&sports_tech()).unwrap();
        assert!(fitted.check().is_ok());
        fitted.idf = Some(vec![1.0]);
        let err = fitted.check().unwrap_err();
        assert!(matches!(err, Error::DimensionMismatch { found: 1, .. }));
    }

    #[test]
    fn test_transform_unknown_terms_is_zero_norm() {
        let (fitted, _) = Vectorizer::tfidf(1000).fit_transform(&sports_tech()).unwrap();
        let err = fitted.transform("zebra giraffe").unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::NumericInstability);
    }

    proptest! {
        #[test]
        fn prop_hashed_vectors_unit_norm(
            docs in prop::collection::vec("[a-z]{2,6}( [a-z]{2,6}){0,8}", 1..12),
            n_features in 1usize..128,
        ) {
            let corpus = Corpus::new(docs);
            if let Ok((_, features)) = Vectorizer::hashing(n_features).fit_transform(&corpus) {
                prop_assert_eq!(features.dim(), n_features);
                for row in features.matrix().outer_iterator() {
                    prop_assert!((row.l2_norm() - 1.0).abs() < 1e-9);
                    prop_assert!(row.indices().iter().all(|&i| i < n_features));
                }
            }
        }

        #[test]
        fn prop_tfidf_dim_capped(
            docs in prop::collection::vec("[a-f]{2,3}( [a-f]{2,3}){0,6}", 2..12),
            cap in 1usize..20,
        ) {
            let corpus = Corpus::new(docs);
            let result = Vectorizer::tfidf(cap)
                .with_min_doc_freq(1)
                .with_max_doc_fraction(1.0)
                .fit_transform(&corpus);
            if let Ok((_, features)) = result {
                prop_assert!(features.dim() <= cap);
                for row in features.matrix().outer_iterator() {
                    prop_assert!((row.l2_norm() - 1.0).abs() < 1e-9);
                }
            }
        }
    }
}
