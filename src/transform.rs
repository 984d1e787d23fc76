//! The fitted feature space: vectorizer plus optional LSA basis.

use ndarray::Array1;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::reduce::Lsa;
use crate::text::FittedVectorizer;

/// Everything needed to map a new document into the space the clustering
/// was fit on. Immutable once built.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureTransform {
    vectorizer: FittedVectorizer,
    lsa: Option<Lsa>,
}

impl FeatureTransform {
    /// Combine a fitted vectorizer with an optional reduction.
    pub fn new(vectorizer: FittedVectorizer, lsa: Option<Lsa>) -> Self {
        Self { vectorizer, lsa }
    }

    /// Fitted vectorizer.
    pub fn vectorizer(&self) -> &FittedVectorizer {
        &self.vectorizer
    }

    /// LSA basis, when reduction was applied.
    pub fn lsa(&self) -> Option<&Lsa> {
        self.lsa.as_ref()
    }

    /// Dimensionality of the output space.
    pub fn dim(&self) -> usize {
        match &self.lsa {
            Some(lsa) => lsa.n_components(),
            None => self.vectorizer.dim(),
        }
    }

    /// Verify that the vectorizer, its IDF weights and the LSA basis agree
    /// on the feature dimensionality.
    pub(crate) fn check(&self) -> Result<()> {
        self.vectorizer.check()?;
        if let Some(lsa) = &self.lsa {
            lsa.check()?;
            if lsa.n_features() != self.vectorizer.dim() {
                return Err(Error::DimensionMismatch {
                    expected: self.vectorizer.dim(),
                    found: lsa.n_features(),
                });
            }
        }
        Ok(())
    }

    /// Dense vector for one document.
    pub fn transform(&self, text: &str) -> Result<Array1<f64>> {
        let sparse = self.vectorizer.transform(text)?;
        match &self.lsa {
            Some(lsa) => lsa.transform(&sparse),
            None => {
                let mut dense = Array1::zeros(self.vectorizer.dim());
                for (i, &v) in sparse.iter() {
                    dense[i] = v;
                }
                Ok(dense)
            }
        }
    }
}
