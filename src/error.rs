use thiserror::Error;

/// Result alias for `textcluster`.
pub type Result<T> = std::result::Result<T, Error>;

/// Broad failure category of an [`Error`].
///
/// Configuration and unsupported-operation errors are caller mistakes and are
/// never retried. Numeric instabilities are terminal for the call that raised
/// them; recoverable cases (empty clusters) are handled inside the fit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Invalid or contradictory parameters.
    Configuration,
    /// The operation is not defined for this fitted state.
    UnsupportedOperation,
    /// Degenerate numeric input (zero-norm vectors, failed decomposition).
    NumericInstability,
    /// Reading or writing a persisted artifact failed.
    Persistence,
}

/// Errors returned by feature extraction, reduction, clustering and evaluation.
#[derive(Debug, Error)]
pub enum Error {
    /// The corpus had no decodable documents.
    #[error("corpus is empty")]
    EmptyCorpus,

    /// Every term was filtered out.
    #[error("empty vocabulary: every term was filtered out")]
    EmptyVocabulary,

    /// Invalid number of clusters requested.
    #[error("cannot create {requested} clusters from {n_items} items")]
    InvalidClusterCount {
        /// Requested count.
        requested: usize,
        /// Number of items.
        n_items: usize,
    },

    /// Reduction rank is not below the input dimensionality.
    #[error(
        "cannot reduce to {requested} components: input has {n_features} features and {n_samples} samples"
    )]
    InvalidReductionRank {
        /// Requested rank.
        requested: usize,
        /// Input dimensionality.
        n_features: usize,
        /// Number of input rows.
        n_samples: usize,
    },

    /// Invalid parameter value.
    #[error("invalid parameter '{name}': {message}")]
    InvalidParameter {
        /// Parameter name.
        name: &'static str,
        /// Error message.
        message: String,
    },

    /// Vector or matrix dimension mismatch.
    #[error("dimension mismatch: expected {expected}, found {found}")]
    DimensionMismatch {
        /// Expected dimension.
        expected: usize,
        /// Found dimension.
        found: usize,
    },

    /// Label sequence is not parallel to the documents.
    #[error("{labels} labels supplied for {documents} documents")]
    LabelMismatch {
        /// Number of documents.
        documents: usize,
        /// Number of labels.
        labels: usize,
    },

    /// Operation not defined for this transform.
    #[error("unsupported operation: {0}")]
    Unsupported(&'static str),

    /// A vector with zero norm could not be normalized.
    #[error("zero-norm vector cannot be normalized: {context}")]
    ZeroNorm {
        /// Where the vector came from.
        context: String,
    },

    /// Matrix decomposition produced unusable output.
    #[error("decomposition failed: {0}")]
    Decomposition(String),

    /// I/O failure while persisting or loading.
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// Serialization failure while persisting or loading.
    #[error(transparent)]
    Serialization(#[from] serde_json::Error),
}

impl Error {
    /// Category of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::EmptyCorpus
            | Error::EmptyVocabulary
            | Error::InvalidClusterCount { .. }
            | Error::InvalidReductionRank { .. }
            | Error::InvalidParameter { .. }
            | Error::DimensionMismatch { .. }
            | Error::LabelMismatch { .. } => ErrorKind::Configuration,
            Error::Unsupported(_) => ErrorKind::UnsupportedOperation,
            Error::ZeroNorm { .. } | Error::Decomposition(_) => ErrorKind::NumericInstability,
            Error::Io(_) | Error::Serialization(_) => ErrorKind::Persistence,
        }
    }

    /// Whether this is a configuration mistake.
    pub fn is_configuration(&self) -> bool {
        self.kind() == ErrorKind::Configuration
    }

    pub(crate) fn invalid(name: &'static str, message: impl Into<String>) -> Self {
        Error::InvalidParameter {
            name,
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_mapping() {
        assert_eq!(Error::EmptyCorpus.kind(), ErrorKind::Configuration);
        assert_eq!(
            Error::InvalidClusterCount {
                requested: 3,
                n_items: 2
            }
            .kind(),
            ErrorKind::Configuration
        );
        assert_eq!(
            Error::Unsupported("x").kind(),
            ErrorKind::UnsupportedOperation
        );
        assert_eq!(
            Error::ZeroNorm {
                context: "doc 0".into()
            }
            .kind(),
            ErrorKind::NumericInstability
        );
    }

    #[test]
    fn test_display() {
        let e = Error::InvalidClusterCount {
            requested: 5,
            n_items: 2,
        };
        assert_eq!(e.to_string(), "cannot create 5 clusters from 2 items");
    }
}
