//! Documents and their optional ground-truth categories.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// An ordered document collection. A document's identity is its index.
///
/// Labels are carried for evaluation only; no fitting stage reads them.
#[derive(Debug, Clone, Default)]
pub struct Corpus {
    /// `None` marks a document whose bytes were not valid UTF-8.
    documents: Vec<Option<String>>,
    labels: Option<Vec<String>>,
}

impl Corpus {
    /// Corpus from decoded documents.
    pub fn new<I, S>(documents: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            documents: documents.into_iter().map(|d| Some(d.into())).collect(),
            labels: None,
        }
    }

    /// Corpus from raw bytes. Documents that fail UTF-8 decoding keep their
    /// position but are skipped by feature extraction.
    pub fn from_bytes<I>(documents: I) -> Self
    where
        I: IntoIterator<Item = Vec<u8>>,
    {
        Self {
            documents: documents
                .into_iter()
                .map(|raw| String::from_utf8(raw).ok())
                .collect(),
            labels: None,
        }
    }

    /// Attach one label per document.
    pub fn with_labels<I, S>(mut self, labels: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: ToString,
    {
        let labels: Vec<String> = labels.into_iter().map(|l| l.to_string()).collect();
        if labels.len() != self.documents.len() {
            return Err(Error::LabelMismatch {
                documents: self.documents.len(),
                labels: labels.len(),
            });
        }
        self.labels = Some(labels);
        Ok(self)
    }

    /// Number of documents, decodable or not.
    pub fn len(&self) -> usize {
        self.documents.len()
    }

    /// Whether the corpus holds no documents.
    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    /// Document text at `index`, if decodable.
    pub fn get(&self, index: usize) -> Option<&str> {
        self.documents.get(index).and_then(|d| d.as_deref())
    }

    /// All positions with their text (`None` when undecodable).
    pub fn documents(&self) -> impl Iterator<Item = (usize, Option<&str>)> + '_ {
        self.documents
            .iter()
            .enumerate()
            .map(|(i, d)| (i, d.as_deref()))
    }

    /// Raw labels, if any.
    pub fn labels(&self) -> Option<&[String]> {
        self.labels.as_deref()
    }

    /// Labels encoded as class ids, assigned in lexicographic label order.
    pub fn label_ids(&self) -> Option<Vec<usize>> {
        let labels = self.labels.as_ref()?;
        let classes = Self::class_index(labels);
        Some(labels.iter().map(|l| classes[l.as_str()]).collect())
    }

    /// Number of distinct labels.
    pub fn n_categories(&self) -> Option<usize> {
        self.labels.as_ref().map(|l| Self::class_index(l).len())
    }

    fn class_index(labels: &[String]) -> BTreeMap<&str, usize> {
        let mut classes: BTreeMap<&str, usize> =
            labels.iter().map(|l| (l.as_str(), 0)).collect();
        for (id, slot) in classes.values_mut().enumerate() {
            *slot = id;
        }
        classes
    }
}

/// Corpus file layout read by the command-line tool.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CorpusFile {
    /// Document texts.
    pub documents: Vec<String>,
    /// Optional parallel labels.
    #[serde(default)]
    pub labels: Option<Vec<String>>,
}

impl TryFrom<CorpusFile> for Corpus {
    type Error = Error;

    fn try_from(file: CorpusFile) -> Result<Self> {
        let corpus = Corpus::new(file.documents);
        match file.labels {
            Some(labels) => corpus.with_labels(labels),
            None => Ok(corpus),
        }
    }
}
