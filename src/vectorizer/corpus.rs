use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::vectorizer::term::TermFrequency;

/// Corpus statistics used for vocabulary selection and IDF
///
/// Does not store document text; it only tracks:
/// - The number of documents
/// - The number of documents in which each term appears
/// - The total number of occurrences of each term
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Corpus {
    doc_num: u64,
    /// document frequency per term
    #[serde(with = "indexmap::map::serde_seq")]
    doc_freq: IndexMap<String, u64>,
    /// occurrences over the whole corpus
    #[serde(with = "indexmap::map::serde_seq")]
    term_total: IndexMap<String, u64>,
}

impl Corpus {
    /// Create a new instance
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a document's terms to the corpus
    pub fn add_set(&mut self, doc: &TermFrequency) -> &mut Self {
        self.doc_num += 1;
        for (term, count) in doc.iter() {
            match self.doc_freq.get_mut(term) {
                Some(df) => *df += 1,
                None => {
                    self.doc_freq.insert(term.to_string(), 1);
                }
            }
            *self.term_total.entry(term.to_string()).or_insert(0) += count;
        }
        self
    }

    /// Merge another corpus into self
    pub fn merge_corpus(&mut self, other: Corpus) -> &mut Self {
        self.doc_num += other.doc_num;
        for (term, df) in other.doc_freq {
            *self.doc_freq.entry(term).or_insert(0) += df;
        }
        for (term, total) in other.term_total {
            *self.term_total.entry(term).or_insert(0) += total;
        }
        self
    }

    /// Get the number of documents in the corpus
    #[inline]
    pub fn get_doc_num(&self) -> u64 {
        self.doc_num
    }

    /// Number of documents containing `term`
    #[inline]
    pub fn get_doc_freq(&self, term: &str) -> u64 {
        self.doc_freq.get(term).copied().unwrap_or(0)
    }

    /// Occurrences of `term` over all documents
    #[inline]
    pub fn get_term_total(&self, term: &str) -> u64 {
        self.term_total.get(term).copied().unwrap_or(0)
    }

    /// Get the current vocabulary size (number of unique terms)
    #[inline]
    pub fn vocab_size(&self) -> usize {
        self.doc_freq.len()
    }

    /// Iterate `(term, document frequency)`
    pub fn iter_doc_freq(&self) -> impl Iterator<Item = (&str, u64)> {
        self.doc_freq.iter().map(|(t, &df)| (t.as_str(), df))
    }
}

impl<'a> FromIterator<&'a TermFrequency> for Corpus {
    fn from_iter<I: IntoIterator<Item = &'a TermFrequency>>(iter: I) -> Self {
        let mut corpus = Corpus::new();
        for doc in iter {
            corpus.add_set(doc);
        }
        corpus
    }
}
