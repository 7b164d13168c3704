use indexmap::IndexSet;

use crate::{utils::math::sparse::SparseVec, vectorizer::{corpus::Corpus, term::TermFrequency}};

/// TF-IDF weighting scheme
///
/// Implementors provide the per-term `tf` and `idf` functions; the vector
/// builders are shared. Rows produced by `tf_vec` are not yet multiplied by
/// IDF nor normalised, the vectorizer does both.
pub trait TFIDFEngine: Send + Sync {
    /// Weight of a term occurring `count` times in one document
    fn tf(count: u64) -> f64;

    /// Inverse document frequency of a term found in `doc_freq` of `doc_num` documents
    fn idf(doc_num: u64, doc_freq: u64) -> f64;

    /// IDF vector over the vocabulary
    /// # Arguments
    /// * `corpus` - corpus statistics
    /// * `vocabulary` - term dimension order
    fn idf_vec(corpus: &Corpus, vocabulary: &IndexSet<String>) -> Vec<f64> {
        let doc_num = corpus.get_doc_num();
        vocabulary
            .iter()
            .map(|term| Self::idf(doc_num, corpus.get_doc_freq(term)))
            .collect()
    }

    /// TF vector of one document over the vocabulary
    /// Terms outside the vocabulary are ignored.
    fn tf_vec(freq: &TermFrequency, vocabulary: &IndexSet<String>) -> SparseVec<f64> {
        let (inds, vals): (Vec<u32>, Vec<f64>) = freq
            .iter()
            .filter_map(|(term, count)| {
                vocabulary
                    .get_index_of(term)
                    .map(|idx| (idx as u32, Self::tf(count)))
            })
            .unzip();
        SparseVec::from_unsorted(vocabulary.len(), inds, vals)
    }
}

/// Default engine: raw counts and smoothed IDF
/// `idf = ln((1 + n) / (1 + df)) + 1`
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DefaultTFIDFEngine;

impl TFIDFEngine for DefaultTFIDFEngine {
    #[inline]
    fn tf(count: u64) -> f64 {
        count as f64
    }

    #[inline]
    fn idf(doc_num: u64, doc_freq: u64) -> f64 {
        ((1.0 + doc_num as f64) / (1.0 + doc_freq as f64)).ln() + 1.0
    }
}

/// Sublinear engine: `1 + ln(count)` damps repeated terms, smoothed IDF
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SublinearTFIDFEngine;

impl TFIDFEngine for SublinearTFIDFEngine {
    #[inline]
    fn tf(count: u64) -> f64 {
        if count == 0 {
            0.0
        } else {
            1.0 + (count as f64).ln()
        }
    }

    #[inline]
    fn idf(doc_num: u64, doc_freq: u64) -> f64 {
        DefaultTFIDFEngine::idf(doc_num, doc_freq)
    }
}
