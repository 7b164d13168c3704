pub mod analyzer;
pub mod clean;
pub mod corpus;
pub mod term;
pub mod tfidf;

use std::marker::PhantomData;

use indexmap::IndexSet;
use log::debug;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::{
    error::{FeatureError, Result},
    utils::math::sparse::{SparseMatrix, SparseVec},
    vectorizer::{
        analyzer::{analyze, NgramRange},
        corpus::Corpus,
        term::TermFrequency,
        tfidf::{DefaultTFIDFEngine, TFIDFEngine},
    },
};

/// Vocabulary selection parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VectorizerConfig {
    /// n-gram widths to extract
    pub ngram_range: NgramRange,
    /// keep terms found in at least this many documents
    pub min_doc_freq: u64,
    /// keep terms found in at most this share of documents, in (0, 1]
    pub max_doc_freq_ratio: f64,
    /// keep at most this many terms (highest corpus counts), `None` for no cap
    pub max_vocab_size: Option<usize>,
}

impl Default for VectorizerConfig {
    fn default() -> Self {
        Self {
            ngram_range: NgramRange::default(),
            min_doc_freq: 3,
            max_doc_freq_ratio: 0.95,
            max_vocab_size: Some(200_000),
        }
    }
}

impl VectorizerConfig {
    pub fn validate(&self) -> Result<()> {
        self.ngram_range.validate()?;
        if !(self.max_doc_freq_ratio > 0.0 && self.max_doc_freq_ratio <= 1.0) {
            return Err(FeatureError::InvalidConfig(format!(
                "max_doc_freq_ratio must be in (0, 1], got {}",
                self.max_doc_freq_ratio
            )));
        }
        if self.max_vocab_size == Some(0) {
            return Err(FeatureError::InvalidConfig("max_vocab_size must be positive".into()));
        }
        Ok(())
    }
}

/// Fitted TF-IDF vectorizer
///
/// Holds the vocabulary (sorted, each term's position is its dimension)
/// and the IDF weight of every term. Immutable after fitting.
///
/// `E` selects the weighting scheme, see [`TFIDFEngine`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(bound = "")]
pub struct TfidfVectorizer<E = DefaultTFIDFEngine> {
    config: VectorizerConfig,
    vocabulary: IndexSet<String>,
    idf: Vec<f64>,
    #[serde(skip)]
    _marker: PhantomData<E>,
}

impl<E> TfidfVectorizer<E> {
    /// Fitted terms in dimension order
    #[inline]
    pub fn vocabulary(&self) -> &IndexSet<String> {
        &self.vocabulary
    }

    /// IDF weights parallel to [`Self::vocabulary`]
    #[inline]
    pub fn idf(&self) -> &[f64] {
        &self.idf
    }

    #[inline]
    pub fn config(&self) -> &VectorizerConfig {
        &self.config
    }

    #[inline]
    pub fn vocab_size(&self) -> usize {
        self.vocabulary.len()
    }
}

impl<E> TfidfVectorizer<E>
where
    E: TFIDFEngine,
{
    /// Learn vocabulary and IDF from `texts` and return the weighted matrix
    /// of the same texts (one L2-normalised row per text).
    pub fn fit_transform<S>(texts: &[S], config: &VectorizerConfig) -> Result<(Self, SparseMatrix)>
    where
        S: AsRef<str> + Sync,
    {
        config.validate()?;

        let freqs = count_terms(texts, config.ngram_range);
        let corpus = freqs
            .par_iter()
            .fold(Corpus::new, |mut c, f| {
                c.add_set(f);
                c
            })
            .reduce(Corpus::new, |mut a, b| {
                a.merge_corpus(b);
                a
            });

        if corpus.vocab_size() == 0 {
            return Err(FeatureError::EmptyVocabulary);
        }

        let vocabulary = select_vocabulary(&corpus, config)?;
        debug!(
            "vocabulary: {} of {} candidate terms kept over {} documents",
            vocabulary.len(),
            corpus.vocab_size(),
            corpus.get_doc_num()
        );
        let idf = E::idf_vec(&corpus, &vocabulary);

        let vectorizer = Self {
            config: config.clone(),
            vocabulary,
            idf,
            _marker: PhantomData,
        };
        let matrix = vectorizer.weigh_all(&freqs);
        Ok((vectorizer, matrix))
    }

    /// Weighted matrix of new texts over the fitted vocabulary.
    /// Unknown terms are ignored; a text with no known term gives a zero row.
    pub fn transform<S>(&self, texts: &[S]) -> SparseMatrix
    where
        S: AsRef<str> + Sync,
    {
        let freqs = count_terms(texts, self.config.ngram_range);
        self.weigh_all(&freqs)
    }

    fn weigh_all(&self, freqs: &[TermFrequency]) -> SparseMatrix {
        let rows = freqs.par_iter().map(|f| self.weigh(f)).collect();
        SparseMatrix::new(self.vocabulary.len(), rows)
    }

    /// tf * idf, then unit L2 norm
    fn weigh(&self, freq: &TermFrequency) -> SparseVec<f64> {
        let mut row = E::tf_vec(freq, &self.vocabulary);
        row.map_values(|j, tf| tf * self.idf[j]);
        row.l2_normalize();
        row
    }
}

fn count_terms<S>(texts: &[S], range: NgramRange) -> Vec<TermFrequency>
where
    S: AsRef<str> + Sync,
{
    texts
        .par_iter()
        .map(|t| TermFrequency::from(analyze(t.as_ref(), range).as_slice()))
        .collect()
}

/// Document frequency filter, then the vocabulary cap
/// Result is sorted lexicographically.
fn select_vocabulary(corpus: &Corpus, config: &VectorizerConfig) -> Result<IndexSet<String>> {
    let n_docs = corpus.get_doc_num() as f64;
    let max_doc_count = config.max_doc_freq_ratio * n_docs;
    if max_doc_count < config.min_doc_freq as f64 {
        return Err(FeatureError::InvalidConfig(format!(
            "max_doc_freq_ratio={} covers {} documents, fewer than min_doc_freq={}",
            config.max_doc_freq_ratio, max_doc_count, config.min_doc_freq
        )));
    }

    let mut terms: Vec<&str> = corpus
        .iter_doc_freq()
        .filter(|&(_, df)| df >= config.min_doc_freq && df as f64 <= max_doc_count)
        .map(|(term, _)| term)
        .collect();
    terms.sort_unstable();

    if terms.is_empty() {
        return Err(FeatureError::NoTermsRemain);
    }

    if let Some(cap) = config.max_vocab_size {
        if terms.len() > cap {
            // stable: 同数なら辞書順
            terms.sort_by(|a, b| corpus.get_term_total(b).cmp(&corpus.get_term_total(a)));
            terms.truncate(cap);
            terms.sort_unstable();
        }
    }

    Ok(terms.into_iter().map(String::from).collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(min_df: u64) -> VectorizerConfig {
        VectorizerConfig {
            min_doc_freq: min_df,
            max_doc_freq_ratio: 1.0,
            ..VectorizerConfig::default()
        }
    }

    #[test]
    fn vocabulary_sorted_and_rows_unit_norm() {
        let texts = ["itchy red rash", "itchy red rash", "clear skin"];
        let (vec, m): (TfidfVectorizer, _) = TfidfVectorizer::fit_transform(&texts, &config(1)).unwrap();
        let vocab: Vec<&str> = vec.vocabulary().iter().map(String::as_str).collect();
        assert_eq!(
            vocab,
            vec!["clear", "clear skin", "itchy", "itchy red", "rash", "red", "red rash", "skin"]
        );
        assert_eq!(m.n_rows(), 3);
        for row in m.rows() {
            assert!((row.norm_sq() - 1.0).abs() < 1e-12);
        }
        assert_eq!(m.rows()[0], m.rows()[1]);
    }

    #[test]
    fn doc_freq_bounds_filter_terms() {
        let texts = ["mole mole", "mole scar", "mole scar", "mole"];
        // mole in 4/4 docs exceeds ratio .75, scar (2 docs) kept, bigrams below min_df
        let cfg = VectorizerConfig {
            min_doc_freq: 2,
            max_doc_freq_ratio: 0.75,
            ..VectorizerConfig::default()
        };
        let (vec, _): (TfidfVectorizer, _) = TfidfVectorizer::fit_transform(&texts, &cfg).unwrap();
        let vocab: Vec<&str> = vec.vocabulary().iter().map(String::as_str).collect();
        assert_eq!(vocab, vec!["mole scar", "scar"]);
    }

    #[test]
    fn cap_keeps_most_frequent_terms() {
        let texts = ["aa aa aa bb", "aa bb cc", "cc dd"];
        let cfg = VectorizerConfig {
            ngram_range: NgramRange { min: 1, max: 1 },
            max_vocab_size: Some(2),
            ..config(1)
        };
        let (vec, _): (TfidfVectorizer, _) = TfidfVectorizer::fit_transform(&texts, &cfg).unwrap();
        let vocab: Vec<&str> = vec.vocabulary().iter().map(String::as_str).collect();
        // aa=4, bb=2, cc=2 -> tie between bb and cc resolved alphabetically
        assert_eq!(vocab, vec!["aa", "bb"]);
    }

    #[test]
    fn empty_corpus_and_over_pruning() {
        let err = TfidfVectorizer::<DefaultTFIDFEngine>::fit_transform(&["", "  "], &config(1)).unwrap_err();
        assert_eq!(err, FeatureError::EmptyVocabulary);

        let err = TfidfVectorizer::<DefaultTFIDFEngine>::fit_transform(&["aa bb", "cc dd"], &config(2)).unwrap_err();
        assert_eq!(err, FeatureError::NoTermsRemain);
    }

    #[test]
    fn max_ratio_below_min_df_is_a_config_error() {
        let cfg = VectorizerConfig {
            min_doc_freq: 3,
            max_doc_freq_ratio: 0.5,
            ..VectorizerConfig::default()
        };
        let err = TfidfVectorizer::<DefaultTFIDFEngine>::fit_transform(&["aa", "aa", "aa", "aa"], &cfg).unwrap_err();
        assert!(matches!(err, FeatureError::InvalidConfig(_)));
    }

    #[test]
    fn transform_ignores_unknown_terms() {
        let texts = ["red rash", "red mole"];
        let (vec, fitted): (TfidfVectorizer, _) = TfidfVectorizer::fit_transform(&texts, &config(1)).unwrap();
        let again = vec.transform(&texts);
        assert_eq!(fitted, again);

        let unseen = vec.transform(&["purple lesion"]);
        assert_eq!(unseen.rows()[0].nnz(), 0);
    }
}
