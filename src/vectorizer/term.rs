use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Term counts of a single note
///
/// Terms are the analyzer's output (unigrams and space-joined n-grams) and
/// iterate in first-seen order.
///
/// # Examples
/// ```
/// use lesion_note_features::vectorizer::term::TermFrequency;
///
/// let mut freq = TermFrequency::new();
/// freq.add_terms(&["scaly", "patch", "scaly patch", "scaly"]);
///
/// assert_eq!(freq.term_count("scaly"), 2);
/// assert_eq!(freq.term_num(), 3);
/// assert_eq!(freq.term_sum(), 4);
/// ```
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
pub struct TermFrequency {
    #[serde(with = "indexmap::map::serde_seq")]
    counts: IndexMap<String, u64>,
    total: u64,
}

impl TermFrequency {
    pub fn new() -> Self {
        Self::default()
    }

    /// Count one occurrence of `term`
    #[inline]
    pub fn add_term(&mut self, term: &str) -> &mut Self {
        if let Some(c) = self.counts.get_mut(term) {
            *c += 1;
        } else {
            self.counts.insert(term.to_owned(), 1);
        }
        self.total += 1;
        self
    }

    /// Count every term of `terms`, repeats included
    pub fn add_terms<T>(&mut self, terms: &[T]) -> &mut Self
    where
        T: AsRef<str>,
    {
        terms.iter().for_each(|t| {
            self.add_term(t.as_ref());
        });
        self
    }

    /// Occurrences of `term`, 0 when absent
    #[inline]
    pub fn term_count(&self, term: &str) -> u64 {
        self.counts.get(term).map_or(0, |&c| c)
    }

    /// Occurrences of all terms
    #[inline]
    pub fn term_sum(&self) -> u64 {
        self.total
    }

    /// `(term, count)` pairs
    pub fn iter(&self) -> impl Iterator<Item = (&str, u64)> {
        self.counts.iter().map(|(t, &c)| (t.as_str(), c))
    }

    /// Distinct terms
    #[inline]
    pub fn term_num(&self) -> usize {
        self.counts.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }
}

impl<T> From<&[T]> for TermFrequency
where
    T: AsRef<str>,
{
    fn from(terms: &[T]) -> Self {
        let mut freq = Self::new();
        freq.add_terms(terms);
        freq
    }
}
