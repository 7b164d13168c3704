use serde::{Deserialize, Serialize};

use crate::error::{FeatureError, Result};

/// Inclusive range of n-gram widths, e.g. `(1, 2)` for unigrams + bigrams
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct NgramRange {
    pub min: usize,
    pub max: usize,
}

impl NgramRange {
    pub fn new(min: usize, max: usize) -> Result<Self> {
        let range = Self { min, max };
        range.validate()?;
        Ok(range)
    }

    pub fn validate(&self) -> Result<()> {
        if self.min == 0 || self.min > self.max {
            return Err(FeatureError::InvalidConfig(format!(
                "invalid ngram range ({}, {}); need 1 <= min <= max",
                self.min, self.max
            )));
        }
        Ok(())
    }
}

impl Default for NgramRange {
    fn default() -> Self {
        Self { min: 1, max: 2 }
    }
}

/// Split lowercased text into word tokens.
/// A token is a run of at least two word characters (alphanumeric or `_`);
/// everything else separates tokens.
pub fn tokenize(text: &str) -> Vec<String> {
    let lower = text.to_lowercase();
    lower
        .split(|c: char| !(c.is_alphanumeric() || c == '_'))
        .filter(|tok| tok.chars().nth(1).is_some())
        .map(String::from)
        .collect()
}

/// Expand tokens into n-grams (space-joined), shortest width first
pub fn word_ngrams(tokens: &[String], range: NgramRange) -> Vec<String> {
    let mut out = Vec::new();
    for n in range.min.max(1)..=range.max.min(tokens.len()) {
        out.extend(tokens.windows(n).map(|w| w.join(" ")));
    }
    out
}

/// tokenize + n-gram expansion
#[inline]
pub fn analyze(text: &str, range: NgramRange) -> Vec<String> {
    word_ngrams(&tokenize(text), range)
}
