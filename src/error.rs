use thiserror::Error;

/// Errors raised while building, applying or explaining note features
#[derive(Error, Debug, Clone, PartialEq)]
pub enum FeatureError {
    #[error("{0:?} not found in table columns")]
    MissingColumn(String),

    #[error("n_components={requested} exceeds the retained vocabulary size {vocabulary}; lower n_components or widen the document frequency bounds")]
    Dimensionality { requested: usize, vocabulary: usize },

    #[error("malformed pipeline: {0}")]
    MalformedPipeline(String),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("empty vocabulary; the documents contain no terms")]
    EmptyVocabulary,

    #[error("after pruning, no terms remain; try a lower min_doc_freq or a higher max_doc_freq_ratio")]
    NoTermsRemain,

    #[error("component {index} out of range for {available} components")]
    InvalidComponent { index: usize, available: usize },

    #[error("column {name:?} has {actual} rows but the table has {expected}")]
    LengthMismatch {
        name: String,
        expected: usize,
        actual: usize,
    },
}

pub type Result<T> = std::result::Result<T, FeatureError>;
