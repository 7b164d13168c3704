use log::debug;
use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};

use crate::{
    error::{FeatureError, Result},
    reduction::{SvdConfig, TruncatedSvd},
    table::{Table, Value},
    vectorizer::{
        analyzer::NgramRange,
        clean::{clean_text, clean_value},
        tfidf::{DefaultTFIDFEngine, TFIDFEngine},
        TfidfVectorizer, VectorizerConfig,
    },
};

/// Parameters of [`build_features`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureConfig {
    /// output columns are named `{output_prefix}_000`, `{output_prefix}_001`, ...
    pub output_prefix: String,
    /// reduced dimensionality (k)
    pub n_components: usize,
    pub max_vocab_size: Option<usize>,
    pub ngram_range: NgramRange,
    /// absolute document count
    pub min_doc_freq: u64,
    /// share of documents, in (0, 1]
    pub max_doc_freq_ratio: f64,
    pub random_seed: u64,
    pub n_iter: usize,
    pub n_oversamples: usize,
}

impl Default for FeatureConfig {
    fn default() -> Self {
        Self {
            output_prefix: "note_svd".to_string(),
            n_components: 50,
            max_vocab_size: Some(200_000),
            ngram_range: NgramRange::default(),
            min_doc_freq: 3,
            max_doc_freq_ratio: 0.95,
            random_seed: 42,
            n_iter: 5,
            n_oversamples: 10,
        }
    }
}

impl FeatureConfig {
    pub fn vectorizer_config(&self) -> VectorizerConfig {
        VectorizerConfig {
            ngram_range: self.ngram_range,
            min_doc_freq: self.min_doc_freq,
            max_doc_freq_ratio: self.max_doc_freq_ratio,
            max_vocab_size: self.max_vocab_size,
        }
    }

    pub fn svd_config(&self) -> SvdConfig {
        SvdConfig {
            n_components: self.n_components,
            n_iter: self.n_iter,
            n_oversamples: self.n_oversamples,
            random_seed: self.random_seed,
        }
    }
}

/// Fitted text-to-features transformation
///
/// Bundles the vectorizer (vocabulary + IDF) and the reducer (projection
/// directions). Immutable; reusable on new notes through [`Self::transform`]
/// and [`Self::transform_table`].
///
/// # Serialization
/// Supported. The weighting engine is a type parameter and is not stored,
/// so deserialize into the same `FittedPipeline<E>` that was saved.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(bound = "")]
pub struct FittedPipeline<E = DefaultTFIDFEngine> {
    vectorizer: TfidfVectorizer<E>,
    reducer: TruncatedSvd,
    output_prefix: String,
}

impl<E> FittedPipeline<E> {
    #[inline]
    pub fn vectorizer(&self) -> &TfidfVectorizer<E> {
        &self.vectorizer
    }

    #[inline]
    pub fn reducer(&self) -> &TruncatedSvd {
        &self.reducer
    }

    /// Terms in dimension order
    pub fn vocabulary(&self) -> impl Iterator<Item = &str> {
        self.vectorizer.vocabulary().iter().map(String::as_str)
    }

    #[inline]
    pub fn vocab_size(&self) -> usize {
        self.vectorizer.vocab_size()
    }

    #[inline]
    pub fn idf_weights(&self) -> &[f64] {
        self.vectorizer.idf()
    }

    /// `k × vocab_size`
    #[inline]
    pub fn components(&self) -> &Array2<f64> {
        self.reducer.components()
    }

    #[inline]
    pub fn n_components(&self) -> usize {
        self.reducer.n_components()
    }

    #[inline]
    pub fn singular_values(&self) -> &Array1<f64> {
        self.reducer.singular_values()
    }

    #[inline]
    pub fn explained_variance_ratio(&self) -> &Array1<f64> {
        self.reducer.explained_variance_ratio()
    }

    #[inline]
    pub fn output_prefix(&self) -> &str {
        &self.output_prefix
    }

    /// Names of the emitted feature columns
    pub fn output_columns(&self) -> Vec<String> {
        (0..self.n_components())
            .map(|i| output_column_name(&self.output_prefix, i))
            .collect()
    }

    /// Check that vocabulary, IDF and directions agree in shape.
    /// Only a hand-built or corrupted deserialized pipeline can fail.
    pub fn validate(&self) -> Result<()> {
        let vocab = self.vectorizer.vocab_size();
        if self.vectorizer.idf().len() != vocab {
            return Err(FeatureError::MalformedPipeline(format!(
                "{} idf weights for {} terms",
                self.vectorizer.idf().len(),
                vocab
            )));
        }
        let (k, n_features) = self.reducer.components().dim();
        if n_features != vocab {
            return Err(FeatureError::MalformedPipeline(format!(
                "components span {} features but the vocabulary has {} terms",
                n_features, vocab
            )));
        }
        if k == 0 || self.reducer.singular_values().len() != k {
            return Err(FeatureError::MalformedPipeline(format!(
                "{} components with {} singular values",
                k,
                self.reducer.singular_values().len()
            )));
        }
        Ok(())
    }
}

impl<E> FittedPipeline<E>
where
    E: TFIDFEngine,
{
    /// Reduced features of raw note texts, one row per text
    pub fn transform<S>(&self, texts: &[S]) -> Result<Array2<f32>>
    where
        S: AsRef<str>,
    {
        let cleaned: Vec<String> = texts.iter().map(|t| clean_text(t.as_ref())).collect();
        self.project(&cleaned)
    }

    /// Copy of `table` with the feature columns of `text_column` appended
    pub fn transform_table(&self, table: &Table, text_column: &str) -> Result<Table> {
        let corpus = table_corpus(table, text_column)?;
        let features = self.project(&corpus)?;
        append_features(table, &self.output_prefix, &features)
    }

    fn project(&self, corpus: &[String]) -> Result<Array2<f32>> {
        self.validate()?;
        let weighted = self.vectorizer.transform(corpus);
        let coords = self.reducer.transform(&weighted)?;
        Ok(coords.mapv(|v| v as f32))
    }
}

/// Name of the `index`-th feature column
#[inline]
pub fn output_column_name(prefix: &str, index: usize) -> String {
    format!("{prefix}_{index:03}")
}

/// Fit TF-IDF + truncated SVD on `text_column` and append the reduced
/// features to a copy of `table`.
///
/// # Arguments
/// * `table` - input records, left untouched
/// * `text_column` - free-text notes column
/// * `config` - vocabulary and reduction parameters
///
/// # Returns
/// * the augmented table (same rows, same order, k extra `f32` columns)
/// * the fitted pipeline
///
/// # Errors
/// `MissingColumn` if `text_column` is absent, `Dimensionality` when the
/// retained vocabulary is smaller than `n_components`.
pub fn build_features(
    table: &Table,
    text_column: &str,
    config: &FeatureConfig,
) -> Result<(Table, FittedPipeline)> {
    build_features_with::<DefaultTFIDFEngine>(table, text_column, config)
}

/// [`build_features`] with an explicit weighting engine
pub fn build_features_with<E>(
    table: &Table,
    text_column: &str,
    config: &FeatureConfig,
) -> Result<(Table, FittedPipeline<E>)>
where
    E: TFIDFEngine,
{
    let corpus = table_corpus(table, text_column)?;

    let (vectorizer, weighted) = TfidfVectorizer::<E>::fit_transform(&corpus, &config.vectorizer_config())?;
    let (reducer, coords) = TruncatedSvd::fit_transform(&weighted, &config.svd_config())?;
    debug!(
        "note features: {} rows, {} terms, {} components on {:?}",
        corpus.len(),
        vectorizer.vocab_size(),
        reducer.n_components(),
        text_column
    );

    let features = coords.mapv(|v| v as f32);
    let augmented = append_features(table, &config.output_prefix, &features)?;
    let pipeline = FittedPipeline {
        vectorizer,
        reducer,
        output_prefix: config.output_prefix.clone(),
    };
    Ok((augmented, pipeline))
}

fn table_corpus(table: &Table, text_column: &str) -> Result<Vec<String>> {
    Ok(table.column(text_column)?.iter().map(clean_value).collect())
}

fn append_features(table: &Table, prefix: &str, features: &Array2<f32>) -> Result<Table> {
    let mut out = table.clone();
    for (i, col) in features.columns().into_iter().enumerate() {
        let cells = col.iter().map(|&v| Value::Float32(v)).collect();
        out.push_column(output_column_name(prefix, i), cells)?;
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::explain::explain_components;

    fn notes(texts: &[&str]) -> Table {
        Table::from_columns(vec![
            ("id", (0..texts.len()).map(Value::from).collect()),
            ("notes", texts.iter().map(|&t| Value::from(t)).collect()),
        ])
        .unwrap()
    }

    fn small_config(k: usize) -> FeatureConfig {
        FeatureConfig {
            n_components: k,
            min_doc_freq: 1,
            max_doc_freq_ratio: 1.0,
            ..FeatureConfig::default()
        }
    }

    #[test]
    fn column_names_are_zero_padded() {
        assert_eq!(output_column_name("note_svd", 0), "note_svd_000");
        assert_eq!(output_column_name("x", 42), "x_042");
        assert_eq!(output_column_name("x", 1234), "x_1234");
    }

    #[test]
    fn appends_k_float_columns_after_input() {
        let table = notes(&["red itchy rash", "dark irregular mole", "red mole", "itchy scalp"]);
        let (out, pipeline) = build_features(&table, "notes", &small_config(2)).unwrap();
        let names: Vec<&str> = out.column_names().collect();
        assert_eq!(names, vec!["id", "notes", "note_svd_000", "note_svd_001"]);
        assert_eq!(pipeline.output_columns(), vec!["note_svd_000", "note_svd_001"]);
        assert!(out
            .column("note_svd_001")
            .unwrap()
            .iter()
            .all(|v| matches!(v, Value::Float32(_))));
        assert_eq!(out.column("id").unwrap(), table.column("id").unwrap());
    }

    #[test]
    fn null_notes_become_empty_documents() {
        let table = Table::from_columns(vec![(
            "notes",
            vec![Value::from("scaly patch"), Value::Null, Value::Float(f64::NAN), Value::from("scaly patch")],
        )])
        .unwrap();
        let (out, _) = build_features(&table, "notes", &small_config(1)).unwrap();
        let col = out.column("note_svd_000").unwrap();
        assert_eq!(col[1], Value::Float32(0.0));
        assert_eq!(col[2], Value::Float32(0.0));
        assert_eq!(col[0], col[3]);
    }

    #[test]
    fn validate_rejects_mismatched_shapes() {
        let table = notes(&["red rash", "red mole", "blue mole"]);
        let (_, mut pipeline) = build_features(&table, "notes", &small_config(2)).unwrap();
        assert!(pipeline.validate().is_ok());
        pipeline.reducer = {
            let other = notes(&["aa bb", "cc dd"]);
            build_features(&other, "notes", &small_config(2)).unwrap().1.reducer
        };
        assert!(matches!(pipeline.validate(), Err(FeatureError::MalformedPipeline(_))));
        assert!(pipeline.transform(&["red"]).is_err());
        assert!(matches!(
            explain_components(&pipeline, 3, None),
            Err(FeatureError::MalformedPipeline(_))
        ));
    }
}
