/// This crate turns free-text clinical notes into a few dense numeric
/// features (TF-IDF + randomized truncated SVD) and prepares the lesion
/// metadata they belong to.
pub mod error;
pub mod explain;
pub mod metadata;
pub mod pipeline;
pub mod reduction;
pub mod table;
pub mod utils;
pub mod vectorizer;

/// Feature Builder
/// Fits the vectorizer and the reducer on one text column of a `Table`
/// and returns the table with `k` extra `f32` columns
/// (`{prefix}_000` .. `{prefix}_{k-1}`) plus the fitted pipeline.
///
/// The input table is never modified; rows keep their count and order.
/// `build_features_with::<E>` picks the TF weighting engine.
pub use pipeline::{build_features, build_features_with, FeatureConfig};

/// Fitted Pipeline
/// The immutable result of `build_features`. It holds:
/// - The vocabulary (sorted, one dimension per term)
/// - The IDF weight of every term
/// - The `k × |vocabulary|` projection directions
///
/// It can embed new notes (`transform`, `transform_table`) and is consumed
/// by the component explainer.
///
/// # Serialization
/// Supported through serde. The weighting engine is a type parameter and is
/// not written out; deserialize into the same `FittedPipeline<E>`.
pub use pipeline::FittedPipeline;

/// Component Explainer
/// Lists, for each reduced dimension, the terms with the most positive and
/// the most negative weights. Available as typed rows or as a tidy `Table`.
pub use explain::{explain_components, phrases_to_table, ComponentPhrase, Direction};

/// Record Table
/// Ordered, equally long, dynamically typed columns.
/// Every transforming method returns a new table.
pub use table::{Table, Value};

/// TF IDF Calculation Engine Trait
/// Defines how a term count and a document frequency become a weight.
///
/// - `DefaultTFIDFEngine`: raw counts, smoothed IDF
/// - `SublinearTFIDFEngine`: `1 + ln(count)`, smoothed IDF
pub use vectorizer::tfidf::{DefaultTFIDFEngine, SublinearTFIDFEngine, TFIDFEngine};

/// Error type shared by every fallible operation of this crate
pub use error::{FeatureError, Result};
