//! Lesion record preparation: target labels, lesion keys, deduplication
//! and image cross-referencing.

pub mod report;

use std::{collections::HashSet, fmt};

use log::info;
use serde::{Deserialize, Serialize};

use crate::{
    error::Result,
    table::{Keep, SortOrder, Table, Value},
};

/// Column names used by the metadata functions
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetadataColumns {
    /// "yes" for control images
    pub is_control: String,
    /// pathology text, the target source
    pub path: String,
    /// replaces `path` on control rows
    pub clinical_impression: String,
    /// derived benign / malignant / missing label
    pub target: String,
    pub record_id: String,
    pub location: String,
    pub length: String,
    pub width: String,
    pub lesion_key: String,
    pub row_id: String,
    /// columns kept by [`dedupe_metadata`], in output order
    pub lesion_columns: Vec<String>,
}

impl Default for MetadataColumns {
    fn default() -> Self {
        Self {
            is_control: "midas_iscontrol".into(),
            path: "midas_path".into(),
            clinical_impression: "clinical_impression_1".into(),
            target: "midas_path_binary".into(),
            record_id: "midas_record_id".into(),
            location: "midas_location".into(),
            length: "length_(mm)".into(),
            width: "width_(mm)".into(),
            lesion_key: "lesion_key".into(),
            row_id: "row_id".into(),
            lesion_columns: [
                "midas_path_binary",
                "midas_record_id",
                "midas_location",
                "midas_age",
                "midas_fitzpatrick",
                "midas_ethnicity",
                "midas_race",
                "length_(mm)",
                "width_(mm)",
            ]
            .into_iter()
            .map(String::from)
            .collect(),
        }
    }
}

/// Binary target derived from pathology text
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TargetLabel {
    Benign,
    Malignant,
    Missing,
}

impl TargetLabel {
    pub fn as_str(&self) -> &'static str {
        match self {
            TargetLabel::Benign => "benign",
            TargetLabel::Malignant => "malignant",
            TargetLabel::Missing => "missing",
        }
    }
}

impl fmt::Display for TargetLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Label a pathology description
///
/// `"missing"` stays missing. A `-`-separated part reading `benign`, or any
/// mention of `non-neoplastic`, is benign. Everything else is treated as
/// malignant.
pub fn label_benign(text: &str) -> TargetLabel {
    if text == "missing" {
        return TargetLabel::Missing;
    }
    if text.split('-').any(|part| part.trim().to_lowercase() == "benign") {
        return TargetLabel::Benign;
    }
    if text.to_lowercase().contains("non-neoplastic") {
        return TargetLabel::Benign;
    }
    TargetLabel::Malignant
}

/// Fill the pathology column and derive the target column
///
/// Control rows take their clinical impression as pathology; missing
/// pathology becomes `"missing"`. The target column is added (or
/// replaced) at the end.
pub fn process_target(table: &Table, cols: &MetadataColumns) -> Result<Table> {
    let is_control = table.column(&cols.is_control)?;
    let impression = table.column(&cols.clinical_impression)?;
    let path = table.column(&cols.path)?;

    let filled: Vec<String> = path
        .iter()
        .zip(is_control)
        .zip(impression)
        .map(|((p, control), imp)| {
            let source = if control.as_str() == Some("yes") { imp } else { p };
            source.to_text().unwrap_or_else(|| "missing".to_string())
        })
        .collect();
    let labels = filled
        .iter()
        .map(|p| Value::from(label_benign(p).as_str()))
        .collect();

    let mut out = table.with_column(cols.path.as_str(), filled.into_iter().map(Value::from).collect())?;
    out.push_column(cols.target.as_str(), labels)?;
    Ok(out)
}

/// Add `{record}_{location}_{length}x{width}`; missing parts read `nan`
pub fn create_lesion_key(table: &Table, cols: &MetadataColumns) -> Result<Table> {
    let parts = [&cols.record_id, &cols.location, &cols.length, &cols.width]
        .into_iter()
        .map(|name| table.column(name))
        .collect::<Result<Vec<_>>>()?;

    let render = |v: &Value| v.to_text().unwrap_or_else(|| "nan".to_string());
    let keys = (0..table.n_rows())
        .map(|i| {
            Value::from(format!(
                "{}_{}_{}x{}",
                render(&parts[0][i]),
                render(&parts[1][i]),
                render(&parts[2][i]),
                render(&parts[3][i])
            ))
        })
        .collect();
    table.with_column(cols.lesion_key.as_str(), keys)
}

/// Record id ascending, location ascending, control flag descending
/// (`yes` before `no`). Stable, missing values last.
pub fn sort_metadata(table: &Table, cols: &MetadataColumns) -> Result<Table> {
    table.sort_by(&[
        (cols.record_id.as_str(), SortOrder::Ascending),
        (cols.location.as_str(), SortOrder::Ascending),
        (cols.is_control.as_str(), SortOrder::Descending),
    ])
}

/// One row per physical lesion
///
/// Several images of the same lesion share all lesion columns; those exact
/// duplicates collapse to one row. Rows that still share a lesion key
/// differ only through data-entry inconsistencies; the last one after
/// sorting (the non-control) is kept. A `row_id` column `0..n` is
/// prepended.
pub fn dedupe_metadata(table: &Table, cols: &MetadataColumns) -> Result<Table> {
    let lesion_columns: Vec<&str> = cols.lesion_columns.iter().map(String::as_str).collect();

    let sorted = sort_metadata(table, cols)?;
    let lesions = sorted
        .select_columns(&lesion_columns)?
        .drop_duplicates(None, Keep::First)?;
    let keyed = create_lesion_key(&lesions, cols)?;
    let mut deduped = keyed.drop_duplicates(Some(&[cols.lesion_key.as_str()]), Keep::Last)?;

    let unique = deduped.drop_duplicates(Some(&[cols.lesion_key.as_str()]), Keep::First)?.n_rows()
        == deduped.n_rows();
    info!(
        "deduplicated {} records into {} lesions (keys unique: {})",
        table.n_rows(),
        deduped.n_rows(),
        unique
    );

    let row_ids = (0..deduped.n_rows()).map(Value::from).collect();
    deduped.insert_column(0, cols.row_id.as_str(), row_ids)?;
    Ok(deduped)
}

/// Add a boolean `flag_column`: true when the row's file name is missing or
/// not among `available`.
pub fn flag_missing_images(
    table: &Table,
    file_column: &str,
    available: &HashSet<String>,
    flag_column: &str,
) -> Result<Table> {
    let flags: Vec<Value> = table
        .column(file_column)?
        .iter()
        .map(|v| match v.to_text() {
            Some(name) => Value::Bool(!available.contains(&name)),
            None => Value::Bool(true),
        })
        .collect();
    let missing = flags.iter().filter(|f| f.as_bool() == Some(true)).count();
    if missing > 0 {
        info!("{} of {} records have no image file", missing, table.n_rows());
    }
    table.with_column(flag_column, flags)
}
