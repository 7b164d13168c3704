use std::{
    cmp::Ordering,
    collections::{BTreeMap, HashMap, HashSet},
    fmt,
};

use indexmap::IndexMap;
use log::info;
use serde::{Deserialize, Serialize};

use crate::{error::Result, table::Table};

/// Rows falling into one split
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SplitCount {
    pub split: String,
    pub count: usize,
    /// share of all rows with a split
    pub proportion: f64,
}

/// Rows of one target value within one split
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TargetShare {
    pub split: String,
    pub target: String,
    pub count: usize,
    /// share of the split's rows with a target
    pub proportion: f64,
}

/// Split sizes and class balance of one distribution
///
/// Missing split or target cells are left out of the counts.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct SplitReport {
    /// descending count, ties by split name
    pub splits: Vec<SplitCount>,
    /// grouped by split name, then descending count within the split
    pub targets: Vec<TargetShare>,
}

/// Count rows per split and target values per split
pub fn split_report(table: &Table, split_column: &str, target_column: &str) -> Result<SplitReport> {
    let splits = table.column(split_column)?;
    let targets = table.column(target_column)?;

    let mut split_counts: IndexMap<String, usize> = IndexMap::new();
    let mut target_counts: IndexMap<String, IndexMap<String, usize>> = IndexMap::new();
    for (split, target) in splits.iter().zip(targets) {
        let Some(split) = split.to_text() else {
            continue;
        };
        *split_counts.entry(split.clone()).or_insert(0) += 1;
        if let Some(target) = target.to_text() {
            *target_counts.entry(split).or_default().entry(target).or_insert(0) += 1;
        }
    }

    let total: usize = split_counts.values().sum();
    let mut split_rows: Vec<SplitCount> = split_counts
        .into_iter()
        .map(|(split, count)| SplitCount {
            proportion: count as f64 / total as f64,
            split,
            count,
        })
        .collect();
    split_rows.sort_by(|a, b| by_count_then_name(a.count, &a.split, b.count, &b.split));

    target_counts.sort_keys();
    let mut target_rows = Vec::new();
    for (split, counts) in target_counts {
        let within: usize = counts.values().sum();
        let mut rows: Vec<TargetShare> = counts
            .into_iter()
            .map(|(target, count)| TargetShare {
                split: split.clone(),
                proportion: count as f64 / within as f64,
                target,
                count,
            })
            .collect();
        rows.sort_by(|a, b| by_count_then_name(a.count, &a.target, b.count, &b.target));
        target_rows.extend(rows);
    }

    Ok(SplitReport {
        splits: split_rows,
        targets: target_rows,
    })
}

fn by_count_then_name(a_count: usize, a_name: &str, b_count: usize, b_name: &str) -> Ordering {
    b_count.cmp(&a_count).then_with(|| a_name.cmp(b_name))
}

/// Report every named distribution and log it at info level
///
/// # Arguments
/// * `distributions` - `(name, table)` pairs, reported in the given order
/// * `split_column` - e.g. `"split"`
/// * `target_column` - e.g. `"midas_path_binary"`
pub fn check_split_ratios<'a, I>(
    distributions: I,
    split_column: &str,
    target_column: &str,
) -> Result<IndexMap<String, SplitReport>>
where
    I: IntoIterator<Item = (&'a str, &'a Table)>,
{
    let mut reports = IndexMap::new();
    for (name, table) in distributions {
        let report = split_report(table, split_column, target_column)?;
        info!("\n{}\n{}", name, report);
        reports.insert(name.to_string(), report);
    }
    Ok(reports)
}

impl fmt::Display for SplitReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let width = self
            .splits
            .iter()
            .map(|s| s.split.len())
            .chain(self.targets.iter().map(|t| t.split.len()))
            .max()
            .unwrap_or(0);
        let target_width = self.targets.iter().map(|t| t.target.len()).max().unwrap_or(0);

        writeln!(f, "Split raw counts:")?;
        for s in &self.splits {
            writeln!(f, "{:<width$}  {}", s.split, s.count)?;
        }
        writeln!(f, "\nSplit proportions:")?;
        for s in &self.splits {
            writeln!(f, "{:<width$}  {:.6}", s.split, s.proportion)?;
        }
        writeln!(f, "\nTarget proportions by split:")?;
        for t in &self.targets {
            writeln!(f, "{:<width$}  {:<target_width$}  {:.6}", t.split, t.target, t.proportion)?;
        }
        Ok(())
    }
}

/// Split folders expected under every image distribution
pub const IMAGE_SPLITS: [&str; 3] = ["train", "val", "test"];
/// Class folders expected under every split folder
pub const IMAGE_LABELS: [&str; 2] = ["benign", "malignant"];

/// Files in one `split/label` image folder
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FolderCount {
    pub split: String,
    pub label: String,
    /// `None` when the folder does not exist
    pub files: Option<usize>,
}

/// Image folder layout of one distribution
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FolderCounts {
    pub distribution: String,
    /// every split × label pair, in `IMAGE_SPLITS` × `IMAGE_LABELS` order
    pub folders: Vec<FolderCount>,
}

impl FolderCounts {
    /// Folders that were not found
    pub fn missing(&self) -> impl Iterator<Item = &FolderCount> {
        self.folders.iter().filter(|c| c.files.is_none())
    }

    /// Files across all existing folders
    pub fn total(&self) -> usize {
        self.folders.iter().filter_map(|c| c.files).sum()
    }
}

/// Count image files per split and class folder of each distribution,
/// logging each distribution at info level
///
/// # Arguments
/// * `entries` - `(distribution, split, label, file)` listing of an image
///   tree; a `None` file marks a folder that exists without contributing a
///   file (an empty folder)
///
/// # Returns
/// * one `FolderCounts` per distribution, by distribution name
///
/// Repeated file names in a folder count once. Folders outside
/// `IMAGE_SPLITS` × `IMAGE_LABELS` only make their distribution visible.
pub fn count_files_in_image_folders<'a, I>(entries: I) -> IndexMap<String, FolderCounts>
where
    I: IntoIterator<Item = (&'a str, &'a str, &'a str, Option<&'a str>)>,
{
    let mut tree: BTreeMap<&str, HashMap<(&str, &str), HashSet<&str>>> = BTreeMap::new();
    for (distribution, split, label, file) in entries {
        let folder = tree.entry(distribution).or_default().entry((split, label)).or_default();
        if let Some(file) = file {
            folder.insert(file);
        }
    }

    tree.into_iter()
        .map(|(distribution, folders)| {
            let folders = IMAGE_SPLITS
                .iter()
                .flat_map(|&split| IMAGE_LABELS.iter().map(move |&label| (split, label)))
                .map(|(split, label)| FolderCount {
                    split: split.to_string(),
                    label: label.to_string(),
                    files: folders.get(&(split, label)).map(HashSet::len),
                })
                .collect();
            let counts = FolderCounts {
                distribution: distribution.to_string(),
                folders,
            };
            info!("\n{}", counts);
            (distribution.to_string(), counts)
        })
        .collect()
}

impl fmt::Display for FolderCounts {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "=== {} ===", self.distribution)?;
        for c in &self.folders {
            match c.files {
                Some(n) => writeln!(f, "{:<5} / {:<9}: {}", c.split, c.label, n)?,
                None => writeln!(f, "{}/{}: MISSING FOLDER", c.split, c.label)?,
            }
        }
        Ok(())
    }
}
