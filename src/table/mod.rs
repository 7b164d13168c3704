pub mod value;

use std::collections::HashSet;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::error::{FeatureError, Result};

pub use value::Value;

/// Sort direction for [`Table::sort_by`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortOrder {
    Ascending,
    Descending,
}

/// Which row survives when [`Table::drop_duplicates`] finds equal keys
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Keep {
    First,
    Last,
}

/// In-memory record table
///
/// Columns are kept in insertion order and all share the same length.
/// Every transforming method returns a new table; the receiver is never
/// modified except through the explicit builder methods
/// (`push_column`, `insert_column`).
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Table {
    columns: IndexMap<String, Vec<Value>>,
    n_rows: usize,
}

impl Table {
    /// Create an empty table
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a table from `(name, cells)` pairs
    /// All columns must have the same length.
    pub fn from_columns<I, S>(columns: I) -> Result<Self>
    where
        I: IntoIterator<Item = (S, Vec<Value>)>,
        S: Into<String>,
    {
        let mut table = Table::new();
        for (name, values) in columns {
            table.push_column(name, values)?;
        }
        Ok(table)
    }

    /// Assemble columns already known to share `n_rows`
    pub(crate) fn from_parts(columns: IndexMap<String, Vec<Value>>, n_rows: usize) -> Self {
        debug_assert!(columns.values().all(|c| c.len() == n_rows));
        Self { columns, n_rows }
    }

    #[inline]
    pub fn n_rows(&self) -> usize {
        self.n_rows
    }

    #[inline]
    pub fn n_cols(&self) -> usize {
        self.columns.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.n_rows == 0
    }

    pub fn column_names(&self) -> impl Iterator<Item = &str> {
        self.columns.keys().map(String::as_str)
    }

    #[inline]
    pub fn contains_column(&self, name: &str) -> bool {
        self.columns.contains_key(name)
    }

    /// Get the cells of a column
    pub fn column(&self, name: &str) -> Result<&[Value]> {
        self.columns
            .get(name)
            .map(Vec::as_slice)
            .ok_or_else(|| FeatureError::MissingColumn(name.to_string()))
    }

    /// Get one cell
    pub fn get(&self, row: usize, name: &str) -> Option<&Value> {
        self.columns.get(name).and_then(|col| col.get(row))
    }

    /// Append a column, or replace an existing one in place
    pub fn push_column<S>(&mut self, name: S, values: Vec<Value>) -> Result<()>
    where
        S: Into<String>,
    {
        let name = name.into();
        self.check_len(&name, values.len())?;
        self.n_rows = values.len();
        self.columns.insert(name, values);
        Ok(())
    }

    /// Insert a column at `index` (clamped to the column count)
    pub fn insert_column<S>(&mut self, index: usize, name: S, values: Vec<Value>) -> Result<()>
    where
        S: Into<String>,
    {
        let name = name.into();
        self.check_len(&name, values.len())?;
        self.n_rows = values.len();
        let index = index.min(self.columns.len());
        self.columns.shift_insert(index, name, values);
        Ok(())
    }

    /// Copy of the table with one column added or replaced
    pub fn with_column<S>(&self, name: S, values: Vec<Value>) -> Result<Table>
    where
        S: Into<String>,
    {
        let mut out = self.clone();
        out.push_column(name, values)?;
        Ok(out)
    }

    fn check_len(&self, name: &str, len: usize) -> Result<()> {
        // 空テーブル or 唯一の列を置き換える場合は長さ制約なし
        let replacing_only = self.columns.len() == 1 && self.columns.contains_key(name);
        if self.columns.is_empty() || replacing_only || len == self.n_rows {
            Ok(())
        } else {
            Err(FeatureError::LengthMismatch {
                name: name.to_string(),
                expected: self.n_rows,
                actual: len,
            })
        }
    }

    /// Projection onto the named columns, in the given order
    pub fn select_columns(&self, names: &[&str]) -> Result<Table> {
        let mut columns = IndexMap::with_capacity(names.len());
        for name in names {
            let col = self.column(name)?;
            columns.insert(name.to_string(), col.to_vec());
        }
        let n_rows = if columns.is_empty() { 0 } else { self.n_rows };
        Ok(Table { columns, n_rows })
    }

    /// Rows at the given positions, in the given order
    pub fn take_rows(&self, indices: &[usize]) -> Table {
        let columns = self
            .columns
            .iter()
            .map(|(name, col)| {
                let cells = indices.iter().map(|&i| col[i].clone()).collect();
                (name.clone(), cells)
            })
            .collect();
        Table {
            columns,
            n_rows: indices.len(),
        }
    }

    /// Stable multi-key sort
    pub fn sort_by(&self, keys: &[(&str, SortOrder)]) -> Result<Table> {
        let key_cols = keys
            .iter()
            .map(|(name, order)| self.column(name).map(|col| (col, *order)))
            .collect::<Result<Vec<_>>>()?;

        let mut order: Vec<usize> = (0..self.n_rows).collect();
        order.sort_by(|&a, &b| {
            key_cols
                .iter()
                .map(|(col, dir)| {
                    let (x, y) = (&col[a], &col[b]);
                    match (x.is_null(), y.is_null(), dir) {
                        // 欠損値は昇順・降順どちらでも末尾
                        (false, false, SortOrder::Descending) => y.sort_cmp(x),
                        _ => x.sort_cmp(y),
                    }
                })
                .find(|o| o.is_ne())
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        Ok(self.take_rows(&order))
    }

    /// Drop rows whose `subset` columns (all columns when `None`) repeat
    pub fn drop_duplicates(&self, subset: Option<&[&str]>, keep: Keep) -> Result<Table> {
        let names: Vec<&str> = match subset {
            Some(names) => names.to_vec(),
            None => self.column_names().collect(),
        };
        let key_cols = names
            .iter()
            .map(|name| self.column(name))
            .collect::<Result<Vec<_>>>()?;

        let row_key = |i: usize| key_cols.iter().map(|col| col[i].key()).collect::<Vec<_>>();

        let mut seen = HashSet::with_capacity(self.n_rows);
        let mut kept: Vec<usize> = match keep {
            Keep::First => (0..self.n_rows).filter(|&i| seen.insert(row_key(i))).collect(),
            Keep::Last => (0..self.n_rows).rev().filter(|&i| seen.insert(row_key(i))).collect(),
        };
        kept.sort_unstable();
        Ok(self.take_rows(&kept))
    }
}
