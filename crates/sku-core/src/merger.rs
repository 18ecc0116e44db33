//! Merge engine: N-way full outer join on the key column

use crate::error::LoadError;
use crate::table::{CellValue, Column, JoinKey, Row, Table};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};
use tracing::debug;

/// The combined table produced by a merge
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MergedTable {
    /// Join key column name (appears exactly once in `columns`)
    pub key_column: String,
    /// Column definitions: key first, then each source's prefixed columns
    pub columns: Vec<Column>,
    /// Joined rows
    pub rows: Vec<Row>,
    /// Sources that contributed to this table, in merge order
    pub sources: Vec<String>,
}

impl MergedTable {
    /// A merged table with no columns, rows or sources
    pub fn empty(key_column: impl Into<String>) -> Self {
        Self {
            key_column: key_column.into(),
            columns: Vec::new(),
            rows: Vec::new(),
            sources: Vec::new(),
        }
    }

    /// Get the number of columns
    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    /// Get the number of rows
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// Find a column by name
    pub fn find_column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    /// Column names in order
    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }

    /// All rows whose key equals `key`
    pub fn find_rows(&self, key: &CellValue) -> Vec<&Row> {
        let (Some(column), Some(wanted)) = (self.find_column(&self.key_column), key.join_key())
        else {
            return Vec::new();
        };
        self.rows
            .iter()
            .filter(|r| r.cells[column.index].join_key().as_ref() == Some(&wanted))
            .collect()
    }

    /// Distinct non-missing key values present in the table
    pub fn key_values(&self) -> BTreeSet<JoinKey> {
        match self.find_column(&self.key_column) {
            Some(column) => self
                .rows
                .iter()
                .filter_map(|r| r.cells[column.index].join_key())
                .collect(),
            None => BTreeSet::new(),
        }
    }
}

/// Merge tables in order with repeated full outer joins on `key_column`
///
/// Every table must contain the key column. The result starts from a table
/// holding only the key column, so the key always comes first and every
/// input contributes its non-key columns in order.
pub fn merge_tables(tables: &[Table], key_column: &str) -> Result<MergedTable, LoadError> {
    if tables.is_empty() {
        return Ok(MergedTable::empty(key_column));
    }

    let seed = Table::from_parts("merged", vec![key_column.to_string()], Vec::new());
    let joined = tables.iter().try_fold(seed, |acc, table| {
        let next = outer_join(&acc, table, key_column)?;
        debug!(
            source = %table.source,
            rows = next.row_count(),
            columns = next.column_count(),
            "joined source"
        );
        Ok::<Table, LoadError>(next)
    })?;

    Ok(MergedTable {
        key_column: key_column.to_string(),
        columns: joined.columns,
        rows: joined.rows,
        sources: tables.iter().map(|t| t.source.clone()).collect(),
    })
}

/// Full outer join of two tables on `key_column`
///
/// Output rows follow `left`'s order, each expanded by its matches in
/// `right` (in `right`'s order), followed by the `right` rows that matched
/// nothing. Duplicate keys produce the cross-product of their matches;
/// missing keys never match. Columns are all of `left`'s followed by
/// `right`'s non-key columns.
pub fn outer_join(left: &Table, right: &Table, key_column: &str) -> Result<Table, LoadError> {
    let missing_key = || LoadError::MissingKeyColumn(key_column.to_string());
    let left_key = left.find_column(key_column).ok_or_else(missing_key)?.index;
    let right_key = right.find_column(key_column).ok_or_else(missing_key)?.index;

    let right_cols: Vec<usize> = (0..right.column_count())
        .filter(|&i| i != right_key)
        .collect();

    let mut right_by_key: HashMap<JoinKey, Vec<usize>> = HashMap::new();
    for (i, row) in right.rows.iter().enumerate() {
        if let Some(key) = row.cells[right_key].join_key() {
            right_by_key.entry(key).or_default().push(i);
        }
    }

    let mut matched = vec![false; right.row_count()];
    let mut rows: Vec<Row> = Vec::with_capacity(left.row_count().max(right.row_count()));

    for left_row in &left.rows {
        let matches = left_row.cells[left_key]
            .join_key()
            .and_then(|key| right_by_key.get(&key));

        match matches {
            Some(indices) => {
                for &i in indices {
                    matched[i] = true;
                    let mut cells = left_row.cells.clone();
                    cells.extend(right_cols.iter().map(|&c| right.rows[i].cells[c].clone()));
                    rows.push(Row::new(cells));
                }
            }
            None => {
                let mut cells = left_row.cells.clone();
                cells.extend(right_cols.iter().map(|_| CellValue::Missing));
                rows.push(Row::new(cells));
            }
        }
    }

    for (right_row, _) in right.rows.iter().zip(&matched).filter(|(_, m)| !**m) {
        let mut cells = vec![CellValue::Missing; left.column_count()];
        cells[left_key] = right_row.cells[right_key].clone();
        cells.extend(right_cols.iter().map(|&c| right_row.cells[c].clone()));
        rows.push(Row::new(cells));
    }

    let names = left
        .columns
        .iter()
        .map(|c| c.name.clone())
        .chain(right_cols.iter().map(|&c| right.columns[c].name.clone()));

    Ok(Table {
        columns: Column::from_names(names),
        rows,
        source: left.source.clone(),
        disambiguated_by: None,
    })
}
