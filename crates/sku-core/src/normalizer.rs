//! Size limits and key-column validation for loaded tables

use crate::error::LoadError;
use crate::table::{Column, Row, Table};
use tracing::debug;

/// A table that passed validation, possibly truncated
#[derive(Debug, Clone, PartialEq)]
pub struct Normalized {
    /// The table after limits were applied
    pub table: Table,
    /// Whether any rows or columns were dropped
    pub limits_applied: bool,
}

/// Validate the key column and apply row/column caps
///
/// The key column is looked up among the original columns before anything
/// is dropped. Truncation keeps the first `max_rows` rows and the first
/// `max_cols` columns; when the key column sits beyond the cap it replaces
/// the last kept column, so the result never exceeds `max_cols` columns and
/// always contains the key.
pub fn normalize(
    mut table: Table,
    key_column: &str,
    max_rows: usize,
    max_cols: usize,
) -> Result<Normalized, LoadError> {
    let key_index = table
        .find_column(key_column)
        .map(|c| c.index)
        .ok_or_else(|| LoadError::MissingKeyColumn(key_column.to_string()))?;

    let max_rows = max_rows.max(1);
    let max_cols = max_cols.max(1);

    let rows_dropped = table.rows.len() > max_rows;
    table.rows.truncate(max_rows);

    let cols_dropped = table.columns.len() > max_cols;
    if cols_dropped {
        let keep: Vec<usize> = if key_index < max_cols {
            (0..max_cols).collect()
        } else {
            (0..max_cols - 1).chain(std::iter::once(key_index)).collect()
        };
        table = project(&table, &keep);
    }

    let limits_applied = rows_dropped || cols_dropped;
    if limits_applied {
        debug!(
            source = %table.source,
            rows = table.row_count(),
            columns = table.column_count(),
            "limits applied"
        );
    }

    Ok(Normalized {
        table,
        limits_applied,
    })
}

/// Keep only the columns at `indices`, in that order
fn project(table: &Table, indices: &[usize]) -> Table {
    let columns = Column::from_names(indices.iter().map(|&i| table.columns[i].name.clone()));
    let rows = table
        .rows
        .iter()
        .map(|row| Row::new(indices.iter().map(|&i| row.cells[i].clone()).collect()))
        .collect();

    Table {
        columns,
        rows,
        source: table.source.clone(),
        disambiguated_by: table.disambiguated_by.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loader::parse_csv_str;
    use crate::table::CellValue;

    #[test]
    fn test_within_limits_untouched() {
        let table = parse_csv_str("Product Code,Price\n1,10\n2,20\n", "x.csv").unwrap();
        let normalized = normalize(table.clone(), "Product Code", 10, 10).unwrap();

        assert!(!normalized.limits_applied);
        assert_eq!(normalized.table, table);
    }

    #[test]
    fn test_missing_key_column() {
        let table = parse_csv_str("SKU,Price\n1,10\n", "x.csv").unwrap();
        let err = normalize(table, "Product Code", 10, 10).unwrap_err();
        assert_eq!(err, LoadError::MissingKeyColumn("Product Code".to_string()));
    }

    #[test]
    fn test_row_cap_keeps_first_rows() {
        let table = parse_csv_str("Product Code,Price\n1,10\n2,20\n3,30\n", "x.csv").unwrap();
        let normalized = normalize(table, "Product Code", 2, 10).unwrap();

        assert!(normalized.limits_applied);
        assert_eq!(normalized.table.row_count(), 2);
        assert_eq!(normalized.table.rows[1].cells[0], CellValue::Integer(2));
    }

    #[test]
    fn test_column_cap_keeps_first_columns() {
        let table = parse_csv_str("Product Code,A,B,C\n1,a,b,c\n", "x.csv").unwrap();
        let normalized = normalize(table, "Product Code", 10, 2).unwrap();

        assert!(normalized.limits_applied);
        assert_eq!(normalized.table.column_names(), vec!["Product Code", "A"]);
        assert_eq!(normalized.table.columns[1].index, 1);
    }

    #[test]
    fn test_column_cap_never_drops_key() {
        let table = parse_csv_str("A,B,C,Product Code\na,b,c,7\n", "x.csv").unwrap();
        let normalized = normalize(table, "Product Code", 10, 2).unwrap();

        assert_eq!(normalized.table.column_names(), vec!["A", "Product Code"]);
        assert_eq!(
            normalized.table.rows[0].cells,
            vec![CellValue::String("a".to_string()), CellValue::Integer(7)]
        );
    }

    #[test]
    fn test_column_cap_of_one_keeps_only_key() {
        let table = parse_csv_str("A,Product Code\na,7\n", "x.csv").unwrap();
        let normalized = normalize(table, "Product Code", 10, 1).unwrap();

        assert_eq!(normalized.table.column_names(), vec!["Product Code"]);
    }

    #[test]
    fn test_key_checked_before_truncation() {
        // Key is beyond the cap but present in the original columns
        let table = parse_csv_str("A,B,Product Code\n1,2,3\n", "x.csv").unwrap();
        assert!(normalize(table, "Product Code", 1, 1).is_ok());
    }
}
