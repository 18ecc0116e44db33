//! Core table types for representing loaded SKU sources

use serde::{Deserialize, Serialize};

/// A table loaded from a single source
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Table {
    /// Column definitions
    pub columns: Vec<Column>,
    /// Row data, each row aligned positionally to `columns`
    pub rows: Vec<Row>,
    /// Identifier of the source this table came from (usually a file name)
    pub source: String,
    /// Source identifier the non-key columns were last prefixed with
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub disambiguated_by: Option<String>,
}

impl Table {
    /// Create a new empty table
    pub fn new(source: impl Into<String>) -> Self {
        Self {
            columns: Vec::new(),
            rows: Vec::new(),
            source: source.into(),
            disambiguated_by: None,
        }
    }

    /// Build a table from column names and rows of cells
    pub fn from_parts(
        source: impl Into<String>,
        column_names: Vec<String>,
        rows: Vec<Vec<CellValue>>,
    ) -> Self {
        Self {
            columns: Column::from_names(column_names),
            rows: rows.into_iter().map(Row::new).collect(),
            source: source.into(),
            disambiguated_by: None,
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

    /// A copy of this table holding only the first `n` rows
    pub fn head(&self, n: usize) -> Table {
        Table {
            columns: self.columns.clone(),
            rows: self.rows.iter().take(n).cloned().collect(),
            source: self.source.clone(),
            disambiguated_by: self.disambiguated_by.clone(),
        }
    }
}

/// A column definition
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Column {
    /// Column name
    pub name: String,
    /// Column index (0-based)
    pub index: usize,
}

impl Column {
    /// Create a new column
    pub fn new(name: String, index: usize) -> Self {
        Self { name, index }
    }

    /// Build an indexed column list from names
    pub fn from_names<I: IntoIterator<Item = String>>(names: I) -> Vec<Column> {
        names
            .into_iter()
            .enumerate()
            .map(|(i, name)| Column::new(name, i))
            .collect()
    }
}

/// A row of data
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Row {
    /// Cell values for each column
    pub cells: Vec<CellValue>,
}

impl Row {
    /// Create a new row
    pub fn new(cells: Vec<CellValue>) -> Self {
        Self { cells }
    }

    /// Get a cell value by column index
    pub fn get(&self, index: usize) -> Option<&CellValue> {
        self.cells.get(index)
    }
}

/// A cell value with type detection
///
/// `Missing` marks an absent value and is distinct from `String("")`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum CellValue {
    /// Integer value
    Integer(i64),
    /// Floating-point value
    Float(f64),
    /// Boolean value
    Bool(bool),
    /// String value
    String(String),
    /// Absent value
    Missing,
}

impl CellValue {
    /// Parse a delimited-text field into a CellValue, detecting the type
    ///
    /// Empty fields are `Missing`. Strings are kept verbatim so that key
    /// values survive byte-for-byte.
    pub fn parse(s: &str) -> Self {
        let trimmed = s.trim();

        if trimmed.is_empty() {
            return CellValue::Missing;
        }

        if let Ok(i) = trimmed.parse::<i64>() {
            return CellValue::Integer(i);
        }

        if let Ok(f) = trimmed.parse::<f64>() {
            if f.is_finite() {
                return CellValue::Float(f);
            }
        }

        if trimmed.eq_ignore_ascii_case("true") {
            return CellValue::Bool(true);
        }
        if trimmed.eq_ignore_ascii_case("false") {
            return CellValue::Bool(false);
        }

        CellValue::String(s.to_string())
    }

    /// Check if the cell is missing
    pub fn is_missing(&self) -> bool {
        matches!(self, CellValue::Missing)
    }

    /// Convert to a display string (missing renders as empty)
    pub fn to_string_value(&self) -> String {
        self.to_string()
    }

    /// The identity of this value when used as a join key
    ///
    /// Returns `None` for missing values, which never match anything.
    pub fn join_key(&self) -> Option<JoinKey> {
        match self {
            CellValue::Integer(i) => Some(JoinKey::Integer(*i)),
            CellValue::Float(f) => {
                if f.fract() == 0.0 && *f >= i64::MIN as f64 && *f < i64::MAX as f64 {
                    Some(JoinKey::Integer(*f as i64))
                } else {
                    Some(JoinKey::Float(f.to_bits()))
                }
            }
            CellValue::Bool(b) => Some(JoinKey::Bool(*b)),
            CellValue::String(s) => Some(JoinKey::String(s.clone())),
            CellValue::Missing => None,
        }
    }
}

impl std::fmt::Display for CellValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CellValue::Integer(i) => write!(f, "{}", i),
            CellValue::Float(fl) => write!(f, "{}", fl),
            CellValue::Bool(b) => write!(f, "{}", if *b { "TRUE" } else { "FALSE" }),
            CellValue::String(s) => write!(f, "{}", s),
            CellValue::Missing => write!(f, ""),
        }
    }
}

/// Hashable identity of a key cell
///
/// Integral floats collapse onto `Integer` so a spreadsheet's `2.0`
/// matches a delimited file's `2`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum JoinKey {
    Integer(i64),
    Float(u64),
    Bool(bool),
    String(String),
}
