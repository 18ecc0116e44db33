//! Error types for sku-core

use crate::pipeline::StatusEntry;
use std::path::PathBuf;
use thiserror::Error;

/// Result type alias using our Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Batch-level errors that can occur in sku-core
#[derive(Debug, Error)]
pub enum Error {
    /// Failed to read a file
    #[error("failed to read file '{path}': {source}")]
    FileRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// No source survived loading and normalization
    #[error("no valid sources to merge ({} source(s) checked)", .statuses.len())]
    EmptyMergeSet { statuses: Vec<StatusEntry> },

    /// A source failed outside the per-source recovery path
    #[error("source error: {0}")]
    Source(#[from] LoadError),

    /// Configuration values out of range
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// Merged table exceeds what a single worksheet can hold
    #[error("table of {rows} rows x {columns} columns does not fit in a worksheet")]
    TooLargeForSheet { rows: usize, columns: usize },

    /// CSV error while writing output
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// Spreadsheet writer error
    #[error("XLSX error: {0}")]
    Xlsx(#[from] rust_xlsxwriter::XlsxError),

    /// Directory traversal error
    #[error("failed to traverse directory: {0}")]
    WalkDir(#[from] walkdir::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Per-source failures
///
/// These never abort a batch: the pipeline records them in the status log
/// and leaves the source out of the merge.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LoadError {
    /// Format tag is not one of csv, xlsx, xlsb
    #[error("unsupported format '{0}'")]
    UnsupportedFormat(String),

    /// Content does not parse as the declared format
    #[error("failed to decode: {0}")]
    Decode(String),

    /// The required key column is absent
    #[error("missing key column '{0}'")]
    MissingKeyColumn(String),
}
