//! sku-core: Core library for merging SKU attribute tables
//!
//! This library provides functionality to:
//! - Decode CSV, XLSX and XLSB sources into tables
//! - Validate the key column and apply row/column limits per source
//! - Prefix non-key columns with their source name
//! - Full-outer-join any number of sources on the key column
//! - Serialize the result as XLSX, or CSV when it is too large

pub mod config;
pub mod disambiguator;
pub mod error;
pub mod loader;
pub mod merger;
pub mod normalizer;
pub mod output;
pub mod pipeline;
pub mod report;
pub mod scanner;
pub mod table;

pub use config::MergeConfig;
pub use disambiguator::disambiguate;
pub use error::{Error, LoadError, Result};
pub use loader::{load_table, parse_csv_str, FormatTag, RawSource};
pub use merger::{merge_tables, outer_join, MergedTable};
pub use normalizer::{normalize, Normalized};
pub use output::{select_format, serialize, strings_fit_in_sheet, OutputFormat, SerializedOutput};
pub use pipeline::{run, MergeOutcome, SourceOutcome, SourcePreview, StatusEntry};
pub use report::MergeReport;
pub use scanner::{collect_sources, expand_paths, read_source};
pub use table::{CellValue, Column, JoinKey, Row, Table};
