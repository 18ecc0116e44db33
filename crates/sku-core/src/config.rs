//! Merge configuration
//!
//! Stored as JSON. Fields absent from the file take their defaults, so a
//! config holding only `{"key_column": "SKU"}` is valid.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fs;
use std::path::Path;

/// Default join key column
pub const DEFAULT_KEY_COLUMN: &str = "Product Code";

/// Default merged row count above which output switches to CSV
pub const DEFAULT_MERGE_SIZE_THRESHOLD: usize = 50_000;

/// Data rows a single worksheet can hold (the header takes one row)
pub const XLSX_MAX_DATA_ROWS: usize = 1_048_575;

/// Columns a single worksheet can hold
pub const XLSX_MAX_COLS: usize = 16_384;

/// Characters a single worksheet cell can hold
pub const XLSX_MAX_STRING_LEN: usize = 32_767;

/// Settings threaded through every stage of a merge
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MergeConfig {
    /// Column whose values drive the join
    pub key_column: String,
    /// Rows kept per source
    pub max_rows: usize,
    /// Columns kept per source (the key column is always kept)
    pub max_cols: usize,
    /// Sources loaded and previewed but left out of the merge
    pub excluded_sources: BTreeSet<String>,
    /// Merged row count above which CSV output is chosen
    pub merge_size_threshold: usize,
    /// Rows shown in each source preview
    pub preview_rows: usize,
}

impl Default for MergeConfig {
    fn default() -> Self {
        Self {
            key_column: DEFAULT_KEY_COLUMN.to_string(),
            max_rows: XLSX_MAX_DATA_ROWS,
            max_cols: XLSX_MAX_COLS,
            excluded_sources: BTreeSet::new(),
            merge_size_threshold: DEFAULT_MERGE_SIZE_THRESHOLD,
            preview_rows: 5,
        }
    }
}

impl MergeConfig {
    /// Create a config with default settings
    pub fn new() -> Self {
        Self::default()
    }

    /// Load a config file from JSON
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path.as_ref()).map_err(|e| Error::FileRead {
            path: path.as_ref().to_path_buf(),
            source: e,
        })?;
        let config: MergeConfig = serde_json::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Save the config to JSON
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = serde_json::to_string_pretty(self)?;
        fs::write(path, content)?;
        Ok(())
    }

    /// Check that limits are usable
    pub fn validate(&self) -> Result<()> {
        if self.key_column.is_empty() {
            return Err(Error::InvalidConfig("key_column must not be empty".to_string()));
        }
        if self.max_rows == 0 {
            return Err(Error::InvalidConfig("max_rows must be at least 1".to_string()));
        }
        if self.max_cols == 0 {
            return Err(Error::InvalidConfig("max_cols must be at least 1".to_string()));
        }
        if self.merge_size_threshold >= XLSX_MAX_DATA_ROWS {
            return Err(Error::InvalidConfig(format!(
                "merge_size_threshold must be below {}",
                XLSX_MAX_DATA_ROWS
            )));
        }
        Ok(())
    }

    /// Mark a source as excluded from the merge
    pub fn exclude(&mut self, source: impl Into<String>) {
        self.excluded_sources.insert(source.into());
    }

    /// Whether a source is excluded from the merge
    pub fn is_excluded(&self, source: &str) -> bool {
        self.excluded_sources.contains(source)
    }
}
