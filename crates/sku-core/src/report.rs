//! JSON summary of a merge run

use crate::error::{Error, Result};
use crate::output::OutputFormat;
use crate::pipeline::{MergeOutcome, StatusEntry};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// A record of one merge run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MergeReport {
    /// When the merge ran
    pub generated_at: DateTime<Utc>,
    /// Join key used
    pub key_column: String,
    /// Per-source outcomes, in input order
    pub statuses: Vec<StatusEntry>,
    /// Sources that took part in the merge, in merge order
    pub merged_sources: Vec<String>,
    /// Rows in the merged table
    pub row_count: usize,
    /// Columns in the merged table
    pub column_count: usize,
    /// Format the output was written in, absent when nothing was merged
    pub output_format: Option<OutputFormat>,
}

impl MergeReport {
    /// Summarize a successful merge
    pub fn from_outcome(outcome: &MergeOutcome) -> Self {
        Self {
            generated_at: Utc::now(),
            key_column: outcome.merged.key_column.clone(),
            statuses: outcome.statuses.clone(),
            merged_sources: outcome.merged.sources.clone(),
            row_count: outcome.merged.row_count(),
            column_count: outcome.merged.column_count(),
            output_format: Some(outcome.output_format()),
        }
    }

    /// Summarize a batch that ended with no valid sources
    pub fn empty(key_column: impl Into<String>, statuses: Vec<StatusEntry>) -> Self {
        Self {
            generated_at: Utc::now(),
            key_column: key_column.into(),
            statuses,
            merged_sources: Vec::new(),
            row_count: 0,
            column_count: 0,
            output_format: None,
        }
    }

    /// Load a report from a file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path.as_ref()).map_err(|e| Error::FileRead {
            path: path.as_ref().to_path_buf(),
            source: e,
        })?;
        serde_json::from_str(&content).map_err(Error::Json)
    }

    /// Save the report to a file
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = serde_json::to_string_pretty(self)?;
        fs::write(path, content)?;
        Ok(())
    }

    /// Number of sources that were skipped for any reason
    pub fn rejected_count(&self) -> usize {
        self.statuses
            .iter()
            .filter(|s| !s.outcome.is_loaded())
            .count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::MergeConfig;
    use crate::loader::{FormatTag, RawSource};
    use crate::pipeline::{run, SourceOutcome};

    #[test]
    fn test_report_from_outcome() {
        let sources = vec![
            RawSource::new("X", FormatTag::Csv, b"Product Code,Price\n1,10\n".to_vec()),
            RawSource::new("Y", FormatTag::Csv, b"Name\nfoo\n".to_vec()),
        ];
        let outcome = run(&sources, &MergeConfig::default()).unwrap();
        let report = MergeReport::from_outcome(&outcome);

        assert_eq!(report.merged_sources, vec!["X"]);
        assert_eq!(report.row_count, 1);
        assert_eq!(report.column_count, 2);
        assert_eq!(report.output_format, Some(OutputFormat::Xlsx));
        assert_eq!(report.rejected_count(), 1);
    }

    #[test]
    fn test_report_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("report.json");

        let report = MergeReport::empty(
            "Product Code",
            vec![StatusEntry {
                source: "a.csv".to_string(),
                outcome: SourceOutcome::MissingKeyColumn,
            }],
        );
        report.save(&path).unwrap();

        let loaded = MergeReport::load(&path).unwrap();
        assert_eq!(loaded, report);
        assert_eq!(loaded.output_format, None);
    }
}
