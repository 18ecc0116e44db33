//! Batch driver: load, normalize, rename, merge and serialize a set of sources
//!
//! Per-source failures never stop the batch. Each source gets exactly one
//! [`StatusEntry`]; only sources that loaded cleanly and are not excluded
//! take part in the merge, in the order they were given.

use crate::config::MergeConfig;
use crate::disambiguator::disambiguate;
use crate::error::{Error, LoadError, Result};
use crate::loader::{load_table, RawSource};
use crate::merger::{merge_tables, MergedTable};
use crate::normalizer::{normalize, Normalized};
use crate::output::{serialize, OutputFormat, SerializedOutput};
use crate::table::Table;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use tracing::{info, warn};

/// What happened to a single source
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "kebab-case")]
pub enum SourceOutcome {
    Loaded,
    LoadedWithLimitsApplied,
    MissingKeyColumn,
    UnsupportedFormat { format: String },
    DecodeError { detail: String },
    /// An earlier source in the batch already used this identifier
    DuplicateSource,
}

impl SourceOutcome {
    /// Whether the source produced a usable table
    pub fn is_loaded(&self) -> bool {
        matches!(
            self,
            SourceOutcome::Loaded | SourceOutcome::LoadedWithLimitsApplied
        )
    }
}

impl From<&LoadError> for SourceOutcome {
    fn from(err: &LoadError) -> Self {
        match err {
            LoadError::UnsupportedFormat(format) => SourceOutcome::UnsupportedFormat {
                format: format.clone(),
            },
            LoadError::Decode(detail) => SourceOutcome::DecodeError {
                detail: detail.clone(),
            },
            LoadError::MissingKeyColumn(_) => SourceOutcome::MissingKeyColumn,
        }
    }
}

impl fmt::Display for SourceOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SourceOutcome::Loaded => write!(f, "loaded"),
            SourceOutcome::LoadedWithLimitsApplied => write!(f, "loaded (limits applied)"),
            SourceOutcome::MissingKeyColumn => write!(f, "missing key column"),
            SourceOutcome::UnsupportedFormat { format } => {
                write!(f, "unsupported format '{}'", format)
            }
            SourceOutcome::DecodeError { detail } => write!(f, "decode error: {}", detail),
            SourceOutcome::DuplicateSource => write!(f, "duplicate source name"),
        }
    }
}

/// Status log line for one source
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusEntry {
    pub source: String,
    #[serde(flatten)]
    pub outcome: SourceOutcome,
}

/// First rows of a normalized source, before its columns are renamed
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourcePreview {
    pub source: String,
    pub table: Table,
}

/// Everything a batch produces
#[derive(Debug, Clone)]
pub struct MergeOutcome {
    /// One entry per input source, in input order
    pub statuses: Vec<StatusEntry>,
    /// Previews of every source that loaded, in input order
    pub previews: Vec<SourcePreview>,
    /// The joined table
    pub merged: MergedTable,
    /// The joined table serialized in the selected format
    pub output: SerializedOutput,
}

impl MergeOutcome {
    /// Format the output was written in
    pub fn output_format(&self) -> OutputFormat {
        self.output.format
    }

    /// Preview for a source, if it loaded
    pub fn preview(&self, source: &str) -> Option<&Table> {
        self.previews
            .iter()
            .find(|p| p.source == source)
            .map(|p| &p.table)
    }

    /// Status for a source
    pub fn status(&self, source: &str) -> Option<&SourceOutcome> {
        self.statuses
            .iter()
            .find(|s| s.source == source)
            .map(|s| &s.outcome)
    }
}

/// Load and validate a single source
pub fn prepare_source(source: &RawSource, config: &MergeConfig) -> std::result::Result<Normalized, LoadError> {
    let table = load_table(source)?;
    normalize(table, &config.key_column, config.max_rows, config.max_cols)
}

/// Run a full batch
///
/// Returns [`Error::EmptyMergeSet`], carrying the status log, when no source
/// is left to merge.
pub fn run(sources: &[RawSource], config: &MergeConfig) -> Result<MergeOutcome> {
    config.validate()?;

    let mut statuses = Vec::with_capacity(sources.len());
    let mut previews = Vec::new();
    let mut participants: Vec<Table> = Vec::new();
    let mut seen: HashSet<&str> = HashSet::new();

    for source in sources {
        let id = source.identifier.as_str();

        if !seen.insert(id) {
            warn!(source = id, "duplicate source name, skipping");
            statuses.push(StatusEntry {
                source: id.to_string(),
                outcome: SourceOutcome::DuplicateSource,
            });
            continue;
        }

        let outcome = match prepare_source(source, config) {
            Ok(Normalized {
                mut table,
                limits_applied,
            }) => {
                info!(
                    source = id,
                    rows = table.row_count(),
                    columns = table.column_count(),
                    limits_applied,
                    "loaded source"
                );
                previews.push(SourcePreview {
                    source: id.to_string(),
                    table: table.head(config.preview_rows),
                });

                if config.is_excluded(id) {
                    info!(source = id, "source excluded from merge");
                } else {
                    disambiguate(&mut table, id, &config.key_column);
                    participants.push(table);
                }

                if limits_applied {
                    SourceOutcome::LoadedWithLimitsApplied
                } else {
                    SourceOutcome::Loaded
                }
            }
            Err(err) => {
                warn!(source = id, error = %err, "skipping source");
                SourceOutcome::from(&err)
            }
        };

        statuses.push(StatusEntry {
            source: id.to_string(),
            outcome,
        });
    }

    if participants.is_empty() {
        return Err(Error::EmptyMergeSet { statuses });
    }

    let merged = merge_tables(&participants, &config.key_column)?;
    info!(
        sources = merged.sources.len(),
        rows = merged.row_count(),
        columns = merged.column_count(),
        "merged sources"
    );

    let output = serialize(&merged, config.merge_size_threshold)?;

    Ok(MergeOutcome {
        statuses,
        previews,
        merged,
        output,
    })
}
