//! SKU Merge CLI
//!
//! Command-line tool for combining SKU attribute files on a shared product code.

use clap::{Parser, Subcommand};
use sku_core::pipeline::prepare_source;
use sku_core::{
    collect_sources, read_source, run as run_merge, Error, MergeConfig, MergeReport,
    SourceOutcome, SourcePreview, StatusEntry, Table,
};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "sku-merge")]
#[command(about = "Merge SKU attribute files on a shared product code", long_about = None)]
#[command(version)]
struct Cli {
    /// Enable debug logging (overridden by RUST_LOG)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Merge files into one table keyed by the product code
    Merge {
        /// Input files or directories (directories are searched for csv/xlsx/xlsb)
        #[arg(short, long, required = true)]
        input: Vec<PathBuf>,

        /// Output file path; the extension is set from the chosen format
        #[arg(short, long, default_value = "Merged_SKU_Data.xlsx")]
        output: PathBuf,

        /// Config file (JSON)
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Key column name
        #[arg(short, long)]
        key_column: Option<String>,

        /// Maximum rows kept per source
        #[arg(long)]
        max_rows: Option<usize>,

        /// Maximum columns kept per source
        #[arg(long)]
        max_cols: Option<usize>,

        /// Source names to leave out of the merge (repeatable)
        #[arg(short, long)]
        exclude: Vec<String>,

        /// Merged row count above which CSV is written instead of XLSX
        #[arg(long)]
        threshold: Option<usize>,

        /// Write a JSON report of the run to this path
        #[arg(long)]
        report: Option<PathBuf>,

        /// Hide source previews
        #[arg(long)]
        no_preview: bool,
    },

    /// Load a single file and show what the merge would see
    Inspect {
        /// Path to the file
        #[arg(short, long)]
        file: PathBuf,

        /// Key column name
        #[arg(short, long, default_value = sku_core::config::DEFAULT_KEY_COLUMN)]
        key_column: String,

        /// Number of rows to display
        #[arg(short, long, default_value_t = 10)]
        rows: usize,
    },

    /// Create a config file with default settings
    CreateConfig {
        /// Output path for the config file
        #[arg(short, long)]
        output: PathBuf,

        /// Key column name to put in the template
        #[arg(short, long)]
        key_column: Option<String>,
    },
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    if let Err(e) = run(cli.command) {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "warn" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn run(command: Commands) -> sku_core::Result<()> {
    match command {
        Commands::Merge {
            input,
            output,
            config,
            key_column,
            max_rows,
            max_cols,
            exclude,
            threshold,
            report,
            no_preview,
        } => {
            let mut config = match config {
                Some(path) => MergeConfig::load(path)?,
                None => MergeConfig::default(),
            };
            if let Some(key_column) = key_column {
                config.key_column = key_column;
            }
            if let Some(max_rows) = max_rows {
                config.max_rows = max_rows;
            }
            if let Some(max_cols) = max_cols {
                config.max_cols = max_cols;
            }
            if let Some(threshold) = threshold {
                config.merge_size_threshold = threshold;
            }
            for source in exclude {
                config.exclude(source);
            }

            cmd_merge(&input, &output, &config, report.as_deref(), !no_preview)
        }
        Commands::Inspect {
            file,
            key_column,
            rows,
        } => cmd_inspect(&file, &key_column, rows),
        Commands::CreateConfig { output, key_column } => cmd_create_config(&output, key_column),
    }
}

fn cmd_merge(
    inputs: &[PathBuf],
    output: &Path,
    config: &MergeConfig,
    report_path: Option<&Path>,
    show_previews: bool,
) -> sku_core::Result<()> {
    let sources = collect_sources(inputs)?;
    debug!(count = sources.len(), "collected sources");

    let outcome = match run_merge(&sources, config) {
        Ok(outcome) => outcome,
        Err(Error::EmptyMergeSet { statuses }) => {
            print_status_log(&statuses);
            if let Some(path) = report_path {
                MergeReport::empty(&config.key_column, statuses.clone()).save(path)?;
            }
            println!();
            println!("Please provide at least one file containing a '{}' column.", config.key_column);
            return Err(Error::EmptyMergeSet { statuses });
        }
        Err(e) => return Err(e),
    };

    print_status_log(&outcome.statuses);

    if show_previews {
        for preview in &outcome.previews {
            print_preview(preview);
        }
    }

    let format = outcome.output_format();
    let output_path = output.with_extension(format.extension());
    if output_path != output {
        warn!(
            requested = %output.display(),
            written = %output_path.display(),
            "output extension changed to match selected format"
        );
    }
    fs::write(&output_path, &outcome.output.bytes)?;

    if let Some(path) = report_path {
        MergeReport::from_outcome(&outcome).save(path)?;
        println!("Report written to {}", path.display());
    }

    println!();
    println!(
        "Merged {} rows x {} columns from {} source(s)",
        outcome.merged.row_count(),
        outcome.merged.column_count(),
        outcome.merged.sources.len()
    );
    println!("Wrote {} output to {}", format, output_path.display());

    Ok(())
}

fn cmd_inspect(file: &Path, key_column: &str, rows: usize) -> sku_core::Result<()> {
    let source = read_source(file)?;
    let config = MergeConfig {
        key_column: key_column.to_string(),
        ..MergeConfig::default()
    };

    println!("File: {}", file.display());
    println!("Format: {}", source.format);

    match prepare_source(&source, &config) {
        Ok(normalized) => {
            let table = &normalized.table;
            println!("Columns: {}", table.column_count());
            println!("Rows: {}", table.row_count());
            println!();
            print_table(table, rows);
        }
        Err(err) => {
            println!("Status: {}", SourceOutcome::from(&err));
        }
    }

    Ok(())
}

fn cmd_create_config(output: &Path, key_column: Option<String>) -> sku_core::Result<()> {
    let mut config = MergeConfig::default();
    if let Some(key_column) = key_column {
        config.key_column = key_column;
    }

    config.save(output)?;
    println!("Created config file: {}", output.display());
    println!("Key column: {}", config.key_column);
    println!();
    println!("Edit the file to adjust limits and exclusions, then run:");
    println!("  sku-merge merge --config {} --input <files>", output.display());

    Ok(())
}

fn print_status_log(statuses: &[StatusEntry]) {
    println!("Sources ({}):", statuses.len());
    for entry in statuses {
        let marker = if entry.outcome.is_loaded() { "ok" } else { "!!" };
        println!("  [{}] {}: {}", marker, entry.source, entry.outcome);
    }
}

fn print_preview(preview: &SourcePreview) {
    println!();
    println!("Preview of {}:", preview.source);
    print_table(&preview.table, preview.table.row_count());
}

fn print_table(table: &Table, limit: usize) {
    let header: Vec<&str> = table.column_names();
    println!("{}", header.join("\t"));
    println!("{}", "-".repeat(header.len() * 12));

    for row in table.rows.iter().take(limit) {
        let values: Vec<String> = row.cells.iter().map(|c| c.to_string_value()).collect();
        println!("{}", values.join("\t"));
    }

    if table.row_count() > limit {
        println!("... ({} more rows)", table.row_count() - limit);
    }
}
