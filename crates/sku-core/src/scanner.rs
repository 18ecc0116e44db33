//! Input discovery: turn command-line paths into raw sources

use crate::error::{Error, Result};
use crate::loader::{FormatTag, RawSource};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::warn;
use walkdir::WalkDir;

/// Expand paths into the list of files to read
///
/// Files are taken as given, whatever their extension, so unsupported
/// inputs still show up in the status log. Directories are walked for
/// files with a supported extension, sorted by path for a stable order.
pub fn expand_paths<P: AsRef<Path>>(paths: &[P]) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();

    for path in paths {
        let path = path.as_ref();
        if path.is_dir() {
            let mut found = Vec::new();
            for entry in WalkDir::new(path).follow_links(true) {
                let entry = entry?;
                if entry.file_type().is_file() && FormatTag::from_path(entry.path()).is_supported() {
                    found.push(entry.into_path());
                }
            }
            found.sort();
            files.extend(found);
        } else {
            files.push(path.to_path_buf());
        }
    }

    Ok(files)
}

fn source_identifier(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

/// Read one file into a raw source named after its file name
pub fn read_source<P: AsRef<Path>>(path: P) -> Result<RawSource> {
    let path = path.as_ref();
    let bytes = fs::read(path).map_err(|e| Error::FileRead {
        path: path.to_path_buf(),
        source: e,
    })?;

    Ok(RawSource::new(
        source_identifier(path),
        FormatTag::from_path(path),
        bytes,
    ))
}

/// Expand paths and read every file found
///
/// A file that cannot be read still yields a source; it fails to decode
/// and lands in the status log instead of aborting the batch.
pub fn collect_sources<P: AsRef<Path>>(paths: &[P]) -> Result<Vec<RawSource>> {
    let sources = expand_paths(paths)?
        .iter()
        .map(|path| match read_source(path) {
            Ok(source) => source,
            Err(err) => {
                warn!(path = %path.display(), error = %err, "unreadable input");
                RawSource::unreadable(
                    source_identifier(path),
                    FormatTag::from_path(path),
                    err.to_string(),
                )
            }
        })
        .collect();
    Ok(sources)
}
