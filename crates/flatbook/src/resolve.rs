//! The file-level resolution pipeline
//!
//! Read the source workbook, resolve its formulas, flatten, and write a
//! values-only copy to a fresh temporary file. Only I/O and container
//! problems fail the operation; formula-level trouble degrades to blank
//! cells and a logged unresolved count.

use crate::{Error, Result, WorkbookExt};
use flatbook_core::Workbook;
use flatbook_resolve::{
    flatten_workbook, resolve_workbook_with, ResolveStats, DEFAULT_MAX_PASSES,
};
use flatbook_xlsx::XlsxWriter;
use std::path::{Path, PathBuf};

/// Options for a resolution run
#[derive(Debug, Clone)]
pub struct ResolveOptions {
    /// Maximum number of evaluation passes over the outstanding cells
    pub max_passes: u32,
}

impl Default for ResolveOptions {
    fn default() -> Self {
        Self {
            max_passes: DEFAULT_MAX_PASSES,
        }
    }
}

/// Result of a file-level resolution run
#[derive(Debug)]
pub struct ResolveOutcome {
    /// Path of the values-only workbook; the caller owns (and deletes) it
    pub output_path: PathBuf,
    /// Resolution counters
    pub stats: ResolveStats,
}

/// Resolve a workbook file's formulas and write a values-only copy
///
/// Returns the path of a fresh temporary `.xlsx` the caller owns. Fails
/// only when the source cannot be opened or the output cannot be written.
pub fn resolve_formulas_to_values<P: AsRef<Path>>(input: P) -> Result<PathBuf> {
    resolve_formulas_to_values_with(input, &ResolveOptions::default())
        .map(|outcome| outcome.output_path)
}

/// Resolve a workbook file with explicit options, returning the counters
/// along with the output path
pub fn resolve_formulas_to_values_with<P: AsRef<Path>>(
    input: P,
    options: &ResolveOptions,
) -> Result<ResolveOutcome> {
    let input = input.as_ref();
    let workbook = Workbook::open(input)?;

    let (store, stats) = resolve_workbook_with(&workbook, options.max_passes);
    let flat = flatten_workbook(&workbook, &store)?;

    let stem = input
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("workbook");
    let file = tempfile::Builder::new()
        .prefix(&format!("{}-values-", stem))
        .suffix(".xlsx")
        .tempfile()
        .map_err(|e| Error::other(format!("Failed to create output file: {}", e)))?;

    XlsxWriter::write(&flat, file.as_file()).map_err(|e| Error::other(e.to_string()))?;

    // Persist the file; from here on it belongs to the caller
    let (_, output_path) = file
        .keep()
        .map_err(|e| Error::other(format!("Failed to persist output file: {}", e)))?;

    log::info!(
        "wrote values-only workbook to {} ({} resolved, {} unresolved)",
        output_path.display(),
        stats.resolved,
        stats.unresolved
    );

    Ok(ResolveOutcome { output_path, stats })
}

/// Extension trait adding in-memory resolution to [`Workbook`]
pub trait WorkbookResolveExt {
    /// Resolve formulas and return the flattened workbook plus counters
    fn resolve_values(&self) -> Result<(Workbook, ResolveStats)>;

    /// Same, with an explicit pass budget
    fn resolve_values_with(&self, options: &ResolveOptions) -> Result<(Workbook, ResolveStats)>;
}

impl WorkbookResolveExt for Workbook {
    fn resolve_values(&self) -> Result<(Workbook, ResolveStats)> {
        self.resolve_values_with(&ResolveOptions::default())
    }

    fn resolve_values_with(&self, options: &ResolveOptions) -> Result<(Workbook, ResolveStats)> {
        let (store, stats) = resolve_workbook_with(self, options.max_passes);
        let flat = flatten_workbook(self, &store)?;
        Ok((flat, stats))
    }
}
