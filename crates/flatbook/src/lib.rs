//! # flatbook
//!
//! Resolve live formulas in macro-enabled workbooks to plain values.
//!
//! Flatbook pre-processes `.xlsx`/`.xlsm` files whose formula cells carry
//! stale or missing cached results: it computes what a constrained set of
//! formula shapes would evaluate to and writes a values-only copy of the
//! workbook. Downstream consumers treat that copy exactly like a workbook
//! that never contained formulas.
//!
//! ## Example
//!
//! ```rust,no_run
//! use flatbook::resolve_formulas_to_values;
//!
//! let output = resolve_formulas_to_values("ratios.xlsm").unwrap();
//! println!("values-only workbook at {}", output.display());
//! // The caller owns (and eventually deletes) the output file.
//! ```
//!
//! The in-memory surface is available too:
//!
//! ```rust
//! use flatbook::prelude::*;
//!
//! let mut wb = Workbook::new();
//! let sheet = wb.worksheet_mut(0).unwrap();
//! sheet.set_cell_value("A1", 10.0).unwrap();
//! sheet.set_cell_formula("A2", "=ROUND(A1/3,2)").unwrap();
//!
//! let (flat, stats) = wb.resolve_values().unwrap();
//! assert_eq!(stats.resolved, 1);
//! assert_eq!(flat.worksheet(0).unwrap().get_value("A2").unwrap(), CellValue::Number(3.33));
//! ```

pub mod prelude;
pub mod resolve;

pub use resolve::{
    resolve_formulas_to_values, resolve_formulas_to_values_with, ResolveOptions, ResolveOutcome,
    WorkbookResolveExt,
};

// Re-export core types
pub use flatbook_core::{
    CellAddress, CellError, CellRange, CellValue, Error, Result, Workbook, Worksheet, MAX_COLS,
    MAX_ROWS, MAX_SHEET_NAME_LEN,
};

// Re-export the engine surface
pub use flatbook_resolve::{
    evaluate, flatten_workbook, parse_shape, resolve_workbook, resolve_workbook_with, EvalContext,
    FormulaShape, ResolveStats, ValueStore, DEFAULT_MAX_PASSES,
};

// Re-export I/O types
pub use flatbook_xlsx::{XlsxError, XlsxReader, XlsxWriter};

use std::path::Path;

/// Extension trait for Workbook file I/O
pub trait WorkbookExt {
    /// Open a workbook from a file
    fn open<P: AsRef<Path>>(path: P) -> Result<Workbook>;

    /// Save the workbook to a file
    fn save<P: AsRef<Path>>(&self, path: P) -> Result<()>;
}

impl WorkbookExt for Workbook {
    fn open<P: AsRef<Path>>(path: P) -> Result<Workbook> {
        let path = path.as_ref();
        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_lowercase());

        match extension.as_deref() {
            Some("xlsx") | Some("xlsm") => {
                XlsxReader::read_file(path).map_err(|e| Error::other(e.to_string()))
            }
            _ => Err(Error::other(format!(
                "Unsupported file format: {}",
                path.display()
            ))),
        }
    }

    fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_lowercase());

        match extension.as_deref() {
            Some("xlsx") => {
                XlsxWriter::write_file(self, path).map_err(|e| Error::other(e.to_string()))
            }
            _ => Err(Error::other(format!(
                "Unsupported file format: {}",
                path.display()
            ))),
        }
    }
}
