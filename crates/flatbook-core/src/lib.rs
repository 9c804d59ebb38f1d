//! # flatbook-core
//!
//! Core data structures for the flatbook workbook flattener.
//!
//! This crate provides the types shared by the resolver and the file I/O
//! layers:
//! - [`CellValue`] - cell contents (numbers, strings, booleans, errors,
//!   formulas with an optional cached result)
//! - [`CellAddress`] and [`CellRange`] - A1-style addressing
//! - [`Workbook`] and [`Worksheet`] - the document model
//!
//! ## Example
//!
//! ```rust
//! use flatbook_core::{CellValue, Workbook};
//!
//! let mut workbook = Workbook::new();
//! let sheet = workbook.worksheet_mut(0).unwrap();
//!
//! sheet.set_cell_value("A1", 42.0).unwrap();
//! sheet.set_cell_formula("A2", "=A1").unwrap();
//!
//! assert_eq!(sheet.get_value("A1").unwrap(), CellValue::Number(42.0));
//! ```

pub mod cell;
pub mod error;
pub mod workbook;
pub mod worksheet;

pub use cell::{CellAddress, CellError, CellRange, CellStorage, CellValue};
pub use error::{Error, Result};
pub use workbook::Workbook;
pub use worksheet::Worksheet;

/// Maximum number of rows in a worksheet (Excel limit)
pub const MAX_ROWS: u32 = 1_048_576;

/// Maximum number of columns in a worksheet (Excel limit)
pub const MAX_COLS: u16 = 16_384;

/// Maximum length of a sheet name
pub const MAX_SHEET_NAME_LEN: usize = 31;
