//! # flatbook-resolve
//!
//! Best-effort resolution of workbook formulas to plain values.
//!
//! Macro-enabled workbooks often carry live formulas whose cached results are
//! stale or missing. This crate computes what those formulas would evaluate
//! to for a closed set of formula shapes (direct references, IFERROR-wrapped
//! INDEX/MATCH, blank-guard IF, ROUND, CONCATENATE), across sheets, without
//! running a full spreadsheet engine. Cells it cannot resolve stay blank;
//! nothing here returns an error.
//!
//! The pieces:
//! - [`reference`] - sheet-qualified cell and range references
//! - [`shape`] / [`parser`] - the closed formula grammar and its recognizer
//! - [`store`] - the per-run value store seeded from the workbook
//! - [`range_ops`] - MATCH / INDEX / VLOOKUP emulation over the store
//! - [`evaluator`] - shape dispatch
//! - [`scheduler`] - the multi-pass convergence loop and workbook flattening
//!
//! ## Example
//!
//! ```rust
//! use flatbook_core::{CellValue, Workbook};
//! use flatbook_resolve::{flatten_workbook, resolve_workbook};
//!
//! let mut wb = Workbook::new();
//! let sheet = wb.worksheet_mut(0).unwrap();
//! sheet.set_cell_value("A1", 10.0).unwrap();
//! sheet.set_cell_formula("A2", "=A1").unwrap();
//!
//! let (store, stats) = resolve_workbook(&wb);
//! assert_eq!(stats.resolved, 1);
//!
//! let flat = flatten_workbook(&wb, &store).unwrap();
//! let sheet = flat.worksheet(0).unwrap();
//! assert_eq!(sheet.get_value("A2").unwrap(), CellValue::Number(10.0));
//! ```

pub mod evaluator;
pub mod parser;
pub mod range_ops;
pub mod reference;
pub mod scheduler;
pub mod shape;
pub mod store;

pub use evaluator::{evaluate, EvalContext};
pub use parser::parse_shape;
pub use reference::{CellRef, RangeRef};
pub use scheduler::{
    flatten_workbook, resolve_workbook, resolve_workbook_with, ResolveStats, DEFAULT_MAX_PASSES,
};
pub use shape::{FormulaShape, IndexMatch, MatchCall, Operand, VlookupCall};
pub use store::{CellKey, ValueStore};
