//! Convenience re-exports for the common surface
//!
//! ```rust
//! use flatbook::prelude::*;
//! ```

pub use crate::resolve::{ResolveOptions, ResolveOutcome, WorkbookResolveExt};
pub use crate::WorkbookExt;
pub use flatbook_core::{
    CellAddress, CellError, CellRange, CellValue, Error, Result, Workbook, Worksheet,
};
pub use flatbook_resolve::ResolveStats;
pub use flatbook_xlsx::{XlsxReader, XlsxWriter};
