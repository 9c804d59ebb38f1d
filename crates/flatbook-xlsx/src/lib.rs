//! # flatbook-xlsx
//!
//! XLSX/XLSM container I/O for flatbook: a reader that keeps formulas and
//! their cached results, and a writer that emits values-only parts.

pub mod error;
pub mod reader;
pub mod writer;

pub use error::{XlsxError, XlsxResult};
pub use reader::XlsxReader;
pub use writer::XlsxWriter;
