//! Worksheet type

use crate::cell::{CellAddress, CellRange, CellStorage, CellValue};
use crate::error::{Error, Result};
use crate::{MAX_COLS, MAX_ROWS};

/// A single sheet in a workbook: a name plus a sparse cell grid
#[derive(Debug)]
pub struct Worksheet {
    name: String,
    cells: CellStorage,
}

impl Worksheet {
    /// Create a new worksheet with the given name
    pub fn new<S: Into<String>>(name: S) -> Self {
        Self {
            name: name.into(),
            cells: CellStorage::new(),
        }
    }

    /// Get the sheet name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Set the sheet name
    pub fn set_name<S: Into<String>>(&mut self, name: S) {
        self.name = name.into();
    }

    // === Cell access ===

    /// Get a cell value by address string (e.g., "A1")
    ///
    /// Missing cells read as [`CellValue::Empty`].
    pub fn get_value(&self, address: &str) -> Result<CellValue> {
        let addr = CellAddress::parse(address)?;
        Ok(self.get_value_at(addr.row, addr.col))
    }

    /// Get a cell value by row and column indices
    pub fn get_value_at(&self, row: u32, col: u16) -> CellValue {
        self.cells
            .get(row, col)
            .cloned()
            .unwrap_or(CellValue::Empty)
    }

    /// Borrow a cell value by row and column indices, if one is stored
    pub fn peek_at(&self, row: u32, col: u16) -> Option<&CellValue> {
        self.cells.get(row, col)
    }

    // === Cell modification ===

    /// Set a cell value by address string
    pub fn set_cell_value<V: Into<CellValue>>(&mut self, address: &str, value: V) -> Result<()> {
        let addr = CellAddress::parse(address)?;
        self.set_cell_value_at(addr.row, addr.col, value)
    }

    /// Set a cell value by row and column indices
    pub fn set_cell_value_at<V: Into<CellValue>>(
        &mut self,
        row: u32,
        col: u16,
        value: V,
    ) -> Result<()> {
        self.validate_cell_position(row, col)?;
        self.cells.set(row, col, value.into());
        Ok(())
    }

    /// Set a cell formula by address string
    pub fn set_cell_formula(&mut self, address: &str, formula: &str) -> Result<()> {
        let addr = CellAddress::parse(address)?;
        self.set_cell_formula_at(addr.row, addr.col, formula)
    }

    /// Set a cell formula by row and column indices
    ///
    /// The stored text is normalized to start with '='.
    pub fn set_cell_formula_at(&mut self, row: u32, col: u16, formula: &str) -> Result<()> {
        self.validate_cell_position(row, col)?;

        let text = if formula.starts_with('=') {
            formula.to_string()
        } else {
            format!("={}", formula)
        };

        self.cells.set(row, col, CellValue::formula(text));
        Ok(())
    }

    /// Clear a cell by address string
    pub fn clear_cell(&mut self, address: &str) -> Result<()> {
        let addr = CellAddress::parse(address)?;
        self.cells.remove(addr.row, addr.col);
        Ok(())
    }

    // === Iteration ===

    /// Iterate over all stored cells in row-major order
    pub fn iter_cells(&self) -> impl Iterator<Item = (u32, u16, &CellValue)> {
        self.cells.iter()
    }

    /// Iterate over formula cells in row-major order as (row, col, text)
    pub fn formula_cells(&self) -> impl Iterator<Item = (u32, u16, &str)> {
        self.cells
            .iter()
            .filter_map(|(row, col, v)| v.formula_text().map(|text| (row, col, text)))
    }

    /// Number of stored cells
    pub fn cell_count(&self) -> usize {
        self.cells.cell_count()
    }

    /// Bounds of all stored cells
    pub fn used_range(&self) -> Option<CellRange> {
        self.cells
            .used_bounds()
            .map(|(min_row, min_col, max_row, max_col)| {
                CellRange::from_indices(min_row, min_col, max_row, max_col)
            })
    }

    fn validate_cell_position(&self, row: u32, col: u16) -> Result<()> {
        if row >= MAX_ROWS {
            return Err(Error::RowOutOfBounds(row, MAX_ROWS - 1));
        }
        if col >= MAX_COLS {
            return Err(Error::ColumnOutOfBounds(col as u32, MAX_COLS - 1));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn value_round_trip() {
        let mut sheet = Worksheet::new("Data");

        sheet.set_cell_value("A1", 10.0).unwrap();
        sheet.set_cell_value("B2", "hello").unwrap();

        assert_eq!(sheet.get_value("A1").unwrap(), CellValue::Number(10.0));
        assert_eq!(sheet.get_value("B2").unwrap(), CellValue::string("hello"));
        assert_eq!(sheet.get_value("Z99").unwrap(), CellValue::Empty);
    }

    #[test]
    fn formula_text_is_normalized() {
        let mut sheet = Worksheet::new("Data");

        sheet.set_cell_formula("A1", "B1*2").unwrap();
        sheet.set_cell_formula("A2", "=B2").unwrap();

        assert_eq!(sheet.get_value("A1").unwrap().formula_text(), Some("=B1*2"));
        assert_eq!(sheet.get_value("A2").unwrap().formula_text(), Some("=B2"));
    }

    #[test]
    fn formula_cells_iterates_only_formulas() {
        let mut sheet = Worksheet::new("Data");
        sheet.set_cell_value("A1", 1.0).unwrap();
        sheet.set_cell_formula("B1", "=A1").unwrap();
        sheet.set_cell_formula("A3", "=B1").unwrap();

        let formulas: Vec<(u32, u16, String)> = sheet
            .formula_cells()
            .map(|(r, c, t)| (r, c, t.to_string()))
            .collect();
        assert_eq!(
            formulas,
            vec![(0, 1, "=A1".to_string()), (2, 0, "=B1".to_string())]
        );
    }

    #[test]
    fn used_range_tracks_extents() {
        let mut sheet = Worksheet::new("Data");
        assert!(sheet.used_range().is_none());

        sheet.set_cell_value("B2", 1.0).unwrap();
        sheet.set_cell_value("D7", 2.0).unwrap();

        let range = sheet.used_range().unwrap();
        assert_eq!(range.to_a1_string(), "B2:D7");
    }

    #[test]
    fn out_of_bounds_rejected() {
        let mut sheet = Worksheet::new("Data");
        assert!(sheet
            .set_cell_value_at(crate::MAX_ROWS, 0, 1.0)
            .is_err());
    }
}
