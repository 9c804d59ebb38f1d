//! Sparse cell storage
//!
//! Only non-empty cells are stored. A row-based BTreeMap keeps iteration in
//! row-major order, which both the file writer and the resolver's scheduling
//! order rely on.

use std::collections::BTreeMap;

use super::CellValue;

/// Sparse row-major storage for worksheet cells
///
/// Structure: `BTreeMap<row_index, BTreeMap<col_index, CellValue>>`
#[derive(Debug, Default)]
pub struct CellStorage {
    rows: BTreeMap<u32, BTreeMap<u16, CellValue>>,
}

impl CellStorage {
    /// Create empty storage
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored cells
    pub fn cell_count(&self) -> usize {
        self.rows.values().map(|cols| cols.len()).sum()
    }

    /// Check if no cells are stored
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Get a cell value
    pub fn get(&self, row: u32, col: u16) -> Option<&CellValue> {
        self.rows.get(&row).and_then(|cols| cols.get(&col))
    }

    /// Set a cell value, replacing any existing one
    pub fn set(&mut self, row: u32, col: u16, value: CellValue) {
        self.rows.entry(row).or_default().insert(col, value);
    }

    /// Remove a cell, returning its value if present
    pub fn remove(&mut self, row: u32, col: u16) -> Option<CellValue> {
        let cols = self.rows.get_mut(&row)?;
        let removed = cols.remove(&col);
        if cols.is_empty() {
            self.rows.remove(&row);
        }
        removed
    }

    /// Iterate over stored cells in row-major order
    pub fn iter(&self) -> impl Iterator<Item = (u32, u16, &CellValue)> {
        self.rows
            .iter()
            .flat_map(|(&row, cols)| cols.iter().map(move |(&col, v)| (row, col, v)))
    }

    /// Bounds of the stored cells as `(min_row, min_col, max_row, max_col)`
    pub fn used_bounds(&self) -> Option<(u32, u16, u32, u16)> {
        let min_row = *self.rows.keys().next()?;
        let max_row = *self.rows.keys().next_back()?;

        let mut min_col = u16::MAX;
        let mut max_col = 0;
        for cols in self.rows.values() {
            if let (Some(&first), Some(&last)) = (cols.keys().next(), cols.keys().next_back()) {
                min_col = min_col.min(first);
                max_col = max_col.max(last);
            }
        }

        Some((min_row, min_col, max_row, max_col))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn set_get_remove() {
        let mut storage = CellStorage::new();
        assert!(storage.is_empty());

        storage.set(2, 1, CellValue::Number(5.0));
        assert_eq!(storage.get(2, 1), Some(&CellValue::Number(5.0)));
        assert_eq!(storage.get(2, 2), None);
        assert_eq!(storage.cell_count(), 1);

        storage.set(2, 1, CellValue::string("replaced"));
        assert_eq!(storage.get(2, 1), Some(&CellValue::string("replaced")));
        assert_eq!(storage.cell_count(), 1);

        assert_eq!(storage.remove(2, 1), Some(CellValue::string("replaced")));
        assert!(storage.is_empty());
    }

    #[test]
    fn iteration_is_row_major() {
        let mut storage = CellStorage::new();
        storage.set(5, 0, CellValue::Number(3.0));
        storage.set(0, 2, CellValue::Number(1.0));
        storage.set(0, 7, CellValue::Number(2.0));

        let order: Vec<(u32, u16)> = storage.iter().map(|(r, c, _)| (r, c)).collect();
        assert_eq!(order, vec![(0, 2), (0, 7), (5, 0)]);
    }

    #[test]
    fn used_bounds() {
        let mut storage = CellStorage::new();
        assert_eq!(storage.used_bounds(), None);

        storage.set(3, 4, CellValue::Number(1.0));
        storage.set(7, 1, CellValue::Number(2.0));

        assert_eq!(storage.used_bounds(), Some((3, 1, 7, 4)));
    }
}
