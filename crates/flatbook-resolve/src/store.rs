//! The per-run value store
//!
//! One store exists per resolution run. It is seeded once from the source
//! workbook, grows as formulas resolve, and is read-only for flattening.
//! Absence of a key means "not yet resolved", never "resolved to empty".

use ahash::AHashMap;
use flatbook_core::{CellValue, Workbook};

/// Identifies one cell across the workbook: sheet name plus position
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CellKey {
    pub sheet: String,
    pub row: u32,
    pub col: u16,
}

impl CellKey {
    pub fn new<S: Into<String>>(sheet: S, row: u32, col: u16) -> Self {
        Self {
            sheet: sheet.into(),
            row,
            col,
        }
    }
}

/// Resolved cell values, keyed by (sheet, row, col)
///
/// Entries are added, never removed, and the first write for a key wins:
/// a value observed by one cell during a pass can never change under it.
#[derive(Debug, Default)]
pub struct ValueStore {
    cells: AHashMap<CellKey, CellValue>,
}

impl ValueStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a store from a workbook's "as calculated" state
    ///
    /// Every literal cell contributes its value. A formula cell contributes
    /// its cached result when the file carries one - the cached value is
    /// preferred over the live formula text. Formula cells without a cached
    /// result contribute nothing; they are the resolver's work list.
    pub fn seed_from(workbook: &Workbook) -> Self {
        let mut store = Self::new();
        for sheet in workbook.worksheets() {
            for (row, col, value) in sheet.iter_cells() {
                let seeded = match value {
                    CellValue::Formula { cached, .. } => match cached {
                        Some(v) => Some((**v).clone()),
                        None => None,
                    },
                    CellValue::Empty => None,
                    other => Some(other.clone()),
                };
                if let Some(v) = seeded {
                    store.insert_if_absent(CellKey::new(sheet.name(), row, col), v);
                }
            }
        }
        store
    }

    /// Number of resolved cells
    pub fn len(&self) -> usize {
        self.cells.len()
    }

    /// Check if the store holds no values
    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// Look up a resolved value
    pub fn get(&self, sheet: &str, row: u32, col: u16) -> Option<&CellValue> {
        self.cells.get(&CellKey::new(sheet, row, col))
    }

    /// Check whether a cell has resolved
    pub fn contains(&self, sheet: &str, row: u32, col: u16) -> bool {
        self.cells.contains_key(&CellKey::new(sheet, row, col))
    }

    /// Record a resolved value; a no-op when the key is already present.
    /// Returns whether the value was stored.
    pub fn insert_if_absent(&mut self, key: CellKey, value: CellValue) -> bool {
        use std::collections::hash_map::Entry;
        match self.cells.entry(key) {
            Entry::Occupied(_) => false,
            Entry::Vacant(slot) => {
                slot.insert(value);
                true
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn first_write_wins() {
        let mut store = ValueStore::new();

        assert!(store.insert_if_absent(CellKey::new("Data", 0, 0), CellValue::Number(1.0)));
        assert!(!store.insert_if_absent(CellKey::new("Data", 0, 0), CellValue::Number(2.0)));

        assert_eq!(store.get("Data", 0, 0), Some(&CellValue::Number(1.0)));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn absence_is_not_empty() {
        let store = ValueStore::new();
        assert_eq!(store.get("Data", 5, 5), None);
        assert!(!store.contains("Data", 5, 5));
    }

    #[test]
    fn seeding_takes_literals_and_cached_results() {
        let mut wb = Workbook::new();
        let sheet = wb.worksheet_mut(0).unwrap();
        sheet.set_cell_value("A1", 10.0).unwrap();
        sheet.set_cell_value("A2", "text").unwrap();
        sheet
            .set_cell_value_at(2, 0, CellValue::formula_with_cached("=A1", 10.0.into()))
            .unwrap();
        sheet.set_cell_formula("A4", "=A1").unwrap();

        let store = ValueStore::seed_from(&wb);

        assert_eq!(store.get("Sheet1", 0, 0), Some(&CellValue::Number(10.0)));
        assert_eq!(store.get("Sheet1", 1, 0), Some(&CellValue::string("text")));
        // Cached formula result counts as resolved
        assert_eq!(store.get("Sheet1", 2, 0), Some(&CellValue::Number(10.0)));
        // Formula without a cached result stays outstanding
        assert_eq!(store.get("Sheet1", 3, 0), None);
    }
}
