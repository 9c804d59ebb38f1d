//! Positional lookup emulation over the value store
//!
//! MATCH, INDEX, and VLOOKUP in the shapes this engine recognizes only ever
//! address store-backed ranges. All three primitives degrade to `None` on
//! anything they cannot answer; nothing here errors.

use crate::store::ValueStore;
use flatbook_core::{CellRange, CellValue};

/// Compare two values the way the lookup shapes do: rendered to display
/// text, trimmed, case-sensitive. Exact matches only.
fn values_match(a: &CellValue, b: &CellValue) -> bool {
    a.display_text().trim() == b.display_text().trim()
}

/// Find the 1-based position of `needle` in a 1-D range
///
/// Single-column ranges scan top to bottom, single-row ranges left to right.
/// A range spanning both axes is not a valid MATCH vector. Cells missing
/// from the store never match; they do not abort the scan.
pub fn match_in_range(
    store: &ValueStore,
    needle: &CellValue,
    sheet: &str,
    range: &CellRange,
) -> Option<u32> {
    if range.is_single_column() {
        let col = range.start.col;
        for (i, row) in (range.start.row..=range.end.row).enumerate() {
            if let Some(v) = store.get(sheet, row, col) {
                if values_match(needle, v) {
                    return Some(i as u32 + 1);
                }
            }
        }
        None
    } else if range.is_single_row() {
        let row = range.start.row;
        for (i, col) in (range.start.col..=range.end.col).enumerate() {
            if let Some(v) = store.get(sheet, row, col) {
                if values_match(needle, v) {
                    return Some(i as u32 + 1);
                }
            }
        }
        None
    } else {
        None
    }
}

/// Fetch the value at a 1-based (row, column) offset inside a range
///
/// The target is `(start_row + row_offset - 1, start_col + col_offset - 1)`.
/// Offsets are not clamped to the declared extent: an offset past the end of
/// the range still resolves when the store holds a value at the computed
/// coordinate (misdeclared lookup tables are common; the miss case behaves
/// identically either way).
pub fn index_in_range(
    store: &ValueStore,
    sheet: &str,
    range: &CellRange,
    row_offset: u32,
    col_offset: u32,
) -> Option<CellValue> {
    if row_offset == 0 || col_offset == 0 {
        return None;
    }
    let row = range.start.row.checked_add(row_offset - 1)?;
    let col = (range.start.col as u32).checked_add(col_offset - 1)?;
    store.get(sheet, row, u16::try_from(col).ok()?).cloned()
}

/// Scan the first column of `table` for `needle` and return the value in
/// the matched row at the 1-based `column` of the table
pub fn vlookup(
    store: &ValueStore,
    needle: &CellValue,
    sheet: &str,
    table: &CellRange,
    column: u32,
) -> Option<CellValue> {
    if column == 0 {
        return None;
    }
    let value_col = (table.start.col as u32).checked_add(column - 1)?;
    let value_col = u16::try_from(value_col).ok()?;

    for row in table.start.row..=table.end.row {
        if let Some(key) = store.get(sheet, row, table.start.col) {
            if values_match(needle, key) {
                return store.get(sheet, row, value_col).cloned();
            }
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::CellKey;
    use pretty_assertions::assert_eq;

    fn range(s: &str) -> CellRange {
        CellRange::parse(s).unwrap()
    }

    /// Store with "Lookup" B2:C4 holding keys X/Y/Z and values 42/7/9
    fn lookup_table() -> ValueStore {
        let mut store = ValueStore::new();
        for (i, (key, value)) in [("X", 42.0), ("Y", 7.0), ("Z", 9.0)].iter().enumerate() {
            let row = 1 + i as u32;
            store.insert_if_absent(CellKey::new("Lookup", row, 1), CellValue::string(*key));
            store.insert_if_absent(CellKey::new("Lookup", row, 2), CellValue::Number(*value));
        }
        store
    }

    #[test]
    fn match_in_column() {
        let store = lookup_table();
        let needle = CellValue::string("Y");
        assert_eq!(
            match_in_range(&store, &needle, "Lookup", &range("B2:B4")),
            Some(2)
        );

        let absent = CellValue::string("Q");
        assert_eq!(
            match_in_range(&store, &absent, "Lookup", &range("B2:B4")),
            None
        );
    }

    #[test]
    fn match_in_row() {
        let mut store = ValueStore::new();
        for (i, label) in ["FY22", "FY23", "FY24"].iter().enumerate() {
            store.insert_if_absent(
                CellKey::new("Data", 0, 1 + i as u16),
                CellValue::string(*label),
            );
        }

        let needle = CellValue::string("FY24");
        assert_eq!(
            match_in_range(&store, &needle, "Data", &range("B1:D1")),
            Some(3)
        );
    }

    #[test]
    fn match_normalizes_text_but_keeps_case() {
        let mut store = ValueStore::new();
        store.insert_if_absent(CellKey::new("Data", 0, 0), CellValue::string("  Revenue "));
        store.insert_if_absent(CellKey::new("Data", 1, 0), CellValue::Number(42.0));

        // Trimmed on both sides
        let needle = CellValue::string("Revenue");
        assert_eq!(
            match_in_range(&store, &needle, "Data", &range("A1:A2")),
            Some(1)
        );

        // Case matters
        let wrong_case = CellValue::string("revenue");
        assert_eq!(
            match_in_range(&store, &wrong_case, "Data", &range("A1:A2")),
            None
        );

        // Numbers compare through their display text
        let as_text = CellValue::string("42");
        assert_eq!(
            match_in_range(&store, &as_text, "Data", &range("A1:A2")),
            Some(2)
        );
    }

    #[test]
    fn match_rejects_two_dimensional_ranges() {
        let store = lookup_table();
        let needle = CellValue::string("X");
        assert_eq!(
            match_in_range(&store, &needle, "Lookup", &range("B2:C4")),
            None
        );
    }

    #[test]
    fn match_skips_unresolved_cells() {
        let mut store = ValueStore::new();
        // B2 and B3 unresolved, B4 holds the needle
        store.insert_if_absent(CellKey::new("Data", 3, 1), CellValue::string("hit"));

        let needle = CellValue::string("hit");
        assert_eq!(
            match_in_range(&store, &needle, "Data", &range("B2:B4")),
            Some(3)
        );
    }

    #[test]
    fn index_inside_declared_range() {
        let store = lookup_table();
        assert_eq!(
            index_in_range(&store, "Lookup", &range("B2:C4"), 1, 2),
            Some(CellValue::Number(42.0))
        );
        assert_eq!(
            index_in_range(&store, "Lookup", &range("B2:C4"), 3, 1),
            Some(CellValue::string("Z"))
        );
        // Offsets are 1-based; zero is meaningless
        assert_eq!(index_in_range(&store, "Lookup", &range("B2:C4"), 0, 1), None);
    }

    #[test]
    fn index_past_declared_bounds() {
        let mut store = lookup_table();
        // A value just below the declared table
        store.insert_if_absent(CellKey::new("Lookup", 4, 1), CellValue::string("extra"));

        // Row offset 4 runs past B2:C4, but the store has a value there
        assert_eq!(
            index_in_range(&store, "Lookup", &range("B2:C4"), 4, 1),
            Some(CellValue::string("extra"))
        );
        // Same offset into a column with nothing stored misses
        assert_eq!(index_in_range(&store, "Lookup", &range("B2:C4"), 5, 1), None);
    }

    #[test]
    fn vlookup_exact_match() {
        let store = lookup_table();
        let needle = CellValue::string("X");
        assert_eq!(
            vlookup(&store, &needle, "Lookup", &range("B2:C4"), 2),
            Some(CellValue::Number(42.0))
        );

        let missing = CellValue::string("Q");
        assert_eq!(vlookup(&store, &missing, "Lookup", &range("B2:C4"), 2), None);
    }

    #[test]
    fn vlookup_first_column_returns_key() {
        let store = lookup_table();
        let needle = CellValue::string("Z");
        assert_eq!(
            vlookup(&store, &needle, "Lookup", &range("B2:C4"), 1),
            Some(CellValue::string("Z"))
        );
    }

    #[test]
    fn vlookup_matched_row_without_value_misses() {
        let mut store = ValueStore::new();
        store.insert_if_absent(CellKey::new("Data", 0, 0), CellValue::string("key"));
        // No value in column 2 of the matched row
        let needle = CellValue::string("key");
        assert_eq!(vlookup(&store, &needle, "Data", &range("A1:B3"), 2), None);
    }
}
