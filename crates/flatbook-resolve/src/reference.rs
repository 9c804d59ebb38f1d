//! Sheet-qualified cell and range references
//!
//! References appear in many surface forms: `B7`, `$B$7`, `Sheet2!C4`,
//! `'Key Ratios'!C4`, `Data!B2:I7`. Parsing is best-effort: malformed input
//! yields `None` and the downstream lookup simply misses.

use flatbook_core::{CellAddress, CellRange};
use lazy_regex::regex_captures;

/// A cell reference with an optional sheet qualifier
///
/// An absent sheet is resolved against the evaluation's current sheet.
#[derive(Debug, Clone, PartialEq)]
pub struct CellRef {
    pub sheet: Option<String>,
    pub addr: CellAddress,
}

impl CellRef {
    /// Parse a reference like `B7`, `$C$4`, `Sheet2!A1`, or `'My Sheet'!A1`
    pub fn parse(text: &str) -> Option<Self> {
        let (sheet, coord) = split_sheet_qualifier(text.trim())?;
        let addr = CellAddress::parse(coord).ok()?;
        Some(Self { sheet, addr })
    }

    /// The sheet this reference points at, given the current sheet
    pub fn sheet_or<'a>(&'a self, current: &'a str) -> &'a str {
        self.sheet.as_deref().unwrap_or(current)
    }
}

/// A range reference with an optional sheet qualifier
#[derive(Debug, Clone, PartialEq)]
pub struct RangeRef {
    pub sheet: Option<String>,
    pub range: CellRange,
}

impl RangeRef {
    /// Parse a range like `B2:I7` or `Sheet1!B2:I7`
    ///
    /// A bare coordinate parses as a single-cell range.
    pub fn parse(text: &str) -> Option<Self> {
        let (sheet, coords) = split_sheet_qualifier(text.trim())?;
        let range = CellRange::parse(coords).ok()?;
        Some(Self { sheet, range })
    }

    /// The sheet this range lies on, given the current sheet
    pub fn sheet_or<'a>(&'a self, current: &'a str) -> &'a str {
        self.sheet.as_deref().unwrap_or(current)
    }
}

/// Split an optional sheet qualifier off a reference
///
/// Handles the quoted form (`'Key Ratios'!C4`, with `''` escaping an
/// embedded quote) and the bare form (`Sheet2!C4`). Text without a `!` has
/// no qualifier.
fn split_sheet_qualifier(text: &str) -> Option<(Option<String>, &str)> {
    if text.starts_with('\'') {
        let (_, name, coords) = regex_captures!(r"^'((?:[^']|'')+)'!(.+)$", text)?;
        Some((Some(name.replace("''", "'")), coords))
    } else if let Some((sheet, coords)) = text.split_once('!') {
        if sheet.is_empty() {
            return None;
        }
        Some((Some(sheet.to_string()), coords))
    } else {
        Some((None, text))
    }
}
