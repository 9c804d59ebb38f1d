//! The multi-pass resolution loop and workbook flattening
//!
//! Evaluation order between formula cells is not known in advance, so the
//! engine converges by repetition: each pass walks the outstanding cells in
//! a stable order and feeds successes straight back into the store, until a
//! pass resolves nothing or the pass budget runs out. Residual cells are a
//! normal outcome, not a failure.

use crate::evaluator::{evaluate, EvalContext};
use crate::parser::parse_shape;
use crate::shape::FormulaShape;
use crate::store::{CellKey, ValueStore};
use flatbook_core::{CellValue, Result, Workbook};

/// Pass budget used by [`resolve_workbook`]
pub const DEFAULT_MAX_PASSES: u32 = 3;

/// Outcome counters for one resolution run
#[derive(Debug, Clone, Default)]
pub struct ResolveStats {
    /// Formula cells outstanding after seeding (no cached result)
    pub formula_cells: usize,
    /// Cells resolved by the passes
    pub resolved: usize,
    /// Cells still unresolved when the run ended
    pub unresolved: usize,
    /// Passes actually executed
    pub passes: u32,
}

/// One outstanding formula cell: its location plus its parsed shape
struct PendingCell {
    key: CellKey,
    shape: FormulaShape,
}

/// Resolve a workbook's formulas with the default pass budget
pub fn resolve_workbook(workbook: &Workbook) -> (ValueStore, ResolveStats) {
    resolve_workbook_with(workbook, DEFAULT_MAX_PASSES)
}

/// Resolve a workbook's formulas with an explicit pass budget
///
/// Seeds the store from literals and cached formula results, then runs the
/// pass loop over the remaining formula cells. The outstanding list is
/// built in workbook order - sheet order, then row-major within each sheet -
/// and that order is part of the contract: values resolved earlier in a pass
/// are visible to cells evaluated later in the same pass.
pub fn resolve_workbook_with(workbook: &Workbook, max_passes: u32) -> (ValueStore, ResolveStats) {
    let mut store = ValueStore::seed_from(workbook);

    // Shapes are recognized once, up front; passes only re-evaluate.
    let mut pending: Vec<PendingCell> = Vec::new();
    for sheet in workbook.worksheets() {
        for (row, col, text) in sheet.formula_cells() {
            if !store.contains(sheet.name(), row, col) {
                pending.push(PendingCell {
                    key: CellKey::new(sheet.name(), row, col),
                    shape: parse_shape(text),
                });
            }
        }
    }

    let mut stats = ResolveStats {
        formula_cells: pending.len(),
        ..Default::default()
    };

    for pass in 1..=max_passes {
        if pending.is_empty() {
            break;
        }

        let outstanding = pending.len();
        let mut carried = Vec::with_capacity(outstanding);
        for cell in pending {
            let resolved = {
                let ctx = EvalContext::new(&store, &cell.key.sheet);
                evaluate(&cell.shape, &ctx)
            };
            match resolved {
                Some(value) => {
                    store.insert_if_absent(cell.key, value);
                }
                None => carried.push(cell),
            }
        }

        stats.passes = pass;
        let gained = outstanding - carried.len();
        log::debug!(
            "resolution pass {}: {} of {} outstanding cells resolved",
            pass,
            gained,
            outstanding
        );
        pending = carried;

        // A pass that makes no progress cannot be followed by one that does
        if gained == 0 {
            break;
        }
    }

    stats.resolved = stats.formula_cells - pending.len();
    stats.unresolved = pending.len();
    log::info!(
        "formula resolution finished: {} resolved, {} unresolved in {} passes",
        stats.resolved,
        stats.unresolved,
        stats.passes
    );

    (store, stats)
}

/// Produce a values-only copy of the workbook
///
/// Sheet names and order are preserved exactly. Formula cells become the
/// store's value for their coordinate, or stay absent when nothing resolved.
/// Literal cells are copied unchanged; absent cells stay absent. The output
/// never contains a formula.
pub fn flatten_workbook(source: &Workbook, store: &ValueStore) -> Result<Workbook> {
    let mut output = Workbook::empty();

    for sheet in source.worksheets() {
        let index = output.add_worksheet_with_name(sheet.name())?;
        let flat = output
            .worksheet_mut(index)
            .expect("worksheet was just added");

        for (row, col, value) in sheet.iter_cells() {
            match value {
                CellValue::Formula { .. } => {
                    if let Some(resolved) = store.get(sheet.name(), row, col) {
                        flat.set_cell_value_at(row, col, resolved.clone())?;
                    }
                }
                CellValue::Empty => {}
                literal => flat.set_cell_value_at(row, col, literal.clone())?,
            }
        }
    }

    Ok(output)
}
