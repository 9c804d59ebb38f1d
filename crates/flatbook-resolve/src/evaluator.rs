//! Shape evaluation
//!
//! One dispatch over [`FormulaShape`]. Every path returns
//! `Option<CellValue>`: `None` means "not resolved this attempt" - the
//! scheduler will try again next pass - and a `Some` result is final for
//! the cell.

use crate::range_ops;
use crate::reference::CellRef;
use crate::shape::{FormulaShape, IndexMatch, MatchCall, Operand, VlookupCall};
use crate::store::ValueStore;
use flatbook_core::CellValue;

/// Evaluation context: the store plus the sheet owning the formula cell,
/// which unqualified references resolve against
pub struct EvalContext<'a> {
    pub store: &'a ValueStore,
    pub current_sheet: &'a str,
}

impl<'a> EvalContext<'a> {
    pub fn new(store: &'a ValueStore, current_sheet: &'a str) -> Self {
        Self {
            store,
            current_sheet,
        }
    }
}

/// Evaluate a recognized shape against the store
pub fn evaluate(shape: &FormulaShape, ctx: &EvalContext) -> Option<CellValue> {
    match shape {
        FormulaShape::DirectRef(cell) => lookup_ref(cell, ctx),
        FormulaShape::IfError(inner) => Some(
            inner
                .as_ref()
                .and_then(|im| eval_index_match(im, ctx))
                .unwrap_or_else(|| CellValue::string("")),
        ),
        FormulaShape::IndexMatch(im) => eval_index_match(im, ctx),
        FormulaShape::Conditional { probe, result } => eval_conditional(probe, result, ctx),
        FormulaShape::Round {
            value,
            divisor,
            digits,
        } => eval_round(value, *divisor, *digits, ctx),
        FormulaShape::Concat(operands) => Some(eval_concat(operands, ctx)),
        FormulaShape::Unsupported => None,
    }
}

/// Resolve a reference through the store, defaulting the sheet
fn lookup_ref(cell: &CellRef, ctx: &EvalContext) -> Option<CellValue> {
    ctx.store
        .get(cell.sheet_or(ctx.current_sheet), cell.addr.row, cell.addr.col)
        .cloned()
}

/// Resolve a MATCH/VLOOKUP/CONCATENATE argument to a value
///
/// This is the shared helper for everything that can appear in a needle
/// position: literals pass through, references read the store, nested
/// VLOOKUP calls recurse.
fn resolve_operand(operand: &Operand, ctx: &EvalContext) -> Option<CellValue> {
    match operand {
        Operand::Text(s) => Some(CellValue::string(s.clone())),
        Operand::Number(n) => Some(CellValue::Number(*n)),
        Operand::Ref(cell) => lookup_ref(cell, ctx),
        Operand::Lookup(call) => eval_vlookup(call, ctx),
    }
}

fn eval_vlookup(call: &VlookupCall, ctx: &EvalContext) -> Option<CellValue> {
    let needle = resolve_operand(&call.needle, ctx)?;
    range_ops::vlookup(
        ctx.store,
        &needle,
        call.table.sheet_or(ctx.current_sheet),
        &call.table.range,
        call.column,
    )
}

fn eval_match(call: &MatchCall, ctx: &EvalContext) -> Option<u32> {
    let needle = resolve_operand(&call.needle, ctx)?;
    range_ops::match_in_range(
        ctx.store,
        &needle,
        call.range.sheet_or(ctx.current_sheet),
        &call.range.range,
    )
}

fn eval_index_match(im: &IndexMatch, ctx: &EvalContext) -> Option<CellValue> {
    let row_offset = eval_match(&im.row, ctx)?;
    let col_offset = match &im.column {
        Some(call) => eval_match(call, ctx)?,
        None => 1,
    };

    let value = range_ops::index_in_range(
        ctx.store,
        im.target.sheet_or(ctx.current_sheet),
        &im.target.range,
        row_offset,
        col_offset,
    )?;

    Some(apply_divisor(value, im.divisor))
}

/// Scale a numeric value by the trailing divisor; anything non-numeric
/// passes through unscaled
fn apply_divisor(value: CellValue, divisor: Option<f64>) -> CellValue {
    match (&value, divisor) {
        (CellValue::Number(n), Some(d)) if d != 0.0 => CellValue::Number(n / d),
        _ => value,
    }
}

fn eval_conditional(probe: &CellRef, result: &CellRef, ctx: &EvalContext) -> Option<CellValue> {
    let blank = match lookup_ref(probe, ctx) {
        None => true,
        Some(CellValue::Number(n)) => n == 0.0,
        Some(CellValue::String(s)) => s.is_empty(),
        Some(CellValue::Empty) => true,
        Some(_) => false,
    };

    if blank {
        Some(CellValue::string(""))
    } else {
        lookup_ref(result, ctx)
    }
}

fn eval_round(
    value: &CellRef,
    divisor: Option<f64>,
    digits: i32,
    ctx: &EvalContext,
) -> Option<CellValue> {
    match lookup_ref(value, ctx)? {
        CellValue::Number(n) => {
            let n = match divisor {
                Some(d) if d != 0.0 => n / d,
                _ => n,
            };
            Some(CellValue::Number(round_to(n, digits)))
        }
        // Non-numeric values come back unchanged rather than failing
        other => Some(other),
    }
}

/// Round half away from zero to `digits` decimal places
fn round_to(n: f64, digits: i32) -> f64 {
    let factor = 10f64.powi(digits);
    (n * factor).round() / factor
}

/// String-join the operands; unresolved references contribute nothing
fn eval_concat(operands: &[Operand], ctx: &EvalContext) -> CellValue {
    let mut out = String::new();
    for operand in operands {
        if let Some(v) = resolve_operand(operand, ctx) {
            out.push_str(&v.display_text());
        }
    }
    CellValue::String(out)
}
