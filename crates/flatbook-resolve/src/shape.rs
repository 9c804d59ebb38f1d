//! The closed formula grammar as a tagged union
//!
//! Shape recognition is a separate step from evaluation: [`crate::parser`]
//! produces these values once per cell, and [`crate::evaluator`] dispatches
//! over them on every pass.

use crate::reference::{CellRef, RangeRef};

/// An argument position inside MATCH, VLOOKUP, or CONCATENATE
#[derive(Debug, Clone, PartialEq)]
pub enum Operand {
    /// Quoted string literal
    Text(String),
    /// Numeric literal
    Number(f64),
    /// Cell reference
    Ref(CellRef),
    /// Nested VLOOKUP call
    Lookup(Box<VlookupCall>),
}

/// `VLOOKUP(needle, table, column, FALSE)` - exact match only
#[derive(Debug, Clone, PartialEq)]
pub struct VlookupCall {
    pub needle: Operand,
    pub table: RangeRef,
    /// 1-based column inside the table
    pub column: u32,
}

/// `MATCH(needle, range, 0)` - exact match over a 1-D range
#[derive(Debug, Clone, PartialEq)]
pub struct MatchCall {
    pub needle: Operand,
    pub range: RangeRef,
}

/// `INDEX(target, MATCH(..) [, MATCH(..)])` with an optional trailing
/// `/divisor` scale
#[derive(Debug, Clone, PartialEq)]
pub struct IndexMatch {
    pub target: RangeRef,
    pub row: MatchCall,
    /// Absent means a one-axis INDEX; the column offset defaults to 1
    pub column: Option<MatchCall>,
    pub divisor: Option<f64>,
}

/// One recognized formula shape
///
/// Recognition happens in declaration order; the first matching shape owns
/// the cell even if its evaluation later fails.
#[derive(Debug, Clone, PartialEq)]
pub enum FormulaShape {
    /// `=[Sheet!]A1` (a leading `+` is normalized away)
    DirectRef(CellRef),
    /// `=IFERROR(<index/match>, "")`; an unparseable or unresolvable inner
    /// expression yields the empty string rather than staying unresolved
    IfError(Option<IndexMatch>),
    /// `=INDEX(..., MATCH(...) [, MATCH(...)])[/divisor]`
    IndexMatch(IndexMatch),
    /// `=IF(OR(<probe>=0,<probe>=""),"",<ref>)` - blank guard
    Conditional { probe: CellRef, result: CellRef },
    /// `=ROUND(<ref>[/divisor], <digits>)`
    Round {
        value: CellRef,
        divisor: Option<f64>,
        digits: i32,
    },
    /// `=CONCATENATE(<arg>, ...)`
    Concat(Vec<Operand>),
    /// Anything else; never resolves
    Unsupported,
}
