//! Formula shape recognition
//!
//! Turns a formula string into a [`FormulaShape`]. Recognition is ordered:
//! direct reference, IFERROR wrapper, INDEX/MATCH, blank-guard IF, ROUND,
//! CONCATENATE. The first shape whose syntax matches owns the cell; a match
//! whose innards fail to parse collapses to [`FormulaShape::Unsupported`]
//! (permanently unresolved) - except IFERROR, whose contract turns its own
//! failures into the empty string.

use crate::reference::{CellRef, RangeRef};
use crate::shape::{FormulaShape, IndexMatch, MatchCall, Operand, VlookupCall};
use lazy_regex::regex_captures;

/// Parse a formula string into its recognized shape
pub fn parse_shape(formula: &str) -> FormulaShape {
    let body = match formula.trim().strip_prefix('=') {
        Some(b) => b.trim(),
        None => return FormulaShape::Unsupported,
    };
    // `=+B95` is the same as `=B95`
    let body = body.strip_prefix('+').map(str::trim).unwrap_or(body);

    if let Some(cell) = CellRef::parse(body) {
        return FormulaShape::DirectRef(cell);
    }
    if let Some((inner, rest)) = split_call(body, "IFERROR") {
        return parse_iferror(inner, rest);
    }
    if split_call(body, "INDEX").is_some() {
        return match parse_index_match(body) {
            Some(im) => FormulaShape::IndexMatch(im),
            None => FormulaShape::Unsupported,
        };
    }
    if let Some((inner, rest)) = split_call(body, "IF") {
        if rest.is_empty() {
            return parse_conditional(inner).unwrap_or(FormulaShape::Unsupported);
        }
        return FormulaShape::Unsupported;
    }
    if let Some((inner, rest)) = split_call(body, "ROUND") {
        if rest.is_empty() {
            return parse_round(inner).unwrap_or(FormulaShape::Unsupported);
        }
        return FormulaShape::Unsupported;
    }
    if let Some((inner, rest)) = split_call(body, "CONCATENATE") {
        if rest.is_empty() {
            return parse_concat(inner).unwrap_or(FormulaShape::Unsupported);
        }
        return FormulaShape::Unsupported;
    }

    FormulaShape::Unsupported
}

/// `IFERROR(<inner>, "")` - the fallback must be the empty string
fn parse_iferror(inner: &str, rest: &str) -> FormulaShape {
    if !rest.is_empty() {
        return FormulaShape::Unsupported;
    }
    let args = split_top_level(inner, ',');
    if args.len() != 2 || parse_quoted(args[1]) != Some(String::new()) {
        return FormulaShape::Unsupported;
    }
    // A first argument that is not a parseable INDEX/MATCH expression still
    // belongs to this shape; it just always takes the fallback branch.
    FormulaShape::IfError(parse_index_match(args[0]))
}

/// `INDEX(range, MATCH(..) [, MATCH(..)])` with optional `/divisor` suffix
fn parse_index_match(text: &str) -> Option<IndexMatch> {
    let (inner, rest) = split_call(text, "INDEX")?;

    let divisor = if rest.is_empty() {
        None
    } else {
        let (_, digits) = regex_captures!(r"^/\s*([0-9]+(?:\.[0-9]+)?)$", rest)?;
        Some(digits.parse::<f64>().ok()?)
    };

    let args = split_top_level(inner, ',');
    if args.len() < 2 || args.len() > 3 {
        return None;
    }

    let target = RangeRef::parse(args[0])?;
    let row = parse_match_call(args[1])?;
    let column = match args.get(2) {
        Some(arg) => Some(parse_match_call(arg)?),
        None => None,
    };

    Some(IndexMatch {
        target,
        row,
        column,
        divisor,
    })
}

/// `MATCH(needle, range, 0)` - only exact match is recognized
fn parse_match_call(text: &str) -> Option<MatchCall> {
    let (inner, rest) = split_call(text, "MATCH")?;
    if !rest.is_empty() {
        return None;
    }
    let args = split_top_level(inner, ',');
    if args.len() != 3 || args[2] != "0" {
        return None;
    }
    Some(MatchCall {
        needle: parse_operand(args[0])?,
        range: RangeRef::parse(args[1])?,
    })
}

/// `VLOOKUP(needle, table, column, FALSE)` - the fourth argument, when
/// present, must request exact matching
fn parse_vlookup(text: &str) -> Option<VlookupCall> {
    let (inner, rest) = split_call(text, "VLOOKUP")?;
    if !rest.is_empty() {
        return None;
    }
    let args = split_top_level(inner, ',');
    if args.len() < 3 || args.len() > 4 {
        return None;
    }
    if let Some(mode) = args.get(3) {
        if !mode.eq_ignore_ascii_case("FALSE") && *mode != "0" {
            return None;
        }
    }

    let column: u32 = args[2].parse().ok()?;
    if column == 0 {
        return None;
    }

    Some(VlookupCall {
        needle: parse_operand(args[0])?,
        table: RangeRef::parse(args[1])?,
        column,
    })
}

/// `IF(OR(<probe>=0,<probe>=""),"",<ref>)`
fn parse_conditional(inner: &str) -> Option<FormulaShape> {
    let args = split_top_level(inner, ',');
    if args.len() != 3 || parse_quoted(args[1]) != Some(String::new()) {
        return None;
    }

    let (or_inner, or_rest) = split_call(args[0], "OR")?;
    if !or_rest.is_empty() {
        return None;
    }
    let checks = split_top_level(or_inner, ',');
    if checks.len() != 2 {
        return None;
    }

    let (probe_a, zero_a) = parse_blank_check(checks[0])?;
    let (probe_b, zero_b) = parse_blank_check(checks[1])?;
    // One comparison against 0 and one against "", over the same cell
    if probe_a != probe_b || zero_a == zero_b {
        return None;
    }

    let result = CellRef::parse(args[2])?;
    Some(FormulaShape::Conditional {
        probe: probe_a,
        result,
    })
}

/// One side of the OR: `<ref>=0` or `<ref>=""`. Returns the probed cell and
/// whether the comparison was against zero.
fn parse_blank_check(text: &str) -> Option<(CellRef, bool)> {
    let (lhs, rhs) = text.split_once('=')?;
    let probe = CellRef::parse(lhs)?;
    let rhs = rhs.trim();
    if rhs == "0" {
        Some((probe, true))
    } else if parse_quoted(rhs) == Some(String::new()) {
        Some((probe, false))
    } else {
        None
    }
}

/// `ROUND(<ref>[/divisor], <digits>)`
fn parse_round(inner: &str) -> Option<FormulaShape> {
    let args = split_top_level(inner, ',');
    if args.len() != 2 {
        return None;
    }
    let digits: i32 = args[1].parse().ok()?;

    let pieces = split_top_level(args[0], '/');
    let (value, divisor) = match pieces.as_slice() {
        [reference] => (CellRef::parse(reference)?, None),
        [reference, scale] => (CellRef::parse(reference)?, Some(scale.parse::<f64>().ok()?)),
        _ => return None,
    };

    Some(FormulaShape::Round {
        value,
        divisor,
        digits,
    })
}

/// `CONCATENATE(<arg>, ...)`
fn parse_concat(inner: &str) -> Option<FormulaShape> {
    let args = split_top_level(inner, ',');
    if args.is_empty() {
        return None;
    }
    let operands = args
        .iter()
        .map(|a| parse_operand(a))
        .collect::<Option<Vec<_>>>()?;
    Some(FormulaShape::Concat(operands))
}

/// A MATCH/VLOOKUP/CONCATENATE argument: quoted literal, number, nested
/// VLOOKUP, or cell reference
fn parse_operand(text: &str) -> Option<Operand> {
    let text = text.trim();
    if let Some(s) = parse_quoted(text) {
        return Some(Operand::Text(s));
    }
    if let Some(call) = parse_vlookup(text) {
        return Some(Operand::Lookup(Box::new(call)));
    }
    if let Ok(n) = text.parse::<f64>() {
        return Some(Operand::Number(n));
    }
    CellRef::parse(text).map(Operand::Ref)
}

/// Split `NAME(args)rest` into `(args, rest)`, matching the call name
/// case-insensitively and balancing parentheses outside quoted regions
fn split_call<'a>(text: &'a str, name: &str) -> Option<(&'a str, &'a str)> {
    let text = text.trim();
    let head = text.get(..name.len())?;
    if !head.eq_ignore_ascii_case(name) {
        return None;
    }
    let tail = &text[name.len()..];
    if !tail.starts_with('(') {
        return None;
    }

    let mut depth = 0usize;
    let mut in_text = false; // inside "..."
    let mut in_sheet = false; // inside '...'
    for (i, c) in tail.char_indices() {
        match c {
            '"' if !in_sheet => in_text = !in_text,
            '\'' if !in_text => in_sheet = !in_sheet,
            '(' if !in_text && !in_sheet => depth += 1,
            ')' if !in_text && !in_sheet => {
                depth -= 1;
                if depth == 0 {
                    return Some((&tail[1..i], tail[i + 1..].trim()));
                }
            }
            _ => {}
        }
    }
    None
}

/// Split on a separator at paren depth zero, outside quoted regions;
/// pieces come back trimmed
fn split_top_level(text: &str, sep: char) -> Vec<&str> {
    let mut pieces = Vec::new();
    let mut start = 0usize;
    let mut depth = 0usize;
    let mut in_text = false;
    let mut in_sheet = false;

    for (i, c) in text.char_indices() {
        match c {
            '"' if !in_sheet => in_text = !in_text,
            '\'' if !in_text => in_sheet = !in_sheet,
            '(' if !in_text && !in_sheet => depth += 1,
            ')' if !in_text && !in_sheet => depth = depth.saturating_sub(1),
            c if c == sep && depth == 0 && !in_text && !in_sheet => {
                pieces.push(text[start..i].trim());
                start = i + sep.len_utf8();
            }
            _ => {}
        }
    }
    pieces.push(text[start..].trim());
    pieces
}

/// Unquote a `"..."` literal; interior quotes must be doubled
fn parse_quoted(text: &str) -> Option<String> {
    let inner = text.trim().strip_prefix('"')?.strip_suffix('"')?;
    let mut out = String::with_capacity(inner.len());
    let mut chars = inner.chars();
    while let Some(c) = chars.next() {
        if c == '"' {
            if chars.next() != Some('"') {
                return None;
            }
            out.push('"');
        } else {
            out.push(c);
        }
    }
    Some(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use flatbook_core::CellAddress;
    use pretty_assertions::assert_eq;

    fn cell(addr: &str) -> CellRef {
        CellRef {
            sheet: None,
            addr: CellAddress::parse(addr).unwrap(),
        }
    }

    #[test]
    fn direct_reference() {
        assert_eq!(parse_shape("=B95"), FormulaShape::DirectRef(cell("B95")));
        assert_eq!(parse_shape("=$B$95"), FormulaShape::DirectRef(cell("B95")));

        match parse_shape("='Key Ratios'!C4") {
            FormulaShape::DirectRef(r) => assert_eq!(r.sheet.as_deref(), Some("Key Ratios")),
            other => panic!("expected direct ref, got {:?}", other),
        }
    }

    #[test]
    fn plus_prefix_normalizes() {
        assert_eq!(parse_shape("=+B95"), parse_shape("=B95"));
        assert_eq!(parse_shape("=+ B95"), parse_shape("=B95"));
    }

    #[test]
    fn iferror_wraps_index_match() {
        let shape = parse_shape(
            "=IFERROR(INDEX(Data!B2:I40,MATCH(\"Revenue\",Data!A2:A40,0),MATCH(C1,Data!B1:I1,0))/1000,\"\")",
        );
        match shape {
            FormulaShape::IfError(Some(im)) => {
                assert_eq!(im.target.range.to_a1_string(), "B2:I40");
                assert_eq!(im.divisor, Some(1000.0));
                assert!(im.column.is_some());
            }
            other => panic!("expected IFERROR shape, got {:?}", other),
        }
    }

    #[test]
    fn iferror_with_unparseable_inner_still_matches() {
        // The wrapper shape owns the cell; the broken inner expression just
        // means the fallback branch always wins.
        assert_eq!(
            parse_shape("=IFERROR(SUM(A1:A9),\"\")"),
            FormulaShape::IfError(None)
        );
    }

    #[test]
    fn iferror_with_other_fallback_is_unsupported() {
        assert_eq!(
            parse_shape("=IFERROR(INDEX(B2:I7,MATCH(A1,A2:A9,0)),\"n/a\")"),
            FormulaShape::Unsupported
        );
    }

    #[test]
    fn index_match_single_axis() {
        let shape = parse_shape("=INDEX(Data!B2:B40,MATCH(\"Total assets\",Data!A2:A40,0))");
        match shape {
            FormulaShape::IndexMatch(im) => {
                assert!(im.column.is_none());
                assert_eq!(im.divisor, None);
                assert_eq!(
                    im.row.needle,
                    Operand::Text("Total assets".to_string())
                );
            }
            other => panic!("expected INDEX/MATCH shape, got {:?}", other),
        }
    }

    #[test]
    fn index_match_with_divisor() {
        let shape = parse_shape("=INDEX(B2:I40,MATCH(A1,A2:A40,0),MATCH(B1,B1:I1,0))/100");
        match shape {
            FormulaShape::IndexMatch(im) => assert_eq!(im.divisor, Some(100.0)),
            other => panic!("expected INDEX/MATCH shape, got {:?}", other),
        }
    }

    #[test]
    fn index_match_with_nested_vlookup() {
        let shape =
            parse_shape("=INDEX(B2:I40,MATCH(VLOOKUP($A5,Map!A2:B40,2,FALSE),A2:A40,0))");
        match shape {
            FormulaShape::IndexMatch(im) => match im.row.needle {
                Operand::Lookup(call) => {
                    assert_eq!(call.column, 2);
                    assert_eq!(call.table.sheet.as_deref(), Some("Map"));
                }
                other => panic!("expected nested VLOOKUP, got {:?}", other),
            },
            other => panic!("expected INDEX/MATCH shape, got {:?}", other),
        }
    }

    #[test]
    fn approximate_match_is_not_recognized() {
        // MATCH mode 1 and VLOOKUP range lookup are outside the grammar
        assert_eq!(
            parse_shape("=INDEX(B2:B9,MATCH(A1,A2:A9,1))"),
            FormulaShape::Unsupported
        );
        assert_eq!(
            parse_shape("=INDEX(B2:B9,MATCH(VLOOKUP(A1,C1:D9,2,TRUE),A2:A9,0))"),
            FormulaShape::Unsupported
        );
    }

    #[test]
    fn conditional_blank_guard() {
        let shape = parse_shape("=IF(OR(B5=0,B5=\"\"),\"\",B5)");
        assert_eq!(
            shape,
            FormulaShape::Conditional {
                probe: cell("B5"),
                result: cell("B5"),
            }
        );

        // Comparison order is not significant
        let swapped = parse_shape("=IF(OR(B5=\"\",B5=0),\"\",B5)");
        assert_eq!(shape, swapped);
    }

    #[test]
    fn conditional_with_mismatched_probes_is_unsupported() {
        assert_eq!(
            parse_shape("=IF(OR(B5=0,C5=\"\"),\"\",B5)"),
            FormulaShape::Unsupported
        );
        assert_eq!(
            parse_shape("=IF(OR(B5=0,B5=0),\"\",B5)"),
            FormulaShape::Unsupported
        );
    }

    #[test]
    fn round_shapes() {
        assert_eq!(
            parse_shape("=ROUND(B7,2)"),
            FormulaShape::Round {
                value: cell("B7"),
                divisor: None,
                digits: 2,
            }
        );
        assert_eq!(
            parse_shape("=ROUND(A1/3,2)"),
            FormulaShape::Round {
                value: cell("A1"),
                divisor: Some(3.0),
                digits: 2,
            }
        );
    }

    #[test]
    fn concatenate_shape() {
        let shape = parse_shape("=CONCATENATE(\"FY\",B1,\" results\")");
        assert_eq!(
            shape,
            FormulaShape::Concat(vec![
                Operand::Text("FY".to_string()),
                Operand::Ref(cell("B1")),
                Operand::Text(" results".to_string()),
            ])
        );
    }

    #[test]
    fn quoted_literal_escapes() {
        assert_eq!(parse_quoted("\"\""), Some(String::new()));
        assert_eq!(parse_quoted("\"a\"\"b\""), Some("a\"b".to_string()));
        assert_eq!(parse_quoted("\"lone\"quote\""), None);
        assert_eq!(parse_quoted("bare"), None);
    }

    #[test]
    fn everything_else_is_unsupported() {
        assert_eq!(parse_shape("=SUM(A1:A9)"), FormulaShape::Unsupported);
        assert_eq!(parse_shape("=A1+B1"), FormulaShape::Unsupported);
        assert_eq!(parse_shape("=TODAY()"), FormulaShape::Unsupported);
        assert_eq!(parse_shape("not a formula"), FormulaShape::Unsupported);
        assert_eq!(parse_shape("=INDEX(B2:B9)"), FormulaShape::Unsupported);
        assert_eq!(parse_shape("=ROUND(B7,2)+1"), FormulaShape::Unsupported);
    }

    #[test]
    fn splitter_respects_quotes_and_depth() {
        let args = split_top_level("\"a,b\",MATCH(C1,D1:D9,0),'S,T'!A1", ',');
        assert_eq!(args, vec!["\"a,b\"", "MATCH(C1,D1:D9,0)", "'S,T'!A1"]);

        let (inner, rest) = split_call("INDEX(A1:B2,MATCH(\"x(\",C1:C9,0))/10", "INDEX").unwrap();
        assert_eq!(inner, "A1:B2,MATCH(\"x(\",C1:C9,0)");
        assert_eq!(rest, "/10");
    }
}
