//! XLSX/XLSM reader
//!
//! Reads the parts the resolver needs: sheet names in workbook order, cell
//! values, and formulas with their cached results. Styles, comments, and the
//! rest of the container are ignored; a `.xlsm`'s VBA project is simply
//! never opened.

use std::collections::HashMap;
use std::fs::File;
use std::io::{BufReader, Read, Seek};
use std::path::Path;

use quick_xml::events::Event;
use quick_xml::reader::Reader;

use crate::error::{XlsxError, XlsxResult};
use flatbook_core::{CellAddress, CellError, CellValue, Workbook, Worksheet};

/// Decode Excel's `_xHHHH_` escape sequences in strings.
///
/// Excel uses this format to encode special characters in XML:
/// `_x000d_` = CR, `_x000a_` = LF, `_x0009_` = Tab, `_x005f_` = underscore.
fn decode_excel_escapes(s: &str) -> String {
    let mut result = String::with_capacity(s.len());
    let mut rest = s;

    while let Some(pos) = rest.find("_x") {
        let (head, candidate) = rest.split_at(pos);
        result.push_str(head);

        // A valid escape is exactly `_x` + 4 hex digits + `_`
        let code = candidate
            .get(2..6)
            .filter(|hex| hex.bytes().all(|b| b.is_ascii_hexdigit()))
            .filter(|_| candidate.as_bytes().get(6) == Some(&b'_'))
            .and_then(|hex| u32::from_str_radix(hex, 16).ok())
            .and_then(char::from_u32);

        match code {
            Some(c) => {
                result.push(c);
                rest = &candidate[7..];
            }
            None => {
                result.push_str("_x");
                rest = &candidate[2..];
            }
        }
    }

    result.push_str(rest);
    result
}

/// XLSX file reader
pub struct XlsxReader;

impl XlsxReader {
    /// Read a workbook from a file path
    pub fn read_file<P: AsRef<Path>>(path: P) -> XlsxResult<Workbook> {
        let file = File::open(path)?;
        Self::read(file)
    }

    /// Read a workbook from a reader
    pub fn read<R: Read + Seek>(reader: R) -> XlsxResult<Workbook> {
        let mut archive = zip::ZipArchive::new(reader)?;

        if archive.by_name("[Content_Types].xml").is_err() {
            return Err(XlsxError::InvalidFormat(
                "Missing [Content_Types].xml".into(),
            ));
        }

        let shared_strings = Self::read_shared_strings(&mut archive)?;
        let sheet_info = Self::read_workbook_xml(&mut archive)?;
        let sheet_paths = Self::read_workbook_rels(&mut archive)?;

        let mut workbook = Workbook::empty();

        for (name, r_id) in &sheet_info {
            if let Some(path) = sheet_paths.get(r_id) {
                let index = workbook.add_worksheet_with_name(name)?;
                let sheet = workbook
                    .worksheet_mut(index)
                    .expect("worksheet was just added");
                Self::read_worksheet(&mut archive, path, sheet, &shared_strings)?;
            }
        }

        if workbook.is_empty() {
            workbook.add_worksheet()?;
        }

        Ok(workbook)
    }

    /// Read the shared strings table
    fn read_shared_strings<R: Read + Seek>(
        archive: &mut zip::ZipArchive<R>,
    ) -> XlsxResult<Vec<String>> {
        let mut strings = Vec::new();

        let file = match archive.by_name("xl/sharedStrings.xml") {
            Ok(f) => f,
            Err(_) => return Ok(strings), // No shared strings is valid
        };

        let reader = BufReader::new(file);
        let mut xml_reader = Reader::from_reader(reader);
        xml_reader.trim_text(true);

        let mut buf = Vec::new();
        let mut current = String::new();
        let mut in_si = false;
        let mut in_t = false;

        loop {
            match xml_reader.read_event_into(&mut buf) {
                Ok(Event::Start(e)) => match e.name().as_ref() {
                    b"si" => {
                        in_si = true;
                        current.clear();
                    }
                    b"t" if in_si => in_t = true,
                    _ => {}
                },
                Ok(Event::End(e)) => match e.name().as_ref() {
                    b"si" => {
                        strings.push(decode_excel_escapes(&current));
                        current.clear();
                        in_si = false;
                    }
                    b"t" => in_t = false,
                    _ => {}
                },
                Ok(Event::Text(e)) if in_t => {
                    if let Ok(text) = e.unescape() {
                        current.push_str(&text);
                    }
                }
                Ok(Event::Eof) => break,
                Err(e) => return Err(XlsxError::Xml(e)),
                _ => {}
            }
            buf.clear();
        }

        Ok(strings)
    }

    /// Read workbook.xml for sheet names and their relationship ids
    fn read_workbook_xml<R: Read + Seek>(
        archive: &mut zip::ZipArchive<R>,
    ) -> XlsxResult<Vec<(String, String)>> {
        let file = archive
            .by_name("xl/workbook.xml")
            .map_err(|_| XlsxError::MissingPart("xl/workbook.xml".into()))?;

        let reader = BufReader::new(file);
        let mut xml_reader = Reader::from_reader(reader);
        xml_reader.trim_text(true);

        let mut buf = Vec::new();
        let mut sheets = Vec::new();

        loop {
            match xml_reader.read_event_into(&mut buf) {
                Ok(Event::Empty(e)) | Ok(Event::Start(e)) if e.name().as_ref() == b"sheet" => {
                    let mut name = None;
                    let mut r_id = None;

                    for attr in e.attributes().flatten() {
                        match attr.key.as_ref() {
                            b"name" => name = attr.unescape_value().ok().map(|s| s.to_string()),
                            b"r:id" => r_id = attr.unescape_value().ok().map(|s| s.to_string()),
                            _ => {}
                        }
                    }

                    if let (Some(name), Some(r_id)) = (name, r_id) {
                        sheets.push((name, r_id));
                    }
                }
                Ok(Event::Eof) => break,
                Err(e) => return Err(XlsxError::Xml(e)),
                _ => {}
            }
            buf.clear();
        }

        Ok(sheets)
    }

    /// Read workbook.xml.rels for worksheet part paths
    fn read_workbook_rels<R: Read + Seek>(
        archive: &mut zip::ZipArchive<R>,
    ) -> XlsxResult<HashMap<String, String>> {
        let file = archive
            .by_name("xl/_rels/workbook.xml.rels")
            .map_err(|_| XlsxError::MissingPart("xl/_rels/workbook.xml.rels".into()))?;

        let reader = BufReader::new(file);
        let mut xml_reader = Reader::from_reader(reader);
        xml_reader.trim_text(true);

        let mut buf = Vec::new();
        let mut rels = HashMap::new();

        loop {
            match xml_reader.read_event_into(&mut buf) {
                Ok(Event::Empty(e)) | Ok(Event::Start(e))
                    if e.name().as_ref() == b"Relationship" =>
                {
                    let mut id = None;
                    let mut target = None;
                    let mut rel_type = None;

                    for attr in e.attributes().flatten() {
                        match attr.key.as_ref() {
                            b"Id" => id = attr.unescape_value().ok().map(|s| s.to_string()),
                            b"Target" => target = attr.unescape_value().ok().map(|s| s.to_string()),
                            b"Type" => {
                                rel_type = attr.unescape_value().ok().map(|s| s.to_string())
                            }
                            _ => {}
                        }
                    }

                    if let (Some(id), Some(target), Some(rel_type)) = (id, target, rel_type) {
                        if rel_type.ends_with("/worksheet") {
                            // Target is relative to the xl/ folder
                            let full_path = match target.strip_prefix('/') {
                                Some(absolute) => absolute.to_string(),
                                None => format!("xl/{}", target),
                            };
                            rels.insert(id, full_path);
                        }
                    }
                }
                Ok(Event::Eof) => break,
                Err(e) => return Err(XlsxError::Xml(e)),
                _ => {}
            }
            buf.clear();
        }

        Ok(rels)
    }

    /// Read one worksheet part into the model
    fn read_worksheet<R: Read + Seek>(
        archive: &mut zip::ZipArchive<R>,
        path: &str,
        worksheet: &mut Worksheet,
        shared_strings: &[String],
    ) -> XlsxResult<()> {
        let file = archive
            .by_name(path)
            .map_err(|_| XlsxError::MissingPart(path.to_string()))?;

        let reader = BufReader::new(file);
        let mut xml_reader = Reader::from_reader(reader);
        xml_reader.trim_text(true);

        let mut buf = Vec::new();

        let mut cell_ref: Option<String> = None;
        let mut cell_type: Option<String> = None;
        let mut value: Option<String> = None;
        let mut formula: Option<String> = None;
        let mut in_cell = false;
        let mut in_value = false;
        let mut in_formula = false;
        let mut in_inline_str = false;
        let mut in_inline_text = false;

        loop {
            match xml_reader.read_event_into(&mut buf) {
                Ok(Event::Start(e)) => match e.name().as_ref() {
                    b"c" => {
                        in_cell = true;
                        cell_ref = None;
                        cell_type = None;
                        value = None;
                        formula = None;

                        for attr in e.attributes().flatten() {
                            match attr.key.as_ref() {
                                b"r" => {
                                    cell_ref = attr.unescape_value().ok().map(|s| s.to_string())
                                }
                                b"t" => {
                                    cell_type = attr.unescape_value().ok().map(|s| s.to_string())
                                }
                                _ => {}
                            }
                        }
                    }
                    b"v" if in_cell => in_value = true,
                    b"f" if in_cell => in_formula = true,
                    b"is" if in_cell => in_inline_str = true,
                    b"t" if in_inline_str => in_inline_text = true,
                    _ => {}
                },
                Ok(Event::End(e)) => match e.name().as_ref() {
                    b"c" => {
                        if let Some(ref r) = cell_ref {
                            Self::process_cell(
                                worksheet,
                                r,
                                cell_type.as_deref(),
                                value.as_deref(),
                                formula.as_deref(),
                                shared_strings,
                            );
                        }
                        in_cell = false;
                    }
                    b"v" => in_value = false,
                    b"f" => in_formula = false,
                    b"is" => in_inline_str = false,
                    b"t" if in_inline_str => in_inline_text = false,
                    _ => {}
                },
                Ok(Event::Text(e)) => {
                    if in_value {
                        if let Ok(text) = e.unescape() {
                            value = Some(text.to_string());
                        }
                    } else if in_formula {
                        if let Ok(text) = e.unescape() {
                            formula = Some(text.to_string());
                        }
                    } else if in_inline_text {
                        if let Ok(text) = e.unescape() {
                            value = Some(text.to_string());
                            cell_type = Some("inlineStr".to_string());
                        }
                    }
                }
                Ok(Event::Eof) => break,
                Err(e) => return Err(XlsxError::Xml(e)),
                _ => {}
            }
            buf.clear();
        }

        Ok(())
    }

    /// Decode a `<v>` payload according to the cell's `t` attribute
    fn decode_value(
        cell_type: Option<&str>,
        raw: &str,
        shared_strings: &[String],
    ) -> Option<CellValue> {
        match cell_type {
            Some("s") => {
                let idx: usize = raw.parse().ok()?;
                shared_strings
                    .get(idx)
                    .map(|s| CellValue::String(s.clone()))
            }
            Some("b") => Some(CellValue::Boolean(
                raw == "1" || raw.eq_ignore_ascii_case("true"),
            )),
            Some("e") => CellError::from_str(raw).map(CellValue::Error),
            Some("str") | Some("inlineStr") => {
                Some(CellValue::String(decode_excel_escapes(raw)))
            }
            None | Some("n") => raw.parse::<f64>().ok().map(CellValue::Number),
            Some(_) => Some(CellValue::String(raw.to_string())),
        }
    }

    /// Store one parsed cell in the worksheet
    ///
    /// Malformed cells are dropped with a warning: one bad coordinate must
    /// not sink the whole workbook.
    fn process_cell(
        worksheet: &mut Worksheet,
        cell_ref: &str,
        cell_type: Option<&str>,
        value: Option<&str>,
        formula: Option<&str>,
        shared_strings: &[String],
    ) {
        let addr = match CellAddress::parse(cell_ref) {
            Ok(addr) => addr,
            Err(e) => {
                log::warn!("skipping cell with invalid reference '{}': {}", cell_ref, e);
                return;
            }
        };

        let cell_value = if let Some(f) = formula {
            let text = if f.starts_with('=') {
                f.to_string()
            } else {
                format!("={}", f)
            };
            let cached = value.and_then(|v| Self::decode_value(cell_type, v, shared_strings));
            CellValue::Formula {
                text,
                cached: cached.map(Box::new),
            }
        } else if let Some(v) = value {
            match Self::decode_value(cell_type, v, shared_strings) {
                Some(decoded) => decoded,
                None => {
                    // Unparseable payloads survive as text rather than vanish
                    CellValue::String(v.to_string())
                }
            }
        } else {
            return; // Style-only cell; nothing to keep
        };

        if let Err(e) = worksheet.set_cell_value_at(addr.row, addr.col, cell_value) {
            log::warn!("skipping cell '{}': {}", cell_ref, e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn excel_escape_decoding() {
        assert_eq!(decode_excel_escapes("a_x000a_b"), "a\nb");
        assert_eq!(decode_excel_escapes("tab_x0009_here"), "tab\there");
        assert_eq!(decode_excel_escapes("under_x005f_score"), "under_score");
        // Not a valid escape: passes through untouched
        assert_eq!(decode_excel_escapes("_xzz_"), "_xzz_");
        assert_eq!(decode_excel_escapes("_x00"), "_x00");
        assert_eq!(decode_excel_escapes("plain"), "plain");
    }

    #[test]
    fn decode_value_types() {
        let strings = vec!["hello".to_string()];

        assert_eq!(
            XlsxReader::decode_value(Some("s"), "0", &strings),
            Some(CellValue::string("hello"))
        );
        assert_eq!(XlsxReader::decode_value(Some("s"), "7", &strings), None);
        assert_eq!(
            XlsxReader::decode_value(Some("b"), "1", &strings),
            Some(CellValue::Boolean(true))
        );
        assert_eq!(
            XlsxReader::decode_value(Some("e"), "#N/A", &strings),
            Some(CellValue::Error(CellError::Na))
        );
        assert_eq!(
            XlsxReader::decode_value(None, "2.5", &strings),
            Some(CellValue::Number(2.5))
        );
        assert_eq!(XlsxReader::decode_value(None, "abc", &strings), None);
        assert_eq!(
            XlsxReader::decode_value(Some("str"), "cached", &strings),
            Some(CellValue::string("cached"))
        );
    }

    #[test]
    fn process_cell_keeps_formula_and_cached_value() {
        let mut sheet = Worksheet::new("Data");
        XlsxReader::process_cell(&mut sheet, "B2", None, Some("42"), Some("A1*2"), &[]);

        let cell = sheet.get_value("B2").unwrap();
        assert_eq!(cell.formula_text(), Some("=A1*2"));
        assert_eq!(cell.cached_value(), Some(&CellValue::Number(42.0)));
    }

    #[test]
    fn process_cell_drops_bad_references() {
        let mut sheet = Worksheet::new("Data");
        XlsxReader::process_cell(&mut sheet, "not-a-ref", None, Some("1"), None, &[]);
        assert_eq!(sheet.cell_count(), 0);
    }
}
