// 读取上传的工作簿：优先解析 xlsx 包（带样式与列宽），否则回退到 calamine 只读取值。
use super::error::SusarError;
use super::sheet::{CellStyle, CellValue, NumberFormat, Sheet};
use super::styles::{parse_styles, parse_theme_colors, DEFAULT_THEME_COLORS};
use anyhow::{anyhow, Result};
use calamine::{open_workbook_auto_from_rs, Data, Reader};
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader as XmlReader;
use std::collections::HashMap;
use std::io::{Cursor, Read, Seek};
use tracing::{debug, warn};
use zip::ZipArchive;

/// `<col>` 区间展开时的列上限。
const MAX_WIDTH_COLUMNS: u32 = 1024;

/// 只读取第一个工作表。
pub fn read_first_sheet(bytes: &[u8]) -> Result<Sheet, SusarError> {
    if bytes.is_empty() {
        return Err(SusarError::parse_failure("empty payload"));
    }
    if looks_like_zip(bytes) {
        match read_xlsx_package(bytes) {
            Ok(sheet) => return Ok(sheet),
            Err(err) => warn!("xlsx package reader failed, falling back to calamine: {err}"),
        }
    }
    read_with_calamine(bytes)
}

fn looks_like_zip(bytes: &[u8]) -> bool {
    bytes.starts_with(b"PK\x03\x04")
}

#[derive(Debug, Clone)]
struct XlsxSheetInfo {
    name: String,
    sheet_id: Option<u32>,
    rel_id: Option<String>,
}

fn read_xlsx_package(bytes: &[u8]) -> Result<Sheet> {
    let mut archive = ZipArchive::new(Cursor::new(bytes))?;
    let entry_names = archive
        .file_names()
        .map(|name| name.to_string())
        .collect::<Vec<_>>();
    if find_zip_entry(&entry_names, "xl/workbook.xml").is_none() {
        return Err(anyhow!("xl/workbook.xml not found"));
    }

    let shared_strings =
        match read_zip_entry_bytes(&mut archive, &entry_names, "xl/sharedStrings.xml") {
            Some(data) => read_xlsx_shared_strings(&data)?,
            None => Vec::new(),
        };
    let workbook_sheets = match read_zip_entry_bytes(&mut archive, &entry_names, "xl/workbook.xml")
    {
        Some(data) => read_xlsx_workbook_sheets(&data)?,
        None => Vec::new(),
    };
    let relationships =
        match read_zip_entry_bytes(&mut archive, &entry_names, "xl/_rels/workbook.xml.rels") {
            Some(data) => read_xlsx_relationships(&data).unwrap_or_default(),
            None => HashMap::new(),
        };
    // 样式缺失或损坏时只影响格式复制，不影响分组。
    let theme = match read_zip_entry_bytes(&mut archive, &entry_names, "xl/theme/theme1.xml") {
        Some(data) => parse_theme_colors(&data).unwrap_or_else(|err| {
            warn!("theme1.xml ignored: {err}");
            DEFAULT_THEME_COLORS.to_vec()
        }),
        None => DEFAULT_THEME_COLORS.to_vec(),
    };
    let styles = match read_zip_entry_bytes(&mut archive, &entry_names, "xl/styles.xml") {
        Some(data) => parse_styles(&data, &theme).unwrap_or_else(|err| {
            warn!("styles.xml ignored: {err}");
            Vec::new()
        }),
        None => Vec::new(),
    };

    let sheet_files = list_xlsx_worksheet_files(&entry_names);
    let (name, path) = match workbook_sheets.first() {
        Some(info) => {
            let path = resolve_xlsx_sheet_path(info, &relationships, &entry_names, &sheet_files)
                .ok_or_else(|| anyhow!("worksheet part for '{}' not found", info.name))?;
            (info.name.clone(), path)
        }
        None => {
            let path = sheet_files
                .first()
                .cloned()
                .ok_or_else(|| anyhow!("workbook has no worksheet"))?;
            (derive_sheet_name(&path), path)
        }
    };
    let data = read_zip_entry_bytes(&mut archive, &entry_names, &path)
        .ok_or_else(|| anyhow!("worksheet part {path} unreadable"))?;
    let mut sheet = Sheet::new(name);
    sheet.set_styles(styles);
    read_xlsx_sheet(&data, &shared_strings, &mut sheet)?;
    debug!(
        "xlsx package parsed: sheet={}, rows={}, cols={}",
        sheet.name(),
        sheet.max_row(),
        sheet.max_col()
    );
    Ok(sheet)
}

fn read_zip_entry_bytes<R: Read + Seek>(
    archive: &mut ZipArchive<R>,
    entry_names: &[String],
    path: &str,
) -> Option<Vec<u8>> {
    let actual = find_zip_entry(entry_names, path)?;
    let mut entry = archive.by_name(&actual).ok()?;
    let mut buffer = Vec::new();
    entry.read_to_end(&mut buffer).ok()?;
    Some(buffer)
}

fn find_zip_entry(entry_names: &[String], path: &str) -> Option<String> {
    entry_names
        .iter()
        .find(|name| name.eq_ignore_ascii_case(path))
        .cloned()
}

fn read_xlsx_shared_strings(data: &[u8]) -> Result<Vec<String>> {
    let mut reader = XmlReader::from_reader(Cursor::new(data));
    reader.trim_text(false);
    let mut buf = Vec::new();
    let mut strings = Vec::new();
    let mut current = String::new();
    let mut in_si = false;
    let mut in_t = false;
    let mut in_phonetic = false;
    loop {
        buf.clear();
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(ref e)) => match local_name(e.name().as_ref()) {
                b"si" => {
                    in_si = true;
                    current.clear();
                }
                b"t" => {
                    if in_si && !in_phonetic {
                        in_t = true;
                    }
                }
                b"rPh" => in_phonetic = true,
                _ => {}
            },
            Ok(Event::Empty(ref e)) => {
                if local_name(e.name().as_ref()) == b"si" {
                    strings.push(String::new());
                }
            }
            Ok(Event::Text(t)) => {
                if in_t {
                    let text = t
                        .unescape()
                        .unwrap_or_else(|_| String::from_utf8_lossy(t.as_ref()));
                    current.push_str(&text);
                }
            }
            Ok(Event::End(ref e)) => match local_name(e.name().as_ref()) {
                b"t" => in_t = false,
                b"rPh" => in_phonetic = false,
                b"si" => {
                    in_si = false;
                    strings.push(std::mem::take(&mut current));
                }
                _ => {}
            },
            Ok(Event::Eof) => break,
            Err(err) => return Err(anyhow!(format!("sharedStrings parse failed: {err}"))),
            _ => {}
        }
    }
    Ok(strings)
}

fn read_xlsx_workbook_sheets(data: &[u8]) -> Result<Vec<XlsxSheetInfo>> {
    let mut reader = XmlReader::from_reader(Cursor::new(data));
    reader.trim_text(false);
    let mut buf = Vec::new();
    let mut sheets = Vec::new();
    loop {
        buf.clear();
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(ref e)) | Ok(Event::Empty(ref e))
                if local_name(e.name().as_ref()) == b"sheet" =>
            {
                let name = attr_value(&reader, e, b"name").unwrap_or_default();
                let sheet_id =
                    attr_value(&reader, e, b"sheetId").and_then(|value| value.parse::<u32>().ok());
                let rel_id = attr_value(&reader, e, b"id");
                sheets.push(XlsxSheetInfo {
                    name,
                    sheet_id,
                    rel_id,
                });
            }
            Ok(Event::Eof) => break,
            Err(err) => return Err(anyhow!(format!("workbook parse failed: {err}"))),
            _ => {}
        }
    }
    Ok(sheets)
}

fn read_xlsx_relationships(data: &[u8]) -> Result<HashMap<String, String>> {
    let mut reader = XmlReader::from_reader(Cursor::new(data));
    reader.trim_text(false);
    let mut buf = Vec::new();
    let mut relationships = HashMap::new();
    loop {
        buf.clear();
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(ref e)) | Ok(Event::Empty(ref e))
                if local_name(e.name().as_ref()) == b"Relationship" =>
            {
                let id = attr_value(&reader, e, b"Id").unwrap_or_default();
                let target = attr_value(&reader, e, b"Target").unwrap_or_default();
                if !id.is_empty() && !target.is_empty() {
                    relationships.insert(id, target);
                }
            }
            Ok(Event::Eof) => break,
            Err(err) => return Err(anyhow!(format!("relationships parse failed: {err}"))),
            _ => {}
        }
    }
    Ok(relationships)
}

fn list_xlsx_worksheet_files(entry_names: &[String]) -> Vec<String> {
    let mut files = entry_names
        .iter()
        .filter(|name| {
            let lower = name.to_ascii_lowercase();
            lower.starts_with("xl/worksheets/") && lower.ends_with(".xml")
        })
        .cloned()
        .collect::<Vec<_>>();
    files.sort_by(|a, b| {
        let a_index = sheet_index_from_path(a).unwrap_or(u32::MAX);
        let b_index = sheet_index_from_path(b).unwrap_or(u32::MAX);
        a_index.cmp(&b_index).then_with(|| a.cmp(b))
    });
    files
}

fn sheet_index_from_path(path: &str) -> Option<u32> {
    let name = path.rsplit('/').next()?;
    let name = name.strip_suffix(".xml")?;
    let name = name.strip_prefix("sheet")?;
    name.parse::<u32>().ok()
}

fn resolve_xlsx_sheet_path(
    info: &XlsxSheetInfo,
    relationships: &HashMap<String, String>,
    entry_names: &[String],
    sheet_files: &[String],
) -> Option<String> {
    if let Some(ref rel_id) = info.rel_id {
        if let Some(target) = relationships.get(rel_id) {
            let normalized = normalize_xlsx_target(target);
            if let Some(actual) = find_zip_entry(entry_names, &normalized) {
                return Some(actual);
            }
        }
    }
    if let Some(sheet_id) = info.sheet_id {
        let candidate = format!("xl/worksheets/sheet{sheet_id}.xml");
        if let Some(actual) = find_zip_entry(entry_names, &candidate) {
            return Some(actual);
        }
    }
    sheet_files.first().cloned()
}

fn normalize_xlsx_target(target: &str) -> String {
    if target.starts_with("/xl/") {
        target.trim_start_matches('/').to_string()
    } else if target.starts_with("xl/") {
        target.to_string()
    } else if target.starts_with("../") {
        format!("xl/{}", target.trim_start_matches("../"))
    } else {
        format!("xl/{target}")
    }
}

fn derive_sheet_name(path: &str) -> String {
    let name = path
        .rsplit('/')
        .next()
        .and_then(|file| file.strip_suffix(".xml"))
        .unwrap_or(path);
    if name.trim().is_empty() {
        "Sheet1".to_string()
    } else {
        name.to_string()
    }
}

#[derive(Default)]
struct PendingCell {
    row: u32,
    col: u32,
    cell_type: Option<String>,
    style: Option<usize>,
    value: String,
    inline: String,
}

fn read_xlsx_sheet(data: &[u8], shared_strings: &[String], sheet: &mut Sheet) -> Result<()> {
    let mut reader = XmlReader::from_reader(Cursor::new(data));
    reader.trim_text(false);
    let mut buf = Vec::new();

    let mut current_row = 0u32;
    let mut last_col = 0u32;
    let mut cell: Option<PendingCell> = None;
    let mut in_value = false;
    let mut in_inline = false;
    let mut in_inline_t = false;

    loop {
        buf.clear();
        let event = reader.read_event_into(&mut buf);
        match event {
            Ok(Event::Start(ref e)) | Ok(Event::Empty(ref e)) => {
                let is_empty = matches!(event, Ok(Event::Empty(_)));
                match local_name(e.name().as_ref()) {
                    b"row" => {
                        current_row = attr_value(&reader, e, b"r")
                            .and_then(|value| value.parse::<u32>().ok())
                            .unwrap_or(current_row + 1);
                        last_col = 0;
                    }
                    b"col" => read_column_width(&reader, e, sheet),
                    b"c" => {
                        let (row, col) = attr_value(&reader, e, b"r")
                            .and_then(|value| parse_cell_ref(&value))
                            .unwrap_or((current_row.max(1), last_col + 1));
                        last_col = col;
                        let pending = PendingCell {
                            row,
                            col,
                            cell_type: attr_value(&reader, e, b"t"),
                            style: attr_value(&reader, e, b"s")
                                .and_then(|value| value.parse::<usize>().ok()),
                            ..PendingCell::default()
                        };
                        if is_empty {
                            store_cell(sheet, pending, shared_strings);
                        } else {
                            cell = Some(pending);
                        }
                    }
                    b"v" if !is_empty && cell.is_some() => in_value = true,
                    b"is" if !is_empty && cell.is_some() => in_inline = true,
                    b"t" if !is_empty && in_inline => in_inline_t = true,
                    _ => {}
                }
            }
            Ok(Event::Text(t)) => {
                if let Some(pending) = cell.as_mut() {
                    let text = t
                        .unescape()
                        .unwrap_or_else(|_| String::from_utf8_lossy(t.as_ref()));
                    if in_value {
                        pending.value.push_str(&text);
                    } else if in_inline_t {
                        pending.inline.push_str(&text);
                    }
                }
            }
            Ok(Event::End(ref e)) => match local_name(e.name().as_ref()) {
                b"v" => in_value = false,
                b"t" => in_inline_t = false,
                b"is" => in_inline = false,
                b"c" => {
                    if let Some(pending) = cell.take() {
                        store_cell(sheet, pending, shared_strings);
                    }
                    in_value = false;
                    in_inline = false;
                    in_inline_t = false;
                }
                _ => {}
            },
            Ok(Event::Eof) => break,
            Err(err) => return Err(anyhow!(format!("worksheet parse failed: {err}"))),
            _ => {}
        }
    }
    Ok(())
}

fn read_column_width<B: std::io::BufRead>(reader: &XmlReader<B>, e: &BytesStart, sheet: &mut Sheet) {
    let parse = |key: &[u8]| attr_value(reader, e, key).and_then(|value| value.parse::<u32>().ok());
    let (Some(min), Some(width)) = (
        parse(b"min"),
        attr_value(reader, e, b"width").and_then(|value| value.parse::<f64>().ok()),
    ) else {
        return;
    };
    let max = parse(b"max").unwrap_or(min).min(MAX_WIDTH_COLUMNS);
    for col in min..=max {
        sheet.set_column_width(col, width);
    }
}

fn store_cell(sheet: &mut Sheet, pending: PendingCell, shared_strings: &[String]) {
    let value = interpret_xlsx_cell_value(&pending, shared_strings);
    sheet.set_cell(pending.row, pending.col, value, pending.style);
}

fn interpret_xlsx_cell_value(cell: &PendingCell, shared_strings: &[String]) -> CellValue {
    let raw = if cell.value.is_empty() {
        cell.inline.as_str()
    } else {
        cell.value.as_str()
    };
    let trimmed = raw.trim();
    match cell.cell_type.as_deref() {
        Some("s") => trimmed
            .parse::<usize>()
            .ok()
            .and_then(|idx| shared_strings.get(idx).cloned())
            .map(CellValue::Text)
            .unwrap_or(CellValue::Empty),
        Some("b") => match trimmed {
            "1" | "true" => CellValue::Bool(true),
            "0" | "false" => CellValue::Bool(false),
            _ => CellValue::Text(raw.to_string()),
        },
        Some("str") | Some("inlineStr") | Some("e") | Some("d") => {
            CellValue::Text(raw.to_string())
        }
        _ => {
            if trimmed.is_empty() {
                CellValue::Empty
            } else {
                trimmed
                    .parse::<f64>()
                    .map(CellValue::Number)
                    .unwrap_or_else(|_| CellValue::Text(raw.to_string()))
            }
        }
    }
}

/// "B3" → (3, 2)，均为 1 起始。
fn parse_cell_ref(cell_ref: &str) -> Option<(u32, u32)> {
    let mut col = 0u32;
    let mut row = 0u32;
    let mut seen_digit = false;
    for ch in cell_ref.chars() {
        if ch == '$' {
            continue;
        }
        if ch.is_ascii_alphabetic() && !seen_digit {
            let upper = ch.to_ascii_uppercase() as u8;
            col = col.checked_mul(26)?.checked_add((upper - b'A' + 1) as u32)?;
        } else if ch.is_ascii_digit() {
            seen_digit = true;
            row = row.checked_mul(10)?.checked_add(ch as u32 - b'0' as u32)?;
        }
    }
    if col == 0 || row == 0 {
        None
    } else {
        Some((row, col))
    }
}

fn read_with_calamine(bytes: &[u8]) -> Result<Sheet, SusarError> {
    let mut workbook = open_workbook_auto_from_rs(Cursor::new(bytes.to_vec()))
        .map_err(SusarError::parse_failure)?;
    let name = workbook
        .sheet_names()
        .first()
        .cloned()
        .ok_or_else(|| SusarError::parse_failure("workbook has no worksheet"))?;
    let range = workbook
        .worksheet_range(&name)
        .map_err(SusarError::parse_failure)?;

    let mut sheet = Sheet::new(name);
    // calamine 不提供样式；日期单元格补一个日期格式，保证输出仍显示为日期。
    sheet.set_styles(vec![
        CellStyle {
            number_format: Some(NumberFormat::Builtin(14)),
            ..CellStyle::default()
        },
        CellStyle {
            number_format: Some(NumberFormat::Builtin(22)),
            ..CellStyle::default()
        },
    ]);
    let Some((start_row, start_col)) = range.start() else {
        return Ok(sheet);
    };
    for (row, col, data) in range.used_cells() {
        let row = start_row + row as u32 + 1;
        let col = start_col + col as u32 + 1;
        let (value, style) = match data {
            Data::Int(value) => (CellValue::Number(*value as f64), None),
            Data::Float(value) => (CellValue::Number(*value), None),
            Data::String(value) => (CellValue::Text(value.clone()), None),
            Data::Bool(value) => (CellValue::Bool(*value), None),
            Data::DateTime(value) => {
                let serial = value.as_f64();
                let style = if serial.fract() == 0.0 { 0 } else { 1 };
                (CellValue::Number(serial), Some(style))
            }
            Data::DateTimeIso(value) | Data::DurationIso(value) => {
                (CellValue::Text(value.clone()), None)
            }
            Data::Error(err) => (CellValue::Text(format!("{err}")), None),
            Data::Empty => (CellValue::Empty, None),
        };
        sheet.set_cell(row, col, value, style);
    }
    Ok(sheet)
}

pub(crate) fn split_tag_name(name: &[u8]) -> (Option<&[u8]>, &[u8]) {
    if let Some(idx) = name.iter().position(|b| *b == b':') {
        (Some(&name[..idx]), &name[idx + 1..])
    } else {
        (None, name)
    }
}

pub(crate) fn local_name(name: &[u8]) -> &[u8] {
    split_tag_name(name).1
}

pub(crate) fn attr_value<B: std::io::BufRead>(
    reader: &XmlReader<B>,
    element: &BytesStart,
    key: &[u8],
) -> Option<String> {
    for attr in element.attributes().with_checks(false) {
        let attr = attr.ok()?;
        let (_, local) = split_tag_name(attr.key.as_ref());
        if local == key {
            if let Ok(value) = attr.decode_and_unescape_value(reader) {
                return Some(value.into_owned());
            }
        }
    }
    None
}
