// 表格重建：表头行原样复制，随后写入分组数据行，并复制存在的样式属性。
use super::error::SusarError;
use super::keywords::Limits;
use super::sheet::{
    AlignmentStyle, BorderEdge, BorderStyle, CellStyle, CellValue, FillStyle, FontStyle,
    NumberFormat, Sheet,
};
use rust_xlsxwriter::{
    Color, Format, FormatAlign, FormatBorder, FormatPattern, FormatUnderline, Workbook, Worksheet,
    XlsxError,
};
use std::collections::HashMap;
use tracing::{debug, warn};

/// Excel 单元格文本长度上限。
const MAX_CELL_TEXT_CHARS: usize = 32_767;

/// 默认字体（Calibri 11）的数字宽度与单元格内边距，单位像素。
const MAX_DIGIT_WIDTH: f64 = 7.0;
const COLUMN_PADDING: f64 = 5.0;

/// 生成只包含表头与 `rows` 的新工作簿，返回 xlsx 字节。
///
/// 输出行号：表头行保持原位置，第 i 个数据行写在 `header_end_row + 1 + i`。
pub fn build_workbook(
    sheet: &Sheet,
    header_end_row: u32,
    rows: &[u32],
    limits: &Limits,
) -> Result<Vec<u8>, SusarError> {
    let mut workbook = Workbook::new();
    let worksheet = workbook.add_worksheet();
    if !sheet.name().trim().is_empty() {
        if let Err(err) = worksheet.set_name(sheet.name()) {
            warn!("sheet name '{}' rejected, using default: {err}", sheet.name());
        }
    }

    let max_col = sheet.max_col().min(limits.workbook_max_columns);
    // 列宽先于内容复制。
    for col in 1..=max_col {
        if let Some(width) = sheet.column_width(col) {
            worksheet.set_column_width(column_index(col)?, writer_column_width(width))?;
        }
    }

    let mut formats = FormatCache::new(sheet);
    let header_rows = header_end_row.min(sheet.max_row());
    for row in 1..=header_rows {
        copy_row(worksheet, sheet, &mut formats, row, row, max_col)?;
    }
    for (offset, &source_row) in rows.iter().enumerate() {
        let target_row = header_end_row + 1 + offset as u32;
        copy_row(worksheet, sheet, &mut formats, source_row, target_row, max_col)?;
    }

    let bytes = workbook.save_to_buffer()?;
    debug!(
        "workbook built: header_rows={}, data_rows={}, cols={}, bytes={}",
        header_rows,
        rows.len(),
        max_col,
        bytes.len()
    );
    Ok(bytes)
}

/// `<col width>` 已含内边距，而 `set_column_width` 会再加一次；
/// 先按像素还原为字符宽度，写出后得到相同的 `<col width>`。
fn writer_column_width(stored: f64) -> f64 {
    let pixels = (stored * MAX_DIGIT_WIDTH).round();
    if pixels >= MAX_DIGIT_WIDTH + COLUMN_PADDING {
        (pixels - COLUMN_PADDING) / MAX_DIGIT_WIDTH
    } else {
        pixels / (MAX_DIGIT_WIDTH + COLUMN_PADDING)
    }
}

fn column_index(col: u32) -> Result<u16, SusarError> {
    u16::try_from(col - 1).map_err(|_| SusarError::internal(format!("column {col} out of range")))
}

fn copy_row(
    worksheet: &mut Worksheet,
    sheet: &Sheet,
    formats: &mut FormatCache,
    source_row: u32,
    target_row: u32,
    max_col: u32,
) -> Result<(), SusarError> {
    for col in 1..=max_col {
        let Some(cell) = sheet.cell(source_row, col) else {
            continue;
        };
        let format = match cell.style {
            Some(index) => formats.get(index),
            None => None,
        };
        write_value(
            worksheet,
            target_row - 1,
            column_index(col)?,
            &cell.value,
            format,
        )?;
    }
    Ok(())
}

fn write_value(
    worksheet: &mut Worksheet,
    row: u32,
    col: u16,
    value: &CellValue,
    format: Option<&Format>,
) -> Result<(), XlsxError> {
    match (value, format) {
        (CellValue::Text(text), Some(format)) => {
            worksheet.write_string_with_format(row, col, clip_text(text), format)?;
        }
        (CellValue::Text(text), None) => {
            worksheet.write_string(row, col, clip_text(text))?;
        }
        (CellValue::Number(number), Some(format)) => {
            worksheet.write_number_with_format(row, col, *number, format)?;
        }
        (CellValue::Number(number), None) => {
            worksheet.write_number(row, col, *number)?;
        }
        (CellValue::Bool(flag), Some(format)) => {
            worksheet.write_boolean_with_format(row, col, *flag, format)?;
        }
        (CellValue::Bool(flag), None) => {
            worksheet.write_boolean(row, col, *flag)?;
        }
        (CellValue::Empty, Some(format)) => {
            worksheet.write_blank(row, col, format)?;
        }
        (CellValue::Empty, None) => {}
    }
    Ok(())
}

fn clip_text(text: &str) -> String {
    if text.chars().count() > MAX_CELL_TEXT_CHARS {
        text.chars().take(MAX_CELL_TEXT_CHARS).collect()
    } else {
        text.to_string()
    }
}

/// 每个源样式索引只转换一次。
struct FormatCache<'a> {
    sheet: &'a Sheet,
    formats: HashMap<usize, Option<Format>>,
}

impl<'a> FormatCache<'a> {
    fn new(sheet: &'a Sheet) -> Self {
        Self {
            sheet,
            formats: HashMap::new(),
        }
    }

    fn get(&mut self, index: usize) -> Option<&Format> {
        let sheet = self.sheet;
        self.formats
            .entry(index)
            .or_insert_with(|| sheet.style_at(index).map(to_format))
            .as_ref()
    }
}

/// 逐项复制存在的样式属性；缺失的属性保持默认。
pub(crate) fn to_format(style: &CellStyle) -> Format {
    let mut format = Format::new();
    if let Some(font) = &style.font {
        format = apply_font(format, font);
    }
    if let Some(fill) = &style.fill {
        format = apply_fill(format, fill);
    }
    if let Some(border) = &style.border {
        format = apply_border(format, border);
    }
    if let Some(alignment) = &style.alignment {
        format = apply_alignment(format, alignment);
    }
    if let Some(number_format) = &style.number_format {
        format = apply_number_format(format, number_format);
    }
    format
}

fn apply_font(mut format: Format, font: &FontStyle) -> Format {
    if let Some(name) = &font.name {
        format = format.set_font_name(name.as_str());
    }
    if let Some(size) = font.size {
        format = format.set_font_size(size);
    }
    if font.bold {
        format = format.set_bold();
    }
    if font.italic {
        format = format.set_italic();
    }
    if font.underline {
        format = format.set_underline(FormatUnderline::Single);
    }
    if font.strike {
        format = format.set_font_strikethrough();
    }
    if let Some(color) = font.color {
        format = format.set_font_color(Color::RGB(color));
    }
    format
}

fn apply_fill(mut format: Format, fill: &FillStyle) -> Format {
    let Some(pattern) = fill_pattern(&fill.pattern) else {
        return format;
    };
    if matches!(pattern, FormatPattern::Solid) {
        // 实心填充的单元格颜色在 fgColor 上。
        if let Some(color) = fill.fg_color.or(fill.bg_color) {
            format = format
                .set_pattern(FormatPattern::Solid)
                .set_background_color(Color::RGB(color));
        }
        return format;
    }
    format = format.set_pattern(pattern);
    if let Some(color) = fill.fg_color {
        format = format.set_foreground_color(Color::RGB(color));
    }
    if let Some(color) = fill.bg_color {
        format = format.set_background_color(Color::RGB(color));
    }
    format
}

fn fill_pattern(name: &str) -> Option<FormatPattern> {
    let pattern = match name {
        "solid" => FormatPattern::Solid,
        "mediumGray" => FormatPattern::MediumGray,
        "darkGray" => FormatPattern::DarkGray,
        "lightGray" => FormatPattern::LightGray,
        "darkHorizontal" => FormatPattern::DarkHorizontal,
        "darkVertical" => FormatPattern::DarkVertical,
        "darkDown" => FormatPattern::DarkDown,
        "darkUp" => FormatPattern::DarkUp,
        "darkGrid" => FormatPattern::DarkGrid,
        "darkTrellis" => FormatPattern::DarkTrellis,
        "lightHorizontal" => FormatPattern::LightHorizontal,
        "lightVertical" => FormatPattern::LightVertical,
        "lightDown" => FormatPattern::LightDown,
        "lightUp" => FormatPattern::LightUp,
        "lightGrid" => FormatPattern::LightGrid,
        "lightTrellis" => FormatPattern::LightTrellis,
        "gray125" => FormatPattern::Gray125,
        "gray0625" => FormatPattern::Gray0625,
        _ => return None,
    };
    Some(pattern)
}

fn apply_border(mut format: Format, border: &BorderStyle) -> Format {
    if let Some((style, color)) = border.left.as_ref().and_then(border_edge) {
        format = format.set_border_left(style);
        if let Some(color) = color {
            format = format.set_border_left_color(color);
        }
    }
    if let Some((style, color)) = border.right.as_ref().and_then(border_edge) {
        format = format.set_border_right(style);
        if let Some(color) = color {
            format = format.set_border_right_color(color);
        }
    }
    if let Some((style, color)) = border.top.as_ref().and_then(border_edge) {
        format = format.set_border_top(style);
        if let Some(color) = color {
            format = format.set_border_top_color(color);
        }
    }
    if let Some((style, color)) = border.bottom.as_ref().and_then(border_edge) {
        format = format.set_border_bottom(style);
        if let Some(color) = color {
            format = format.set_border_bottom_color(color);
        }
    }
    format
}

fn border_edge(edge: &BorderEdge) -> Option<(FormatBorder, Option<Color>)> {
    let style = match edge.style.as_str() {
        "thin" => FormatBorder::Thin,
        "medium" => FormatBorder::Medium,
        "dashed" => FormatBorder::Dashed,
        "dotted" => FormatBorder::Dotted,
        "thick" => FormatBorder::Thick,
        "double" => FormatBorder::Double,
        "hair" => FormatBorder::Hair,
        "mediumDashed" => FormatBorder::MediumDashed,
        "dashDot" => FormatBorder::DashDot,
        "mediumDashDot" => FormatBorder::MediumDashDot,
        "dashDotDot" => FormatBorder::DashDotDot,
        "mediumDashDotDot" => FormatBorder::MediumDashDotDot,
        "slantDashDot" => FormatBorder::SlantDashDot,
        _ => return None,
    };
    Some((style, edge.color.map(Color::RGB)))
}

fn apply_alignment(mut format: Format, alignment: &AlignmentStyle) -> Format {
    let horizontal = match alignment.horizontal.as_deref() {
        Some("left") => Some(FormatAlign::Left),
        Some("center") => Some(FormatAlign::Center),
        Some("right") => Some(FormatAlign::Right),
        Some("fill") => Some(FormatAlign::Fill),
        Some("justify") => Some(FormatAlign::Justify),
        Some("centerContinuous") => Some(FormatAlign::CenterAcross),
        Some("distributed") => Some(FormatAlign::Distributed),
        _ => None,
    };
    if let Some(align) = horizontal {
        format = format.set_align(align);
    }
    let vertical = match alignment.vertical.as_deref() {
        Some("top") => Some(FormatAlign::Top),
        Some("center") => Some(FormatAlign::VerticalCenter),
        Some("bottom") => Some(FormatAlign::Bottom),
        Some("justify") => Some(FormatAlign::VerticalJustify),
        Some("distributed") => Some(FormatAlign::VerticalDistributed),
        _ => None,
    };
    if let Some(align) = vertical {
        format = format.set_align(align);
    }
    if alignment.wrap_text {
        format = format.set_text_wrap();
    }
    format
}

fn apply_number_format(format: Format, number_format: &NumberFormat) -> Format {
    match number_format {
        NumberFormat::Builtin(id) => format.set_num_format_index(*id),
        NumberFormat::Custom(code) => format.set_num_format(code.as_str()),
    }
}
