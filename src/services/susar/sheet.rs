// 工作表内存模型：只读网格 + 可选样式属性，坐标统一为 1 起始。
use chrono::{Duration, NaiveDate};
use std::collections::HashMap;

#[derive(Debug, Clone, PartialEq)]
pub enum CellValue {
    Empty,
    Text(String),
    Number(f64),
    Bool(bool),
}

impl CellValue {
    pub fn is_empty(&self) -> bool {
        match self {
            CellValue::Empty => true,
            CellValue::Text(text) => text.is_empty(),
            _ => false,
        }
    }

    /// 单元格转字符串：空值为 ""，整数型浮点不带小数部分。
    pub fn to_text(&self) -> String {
        match self {
            CellValue::Empty => String::new(),
            CellValue::Text(text) => text.clone(),
            CellValue::Number(number) => format_number(*number),
            CellValue::Bool(true) => "TRUE".to_string(),
            CellValue::Bool(false) => "FALSE".to_string(),
        }
    }
}

pub fn format_number(number: f64) -> String {
    if number.is_finite() && number.fract() == 0.0 && number.abs() < 1e15 {
        format!("{}", number as i64)
    } else {
        format!("{number}")
    }
}

/// ARGB 颜色去掉 alpha 后的 0xRRGGBB。
pub type Rgb = u32;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct FontStyle {
    pub name: Option<String>,
    pub size: Option<f64>,
    pub bold: bool,
    pub italic: bool,
    pub underline: bool,
    pub strike: bool,
    pub color: Option<Rgb>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct FillStyle {
    pub pattern: String,
    pub fg_color: Option<Rgb>,
    pub bg_color: Option<Rgb>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct BorderEdge {
    pub style: String,
    pub color: Option<Rgb>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct BorderStyle {
    pub left: Option<BorderEdge>,
    pub right: Option<BorderEdge>,
    pub top: Option<BorderEdge>,
    pub bottom: Option<BorderEdge>,
}

impl BorderStyle {
    pub fn is_empty(&self) -> bool {
        self.left.is_none() && self.right.is_none() && self.top.is_none() && self.bottom.is_none()
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct AlignmentStyle {
    pub horizontal: Option<String>,
    pub vertical: Option<String>,
    pub wrap_text: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub enum NumberFormat {
    Builtin(u8),
    Custom(String),
}

impl NumberFormat {
    /// 日期/时间类格式；数值按 Excel 序列日期解释。
    pub fn is_date(&self) -> bool {
        match self {
            NumberFormat::Builtin(id) => matches!(*id, 14..=22 | 27..=36 | 45..=47 | 50..=58),
            NumberFormat::Custom(code) => {
                let mut plain = String::new();
                let mut in_quote = false;
                let mut in_bracket = false;
                for ch in code.chars() {
                    match ch {
                        '"' => in_quote = !in_quote,
                        '[' if !in_quote => in_bracket = true,
                        ']' if !in_quote => in_bracket = false,
                        _ if !in_quote && !in_bracket => plain.push(ch.to_ascii_lowercase()),
                        _ => {}
                    }
                }
                plain.contains('y') || plain.contains('d') || plain.contains('h')
            }
        }
    }
}

/// Excel 1900 日期系统序列值转文本；无时间部分时只输出日期。
pub fn serial_date_text(serial: f64) -> Option<String> {
    if !serial.is_finite() || serial < 0.0 || serial > 2_958_465.0 {
        return None;
    }
    let epoch = NaiveDate::from_ymd_opt(1899, 12, 30)?.and_hms_opt(0, 0, 0)?;
    let millis = (serial * 86_400_000.0).round() as i64;
    let datetime = epoch.checked_add_signed(Duration::milliseconds(millis))?;
    if serial.fract() == 0.0 {
        Some(datetime.format("%Y-%m-%d").to_string())
    } else {
        Some(datetime.format("%Y-%m-%d %H:%M:%S").to_string())
    }
}

/// 单元格样式，每个属性都可能缺失；缺失即不复制。
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CellStyle {
    pub font: Option<FontStyle>,
    pub fill: Option<FillStyle>,
    pub border: Option<BorderStyle>,
    pub alignment: Option<AlignmentStyle>,
    pub number_format: Option<NumberFormat>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Cell {
    pub value: CellValue,
    pub style: Option<usize>,
}

#[derive(Debug, Clone, Default)]
pub struct Sheet {
    name: String,
    cells: HashMap<(u32, u32), Cell>,
    styles: Vec<CellStyle>,
    column_widths: HashMap<u32, f64>,
    max_row: u32,
    max_col: u32,
}

static EMPTY_VALUE: CellValue = CellValue::Empty;

impl Sheet {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn max_row(&self) -> u32 {
        self.max_row
    }

    pub fn max_col(&self) -> u32 {
        self.max_col
    }

    pub fn set_styles(&mut self, styles: Vec<CellStyle>) {
        self.styles = styles;
    }

    pub fn set_column_width(&mut self, col: u32, width: f64) {
        if col > 0 && width > 0.0 {
            self.column_widths.insert(col, width);
        }
    }

    pub fn column_width(&self, col: u32) -> Option<f64> {
        self.column_widths.get(&col).copied()
    }

    /// 写入单元格；空值且无样式的格子不占用存储，也不扩展边界。
    pub fn set_cell(&mut self, row: u32, col: u32, value: CellValue, style: Option<usize>) {
        if row == 0 || col == 0 {
            return;
        }
        if value.is_empty() && style.is_none() {
            return;
        }
        self.max_row = self.max_row.max(row);
        self.max_col = self.max_col.max(col);
        self.cells.insert((row, col), Cell { value, style });
    }

    pub fn cell(&self, row: u32, col: u32) -> Option<&Cell> {
        self.cells.get(&(row, col))
    }

    pub fn value(&self, row: u32, col: u32) -> &CellValue {
        self.cells
            .get(&(row, col))
            .map(|cell| &cell.value)
            .unwrap_or(&EMPTY_VALUE)
    }

    /// 单元格显示文本；日期格式的数值转为日期字符串。
    pub fn text(&self, row: u32, col: u32) -> String {
        let value = self.value(row, col);
        if let CellValue::Number(number) = value {
            let is_date = self
                .style(row, col)
                .and_then(|style| style.number_format.as_ref())
                .is_some_and(NumberFormat::is_date);
            if is_date {
                if let Some(text) = serial_date_text(*number) {
                    return text;
                }
            }
        }
        value.to_text()
    }

    pub fn style(&self, row: u32, col: u32) -> Option<&CellStyle> {
        let index = self.cells.get(&(row, col))?.style?;
        self.style_at(index)
    }

    pub fn style_at(&self, index: usize) -> Option<&CellStyle> {
        self.styles.get(index)
    }
}
