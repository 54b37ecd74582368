// 定位项目编号列：命中的单元格同时标记表头结束行。
use super::keywords::Limits;
use super::sheet::Sheet;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HeaderLocation {
    /// 编号列，1 起始。
    pub column: u32,
    /// 表头最后一行；其后的行才是数据行。
    pub header_end_row: u32,
}

/// 行优先扫描前 `scan_rows` 行、前 `locator_scan_cols` 列，单元格小写后包含任一关键字即命中。
pub fn locate(sheet: &Sheet, keywords: &[String], limits: &Limits) -> Option<HeaderLocation> {
    let keywords = keywords
        .iter()
        .map(|keyword| keyword.trim().to_lowercase())
        .filter(|keyword| !keyword.is_empty())
        .collect::<Vec<_>>();
    if keywords.is_empty() {
        return None;
    }
    let max_row = limits.scan_rows.min(sheet.max_row());
    let max_col = limits.locator_scan_cols.min(sheet.max_col());
    for row in 1..=max_row {
        for col in 1..=max_col {
            let lowered = sheet.text(row, col).to_lowercase();
            if lowered.is_empty() {
                continue;
            }
            if keywords
                .iter()
                .any(|keyword| lowered.contains(keyword.as_str()))
            {
                return Some(HeaderLocation {
                    column: col,
                    header_end_row: row,
                });
            }
        }
    }
    None
}
