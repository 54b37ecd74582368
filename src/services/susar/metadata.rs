// 从表头区域提取药品名称与数据区间，用于生成输出文件名。
use super::keywords::{KeywordProfile, Limits, Placeholders};
use super::sheet::Sheet;
use regex::Regex;
use std::sync::OnceLock;
use tracing::error;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractedMetadata {
    pub drug_name: String,
    pub date_range: String,
}

impl ExtractedMetadata {
    /// 提取失败时回退到占位文本，保证文件名总能生成。
    pub fn extract(
        sheet: &Sheet,
        keywords: &KeywordProfile,
        limits: &Limits,
        placeholders: &Placeholders,
    ) -> Self {
        let drug_name = extract_field(sheet, &keywords.drug_name, limits)
            .unwrap_or_else(|| placeholders.drug_name.clone());
        let date_range = extract_field(sheet, &keywords.date_range, limits)
            .unwrap_or_else(|| placeholders.date_range.clone());
        Self {
            drug_name,
            date_range,
        }
    }
}

/// 在前 `scan_rows` 行、前 `metadata_scan_cols` 列内按行优先查找标签。
///
/// 命中后依次尝试：同格分隔符之后的文本、右侧单元格、下方单元格（可配置）。
/// 命中格三种探测都为空时继续扫描后续单元格。
pub fn extract_field(sheet: &Sheet, label_keywords: &[String], limits: &Limits) -> Option<String> {
    let keywords = label_keywords
        .iter()
        .map(|keyword| keyword.trim().to_lowercase())
        .filter(|keyword| !keyword.is_empty())
        .collect::<Vec<_>>();
    if keywords.is_empty() {
        return None;
    }
    let max_row = limits.scan_rows.min(sheet.max_row());
    let max_col = limits.metadata_scan_cols.min(sheet.max_col());
    for row in 1..=max_row {
        for col in 1..=max_col {
            let text = sheet.text(row, col);
            let lowered = text.to_lowercase();
            let Some(keyword) = keywords
                .iter()
                .find(|keyword| lowered.contains(keyword.as_str()))
            else {
                continue;
            };
            if let Some(value) = split_labelled_value(&text, keyword) {
                return Some(value);
            }
            if col < sheet.max_col() {
                let right = sheet.text(row, col + 1);
                let right = right.trim();
                if !right.is_empty() {
                    return Some(right.to_string());
                }
            }
            if limits.probe_below && row < sheet.max_row() {
                let below = sheet.text(row + 1, col);
                let below = below.trim();
                if !below.is_empty() {
                    return Some(below.to_string());
                }
            }
        }
    }
    None
}

/// 同一单元格内 "标签：值" 形式的拆分，只看关键字之后的文本。
///
/// 优先使用冒号（半角或全角）；没有冒号时取关键字之后空白分隔的尾部。
fn split_labelled_value(text: &str, keyword: &str) -> Option<String> {
    let lowered = text.to_lowercase();
    let start = lowered.find(keyword)?;
    // 小写化可能改变字节长度，按字符数回到原文位置。
    let skip_chars = lowered[..start + keyword.len()].chars().count();
    let rest = text.chars().skip(skip_chars).collect::<String>();
    if let Some(regex) = colon_regex() {
        if let Some(caps) = regex.captures(&rest) {
            let value = caps.get(1).map(|m| m.as_str().trim()).unwrap_or("");
            if !value.is_empty() {
                return Some(value.to_string());
            }
            return None;
        }
    }
    if !rest.starts_with(char::is_whitespace) {
        return None;
    }
    let value = rest.trim();
    if value.is_empty() {
        None
    } else {
        Some(value.to_string())
    }
}

fn colon_regex() -> Option<&'static Regex> {
    static REGEX: OnceLock<Option<Regex>> = OnceLock::new();
    REGEX
        .get_or_init(|| match Regex::new(r"(?s)[:：]\s*(.*)") {
            Ok(regex) => Some(regex),
            Err(err) => {
                error!("invalid label separator regex: {err}");
                None
            }
        })
        .as_ref()
}
