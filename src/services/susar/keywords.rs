// 表头扫描关键字与处理上限，均可通过配置文件覆盖。
use serde::{Deserialize, Serialize};

pub const DEFAULT_SCAN_ROWS: u32 = 10;
pub const DEFAULT_METADATA_SCAN_COLS: u32 = 20;
pub const DEFAULT_LOCATOR_SCAN_COLS: u32 = 30;
pub const DEFAULT_ROW_CAP: u32 = 1000;
pub const DEFAULT_WORKBOOK_MAX_COLUMNS: u32 = 30;
pub const DEFAULT_REPORT_MAX_COLUMNS: u32 = 25;
pub const DEFAULT_REPORT_CELL_CHARS: usize = 40;
pub const DEFAULT_REPORT_BATCH_ROWS: usize = 50;
pub const DEFAULT_WORKBOOK_NAME_CHARS: usize = 30;
pub const DEFAULT_REPORT_NAME_CHARS: usize = 20;

pub const DEFAULT_DRUG_PLACEHOLDER: &str = "未知药品";
pub const DEFAULT_DATE_PLACEHOLDER: &str = "未知日期";

/// 逻辑字段到候选关键字的映射，按顺序匹配。
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct KeywordProfile {
    #[serde(default = "default_drug_keywords")]
    pub drug_name: Vec<String>,
    #[serde(default = "default_date_keywords")]
    pub date_range: Vec<String>,
    #[serde(default = "default_identifier_keywords")]
    pub identifier_column: Vec<String>,
}

impl Default for KeywordProfile {
    fn default() -> Self {
        Self {
            drug_name: default_drug_keywords(),
            date_range: default_date_keywords(),
            identifier_column: default_identifier_keywords(),
        }
    }
}

fn default_drug_keywords() -> Vec<String> {
    to_strings(&["Investigational Drug", "试验药物"])
}

fn default_date_keywords() -> Vec<String> {
    to_strings(&["传输数据区间", "Data Transfer Period", "数据区间", "日期区间"])
}

fn default_identifier_keywords() -> Vec<String> {
    to_strings(&["study", "protocol", "项目", "编号", "方案"])
}

fn to_strings(values: &[&str]) -> Vec<String> {
    values.iter().map(|value| value.to_string()).collect()
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Limits {
    /// 表头区扫描的行数（元数据与编号列共用）。
    pub scan_rows: u32,
    pub metadata_scan_cols: u32,
    pub locator_scan_cols: u32,
    /// 单次请求最多检查的数据行数。
    pub row_cap: u32,
    pub workbook_max_columns: u32,
    pub report_max_columns: u32,
    pub report_cell_chars: usize,
    pub report_batch_rows: usize,
    pub workbook_name_chars: usize,
    pub report_name_chars: usize,
    /// 标签右侧为空时是否继续读取下方单元格。
    pub probe_below: bool,
}

impl Default for Limits {
    fn default() -> Self {
        Self {
            scan_rows: DEFAULT_SCAN_ROWS,
            metadata_scan_cols: DEFAULT_METADATA_SCAN_COLS,
            locator_scan_cols: DEFAULT_LOCATOR_SCAN_COLS,
            row_cap: DEFAULT_ROW_CAP,
            workbook_max_columns: DEFAULT_WORKBOOK_MAX_COLUMNS,
            report_max_columns: DEFAULT_REPORT_MAX_COLUMNS,
            report_cell_chars: DEFAULT_REPORT_CELL_CHARS,
            report_batch_rows: DEFAULT_REPORT_BATCH_ROWS,
            workbook_name_chars: DEFAULT_WORKBOOK_NAME_CHARS,
            report_name_chars: DEFAULT_REPORT_NAME_CHARS,
            probe_below: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Placeholders {
    pub drug_name: String,
    pub date_range: String,
}

impl Default for Placeholders {
    fn default() -> Self {
        Self {
            drug_name: DEFAULT_DRUG_PLACEHOLDER.to_string(),
            date_range: DEFAULT_DATE_PLACEHOLDER.to_string(),
        }
    }
}

/// 处理流程所需的全部可调参数。
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct SusarSettings {
    #[serde(default)]
    pub keywords: KeywordProfile,
    #[serde(default)]
    pub limits: Limits,
    #[serde(default)]
    pub placeholders: Placeholders,
}
