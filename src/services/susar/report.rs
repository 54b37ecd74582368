// 分页报表的表格模型：单元格转字符串、截断、限列，数据行按批次切分。
use super::keywords::Limits;
use super::sheet::Sheet;

pub const TRUNCATION_MARKER: &str = "...";

/// 渲染前的报表数据；所有字符串已完成截断。
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReportTable {
    pub column_count: usize,
    /// 表头行，只出现在第一批之前。
    pub header: Vec<Vec<String>>,
    /// 前若干表头行加底色、放大字号；分界行本身按正文样式输出。
    pub shaded_header_rows: usize,
    /// 每批对应一个渲染块，批与批之间分页。
    pub batches: Vec<Vec<Vec<String>>>,
}

impl ReportTable {
    pub fn data_row_count(&self) -> usize {
        self.batches.iter().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.header.is_empty() && self.batches.is_empty()
    }
}

pub fn build_report(sheet: &Sheet, header_end_row: u32, rows: &[u32], limits: &Limits) -> ReportTable {
    let column_count = sheet.max_col().min(limits.report_max_columns) as usize;
    let flatten = |row: u32| -> Vec<String> {
        (1..=column_count as u32)
            .map(|col| truncate_cell(&sheet.text(row, col), limits.report_cell_chars))
            .collect()
    };

    let header = (1..=header_end_row.min(sheet.max_row()))
        .map(flatten)
        .collect::<Vec<_>>();
    let shaded_header_rows = (header_end_row.saturating_sub(1) as usize).min(header.len());
    let batch_rows = limits.report_batch_rows.max(1);
    let batches = rows
        .chunks(batch_rows)
        .map(|chunk| chunk.iter().copied().map(flatten).collect::<Vec<_>>())
        .collect::<Vec<_>>();

    ReportTable {
        column_count,
        header,
        shaded_header_rows,
        batches,
    }
}

/// 超过 `max_chars` 个字符时保留前 `max_chars` 个并追加 `...`。
pub fn truncate_cell(text: &str, max_chars: usize) -> String {
    let trimmed = text.trim();
    if trimmed.chars().count() <= max_chars {
        return trimmed.to_string();
    }
    let mut output = trimmed.chars().take(max_chars).collect::<String>();
    output.push_str(TRUNCATION_MARKER);
    output
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::susar::sheet::CellValue;

    fn sheet(rows: u32, cols: u32) -> Sheet {
        let mut sheet = Sheet::new("s");
        for row in 1..=rows {
            for col in 1..=cols {
                sheet.set_cell(row, col, CellValue::Text(format!("r{row}c{col}")), None);
            }
        }
        sheet
    }

    #[test]
    fn long_cells_are_truncated_with_marker() {
        assert_eq!(truncate_cell("short", 40), "short");
        let long = "不良事件".repeat(20);
        let cut = truncate_cell(&long, 40);
        assert!(cut.ends_with(TRUNCATION_MARKER));
        assert_eq!(cut.chars().count(), 40 + TRUNCATION_MARKER.len());
    }

    #[test]
    fn rows_are_batched_and_header_kept_once() {
        let source = sheet(130, 3);
        let rows = (3..=122).collect::<Vec<u32>>();
        let report = build_report(&source, 2, &rows, &Limits::default());
        assert_eq!(report.header.len(), 2);
        assert_eq!(report.shaded_header_rows, 1);
        assert_eq!(report.header[0][0], "r1c1");
        assert_eq!(
            report.batches.iter().map(Vec::len).collect::<Vec<_>>(),
            vec![50, 50, 20]
        );
        assert_eq!(report.batches[1][0][1], "r53c2");
        assert_eq!(report.data_row_count(), rows.len());
    }

    #[test]
    fn columns_are_capped() {
        let source = sheet(3, 32);
        let report = build_report(&source, 1, &[2, 3], &Limits::default());
        assert_eq!(report.column_count, 25);
        assert!(report
            .header
            .iter()
            .chain(report.batches.iter().flatten())
            .all(|row| row.len() == 25));
    }

    #[test]
    fn degenerate_inputs_still_produce_a_table() {
        let source = sheet(5, 2);
        let report = build_report(&source, 0, &[4], &Limits::default());
        assert!(report.header.is_empty());
        assert_eq!(report.shaded_header_rows, 0);
        assert_eq!(report.batches, vec![vec![vec!["r4c1".to_string(), "r4c2".to_string()]]]);

        let report = build_report(&source, 3, &[], &Limits::default());
        assert_eq!(report.header.len(), 3);
        assert_eq!(report.shaded_header_rows, 2);
        assert_eq!(report.data_row_count(), 0);
        assert!(report.batches.is_empty());
        assert!(!report.is_empty());
    }

    #[test]
    fn shading_stops_before_the_boundary_row() {
        let source = sheet(4, 2);
        let report = build_report(&source, 9, &[], &Limits::default());
        assert_eq!(report.header.len(), 4);
        assert_eq!(report.shaded_header_rows, 4);

        let report = build_report(&source, 1, &[2], &Limits::default());
        assert_eq!(report.header.len(), 1);
        assert_eq!(report.shaded_header_rows, 0);
    }
}
