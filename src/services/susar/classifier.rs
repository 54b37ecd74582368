// 按项目编号把数据行分成本项目 / 非本项目两组，编号为空的行直接丢弃。
use super::sheet::Sheet;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RowPartitions {
    pub matching: Vec<u32>,
    pub non_matching: Vec<u32>,
    /// 实际检查过的数据行数（受行数上限约束）。
    pub examined: u32,
}

impl RowPartitions {
    pub fn is_empty(&self) -> bool {
        self.matching.is_empty() && self.non_matching.is_empty()
    }

    pub fn dropped(&self) -> u32 {
        let kept = (self.matching.len() + self.non_matching.len()) as u32;
        self.examined.saturating_sub(kept)
    }
}

/// 单次线性扫描 `header_end_row + 1 ..= min(max_row, header_end_row + row_cap)`。
///
/// `target_id` 由调用方负责去除首尾空白；比较为精确字符串相等。
pub fn classify(
    sheet: &Sheet,
    id_column: u32,
    header_end_row: u32,
    target_id: &str,
    row_cap: u32,
) -> RowPartitions {
    let mut partitions = RowPartitions::default();
    let first = header_end_row.saturating_add(1);
    let last = sheet.max_row().min(header_end_row.saturating_add(row_cap));
    if first > last {
        return partitions;
    }
    for row in first..=last {
        partitions.examined += 1;
        let raw = sheet.text(row, id_column);
        let value = raw.trim();
        if value == target_id {
            partitions.matching.push(row);
        } else if !value.is_empty() {
            partitions.non_matching.push(row);
        }
    }
    partitions
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::susar::sheet::CellValue;

    fn sheet_with_ids(ids: &[&str]) -> Sheet {
        let mut sheet = Sheet::new("s");
        sheet.set_cell(3, 2, CellValue::Text("Study ID".to_string()), None);
        for (offset, id) in ids.iter().enumerate() {
            let row = 4 + offset as u32;
            sheet.set_cell(row, 1, CellValue::Text(format!("case-{offset}")), None);
            sheet.set_cell(row, 2, CellValue::Text(id.to_string()), None);
        }
        sheet
    }

    #[test]
    fn partitions_data_rows_and_drops_blank_ids() {
        let sheet = sheet_with_ids(&["P001", "P002", " P001 ", "  ", "P003"]);
        let partitions = classify(&sheet, 2, 3, "P001", 1000);
        assert_eq!(partitions.matching, vec![4, 6]);
        assert_eq!(partitions.non_matching, vec![5, 8]);
        assert_eq!(partitions.examined, 5);
        assert_eq!(partitions.dropped(), 1);
    }

    #[test]
    fn numeric_identifiers_compare_as_text() {
        let mut sheet = Sheet::new("s");
        sheet.set_cell(1, 1, CellValue::Text("项目编号".to_string()), None);
        sheet.set_cell(2, 1, CellValue::Number(1001.0), None);
        sheet.set_cell(3, 1, CellValue::Number(1002.0), None);
        let partitions = classify(&sheet, 1, 1, "1001", 1000);
        assert_eq!(partitions.matching, vec![2]);
        assert_eq!(partitions.non_matching, vec![3]);
    }

    #[test]
    fn row_cap_bounds_examined_rows() {
        let sheet = sheet_with_ids(&["P001", "P001", "P002", "P001"]);
        let partitions = classify(&sheet, 2, 3, "P001", 2);
        assert_eq!(partitions.matching, vec![4, 5]);
        assert!(partitions.non_matching.is_empty());
        assert_eq!(partitions.examined, 2);
    }

    #[test]
    fn partitions_are_disjoint_and_deterministic() {
        let sheet = sheet_with_ids(&["A", "B", "", "A", "C", "B", "A"]);
        let first = classify(&sheet, 2, 3, "A", 1000);
        let second = classify(&sheet, 2, 3, "A", 1000);
        assert_eq!(first, second);
        assert!(first
            .matching
            .iter()
            .all(|row| !first.non_matching.contains(row)));
        let mut all = first.matching.clone();
        all.extend(&first.non_matching);
        all.sort_unstable();
        assert_eq!(all, vec![4, 5, 7, 8, 9, 10]);
        assert!(first.matching.windows(2).all(|pair| pair[0] < pair[1]));
    }

    #[test]
    fn header_only_sheet_yields_empty_partitions() {
        let sheet = sheet_with_ids(&[]);
        let partitions = classify(&sheet, 2, 3, "P001", 1000);
        assert!(partitions.is_empty());
        assert_eq!(partitions.examined, 0);
    }
}
