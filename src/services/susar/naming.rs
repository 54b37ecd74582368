// 输出文件命名：清理文件系统保留字符并按字符数截断。
use super::metadata::ExtractedMetadata;
use super::pipeline::OutputFormat;

pub const MATCHING_PREFIX: &str = "本项目外院SUSAR";
pub const NON_MATCHING_PREFIX: &str = "非本项目外院SUSAR";
pub const ARCHIVE_PREFIX: &str = "SUSAR";

const RESERVED_CHARS: &[char] = &['\\', '/', ':', '*', '?', '"', '<', '>', '|'];

/// 保留字符替换为 `_`，结果最多 `max_chars` 个字符。
pub fn sanitize_component(value: &str, max_chars: usize) -> String {
    value
        .chars()
        .map(|ch| {
            if RESERVED_CHARS.contains(&ch) || ch.is_control() {
                '_'
            } else {
                ch
            }
        })
        .take(max_chars)
        .collect()
}

/// 已清理、可直接拼入文件名的元数据。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NameParts {
    pub drug_name: String,
    pub date_range: String,
}

impl NameParts {
    pub fn new(metadata: &ExtractedMetadata, max_chars: usize) -> Self {
        Self {
            drug_name: sanitize_component(&metadata.drug_name, max_chars),
            date_range: sanitize_component(&metadata.date_range, max_chars),
        }
    }

    pub fn document_name(&self, matching: bool, format: OutputFormat) -> String {
        let prefix = if matching {
            MATCHING_PREFIX
        } else {
            NON_MATCHING_PREFIX
        };
        format!(
            "{prefix}_{}_{}.{}",
            self.drug_name,
            self.date_range,
            format.extension()
        )
    }

    pub fn archive_name(&self) -> String {
        format!("{ARCHIVE_PREFIX}_{}_{}.zip", self.drug_name, self.date_range)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reserved_characters_are_replaced() {
        assert_eq!(
            sanitize_component(r#"a\b/c:d*e?f"g<h>i|j"#, 30),
            "a_b_c_d_e_f_g_h_i_j"
        );
        assert_eq!(sanitize_component("2024/01/01-2024/03/31", 30), "2024_01_01-2024_03_31");
    }

    #[test]
    fn length_cap_counts_characters() {
        let long = "药".repeat(40);
        let cleaned = sanitize_component(&long, 20);
        assert_eq!(cleaned.chars().count(), 20);
        assert!(sanitize_component("abc", 20).len() <= 20);
    }

    #[test]
    fn document_and_archive_names_follow_pattern() {
        let parts = NameParts::new(
            &ExtractedMetadata {
                drug_name: "XX注射液".to_string(),
                date_range: "2024.01-2024.03".to_string(),
            },
            30,
        );
        assert_eq!(
            parts.document_name(true, OutputFormat::Xlsx),
            "本项目外院SUSAR_XX注射液_2024.01-2024.03.xlsx"
        );
        assert_eq!(
            parts.document_name(false, OutputFormat::Pdf),
            "非本项目外院SUSAR_XX注射液_2024.01-2024.03.pdf"
        );
        assert_eq!(parts.archive_name(), "SUSAR_XX注射液_2024.01-2024.03.zip");
    }
}
