// 单次请求的处理流程：读表 → 元数据/编号列 → 分组 → 逐组生成文档 → 打包。
use super::classifier::{classify, RowPartitions};
use super::error::SusarError;
use super::keywords::SusarSettings;
use super::locator::{locate, HeaderLocation};
use super::metadata::ExtractedMetadata;
use super::naming::NameParts;
use super::package::{package, GeneratedFile, PackagedOutput};
use super::pdf::render_pdf;
use super::reader::read_first_sheet;
use super::report::build_report;
use super::sheet::Sheet;
use super::workbook_export::build_workbook;
use std::time::Instant;
use tracing::{info, warn};

pub const XLSX_CONTENT_TYPE: &str =
    "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet";
pub const PDF_CONTENT_TYPE: &str = "application/pdf";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    #[default]
    Xlsx,
    Pdf,
}

impl OutputFormat {
    /// 空值视为默认格式；大小写与首尾空白不敏感。
    pub fn parse(raw: &str) -> Result<Self, SusarError> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "" | "xlsx" | "excel" => Ok(Self::Xlsx),
            "pdf" => Ok(Self::Pdf),
            _ => Err(SusarError::unsupported_format(raw.trim())),
        }
    }

    pub fn extension(self) -> &'static str {
        match self {
            Self::Xlsx => "xlsx",
            Self::Pdf => "pdf",
        }
    }

    pub fn content_type(self) -> &'static str {
        match self {
            Self::Xlsx => XLSX_CONTENT_TYPE,
            Self::Pdf => PDF_CONTENT_TYPE,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ProcessRequest {
    pub payload: Vec<u8>,
    pub filename: String,
    pub project_id: String,
    pub format: OutputFormat,
}

#[derive(Debug, Clone)]
pub struct ProcessOutcome {
    pub output: PackagedOutput,
    pub metadata: ExtractedMetadata,
    pub location: HeaderLocation,
    pub matching_rows: usize,
    pub non_matching_rows: usize,
}

/// 同步执行整条流程；调用方负责放到阻塞线程池。
pub fn process(request: &ProcessRequest, settings: &SusarSettings) -> Result<ProcessOutcome, SusarError> {
    let started = Instant::now();
    if request.filename.trim().is_empty() {
        return Err(SusarError::filename_empty());
    }
    let project_id = request.project_id.trim();
    if project_id.is_empty() {
        return Err(SusarError::project_id_missing());
    }
    if request.payload.is_empty() {
        return Err(SusarError::file_missing());
    }

    let sheet = read_first_sheet(&request.payload)?;
    info!(
        "susar upload {} parsed: sheet={}, rows={}, cols={}",
        request.filename,
        sheet.name(),
        sheet.max_row(),
        sheet.max_col()
    );

    let metadata = ExtractedMetadata::extract(
        &sheet,
        &settings.keywords,
        &settings.limits,
        &settings.placeholders,
    );
    info!(
        "susar metadata: drug={}, date_range={}",
        metadata.drug_name, metadata.date_range
    );

    let location = locate(&sheet, &settings.keywords.identifier_column, &settings.limits)
        .ok_or_else(SusarError::column_not_found)?;
    info!(
        "susar identifier column={}, header_end_row={}",
        location.column, location.header_end_row
    );

    let partitions = classify(
        &sheet,
        location.column,
        location.header_end_row,
        project_id,
        settings.limits.row_cap,
    );
    info!(
        "susar partitions: matching={}, non_matching={}, dropped={}, examined={}",
        partitions.matching.len(),
        partitions.non_matching.len(),
        partitions.dropped(),
        partitions.examined
    );
    if partitions.is_empty() {
        return Err(SusarError::empty_result());
    }

    let files = build_documents(&sheet, &location, &partitions, &metadata, request.format, settings)?;
    let name_chars = name_chars(request.format, settings);
    let archive_name = NameParts::new(&metadata, name_chars).archive_name();
    let output = package(files, &archive_name)?;
    info!(
        "susar request finished: output={}, bytes={}, elapsed_ms={}",
        output.filename,
        output.bytes.len(),
        started.elapsed().as_millis()
    );

    Ok(ProcessOutcome {
        output,
        metadata,
        location,
        matching_rows: partitions.matching.len(),
        non_matching_rows: partitions.non_matching.len(),
    })
}

fn name_chars(format: OutputFormat, settings: &SusarSettings) -> usize {
    match format {
        OutputFormat::Xlsx => settings.limits.workbook_name_chars,
        OutputFormat::Pdf => settings.limits.report_name_chars,
    }
}

/// 每个非空分组生成一个文档，本项目在前。任何一个失败则整体失败。
fn build_documents(
    sheet: &Sheet,
    location: &HeaderLocation,
    partitions: &RowPartitions,
    metadata: &ExtractedMetadata,
    format: OutputFormat,
    settings: &SusarSettings,
) -> Result<Vec<GeneratedFile>, SusarError> {
    let names = NameParts::new(metadata, name_chars(format, settings));
    let mut files = Vec::with_capacity(2);
    for (matching, rows) in [(true, &partitions.matching), (false, &partitions.non_matching)] {
        if rows.is_empty() {
            continue;
        }
        let bytes = match format {
            OutputFormat::Xlsx => {
                build_workbook(sheet, location.header_end_row, rows, &settings.limits)?
            }
            OutputFormat::Pdf => {
                let table = build_report(sheet, location.header_end_row, rows, &settings.limits);
                render_pdf(&table)?
            }
        };
        let filename = names.document_name(matching, format);
        if bytes.is_empty() {
            warn!("document {filename} rendered empty");
        }
        info!("susar document built: {filename} ({} rows, {} bytes)", rows.len(), bytes.len());
        files.push(GeneratedFile {
            filename,
            content_type: format.content_type(),
            bytes,
        });
    }
    Ok(files)
}
