// 输出打包：一个文件直接返回，两个文件打成 zip。
use super::error::SusarError;
use std::io::{Cursor, Write};
use tracing::info;
use zip::write::FileOptions;
use zip::{CompressionMethod, ZipWriter};

pub const ZIP_CONTENT_TYPE: &str = "application/zip";

/// 一个已生成的输出文件。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedFile {
    pub filename: String,
    pub content_type: &'static str,
    pub bytes: Vec<u8>,
}

/// 最终返回给调用方的单个下载。
pub type PackagedOutput = GeneratedFile;

pub fn package(mut files: Vec<GeneratedFile>, archive_name: &str) -> Result<PackagedOutput, SusarError> {
    match files.len() {
        0 => Err(SusarError::empty_result()),
        1 => {
            let file = files.remove(0);
            info!("returning single document {}", file.filename);
            Ok(file)
        }
        _ => {
            let bytes = zip_files(&files)?;
            info!(
                "bundled {} documents into {archive_name} ({} bytes)",
                files.len(),
                bytes.len()
            );
            Ok(GeneratedFile {
                filename: archive_name.to_string(),
                content_type: ZIP_CONTENT_TYPE,
                bytes,
            })
        }
    }
}

fn zip_files(files: &[GeneratedFile]) -> Result<Vec<u8>, SusarError> {
    let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
    let options = FileOptions::default().compression_method(CompressionMethod::Deflated);
    for file in files {
        writer.start_file(file.filename.as_str(), options)?;
        writer.write_all(&file.bytes)?;
    }
    let cursor = writer.finish()?;
    Ok(cursor.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::susar::error::CODE_EMPTY_RESULT;
    use std::io::Read;
    use zip::ZipArchive;

    fn file(name: &str, body: &[u8]) -> GeneratedFile {
        GeneratedFile {
            filename: name.to_string(),
            content_type: "application/pdf",
            bytes: body.to_vec(),
        }
    }

    #[test]
    fn single_file_is_returned_as_is() {
        let output = package(vec![file("本项目外院SUSAR_A_B.pdf", b"%PDF")], "SUSAR_A_B.zip")
            .expect("package");
        assert_eq!(output.filename, "本项目外院SUSAR_A_B.pdf");
        assert_eq!(output.bytes, b"%PDF");
    }

    #[test]
    fn two_files_are_zipped_with_original_names() {
        let output = package(
            vec![
                file("本项目外院SUSAR_A_B.pdf", b"matching"),
                file("非本项目外院SUSAR_A_B.pdf", b"other"),
            ],
            "SUSAR_A_B.zip",
        )
        .expect("package");
        assert_eq!(output.filename, "SUSAR_A_B.zip");
        assert_eq!(output.content_type, ZIP_CONTENT_TYPE);

        let mut archive = ZipArchive::new(Cursor::new(output.bytes)).expect("zip");
        assert_eq!(archive.len(), 2);
        let mut body = String::new();
        archive
            .by_name("非本项目外院SUSAR_A_B.pdf")
            .expect("entry")
            .read_to_string(&mut body)
            .expect("read");
        assert_eq!(body, "other");
    }

    #[test]
    fn nothing_to_package_is_empty_result() {
        let err = package(Vec::new(), "SUSAR_A_B.zip").expect_err("empty");
        assert_eq!(err.code(), CODE_EMPTY_RESULT);
    }
}
