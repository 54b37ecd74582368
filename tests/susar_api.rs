use axum::body::{to_bytes, Body};
use axum::http::{header, Request, StatusCode};
use axum::response::Response;
use rust_xlsxwriter::Workbook;
use serde_json::Value;
use std::io::Cursor;
use std::sync::Arc;
use susar_splitter::build_router;
use susar_splitter::config::Config;
use susar_splitter::state::AppState;
use tower::ServiceExt;
use zip::ZipArchive;

const BOUNDARY: &str = "susar-test-boundary";

fn app() -> axum::Router {
    build_router(Arc::new(AppState::new(Config::default())))
}

fn fixture(ids: &[&str]) -> Vec<u8> {
    let mut workbook = Workbook::new();
    let worksheet = workbook.add_worksheet();
    worksheet
        .write_string(0, 0, "Investigational Drug: 测试药")
        .expect("write");
    worksheet.write_string(0, 3, "传输数据区间").expect("write");
    worksheet.write_string(0, 4, "2024Q1").expect("write");
    worksheet.write_string(1, 0, "Case No.").expect("write");
    worksheet.write_string(1, 1, "Protocol No.").expect("write");
    for (offset, id) in ids.iter().enumerate() {
        let row = 2 + offset as u32;
        worksheet
            .write_string(row, 0, format!("CASE-{offset}"))
            .expect("write");
        worksheet.write_string(row, 1, *id).expect("write");
    }
    workbook.save_to_buffer().expect("save")
}

enum Part<'a> {
    Text(&'a str, &'a str),
    File(&'a str, &'a [u8]),
}

fn multipart_body(parts: &[Part<'_>]) -> Vec<u8> {
    let mut body = Vec::new();
    for part in parts {
        body.extend_from_slice(format!("--{BOUNDARY}\r\n").as_bytes());
        match part {
            Part::Text(name, value) => {
                body.extend_from_slice(
                    format!("Content-Disposition: form-data; name=\"{name}\"\r\n\r\n").as_bytes(),
                );
                body.extend_from_slice(value.as_bytes());
            }
            Part::File(filename, bytes) => {
                body.extend_from_slice(
                    format!(
                        "Content-Disposition: form-data; name=\"file\"; filename=\"{filename}\"\r\n"
                    )
                    .as_bytes(),
                );
                body.extend_from_slice(b"Content-Type: application/octet-stream\r\n\r\n");
                body.extend_from_slice(bytes);
            }
        }
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());
    body
}

async fn post_process(parts: &[Part<'_>]) -> Response {
    let request = Request::builder()
        .method("POST")
        .uri("/api/process")
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={BOUNDARY}"),
        )
        .body(Body::from(multipart_body(parts)))
        .expect("request");
    app().oneshot(request).await.expect("response")
}

async fn body_bytes(response: Response) -> Vec<u8> {
    to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("read body")
        .to_vec()
}

async fn body_json(response: Response) -> Value {
    serde_json::from_slice(&body_bytes(response).await).expect("json body")
}

fn header_text(response: &Response, name: &str) -> String {
    response
        .headers()
        .get(name)
        .and_then(|value| value.to_str().ok())
        .unwrap_or_default()
        .to_string()
}

#[tokio::test]
async fn health_reports_ok() {
    let request = Request::builder()
        .uri("/api/health")
        .body(Body::empty())
        .expect("request");
    let response = app().oneshot(request).await.expect("response");
    assert_eq!(response.status(), StatusCode::OK);
    let payload = body_json(response).await;
    assert_eq!(payload["status"], "ok");
    assert!(payload["time"].is_string());
}

#[tokio::test]
async fn mixed_upload_returns_zip_archive() {
    let upload = fixture(&["P001", "P002", "P001"]);
    let response = post_process(&[
        Part::File("susar.xlsx", &upload),
        Part::Text("project_id", "P001"),
        Part::Text("format", "xlsx"),
    ])
    .await;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(header_text(&response, "content-type"), "application/zip");
    assert_eq!(header_text(&response, "x-susar-matching"), "2");
    assert_eq!(header_text(&response, "x-susar-non-matching"), "1");
    let disposition = header_text(&response, "content-disposition");
    assert!(disposition.starts_with("attachment;"));
    assert!(disposition.contains("filename*=UTF-8''SUSAR_"));

    let bytes = body_bytes(response).await;
    let archive = ZipArchive::new(Cursor::new(bytes)).expect("zip archive");
    assert_eq!(archive.len(), 2);
}

#[tokio::test]
async fn single_group_pdf_is_returned_directly() {
    let upload = fixture(&["P001", "P001"]);
    let response = post_process(&[
        Part::File("susar.xlsx", &upload),
        Part::Text("project_id", "P001"),
        Part::Text("format", "pdf"),
    ])
    .await;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(header_text(&response, "content-type"), "application/pdf");
    assert_eq!(header_text(&response, "x-susar-non-matching"), "0");
    let bytes = body_bytes(response).await;
    assert!(bytes.starts_with(b"%PDF"));
}

#[tokio::test]
async fn missing_file_is_rejected() {
    let response = post_process(&[Part::Text("project_id", "P001")]).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(header_text(&response, "x-error-code"), "INPUT_MISSING");
    let payload = body_json(response).await;
    assert_eq!(payload["ok"], false);
    assert_eq!(payload["error"]["message"], "未上传文件");
}

#[tokio::test]
async fn blank_project_id_is_rejected() {
    let upload = fixture(&["P001"]);
    let response = post_process(&[
        Part::File("susar.xlsx", &upload),
        Part::Text("project_id", "   "),
    ])
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let payload = body_json(response).await;
    assert_eq!(payload["error"]["code"], "INPUT_MISSING");
}

#[tokio::test]
async fn unknown_format_is_rejected() {
    let upload = fixture(&["P001"]);
    let response = post_process(&[
        Part::File("susar.xlsx", &upload),
        Part::Text("project_id", "P001"),
        Part::Text("format", "docx"),
    ])
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let payload = body_json(response).await;
    assert_eq!(payload["error"]["code"], "UNSUPPORTED_FORMAT");
    assert_eq!(payload["detail"]["format"], "docx");
}

#[tokio::test]
async fn sheet_without_identifier_column_is_rejected() {
    let mut workbook = Workbook::new();
    let worksheet = workbook.add_worksheet();
    worksheet.write_string(0, 0, "Case No.").expect("write");
    worksheet.write_string(1, 0, "CASE-1").expect("write");
    let upload = workbook.save_to_buffer().expect("save");

    let response = post_process(&[
        Part::File("susar.xlsx", &upload),
        Part::Text("project_id", "P001"),
    ])
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let payload = body_json(response).await;
    assert_eq!(payload["error"]["code"], "COLUMN_NOT_FOUND");
}

#[tokio::test]
async fn unreadable_upload_is_a_parse_failure() {
    let response = post_process(&[
        Part::File("susar.xlsx", b"definitely not a workbook"),
        Part::Text("project_id", "P001"),
    ])
    .await;
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let payload = body_json(response).await;
    assert_eq!(payload["error"]["code"], "PARSE_FAILURE");
}
