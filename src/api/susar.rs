// SUSAR 拆分接口：上传表格 + 项目编号，返回拆分后的文档或压缩包。
use crate::api::download::attachment_response;
use crate::api::errors::{error_response_with_detail, susar_error_response};
use crate::i18n;
use crate::services::susar::{process, OutputFormat, ProcessRequest, SusarError};
use crate::state::AppState;
use axum::extract::multipart::MultipartError;
use axum::extract::{DefaultBodyLimit, Multipart, State};
use axum::http::{HeaderValue, StatusCode};
use axum::response::Response;
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::Local;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use tracing::info;

pub const MATCHING_HEADER: &str = "x-susar-matching";
pub const NON_MATCHING_HEADER: &str = "x-susar-non-matching";

pub fn router(max_upload_bytes: usize) -> Router<Arc<AppState>> {
    Router::new()
        .route(
            "/api/process",
            post(susar_process).layer(DefaultBodyLimit::max(max_upload_bytes)),
        )
        .route("/api/health", get(susar_health))
}

async fn susar_health() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "time": Local::now().to_rfc3339(),
    }))
}

/// 上传表单中已读取的字段。
#[derive(Default)]
struct UploadForm {
    payload: Option<Vec<u8>>,
    filename: Option<String>,
    project_id: String,
    format: String,
}

async fn susar_process(
    State(state): State<Arc<AppState>>,
    multipart: Multipart,
) -> Result<Response, Response> {
    let form = read_upload_form(multipart, state.max_upload_bytes()).await?;
    let request = build_request(form).map_err(|err| susar_error_response(&err))?;
    info!(
        "susar process request: file={}, project_id={}, format={}, bytes={}",
        request.filename,
        request.project_id,
        request.format.extension(),
        request.payload.len()
    );

    let settings = state.settings().clone();
    let language = i18n::get_language();
    let outcome = tokio::task::spawn_blocking(move || {
        i18n::sync_with_language(language, || process(&request, &settings))
    })
    .await
    .map_err(|err| susar_error_response(&SusarError::internal(err)))?
    .map_err(|err| susar_error_response(&err))?;

    let output = outcome.output;
    let mut response = attachment_response(output.bytes, &output.filename, output.content_type);
    let headers = response.headers_mut();
    headers.insert(MATCHING_HEADER, HeaderValue::from(outcome.matching_rows));
    headers.insert(NON_MATCHING_HEADER, HeaderValue::from(outcome.non_matching_rows));
    Ok(response)
}

async fn read_upload_form(
    mut multipart: Multipart,
    max_upload_bytes: usize,
) -> Result<UploadForm, Response> {
    let mut form = UploadForm::default();
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|err| multipart_error(err, max_upload_bytes))?
    {
        let field_name = field.name().unwrap_or("").to_string();
        match field_name.as_str() {
            "file" => {
                let raw_name = field.file_name().unwrap_or("").to_string();
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|err| multipart_error(err, max_upload_bytes))?;
                // 只保留文件名部分，忽略客户端附带的路径。
                let base_name = Path::new(&raw_name)
                    .file_name()
                    .and_then(|name| name.to_str())
                    .unwrap_or("")
                    .to_string();
                form.filename = Some(base_name);
                form.payload = Some(bytes.to_vec());
            }
            "project_id" => {
                form.project_id = field
                    .text()
                    .await
                    .map_err(|err| multipart_error(err, max_upload_bytes))?;
            }
            "format" => {
                form.format = field
                    .text()
                    .await
                    .map_err(|err| multipart_error(err, max_upload_bytes))?;
            }
            _ => {}
        }
    }
    Ok(form)
}

/// 校验顺序：文件 → 文件名 → 项目编号 → 输出格式。
fn build_request(form: UploadForm) -> Result<ProcessRequest, SusarError> {
    let (Some(payload), Some(filename)) = (form.payload, form.filename) else {
        return Err(SusarError::file_missing());
    };
    if filename.trim().is_empty() {
        return Err(SusarError::filename_empty());
    }
    let project_id = form.project_id.trim().to_string();
    if project_id.is_empty() {
        return Err(SusarError::project_id_missing());
    }
    let format = OutputFormat::parse(&form.format)?;
    Ok(ProcessRequest {
        payload,
        filename,
        project_id,
        format,
    })
}

fn multipart_error(err: MultipartError, max_upload_bytes: usize) -> Response {
    let status = err.status();
    if status == StatusCode::PAYLOAD_TOO_LARGE {
        let message = i18n::t_with_params(
            "error.payload_too_large",
            &HashMap::from([(
                "limit_mb".to_string(),
                (max_upload_bytes / (1024 * 1024)).to_string(),
            )]),
        );
        return error_response_with_detail(
            status,
            Some("PAYLOAD_TOO_LARGE"),
            message,
            None,
            Some(json!({ "max_upload_bytes": max_upload_bytes })),
        );
    }
    error_response_with_detail(
        status,
        Some("INVALID_MULTIPART"),
        i18n::t("error.invalid_multipart"),
        None,
        Some(json!({ "reason": err.body_text() })),
    )
}
