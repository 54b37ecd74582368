// 处理流程的错误分类：用户输入错误与服务端处理失败分开上报。
use crate::i18n;
use axum::http::StatusCode;
use serde_json::{json, Value};
use std::collections::HashMap;

pub const CODE_INPUT_MISSING: &str = "INPUT_MISSING";
pub const CODE_UNSUPPORTED_FORMAT: &str = "UNSUPPORTED_FORMAT";
pub const CODE_COLUMN_NOT_FOUND: &str = "COLUMN_NOT_FOUND";
pub const CODE_EMPTY_RESULT: &str = "EMPTY_RESULT";
pub const CODE_PARSE_FAILURE: &str = "PARSE_FAILURE";
pub const CODE_INTERNAL: &str = "INTERNAL_ERROR";

#[derive(Debug, Clone)]
pub struct SusarError {
    code: &'static str,
    message: String,
    detail: Option<Value>,
}

impl SusarError {
    pub fn new(code: &'static str, message: impl Into<String>, detail: Option<Value>) -> Self {
        Self {
            code,
            message: message.into(),
            detail,
        }
    }

    pub fn file_missing() -> Self {
        Self::new(CODE_INPUT_MISSING, i18n::t("error.file_missing"), None)
    }

    pub fn filename_empty() -> Self {
        Self::new(CODE_INPUT_MISSING, i18n::t("error.filename_empty"), None)
    }

    pub fn project_id_missing() -> Self {
        Self::new(CODE_INPUT_MISSING, i18n::t("error.project_id_missing"), None)
    }

    pub fn unsupported_format(raw: &str) -> Self {
        let message = i18n::t_with_params(
            "error.unsupported_format",
            &HashMap::from([("format".to_string(), raw.to_string())]),
        );
        Self::new(
            CODE_UNSUPPORTED_FORMAT,
            message,
            Some(json!({ "format": raw, "supported": ["xlsx", "pdf"] })),
        )
    }

    pub fn column_not_found() -> Self {
        Self::new(CODE_COLUMN_NOT_FOUND, i18n::t("error.column_not_found"), None)
    }

    pub fn empty_result() -> Self {
        Self::new(CODE_EMPTY_RESULT, i18n::t("error.empty_result"), None)
    }

    pub fn parse_failure(cause: impl std::fmt::Display) -> Self {
        let message = i18n::t_with_params(
            "error.parse_failure",
            &HashMap::from([("detail".to_string(), cause.to_string())]),
        );
        Self::new(CODE_PARSE_FAILURE, message, None)
    }

    pub fn internal(cause: impl std::fmt::Display) -> Self {
        let message = i18n::t_with_params(
            "error.processing_failed",
            &HashMap::from([("detail".to_string(), cause.to_string())]),
        );
        Self::new(CODE_INTERNAL, message, None)
    }

    pub fn code(&self) -> &'static str {
        self.code
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn detail(&self) -> Option<&Value> {
        self.detail.as_ref()
    }

    pub fn status(&self) -> StatusCode {
        match self.code {
            CODE_PARSE_FAILURE => StatusCode::UNPROCESSABLE_ENTITY,
            CODE_INTERNAL => StatusCode::INTERNAL_SERVER_ERROR,
            _ => StatusCode::BAD_REQUEST,
        }
    }

    /// 用户输入问题只记 warn，其余按处理失败记 error。
    pub fn is_user_error(&self) -> bool {
        self.status().is_client_error()
    }
}

impl std::fmt::Display for SusarError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.code, self.message)
    }
}

impl std::error::Error for SusarError {}

impl From<rust_xlsxwriter::XlsxError> for SusarError {
    fn from(err: rust_xlsxwriter::XlsxError) -> Self {
        Self::internal(format!("xlsx write failed: {err}"))
    }
}

impl From<lopdf::Error> for SusarError {
    fn from(err: lopdf::Error) -> Self {
        Self::internal(format!("pdf write failed: {err}"))
    }
}

impl From<zip::result::ZipError> for SusarError {
    fn from(err: zip::result::ZipError) -> Self {
        Self::internal(format!("zip write failed: {err}"))
    }
}

impl From<std::io::Error> for SusarError {
    fn from(err: std::io::Error) -> Self {
        Self::internal(err)
    }
}
