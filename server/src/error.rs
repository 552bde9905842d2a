use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use doc_compare::{DocxError, ReportError, UnifyError};
use thiserror::Error;
use tracing::error;

/// The one message shown for any upload that cannot be turned into text.
pub const UNSUPPORTED_FILE_MESSAGE: &str =
    "Ошибка. Вы загрузили не поддерживаемый подтип файла или файл поврежден.";

#[derive(Debug, Error)]
pub enum AppError {
    #[error("config error: {0}")]
    Config(String),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("http error: {0}")]
    Http(String),
    #[error("bad request: {0}")]
    BadRequest(String),
    #[error("upload is larger than {limit} bytes")]
    TooLarge { limit: u64 },
    #[error("Size mismatch: expected {expected} bytes, got {actual}")]
    SizeMismatch { expected: u64, actual: u64 },
    #[error("unsupported document: {0}")]
    Unsupported(String),
    #[error("OCR did not deliver {expected} pages within {waited_secs}s (got {received})")]
    OcrTimeout {
        expected: usize,
        received: usize,
        waited_secs: u64,
    },
    #[error("unify error: {0}")]
    Unify(#[from] UnifyError),
    #[error("report error: {0}")]
    Report(#[from] ReportError),
    #[error("internal error: {0}")]
    Internal(String),
}

impl From<DocxError> for AppError {
    fn from(err: DocxError) -> Self {
        AppError::Unsupported(format!("{} ({})", err, err.code()))
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            AppError::Config(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg.clone()),
            AppError::Io(err) => (StatusCode::INTERNAL_SERVER_ERROR, err.to_string()),
            AppError::Http(msg) => (StatusCode::BAD_GATEWAY, msg.clone()),
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            AppError::TooLarge { .. } => (StatusCode::PAYLOAD_TOO_LARGE, self.to_string()),
            AppError::SizeMismatch { .. } => {
                (StatusCode::INTERNAL_SERVER_ERROR, "Size mismatch".to_string())
            }
            AppError::Unsupported(_) => (
                StatusCode::UNSUPPORTED_MEDIA_TYPE,
                UNSUPPORTED_FILE_MESSAGE.to_string(),
            ),
            AppError::OcrTimeout { .. } => (StatusCode::GATEWAY_TIMEOUT, self.to_string()),
            AppError::Unify(err) => match err {
                UnifyError::InvalidThreshold { .. } | UnifyError::EmptySide { .. } => {
                    (StatusCode::BAD_REQUEST, err.to_string())
                }
                _ => (StatusCode::INTERNAL_SERVER_ERROR, err.to_string()),
            },
            AppError::Report(err) => (StatusCode::INTERNAL_SERVER_ERROR, err.to_string()),
            AppError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg.clone()),
        };
        error!(error = %self, "request error");
        (status, Json(serde_json::json!({"error": message}))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unsupported_uploads_share_one_message() {
        let response =
            AppError::Unsupported("zip without word/document.xml".into()).into_response();
        assert_eq!(response.status(), StatusCode::UNSUPPORTED_MEDIA_TYPE);
    }

    #[test]
    fn invalid_threshold_is_a_client_error() {
        let err = AppError::from(UnifyError::InvalidThreshold { value: 0.0 });
        assert_eq!(err.into_response().status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn size_mismatch_is_a_server_error() {
        let err = AppError::SizeMismatch {
            expected: 10,
            actual: 4,
        };
        assert_eq!(err.into_response().status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
