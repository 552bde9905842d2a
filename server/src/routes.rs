use std::sync::Arc;

use axum::{
    extract::{DefaultBodyLimit, Multipart, State},
    http::{
        header::{CONTENT_DISPOSITION, CONTENT_TYPE},
        Method, StatusCode,
    },
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use doc_compare::{save_disagreement, unify_texts, unify_with_threshold, ReportOptions};
use serde::{Deserialize, Serialize};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::config::Config;
use crate::error::AppError;
use crate::extract::extract_text;
use crate::upload::{ChunkForm, UploadRegistry};

pub const DOCX_MIME: &str = "application/vnd.openxmlformats-officedocument.wordprocessingml.document";
const REPORT_DISPOSITION: &str = "attachment; filename=\"data.docx\"";

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub uploads: Arc<UploadRegistry>,
}

impl AppState {
    pub fn new(config: Config) -> Self {
        Self {
            config: Arc::new(config),
            uploads: Arc::new(UploadRegistry::new()),
        }
    }
}

pub fn build_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([CONTENT_TYPE]);
    let body_limit = DefaultBodyLimit::max(state.config.max_body_bytes);

    Router::new()
        .route("/", get(index))
        .route("/health", get(health))
        .route("/upload", post(upload))
        .route("/unified/", post(unified))
        .route("/get_disagreement/", post(get_disagreement))
        .route("/restart", post(restart))
        .route("/restart/", post(restart))
        .with_state(state)
        .layer(body_limit)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
}

/// A number that clients may send either as JSON number or as a string.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
enum LenientNumber {
    Number(f64),
    Text(String),
}

impl LenientNumber {
    fn value(&self, field: &str) -> Result<f64, AppError> {
        match self {
            LenientNumber::Number(value) => Ok(*value),
            LenientNumber::Text(text) => text
                .trim()
                .parse::<f64>()
                .map_err(|_| AppError::BadRequest(format!("{field} is not a number: {text:?}"))),
        }
    }
}

#[derive(Debug, Deserialize)]
struct UnifyRequest {
    docx: String,
    pdf: String,
    #[serde(default)]
    threshold: Option<LenientNumber>,
}

#[derive(Debug, Serialize)]
struct UnifyResponse {
    docx: String,
    pdf: String,
}

#[derive(Debug, Deserialize)]
struct DisagreementRequest {
    docx: String,
    pdf: String,
    #[serde(rename = "countError", default)]
    count_error: Option<LenientNumber>,
    #[serde(default)]
    group_paragraph: bool,
    #[serde(default)]
    file_name_docx: Option<String>,
    #[serde(default)]
    file_name_pdf: Option<String>,
}

impl DisagreementRequest {
    fn options(&self) -> Result<ReportOptions, AppError> {
        let mut options = ReportOptions {
            group_paragraph: self.group_paragraph,
            ..ReportOptions::default()
        };
        if let Some(raw) = &self.count_error {
            let value = raw.value("countError")?;
            if !value.is_finite() || value < 0.0 {
                return Err(AppError::BadRequest(format!(
                    "countError must be a non-negative number (got {value})"
                )));
            }
            options.count_error = value as usize;
        }
        if let Some(name) = self.file_name_docx.as_ref().filter(|name| !name.is_empty()) {
            options.source_name = name.clone();
        }
        if let Some(name) = self.file_name_pdf.as_ref().filter(|name| !name.is_empty()) {
            options.edited_name = name.clone();
        }
        Ok(options)
    }
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
enum UploadResponse {
    Chunk { chunk: u64 },
    Text { text: String },
}

async fn index() -> impl IntoResponse {
    (StatusCode::OK, "doc-compare server")
}

async fn health(State(state): State<AppState>) -> Result<impl IntoResponse, AppError> {
    state.uploads.in_flight()?;
    Ok((StatusCode::OK, "ok"))
}

async fn upload(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<Json<UploadResponse>, AppError> {
    let form = ChunkForm::from_multipart(multipart).await?;
    let limit = state.config.max_upload_bytes;
    let chunk_end = form.byte_offset.checked_add(form.data.len() as u64);
    if form.total_size > limit || chunk_end.map_or(true, |end| end > limit) {
        return Err(AppError::TooLarge { limit });
    }

    let dir = state.config.upload_dir_for(&form.file_name);
    tokio::fs::create_dir_all(&dir).await?;
    let path = dir.join(&form.file_name);
    let written = state.uploads.write_chunk(&form, &path).await?;

    if !form.is_final() {
        return Ok(Json(UploadResponse::Chunk {
            chunk: form.chunk_index,
        }));
    }
    if written != form.total_size {
        return Err(AppError::SizeMismatch {
            expected: form.total_size,
            actual: written,
        });
    }
    info!(file = %form.file_name, bytes = written, "upload complete");
    let text = extract_text(&state.config, &path).await?;
    Ok(Json(UploadResponse::Text { text }))
}

async fn unified(
    State(state): State<AppState>,
    Json(req): Json<UnifyRequest>,
) -> Result<Json<UnifyResponse>, AppError> {
    let threshold = req
        .threshold
        .as_ref()
        .map(|raw| raw.value("threshold"))
        .transpose()?;
    let config = state.config.clone();
    let pair = tokio::task::spawn_blocking(move || match threshold {
        Some(threshold) => unify_with_threshold(&req.docx, &req.pdf, threshold, &config.unify),
        None => unify_texts(&req.docx, &req.pdf, &config.unify),
    })
    .await
    .map_err(|err| AppError::Internal(err.to_string()))??;
    info!(chapters = pair.chapters, "texts unified");
    Ok(Json(UnifyResponse {
        docx: pair.left,
        pdf: pair.right,
    }))
}

async fn get_disagreement(Json(req): Json<DisagreementRequest>) -> Result<Response, AppError> {
    let options = req.options()?;
    let bytes =
        tokio::task::spawn_blocking(move || save_disagreement(&req.docx, &req.pdf, &options))
            .await
            .map_err(|err| AppError::Internal(err.to_string()))??;
    info!(bytes = bytes.len(), "disagreement report rendered");
    Ok((
        StatusCode::OK,
        [(CONTENT_TYPE, DOCX_MIME), (CONTENT_DISPOSITION, REPORT_DISPOSITION)],
        bytes,
    )
        .into_response())
}

async fn restart(State(state): State<AppState>) -> Result<impl IntoResponse, AppError> {
    let dropped = state.uploads.reset().await?;
    info!(dropped, "restart requested");
    Ok(Json(serde_json::json!({
        "message": format!("restarted, {dropped} unfinished uploads dropped"),
    })))
}
