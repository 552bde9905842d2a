use std::path::{Path, PathBuf};

use doc_compare::{clean_text, docx_lines, format_paragraphs, DocumentFormat};
use tokio::io::AsyncReadExt;
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::error::AppError;
use crate::pdf_pipeline;

const SNIFF_LEN: u64 = 8;

pub async fn sniff_file(path: &Path) -> Result<DocumentFormat, AppError> {
    let file = tokio::fs::File::open(path).await?;
    let mut head = Vec::with_capacity(SNIFF_LEN as usize);
    file.take(SNIFF_LEN).read_to_end(&mut head).await?;
    Ok(DocumentFormat::sniff(&head))
}

/// Plain text of a fully uploaded document.
pub async fn extract_text(config: &Config, path: &Path) -> Result<String, AppError> {
    let format = sniff_file(path).await?;
    info!(path = %path.display(), format = ?format, "extracting text");
    match format {
        DocumentFormat::Pdf => pdf_pipeline::pdf_text(config, path).await,
        DocumentFormat::Zip => docx_file_text(config, path).await,
        DocumentFormat::LegacyDoc => {
            let converted = convert_legacy(config, path).await?;
            docx_file_text(config, &converted).await
        }
        DocumentFormat::Unknown => Err(AppError::Unsupported(format!(
            "unrecognised content in {}",
            path.display()
        ))),
    }
}

/// Document text regrouped along the rendered page lines when a converter is
/// configured, the cleaned document text otherwise.
async fn docx_file_text(config: &Config, path: &Path) -> Result<String, AppError> {
    let bytes = tokio::fs::read(path).await?;
    let lines = tokio::task::spawn_blocking(move || docx_lines(bytes))
        .await
        .map_err(|err| AppError::Internal(err.to_string()))??;
    let Some(soffice) = config.soffice_bin.as_deref() else {
        return Ok(clean_text(&lines));
    };

    match rendered_lines(soffice, path).await {
        Ok(rendered) if rendered.iter().any(|line| !line.trim().is_empty()) => {
            tokio::task::spawn_blocking(move || format_paragraphs(&lines, &rendered))
                .await
                .map_err(|err| AppError::Internal(err.to_string()))
        }
        Ok(_) => {
            warn!(path = %path.display(), "rendered document has no text");
            Ok(clean_text(&lines))
        }
        Err(err) => {
            warn!(path = %path.display(), error = %err, "rendering failed");
            Ok(clean_text(&lines))
        }
    }
}

/// Page lines of the document rendered to PDF next to it. The PDF is removed
/// afterwards.
async fn rendered_lines(soffice: &str, path: &Path) -> Result<Vec<String>, AppError> {
    let pdf = convert(soffice, path, "pdf").await?;
    let lines = pdf_pipeline::page_lines(&pdf).await;
    if let Err(err) = tokio::fs::remove_file(&pdf).await {
        debug!(path = %pdf.display(), error = %err, "rendered PDF left behind");
    }
    let lines = lines?;
    debug!(path = %path.display(), lines = lines.len(), "document rendered");
    Ok(lines)
}

/// Converts a legacy `.doc` to `.docx` in the upload directory.
async fn convert_legacy(config: &Config, path: &Path) -> Result<PathBuf, AppError> {
    let Some(soffice) = config.soffice_bin.as_deref() else {
        return Err(AppError::Unsupported(
            "legacy .doc upload and no converter configured".into(),
        ));
    };
    convert(soffice, path, "docx").await
}

/// Runs the office converter, writing `<stem>.<extension>` beside `path`.
async fn convert(soffice: &str, path: &Path, extension: &str) -> Result<PathBuf, AppError> {
    let out_dir = path
        .parent()
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from("."));
    let output = tokio::process::Command::new(soffice)
        .arg("--headless")
        .arg("--convert-to")
        .arg(extension)
        .arg(path)
        .arg("--outdir")
        .arg(&out_dir)
        .output()
        .await?;
    if !output.status.success() {
        warn!(
            status = ?output.status.code(),
            stderr = %String::from_utf8_lossy(&output.stderr),
            extension,
            "document conversion failed"
        );
        return Err(AppError::Unsupported(format!(
            "{} could not be converted",
            path.display()
        )));
    }
    let converted = path.with_extension(extension);
    if tokio::fs::metadata(&converted).await.is_err() {
        return Err(AppError::Unsupported(format!(
            "converter produced no {}",
            converted.display()
        )));
    }
    Ok(converted)
}
