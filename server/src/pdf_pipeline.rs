//! Text for scanned PDFs, produced by an external OCR pipeline.
//!
//! The PDF is moved into the OCR inbox; the pipeline writes one text file per
//! page into the pages directory, each named after the PDF and carrying the
//! page number after `.pdf` (`contract.pdf_12.txt`). Once every page is there
//! the pages are concatenated into `<completed>/<stem>.txt`, which doubles as a
//! cache for later uploads of the same file.

use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use std::time::{Duration, Instant};

use regex::Regex;
use tracing::{debug, info, warn};
use walkdir::WalkDir;

use crate::config::Config;
use crate::error::AppError;

/// File name up to the first `.pdf`.
pub fn pdf_stem(path: &Path) -> String {
    let name = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default();
    match name.find(".pdf") {
        Some(idx) => name[..idx].to_string(),
        None => name,
    }
}

/// Page number of an OCR page file: the first run of digits after `.pdf`.
pub fn page_number(path: &Path) -> Option<u32> {
    static DIGITS: OnceLock<Option<Regex>> = OnceLock::new();
    let digits = DIGITS.get_or_init(|| Regex::new(r"\d{1,5}").ok()).as_ref()?;
    let name = path.file_name()?.to_string_lossy();
    let (_, rest) = name.split_once(".pdf")?;
    digits.find(rest)?.as_str().parse().ok()
}

pub async fn page_count(path: &Path) -> Result<usize, AppError> {
    let path = path.to_path_buf();
    blocking(move || {
        lopdf::Document::load(&path)
            .map(|doc| doc.get_pages().len())
            .map_err(|err| AppError::Unsupported(format!("unreadable PDF: {err}")))
    })
    .await?
}

/// Text lines of every page, each trimmed and terminated by `\n`.
pub async fn page_lines(path: &Path) -> Result<Vec<String>, AppError> {
    let path = path.to_path_buf();
    blocking(move || {
        let doc = lopdf::Document::load(&path)
            .map_err(|err| AppError::Unsupported(format!("unreadable PDF: {err}")))?;
        let mut lines = Vec::new();
        for page in doc.get_pages().into_keys() {
            let text = doc
                .extract_text(&[page])
                .map_err(|err| AppError::Unsupported(format!("no text on page {page}: {err}")))?;
            lines.extend(text.split('\n').map(|line| format!("{}\n", line.trim())));
        }
        Ok::<_, AppError>(lines)
    })
    .await?
}

async fn blocking<T, F>(work: F) -> Result<T, AppError>
where
    F: FnOnce() -> T + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(work)
        .await
        .map_err(|err| AppError::Internal(err.to_string()))
}

/// Looks for `<stem>.txt` anywhere below the completed directory.
pub async fn find_cached(completed_dir: &Path, stem: &str) -> Result<Option<PathBuf>, AppError> {
    let completed_dir = completed_dir.to_path_buf();
    let stem = stem.to_string();
    blocking(move || scan_cached(&completed_dir, &stem)).await
}

/// Page files for `stem`, ordered by page number.
pub async fn collect_pages(pages_dir: &Path, stem: &str) -> Result<Vec<PathBuf>, AppError> {
    let pages_dir = pages_dir.to_path_buf();
    let stem = stem.to_string();
    blocking(move || scan_pages(&pages_dir, &stem)).await
}

fn scan_cached(completed_dir: &Path, stem: &str) -> Option<PathBuf> {
    let wanted = format!("{stem}.txt");
    WalkDir::new(completed_dir)
        .into_iter()
        .filter_map(Result::ok)
        .find(|entry| entry.file_type().is_file() && entry.file_name().to_string_lossy() == wanted)
        .map(|entry| entry.into_path())
}

/// Files without a page number sort last.
fn scan_pages(pages_dir: &Path, stem: &str) -> Vec<PathBuf> {
    let mut pages: Vec<PathBuf> = WalkDir::new(pages_dir)
        .into_iter()
        .filter_map(Result::ok)
        .filter(|entry| entry.file_type().is_file())
        .filter(|entry| entry.file_name().to_string_lossy().contains(stem))
        .map(|entry| entry.into_path())
        .collect();
    pages.sort_by_key(|path| (page_number(path).unwrap_or(u32::MAX), path.clone()));
    pages
}

pub async fn wait_for_pages(
    pages_dir: &Path,
    stem: &str,
    expected: usize,
    timeout: Duration,
    poll: Duration,
) -> Result<Vec<PathBuf>, AppError> {
    let started = Instant::now();
    let waiting = poll_pages(pages_dir, stem, expected, poll);
    match tokio::time::timeout(timeout, waiting).await {
        Ok(pages) => {
            let pages = pages?;
            info!(
                stem,
                pages = pages.len(),
                elapsed_ms = started.elapsed().as_millis() as u64,
                "OCR pages complete"
            );
            Ok(pages)
        }
        Err(_) => Err(AppError::OcrTimeout {
            expected,
            received: collect_pages(pages_dir, stem).await?.len(),
            waited_secs: timeout.as_secs(),
        }),
    }
}

async fn poll_pages(
    pages_dir: &Path,
    stem: &str,
    expected: usize,
    poll: Duration,
) -> Result<Vec<PathBuf>, AppError> {
    loop {
        let pages = collect_pages(pages_dir, stem).await?;
        if pages.len() >= expected {
            if pages.len() > expected {
                warn!(stem, expected, found = pages.len(), "more OCR pages than the PDF has");
            }
            return Ok(pages);
        }
        debug!(stem, expected, found = pages.len(), "waiting for OCR pages");
        tokio::time::sleep(poll).await;
    }
}

/// Concatenates the pages into `target` and empties the pages directory.
pub async fn assemble(
    pages: &[PathBuf],
    target: &Path,
    pages_dir: &Path,
) -> Result<String, AppError> {
    let mut text = String::new();
    for page in pages {
        let bytes = tokio::fs::read(page).await?;
        text.push_str(&String::from_utf8_lossy(&bytes));
    }
    if let Some(parent) = target.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }
    tokio::fs::write(target, &text).await?;
    clear_dir(pages_dir).await?;
    Ok(text)
}

async fn clear_dir(dir: &Path) -> Result<(), AppError> {
    let mut entries = tokio::fs::read_dir(dir).await?;
    while let Some(entry) = entries.next_entry().await? {
        if entry.file_type().await?.is_file() {
            tokio::fs::remove_file(entry.path()).await?;
        }
    }
    Ok(())
}

/// Moves `from` to `to`, copying when they live on different filesystems.
async fn move_file(from: &Path, to: &Path) -> Result<(), AppError> {
    if tokio::fs::rename(from, to).await.is_ok() {
        return Ok(());
    }
    tokio::fs::copy(from, to).await?;
    tokio::fs::remove_file(from).await?;
    Ok(())
}

pub async fn pdf_text(config: &Config, pdf_path: &Path) -> Result<String, AppError> {
    let stem = pdf_stem(pdf_path);
    if let Some(cached) = find_cached(&config.completed_dir, &stem).await? {
        info!(stem = %stem, path = %cached.display(), "OCR cache hit");
        let bytes = tokio::fs::read(&cached).await?;
        return Ok(String::from_utf8_lossy(&bytes).into_owned());
    }

    let expected = page_count(pdf_path).await?;
    let file_name = pdf_path
        .file_name()
        .ok_or_else(|| AppError::BadRequest("upload has no file name".into()))?;
    let inbox_path = config.ocr_inbox_dir.join(file_name);
    if tokio::fs::metadata(&inbox_path).await.is_err() {
        move_file(pdf_path, &inbox_path).await?;
        info!(stem = %stem, pages = expected, "PDF handed to OCR");
    } else {
        info!(stem = %stem, "PDF already queued for OCR");
    }

    let pages = wait_for_pages(
        &config.ocr_pages_dir,
        &stem,
        expected,
        config.ocr_timeout,
        config.ocr_poll_interval,
    )
    .await?;
    let target = config.completed_dir.join(format!("{stem}.txt"));
    assemble(&pages, &target, &config.ocr_pages_dir).await
}
