use std::path::{Path, PathBuf};
use std::time::Duration;

use doc_compare::UnifyConfig;

use crate::error::AppError;

#[derive(Clone, Debug)]
pub struct Config {
    pub bind_addr: String,
    /// Uploads land in `docx/` and `pdf/` below this directory.
    pub documents_dir: PathBuf,
    /// Watched by the external OCR pipeline.
    pub ocr_inbox_dir: PathBuf,
    /// Where the OCR pipeline drops one text file per page.
    pub ocr_pages_dir: PathBuf,
    /// Concatenated OCR results, looked up by PDF stem.
    pub completed_dir: PathBuf,
    pub ocr_timeout: Duration,
    pub ocr_poll_interval: Duration,
    /// Office converter for legacy `.doc` uploads and for rendering `.docx`
    /// uploads to PDF before their lines are regrouped.
    pub soffice_bin: Option<String>,
    pub max_upload_bytes: u64,
    pub max_body_bytes: usize,
    pub unify: UnifyConfig,
}

impl Config {
    pub fn from_env() -> Result<Self, AppError> {
        let bind_addr = env_or("DOC_COMPARE_BIND", "0.0.0.0:5000");
        let documents_dir = PathBuf::from(env_or("DOC_COMPARE_DOCUMENTS_DIR", "data/documents"));
        let ocr_inbox_dir = PathBuf::from(env_or("DOC_COMPARE_OCR_INBOX_DIR", "data/ocr"));
        let ocr_pages_dir = std::env::var("DOC_COMPARE_OCR_PAGES_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| ocr_inbox_dir.join("txt"));
        let completed_dir = PathBuf::from(env_or("DOC_COMPARE_COMPLETED_DIR", "data/completed"));
        let ocr_timeout_secs = env_non_negative("DOC_COMPARE_OCR_TIMEOUT_SECS", 1800)?;
        let ocr_poll_millis = env_non_negative("DOC_COMPARE_OCR_POLL_MILLIS", 500)?;
        let soffice_bin = std::env::var("DOC_COMPARE_SOFFICE_BIN")
            .ok()
            .filter(|value| !value.trim().is_empty());
        let max_upload_mb = env_non_negative("DOC_COMPARE_MAX_UPLOAD_MB", 1025)?;
        let max_body_mb = env_non_negative("DOC_COMPARE_MAX_BODY_MB", 64)?;
        let max_threshold = env_or_float("DOC_COMPARE_MAX_THRESHOLD", 200.0)?;

        let unify = UnifyConfig::builder()
            .max_threshold(max_threshold)
            .build()
            .map_err(|err| AppError::Config(err.to_string()))?;

        Ok(Self {
            bind_addr,
            documents_dir,
            ocr_inbox_dir,
            ocr_pages_dir,
            completed_dir,
            ocr_timeout: Duration::from_secs(ocr_timeout_secs),
            ocr_poll_interval: Duration::from_millis(ocr_poll_millis),
            soffice_bin,
            max_upload_bytes: max_upload_mb * 1024 * 1024,
            max_body_bytes: max_body_mb as usize * 1024 * 1024,
            unify,
        })
    }

    /// Everything rooted under `root`, with short OCR waits.
    #[cfg(test)]
    pub fn for_root(root: &Path) -> Self {
        Self {
            bind_addr: "127.0.0.1:0".to_string(),
            documents_dir: root.join("documents"),
            ocr_inbox_dir: root.join("ocr"),
            ocr_pages_dir: root.join("ocr").join("txt"),
            completed_dir: root.join("completed"),
            ocr_timeout: Duration::from_millis(200),
            ocr_poll_interval: Duration::from_millis(20),
            soffice_bin: None,
            max_upload_bytes: 16 * 1024 * 1024,
            max_body_bytes: 16 * 1024 * 1024,
            unify: UnifyConfig::default(),
        }
    }

    pub fn docx_dir(&self) -> PathBuf {
        self.documents_dir.join("docx")
    }

    pub fn pdf_dir(&self) -> PathBuf {
        self.documents_dir.join("pdf")
    }

    pub async fn ensure_dirs(&self) -> Result<(), AppError> {
        for dir in [
            self.docx_dir(),
            self.pdf_dir(),
            self.ocr_inbox_dir.clone(),
            self.ocr_pages_dir.clone(),
            self.completed_dir.clone(),
        ] {
            tokio::fs::create_dir_all(&dir).await?;
        }
        Ok(())
    }

    pub fn upload_dir_for(&self, file_name: &str) -> PathBuf {
        let is_docx = Path::new(file_name)
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("docx"));
        if is_docx {
            self.docx_dir()
        } else {
            self.pdf_dir()
        }
    }
}

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

fn env_or_int(key: &str, default: i64) -> Result<i64, AppError> {
    match std::env::var(key) {
        Ok(value) => value
            .parse::<i64>()
            .map_err(|_| AppError::Config(format!("Invalid integer for {key}"))),
        Err(_) => Ok(default),
    }
}

fn env_or_float(key: &str, default: f64) -> Result<f64, AppError> {
    match std::env::var(key) {
        Ok(value) => value
            .parse::<f64>()
            .map_err(|_| AppError::Config(format!("Invalid number for {key}"))),
        Err(_) => Ok(default),
    }
}

fn non_negative(value: i64, key: &str) -> Result<u64, AppError> {
    u64::try_from(value).map_err(|_| AppError::Config(format!("{key} must not be negative")))
}

fn env_non_negative(key: &str, default: i64) -> Result<u64, AppError> {
    non_negative(env_or_int(key, default)?, key)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn docx_names_go_to_the_docx_dir() {
        let config = Config::for_root(Path::new("/srv"));
        let docx = PathBuf::from("/srv/documents/docx");
        let pdf = PathBuf::from("/srv/documents/pdf");
        assert_eq!(config.upload_dir_for("contract.DOCX"), docx);
        assert_eq!(config.upload_dir_for("scan.pdf"), pdf);
        assert_eq!(config.upload_dir_for("legacy.doc"), pdf);
    }

    #[test]
    fn negative_limits_are_rejected() {
        assert!(non_negative(-1, "X").is_err());
        assert_eq!(non_negative(3, "X").unwrap(), 3);
    }
}
