use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard};

use tracing::{info, warn};

use crate::{ClientError, CompareClient, ReportRequest};

pub const DEFAULT_SOURCE_NAME: &str = "Исходный файл";
pub const DEFAULT_EDITED_NAME: &str = "Редактированный файл";

/// What the comparison page shows: both texts and the report options.
#[derive(Debug, Clone, PartialEq)]
pub struct ViewState {
    pub source_text: String,
    pub edited_text: String,
    pub threshold: f64,
    pub count_error: usize,
    pub group_paragraph: bool,
    pub source_name: String,
    pub edited_name: String,
}

impl Default for ViewState {
    fn default() -> Self {
        Self {
            source_text: String::new(),
            edited_text: String::new(),
            threshold: 200.0,
            count_error: 0,
            group_paragraph: false,
            source_name: DEFAULT_SOURCE_NAME.to_string(),
            edited_name: DEFAULT_EDITED_NAME.to_string(),
        }
    }
}

/// Held while a request is in flight; clears the busy flag on drop.
#[derive(Debug)]
pub struct BusyGuard<'a> {
    flag: &'a AtomicBool,
}

impl<'a> BusyGuard<'a> {
    pub fn acquire(flag: &'a AtomicBool) -> Result<Self, ClientError> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .map_err(|_| ClientError::Busy)?;
        Ok(Self { flag })
    }
}

impl Drop for BusyGuard<'_> {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::Release);
    }
}

#[derive(Debug)]
pub struct Session {
    client: CompareClient,
    view: Mutex<ViewState>,
    busy: AtomicBool,
}

impl Session {
    pub fn new(client: CompareClient) -> Self {
        Self::with_view(client, ViewState::default())
    }

    pub fn with_view(client: CompareClient, view: ViewState) -> Self {
        Self {
            client,
            view: Mutex::new(view),
            busy: AtomicBool::new(false),
        }
    }

    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::Acquire)
    }

    pub fn view(&self) -> Result<ViewState, ClientError> {
        Ok(self.lock()?.clone())
    }

    pub fn update(&self, edit: impl FnOnce(&mut ViewState)) -> Result<(), ClientError> {
        edit(&mut *self.lock()?);
        Ok(())
    }

    pub fn load_source(&self, path: &Path) -> Result<(), ClientError> {
        let text = self.upload(path)?;
        self.lock()?.source_text = text;
        Ok(())
    }

    pub fn load_edited(&self, path: &Path) -> Result<(), ClientError> {
        let text = self.upload(path)?;
        self.lock()?.edited_text = text;
        Ok(())
    }

    /// Replaces both texts with their aligned versions.
    pub fn unify(&self) -> Result<(), ClientError> {
        let _guard = BusyGuard::acquire(&self.busy)?;
        let view = self.view()?;
        let unified = self
            .client
            .unify(&view.source_text, &view.edited_text, view.threshold)?;
        let mut state = self.lock()?;
        state.source_text = unified.docx;
        state.edited_text = unified.pdf;
        info!("texts unified");
        Ok(())
    }

    pub fn download_report(&self) -> Result<Vec<u8>, ClientError> {
        let _guard = BusyGuard::acquire(&self.busy)?;
        let view = self.view()?;
        let request = ReportRequest {
            docx: view.source_text,
            pdf: view.edited_text,
            count_error: view.count_error,
            group_paragraph: view.group_paragraph,
            file_name_docx: view.source_name,
            file_name_pdf: view.edited_name,
        };
        self.client.disagreement(&request)
    }

    /// Ends the session and lets the server drop unfinished uploads.
    pub fn close(self) {
        self.client.restart();
    }

    fn upload(&self, path: &Path) -> Result<String, ClientError> {
        let _guard = BusyGuard::acquire(&self.busy)?;
        self.client.upload(path).map_err(|err| {
            warn!(path = %path.display(), error = %err, "upload failed");
            match err {
                ClientError::Busy => ClientError::Busy,
                other => ClientError::Upload {
                    reason: other.to_string(),
                },
            }
        })
    }

    fn lock(&self) -> Result<MutexGuard<'_, ViewState>, ClientError> {
        self.view
            .lock()
            .map_err(|_| ClientError::Config("view state lock poisoned".into()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tests::{client_for, serve};

    #[test]
    fn busy_guard_rejects_overlap_and_releases_on_drop() {
        let flag = AtomicBool::new(false);
        let guard = BusyGuard::acquire(&flag).unwrap();
        assert!(matches!(BusyGuard::acquire(&flag), Err(ClientError::Busy)));
        drop(guard);
        assert!(BusyGuard::acquire(&flag).is_ok());
    }

    #[test]
    fn failed_request_leaves_session_usable() {
        let (base, handle) = serve(vec![
            (500, "application/json", br#"{"error":"boom"}"#.to_vec()),
            (200, "application/json", br#"{"docx":"left\n","pdf":"right\n"}"#.to_vec()),
        ]);
        let session = Session::new(client_for(&base));
        session
            .update(|view| {
                view.source_text = "left".into();
                view.edited_text = "right".into();
            })
            .unwrap();

        assert!(session.unify().is_err());
        assert!(!session.is_busy());
        session.unify().unwrap();
        handle.join().unwrap();

        let view = session.view().unwrap();
        assert_eq!(view.source_text, "left\n");
        assert_eq!(view.edited_text, "right\n");
    }

    #[test]
    fn upload_errors_use_the_generic_message() {
        let body = br#"{"error":"unsupported"}"#.to_vec();
        let (base, handle) = serve(vec![(415, "application/json", body)]);
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("notes.txt");
        std::fs::write(&path, b"abc").unwrap();

        let session = Session::new(client_for(&base));
        let err = session.load_source(&path).unwrap_err();
        handle.join().unwrap();
        assert!(err.to_string().starts_with(crate::UPLOAD_FAILED_MESSAGE));
        assert_eq!(session.view().unwrap().source_text, "");
    }

    #[test]
    fn report_request_carries_view_names() {
        let (base, handle) = serve(vec![(200, "application/octet-stream", b"PK\x03\x04".to_vec())]);
        let session = Session::new(client_for(&base));
        let bytes = session.download_report().unwrap();
        let requests = handle.join().unwrap();
        assert_eq!(bytes, b"PK\x03\x04");
        assert!(requests[0].contains("\"countError\":0"));
        assert!(requests[0].contains("file_name_docx"));
    }
}
