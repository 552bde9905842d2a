//! Chunked uploads as sent by Dropzone.

use std::collections::HashMap;
use std::io::SeekFrom;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use axum::extract::Multipart;
use tokio::io::{AsyncSeekExt, AsyncWriteExt};
use tracing::{debug, info, warn};

use crate::error::AppError;

/// One multipart request of a (possibly) chunked upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChunkForm {
    pub upload_id: Option<String>,
    pub file_name: String,
    pub data: Vec<u8>,
    pub chunk_index: u64,
    pub byte_offset: u64,
    pub total_chunks: u64,
    pub total_size: u64,
}

impl ChunkForm {
    pub async fn from_multipart(mut multipart: Multipart) -> Result<Self, AppError> {
        let mut upload_id = None;
        let mut file = None;
        let mut chunk_index = None;
        let mut byte_offset = None;
        let mut total_chunks = None;
        let mut total_size = None;

        while let Some(field) = multipart
            .next_field()
            .await
            .map_err(|err| AppError::BadRequest(err.to_string()))?
        {
            let name = field.name().unwrap_or_default().to_string();
            if let Some(file_name) = field.file_name().map(str::to_string) {
                let data = field
                    .bytes()
                    .await
                    .map_err(|err| AppError::BadRequest(err.to_string()))?;
                file = Some((file_name, data.to_vec()));
                continue;
            }
            let value = field
                .text()
                .await
                .map_err(|err| AppError::BadRequest(err.to_string()))?;
            match name.as_str() {
                "dzuuid" => upload_id = Some(value),
                "dzchunkindex" => chunk_index = Some(parse_field(&name, &value)?),
                "dzchunkbyteoffset" => byte_offset = Some(parse_field(&name, &value)?),
                "dztotalchunkcount" => total_chunks = Some(parse_field(&name, &value)?),
                "dztotalfilesize" => total_size = Some(parse_field(&name, &value)?),
                other => debug!(field = other, "ignoring upload field"),
            }
        }

        let (raw_name, data) =
            file.ok_or_else(|| AppError::BadRequest("missing file field".into()))?;
        let file_name = sanitize_file_name(&raw_name)?;
        let data_len = data.len() as u64;
        let form = Self {
            upload_id,
            file_name,
            data,
            chunk_index: chunk_index.unwrap_or(0),
            byte_offset: byte_offset.unwrap_or(0),
            total_chunks: total_chunks.unwrap_or(1).max(1),
            total_size: total_size.unwrap_or(data_len),
        };
        if form.chunk_index >= form.total_chunks {
            return Err(AppError::BadRequest(format!(
                "chunk {} of {} is out of range",
                form.chunk_index, form.total_chunks
            )));
        }
        Ok(form)
    }

    pub fn is_final(&self) -> bool {
        self.chunk_index + 1 == self.total_chunks
    }

    fn session_key(&self) -> String {
        self.upload_id
            .clone()
            .unwrap_or_else(|| self.file_name.clone())
    }
}

fn parse_field(name: &str, value: &str) -> Result<u64, AppError> {
    value
        .trim()
        .parse::<u64>()
        .map_err(|_| AppError::BadRequest(format!("{name} is not a number: {value:?}")))
}

/// Keeps only the final path component of a client-supplied name.
pub fn sanitize_file_name(raw: &str) -> Result<String, AppError> {
    let normalized = raw.replace('\\', "/");
    Path::new(&normalized)
        .file_name()
        .and_then(|name| name.to_str())
        .filter(|name| !name.trim().is_empty())
        .map(str::to_string)
        .ok_or_else(|| AppError::BadRequest(format!("invalid file name {raw:?}")))
}

/// In-flight uploads, keyed by Dropzone's upload id.
#[derive(Debug, Default)]
pub struct UploadRegistry {
    sessions: Mutex<HashMap<String, PathBuf>>,
}

impl UploadRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Writes one chunk at its offset and returns the file length afterwards.
    pub async fn write_chunk(&self, form: &ChunkForm, path: &Path) -> Result<u64, AppError> {
        let key = form.session_key();
        if form.chunk_index == 0 {
            self.lock()?.insert(key.clone(), path.to_path_buf());
        } else if !self.lock()?.contains_key(&key) {
            warn!(
                upload = %key,
                chunk = form.chunk_index,
                "chunk for unknown upload; continuing on disk"
            );
            self.lock()?.insert(key.clone(), path.to_path_buf());
        }

        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(form.chunk_index == 0)
            .open(path)
            .await?;
        file.seek(SeekFrom::Start(form.byte_offset)).await?;
        file.write_all(&form.data).await?;
        file.flush().await?;
        let written = file.metadata().await?.len();
        debug!(
            upload = %key,
            chunk = form.chunk_index,
            offset = form.byte_offset,
            len = form.data.len(),
            "chunk stored"
        );

        if form.is_final() {
            self.lock()?.remove(&key);
        }
        Ok(written)
    }

    pub fn in_flight(&self) -> Result<usize, AppError> {
        Ok(self.lock()?.len())
    }

    /// Forgets every in-flight upload and deletes its partial file.
    pub async fn reset(&self) -> Result<usize, AppError> {
        let paths: Vec<PathBuf> = self.lock()?.drain().map(|(_, path)| path).collect();
        let count = paths.len();
        for path in paths {
            match tokio::fs::remove_file(&path).await {
                Ok(()) => {}
                Err(err) if err.kind() == std::io::ErrorKind::NotFound => {}
                Err(err) => {
                    warn!(path = %path.display(), error = %err, "failed to remove partial upload")
                }
            }
        }
        info!(count, "upload sessions reset");
        Ok(count)
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, HashMap<String, PathBuf>>, AppError> {
        self.sessions
            .lock()
            .map_err(|_| AppError::Internal("upload registry lock poisoned".into()))
    }
}
