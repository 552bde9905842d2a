//! Blocking client for the doc-compare service: chunked uploads, unify and
//! the disagreement report.

mod session;

use std::fs::File;
use std::io::{Read, Seek, SeekFrom};
use std::path::Path;
use std::time::Duration;

use reqwest::blocking::multipart::{Form, Part};
use reqwest::blocking::{Client, Response};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, warn};
use uuid::Uuid;

pub use session::{BusyGuard, Session, ViewState};

const DEFAULT_BASE_URL: &str = "http://localhost:5000";
pub const DEFAULT_CHUNK_SIZE: usize = 250_000;
pub const DEFAULT_MAX_FILE_MB: u64 = 1025;

/// Shown for every failed upload, whatever the cause.
pub const UPLOAD_FAILED_MESSAGE: &str =
    "Ошибка! Вы загрузили не поддерживаемый подтип файла или файл поврежден!";

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("client config error: {0}")]
    Config(String),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("http error: {0}")]
    Http(String),
    #[error("server answered {status}: {message}")]
    Server { status: u16, message: String },
    #[error("{path} is {size} bytes, over the {limit} byte limit")]
    TooLarge { path: String, size: u64, limit: u64 },
    #[error("{UPLOAD_FAILED_MESSAGE} ({reason})")]
    Upload { reason: String },
    #[error("another request is still running")]
    Busy,
}

impl From<reqwest::Error> for ClientError {
    fn from(err: reqwest::Error) -> Self {
        ClientError::Http(err.to_string())
    }
}

#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub base_url: String,
    pub timeout: Duration,
    pub chunk_size: usize,
    pub max_file_bytes: u64,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout: Duration::from_secs(3600),
            chunk_size: DEFAULT_CHUNK_SIZE,
            max_file_bytes: DEFAULT_MAX_FILE_MB * 1024 * 1024,
        }
    }
}

impl ClientConfig {
    pub fn from_env() -> Result<Self, ClientError> {
        let defaults = Self::default();
        let base_url = std::env::var("DOC_COMPARE_SERVER_URL").unwrap_or(defaults.base_url);
        let timeout = env_or_int("DOC_COMPARE_CLIENT_TIMEOUT_SECS", defaults.timeout.as_secs())?;
        let chunk_size = env_or_int("DOC_COMPARE_CHUNK_SIZE", defaults.chunk_size as u64)?;
        let max_file_mb = env_or_int("DOC_COMPARE_MAX_FILE_MB", DEFAULT_MAX_FILE_MB)?;
        if chunk_size == 0 {
            return Err(ClientError::Config("DOC_COMPARE_CHUNK_SIZE must be positive".into()));
        }
        Ok(Self {
            base_url,
            timeout: Duration::from_secs(timeout),
            chunk_size: chunk_size as usize,
            max_file_bytes: max_file_mb * 1024 * 1024,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url.trim_end_matches('/'), path)
    }
}

fn env_or_int(key: &str, default: u64) -> Result<u64, ClientError> {
    match std::env::var(key) {
        Ok(value) => value
            .trim()
            .parse::<u64>()
            .map_err(|_| ClientError::Config(format!("Invalid integer for {key}"))),
        Err(_) => Ok(default),
    }
}

/// Byte ranges `(offset, len)` of each chunk; an empty file is one empty chunk.
pub fn plan_chunks(total: u64, chunk_size: usize) -> Vec<(u64, usize)> {
    let chunk = chunk_size.max(1) as u64;
    if total == 0 {
        return vec![(0, 0)];
    }
    (0..total.div_ceil(chunk))
        .map(|index| {
            let offset = index * chunk;
            (offset, (total - offset).min(chunk) as usize)
        })
        .collect()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnifiedTexts {
    pub docx: String,
    pub pdf: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportRequest {
    pub docx: String,
    pub pdf: String,
    #[serde(rename = "countError")]
    pub count_error: usize,
    pub group_paragraph: bool,
    pub file_name_docx: String,
    pub file_name_pdf: String,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum UploadReply {
    Text { text: String },
    Chunk {
        #[allow(dead_code)]
        chunk: u64,
    },
}

#[derive(Debug, Clone)]
pub struct CompareClient {
    config: ClientConfig,
    http: Client,
}

impl CompareClient {
    pub fn from_env() -> Result<Self, ClientError> {
        Self::new(ClientConfig::from_env()?)
    }

    pub fn new(config: ClientConfig) -> Result<Self, ClientError> {
        let http = Client::builder().timeout(config.timeout).build()?;
        Ok(Self { config, http })
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Uploads `path` chunk by chunk and returns the text extracted by the
    /// server.
    pub fn upload(&self, path: &Path) -> Result<String, ClientError> {
        let file_name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .ok_or_else(|| ClientError::Config(format!("{} has no file name", path.display())))?;
        let mut file = File::open(path)?;
        let total = file.metadata()?.len();
        if total > self.config.max_file_bytes {
            return Err(ClientError::TooLarge {
                path: path.display().to_string(),
                size: total,
                limit: self.config.max_file_bytes,
            });
        }

        let upload_id = Uuid::new_v4().to_string();
        let chunks = plan_chunks(total, self.config.chunk_size);
        let url = self.config.url("/upload");
        let mut text = None;
        for (index, (offset, len)) in chunks.iter().copied().enumerate() {
            let mut buf = vec![0u8; len];
            file.seek(SeekFrom::Start(offset))?;
            file.read_exact(&mut buf)?;

            let form = Form::new()
                .text("dzuuid", upload_id.clone())
                .text("dzchunkindex", index.to_string())
                .text("dztotalfilesize", total.to_string())
                .text("dzchunksize", self.config.chunk_size.to_string())
                .text("dztotalchunkcount", chunks.len().to_string())
                .text("dzchunkbyteoffset", offset.to_string())
                .part("file", Part::bytes(buf).file_name(file_name.clone()));
            let response = check(self.http.post(&url).multipart(form).send()?)?;
            debug!(file = %file_name, chunk = index, of = chunks.len(), "chunk sent");

            if index + 1 == chunks.len() {
                match response.json::<UploadReply>()? {
                    UploadReply::Text { text: body } => text = Some(body),
                    UploadReply::Chunk { .. } => {
                        let reason = "server kept waiting after the last chunk";
                        return Err(ClientError::Http(reason.into()));
                    }
                }
            }
        }
        info!(file = %file_name, bytes = total, "upload finished");
        text.ok_or_else(|| ClientError::Http("no text in upload response".into()))
    }

    pub fn unify(
        &self,
        docx: &str,
        pdf: &str,
        threshold: f64,
    ) -> Result<UnifiedTexts, ClientError> {
        let response = self
            .http
            .post(self.config.url("/unified/"))
            .json(&serde_json::json!({"docx": docx, "pdf": pdf, "threshold": threshold}))
            .send()?;
        Ok(check(response)?.json()?)
    }

    /// The rendered report as `.docx` bytes.
    pub fn disagreement(&self, request: &ReportRequest) -> Result<Vec<u8>, ClientError> {
        let response = self
            .http
            .post(self.config.url("/get_disagreement/"))
            .json(request)
            .send()?;
        Ok(check(response)?.bytes()?.to_vec())
    }

    /// Tells the server to drop unfinished uploads. Failures are only logged.
    pub fn restart(&self) {
        let result = self
            .http
            .post(self.config.url("/restart"))
            .send()
            .map_err(ClientError::from)
            .and_then(check);
        match result {
            Ok(response) => {
                let message = response
                    .json::<serde_json::Value>()
                    .ok()
                    .and_then(|body| {
                        body.get("message")
                            .and_then(|m| m.as_str())
                            .map(str::to_string)
                    })
                    .unwrap_or_default();
                info!(%message, "server restarted");
            }
            Err(err) => warn!(error = %err, "restart request failed"),
        }
    }
}

fn check(response: Response) -> Result<Response, ClientError> {
    let status = response.status();
    if !status.is_client_error() && !status.is_server_error() {
        return Ok(response);
    }
    let body = response.text().unwrap_or_default();
    let message = serde_json::from_str::<serde_json::Value>(&body)
        .ok()
        .and_then(|value| value.get("error").and_then(|e| e.as_str()).map(str::to_string))
        .unwrap_or_else(|| body.trim().to_string());
    Err(ClientError::Server {
        status: status.as_u16(),
        message,
    })
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::io::{BufRead, BufReader, Write};
    use std::net::TcpListener;
    use std::thread::JoinHandle;

    /// Serves one canned response per entry, then stops. Returns the base
    /// URL and a handle yielding the raw requests.
    pub(crate) fn serve(
        responses: Vec<(u16, &'static str, Vec<u8>)>,
    ) -> (String, JoinHandle<Vec<String>>) {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let base = format!("http://{}", listener.local_addr().unwrap());
        let handle = std::thread::spawn(move || {
            let mut seen = Vec::new();
            for (status, content_type, body) in responses {
                let (mut stream, _) = listener.accept().unwrap();
                let mut reader = BufReader::new(stream.try_clone().unwrap());
                let mut head = String::new();
                let mut content_length = 0usize;
                loop {
                    let mut line = String::new();
                    reader.read_line(&mut line).unwrap();
                    if let Some(value) = line.to_ascii_lowercase().strip_prefix("content-length:") {
                        content_length = value.trim().parse().unwrap();
                    }
                    if line == "\r\n" || line.is_empty() {
                        break;
                    }
                    head.push_str(&line);
                }
                let mut request_body = vec![0u8; content_length];
                reader.read_exact(&mut request_body).unwrap();
                head.push_str(&String::from_utf8_lossy(&request_body));
                seen.push(head);

                let reply = format!(
                    "HTTP/1.1 {status} OK\r\nContent-Type: {content_type}\r\n\
                     Content-Length: {}\r\nConnection: close\r\n\r\n",
                    body.len()
                );
                stream.write_all(reply.as_bytes()).unwrap();
                stream.write_all(&body).unwrap();
            }
            seen
        });
        (base, handle)
    }

    pub(crate) fn client_for(base: &str) -> CompareClient {
        CompareClient::new(ClientConfig {
            base_url: base.to_string(),
            timeout: Duration::from_secs(5),
            chunk_size: 4,
            ..ClientConfig::default()
        })
        .unwrap()
    }

    #[test]
    fn chunks_cover_the_file() {
        assert_eq!(plan_chunks(0, 4), vec![(0, 0)]);
        assert_eq!(plan_chunks(4, 4), vec![(0, 4)]);
        assert_eq!(plan_chunks(10, 4), vec![(0, 4), (4, 4), (8, 2)]);
    }

    #[test]
    fn report_request_uses_wire_names() {
        let request = ReportRequest {
            docx: "a".into(),
            pdf: "b".into(),
            count_error: 2,
            group_paragraph: true,
            file_name_docx: "x.docx".into(),
            file_name_pdf: "y.pdf".into(),
        };
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["countError"], 2);
        assert_eq!(json["group_paragraph"], true);
        assert!(json.get("count_error").is_none());
    }

    #[test]
    fn upload_sends_every_chunk() {
        let (base, handle) = serve(vec![
            (200, "application/json", br#"{"chunk":0}"#.to_vec()),
            (200, "application/json", br#"{"chunk":1}"#.to_vec()),
            (200, "application/json", br#"{"text":"hello"}"#.to_vec()),
        ]);
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("doc.docx");
        std::fs::write(&path, b"0123456789").unwrap();

        let text = client_for(&base).upload(&path).unwrap();
        assert_eq!(text, "hello");
        let requests = handle.join().unwrap();
        assert_eq!(requests.len(), 3);
        assert!(requests[2].contains("89"));
        assert!(requests.iter().all(|r| r.contains("dztotalfilesize")));
    }

    #[test]
    fn server_errors_carry_the_message() {
        let body = br#"{"error":"bad threshold"}"#.to_vec();
        let (base, handle) = serve(vec![(400, "application/json", body)]);
        let err = client_for(&base).unify("a", "b", 0.0).unwrap_err();
        handle.join().unwrap();
        match err {
            ClientError::Server { status, message } => {
                assert_eq!(status, 400);
                assert_eq!(message, "bad threshold");
            }
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn oversized_files_are_refused_locally() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("big.pdf");
        std::fs::write(&path, vec![0u8; 32]).unwrap();
        let client = CompareClient::new(ClientConfig {
            max_file_bytes: 16,
            ..ClientConfig::default()
        })
        .unwrap();
        assert!(matches!(client.upload(&path), Err(ClientError::TooLarge { size: 32, .. })));
    }

    #[test]
    fn restart_failure_is_swallowed() {
        let client = client_for("http://127.0.0.1:9");
        client.restart();
    }
}
